//! Proptest generators for property-based testing.

use proptest::prelude::*;

use carepass_auth::{TokenClaims, TOKEN_VERSION};
use carepass_core::code::{CodePrefix, ShareCode};
use carepass_core::payload::{ClinicalStatus, MedicalRecord, Prescription, RecordKind};
use carepass_core::types::{SubjectRole, TokenId};

/// Generate a random code prefix.
pub fn code_prefix() -> impl Strategy<Value = CodePrefix> {
    prop_oneof![
        Just(CodePrefix::Record),
        Just(CodePrefix::Grant),
        Just(CodePrefix::Report),
    ]
}

/// Generate a well-formed share code.
///
/// The character classes spell out the code alphabet (no `I`, `O`, `0`, `1`).
pub fn share_code() -> impl Strategy<Value = ShareCode> {
    (code_prefix(), "[A-HJ-NP-Z2-9]{4}", "[A-HJ-NP-Z2-9]{3}").prop_filter_map(
        "valid share code",
        |(prefix, block, suffix)| ShareCode::parse(&format!("{prefix}-{block}-{suffix}")).ok(),
    )
}

/// Generate a random token ID.
pub fn token_id() -> impl Strategy<Value = TokenId> {
    any::<[u8; 16]>().prop_map(TokenId::from_bytes)
}

/// Generate a subject role.
pub fn subject_role() -> impl Strategy<Value = SubjectRole> {
    prop_oneof![Just(SubjectRole::Patient), Just(SubjectRole::Clinician)]
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate a token lifetime in milliseconds.
pub fn lifetime_millis() -> impl Strategy<Value = i64> {
    1i64..=i64::from(u32::MAX)
}

/// Generate a record kind.
pub fn record_kind() -> impl Strategy<Value = RecordKind> {
    prop_oneof![
        Just(RecordKind::Prescription),
        Just(RecordKind::Diagnosis),
        Just(RecordKind::LabResult),
        Just(RecordKind::Consultation),
        Just(RecordKind::Referral),
    ]
}

/// Generate a clinical status.
pub fn clinical_status() -> impl Strategy<Value = ClinicalStatus> {
    prop_oneof![
        Just(ClinicalStatus::Active),
        Just(ClinicalStatus::Resolved),
        Just(ClinicalStatus::Managed),
        Just(ClinicalStatus::Ongoing),
    ]
}

/// Generate a prescription line.
pub fn prescription() -> impl Strategy<Value = Prescription> {
    ("[A-Za-z]{3,20}", "[1-9][0-9]{0,3} mg", "[A-Za-z0-9 ]{3,24}").prop_map(
        |(medication, dosage, frequency)| Prescription {
            medication,
            dosage,
            frequency,
        },
    )
}

/// Generate a medical record with plausible field shapes.
pub fn medical_record() -> impl Strategy<Value = MedicalRecord> {
    (
        (
            "MR-[0-9]{4}-[0-9]{4}",
            record_kind(),
            "[A-Z][a-z]{2,12} [A-Z][a-z]{2,12}",
            "PT-[0-9]{4}",
            "[A-Za-z ]{3,40}",
            "[A-Za-z0-9,. ]{0,120}",
        ),
        (
            prop::collection::vec(prescription(), 0..=3),
            prop::option::of("[A-Za-z0-9 ]{5,60}".prop_map(String::from)),
            "[A-Za-z ]{5,40}",
            "Dr\\. [A-Z][a-z]{2,12}",
            "20[0-9]{2}-[01][0-9]-[0-3][0-9]",
            clinical_status(),
        ),
    )
        .prop_map(
            |(
                (id, kind, patient_name, patient_id, diagnosis, clinical_notes),
                (prescriptions, follow_up, hospital, doctor, date, status),
            )| MedicalRecord {
                id,
                kind,
                patient_name,
                patient_id,
                diagnosis,
                clinical_notes,
                prescriptions,
                follow_up,
                hospital,
                doctor,
                date,
                status,
            },
        )
}

/// Parameters for generating bearer token claims.
#[derive(Debug, Clone)]
pub struct ClaimsParams {
    pub role: SubjectRole,
    pub token_id: TokenId,
    pub issued_at: i64,
    pub lifetime_millis: i64,
}

impl Arbitrary for ClaimsParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (subject_role(), token_id(), timestamp(), lifetime_millis())
            .prop_map(|(role, token_id, issued_at, lifetime_millis)| ClaimsParams {
                role,
                token_id,
                issued_at,
                lifetime_millis,
            })
            .boxed()
    }
}

/// Build token claims from parameters.
pub fn claims_from_params(params: &ClaimsParams) -> TokenClaims {
    TokenClaims {
        version: TOKEN_VERSION,
        role: params.role,
        token_id: params.token_id,
        issued_at: params.issued_at,
        expires_at: params.issued_at + params.lifetime_millis,
    }
}
