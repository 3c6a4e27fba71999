//! Typed payload schemas for relayed clinical data.
//!
//! The relay stores payloads as opaque CBOR bytes; these are the schemas
//! those bytes decode to at the API boundary. Everything is a known,
//! explicit shape. There is no pass-through of untyped blobs: a payload
//! that does not decode to one of these kinds is rejected.
//!
//! Dates are carried as the ISO-8601 strings the clients exchange; the
//! relay never interprets clinical dates, only its own expiry timestamps.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Discriminator for what a medical record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Prescription,
    Diagnosis,
    LabResult,
    Consultation,
    Referral,
}

/// Clinical status of a record or condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalStatus {
    Active,
    Resolved,
    Managed,
    Ongoing,
}

/// A prescribed medication line within a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
}

/// A single shareable medical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    /// Facility-assigned record identifier (not a share code).
    pub id: String,
    pub kind: RecordKind,
    pub patient_name: String,
    pub patient_id: String,
    pub diagnosis: String,
    pub clinical_notes: String,
    pub prescriptions: Vec<Prescription>,
    /// Follow-up instruction, if the clinician left one.
    pub follow_up: Option<String>,
    pub hospital: String,
    pub doctor: String,
    /// Date of the encounter, ISO-8601.
    pub date: String,
    pub status: ClinicalStatus,
}

/// A recorded vital sign, e.g. `("Blood Pressure", "120/80")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vital {
    pub label: String,
    pub value: String,
}

/// A diagnosed long-running condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub date: String,
    pub hospital: String,
    pub status: ClinicalStatus,
}

/// A medication the patient takes continuously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub prescribed_by: String,
}

/// Outcome classification of a lab result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    Normal,
    Abnormal,
    Critical,
}

/// A laboratory test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResult {
    pub date: String,
    pub test: String,
    pub result: String,
    pub reference_range: String,
    pub status: LabStatus,
}

/// The patient's profile as cached on the device and shared via grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub national_id: String,
    pub gender: String,
    pub age: u32,
    pub blood_type: String,
    pub allergies: Vec<String>,
    pub vitals: Vec<Vital>,
    pub conditions: Vec<Condition>,
    pub medications: Vec<Medication>,
    pub lab_results: Vec<LabResult>,
}

/// One entry of the patient's historical timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: String,
    pub title: String,
    pub kind: RecordKind,
    pub description: String,
    pub hospital: String,
    pub doctor: String,
}

/// Payload of a record bundle: a one-way hand-off of a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBundlePayload {
    pub record: MedicalRecord,
}

/// Payload of an access grant: the snapshot a clinician is allowed to view
/// for the grant's lifetime.
///
/// `granted_at` and `expires_in_secs` are echoed back to redeemers so the
/// viewing client can drive its countdown display without trusting its own
/// clock for the authoritative cutoff (the relay enforces that).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrantPayload {
    pub patient: PatientProfile,
    pub records: Vec<MedicalRecord>,
    pub timeline: Vec<TimelineEntry>,
    /// When the patient approved sharing, ISO-8601.
    pub granted_at: String,
    /// Requested validity window in seconds.
    pub expires_in_secs: u64,
}

/// Tagged union of the payload kinds the relay persists.
///
/// The tag travels with the bytes, so a grant payload can never be decoded
/// as a bundle payload by mistake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelayPayload {
    RecordBundle(RecordBundlePayload),
    AccessGrant(Box<AccessGrantPayload>),
}

impl RelayPayload {
    /// Serialize to CBOR bytes for storage.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        Bytes::from(buf)
    }

    /// Deserialize from stored CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::PayloadDecode(e.to_string()))
    }

    /// Narrow to a record bundle payload.
    pub fn into_record_bundle(self) -> Result<RecordBundlePayload, CoreError> {
        match self {
            RelayPayload::RecordBundle(p) => Ok(p),
            RelayPayload::AccessGrant(_) => Err(CoreError::PayloadDecode(
                "expected record bundle payload, found access grant".to_string(),
            )),
        }
    }

    /// Narrow to an access grant payload.
    pub fn into_access_grant(self) -> Result<AccessGrantPayload, CoreError> {
        match self {
            RelayPayload::AccessGrant(p) => Ok(*p),
            RelayPayload::RecordBundle(_) => Err(CoreError::PayloadDecode(
                "expected access grant payload, found record bundle".to_string(),
            )),
        }
    }
}

/// Kind of telemetry report a client submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Captured automatically from an unhandled client error.
    Error,
    /// Filed by a person describing a problem.
    Manual,
}

/// Severity a reporter assigned to a telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ReportSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReportSeverity::Critical => "critical",
            ReportSeverity::High => "high",
            ReportSeverity::Medium => "medium",
            ReportSeverity::Low => "low",
        }
    }
}

/// A diagnostics report submitted by a client. Carries no clinical data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub kind: ReportKind,
    pub severity: ReportSeverity,
    pub message: String,
    /// Stack trace or steps to reproduce, when available.
    pub detail: Option<String>,
    /// Client platform summary, e.g. "Android 14 / Chrome 126".
    pub client: String,
    /// Client-side timestamp, ISO-8601. Informational only.
    pub reported_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> MedicalRecord {
        MedicalRecord {
            id: "FAC-2026-0042".to_string(),
            kind: RecordKind::Diagnosis,
            patient_name: "A. Example".to_string(),
            patient_id: "ID-0001".to_string(),
            diagnosis: "Flu".to_string(),
            clinical_notes: "Rest and fluids.".to_string(),
            prescriptions: vec![Prescription {
                medication: "Paracetamol".to_string(),
                dosage: "500mg".to_string(),
                frequency: "3x daily".to_string(),
            }],
            follow_up: None,
            hospital: "Central Hospital".to_string(),
            doctor: "Dr. Example".to_string(),
            date: "2026-02-01".to_string(),
            status: ClinicalStatus::Active,
        }
    }

    #[test]
    fn test_payload_roundtrip() {
        let payload = RelayPayload::RecordBundle(RecordBundlePayload {
            record: sample_record(),
        });
        let bytes = payload.to_bytes();
        let recovered = RelayPayload::from_bytes(&bytes).unwrap();
        assert_eq!(payload, recovered);
    }

    #[test]
    fn test_payload_kind_cannot_be_confused() {
        let bundle = RelayPayload::RecordBundle(RecordBundlePayload {
            record: sample_record(),
        });
        let decoded = RelayPayload::from_bytes(&bundle.to_bytes()).unwrap();
        assert!(decoded.into_access_grant().is_err());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(RelayPayload::from_bytes(&[0xff, 0x00, 0x13]).is_err());
        assert!(RelayPayload::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_record_serializes_with_snake_case_kinds() {
        let json = serde_json::to_string(&RecordKind::LabResult).unwrap();
        assert_eq!(json, "\"lab_result\"");
    }
}
