//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use carepass_core::clock::ManualClock;
use carepass_core::payload::{
    AccessGrantPayload, ClinicalStatus, MedicalRecord, PatientProfile, Prescription,
    RecordBundlePayload, RecordKind, ReportKind, ReportSeverity, TelemetryReport, TimelineEntry,
    Vital,
};
use carepass_core::types::SubjectRole;
use carepass_relay::{BearerToken, MemoryStore, Relay, RelayConfig, ShareCode};

/// Instant the fixture clock starts at.
pub const START_MILLIS: i64 = 1_710_000_000_000; // 2024-03-09T16:00:00Z

/// A test fixture with a manual clock and an in-memory relay.
pub struct TestFixture {
    pub clock: ManualClock,
    pub relay: Relay<MemoryStore>,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a fixture with a custom configuration.
    pub fn with_config(config: RelayConfig) -> Self {
        let clock = ManualClock::new(START_MILLIS);
        let store = MemoryStore::new(clock.shared());
        let relay = Relay::new(store, clock.shared(), config);
        Self { clock, relay }
    }

    /// Issue a patient session using the configured access key.
    pub async fn patient_token(&self) -> carepass_relay::Result<BearerToken> {
        self.relay
            .issue_token(SubjectRole::Patient, &self.relay.config().patient_access_key)
            .await
    }

    /// Issue a clinician session using the configured access key.
    pub async fn clinician_token(&self) -> carepass_relay::Result<BearerToken> {
        self.relay
            .issue_token(
                SubjectRole::Clinician,
                &self.relay.config().clinician_access_key,
            )
            .await
    }

    /// Publish the sample record, returning its share code.
    pub async fn publish_sample_bundle(
        &self,
        token: &str,
    ) -> carepass_relay::Result<ShareCode> {
        self.relay
            .publish_bundle(
                token,
                RecordBundlePayload {
                    record: sample_record(),
                },
            )
            .await
    }

    /// Move the fixture clock forward.
    pub fn advance_millis(&self, millis: i64) {
        self.clock.advance(millis);
    }

    /// Move the fixture clock forward by whole minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(minutes * 60 * 1000);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A consistent sample record for one visit.
pub fn sample_record() -> MedicalRecord {
    MedicalRecord {
        id: "MR-2024-0533".to_string(),
        kind: RecordKind::Diagnosis,
        patient_name: "Thandiwe Phiri".to_string(),
        patient_id: "PT-7108".to_string(),
        diagnosis: "Uncomplicated Malaria".to_string(),
        clinical_notes: "Positive rapid test, no danger signs.".to_string(),
        prescriptions: vec![Prescription {
            medication: "Artemether-Lumefantrine".to_string(),
            dosage: "80/480 mg".to_string(),
            frequency: "Twice daily for 3 days".to_string(),
        }],
        follow_up: Some("Repeat test if fever persists after treatment".to_string()),
        hospital: "Kamuzu Central Hospital".to_string(),
        doctor: "Dr. Chirwa".to_string(),
        date: "2024-03-09".to_string(),
        status: ClinicalStatus::Active,
    }
}

/// The profile the sample record belongs to.
pub fn sample_profile() -> PatientProfile {
    PatientProfile {
        name: "Thandiwe Phiri".to_string(),
        national_id: "MW-104455".to_string(),
        gender: "female".to_string(),
        age: 29,
        blood_type: "A+".to_string(),
        allergies: Vec::new(),
        vitals: vec![
            Vital {
                label: "Temperature".to_string(),
                value: "38.9 C".to_string(),
            },
            Vital {
                label: "Blood Pressure".to_string(),
                value: "112/70".to_string(),
            },
        ],
        conditions: Vec::new(),
        medications: Vec::new(),
        lab_results: Vec::new(),
    }
}

/// A grant snapshot built from the sample profile and record.
pub fn sample_grant() -> AccessGrantPayload {
    AccessGrantPayload {
        patient: sample_profile(),
        records: vec![sample_record()],
        timeline: vec![TimelineEntry {
            date: "2024-03-09".to_string(),
            title: "Malaria diagnosis".to_string(),
            kind: RecordKind::Consultation,
            description: "Walk-in visit with fever".to_string(),
            hospital: "Kamuzu Central Hospital".to_string(),
            doctor: "Dr. Chirwa".to_string(),
        }],
        granted_at: "2024-03-09T16:00:00Z".to_string(),
        expires_in_secs: 0,
    }
}

/// A telemetry report carrying no clinical data.
pub fn sample_report() -> TelemetryReport {
    TelemetryReport {
        kind: ReportKind::Error,
        severity: ReportSeverity::Medium,
        message: "Share screen failed to render the code".to_string(),
        detail: Some("TypeError: null canvas context".to_string()),
        client: "Android 13 / Chrome 122".to_string(),
        reported_at: "2024-03-09T16:05:00Z".to_string(),
    }
}
