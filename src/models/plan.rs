//! Admission plan (solution) model.
//!
//! A plan is the decoded answer to an instance: one record per patient,
//! either an admission (day, room, theater) or the `"none"` sentinel.
//! It serializes to the output document
//! `{"patients": [{id, admission_day, room, operating_theater} | {id, admission_day: "none"}]}`.

use serde::{Deserialize, Serialize};

/// Sentinel written for patients that are not admitted.
pub const UNSCHEDULED_MARKER: &str = "none";

/// Admission day of a patient record: a day index or `"none"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAdmissionDay", into = "RawAdmissionDay")]
pub enum AdmissionDay {
    /// Admitted on this day.
    Day(i64),
    /// Not admitted within the horizon.
    Unscheduled,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawAdmissionDay {
    Day(i64),
    Marker(String),
}

impl TryFrom<RawAdmissionDay> for AdmissionDay {
    type Error = String;

    fn try_from(raw: RawAdmissionDay) -> Result<Self, Self::Error> {
        match raw {
            RawAdmissionDay::Day(d) => Ok(Self::Day(d)),
            RawAdmissionDay::Marker(s) if s == UNSCHEDULED_MARKER => Ok(Self::Unscheduled),
            RawAdmissionDay::Marker(s) => Err(format!(
                "admission_day must be an integer or \"{UNSCHEDULED_MARKER}\", got \"{s}\""
            )),
        }
    }
}

impl From<AdmissionDay> for RawAdmissionDay {
    fn from(day: AdmissionDay) -> Self {
        match day {
            AdmissionDay::Day(d) => Self::Day(d),
            AdmissionDay::Unscheduled => Self::Marker(UNSCHEDULED_MARKER.to_string()),
        }
    }
}

impl AdmissionDay {
    /// The day index, if admitted.
    pub fn day(self) -> Option<i64> {
        match self {
            Self::Day(d) => Some(d),
            Self::Unscheduled => None,
        }
    }
}

/// One patient's line in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Patient ID.
    pub id: String,
    /// Admission day or `"none"`.
    pub admission_day: AdmissionDay,
    /// Assigned room ID (admitted patients only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Operating theater (admitted patients only; a placeholder value).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_theater: Option<String>,
}

impl PatientRecord {
    /// Record of an admitted patient.
    pub fn admitted(
        id: impl Into<String>,
        day: i64,
        room: impl Into<String>,
        operating_theater: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            admission_day: AdmissionDay::Day(day),
            room: Some(room.into()),
            operating_theater: Some(operating_theater.into()),
        }
    }

    /// Record of a patient left out of the horizon.
    pub fn unscheduled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            admission_day: AdmissionDay::Unscheduled,
            room: None,
            operating_theater: None,
        }
    }

    /// Whether the patient is admitted.
    pub fn is_scheduled(&self) -> bool {
        matches!(self.admission_day, AdmissionDay::Day(_))
    }
}

/// The output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionDocument {
    /// One record per patient, in instance order.
    pub patients: Vec<PatientRecord>,
}

impl SolutionDocument {
    /// Finds the record of a patient.
    pub fn record(&self, patient_id: &str) -> Option<&PatientRecord> {
        self.patients.iter().find(|r| r.id == patient_id)
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Admission counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionSummary {
    /// Mandatory patients admitted.
    pub mandatory_scheduled: usize,
    /// Mandatory patients in the instance.
    pub mandatory_total: usize,
    /// Optional patients admitted.
    pub optional_scheduled: usize,
    /// Optional patients in the instance.
    pub optional_total: usize,
}

/// A hard-constraint violation found in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (patient, room, or surgeon).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of plan violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Male and female patients share a room on a day.
    GenderMix,
    /// Patient placed in one of its incompatible rooms.
    IncompatibleRoom,
    /// Surgeon's daily surgery time exceeded.
    SurgeonOverload,
    /// Mandatory patient left unscheduled.
    MandatoryUnscheduled,
    /// Admission before release or after due day.
    WindowViolation,
    /// Room occupancy above capacity.
    CapacityExceeded,
    /// Record refers to an unknown patient/room or is malformed.
    MalformedRecord,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_shape() {
        let doc = SolutionDocument {
            patients: vec![
                PatientRecord::admitted("p0", 2, "r1", "t0"),
                PatientRecord::unscheduled("p1"),
            ],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "patients": [
                    {"id": "p0", "admission_day": 2, "room": "r1", "operating_theater": "t0"},
                    {"id": "p1", "admission_day": "none"}
                ]
            })
        );
    }

    #[test]
    fn test_document_parse() {
        let doc: SolutionDocument = serde_json::from_str(
            r#"{"patients": [
                {"id": "p1", "admission_day": "none"},
                {"id": "p0", "admission_day": 0, "room": "r0", "operating_theater": "t0"}
            ]}"#,
        )
        .unwrap();
        assert!(!doc.record("p1").unwrap().is_scheduled());
        assert_eq!(doc.record("p0").unwrap().admission_day.day(), Some(0));
        assert_eq!(doc.record("p0").unwrap().room.as_deref(), Some("r0"));
    }

    #[test]
    fn test_bad_marker_rejected() {
        let result: Result<PatientRecord, _> =
            serde_json::from_str(r#"{"id": "p0", "admission_day": "later"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pretty_json() {
        let doc = SolutionDocument {
            patients: vec![PatientRecord::unscheduled("p9")],
        };
        let text = doc.to_json_pretty().unwrap();
        assert!(text.contains("\"none\""));
        assert!(text.contains('\n'));
    }
}
