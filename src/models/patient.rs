//! Patient model.
//!
//! A patient is the unit being scheduled: one admission, one room for the
//! whole stay, and one surgery performed by a fixed surgeon on the
//! admission day.
//!
//! # Time Representation
//! Days are integer offsets from the start of the planning horizon (day 0).
//! A stay occupies the half-open interval `[admission, admission + length_of_stay)`:
//! the discharge day itself is free, so another patient may be admitted to the
//! same bed on that day.

use serde::{Deserialize, Serialize};

/// Patient gender, used for room gender separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male (`"M"` in instance data).
    #[serde(rename = "M")]
    Male,
    /// Female (`"F"` in instance data).
    #[serde(rename = "F")]
    Female,
}

/// A patient awaiting admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// Unique patient identifier.
    pub id: String,
    /// Gender.
    pub gender: Gender,
    /// Age-group tag (one of the instance's age groups).
    pub age_group: String,
    /// Whether the patient must be admitted within the horizon.
    pub mandatory: bool,
    /// Number of days the patient occupies a bed.
    pub length_of_stay: i64,
    /// Surgeon performing the surgery.
    pub surgeon_id: String,
    /// Surgery time charged to the surgeon on the admission day.
    pub surgery_duration: i64,
    /// Earliest admission day.
    pub surgery_release_day: i64,
    /// Latest admission day. Only meaningful for mandatory patients.
    pub surgery_due_day: Option<i64>,
    /// Rooms the patient must never be placed in.
    #[serde(default)]
    pub incompatible_room_ids: Vec<String>,
}

impl Patient {
    /// Creates an optional patient with a one-day stay released on day 0.
    pub fn new(id: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: id.into(),
            gender,
            age_group: String::new(),
            mandatory: false,
            length_of_stay: 1,
            surgeon_id: String::new(),
            surgery_duration: 0,
            surgery_release_day: 0,
            surgery_due_day: None,
            incompatible_room_ids: Vec::new(),
        }
    }

    /// Marks the patient mandatory with an admission window `[release, due]`.
    pub fn mandatory_within(mut self, release_day: i64, due_day: i64) -> Self {
        self.mandatory = true;
        self.surgery_release_day = release_day;
        self.surgery_due_day = Some(due_day);
        self
    }

    /// Marks the patient optional, admissible from `release_day` on.
    pub fn optional_from(mut self, release_day: i64) -> Self {
        self.mandatory = false;
        self.surgery_release_day = release_day;
        self.surgery_due_day = None;
        self
    }

    /// Sets the age group.
    pub fn with_age_group(mut self, age_group: impl Into<String>) -> Self {
        self.age_group = age_group.into();
        self
    }

    /// Sets the length of stay in days.
    pub fn with_stay(mut self, days: i64) -> Self {
        self.length_of_stay = days;
        self
    }

    /// Sets the surgeon and surgery duration.
    pub fn with_surgery(mut self, surgeon_id: impl Into<String>, duration: i64) -> Self {
        self.surgeon_id = surgeon_id.into();
        self.surgery_duration = duration;
        self
    }

    /// Adds a room the patient cannot be placed in.
    pub fn incompatible_with(mut self, room_id: impl Into<String>) -> Self {
        self.incompatible_room_ids.push(room_id.into());
        self
    }

    /// Whether the patient cannot be placed in the given room.
    pub fn is_incompatible_with(&self, room_id: &str) -> bool {
        self.incompatible_room_ids.iter().any(|r| r == room_id)
    }

    /// First day after the stay (exclusive end).
    #[inline]
    pub fn discharge_day(&self, admission_day: i64) -> i64 {
        admission_day + self.length_of_stay
    }

    /// Whether a stay starting on `admission_day` occupies `day`.
    #[inline]
    pub fn occupies(&self, admission_day: i64, day: i64) -> bool {
        admission_day <= day && day < self.discharge_day(admission_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_builder() {
        let p = Patient::new("p0", Gender::Female)
            .mandatory_within(2, 5)
            .with_age_group("elderly")
            .with_stay(3)
            .with_surgery("s0", 120)
            .incompatible_with("r1");

        assert_eq!(p.id, "p0");
        assert!(p.mandatory);
        assert_eq!(p.surgery_release_day, 2);
        assert_eq!(p.surgery_due_day, Some(5));
        assert_eq!(p.length_of_stay, 3);
        assert_eq!(p.surgeon_id, "s0");
        assert_eq!(p.surgery_duration, 120);
        assert!(p.is_incompatible_with("r1"));
        assert!(!p.is_incompatible_with("r0"));
    }

    #[test]
    fn test_optional_clears_due_day() {
        let p = Patient::new("p1", Gender::Male)
            .mandatory_within(0, 3)
            .optional_from(1);
        assert!(!p.mandatory);
        assert_eq!(p.surgery_due_day, None);
        assert_eq!(p.surgery_release_day, 1);
    }

    #[test]
    fn test_stay_is_half_open() {
        let p = Patient::new("p2", Gender::Male).with_stay(2);
        assert!(!p.occupies(3, 2));
        assert!(p.occupies(3, 3));
        assert!(p.occupies(3, 4));
        // discharge day is free for same-day turnover
        assert!(!p.occupies(3, 5));
        assert_eq!(p.discharge_day(3), 5);
    }

    #[test]
    fn test_gender_serde_tags() {
        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"F\"");
        let g: Gender = serde_json::from_str("\"M\"").unwrap();
        assert_eq!(g, Gender::Male);
    }
}
