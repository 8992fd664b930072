//! Input validation for admission scheduling instances.
//!
//! Checks structural integrity of an instance before any model variable is
//! created. A malformed instance must never reach the model builder, since
//! most defects (an unknown surgeon, a negative duration) would otherwise
//! turn into a silently wrong model rather than an error. Detects:
//! - Duplicate IDs
//! - Dangling surgeon, room and age-group references
//! - Non-positive horizon, stays and room capacities
//! - Surgeon budgets that do not cover the horizon
//! - Mandatory patients that no admission day or room can accommodate

use std::collections::HashSet;
use std::fmt;

use crate::models::{Instance, Patient};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// The horizon is not a positive number of days.
    InvalidHorizon,
    /// The instance has no rooms.
    EmptyRooms,
    /// A patient references a surgeon that doesn't exist.
    InvalidSurgeonReference,
    /// A patient references a room that doesn't exist.
    InvalidRoomReference,
    /// A patient's age group is not in the instance vocabulary.
    InvalidAgeGroup,
    /// Non-positive stay or negative surgery duration.
    InvalidDuration,
    /// Non-positive room capacity or negative surgeon budget.
    InvalidCapacity,
    /// Surgeon budget list length differs from the horizon.
    CapacityLengthMismatch,
    /// Negative objective weight.
    InvalidWeight,
    /// Release/due window is malformed or has no day inside the horizon.
    InvalidWindow,
    /// No day in a mandatory patient's window has enough surgeon time.
    UnsatisfiableCapacity,
    /// A mandatory patient is incompatible with every room.
    NoCompatibleRoom,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates an instance.
///
/// Checks:
/// 1. Positive horizon and at least one room
/// 2. No duplicate patient, room, surgeon or age-group IDs
/// 3. Positive room capacities; surgeon budgets non-negative and one per day
/// 4. Non-negative weights
/// 5. Every patient: positive stay, non-negative surgery duration,
///    known surgeon, known incompatible rooms, known age group,
///    non-negative release day
/// 6. Every mandatory patient: a due day, a non-empty window inside the
///    horizon, a day in that window with enough surgeon time, and at
///    least one compatible room
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &Instance) -> ValidationResult {
    let mut errors = Vec::new();

    if instance.days <= 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidHorizon,
            format!("Horizon must be positive, got {} days", instance.days),
        ));
    }
    if instance.rooms.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyRooms,
            "Instance has no rooms",
        ));
    }

    check_unique(
        "patient",
        instance.patients.iter().map(|p| p.id.as_str()),
        &mut errors,
    );
    check_unique("room", instance.rooms.iter().map(|r| r.id.as_str()), &mut errors);
    check_unique(
        "surgeon",
        instance.surgeons.iter().map(|s| s.id.as_str()),
        &mut errors,
    );
    check_unique(
        "age group",
        instance.age_groups.iter().map(String::as_str),
        &mut errors,
    );

    for room in &instance.rooms {
        if room.capacity <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCapacity,
                format!("Room '{}' has non-positive capacity {}", room.id, room.capacity),
            ));
        }
    }

    for surgeon in &instance.surgeons {
        if instance.days > 0 && surgeon.max_surgery_time.len() as i64 != instance.days {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityLengthMismatch,
                format!(
                    "Surgeon '{}' has {} daily budgets for a {}-day horizon",
                    surgeon.id,
                    surgeon.max_surgery_time.len(),
                    instance.days
                ),
            ));
        }
        if surgeon.max_surgery_time.iter().any(|&t| t < 0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCapacity,
                format!("Surgeon '{}' has a negative daily budget", surgeon.id),
            ));
        }
    }

    let w = &instance.weights;
    for (name, value) in [
        ("patient_delay", w.patient_delay),
        ("room_mixed_age", w.room_mixed_age),
        ("unscheduled_optional", w.unscheduled_optional),
    ] {
        if value < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeight,
                format!("Weight '{name}' is negative ({value})"),
            ));
        }
    }

    for patient in &instance.patients {
        check_patient(instance, patient, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    what: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} ID: {id}"),
            ));
        }
    }
}

fn check_patient(instance: &Instance, patient: &Patient, errors: &mut Vec<ValidationError>) {
    let id = &patient.id;

    if patient.length_of_stay <= 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!("Patient '{id}' has non-positive length of stay {}", patient.length_of_stay),
        ));
    }
    if patient.surgery_duration < 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!("Patient '{id}' has negative surgery duration {}", patient.surgery_duration),
        ));
    }

    let surgeon = instance.surgeon(&patient.surgeon_id);
    if surgeon.is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSurgeonReference,
            format!("Patient '{id}' references unknown surgeon '{}'", patient.surgeon_id),
        ));
    }

    for room_id in &patient.incompatible_room_ids {
        if instance.room(room_id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRoomReference,
                format!("Patient '{id}' references unknown room '{room_id}'"),
            ));
        }
    }

    if instance.age_group_index(&patient.age_group).is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidAgeGroup,
            format!("Patient '{id}' has unknown age group '{}'", patient.age_group),
        ));
    }

    if patient.surgery_release_day < 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWindow,
            format!("Patient '{id}' has negative release day {}", patient.surgery_release_day),
        ));
    }

    if !patient.mandatory {
        return;
    }

    let Some(due) = patient.surgery_due_day else {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWindow,
            format!("Mandatory patient '{id}' has no due day"),
        ));
        return;
    };

    let first = patient.surgery_release_day.max(0);
    let last = due.min(instance.days - 1);
    if first > last {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWindow,
            format!(
                "Mandatory patient '{id}' has no admission day in [{}, {due}] within the horizon",
                patient.surgery_release_day
            ),
        ));
        return;
    }

    if let Some(surgeon) = surgeon {
        let fits = (first..=last).any(|d| {
            surgeon
                .capacity_on(d)
                .is_some_and(|cap| cap >= patient.surgery_duration)
        });
        if !fits {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnsatisfiableCapacity,
                format!(
                    "Mandatory patient '{id}' needs {} surgery time but surgeon '{}' \
                     has no such day in [{first}, {last}]",
                    patient.surgery_duration, surgeon.id
                ),
            ));
        }
    }

    if !instance.rooms.is_empty()
        && instance
            .rooms
            .iter()
            .all(|r| patient.is_incompatible_with(&r.id))
    {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoCompatibleRoom,
            format!("Mandatory patient '{id}' is incompatible with every room"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Room, Surgeon, Weights};

    fn sample_instance() -> Instance {
        Instance::new(3)
            .with_room(Room::new("r0"))
            .with_room(Room::new("r1").with_capacity(2))
            .with_surgeon(Surgeon::uniform("s0", 3, 120))
            .with_age_groups(["adult", "elderly"])
            .with_weights(Weights::new(1, 1, 1))
            .with_patient(
                Patient::new("p0", Gender::Male)
                    .mandatory_within(0, 2)
                    .with_age_group("adult")
                    .with_surgery("s0", 60)
                    .incompatible_with("r1"),
            )
            .with_patient(
                Patient::new("p1", Gender::Female)
                    .optional_from(1)
                    .with_age_group("elderly")
                    .with_stay(2)
                    .with_surgery("s0", 30),
            )
    }

    fn kinds(instance: &Instance) -> Vec<ValidationErrorKind> {
        validate_instance(instance)
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_instance() {
        assert!(validate_instance(&sample_instance()).is_ok());
    }

    #[test]
    fn test_duplicate_room_id() {
        let inst = sample_instance().with_room(Room::new("r0"));
        let errors = validate_instance(&inst).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("room")));
    }

    #[test]
    fn test_unknown_surgeon() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .with_age_group("adult")
                .with_surgery("ghost", 10),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::InvalidSurgeonReference));
    }

    #[test]
    fn test_unknown_incompatible_room() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .with_age_group("adult")
                .with_surgery("s0", 10)
                .incompatible_with("r9"),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::InvalidRoomReference));
    }

    #[test]
    fn test_unknown_age_group() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .with_age_group("infant")
                .with_surgery("s0", 10),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::InvalidAgeGroup));
    }

    #[test]
    fn test_negative_duration_and_zero_stay() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .with_age_group("adult")
                .with_surgery("s0", -5)
                .with_stay(0),
        );
        let found = kinds(&inst);
        assert_eq!(
            found
                .iter()
                .filter(|k| **k == ValidationErrorKind::InvalidDuration)
                .count(),
            2
        );
    }

    #[test]
    fn test_budget_length_mismatch() {
        let inst = sample_instance().with_surgeon(Surgeon::uniform("s1", 2, 60));
        assert!(kinds(&inst).contains(&ValidationErrorKind::CapacityLengthMismatch));
    }

    #[test]
    fn test_mandatory_window_outside_horizon() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .mandatory_within(5, 7)
                .with_age_group("adult")
                .with_surgery("s0", 10),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::InvalidWindow));
    }

    #[test]
    fn test_mandatory_without_due_day() {
        let mut patient = Patient::new("p2", Gender::Male)
            .with_age_group("adult")
            .with_surgery("s0", 10);
        patient.mandatory = true;
        let inst = sample_instance().with_patient(patient);
        assert!(kinds(&inst).contains(&ValidationErrorKind::InvalidWindow));
    }

    #[test]
    fn test_unsatisfiable_surgeon_capacity() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .mandatory_within(0, 2)
                .with_age_group("adult")
                .with_surgery("s0", 500),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::UnsatisfiableCapacity));
    }

    #[test]
    fn test_no_compatible_room() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .mandatory_within(0, 2)
                .with_age_group("adult")
                .with_surgery("s0", 10)
                .incompatible_with("r0")
                .incompatible_with("r1"),
        );
        assert!(kinds(&inst).contains(&ValidationErrorKind::NoCompatibleRoom));
    }

    #[test]
    fn test_optional_outside_horizon_is_allowed() {
        let inst = sample_instance().with_patient(
            Patient::new("p2", Gender::Male)
                .optional_from(10)
                .with_age_group("adult")
                .with_surgery("s0", 10),
        );
        assert!(validate_instance(&inst).is_ok());
    }

    #[test]
    fn test_multiple_errors() {
        let mut inst = sample_instance();
        inst.days = 0;
        inst.rooms.clear();
        inst.weights.patient_delay = -1;

        let found = kinds(&inst);
        assert!(found.contains(&ValidationErrorKind::InvalidHorizon));
        assert!(found.contains(&ValidationErrorKind::EmptyRooms));
        assert!(found.contains(&ValidationErrorKind::InvalidWeight));
    }
}
