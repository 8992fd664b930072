//! Problem instance.
//!
//! An instance bundles everything the model builder reads: the planning
//! horizon, ordered patient/room/surgeon lists, the age-group vocabulary and
//! the objective weights. Room order is significant: a room's position in
//! `rooms` is the value its index takes in the `room` decision variable.

use serde::{Deserialize, Serialize};

use super::{Patient, Room, Surgeon};

/// Objective weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weights {
    /// Penalty per day of admission delay (mandatory patients).
    pub patient_delay: i64,
    /// Penalty per room-day holding more than one age group.
    pub room_mixed_age: i64,
    /// Reward per admitted optional patient.
    pub unscheduled_optional: i64,
}

impl Weights {
    /// Creates a weight set.
    pub fn new(patient_delay: i64, room_mixed_age: i64, unscheduled_optional: i64) -> Self {
        Self {
            patient_delay,
            room_mixed_age,
            unscheduled_optional,
        }
    }
}

/// A patient admission scheduling instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Planning horizon in days.
    pub days: i64,
    /// Patients to schedule.
    pub patients: Vec<Patient>,
    /// Rooms, in index order.
    pub rooms: Vec<Room>,
    /// Surgeons.
    pub surgeons: Vec<Surgeon>,
    /// Valid age-group tags, in a fixed order.
    pub age_groups: Vec<String>,
    /// Objective weights.
    pub weights: Weights,
}

impl Instance {
    /// Creates an empty instance over `days` days.
    pub fn new(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    /// Adds a patient.
    pub fn with_patient(mut self, patient: Patient) -> Self {
        self.patients.push(patient);
        self
    }

    /// Adds a room.
    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    /// Adds a surgeon.
    pub fn with_surgeon(mut self, surgeon: Surgeon) -> Self {
        self.surgeons.push(surgeon);
        self
    }

    /// Sets the age-group vocabulary.
    pub fn with_age_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.age_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the objective weights.
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Finds a patient by id.
    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Finds a room by id.
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Position of a room in the room list.
    pub fn room_index(&self, id: &str) -> Option<usize> {
        self.rooms.iter().position(|r| r.id == id)
    }

    /// Finds a surgeon by id.
    pub fn surgeon(&self, id: &str) -> Option<&Surgeon> {
        self.surgeons.iter().find(|s| s.id == id)
    }

    /// Position of an age group in the vocabulary.
    pub fn age_group_index(&self, tag: &str) -> Option<usize> {
        self.age_groups.iter().position(|g| g == tag)
    }

    /// Number of mandatory patients.
    pub fn mandatory_count(&self) -> usize {
        self.patients.iter().filter(|p| p.mandatory).count()
    }

    /// Number of optional patients.
    pub fn optional_count(&self) -> usize {
        self.patients.len() - self.mandatory_count()
    }
}
