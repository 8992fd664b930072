//! Room and surgeon models.
//!
//! Rooms hold patients for the length of their stay; surgeons bound the
//! total surgery time admitted on each day.

use serde::{Deserialize, Serialize};

/// A ward room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Maximum number of simultaneous occupants.
    pub capacity: i64,
}

/// A surgeon with a per-day operating time budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surgeon {
    /// Unique surgeon identifier.
    pub id: String,
    /// Maximum surgery time per day, indexed by day. Length equals the horizon.
    pub max_surgery_time: Vec<i64>,
}

impl Room {
    /// Creates a single-bed room.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capacity: 1,
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Surgeon {
    /// Creates a surgeon with the given per-day budgets.
    pub fn new(id: impl Into<String>, max_surgery_time: Vec<i64>) -> Self {
        Self {
            id: id.into(),
            max_surgery_time,
        }
    }

    /// Creates a surgeon with the same budget on each of `days` days.
    pub fn uniform(id: impl Into<String>, days: usize, per_day: i64) -> Self {
        Self::new(id, vec![per_day; days])
    }

    /// Surgery budget on `day`, or `None` outside the horizon.
    pub fn capacity_on(&self, day: i64) -> Option<i64> {
        usize::try_from(day)
            .ok()
            .and_then(|d| self.max_surgery_time.get(d))
            .copied()
    }
}
