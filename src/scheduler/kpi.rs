//! Admission plan quality metrics (KPIs).
//!
//! Computes performance indicators from a decoded plan and its instance.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Admitted counts | Mandatory / optional patients with an admission day |
//! | Total Delay | Sum of `admission_day - release` over admitted mandatory patients |
//! | Maximum Delay | Largest single delay |
//! | Mixed-Age Room-Days | Room-days holding more than one age group |
//! | Bed Occupancy | Occupied bed-days / available bed-days |
//!
//! Occupancy counts the full stay of every patient, so the mixed-age count
//! may exceed the penalty the model paid when it was built with the legacy
//! reachability guard.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::audit::occupancy;
use crate::models::{AdmissionSummary, Instance, SolutionDocument, Weights};

/// Plan performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanKpi {
    /// Admission counts.
    pub summary: AdmissionSummary,
    /// Sum of admission delays of mandatory patients (days).
    pub total_delay: i64,
    /// Maximum delay of any mandatory patient (days).
    pub max_delay: i64,
    /// Room-days with at least two age groups present.
    pub mixed_age_room_days: usize,
    /// Occupied over available bed-days (0.0..1.0).
    pub bed_occupancy: f64,
}

impl PlanKpi {
    /// Computes KPIs from a plan and its instance.
    pub fn calculate(instance: &Instance, document: &SolutionDocument) -> Self {
        let mut summary = AdmissionSummary::default();
        let mut total_delay = 0;
        let mut max_delay = 0;

        for patient in &instance.patients {
            let day = document
                .record(&patient.id)
                .and_then(|r| r.admission_day.day());

            if patient.mandatory {
                summary.mandatory_total += 1;
            } else {
                summary.optional_total += 1;
            }
            let Some(day) = day else {
                continue;
            };

            if patient.mandatory {
                summary.mandatory_scheduled += 1;
                let delay = (day - patient.surgery_release_day).max(0);
                total_delay += delay;
                max_delay = max_delay.max(delay);
            } else {
                summary.optional_scheduled += 1;
            }
        }

        let grid = occupancy(instance, document);
        let mut mixed_age_room_days = 0;
        let mut occupied_bed_days = 0usize;
        for rooms in &grid {
            for occupants in rooms {
                occupied_bed_days += occupants.len();
                let groups: HashSet<&str> = occupants
                    .iter()
                    .map(|&p| instance.patients[p].age_group.as_str())
                    .collect();
                if groups.len() > 1 {
                    mixed_age_room_days += 1;
                }
            }
        }

        let available: i64 = instance.rooms.iter().map(|r| r.capacity).sum::<i64>() * instance.days;
        let bed_occupancy = if available <= 0 {
            0.0
        } else {
            occupied_bed_days as f64 / available as f64
        };

        Self {
            summary,
            total_delay,
            max_delay,
            mixed_age_room_days,
            bed_occupancy,
        }
    }

    /// Objective value of the plan under the given weights.
    ///
    /// Matches the model objective whenever every stay is visible to the
    /// presence table.
    pub fn objective(&self, weights: &Weights) -> i64 {
        weights.unscheduled_optional * self.summary.optional_scheduled as i64
            - weights.patient_delay * self.total_delay
            - weights.room_mixed_age * self.mixed_age_room_days as i64
    }

    /// Whether every mandatory patient is admitted.
    pub fn all_mandatory_admitted(&self) -> bool {
        self.summary.mandatory_scheduled == self.summary.mandatory_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Patient, PatientRecord, Room};

    fn instance() -> Instance {
        Instance::new(4)
            .with_room(Room::new("r0").with_capacity(2))
            .with_age_groups(["young", "old"])
            .with_patient(
                Patient::new("p0", Gender::Male)
                    .mandatory_within(1, 3)
                    .with_age_group("young"),
            )
            .with_patient(
                Patient::new("p1", Gender::Male)
                    .mandatory_within(0, 3)
                    .with_age_group("old")
                    .with_stay(2),
            )
            .with_patient(Patient::new("p2", Gender::Male).with_age_group("old"))
    }

    #[test]
    fn test_kpi_basic() {
        let plan = SolutionDocument {
            patients: vec![
                PatientRecord::admitted("p0", 3, "r0", "t0"),
                PatientRecord::admitted("p1", 2, "r0", "t0"),
                PatientRecord::unscheduled("p2"),
            ],
        };
        let kpi = PlanKpi::calculate(&instance(), &plan);

        assert_eq!(kpi.summary.mandatory_scheduled, 2);
        assert_eq!(kpi.summary.optional_scheduled, 0);
        assert_eq!(kpi.summary.optional_total, 1);
        // p0: 3 - 1, p1: 2 - 0
        assert_eq!(kpi.total_delay, 4);
        assert_eq!(kpi.max_delay, 2);
        // day 3: young p0 with old p1
        assert_eq!(kpi.mixed_age_room_days, 1);
        // 3 bed-days of 8
        assert!((kpi.bed_occupancy - 0.375).abs() < 1e-10);
        assert!(kpi.all_mandatory_admitted());
        assert_eq!(kpi.objective(&Weights::new(2, 5, 10)), -8 - 5);
    }

    #[test]
    fn test_kpi_optional_reward() {
        let plan = SolutionDocument {
            patients: vec![
                PatientRecord::admitted("p0", 1, "r0", "t0"),
                PatientRecord::admitted("p1", 2, "r0", "t0"),
                PatientRecord::admitted("p2", 0, "r0", "t0"),
            ],
        };
        let kpi = PlanKpi::calculate(&instance(), &plan);
        assert_eq!(kpi.summary.optional_scheduled, 1);
        assert_eq!(kpi.total_delay, 2);
        assert_eq!(kpi.mixed_age_room_days, 0);
        assert_eq!(kpi.objective(&Weights::new(1, 1, 10)), 10 - 2);
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = PlanKpi::calculate(&instance(), &SolutionDocument::default());
        assert_eq!(kpi.summary.mandatory_total, 2);
        assert_eq!(kpi.summary.mandatory_scheduled, 0);
        assert!(!kpi.all_mandatory_admitted());
        assert_eq!(kpi.total_delay, 0);
        assert!((kpi.bed_occupancy - 0.0).abs() < 1e-10);
    }
}
