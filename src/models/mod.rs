//! Admission scheduling domain models.
//!
//! Plain data types describing an instance and a plan. All types are
//! serde-(de)serializable and built with `with_*` methods.
//!
//! # Domain Mappings
//!
//! | u-admission | Meaning |
//! |-------------|---------|
//! | Patient | Person to admit, with stay length and one surgery |
//! | Room | Ward room with a bed capacity |
//! | Surgeon | Operates on admission day, bounded daily time |
//! | Instance | Horizon, patients, rooms, surgeons, age groups, weights |
//! | SolutionDocument | One record per patient: day and room, or `"none"` |

mod instance;
mod patient;
mod plan;
mod room;

pub use instance::{Instance, Weights};
pub use patient::{Gender, Patient};
pub use plan::{
    AdmissionDay, AdmissionSummary, PatientRecord, SolutionDocument, Violation, ViolationType,
    UNSCHEDULED_MARKER,
};
pub use room::{Room, Surgeon};
