//! Solution decoding.
//!
//! Reads the decision variables of a solved model back into the output
//! document. Values are only read when the engine reported a solution.

use thiserror::Error;

use super::DecisionVars;
use crate::cp::{CpSolution, SolveStatus, VarId};
use crate::models::{AdmissionSummary, Instance, PatientRecord, SolutionDocument};

/// Why a solution could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The engine found nothing to decode.
    #[error("no solution to decode (status {0:?})")]
    NoSolution(SolveStatus),
    /// The solution lacks a decision variable.
    #[error("solution has no value for variable #{0}")]
    MissingValue(usize),
    /// A room value outside the instance's room list.
    #[error("patient '{patient}' assigned to room index {index}, instance has {rooms} rooms")]
    RoomOutOfRange {
        patient: String,
        index: i64,
        rooms: usize,
    },
}

/// Decodes the output document and admission counts.
pub fn decode(
    instance: &Instance,
    vars: &[DecisionVars],
    solution: &CpSolution,
    operating_theater: &str,
) -> Result<(SolutionDocument, AdmissionSummary), DecodeError> {
    if !solution.is_solution_found() {
        return Err(DecodeError::NoSolution(solution.status));
    }
    let value = |id: VarId| solution.value(id).ok_or(DecodeError::MissingValue(id.index()));

    let mut document = SolutionDocument::default();
    let mut summary = AdmissionSummary::default();

    for (patient, dv) in instance.patients.iter().zip(vars) {
        let scheduled = value(dv.scheduled.id())? != 0;

        if patient.mandatory {
            summary.mandatory_total += 1;
            summary.mandatory_scheduled += usize::from(scheduled);
        } else {
            summary.optional_total += 1;
            summary.optional_scheduled += usize::from(scheduled);
        }

        if !scheduled {
            document.patients.push(PatientRecord::unscheduled(&patient.id));
            continue;
        }

        let day = value(dv.admission_day.id())?;
        let index = value(dv.room.id())?;
        let room = usize::try_from(index)
            .ok()
            .and_then(|i| instance.rooms.get(i))
            .ok_or_else(|| DecodeError::RoomOutOfRange {
                patient: patient.id.clone(),
                index,
                rooms: instance.rooms.len(),
            })?;
        document.patients.push(PatientRecord::admitted(
            &patient.id,
            day,
            &room.id,
            operating_theater,
        ));
    }

    Ok((document, summary))
}
