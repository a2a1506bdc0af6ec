//! Registration-id ("counter") assignment for newly processed students.

pub mod assign;
pub mod domain;
pub mod roster;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::fmt;

pub use assign::{ensure_unique, CounterAssigner, CounterBatch};
pub use domain::{
    AssignmentSource, CounterAssignment, CounterSummary, GenderSummary, NationalId,
    RegistrationId, RosterEntry, YearOffset,
};
pub use roster::{load_current_codes, load_prior_roster, load_roster};

use crate::workflows::allocation::policy::Gender;

/// Which roster a row or column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterKind {
    Students,
    PriorYear,
    CurrentYear,
}

impl RosterKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::PriorYear => "prior-year",
            Self::CurrentYear => "current-year",
        }
    }
}

impl fmt::Display for RosterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("academic year {year} is outside 1350..=1449")]
    InvalidYear { year: u16 },
    #[error("sequence overflow: no free registration sequence left for {} students", .gender.label())]
    SequenceOverflow { gender: Gender },
    #[error("duplicate registration ids assigned: {}", format_samples(.samples))]
    DuplicateIdentifier { samples: Vec<(usize, String)> },
    #[error("{roster} roster row {row} has an invalid national id '{value}'")]
    InvalidNationalId {
        roster: RosterKind,
        row: usize,
        value: String,
    },
    #[error("students roster row {row} has an unknown gender '{value}' (expected 0 or 1)")]
    UnknownGender { row: usize, value: String },
    #[error(
        "{roster} roster is missing required column '{column}' (accepted: {})",
        .accepted.join(", ")
    )]
    DataMissing {
        roster: RosterKind,
        column: &'static str,
        accepted: Vec<String>,
    },
    #[error("failed to read roster: {0}")]
    Csv(#[from] csv::Error),
}

fn format_samples(samples: &[(usize, String)]) -> String {
    samples
        .iter()
        .map(|(index, id)| format!("row {index}: {id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
