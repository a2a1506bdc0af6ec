//! Mentor allocation: eligibility filters, capacity gate, deterministic
//! ranking, capacity ledger and the per-decision explainability trace.

pub mod capacity;
pub mod columns;
pub mod domain;
pub mod engine;
pub mod export;
pub mod filters;
pub mod ledger;
pub mod outcome;
pub mod policy;
pub mod ranking;
pub mod table;
pub mod trace;

#[cfg(test)]
mod tests;

pub use capacity::{capacity_gate, coerce_capacity, CapacityCoercionError};
pub use columns::{load_pool, load_students, ColumnMap, Field};
pub use domain::{EligibilityProfile, FieldValue, Mentor, Stage, Student};
pub use engine::{AllocationDecision, AllocationEngine, NoopProgress, ProgressReporter};
pub use filters::{filter_candidates, FilterOutcome, StageCount};
pub use ledger::{CapacityChange, CapacityLedger};
pub use outcome::{
    AllocationLogEntry, AllocationRecord, AllocationStatus, BatchOutcome, BatchSummary,
    FailureKind,
};
pub use policy::{
    FairnessStrategy, Gender, GenderCodes, Policy, PolicyError, PolicyLoadMode, PolicyStore,
    RankingRule, RankingRuleKind,
};
pub use ranking::{rank_candidates, select_winner};
pub use table::{Table, TableKind};
pub use trace::{build_trace, first_failing_stage, TraceRecord};

/// Fatal errors that abort an allocation batch.
///
/// Per-student "no match" and "no capacity" outcomes are not errors; they are
/// recorded on the log as [`FailureKind`] values.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error(
        "{table} table is missing required column '{column}' (accepted: {})",
        .accepted.join(", ")
    )]
    DataMissing {
        table: TableKind,
        column: String,
        accepted: Vec<String>,
    },
    #[error("{table} row {row} has a blank identifier")]
    BlankIdentifier { table: TableKind, row: usize },
    #[error("mentor '{mentor_id}' appears more than once in the pool")]
    DuplicateMentor { mentor_id: String },
    #[error("mentor '{mentor_id}' has an invalid capacity: {source}")]
    InvalidCapacity {
        mentor_id: String,
        #[source]
        source: CapacityCoercionError,
    },
    #[error("capacity underflow: mentor '{mentor_id}' has {remaining} remaining seat(s)")]
    CapacityUnderflow { mentor_id: String, remaining: i64 },
    #[error("candidate index {index} is outside the pool")]
    UnknownCandidate { index: usize },
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("failed to read table: {0}")]
    Csv(#[from] csv::Error),
}
