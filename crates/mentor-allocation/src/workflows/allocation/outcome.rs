use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Mentor, Stage};
use super::filters::StageCount;
use super::trace::TraceRecord;

/// Machine-readable classification of a failed allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The eligibility filters emptied the pool before the capacity gate.
    EligibilityNoMatch,
    /// Eligible mentors exist but none has a free seat.
    CapacityFull,
}

impl FailureKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::EligibilityNoMatch => "ELIGIBILITY_NO_MATCH",
            Self::CapacityFull => "CAPACITY_FULL",
        }
    }

    pub fn summary(self, stage: Stage, column: &str, expected: &str) -> String {
        match self {
            Self::EligibilityNoMatch => format!(
                "no mentor matches {} ('{}' == '{}')",
                stage, column, expected
            ),
            Self::CapacityFull => {
                "eligible mentors exist but none has remaining capacity".to_string()
            }
        }
    }

    pub fn remediation(self, stage: Stage, column: &str) -> Vec<String> {
        match self {
            Self::EligibilityNoMatch => vec![
                format!("verify the student's '{column}' value"),
                format!("add or activate a mentor covering this {stage} value"),
            ],
            Self::CapacityFull => vec![
                "raise the remaining capacity of an eligible mentor".to_string(),
                "re-run the student in a later batch after capacity is released".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Success,
    Failed,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Student ↔ mentor pair produced by a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRecord {
    pub student_id: String,
    pub mentor_id: String,
}

/// One log entry per student, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationLogEntry {
    pub row_index: usize,
    pub student_id: String,
    pub status: AllocationStatus,
    pub mentor_id: Option<String>,
    pub candidate_count: usize,
    pub stage_counts: Vec<StageCount>,
    pub failed_stage: Option<Stage>,
    pub capacity_before: Option<i64>,
    pub capacity_after: Option<i64>,
    pub selection_reason: Option<String>,
    pub error: Option<FailureKind>,
    pub detailed_reason: Option<String>,
    pub suggested_actions: Vec<String>,
}

impl AllocationLogEntry {
    pub fn is_success(&self) -> bool {
        self.status == AllocationStatus::Success
    }
}

/// Aggregate numbers for a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub policy_version: String,
    pub students: usize,
    pub allocated: usize,
    pub eligibility_no_match: usize,
    pub capacity_full: usize,
    pub mentors: usize,
    pub remaining_capacity: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// The four aligned outputs of a batch plus its summary.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub allocations: Vec<AllocationRecord>,
    pub pool: Vec<Mentor>,
    pub logs: Vec<AllocationLogEntry>,
    pub trace: Vec<TraceRecord>,
    pub summary: BatchSummary,
}
