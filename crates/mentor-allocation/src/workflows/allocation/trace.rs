use serde::Serialize;

use super::domain::{Mentor, Stage, Student};
use super::filters::{school_is_wildcard, stage_admits, StageCount};
use super::policy::Policy;

/// Expected-value marker for a school stage that passes everything.
pub const WILDCARD_MARKER: &str = "*";

/// Comparison applied at a trace stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceOperator {
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = ">")]
    GreaterThan,
}

/// One explainability row per (student, stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub student_id: String,
    pub stage: Stage,
    pub column: String,
    pub operator: TraceOperator,
    pub expected_value: String,
    pub total_before: usize,
    pub total_after: usize,
    pub matched: bool,
}

/// Recompute survivor counts for all eight stages against the original pool.
///
/// This never reuses the filter pipeline's intermediate state: it runs every
/// stage, including those after the candidate set is already empty, so the
/// trace is complete even when the fast path short-circuits.
pub fn build_trace(student: &Student, pool: &[Mentor], policy: &Policy) -> Vec<TraceRecord> {
    let mut current: Vec<&Mentor> = pool.iter().collect();
    let mut records = Vec::with_capacity(Stage::CANONICAL.len());

    for stage in Stage::CANONICAL {
        let total_before = current.len();
        current.retain(|mentor| stage_admits(stage, mentor, student, policy));
        let total_after = current.len();

        let (operator, expected_value) = match stage {
            Stage::CapacityGate => (TraceOperator::GreaterThan, "0".to_string()),
            Stage::School if school_is_wildcard(student, policy) => {
                (TraceOperator::Equals, WILDCARD_MARKER.to_string())
            }
            stage => (TraceOperator::Equals, student.profile.get(stage).to_string()),
        };

        records.push(TraceRecord {
            student_id: student.id.clone(),
            stage,
            column: policy.stage_column(stage).to_string(),
            operator,
            expected_value,
            total_before,
            total_after,
            matched: total_after > 0,
        });
    }

    records
}

/// First stage, in canonical order, whose survivor count fell to zero.
pub fn first_failing_stage(trace: &[TraceRecord]) -> Option<Stage> {
    trace
        .iter()
        .find(|record| record.total_after == 0)
        .map(|record| record.stage)
}

/// Survivor counts per stage, in the same shape the filter pipeline reports.
pub fn stage_counts(trace: &[TraceRecord]) -> Vec<StageCount> {
    trace
        .iter()
        .map(|record| StageCount {
            stage: record.stage,
            survivors: record.total_after,
        })
        .collect()
}
