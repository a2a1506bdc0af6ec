use serde::Serialize;

use super::capacity::has_remaining;
use super::domain::{Mentor, Stage, Student};
use super::policy::Policy;

/// Survivor count after one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub survivors: usize,
}

/// Result of running the eligibility filters for a single student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Pool indices that passed every eligibility stage.
    pub survivors: Vec<usize>,
    /// Counts for the stages that actually ran.
    pub stage_counts: Vec<StageCount>,
    /// Stage that emptied the candidate set, if any.
    pub exhausted_at: Option<Stage>,
}

/// Whether the school stage passes every candidate for this student.
pub fn school_is_wildcard(student: &Student, policy: &Policy) -> bool {
    policy.school_wildcard() && student.profile.get(Stage::School).is_missing_or_zero()
}

/// Predicate shared by the filter pipeline and the trace builder.
pub(crate) fn stage_admits(stage: Stage, mentor: &Mentor, student: &Student, policy: &Policy) -> bool {
    match stage {
        Stage::CapacityGate => has_remaining(mentor),
        Stage::School if school_is_wildcard(student, policy) => true,
        stage => student.profile.get(stage).matches(mentor.profile.get(stage)),
    }
}

/// Apply the seven eligibility filters in canonical order, stopping as soon
/// as the candidate set is empty.
pub fn filter_candidates(pool: &[Mentor], student: &Student, policy: &Policy) -> FilterOutcome {
    let mut survivors: Vec<usize> = (0..pool.len()).collect();
    let mut stage_counts = Vec::with_capacity(Stage::ELIGIBILITY.len());
    let mut exhausted_at = None;

    for stage in Stage::ELIGIBILITY {
        survivors.retain(|&index| stage_admits(stage, &pool[index], student, policy));
        stage_counts.push(StageCount {
            stage,
            survivors: survivors.len(),
        });

        if survivors.is_empty() {
            exhausted_at = Some(stage);
            break;
        }
    }

    FilterOutcome {
        survivors,
        stage_counts,
        exhausted_at,
    }
}
