//! Deterministic ranking of capacity-surviving candidates.
//!
//! Rules are applied sequentially: a later rule is only consulted when every
//! earlier rule ties. The sort is stable and the terminal rule (natural
//! mentor-id order or a digest of a stable token) never ties for distinct
//! mentors, so the winner does not depend on pool row order.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use super::domain::{Mentor, Student};
use super::policy::{FairnessStrategy, Policy, RankingRule, RankingRuleKind};

struct Candidate<'a> {
    index: usize,
    mentor: &'a Mentor,
    digest: Option<String>,
}

/// Sort candidate pool indices best-first according to the policy rules.
pub fn rank_candidates(
    pool: &[Mentor],
    candidates: &[usize],
    student: &Student,
    policy: &Policy,
) -> Vec<usize> {
    let fairness = policy.fairness();
    let mut ranked: Vec<Candidate<'_>> = candidates
        .iter()
        .map(|&index| Candidate {
            index,
            mentor: &pool[index],
            digest: fairness_digest(fairness, student, &pool[index]),
        })
        .collect();

    ranked.sort_by(|a, b| {
        policy
            .ranking_rules()
            .iter()
            .map(|rule| compare_by_rule(rule, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    ranked.into_iter().map(|candidate| candidate.index).collect()
}

/// Best candidate, or `None` when nothing survived the capacity gate.
pub fn select_winner(
    pool: &[Mentor],
    candidates: &[usize],
    student: &Student,
    policy: &Policy,
) -> Option<usize> {
    rank_candidates(pool, candidates, student, policy)
        .first()
        .copied()
}

/// Hex SHA-256 token used in place of the natural id order under the
/// digest fairness strategies.
pub fn fairness_digest(
    strategy: FairnessStrategy,
    student: &Student,
    mentor: &Mentor,
) -> Option<String> {
    let token = match strategy {
        FairnessStrategy::Deterministic => return None,
        FairnessStrategy::MentorDigest => mentor.id.clone(),
        FairnessStrategy::StudentDigest => format!("{}|{}", student.id, mentor.id),
    };
    Some(hex::encode(Sha256::digest(token.as_bytes())))
}

/// Exact comparison of `used / max(initial, 1)` without floating point.
pub fn compare_occupancy(a: &Mentor, b: &Mentor) -> Ordering {
    let left = i128::from(a.used_seats()) * i128::from(b.initial_capacity.max(1));
    let right = i128::from(b.used_seats()) * i128::from(a.initial_capacity.max(1));
    left.cmp(&right)
}

fn compare_by_rule(rule: &RankingRule, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    match rule.kind {
        RankingRuleKind::MinOccupancyRatio => compare_occupancy(a.mentor, b.mentor),
        RankingRuleKind::MaxRemainingCapacity => b
            .mentor
            .remaining_capacity
            .cmp(&a.mentor.remaining_capacity),
        RankingRuleKind::MinAllocationsNew => {
            a.mentor.allocations_new.cmp(&b.mentor.allocations_new)
        }
        RankingRuleKind::MinMentorId => a
            .digest
            .cmp(&b.digest)
            .then_with(|| a.mentor.sort_key.cmp(&b.mentor.sort_key)),
    }
}

/// Human-readable explanation of why the winner was chosen.
pub fn selection_reason(winner: &Mentor, candidate_count: usize, policy: &Policy) -> String {
    let mut reason = format!(
        "selected {} from {} candidate(s) by {}: occupancy {:.3}, remaining {}, allocations {}",
        winner.id,
        candidate_count,
        policy.ranking_chain(),
        winner.occupancy_ratio(),
        winner.remaining_capacity,
        winner.allocations_new
    );
    if policy.has_rule(RankingRuleKind::MaxRemainingCapacity) {
        reason.push_str("; capacity tie-break active");
    }
    reason
}
