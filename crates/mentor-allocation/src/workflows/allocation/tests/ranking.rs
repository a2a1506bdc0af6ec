use std::cmp::Ordering;

use super::common::*;
use crate::workflows::allocation::domain::Mentor;
use crate::workflows::allocation::policy::FairnessStrategy;
use crate::workflows::allocation::ranking::{
    compare_occupancy, fairness_digest, rank_candidates, select_winner,
};

fn ids(pool: &[Mentor], order: &[usize]) -> Vec<String> {
    order.iter().map(|&index| pool[index].id.clone()).collect()
}

#[test]
fn lower_occupancy_wins_first() {
    let policy = policy();
    let mut busy = mentor("EMP-1", 4);
    busy.remaining_capacity = 1;
    let idle = mentor("EMP-9", 4);
    let pool = vec![busy, idle];

    let winner = select_winner(&pool, &[0, 1], &student("S-1"), &policy);

    assert_eq!(winner, Some(1));
}

#[test]
fn allocations_made_this_run_break_occupancy_ties() {
    let policy = policy();
    let mut first = mentor("EMP-1", 5);
    first.remaining_capacity = 3;
    first.allocations_new = 2;
    let mut second = mentor("EMP-2", 10);
    second.remaining_capacity = 6;
    let pool = vec![first, second];

    assert_eq!(compare_occupancy(&pool[0], &pool[1]), Ordering::Equal);
    let winner = select_winner(&pool, &[0, 1], &student("S-1"), &policy);
    assert_eq!(winner, Some(1));
}

#[test]
fn natural_order_breaks_full_ties() {
    let policy = policy();
    let pool = vec![mentor("EMP-10", 2), mentor("EMP-2", 2), mentor("EMP-9", 2)];

    let order = rank_candidates(&pool, &[0, 1, 2], &student("S-1"), &policy);

    assert_eq!(ids(&pool, &order), ["EMP-2", "EMP-9", "EMP-10"]);
}

#[test]
fn ranking_ignores_pool_row_order_under_ties() {
    let policy = policy();
    let forward = vec![mentor("EMP-3", 1), mentor("EMP-20", 1), mentor("EMP-1", 1)];
    let reversed: Vec<Mentor> = forward.iter().rev().cloned().collect();

    let forward_winner = select_winner(&forward, &[0, 1, 2], &student("S-1"), &policy)
        .map(|index| forward[index].id.clone());
    let reversed_winner = select_winner(&reversed, &[0, 1, 2], &student("S-1"), &policy)
        .map(|index| reversed[index].id.clone());

    assert_eq!(forward_winner.as_deref(), Some("EMP-1"));
    assert_eq!(forward_winner, reversed_winner);
}

#[test]
fn capacity_rule_prefers_larger_remaining_capacity() {
    let pool = vec![mentor("EMP-1", 1), mentor("EMP-2", 5)];

    let with_rule = select_winner(&pool, &[0, 1], &student("S-1"), &policy_with_capacity_rule());
    let without_rule = select_winner(&pool, &[0, 1], &student("S-1"), &policy());

    assert_eq!(with_rule, Some(1));
    assert_eq!(without_rule, Some(0));
}

#[test]
fn occupancy_uses_floored_denominator() {
    let empty = mentor("EMP-1", 0);
    let mut overbooked = mentor("EMP-2", 0);
    overbooked.remaining_capacity = -1;

    assert_eq!(compare_occupancy(&empty, &overbooked), Ordering::Less);
    assert_eq!(overbooked.occupancy_ratio(), 1.0);
}

#[test]
fn digest_fairness_is_reproducible() {
    let policy = policy_with(|document| {
        document["fairness_strategy"] = serde_json::Value::String("mentor_digest".into());
    });
    let pool = vec![mentor("EMP-1", 2), mentor("EMP-2", 2), mentor("EMP-3", 2)];

    let first = rank_candidates(&pool, &[0, 1, 2], &student("S-1"), &policy);
    let second = rank_candidates(&pool, &[2, 1, 0], &student("S-1"), &policy);

    assert_eq!(ids(&pool, &first), ids(&pool, &second));

    let digest = fairness_digest(FairnessStrategy::MentorDigest, &student("S-1"), &pool[0])
        .expect("digest strategy yields a token");
    assert_eq!(digest.len(), 64);
    assert_eq!(
        fairness_digest(FairnessStrategy::Deterministic, &student("S-1"), &pool[0]),
        None
    );
}

#[test]
fn student_digest_depends_on_the_student() {
    let pool = vec![mentor("EMP-1", 2)];
    let left = fairness_digest(FairnessStrategy::StudentDigest, &student("S-1"), &pool[0]);
    let right = fairness_digest(FairnessStrategy::StudentDigest, &student("S-2"), &pool[0]);

    assert_ne!(left, right);
}

#[test]
fn empty_candidate_set_has_no_winner() {
    let policy = policy();
    let pool = vec![mentor("EMP-1", 2)];

    assert_eq!(select_winner(&pool, &[], &student("S-1"), &policy), None);
}
