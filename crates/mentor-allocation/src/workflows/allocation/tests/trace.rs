use super::common::*;
use crate::workflows::allocation::domain::{FieldValue, Mentor, Stage, Student};
use crate::workflows::allocation::trace::{build_trace, first_failing_stage, TraceOperator};

#[test]
fn trace_covers_all_eight_stages_in_canonical_order() {
    let policy = policy();
    let pool = vec![mentor("EMP-1", 1), mentor("EMP-2", 0)];

    let trace = build_trace(&student("S-1"), &pool, &policy);

    let stages: Vec<Stage> = trace.iter().map(|record| record.stage).collect();
    assert_eq!(stages, Stage::CANONICAL.to_vec());
    assert_eq!(trace[0].total_before, 2);
    assert_eq!(trace[6].total_after, 2);
    assert_eq!(trace[7].operator, TraceOperator::GreaterThan);
    assert_eq!(trace[7].total_after, 1);
    assert_eq!(trace[7].column, "remaining_capacity");
    assert!(trace.iter().all(|record| record.matched));
    assert_eq!(first_failing_stage(&trace), None);
}

#[test]
fn trace_keeps_counting_after_the_pool_empties() {
    let policy = policy();
    let pool = vec![Mentor::new(
        "EMP-1",
        profile_with(Stage::Gender, FieldValue::Int(0)),
        4,
    )];

    let trace = build_trace(&student("S-1"), &pool, &policy);

    assert_eq!(trace.len(), 8);
    assert_eq!(trace[1].total_after, 1);
    assert_eq!(trace[2].total_after, 0);
    assert!(!trace[2].matched);
    assert!(trace[3..].iter().all(|record| record.total_before == 0 && record.total_after == 0));
    assert_eq!(first_failing_stage(&trace), Some(Stage::Gender));
}

#[test]
fn trace_records_expected_values_and_columns() {
    let policy = policy();
    let pool = vec![mentor("EMP-1", 1)];

    let trace = build_trace(&student("S-7"), &pool, &policy);

    assert!(trace.iter().all(|record| record.student_id == "S-7"));
    assert_eq!(trace[0].column, "major_code");
    assert_eq!(trace[0].expected_value, "101");
    assert_eq!(trace[6].column, "school_code");
    assert_eq!(trace[6].expected_value, "5001");
    assert_eq!(trace[7].expected_value, "0");
}

#[test]
fn wildcard_school_is_marked_in_the_trace() {
    let policy = policy();
    let pool = vec![Mentor::new(
        "EMP-1",
        profile_with(Stage::School, FieldValue::Int(9999)),
        1,
    )];
    let candidate = Student::new("S-1", profile_with(Stage::School, FieldValue::Missing));

    let trace = build_trace(&candidate, &pool, &policy);

    assert_eq!(trace[6].expected_value, "*");
    assert_eq!(trace[6].total_after, 1);
}

#[test]
fn capacity_failure_is_attributed_to_the_gate() {
    let policy = policy();
    let pool = vec![mentor("EMP-1", 0), mentor("EMP-2", 0)];

    let trace = build_trace(&student("S-1"), &pool, &policy);

    assert_eq!(trace[6].total_after, 2);
    assert_eq!(first_failing_stage(&trace), Some(Stage::CapacityGate));
}
