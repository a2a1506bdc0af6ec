use mentor_allocation::workflows::allocation::export::{write_log, write_pool, write_trace};
use mentor_allocation::workflows::allocation::{
    AllocationEngine, BatchOutcome, FailureKind, NoopProgress, Policy, PolicyLoadMode,
    PolicyStore, Stage, Table,
};

const POLICY: &str = include_str!("fixtures/policy.json");
const STUDENTS: &str = include_str!("fixtures/students.csv");
const POOL: &str = include_str!("fixtures/pool.csv");

fn fixture_policy() -> Policy {
    Policy::from_json_str(POLICY, PolicyLoadMode::Strict).expect("fixture policy is valid")
}

fn run_fixture_batch(policy: &Policy) -> BatchOutcome {
    let students = Table::from_reader(STUDENTS.as_bytes()).expect("students parse");
    let pool = Table::from_reader(POOL.as_bytes()).expect("pool parses");
    AllocationEngine::new(policy)
        .run_tables(&students, &pool, &mut NoopProgress)
        .expect("batch runs")
}

fn mentor_for<'a>(outcome: &'a BatchOutcome, student_id: &str) -> Option<&'a str> {
    outcome
        .allocations
        .iter()
        .find(|record| record.student_id == student_id)
        .map(|record| record.mentor_id.as_str())
}

#[test]
fn fixture_batch_allocates_and_classifies_failures() {
    let policy = fixture_policy();
    let outcome = run_fixture_batch(&policy);

    assert_eq!(mentor_for(&outcome, "S-01"), Some("EMP-2"));
    assert_eq!(mentor_for(&outcome, "S-02"), Some("EMP-10"));
    assert_eq!(
        mentor_for(&outcome, "S-03"),
        Some("EMP-2"),
        "blank school code is a wildcard and EMP-2 wins the natural-order tie"
    );
    assert_eq!(mentor_for(&outcome, "S-04"), Some("EMP-7"));

    let failures: Vec<(&str, Option<FailureKind>, Option<Stage>)> = outcome
        .logs
        .iter()
        .filter(|entry| !entry.is_success())
        .map(|entry| (entry.student_id.as_str(), entry.error, entry.failed_stage))
        .collect();
    assert_eq!(
        failures,
        [
            ("S-05", Some(FailureKind::CapacityFull), Some(Stage::CapacityGate)),
            ("S-06", Some(FailureKind::CapacityFull), Some(Stage::CapacityGate)),
            ("S-07", Some(FailureKind::EligibilityNoMatch), Some(Stage::Type)),
        ]
    );

    let summary = &outcome.summary;
    assert_eq!(summary.students, 7);
    assert_eq!(summary.allocated, 4);
    assert_eq!(summary.capacity_full, 2);
    assert_eq!(summary.eligibility_no_match, 1);
    assert_eq!(summary.remaining_capacity, 2);
    assert_eq!(summary.policy_version, "1.2.0");
}

#[test]
fn fixture_trace_covers_every_stage_for_every_student() {
    let policy = fixture_policy();
    let outcome = run_fixture_batch(&policy);

    assert_eq!(outcome.trace.len(), 7 * 8);
    let school = outcome
        .trace
        .iter()
        .find(|record| record.student_id == "S-03" && record.stage == Stage::School)
        .expect("school stage traced");
    assert_eq!(school.expected_value, "*");
    assert_eq!(school.total_before, school.total_after);

    let mut buffer = Vec::new();
    write_trace(&mut buffer, &outcome.trace).expect("trace writes");
    let text = String::from_utf8(buffer).expect("utf-8 output");
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("student_id,stage,column,operator,expected_value,total_before,total_after,matched")
    );
    assert_eq!(
        lines.next(),
        Some("S-01,type,major_code,==,101,4,3,true")
    );
}

#[test]
fn exported_outputs_are_identical_across_runs() {
    let policy = fixture_policy();

    let render = |outcome: &BatchOutcome| {
        let mut pool = Vec::new();
        let mut log = Vec::new();
        write_pool(&mut pool, &outcome.pool).expect("pool writes");
        write_log(&mut log, &outcome.logs).expect("log writes");
        (pool, log)
    };

    let first = render(&run_fixture_batch(&policy));
    let second = render(&run_fixture_batch(&policy));
    assert_eq!(first, second);

    let pool = String::from_utf8(first.0).expect("utf-8 pool");
    assert!(pool.contains("EMP-2,0,2,2,1.000000"));
    assert!(pool.contains("EMP-10,2,4,1,0.500000"));
}

#[test]
fn policy_store_feeds_the_engine_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("policy.json");
    std::fs::write(&path, POLICY).expect("write policy");

    let mut store = PolicyStore::new(&path, PolicyLoadMode::Strict);
    let policy = store.load().expect("policy loads");
    let outcome = run_fixture_batch(&policy);

    assert_eq!(outcome.summary.allocated, 4);
    assert!(std::sync::Arc::ptr_eq(
        &policy,
        &store.load().expect("cached policy")
    ));
}
