use chrono::Utc;
use tracing::{debug, info};

use super::capacity::capacity_gate;
use super::columns::{load_pool, load_students};
use super::domain::{Mentor, Stage, Student};
use super::filters::filter_candidates;
use super::ledger::CapacityLedger;
use super::outcome::{
    AllocationLogEntry, AllocationRecord, AllocationStatus, BatchOutcome, BatchSummary,
    FailureKind,
};
use super::policy::Policy;
use super::ranking::{rank_candidates, selection_reason};
use super::table::Table;
use super::trace::{build_trace, first_failing_stage, stage_counts};
use super::AllocationError;

/// Receives `(percent, message)` at batch start, after each student and at
/// completion. Called synchronously on the allocating thread.
pub trait ProgressReporter {
    fn report(&mut self, percent: u8, message: &str);
}

/// Progress sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&mut self, _percent: u8, _message: &str) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(u8, &str),
{
    fn report(&mut self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Outcome of the single-student algorithm before anything is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationDecision {
    Selected {
        mentor_index: usize,
        candidate_count: usize,
    },
    Failed {
        kind: FailureKind,
        failed_stage: Stage,
    },
}

/// Stateless allocator parameterised by a borrowed policy.
pub struct AllocationEngine<'p> {
    policy: &'p Policy,
}

impl<'p> AllocationEngine<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        self.policy
    }

    /// Filter, gate and rank for one student against a read-only pool view.
    pub fn decide(&self, student: &Student, pool: &[Mentor]) -> AllocationDecision {
        let filtered = filter_candidates(pool, student, self.policy);
        if let Some(stage) = filtered.exhausted_at {
            return AllocationDecision::Failed {
                kind: FailureKind::EligibilityNoMatch,
                failed_stage: stage,
            };
        }

        let with_capacity = capacity_gate(pool, &filtered.survivors);
        if with_capacity.is_empty() {
            return AllocationDecision::Failed {
                kind: FailureKind::CapacityFull,
                failed_stage: Stage::CapacityGate,
            };
        }

        let ranked = rank_candidates(pool, &with_capacity, student, self.policy);
        AllocationDecision::Selected {
            mentor_index: ranked[0],
            candidate_count: ranked.len(),
        }
    }

    /// Resolve both tables once, then run the batch.
    pub fn run_tables(
        &self,
        students: &Table,
        pool: &Table,
        progress: &mut dyn ProgressReporter,
    ) -> Result<BatchOutcome, AllocationError> {
        let students = load_students(students, self.policy)?;
        let pool = load_pool(pool, self.policy)?;
        self.run_batch(&students, pool, progress)
    }

    /// Allocate every student in input order against a batch-owned pool.
    ///
    /// Per-student eligibility and capacity failures become failed log
    /// entries; ledger invariant violations abort the batch.
    pub fn run_batch(
        &self,
        students: &[Student],
        pool: Vec<Mentor>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<BatchOutcome, AllocationError> {
        let started_at = Utc::now();
        let total = students.len();
        info!(
            students = total,
            mentors = pool.len(),
            policy_version = %self.policy.version(),
            "allocation batch started"
        );
        progress.report(0, &format!("allocation started: {total} student(s)"));

        let mut ledger = CapacityLedger::new(pool);
        let mut allocations = Vec::new();
        let mut logs = Vec::with_capacity(total);
        let mut trace = Vec::with_capacity(total * Stage::CANONICAL.len());

        for (row_index, student) in students.iter().enumerate() {
            let student_trace = build_trace(student, ledger.pool(), self.policy);
            let decision = self.decide(student, ledger.pool());

            let entry = match decision {
                AllocationDecision::Selected {
                    mentor_index,
                    candidate_count,
                } => {
                    let reason =
                        selection_reason(&ledger.pool()[mentor_index], candidate_count, self.policy);
                    let change = ledger.commit(mentor_index)?;
                    let mentor_id = ledger.pool()[mentor_index].id.clone();
                    debug!(student = %student.id, mentor = %mentor_id, "allocated");

                    allocations.push(AllocationRecord {
                        student_id: student.id.clone(),
                        mentor_id: mentor_id.clone(),
                    });
                    AllocationLogEntry {
                        row_index,
                        student_id: student.id.clone(),
                        status: AllocationStatus::Success,
                        mentor_id: Some(mentor_id),
                        candidate_count,
                        stage_counts: stage_counts(&student_trace),
                        failed_stage: None,
                        capacity_before: Some(change.before),
                        capacity_after: Some(change.after),
                        selection_reason: Some(reason),
                        error: None,
                        detailed_reason: None,
                        suggested_actions: Vec::new(),
                    }
                }
                AllocationDecision::Failed { kind, failed_stage } => {
                    debug_assert_eq!(first_failing_stage(&student_trace), Some(failed_stage));
                    let column = self.policy.stage_column(failed_stage);
                    let expected = student_trace
                        .iter()
                        .find(|record| record.stage == failed_stage)
                        .map(|record| record.expected_value.as_str())
                        .unwrap_or_default();
                    debug!(
                        student = %student.id,
                        error = kind.code(),
                        stage = %failed_stage,
                        "allocation failed"
                    );

                    AllocationLogEntry {
                        row_index,
                        student_id: student.id.clone(),
                        status: AllocationStatus::Failed,
                        mentor_id: None,
                        candidate_count: 0,
                        stage_counts: stage_counts(&student_trace),
                        failed_stage: Some(failed_stage),
                        capacity_before: None,
                        capacity_after: None,
                        selection_reason: None,
                        error: Some(kind),
                        detailed_reason: Some(kind.summary(failed_stage, column, expected)),
                        suggested_actions: kind.remediation(failed_stage, column),
                    }
                }
            };

            logs.push(entry);
            trace.extend(student_trace);

            let percent = ((row_index + 1) * 100 / total.max(1)) as u8;
            progress.report(
                percent.min(99),
                &format!("processed {}/{} student(s)", row_index + 1, total),
            );
        }

        let pool = ledger.into_pool();
        let summary = BatchSummary {
            policy_version: self.policy.version().to_string(),
            students: total,
            allocated: allocations.len(),
            eligibility_no_match: count_failures(&logs, FailureKind::EligibilityNoMatch),
            capacity_full: count_failures(&logs, FailureKind::CapacityFull),
            mentors: pool.len(),
            remaining_capacity: pool
                .iter()
                .map(|mentor| mentor.remaining_capacity.max(0))
                .sum(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            allocated = summary.allocated,
            eligibility_no_match = summary.eligibility_no_match,
            capacity_full = summary.capacity_full,
            "allocation batch finished"
        );
        progress.report(100, "allocation complete");

        Ok(BatchOutcome {
            allocations,
            pool,
            logs,
            trace,
            summary,
        })
    }
}

fn count_failures(logs: &[AllocationLogEntry], kind: FailureKind) -> usize {
    logs.iter().filter(|entry| entry.error == Some(kind)).count()
}
