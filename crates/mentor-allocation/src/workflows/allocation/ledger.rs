use serde::Serialize;

use super::domain::Mentor;
use super::AllocationError;

/// Remaining capacity of one mentor around a committed allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityChange {
    pub before: i64,
    pub after: i64,
}

/// Batch-scoped owner of the working copy of the mentor pool.
///
/// Every other component borrows [`CapacityLedger::pool`] immutably;
/// [`CapacityLedger::commit`] is the only way mentor state changes.
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    pool: Vec<Mentor>,
}

impl CapacityLedger {
    pub fn new(pool: Vec<Mentor>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &[Mentor] {
        &self.pool
    }

    /// Consume one seat from the mentor at `index`.
    pub fn commit(&mut self, index: usize) -> Result<CapacityChange, AllocationError> {
        let mentor = self
            .pool
            .get_mut(index)
            .ok_or(AllocationError::UnknownCandidate { index })?;

        let before = mentor.remaining_capacity;
        if before <= 0 {
            return Err(AllocationError::CapacityUnderflow {
                mentor_id: mentor.id.clone(),
                remaining: before,
            });
        }

        mentor.remaining_capacity = before - 1;
        mentor.allocations_new += 1;

        Ok(CapacityChange {
            before,
            after: mentor.remaining_capacity,
        })
    }

    pub fn into_pool(self) -> Vec<Mentor> {
        self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::allocation::domain::EligibilityProfile;

    #[test]
    fn commit_decrements_by_exactly_one() {
        let mut ledger = CapacityLedger::new(vec![Mentor::new(
            "EMP-1",
            EligibilityProfile::default(),
            2,
        )]);

        let change = ledger.commit(0).expect("first seat");
        assert_eq!(change, CapacityChange { before: 2, after: 1 });
        assert_eq!(ledger.pool()[0].allocations_new, 1);
    }

    #[test]
    fn commit_rejects_exhausted_mentor() {
        let mut ledger = CapacityLedger::new(vec![Mentor::new(
            "EMP-1",
            EligibilityProfile::default(),
            1,
        )]);
        ledger.commit(0).expect("only seat");

        match ledger.commit(0) {
            Err(AllocationError::CapacityUnderflow { mentor_id, remaining }) => {
                assert_eq!(mentor_id, "EMP-1");
                assert_eq!(remaining, 0);
            }
            other => panic!("expected underflow, got {other:?}"),
        }
        assert_eq!(ledger.pool()[0].remaining_capacity, 0);
    }
}
