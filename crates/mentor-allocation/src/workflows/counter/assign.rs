use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    AssignmentSource, CounterAssignment, CounterSummary, GenderSummary, NationalId,
    RegistrationId, RosterEntry, YearOffset, MAX_SEQUENCE,
};
use super::CounterError;
use crate::workflows::allocation::policy::{Gender, GenderCodes};

const MAX_DUPLICATE_SAMPLES: usize = 3;

/// Assigned ids in roster order plus per-gender totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterBatch {
    pub assignments: Vec<CounterAssignment>,
    pub summary: CounterSummary,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    next_sequence: u32,
    reused: usize,
    minted: usize,
    memoized: usize,
}

/// Mints and reuses registration ids for one academic year.
#[derive(Debug, Clone)]
pub struct CounterAssigner {
    academic_year: u16,
    year: YearOffset,
    codes: GenderCodes,
}

impl CounterAssigner {
    pub fn new(academic_year: u16, codes: GenderCodes) -> Result<Self, CounterError> {
        Ok(Self {
            academic_year,
            year: YearOffset::from_academic_year(academic_year)?,
            codes,
        })
    }

    /// Highest sequence already issued this year per gender, plus one.
    fn starting_buckets(&self, current_codes: &[String]) -> BTreeMap<Gender, Bucket> {
        let mut buckets: BTreeMap<Gender, Bucket> = Gender::ALL
            .into_iter()
            .map(|gender| {
                (
                    gender,
                    Bucket {
                        next_sequence: 1,
                        ..Bucket::default()
                    },
                )
            })
            .collect();

        let mut unparsed = 0usize;
        for raw in current_codes {
            let Some(issued) = RegistrationId::parse(raw) else {
                unparsed += 1;
                continue;
            };
            for (gender, bucket) in buckets.iter_mut() {
                if issued.has_prefix(self.year, self.codes.code_for(*gender)) {
                    bucket.next_sequence = bucket.next_sequence.max(u32::from(issued.sequence) + 1);
                }
            }
        }
        if unparsed > 0 {
            warn!(unparsed, "ignored current-year ids that are not nine digits");
        }
        buckets
    }

    /// Assign one id per roster row.
    ///
    /// Rows are visited in natural order of their national id so the result
    /// does not depend on input row order; the output keeps input order.
    pub fn assign(
        &self,
        roster: &[RosterEntry],
        prior: &BTreeMap<NationalId, String>,
        current_codes: &[String],
    ) -> Result<CounterBatch, CounterError> {
        info!(
            rows = roster.len(),
            prior = prior.len(),
            current = current_codes.len(),
            academic_year = self.academic_year,
            "counter assignment started"
        );
        let mut buckets = self.starting_buckets(current_codes);

        let mut order: Vec<usize> = (0..roster.len()).collect();
        order.sort_by_cached_key(|index| roster[*index].national_id.sort_key());

        let mut memo: HashMap<&NationalId, (String, Gender)> = HashMap::new();
        let mut slots: Vec<Option<CounterAssignment>> = vec![None; roster.len()];

        for index in order {
            let entry = &roster[index];
            let bucket = buckets.entry(entry.gender).or_default();

            let (registration_id, source) = if let Some((id, gender)) = memo.get(&entry.national_id) {
                if *gender != entry.gender {
                    warn!(
                        national_id = %entry.national_id,
                        row = entry.row,
                        "repeated identifier carries a different gender; keeping the first id"
                    );
                }
                bucket.memoized += 1;
                (id.clone(), AssignmentSource::Memoized)
            } else if let Some(id) = prior.get(&entry.national_id) {
                bucket.reused += 1;
                (id.clone(), AssignmentSource::PriorYear)
            } else {
                let sequence = u16::try_from(bucket.next_sequence)
                    .ok()
                    .filter(|sequence| *sequence <= MAX_SEQUENCE)
                    .ok_or(CounterError::SequenceOverflow {
                        gender: entry.gender,
                    })?;
                bucket.next_sequence += 1;
                bucket.minted += 1;
                let minted = RegistrationId {
                    year_offset: self.year.value(),
                    gender_code: self.codes.code_for(entry.gender),
                    sequence,
                };
                (minted.to_string(), AssignmentSource::Minted)
            };

            debug!(
                row = entry.row,
                registration_id = %registration_id,
                source = source.label(),
                "registration id assigned"
            );
            memo.entry(&entry.national_id)
                .or_insert_with(|| (registration_id.clone(), entry.gender));
            slots[index] = Some(CounterAssignment {
                row: entry.row,
                national_id: entry.national_id.clone(),
                gender: entry.gender,
                registration_id,
                source,
            });
        }

        let assignments: Vec<CounterAssignment> = slots.into_iter().flatten().collect();
        ensure_unique(&assignments)?;

        let summary = CounterSummary {
            academic_year: self.academic_year,
            year_offset: self.year,
            rows: assignments.len(),
            genders: buckets
                .into_iter()
                .map(|(gender, bucket)| GenderSummary {
                    gender,
                    gender_code: self.codes.code_for(gender),
                    reused: bucket.reused,
                    minted: bucket.minted,
                    memoized: bucket.memoized,
                    next_sequence: bucket.next_sequence,
                })
                .collect(),
        };
        info!(
            rows = summary.rows,
            minted = summary.genders.iter().map(|g| g.minted).sum::<usize>(),
            "counter assignment finished"
        );

        Ok(CounterBatch {
            assignments,
            summary,
        })
    }
}

/// Reject an id that was handed to two different national ids.
///
/// Reports up to three `(row, id)` samples of the later holders.
pub fn ensure_unique(assignments: &[CounterAssignment]) -> Result<(), CounterError> {
    let mut holders: HashMap<&str, &NationalId> = HashMap::new();
    let mut samples = Vec::new();

    for assignment in assignments {
        let holder = holders
            .entry(assignment.registration_id.as_str())
            .or_insert(&assignment.national_id);
        if *holder != &assignment.national_id {
            samples.push((assignment.row, assignment.registration_id.clone()));
            if samples.len() == MAX_DUPLICATE_SAMPLES {
                break;
            }
        }
    }

    if samples.is_empty() {
        Ok(())
    } else {
        Err(CounterError::DuplicateIdentifier { samples })
    }
}
