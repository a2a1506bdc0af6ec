use std::collections::BTreeMap;

use crate::workflows::allocation::policy::{Gender, GenderCodes};
use crate::workflows::counter::assign::CounterAssigner;
use crate::workflows::counter::domain::{NationalId, RosterEntry};

pub(super) const ACADEMIC_YEAR: u16 = 1404;

pub(super) fn assigner() -> CounterAssigner {
    CounterAssigner::new(ACADEMIC_YEAR, GenderCodes::default()).expect("valid academic year")
}

pub(super) fn national_id(raw: &str) -> NationalId {
    NationalId::parse(raw).expect("valid national id")
}

/// Roster rows numbered from 1 in the given order.
pub(super) fn roster(rows: &[(&str, Gender)]) -> Vec<RosterEntry> {
    rows.iter()
        .enumerate()
        .map(|(index, (raw, gender))| RosterEntry {
            row: index + 1,
            national_id: national_id(raw),
            gender: *gender,
        })
        .collect()
}

pub(super) fn prior(rows: &[(&str, &str)]) -> BTreeMap<NationalId, String> {
    rows.iter()
        .map(|(raw, issued)| (national_id(raw), issued.to_string()))
        .collect()
}

pub(super) fn codes(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
