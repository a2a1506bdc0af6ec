//! Column resolution and row conversion for counter rosters.

use std::collections::BTreeMap;

use tracing::warn;

use super::domain::{NationalId, RosterEntry};
use super::{CounterError, RosterKind};
use crate::workflows::allocation::domain::FieldValue;
use crate::workflows::allocation::policy::Gender;
use crate::workflows::allocation::table::Table;
use crate::workflows::normalizer::{is_blank_sentinel, normalize_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RosterField {
    NationalId,
    Gender,
    Counter,
}

impl RosterField {
    const fn canonical(self) -> &'static str {
        match self {
            Self::NationalId => "national_id",
            Self::Gender => "gender",
            Self::Counter => "counter",
        }
    }

    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::NationalId => &["national_id", "student_id", "کد ملی", "کدملی"],
            Self::Gender => &["gender", "sex", "جنسیت"],
            Self::Counter => &[
                "counter",
                "registration_id",
                "student_code",
                "شمارنده",
                "کد ثبت نام",
            ],
        }
    }

    fn locate(self, table: &Table, roster: RosterKind) -> Result<usize, CounterError> {
        table
            .headers()
            .iter()
            .position(|header| {
                let header = normalize_name(header);
                self.synonyms()
                    .iter()
                    .any(|name| normalize_name(name) == header)
            })
            .ok_or_else(|| CounterError::DataMissing {
                roster,
                column: self.canonical(),
                accepted: self.synonyms().iter().map(|name| name.to_string()).collect(),
            })
    }
}

/// Students awaiting an id, in input order.
pub fn load_roster(table: &Table) -> Result<Vec<RosterEntry>, CounterError> {
    let roster = RosterKind::Students;
    let id_column = RosterField::NationalId.locate(table, roster)?;
    let gender_column = RosterField::Gender.locate(table, roster)?;

    (0..table.len())
        .map(|index| {
            let row = index + 1;
            let raw_id = table.cell(index, id_column);
            let national_id = NationalId::parse(raw_id).ok_or_else(|| {
                CounterError::InvalidNationalId {
                    roster,
                    row,
                    value: raw_id.to_string(),
                }
            })?;
            let raw_gender = table.cell(index, gender_column);
            let gender = parse_gender(raw_gender).ok_or_else(|| CounterError::UnknownGender {
                row,
                value: raw_gender.to_string(),
            })?;
            Ok(RosterEntry {
                row,
                national_id,
                gender,
            })
        })
        .collect()
}

/// Prior-year issued ids keyed by normalised national id.
///
/// Rows with a blank id or counter carry nothing to reuse and are skipped.
pub fn load_prior_roster(table: &Table) -> Result<BTreeMap<NationalId, String>, CounterError> {
    let roster = RosterKind::PriorYear;
    let id_column = RosterField::NationalId.locate(table, roster)?;
    let counter_column = RosterField::Counter.locate(table, roster)?;

    let mut issued = BTreeMap::new();
    for index in 0..table.len() {
        let raw_id = table.cell(index, id_column);
        let counter = table.cell(index, counter_column);
        if is_blank_sentinel(raw_id) || is_blank_sentinel(counter) {
            continue;
        }
        let national_id =
            NationalId::parse(raw_id).ok_or_else(|| CounterError::InvalidNationalId {
                roster,
                row: index + 1,
                value: raw_id.to_string(),
            })?;
        if let Some(previous) = issued.insert(national_id.clone(), counter.to_string()) {
            if previous != counter {
                warn!(
                    national_id = %national_id,
                    kept = counter,
                    replaced = %previous,
                    "prior-year roster lists the same identifier twice"
                );
            }
        }
    }
    Ok(issued)
}

/// Ids already issued this year; only their sequences matter.
pub fn load_current_codes(table: &Table) -> Result<Vec<String>, CounterError> {
    let counter_column = RosterField::Counter.locate(table, RosterKind::CurrentYear)?;
    Ok((0..table.len())
        .map(|index| table.cell(index, counter_column))
        .filter(|counter| !is_blank_sentinel(counter))
        .map(str::to_string)
        .collect())
}

fn parse_gender(raw: &str) -> Option<Gender> {
    match FieldValue::parse(raw) {
        FieldValue::Int(value) => u8::try_from(value).ok().and_then(Gender::from_code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(raw: &str) -> Table {
        Table::from_reader(Cursor::new(raw.to_string())).expect("roster parses")
    }

    #[test]
    fn roster_accepts_persian_headers_and_digits() {
        let entries = load_roster(&table("کد ملی,جنسیت\n۱۲۳۴۵۶۷۸۹۰,۰\n12345678,1.0\n"))
            .expect("roster loads");

        assert_eq!(entries[0].national_id.as_str(), "1234567890");
        assert_eq!(entries[0].gender, Gender::Female);
        assert_eq!(entries[1].national_id.as_str(), "0012345678");
        assert_eq!(entries[1].gender, Gender::Male);
        assert_eq!(entries[1].row, 2);
    }

    #[test]
    fn invalid_rows_are_named() {
        match load_roster(&table("national_id,gender\n1234567890,1\n,0\n")) {
            Err(CounterError::InvalidNationalId { roster, row, .. }) => {
                assert_eq!(roster, RosterKind::Students);
                assert_eq!(row, 2);
            }
            other => panic!("expected invalid national id, got {other:?}"),
        }
        assert!(matches!(
            load_roster(&table("national_id,gender\n1234567890,2\n")),
            Err(CounterError::UnknownGender { row: 1, .. })
        ));
    }

    #[test]
    fn missing_column_lists_synonyms() {
        match load_roster(&table("national_id,name\n1234567890,Sara\n")) {
            Err(CounterError::DataMissing { column, accepted, .. }) => {
                assert_eq!(column, "gender");
                assert!(accepted.iter().any(|name| name == "جنسیت"));
            }
            other => panic!("expected missing gender column, got {other:?}"),
        }
    }

    #[test]
    fn prior_roster_skips_blank_counters() {
        let issued = load_prior_roster(&table(
            "national_id,counter\n0012345678,533570001\n0099999999,\n",
        ))
        .expect("prior roster loads");

        assert_eq!(issued.len(), 1);
        let key = NationalId::parse("12345678").expect("valid id");
        assert_eq!(issued.get(&key).map(String::as_str), Some("533570001"));
    }

    #[test]
    fn current_codes_ignore_blank_cells() {
        let codes = load_current_codes(&table("registration_id\n543570004\nnan\n543730002\n"))
            .expect("current roster loads");
        assert_eq!(codes, ["543570004", "543730002"]);
    }
}
