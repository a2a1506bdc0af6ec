use serde::Serialize;
use std::fmt;

use super::CounterError;
use crate::workflows::allocation::policy::Gender;
use crate::workflows::normalizer::{fold_digits, is_blank_sentinel};
use crate::workflows::NaturalKey;

/// First academic year encoded by a registration id (offset `00`).
pub const BASE_ACADEMIC_YEAR: u16 = 1350;
pub const NATIONAL_ID_WIDTH: usize = 10;
pub const MAX_SEQUENCE: u16 = 9999;

/// National identifier folded to ASCII digits and left-padded to ten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// `None` for blanks and for values with more than ten digits.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_blank_sentinel(raw) {
            return None;
        }
        let digits: String = fold_digits(raw)
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() || digits.len() > NATIONAL_ID_WIDTH {
            return None;
        }
        Some(Self(format!("{digits:0>width$}", width = NATIONAL_ID_WIDTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sort_key(&self) -> NaturalKey {
        NaturalKey::new(&self.0)
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-digit year component, `academic_year - 1350`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct YearOffset(u8);

impl YearOffset {
    pub fn from_academic_year(year: u16) -> Result<Self, CounterError> {
        year.checked_sub(BASE_ACADEMIC_YEAR)
            .filter(|offset| *offset <= 99)
            .map(|offset| Self(offset as u8))
            .ok_or(CounterError::InvalidYear { year })
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Nine-digit registration id: year offset, gender code, sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId {
    pub year_offset: u8,
    pub gender_code: u16,
    pub sequence: u16,
}

impl RegistrationId {
    /// Parse a stored id; digits are folded, anything but nine digits is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded = fold_digits(raw.trim());
        if folded.len() != 9 || !folded.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            year_offset: folded[0..2].parse().ok()?,
            gender_code: folded[2..5].parse().ok()?,
            sequence: folded[5..9].parse().ok()?,
        })
    }

    pub fn has_prefix(&self, year: YearOffset, gender_code: u16) -> bool {
        self.year_offset == year.value() && self.gender_code == gender_code
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:03}{:04}",
            self.year_offset, self.gender_code, self.sequence
        )
    }
}

/// One student row awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// 1-based data row in the source table.
    pub row: usize,
    pub national_id: NationalId,
    pub gender: Gender,
}

/// How an assigned id was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Reused verbatim from the prior-year roster.
    PriorYear,
    /// Freshly minted from the next free sequence.
    Minted,
    /// Repeat of an identifier already assigned earlier in this batch.
    Memoized,
}

impl AssignmentSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriorYear => "prior_year",
            Self::Minted => "minted",
            Self::Memoized => "memoized",
        }
    }
}

/// Output row, aligned with the input roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterAssignment {
    pub row: usize,
    pub national_id: NationalId,
    pub gender: Gender,
    pub registration_id: String,
    pub source: AssignmentSource,
}

/// Per-gender totals for one assignment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderSummary {
    pub gender: Gender,
    pub gender_code: u16,
    pub reused: usize,
    pub minted: usize,
    pub memoized: usize,
    pub next_sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSummary {
    pub academic_year: u16,
    pub year_offset: YearOffset,
    pub rows: usize,
    pub genders: Vec<GenderSummary>,
}

impl CounterSummary {
    pub fn for_gender(&self, gender: Gender) -> Option<&GenderSummary> {
        self.genders.iter().find(|summary| summary.gender == gender)
    }
}
