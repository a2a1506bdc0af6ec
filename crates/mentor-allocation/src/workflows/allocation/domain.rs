use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::workflows::natural::NaturalKey;
use crate::workflows::normalizer::{fold_digits, is_blank_sentinel};

/// Fixed, canonical pipeline stages: seven eligibility filters and the
/// capacity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Type,
    Group,
    Gender,
    GraduationStatus,
    Center,
    Finance,
    School,
    CapacityGate,
}

impl Stage {
    pub const CANONICAL: [Self; 8] = [
        Self::Type,
        Self::Group,
        Self::Gender,
        Self::GraduationStatus,
        Self::Center,
        Self::Finance,
        Self::School,
        Self::CapacityGate,
    ];

    pub const ELIGIBILITY: [Self; 7] = [
        Self::Type,
        Self::Group,
        Self::Gender,
        Self::GraduationStatus,
        Self::Center,
        Self::Finance,
        Self::School,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Group => "group",
            Self::Gender => "gender",
            Self::GraduationStatus => "graduation_status",
            Self::Center => "center",
            Self::Finance => "finance",
            Self::School => "school",
            Self::CapacityGate => "capacity_gate",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        Self::CANONICAL
            .into_iter()
            .find(|stage| stage.key() == value.trim())
    }

    pub const fn is_capacity_gate(self) -> bool {
        matches!(self, Self::CapacityGate)
    }

    const fn slot(self) -> Option<usize> {
        match self {
            Self::Type => Some(0),
            Self::Group => Some(1),
            Self::Gender => Some(2),
            Self::GraduationStatus => Some(3),
            Self::Center => Some(4),
            Self::Finance => Some(5),
            Self::School => Some(6),
            Self::CapacityGate => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Normalised cell value used for equality filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Missing,
    Int(i64),
    Text(String),
}

static MISSING: FieldValue = FieldValue::Missing;

impl FieldValue {
    /// Parse a raw cell: digits are folded, blanks and sentinels become
    /// `Missing`, and integral numbers (`"12"`, `"12.0"`) become `Int`.
    pub fn parse(raw: &str) -> Self {
        let folded = fold_digits(raw);
        if is_blank_sentinel(&folded) {
            return Self::Missing;
        }

        let trimmed = folded.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                return Self::Int(value as i64);
            }
        }

        Self::Text(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Equality used by the eligibility filters. Missing never matches.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::Missing, _) | (_, Self::Missing) => false,
            (left, right) => left == right,
        }
    }

    pub fn is_missing_or_zero(&self) -> bool {
        matches!(self, Self::Missing | Self::Int(0))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The seven eligibility values a student or mentor carries, indexed by stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityProfile {
    values: [FieldValue; 7],
}

impl EligibilityProfile {
    pub fn new(values: [FieldValue; 7]) -> Self {
        Self { values }
    }

    /// Build a profile from `(stage, value)` pairs; stages not listed stay missing.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Stage, FieldValue)>,
    {
        let mut profile = Self::default();
        for (stage, value) in pairs {
            if let Some(slot) = stage.slot() {
                profile.values[slot] = value;
            }
        }
        profile
    }

    pub fn get(&self, stage: Stage) -> &FieldValue {
        match stage.slot() {
            Some(slot) => &self.values[slot],
            None => &MISSING,
        }
    }
}

impl Default for EligibilityProfile {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| FieldValue::Missing),
        }
    }
}

/// Read-only student row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: String,
    pub profile: EligibilityProfile,
}

impl Student {
    pub fn new(id: impl Into<String>, profile: EligibilityProfile) -> Self {
        Self {
            id: id.into(),
            profile,
        }
    }
}

/// Mentor row in the candidate pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mentor {
    pub id: String,
    pub sort_key: NaturalKey,
    pub profile: EligibilityProfile,
    pub remaining_capacity: i64,
    pub initial_capacity: i64,
    pub allocations_new: u32,
}

impl Mentor {
    /// A mentor whose initial capacity equals its current remaining capacity.
    pub fn new(id: impl Into<String>, profile: EligibilityProfile, remaining_capacity: i64) -> Self {
        let id = id.into();
        Self {
            sort_key: NaturalKey::new(&id),
            id,
            profile,
            remaining_capacity,
            initial_capacity: remaining_capacity,
            allocations_new: 0,
        }
    }

    pub fn with_initial_capacity(mut self, initial_capacity: i64) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Seats consumed relative to the initial capacity.
    pub fn used_seats(&self) -> i64 {
        self.initial_capacity - self.remaining_capacity
    }

    /// `used / max(initial, 1)`; the floor keeps zero-capacity mentors finite.
    pub fn occupancy_ratio(&self) -> f64 {
        self.used_seats() as f64 / self.initial_capacity.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_normalise_numbers_and_blanks() {
        assert_eq!(FieldValue::parse(" 12 "), FieldValue::Int(12));
        assert_eq!(FieldValue::parse("12.0"), FieldValue::Int(12));
        assert_eq!(FieldValue::parse("۱۲"), FieldValue::Int(12));
        assert_eq!(FieldValue::parse("nan"), FieldValue::Missing);
        assert_eq!(FieldValue::parse("North  Campus"), FieldValue::Text("North Campus".into()));
    }

    #[test]
    fn missing_values_never_match() {
        assert!(!FieldValue::Missing.matches(&FieldValue::Missing));
        assert!(FieldValue::Int(3).matches(&FieldValue::parse("3.0")));
        assert!(!FieldValue::Int(3).matches(&FieldValue::Text("3a".into())));
    }

    #[test]
    fn stage_keys_round_trip_in_canonical_order() {
        for stage in Stage::CANONICAL {
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
        assert_eq!(Stage::from_key("capacity"), None);
    }

    #[test]
    fn occupancy_floor_avoids_division_by_zero() {
        let mentor = Mentor::new("EMP-1", EligibilityProfile::default(), 0);
        assert_eq!(mentor.occupancy_ratio(), 0.0);

        let mut busy = Mentor::new("EMP-2", EligibilityProfile::default(), 4);
        busy.remaining_capacity = 1;
        assert!((busy.occupancy_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
