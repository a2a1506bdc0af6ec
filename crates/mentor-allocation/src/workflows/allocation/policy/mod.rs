//! Versioned allocation policy.
//!
//! A [`Policy`] is parsed from a JSON document, validated once and then
//! passed by reference to every engine component. It is immutable; use a
//! [`PolicyStore`] to pick up edits to the source document.

mod document;
mod store;
mod validate;

pub use store::PolicyStore;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::domain::Stage;

/// Major version of the policy document format understood by this engine.
pub const SUPPORTED_MAJOR_VERSION: u64 = 1;

/// Number of join keys every policy must declare.
pub const JOIN_KEY_COUNT: usize = 6;

/// How strictly an incomplete document is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyLoadMode {
    /// Fail closed on any missing section.
    #[default]
    Strict,
    /// Fill missing optional sections with documented defaults, warning for each.
    Migrate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_release: Option<String>,
}

impl PolicyVersion {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let invalid = || PolicyError::InvalidVersion(raw.to_string());
        let trimmed = raw.trim();
        let without_build = trimmed.split('+').next().unwrap_or_default();
        let (core, pre_release) = match without_build.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (without_build, None),
        };

        let parts = core
            .split('.')
            .map(|part| {
                if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        match parts.as_slice() {
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
                pre_release,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// Tie-break rules the ranking engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingRuleKind {
    MinOccupancyRatio,
    MaxRemainingCapacity,
    MinAllocationsNew,
    MinMentorId,
}

impl RankingRuleKind {
    pub const ALL: [Self; 4] = [
        Self::MinOccupancyRatio,
        Self::MaxRemainingCapacity,
        Self::MinAllocationsNew,
        Self::MinMentorId,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MinOccupancyRatio => "min_occupancy_ratio",
            Self::MaxRemainingCapacity => "max_remaining_capacity",
            Self::MinAllocationsNew => "min_allocations_new",
            Self::MinMentorId => "min_mentor_id",
        }
    }

    pub const fn direction(self) -> SortDirection {
        match self {
            Self::MaxRemainingCapacity => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }

    pub const fn default_column(self) -> &'static str {
        match self {
            Self::MinOccupancyRatio => "occupancy_ratio",
            Self::MaxRemainingCapacity => "remaining_capacity",
            Self::MinAllocationsNew => "allocations_new",
            Self::MinMentorId => "mentor_sort_key",
        }
    }

    /// Rules every policy has to declare; the capacity tie-break is optional.
    pub const fn is_required(self) -> bool {
        !matches!(self, Self::MaxRemainingCapacity)
    }

    fn from_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRule {
    pub kind: RankingRuleKind,
    pub column: String,
    pub direction: SortDirection,
}

impl RankingRule {
    pub fn standard(kind: RankingRuleKind) -> Self {
        Self {
            kind,
            column: kind.default_column().to_string(),
            direction: kind.direction(),
        }
    }
}

/// Final tie-break used after the numeric ranking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessStrategy {
    /// Natural order of the mentor identifier.
    #[default]
    Deterministic,
    /// SHA-256 of the mentor identifier.
    MentorDigest,
    /// SHA-256 of the student identifier joined with the mentor identifier.
    StudentDigest,
}

impl FairnessStrategy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "natural" | "none" => Some(Self::Deterministic),
            "mentor_digest" => Some(Self::MentorDigest),
            "student_digest" => Some(Self::StudentDigest),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::MentorDigest => "mentor_digest",
            Self::StudentDigest => "student_digest",
        }
    }
}

/// Binary gender as recorded on rosters (`0` female, `1` male).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Self; 2] = [Self::Female, Self::Male];

    pub fn from_code(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Female),
            1 => Some(Self::Male),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
        }
    }
}

/// Three-digit registration prefix per gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenderCodes {
    pub female: u16,
    pub male: u16,
}

impl GenderCodes {
    pub const fn code_for(&self, gender: Gender) -> u16 {
        match gender {
            Gender::Female => self.female,
            Gender::Male => self.male,
        }
    }

    pub fn gender_for(&self, code: u16) -> Option<Gender> {
        Gender::ALL
            .into_iter()
            .find(|gender| self.code_for(*gender) == code)
    }
}

impl Default for GenderCodes {
    fn default() -> Self {
        Self {
            female: 373,
            male: 357,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub stage: Stage,
    pub column: String,
}

/// Validated, immutable allocation policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    version: PolicyVersion,
    join_keys: Vec<String>,
    ranking_rules: Vec<RankingRule>,
    stages: Vec<StageDefinition>,
    gender_codes: GenderCodes,
    capacity_column: String,
    fairness: FairnessStrategy,
    school_wildcard: bool,
    column_aliases: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    migration_warnings: Vec<String>,
}

impl Policy {
    pub fn from_json_str(raw: &str, mode: PolicyLoadMode) -> Result<Self, PolicyError> {
        let document = document::parse_document(raw)?;
        validate::validate(document, mode)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, mode: PolicyLoadMode) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, mode)
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }

    pub fn join_keys(&self) -> &[String] {
        &self.join_keys
    }

    pub fn ranking_rules(&self) -> &[RankingRule] {
        &self.ranking_rules
    }

    pub fn has_rule(&self, kind: RankingRuleKind) -> bool {
        self.ranking_rules.iter().any(|rule| rule.kind == kind)
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn stage_column(&self, stage: Stage) -> &str {
        self.stages
            .iter()
            .find(|definition| definition.stage == stage)
            .map(|definition| definition.column.as_str())
            .unwrap_or_default()
    }

    pub fn gender_codes(&self) -> &GenderCodes {
        &self.gender_codes
    }

    pub fn capacity_column(&self) -> &str {
        &self.capacity_column
    }

    pub fn fairness(&self) -> FairnessStrategy {
        self.fairness
    }

    pub fn school_wildcard(&self) -> bool {
        self.school_wildcard
    }

    /// Extra header spellings declared for a policy column.
    pub fn aliases_for(&self, column: &str) -> &[String] {
        self.column_aliases
            .get(column)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn migration_warnings(&self) -> &[String] {
        &self.migration_warnings
    }

    /// Rule names in evaluation order, e.g. for selection-reason text.
    pub fn ranking_chain(&self) -> String {
        self.ranking_rules
            .iter()
            .map(|rule| match (rule.kind, self.fairness) {
                (RankingRuleKind::MinMentorId, FairnessStrategy::Deterministic) => {
                    rule.kind.name().to_string()
                }
                (RankingRuleKind::MinMentorId, fairness) => fairness.label().to_string(),
                (kind, _) => kind.name().to_string(),
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Errors raised while loading or validating a policy document.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("policy document is missing required section '{0}'")]
    MissingSection(&'static str),
    #[error("policy version '{0}' is not a semantic version (MAJOR.MINOR.PATCH)")]
    InvalidVersion(String),
    #[error("policy version {found} is incompatible; supported major version is {supported}")]
    UnsupportedVersion { found: String, supported: u64 },
    #[error("policy must declare exactly {expected} join keys, found {found}")]
    JoinKeyCount { expected: usize, found: usize },
    #[error("join key '{0}' is declared more than once")]
    DuplicateJoinKey(String),
    #[error("policy must declare exactly 8 trace stages, found {found}")]
    StageCount { found: usize },
    #[error("trace stage #{position} must be '{expected}', found '{found}'")]
    StageOrder {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("trace stage '{0}' has an empty column name")]
    EmptyColumn(&'static str),
    #[error("join key '{0}' is not covered by any eligibility trace stage")]
    JoinKeyNotTraced(String),
    #[error("capacity gate column '{stage_column}' must equal capacity_column '{capacity_column}'")]
    CapacityColumnMismatch {
        stage_column: String,
        capacity_column: String,
    },
    #[error("unknown ranking rule '{0}'")]
    UnknownRankingRule(String),
    #[error("ranking rule '{0}' is declared more than once")]
    DuplicateRankingRule(String),
    #[error("ranking rules must include '{0}'")]
    MissingRankingRule(&'static str),
    #[error("ranking rule '{0}' must be the last rule because it never ties")]
    TerminalRuleNotLast(&'static str),
    #[error("ranking rule '{rule}' reads column '{expected}', found '{found}'")]
    RankingColumn {
        rule: &'static str,
        expected: String,
        found: String,
    },
    #[error("ranking rule '{rule}' must sort {expected}, found '{found}'")]
    RankingDirection {
        rule: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("invalid gender codes: {0}")]
    GenderCodes(String),
    #[error("unknown fairness strategy '{0}'")]
    UnknownFairnessStrategy(String),
}
