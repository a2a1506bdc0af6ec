use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::document::{PolicyDocument, RankingRuleDocument, TraceStageDocument};
use super::{
    FairnessStrategy, GenderCodes, Policy, PolicyError, PolicyLoadMode, PolicyVersion,
    RankingRule, RankingRuleKind, SortDirection, StageDefinition, JOIN_KEY_COUNT,
    SUPPORTED_MAJOR_VERSION,
};
use crate::workflows::allocation::domain::Stage;

const DEFAULT_VERSION: &str = "1.0.0";
const DEFAULT_CAPACITY_COLUMN: &str = "remaining_capacity";
const STANDARD_RULES: [RankingRuleKind; 3] = [
    RankingRuleKind::MinOccupancyRatio,
    RankingRuleKind::MinAllocationsNew,
    RankingRuleKind::MinMentorId,
];

pub(super) fn validate(document: PolicyDocument, mode: PolicyLoadMode) -> Result<Policy, PolicyError> {
    let mut warnings = Vec::new();

    let version = or_migrate(
        document.version,
        "version",
        mode,
        &mut warnings,
        || DEFAULT_VERSION.to_string(),
    )?;
    let version = PolicyVersion::parse(&version)?;
    if version.major != SUPPORTED_MAJOR_VERSION {
        return Err(PolicyError::UnsupportedVersion {
            found: version.to_string(),
            supported: SUPPORTED_MAJOR_VERSION,
        });
    }

    let join_keys = document
        .join_keys
        .ok_or(PolicyError::MissingSection("join_keys"))?;
    let join_keys = validate_join_keys(join_keys)?;

    let capacity_column = or_migrate(
        document.capacity_column,
        "capacity_column",
        mode,
        &mut warnings,
        || DEFAULT_CAPACITY_COLUMN.to_string(),
    )?;
    let capacity_column = capacity_column.trim().to_string();
    if capacity_column.is_empty() {
        return Err(PolicyError::EmptyColumn(Stage::CapacityGate.key()));
    }

    let stages = document
        .trace_stages
        .ok_or(PolicyError::MissingSection("trace_stages"))?;
    let stages = validate_stages(stages, &join_keys, &capacity_column)?;

    let ranking_rules = match document.ranking_rules {
        Some(rules) => validate_ranking_rules(rules, &capacity_column)?,
        None => or_migrate(None, "ranking_rules", mode, &mut warnings, || {
            STANDARD_RULES.into_iter().map(RankingRule::standard).collect()
        })?,
    };

    let gender_codes = match document.gender_codes {
        Some(codes) => validate_gender_codes(&codes)?,
        None => or_migrate(None, "gender_codes", mode, &mut warnings, GenderCodes::default)?,
    };

    let fairness = match document.fairness_strategy {
        Some(raw) => FairnessStrategy::parse(&raw)
            .ok_or(PolicyError::UnknownFairnessStrategy(raw))?,
        None => FairnessStrategy::default(),
    };

    let column_aliases = document
        .column_aliases
        .into_iter()
        .map(|(column, aliases)| {
            let aliases = aliases
                .into_iter()
                .map(|alias| alias.trim().to_string())
                .filter(|alias| !alias.is_empty())
                .collect();
            (column.trim().to_string(), aliases)
        })
        .collect::<BTreeMap<_, _>>();

    Ok(Policy {
        version,
        join_keys,
        ranking_rules,
        stages,
        gender_codes,
        capacity_column,
        fairness,
        school_wildcard: document.school_wildcard.unwrap_or(false),
        column_aliases,
        migration_warnings: warnings,
    })
}

fn or_migrate<T>(
    value: Option<T>,
    section: &'static str,
    mode: PolicyLoadMode,
    warnings: &mut Vec<String>,
    default: impl FnOnce() -> T,
) -> Result<T, PolicyError> {
    match (value, mode) {
        (Some(value), _) => Ok(value),
        (None, PolicyLoadMode::Strict) => Err(PolicyError::MissingSection(section)),
        (None, PolicyLoadMode::Migrate) => {
            let message = format!("policy section '{section}' missing; migrated to default");
            warn!(section, "{message}");
            warnings.push(message);
            Ok(default())
        }
    }
}

fn validate_join_keys(join_keys: Vec<String>) -> Result<Vec<String>, PolicyError> {
    if join_keys.len() != JOIN_KEY_COUNT {
        return Err(PolicyError::JoinKeyCount {
            expected: JOIN_KEY_COUNT,
            found: join_keys.len(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut normalized = Vec::with_capacity(join_keys.len());
    for key in join_keys {
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(PolicyError::EmptyColumn("join_keys"));
        }
        if !seen.insert(key.clone()) {
            return Err(PolicyError::DuplicateJoinKey(key));
        }
        normalized.push(key);
    }

    Ok(normalized)
}

fn validate_stages(
    stages: Vec<TraceStageDocument>,
    join_keys: &[String],
    capacity_column: &str,
) -> Result<Vec<StageDefinition>, PolicyError> {
    if stages.len() != Stage::CANONICAL.len() {
        return Err(PolicyError::StageCount {
            found: stages.len(),
        });
    }

    let mut definitions = Vec::with_capacity(stages.len());
    for (position, (raw, expected)) in stages.into_iter().zip(Stage::CANONICAL).enumerate() {
        if Stage::from_key(&raw.stage) != Some(expected) {
            return Err(PolicyError::StageOrder {
                position: position + 1,
                expected: expected.key(),
                found: raw.stage,
            });
        }

        let column = raw.column.trim().to_string();
        if column.is_empty() {
            return Err(PolicyError::EmptyColumn(expected.key()));
        }
        definitions.push(StageDefinition {
            stage: expected,
            column,
        });
    }

    let traced: BTreeSet<&str> = definitions
        .iter()
        .filter(|definition| !definition.stage.is_capacity_gate())
        .map(|definition| definition.column.as_str())
        .collect();
    if let Some(missing) = join_keys.iter().find(|key| !traced.contains(key.as_str())) {
        return Err(PolicyError::JoinKeyNotTraced(missing.clone()));
    }

    let gate_column = definitions
        .last()
        .map(|definition| definition.column.as_str())
        .unwrap_or_default();
    if gate_column != capacity_column {
        return Err(PolicyError::CapacityColumnMismatch {
            stage_column: gate_column.to_string(),
            capacity_column: capacity_column.to_string(),
        });
    }

    Ok(definitions)
}

fn validate_ranking_rules(
    rules: Vec<RankingRuleDocument>,
    capacity_column: &str,
) -> Result<Vec<RankingRule>, PolicyError> {
    let mut seen = BTreeSet::new();
    let mut validated = Vec::with_capacity(rules.len());

    for raw in rules {
        let kind = RankingRuleKind::from_name(&raw.name)
            .ok_or_else(|| PolicyError::UnknownRankingRule(raw.name.clone()))?;
        if !seen.insert(kind.name()) {
            return Err(PolicyError::DuplicateRankingRule(kind.name().to_string()));
        }

        let direction = SortDirection::parse(&raw.direction);
        if direction != Some(kind.direction()) {
            return Err(PolicyError::RankingDirection {
                rule: kind.name(),
                expected: kind.direction().label(),
                found: raw.direction,
            });
        }

        // Ranking reads mentor state by rule kind; the declared column has to
        // name the value that kind actually reads.
        let expected = match kind {
            RankingRuleKind::MaxRemainingCapacity => capacity_column,
            other => other.default_column(),
        };
        let column = raw.column.trim();
        if !column.is_empty() && column != expected {
            return Err(PolicyError::RankingColumn {
                rule: kind.name(),
                expected: expected.to_string(),
                found: column.to_string(),
            });
        }
        validated.push(RankingRule {
            kind,
            column: expected.to_string(),
            direction: kind.direction(),
        });
    }

    if let Some(missing) = RankingRuleKind::ALL
        .into_iter()
        .find(|kind| kind.is_required() && !seen.contains(kind.name()))
    {
        return Err(PolicyError::MissingRankingRule(missing.name()));
    }

    if validated.last().map(|rule| rule.kind) != Some(RankingRuleKind::MinMentorId) {
        return Err(PolicyError::TerminalRuleNotLast(
            RankingRuleKind::MinMentorId.name(),
        ));
    }

    Ok(validated)
}

fn validate_gender_codes(codes: &BTreeMap<String, u16>) -> Result<GenderCodes, PolicyError> {
    let keys: Vec<&str> = codes.keys().map(|key| key.trim()).collect();
    if codes.len() != 2 || !keys.contains(&"0") || !keys.contains(&"1") {
        return Err(PolicyError::GenderCodes(format!(
            "expected keys '0' and '1', found {:?}",
            keys
        )));
    }

    let lookup = |wanted: &str| {
        codes
            .iter()
            .find(|(key, _)| key.trim() == wanted)
            .map(|(_, code)| *code)
            .unwrap_or_default()
    };
    let female = lookup("0");
    let male = lookup("1");

    for code in [female, male] {
        if !(100..=999).contains(&code) {
            return Err(PolicyError::GenderCodes(format!(
                "code {code} is not a three-digit number"
            )));
        }
    }
    if female == male {
        return Err(PolicyError::GenderCodes(format!(
            "both genders map to {female}"
        )));
    }

    Ok(GenderCodes { female, male })
}
