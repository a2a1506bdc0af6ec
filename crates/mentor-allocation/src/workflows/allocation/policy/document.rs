use serde::Deserialize;
use std::collections::BTreeMap;

/// Wire shape of the policy JSON document before validation.
///
/// Every section is optional at this layer so validation can report exactly
/// which one is missing (or fill it in under the migrate mode) instead of
/// surfacing a generic deserialisation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PolicyDocument {
    #[serde(default)]
    pub(crate) version: Option<String>,
    #[serde(default)]
    pub(crate) join_keys: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) ranking_rules: Option<Vec<RankingRuleDocument>>,
    #[serde(default)]
    pub(crate) trace_stages: Option<Vec<TraceStageDocument>>,
    #[serde(default)]
    pub(crate) gender_codes: Option<BTreeMap<String, u16>>,
    #[serde(default)]
    pub(crate) capacity_column: Option<String>,
    #[serde(default)]
    pub(crate) fairness_strategy: Option<String>,
    #[serde(default)]
    pub(crate) school_wildcard: Option<bool>,
    #[serde(default)]
    pub(crate) column_aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RankingRuleDocument {
    pub(crate) name: String,
    pub(crate) column: String,
    pub(crate) direction: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TraceStageDocument {
    pub(crate) stage: String,
    pub(crate) column: String,
}

pub(crate) fn parse_document(raw: &str) -> Result<PolicyDocument, serde_json::Error> {
    serde_json::from_str(raw.trim_start_matches('\u{feff}'))
}
