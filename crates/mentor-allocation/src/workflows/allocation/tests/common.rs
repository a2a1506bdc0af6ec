use serde_json::Value;

use crate::workflows::allocation::domain::{
    EligibilityProfile, FieldValue, Mentor, Stage, Student,
};
use crate::workflows::allocation::policy::{Policy, PolicyLoadMode};

pub(super) const POLICY_JSON: &str = include_str!("../../../../tests/fixtures/policy.json");

pub(super) fn policy() -> Policy {
    Policy::from_json_str(POLICY_JSON, PolicyLoadMode::Strict).expect("fixture policy is valid")
}

pub(super) fn policy_document() -> Value {
    serde_json::from_str(POLICY_JSON).expect("fixture policy is JSON")
}

/// Build a policy from the fixture after applying `edit` to its JSON.
pub(super) fn policy_with(edit: impl FnOnce(&mut Value)) -> Policy {
    let mut document = policy_document();
    edit(&mut document);
    Policy::from_json_str(&document.to_string(), PolicyLoadMode::Strict)
        .expect("edited policy is valid")
}

pub(super) fn policy_with_capacity_rule() -> Policy {
    policy_with(|document| {
        document["ranking_rules"]
            .as_array_mut()
            .expect("ranking rules array")
            .insert(
                1,
                serde_json::json!({
                    "name": "max_remaining_capacity",
                    "column": "remaining_capacity",
                    "direction": "desc"
                }),
            );
    })
}

pub(super) fn standard_profile() -> EligibilityProfile {
    EligibilityProfile::from_pairs([
        (Stage::Type, FieldValue::Int(101)),
        (Stage::Group, FieldValue::Int(3)),
        (Stage::Gender, FieldValue::Int(1)),
        (Stage::GraduationStatus, FieldValue::Int(0)),
        (Stage::Center, FieldValue::Int(1)),
        (Stage::Finance, FieldValue::Int(0)),
        (Stage::School, FieldValue::Int(5001)),
    ])
}

pub(super) fn profile_with(stage: Stage, value: FieldValue) -> EligibilityProfile {
    let pairs = Stage::ELIGIBILITY.into_iter().map(|current| {
        if current == stage {
            (current, value.clone())
        } else {
            (current, standard_profile().get(current).clone())
        }
    });
    EligibilityProfile::from_pairs(pairs)
}

pub(super) fn student(id: &str) -> Student {
    Student::new(id, standard_profile())
}

pub(super) fn mentor(id: &str, capacity: i64) -> Mentor {
    Mentor::new(id, standard_profile(), capacity)
}
