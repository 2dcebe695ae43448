//! Schema validator
//!
//! Turns a parsed payload into a [`SufficiencyVerdict`]. Every optional field
//! is either accepted, replaced by its documented default, or the whole
//! payload is rejected; nothing half-valid gets through.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use super::error::SchemaViolation;
use crate::domain::{
    ClarificationRequest, DataSensitivity, IssueType, Priority, Severity, SufficiencyVerdict, TicketDraft,
};

/// Bracketed scope tag at the start of a legacy title, e.g. `[UI+API]:`
static LEGACY_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([A-Z0-9+-]+)\]:").expect("legacy title pattern is valid"));

/// Minimum description length accepted for a legacy ticket
const LEGACY_MIN_DESCRIPTION_CHARS: usize = 40;

/// Validate a parsed payload against the ticket schema
pub fn validate(value: &Value) -> Result<SufficiencyVerdict, SchemaViolation> {
    debug!("validate: called");
    let obj = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

    let status = obj.get("status").and_then(Value::as_str).map(|s| s.trim().to_lowercase());
    match status.as_deref() {
        Some("enough") => validate_enough(obj).map(SufficiencyVerdict::Enough),
        Some("not_enough") => validate_not_enough(obj).map(SufficiencyVerdict::NotEnough),
        _ => {
            debug!(?status, "validate: invalid status");
            Err(SchemaViolation::InvalidStatus(
                obj.get("status").map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
            ))
        }
    }
}

fn validate_not_enough(obj: &Map<String, Value>) -> Result<ClarificationRequest, SchemaViolation> {
    debug!("validate_not_enough: called");
    let reason = non_empty(obj, "reason").ok_or(SchemaViolation::MissingField("reason"))?;

    let question = first_non_empty(obj, &["clarificationRequest", "missing_info_prompt", "missingInfoPrompt"])
        .ok_or_else(|| {
            debug!("validate_not_enough: no question");
            SchemaViolation::MissingQuestion { reason: reason.clone() }
        })?;

    let suggested_issue_type = match obj.get("suggestedIssueType") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => match IssueType::normalize(raw) {
            Some(t) => Some(t.key.to_string()),
            None => {
                return Err(SchemaViolation::InvalidValue {
                    field: "suggestedIssueType",
                    value: raw.clone(),
                });
            }
        },
        Some(other) => {
            return Err(SchemaViolation::InvalidValue {
                field: "suggestedIssueType",
                value: other.to_string(),
            });
        }
    };

    Ok(ClarificationRequest {
        reason,
        question,
        suggested_issue_type,
        missing_sections: string_list(obj, "missingSections"),
    })
}

fn validate_enough(obj: &Map<String, Value>) -> Result<TicketDraft, SchemaViolation> {
    debug!("validate_enough: called");
    let title = non_empty(obj, "title").ok_or(SchemaViolation::MissingField("title"))?;

    let issue_type = first_non_empty(obj, &["issueType", "issue_type"]).ok_or(SchemaViolation::MissingField("issueType"))?;
    if IssueType::normalize(&issue_type).is_none() {
        debug!(%issue_type, "validate_enough: unknown issue type");
        return Err(SchemaViolation::UnknownIssueType(issue_type));
    }

    let scope = if obj.contains_key("scope") {
        Some(non_empty(obj, "scope").ok_or(SchemaViolation::MissingField("scope"))?)
    } else {
        None
    };

    let description = non_empty(obj, "description").ok_or(SchemaViolation::MissingField("description"))?;

    let scope = match scope {
        Some(scope) => scope,
        None => legacy_scope(&title, &description)?,
    };

    Ok(TicketDraft {
        title,
        description,
        issue_type,
        scope,
        priority: lowercase(obj, "priority").and_then(|s| Priority::parse(&s)),
        severity: lowercase(obj, "severity").and_then(|s| Severity::parse(&s)),
        labels: string_list(obj, "labels"),
        components: string_list(obj, "components"),
        dependencies: string_list(obj, "dependencies"),
        risk_areas: string_list(obj, "riskAreas"),
        data_sensitivity: lowercase(obj, "dataSensitivity")
            .and_then(|s| DataSensitivity::parse(&s))
            .unwrap_or_default(),
        acceptance_criteria: string_list(obj, "acceptanceCriteria"),
        multi_item: obj.get("multiItem").and_then(Value::as_bool).unwrap_or(false),
        epic_link: non_empty(obj, "epicLink"),
        parent: non_empty(obj, "parent"),
        estimate: non_empty(obj, "estimate"),
    })
}

/// Gate for payloads without a `scope` field; derives the scope from the title tag
fn legacy_scope(title: &str, description: &str) -> Result<String, SchemaViolation> {
    debug!("legacy_scope: called");
    let tag = LEGACY_TITLE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SchemaViolation::LegacyGate(format!("title lacks a [SCOPE]: prefix: {}", title)))?;

    let chars = description.chars().count();
    if chars < LEGACY_MIN_DESCRIPTION_CHARS {
        return Err(SchemaViolation::LegacyGate(format!(
            "description has {} characters, need at least {}",
            chars, LEGACY_MIN_DESCRIPTION_CHARS
        )));
    }

    Ok(tag)
}

/// Trimmed string value, if present and non-empty
fn non_empty(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_non_empty(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| non_empty(obj, k))
}

fn lowercase(obj: &Map<String, Value>, key: &str) -> Option<String> {
    non_empty(obj, key).map(|s| s.to_lowercase())
}

/// Array of strings, or empty when absent or of any other shape
fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = obj.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enough() -> Value {
        json!({
            "status": "enough",
            "title": "[UI]: Save button crashes the editor",
            "issueType": "bug",
            "scope": "UI",
            "description": "Clicking save in the editor crashes the app."
        })
    }

    fn expect_enough(value: &Value) -> TicketDraft {
        match validate(value).unwrap() {
            SufficiencyVerdict::Enough(draft) => draft,
            other => panic!("Expected Enough, got {:?}", other),
        }
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(validate(&json!([1, 2])).unwrap_err(), SchemaViolation::NotAnObject);
        assert_eq!(validate(&json!("enough")).unwrap_err(), SchemaViolation::NotAnObject);
    }

    #[test]
    fn test_invalid_status() {
        assert_eq!(
            validate(&json!({"status": "maybe"})).unwrap_err(),
            SchemaViolation::InvalidStatus(Some("maybe".to_string()))
        );
        assert_eq!(validate(&json!({})).unwrap_err(), SchemaViolation::InvalidStatus(None));
    }

    #[test]
    fn test_status_is_case_insensitive() {
        let mut v = enough();
        v["status"] = json!("  ENOUGH ");
        assert!(validate(&v).unwrap().is_enough());
    }

    #[test]
    fn test_enough_defaults() {
        let draft = expect_enough(&enough());
        assert_eq!(draft.priority, None);
        assert_eq!(draft.severity, None);
        assert!(draft.labels.is_empty());
        assert_eq!(draft.data_sensitivity, DataSensitivity::Unknown);
        assert!(!draft.multi_item);
        assert_eq!(draft.epic_link, None);
    }

    #[test]
    fn test_invalid_enrichment_falls_back_to_defaults() {
        let mut v = enough();
        v["priority"] = json!("urgent");
        v["severity"] = json!(3);
        v["labels"] = json!(["crash", 7]);
        v["components"] = json!("editor");
        v["dataSensitivity"] = json!("top-secret");
        v["multiItem"] = json!("yes");
        v["estimate"] = json!("   ");
        let draft = expect_enough(&v);
        assert_eq!(draft.priority, None);
        assert_eq!(draft.severity, None);
        assert!(draft.labels.is_empty());
        assert!(draft.components.is_empty());
        assert_eq!(draft.data_sensitivity, DataSensitivity::Unknown);
        assert!(!draft.multi_item);
        assert_eq!(draft.estimate, None);
    }

    #[test]
    fn test_valid_enrichment_is_kept() {
        let mut v = enough();
        v["priority"] = json!("High");
        v["severity"] = json!("critical");
        v["labels"] = json!(["crash", "editor"]);
        v["riskAreas"] = json!(["data loss"]);
        v["acceptanceCriteria"] = json!(["Saving never crashes"]);
        v["dataSensitivity"] = json!("contains-pii");
        v["multiItem"] = json!(true);
        v["epicLink"] = json!("EPIC-12");
        let draft = expect_enough(&v);
        assert_eq!(draft.priority, Some(Priority::High));
        assert_eq!(draft.severity, Some(Severity::Critical));
        assert_eq!(draft.labels, vec!["crash", "editor"]);
        assert_eq!(draft.risk_areas, vec!["data loss"]);
        assert_eq!(draft.data_sensitivity, DataSensitivity::ContainsPii);
        assert!(draft.multi_item);
        assert_eq!(draft.epic_link.as_deref(), Some("EPIC-12"));
    }

    #[test]
    fn test_unknown_issue_type_rejected() {
        let mut v = enough();
        v["issueType"] = json!("not_a_real_type");
        assert_eq!(
            validate(&v).unwrap_err(),
            SchemaViolation::UnknownIssueType("not_a_real_type".to_string())
        );
    }

    #[test]
    fn test_issue_type_alias_key_and_raw_value_kept() {
        let mut v = enough();
        v.as_object_mut().unwrap().remove("issueType");
        v["issue_type"] = json!("Defect");
        assert_eq!(expect_enough(&v).issue_type, "Defect");
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["title", "issueType", "description"] {
            let mut v = enough();
            v.as_object_mut().unwrap().remove(field);
            assert_eq!(validate(&v).unwrap_err(), SchemaViolation::MissingField(field), "{field}");
        }

        let mut v = enough();
        v["scope"] = json!("");
        assert_eq!(validate(&v).unwrap_err(), SchemaViolation::MissingField("scope"));
    }

    #[test]
    fn test_legacy_shape_derives_scope() {
        let v = json!({
            "status": "enough",
            "title": "[UI+API]: Saving a draft loses attachments",
            "issue_type": "bug",
            "description": "When a draft with attachments is saved, the attachments disappear."
        });
        assert_eq!(expect_enough(&v).scope, "UI+API");
    }

    #[test]
    fn test_legacy_gate_rejects_bad_title_or_short_description() {
        let bad_title = json!({
            "status": "enough",
            "title": "Saving loses attachments",
            "issueType": "bug",
            "description": "When a draft with attachments is saved, the attachments disappear."
        });
        assert!(matches!(validate(&bad_title).unwrap_err(), SchemaViolation::LegacyGate(_)));

        let short = json!({
            "status": "enough",
            "title": "[UI]: Broken",
            "issueType": "bug",
            "description": "It is broken."
        });
        assert!(matches!(validate(&short).unwrap_err(), SchemaViolation::LegacyGate(_)));
    }

    #[test]
    fn test_not_enough_happy_path() {
        let v = json!({
            "status": "not_enough",
            "reason": "no repro steps",
            "clarificationRequest": "What steps trigger the crash?",
            "suggestedIssueType": "Bug",
            "missingSections": ["Steps to Reproduce"]
        });
        match validate(&v).unwrap() {
            SufficiencyVerdict::NotEnough(req) => {
                assert_eq!(req.reason, "no repro steps");
                assert_eq!(req.question, "What steps trigger the crash?");
                assert_eq!(req.suggested_issue_type.as_deref(), Some("bug"));
                assert_eq!(req.missing_sections, vec!["Steps to Reproduce"]);
            }
            other => panic!("Expected NotEnough, got {:?}", other),
        }
    }

    #[test]
    fn test_not_enough_legacy_prompt_and_defaults() {
        let v = json!({
            "status": "not_enough",
            "reason": "vague",
            "missing_info_prompt": "Which page?",
            "suggestedIssueType": null,
            "missingSections": "all of them"
        });
        match validate(&v).unwrap() {
            SufficiencyVerdict::NotEnough(req) => {
                assert_eq!(req.question, "Which page?");
                assert_eq!(req.suggested_issue_type, None);
                assert!(req.missing_sections.is_empty());
            }
            other => panic!("Expected NotEnough, got {:?}", other),
        }
    }

    #[test]
    fn test_not_enough_missing_reason_or_question() {
        let v = json!({"status": "not_enough", "clarificationRequest": "Which page?"});
        assert_eq!(validate(&v).unwrap_err(), SchemaViolation::MissingField("reason"));

        let v = json!({"status": "not_enough", "reason": "vague", "clarificationRequest": "  "});
        assert_eq!(
            validate(&v).unwrap_err(),
            SchemaViolation::MissingQuestion {
                reason: "vague".to_string()
            }
        );
    }

    #[test]
    fn test_not_enough_bad_suggested_type() {
        let v = json!({
            "status": "not_enough",
            "reason": "vague",
            "clarificationRequest": "Which page?",
            "suggestedIssueType": "saga"
        });
        assert!(matches!(
            validate(&v).unwrap_err(),
            SchemaViolation::InvalidValue {
                field: "suggestedIssueType",
                ..
            }
        ));
    }
}
