//! Ticket draft and sufficiency verdict types

use serde::{Deserialize, Serialize};

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "highest" => Some(Self::Highest),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Defect severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Trivial,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "trivial" => Some(Self::Trivial),
            _ => None,
        }
    }
}

/// Whether the ticket touches sensitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSensitivity {
    None,
    ContainsPii,
    ContainsFinancial,
    #[default]
    Unknown,
}

impl DataSensitivity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "contains-pii" => Some(Self::ContainsPii),
            "contains-financial" => Some(Self::ContainsFinancial),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A complete ticket as produced by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    /// Raw from the model until the loop controller normalizes it to a registry key
    pub issue_type: String,
    pub scope: String,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub risk_areas: Vec<String>,
    #[serde(default)]
    pub data_sensitivity: DataSensitivity,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub multi_item: bool,
    pub epic_link: Option<String>,
    pub parent: Option<String>,
    pub estimate: Option<String>,
}

/// The model's request for more information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationRequest {
    pub reason: String,
    pub question: String,
    pub suggested_issue_type: Option<String>,
    #[serde(default)]
    pub missing_sections: Vec<String>,
}

/// Whether the model had enough information to draft a ticket
#[derive(Debug, Clone, PartialEq)]
pub enum SufficiencyVerdict {
    Enough(TicketDraft),
    NotEnough(ClarificationRequest),
}

impl SufficiencyVerdict {
    pub fn is_enough(&self) -> bool {
        matches!(self, Self::Enough(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Severity::parse("trivial"), Some(Severity::Trivial));
        assert_eq!(DataSensitivity::parse("contains-pii"), Some(DataSensitivity::ContainsPii));
        assert_eq!(DataSensitivity::parse("secret"), None);
    }

    #[test]
    fn test_draft_serializes_camel_case() {
        let draft = TicketDraft {
            title: "[UI]: Save crashes".to_string(),
            description: "d".to_string(),
            issue_type: "bug".to_string(),
            scope: "UI".to_string(),
            priority: Some(Priority::High),
            severity: None,
            labels: vec![],
            components: vec![],
            dependencies: vec![],
            risk_areas: vec!["data loss".to_string()],
            data_sensitivity: DataSensitivity::ContainsFinancial,
            acceptance_criteria: vec![],
            multi_item: false,
            epic_link: None,
            parent: None,
            estimate: None,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["issueType"], "bug");
        assert_eq!(json["riskAreas"][0], "data loss");
        assert_eq!(json["dataSensitivity"], "contains-financial");
        assert_eq!(json["priority"], "high");
        assert!(json["severity"].is_null());
    }
}
