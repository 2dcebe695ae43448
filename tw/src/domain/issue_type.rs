//! Issue-type registry
//!
//! Static table of the ten ticket categories the model may choose from. Each
//! entry carries the description sections a ticket of that type must contain;
//! the system prompt embeds them as a formatting guide.

use serde::Serialize;
use tracing::debug;

/// A required section of a ticket description
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Section {
    pub heading: &'static str,
    /// Bullet hints describing what belongs in the section
    pub hints: &'static [&'static str],
    /// Checkbox items the section should list
    pub checklist: &'static [&'static str],
}

const fn section(heading: &'static str, hints: &'static [&'static str]) -> Section {
    Section {
        heading,
        hints,
        checklist: &[],
    }
}

const fn checklist(heading: &'static str, checklist: &'static [&'static str]) -> Section {
    Section {
        heading,
        hints: &[],
        checklist,
    }
}

/// One ticket category
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IssueType {
    pub key: &'static str,
    pub label: &'static str,
    /// Badge colour (hex) used by front-ends
    pub color: &'static str,
    /// Normalized alternative spellings
    pub aliases: &'static [&'static str],
    pub sections: &'static [Section],
}

pub static ISSUE_TYPES: &[IssueType] = &[
    IssueType {
        key: "bug",
        label: "Bug",
        color: "#d73a4a",
        aliases: &["defect", "bug_report", "error", "crash", "regression"],
        sections: &[
            section("Summary", &["One or two sentences describing the faulty behaviour"]),
            section(
                "Steps to Reproduce",
                &["Numbered steps", "Write \"Unknown\" only when the reporter cannot reproduce it"],
            ),
            section("Expected Behavior", &[]),
            section("Actual Behavior", &["Include error messages verbatim"]),
            section("Environment", &["Platform, browser or app version when known"]),
        ],
    },
    IssueType {
        key: "story",
        label: "Story",
        color: "#0e8a16",
        aliases: &["user_story", "feature", "feature_request"],
        sections: &[
            section("User Story", &["As a <role>, I want <capability>, so that <benefit>"]),
            section("Context", &[]),
            checklist("Acceptance Criteria", &["Observable outcome the user can verify"]),
        ],
    },
    IssueType {
        key: "task",
        label: "Task",
        color: "#1d76db",
        aliases: &["todo", "work_item"],
        sections: &[
            section("Objective", &[]),
            checklist("Definition of Done", &["Concrete, checkable completion condition"]),
        ],
    },
    IssueType {
        key: "spike",
        label: "Spike",
        color: "#5319e7",
        aliases: &["research", "investigation", "poc", "proof_of_concept"],
        sections: &[
            section("Question", &["What the team needs to learn"]),
            section("Timebox", &[]),
            section("Expected Output", &["Decision record, prototype or recommendation"]),
        ],
    },
    IssueType {
        key: "technical_debt",
        label: "Technical Debt",
        color: "#fbca04",
        aliases: &["tech_debt", "techdebt", "debt", "refactor", "refactoring"],
        sections: &[
            section("Current State", &[]),
            section("Problem", &["Cost of leaving it as is"]),
            section("Proposed Change", &[]),
            section("Risks", &[]),
        ],
    },
    IssueType {
        key: "epic",
        label: "Epic",
        color: "#3e4b9e",
        aliases: &["initiative", "theme"],
        sections: &[
            section("Goal", &[]),
            section("Scope", &["What is in and what is out"]),
            section("Success Metrics", &[]),
            section("Milestones", &[]),
        ],
    },
    IssueType {
        key: "improvement",
        label: "Improvement",
        color: "#a2eeef",
        aliases: &["enhancement", "optimization", "optimisation"],
        sections: &[
            section("Current Behavior", &[]),
            section("Proposed Improvement", &[]),
            section("Benefit", &[]),
        ],
    },
    IssueType {
        key: "chore",
        label: "Chore",
        color: "#c5def5",
        aliases: &["maintenance", "housekeeping", "upkeep"],
        sections: &[section("Description", &[]), checklist("Checklist", &["Individual maintenance step"])],
    },
    IssueType {
        key: "qa",
        label: "QA",
        color: "#bfd4f2",
        aliases: &["test", "testing", "quality_assurance", "test_case"],
        sections: &[
            section("Test Objective", &[]),
            section("Test Steps", &["Numbered steps"]),
            section("Expected Results", &[]),
        ],
    },
    IssueType {
        key: "documentation",
        label: "Documentation",
        color: "#0075ca",
        aliases: &["docs", "doc", "documentation_update"],
        sections: &[
            section("Topic", &[]),
            section("Audience", &[]),
            section("Required Changes", &["Pages or sections to add or update"]),
        ],
    },
];

/// Reduce a free-form type name to registry key form
///
/// Lowercases, maps every non-alphabetic character to `_`, collapses runs of
/// `_`, and trims them from both ends.
fn canonical_form(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphabetic() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

impl IssueType {
    /// Resolve a free-form type name (`"Bug"`, `"defect"`, `"Tech-Debt"`) to its registry entry
    pub fn normalize(raw: &str) -> Option<&'static IssueType> {
        let form = canonical_form(raw);
        debug!(%raw, %form, "IssueType::normalize: called");
        if form.is_empty() {
            return None;
        }
        ISSUE_TYPES
            .iter()
            .find(|t| t.key == form)
            .or_else(|| ISSUE_TYPES.iter().find(|t| t.aliases.contains(&form.as_str())))
    }

    /// Look up an exact registry key
    pub fn get(key: &str) -> Option<&'static IssueType> {
        ISSUE_TYPES.iter().find(|t| t.key == key)
    }

    /// All registry keys in display order
    pub fn keys() -> Vec<&'static str> {
        ISSUE_TYPES.iter().map(|t| t.key).collect()
    }
}
