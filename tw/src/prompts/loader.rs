//! Prompt Loader
//!
//! Loads prompt templates from override directories or falls back to the
//! embedded defaults, then renders them with Handlebars.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::{ISSUE_TYPES, IssueType, Scope};

/// Context for `system.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct SystemPromptContext {
    /// Full issue-type guide: labels, aliases and required sections
    pub issue_types: &'static [IssueType],
    /// Comma-separated allowed `issueType` keys
    pub allowed_keys: String,
    /// The answer arrives through the `submit_ticket` function
    pub use_tool: bool,
}

impl SystemPromptContext {
    pub fn new(use_tool: bool) -> Self {
        debug!(%use_tool, "SystemPromptContext::new: called");
        Self {
            issue_types: ISSUE_TYPES,
            allowed_keys: IssueType::keys().join(", "),
            use_tool,
        }
    }
}

/// Context for `user.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct UserPromptContext {
    /// Original text followed by any numbered clarifications
    pub working_prompt: String,
    pub scopes: Vec<&'static Scope>,
    /// Bracketed prefix every title must start with, e.g. `[UI+API]:`
    pub title_prefix: String,
}

/// Context for `clarify.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct ClarifyPromptContext {
    pub reason: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directories, searched in order before the embedded set
    dirs: Vec<PathBuf>,
}

impl PromptLoader {
    /// Create a loader searching `prompts_dir` (when configured), then
    /// `.ticketwright/prompts/` under the working directory
    pub fn new(prompts_dir: Option<&Path>) -> Self {
        debug!(?prompts_dir, "PromptLoader::new: called");
        let candidates = prompts_dir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(PathBuf::from(".ticketwright/prompts")));

        let dirs = candidates
            .filter(|dir| {
                let exists = dir.is_dir();
                debug!(?dir, %exists, "PromptLoader::new: checking directory");
                exists
            })
            .collect();

        Self::with_dirs(dirs)
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self::with_dirs(vec![])
    }

    fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, dirs }
    }

    /// Load a template by name (without the `.pmt` extension)
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");

        for dir in &self.dirs {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in directory");
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<C: Serialize>(&self, template_name: &str, context: &C) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map(|s| s.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::title_prefix;

    #[test]
    fn test_system_prompt_lists_every_issue_type() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.render("system", &SystemPromptContext::new(false)).unwrap();
        for t in ISSUE_TYPES {
            assert!(prompt.contains(t.key), "missing {}", t.key);
            for section in t.sections {
                assert!(prompt.contains(section.heading), "missing {}", section.heading);
            }
        }
        assert!(prompt.contains("bug, story, task"));
        assert!(!prompt.contains("submit_ticket"));
    }

    #[test]
    fn test_system_prompt_tool_mode() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.render("system", &SystemPromptContext::new(true)).unwrap();
        assert!(prompt.contains("submit_ticket"));
    }

    #[test]
    fn test_user_prompt_embeds_scopes_and_prefix() {
        let loader = PromptLoader::embedded_only();
        let scopes = vec![Scope::get("ui").unwrap(), Scope::get("api").unwrap()];
        let ctx = UserPromptContext {
            working_prompt: "Orders page <table> shows \"NaN\" totals".to_string(),
            title_prefix: title_prefix(&scopes),
            scopes,
        };
        let prompt = loader.render("user", &ctx).unwrap();
        assert!(prompt.contains("[UI+API]:"));
        assert!(prompt.contains("User Interface"));
        // No HTML escaping
        assert!(prompt.contains("<table> shows \"NaN\""));
    }

    #[test]
    fn test_clarify_and_correction_render() {
        let loader = PromptLoader::embedded_only();
        let clarify = loader
            .render(
                "clarify",
                &ClarifyPromptContext {
                    reason: "no repro steps".to_string(),
                },
            )
            .unwrap();
        assert!(clarify.contains("no repro steps"));

        let correction = loader.render("correction", &serde_json::json!({})).unwrap();
        assert!(correction.contains("JSON"));
    }

    #[test]
    fn test_override_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("correction.pmt"), "Custom {{word}}").unwrap();

        let loader = PromptLoader::new(Some(dir.path()));
        let out = loader.render("correction", &serde_json::json!({"word": "fix"})).unwrap();
        assert_eq!(out, "Custom fix");
        // Templates without an override still come from the embedded set
        assert!(loader.load_template("system").is_ok());
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
