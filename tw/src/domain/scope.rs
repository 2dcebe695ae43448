//! Scope registry
//!
//! Product areas a ticket can belong to. The chosen scope keys become the
//! bracketed title prefix (`[UI]:`, `[UI+API]:`).

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Scope {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub static SCOPES: &[Scope] = &[
    Scope {
        key: "ui",
        label: "User Interface",
        description: "Screens, components, layout, styling and client-side interaction",
    },
    Scope {
        key: "api",
        label: "API",
        description: "Public or internal HTTP endpoints, request and response contracts",
    },
    Scope {
        key: "backend",
        label: "Backend",
        description: "Server-side business logic, jobs and integrations",
    },
    Scope {
        key: "database",
        label: "Database",
        description: "Schema, migrations, queries and data integrity",
    },
    Scope {
        key: "infra",
        label: "Infrastructure",
        description: "Deployment, CI/CD, hosting, networking and observability",
    },
    Scope {
        key: "mobile",
        label: "Mobile",
        description: "iOS and Android applications",
    },
    Scope {
        key: "security",
        label: "Security",
        description: "Authentication, authorization, secrets and vulnerabilities",
    },
    Scope {
        key: "analytics",
        label: "Analytics",
        description: "Tracking, reporting, dashboards and data pipelines",
    },
];

impl Scope {
    /// Look up a scope by key, ignoring case and surrounding whitespace
    pub fn get(key: &str) -> Option<&'static Scope> {
        let key = key.trim().to_lowercase();
        SCOPES.iter().find(|s| s.key == key)
    }

    pub fn keys() -> Vec<&'static str> {
        SCOPES.iter().map(|s| s.key).collect()
    }

    /// Upper-case tag used inside the title brackets
    pub fn tag(&self) -> String {
        self.key.to_uppercase()
    }
}

/// Title prefix for a set of scopes: `[UI]:` for one, `[UI+API]:` for several
pub fn title_prefix(scopes: &[&Scope]) -> String {
    debug!(count = scopes.len(), "title_prefix: called");
    let tags: Vec<String> = scopes.iter().map(|s| s.tag()).collect();
    format!("[{}]:", tags.join("+"))
}
