//! Domain types for Ticketwright
//!
//! Static registries (issue types, scopes), the ticket draft and verdict the
//! model produces, and the request/response shapes exchanged with callers.

mod issue_type;
mod request;
mod scope;
mod ticket;

pub use issue_type::{ISSUE_TYPES, IssueType, Section};
pub use request::{ErrorCode, TicketRequest, TicketResponse};
pub use scope::{SCOPES, Scope, title_prefix};
pub use ticket::{ClarificationRequest, DataSensitivity, Priority, Severity, SufficiencyVerdict, TicketDraft};
