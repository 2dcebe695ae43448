//! Interactive drafting session
//!
//! Drives the clarification loop from the terminal: every question the model
//! asks is shown to the user and the answer is appended to the request's
//! clarifications until a ticket is drafted or the round budget runs out.

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::domain::{IssueType, TicketDraft, TicketRequest, TicketResponse};
use crate::pipeline::TicketPipeline;

/// What a line of user input means
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Answer(String),
    Quit,
    Skip,
}

/// Interactive clarification session
pub struct DraftSession {
    pipeline: TicketPipeline,
    request: TicketRequest,
}

impl DraftSession {
    pub fn new(pipeline: TicketPipeline, request: TicketRequest) -> Self {
        debug!(scope = ?request.scope, "DraftSession::new: called");
        Self { pipeline, request }
    }

    /// Run until the pipeline reaches a terminal response or the user quits
    ///
    /// Returns `None` when the user quit before the dialogue finished.
    pub async fn run(&mut self) -> Result<Option<TicketResponse>> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        if self.request.text.trim().is_empty() {
            println!("{}", "Describe the issue:".bright_cyan());
            match read_input(&mut rl)? {
                Input::Answer(text) => self.request.text = text,
                Input::Quit | Input::Skip => return Ok(None),
            }
        } else {
            println!("{} {}", ">".bright_green(), self.request.text);
        }

        loop {
            println!("{}", "Drafting...".dimmed());
            let response = match self.pipeline.run(&self.request).await {
                Ok(response) => response,
                Err(e) => e.to_response(),
            };

            if response.is_terminal() {
                return Ok(Some(response));
            }

            println!();
            println!("{}", render_response(&response));

            loop {
                match read_input(&mut rl)? {
                    Input::Answer(answer) => {
                        self.request.previous_clarifications.push(answer);
                        break;
                    }
                    Input::Skip => continue,
                    Input::Quit => return Ok(None),
                }
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Ticketwright".bright_cyan().bold());
        println!("Scope: {}", self.request.scope.join(", "));
        println!("Type {} to quit", "/quit".yellow());
        println!();
    }
}

fn read_input(rl: &mut DefaultEditor) -> Result<Input> {
    match rl.readline(&format!("{} ", ">".bright_green())) {
        Ok(line) => {
            let input = parse_input(&line);
            if let Input::Answer(answer) = &input {
                let _ = rl.add_history_entry(answer.as_str());
            }
            Ok(input)
        }
        Err(ReadlineError::Interrupted) => {
            // Ctrl+C - just show new prompt
            println!("^C");
            Ok(Input::Skip)
        }
        Err(ReadlineError::Eof) => {
            // Ctrl+D - exit
            println!();
            Ok(Input::Quit)
        }
        Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
    }
}

fn parse_input(line: &str) -> Input {
    let input = line.trim();
    match input {
        "" => Input::Skip,
        "/quit" | "/q" | "/exit" => Input::Quit,
        _ => Input::Answer(input.to_string()),
    }
}

/// Human-readable rendering of a terminal response
pub fn render_response(response: &TicketResponse) -> String {
    match response {
        TicketResponse::Done(draft) => render_ticket(draft),
        TicketResponse::NeedsInfo {
            reason,
            missing_info_prompt,
        } => format!(
            "{} {}\n{}",
            "Need more information:".yellow(),
            reason.dimmed(),
            missing_info_prompt.bright_white().bold()
        ),
        TicketResponse::Error { reason, code } => match code {
            Some(code) => format!("{} {} ({:?})", "Error:".red(), reason, code),
            None => format!("{} {}", "Error:".red(), reason),
        },
    }
}

/// Render a drafted ticket for the terminal
pub fn render_ticket(draft: &TicketDraft) -> String {
    let label = IssueType::get(&draft.issue_type)
        .map(|t| t.label)
        .unwrap_or(draft.issue_type.as_str());

    let mut out = Vec::new();
    out.push(format!("{}", draft.title.bright_white().bold()));
    out.push(format!("{} {}   {} {}", "Type:".dimmed(), label, "Scope:".dimmed(), draft.scope));

    let mut meta = Vec::new();
    if let Some(priority) = draft.priority {
        meta.push(format!("priority {:?}", priority).to_lowercase());
    }
    if let Some(severity) = draft.severity {
        meta.push(format!("severity {:?}", severity).to_lowercase());
    }
    if draft.multi_item {
        meta.push("multiple items".to_string());
    }
    if !meta.is_empty() {
        out.push(meta.join(", ").dimmed().to_string());
    }

    out.push(String::new());
    out.push(draft.description.clone());

    for (heading, items) in [
        ("Acceptance criteria", &draft.acceptance_criteria),
        ("Labels", &draft.labels),
        ("Components", &draft.components),
        ("Dependencies", &draft.dependencies),
        ("Risk areas", &draft.risk_areas),
    ] {
        if !items.is_empty() {
            out.push(String::new());
            out.push(heading.yellow().to_string());
            out.extend(items.iter().map(|i| format!("  - {}", i)));
        }
    }

    out.join("\n")
}
