//! Approval prompt implementations: interactive console, auto-approve for
//! non-interactive hosts, and a scripted queue for automation.

use crate::render::RendererSet;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tally_controller::{ActionRequest, Decision};

#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn decide(&self, request: &ActionRequest) -> Decision;
}

#[derive(Debug, Default)]
pub struct AutoApprovePrompt;

#[async_trait]
impl ApprovalPrompt for AutoApprovePrompt {
    async fn decide(&self, _request: &ActionRequest) -> Decision {
        Decision::Approve
    }
}

/// Pops pre-seeded decisions in order; an exhausted queue rejects rather than
/// letting a gated call through unattended.
#[derive(Default)]
pub struct QueuePrompt {
    decisions: Mutex<VecDeque<Decision>>,
}

impl QueuePrompt {
    pub fn with_decisions<I>(decisions: I) -> Self
    where
        I: IntoIterator<Item = Decision>,
    {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
        }
    }

    pub fn push_decision(&self, decision: Decision) {
        self.decisions
            .lock()
            .expect("queue prompt mutex should lock")
            .push_back(decision);
    }
}

#[async_trait]
impl ApprovalPrompt for QueuePrompt {
    async fn decide(&self, _request: &ActionRequest) -> Decision {
        self.decisions
            .lock()
            .expect("queue prompt mutex should lock")
            .pop_front()
            .unwrap_or(Decision::Reject)
    }
}

/// Parse a scripted `--answer` value: `approve`, `reject`, or `edit:{json}`.
pub fn parse_scripted_answer(raw: &str) -> Option<Decision> {
    match raw.trim() {
        "approve" => Some(Decision::Approve),
        "reject" => Some(Decision::Reject),
        other => {
            let args = other.strip_prefix("edit:")?;
            serde_json::from_str(args).ok().map(|args| Decision::Edit { args })
        }
    }
}

pub struct ConsolePrompt {
    renderers: Arc<RendererSet>,
}

impl ConsolePrompt {
    pub fn new(renderers: Arc<RendererSet>) -> Self {
        Self { renderers }
    }
}

#[async_trait]
impl ApprovalPrompt for ConsolePrompt {
    async fn decide(&self, request: &ActionRequest) -> Decision {
        let renderers = self.renderers.clone();
        let request = request.clone();
        match tokio::task::spawn_blocking(move || ask_console(&renderers, &request)).await {
            Ok(decision) => decision,
            Err(_) => Decision::Reject,
        }
    }
}

// The pending-action card is printed by the caller; this only collects the
// verdict (and replacement arguments for an edit).
fn ask_console(renderers: &RendererSet, request: &ActionRequest) -> Decision {
    let renderer = renderers.for_tool(&request.name);

    let raw = match read_line("[A]pprove / [R]eject / [E]dit: ") {
        Some(value) => value,
        None => return Decision::Reject,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "a" | "approve" | "y" | "yes" => Decision::Approve,
        "e" | "edit" => {
            let raw = match read_line(renderer.edit_prompt()) {
                Some(value) => value,
                None => return Decision::Reject,
            };
            match renderer.build_edit(request, &raw) {
                Some(args) => Decision::Edit { args },
                None => {
                    eprintln!("could not build replacement arguments; rejecting instead");
                    Decision::Reject
                }
            }
        }
        _ => Decision::Reject,
    }
}

fn read_line(prompt: &str) -> Option<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}").ok()?;
    stdout.flush().ok()?;

    let mut raw = String::new();
    io::stdin().read_line(&mut raw).ok()?;
    Some(raw.trim().to_string())
}
