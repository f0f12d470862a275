//! Synthesizer — reduces a transcript to one final answer.
//!
//! Pure and deterministic: the same session always yields the same text.

use conclave_core::classifier::ExecutionMode;

use crate::session::{AgentMessage, CollaborationSession};

const NO_RESPONSES: &str = "No responses available.";

/// Build the final answer for a session.
///
/// Single and sequential sessions pass through the last message. Parallel
/// sessions get one labelled section per participant in decision order;
/// failed participants are listed without their content. When every
/// message failed the answer says so and gives the first failure.
pub fn synthesize(session: &CollaborationSession) -> String {
    let messages = session.messages();
    if messages.is_empty() {
        return NO_RESPONSES.to_string();
    }

    if messages.iter().all(|m| !m.is_success()) {
        return degraded(messages);
    }

    let mode = session.decision().map(|d| d.mode).unwrap_or(ExecutionMode::Single);
    match mode {
        ExecutionMode::Single | ExecutionMode::Sequential => messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| NO_RESPONSES.to_string()),
        ExecutionMode::Parallel => merge(session.query(), messages),
    }
}

fn merge(query: &str, messages: &[AgentMessage]) -> String {
    let sections: Vec<String> = messages
        .iter()
        .map(|m| {
            if m.is_success() {
                format!("### {}\n\n{}", m.label, m.content.trim())
            } else {
                format!("### {}\n\n_{} could not contribute to this answer._", m.label, m.label)
            }
        })
        .collect();

    format!(
        "**Multi-Agent Collaboration Response**\n\nQuery: {query}\n\n---\n\n{}",
        sections.join("\n\n---\n\n")
    )
}

fn degraded(messages: &[AgentMessage]) -> String {
    let detail = messages
        .iter()
        .find_map(|m| m.failure.as_ref().map(|f| f.detail.as_str()))
        .unwrap_or("unknown error");
    format!("This request could not be answered: no responder could satisfy the request ({detail}).")
}
