//! `conclave ask` — Answer a query with the collaborating specialists.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use anyhow::Context;
use conclave_agent::{Engine, MessageStatus, RequestOptions, RequestOutcome};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub async fn run(
    config: Option<&Path>,
    query: &str,
    json: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let engine = Engine::from_config(&config).context("Failed to build engine")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight agents");
            on_interrupt.cancel();
        }
    });

    let mut options = RequestOptions::default().with_cancel(cancel);
    if let Some(secs) = timeout_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    if !json {
        eprint!("  Thinking...");
    }
    let outcome = engine.handle_request_with(query, options).await;
    if !json {
        eprint!("\r              \r");
    }
    let outcome = outcome?;

    if json {
        println!("{}", to_json(&outcome)?);
    } else {
        print!("{}", render(&outcome));
    }
    Ok(())
}

/// The session plus final answer as pretty JSON.
pub fn to_json(outcome: &RequestOutcome) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "final_answer": outcome.final_answer,
        "session": outcome.session,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Human-readable transcript: routing, each agent turn, then the answer.
pub fn render(outcome: &RequestOutcome) -> String {
    let session = &outcome.session;
    let mut out = String::new();

    if let Some(decision) = session.decision() {
        let _ = writeln!(out, "🧭 Routing ({}, {} confidence)", decision.source, decision.confidence);
        let participants: Vec<&str> = decision.participants().map(|c| c.as_str()).collect();
        let _ = writeln!(out, "   Mode:    {}", decision.mode);
        let _ = writeln!(out, "   Agents:  {}", participants.join(" → "));
        if !decision.rationale.is_empty() {
            let _ = writeln!(out, "   Why:     {}", decision.rationale);
        }
        out.push('\n');
    }

    for message in session.messages() {
        let marker = match message.status {
            MessageStatus::Success => "✅",
            MessageStatus::Error => "⚠️ ",
        };
        let _ = writeln!(out, "{marker} [{}] {}", message.ordinal + 1, message.label);
        if let Some(next) = &message.suggested_capability {
            let _ = writeln!(out, "   suggests: {next}");
        }
        if message.status == MessageStatus::Error {
            let _ = writeln!(out, "   {}", message.content);
        }
    }

    let _ = writeln!(out, "\n{}", "=".repeat(48));
    let _ = writeln!(out, "{}", outcome.final_answer);
    out
}
