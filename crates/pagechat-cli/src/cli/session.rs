//! Stored chat session commands: list, show, reset, delete.

use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use pagechat_types::chat::{ChatSession, SessionId};

use crate::state::AppState;

/// First line of the latest message, shortened for a table cell.
fn preview(session: &ChatSession, max_chars: usize) -> String {
    let Some(last) = session.messages.last() else {
        return String::new();
    };
    let line = last.text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

fn parse_id(raw: &str) -> Result<SessionId> {
    raw.parse()
        .with_context(|| format!("'{raw}' is not a valid session id"))
}

pub async fn list_sessions(state: &AppState, url: Option<&str>, json: bool) -> Result<()> {
    let sessions = state.engine.sessions();
    let entries = match url {
        Some(url) => sessions.list_for_url(url).await?,
        None => sessions.list().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!(
            "  {} No chats yet. Start one with: {}",
            style("i").blue().bold(),
            style("pagechat chat <url>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Page").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Last message").fg(Color::White),
    ]);

    for session in &entries {
        table.add_row(vec![
            Cell::new(session.id).fg(Color::DarkGrey),
            Cell::new(&session.page_url).fg(Color::Cyan),
            Cell::new(session.messages.len()),
            Cell::new(
                session
                    .last_updated
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
            Cell::new(preview(session, 48)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(entries.len()).bold(),
        if entries.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

pub async fn show_session(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let session = state
        .engine
        .sessions()
        .get(id)
        .await?
        .with_context(|| format!("Session '{id}' not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Page:").bold(), style(&session.page_url).cyan());
    println!();
    for message in &session.messages {
        let time = message.created_at.with_timezone(&Local).format("%H:%M");
        println!(
            "  {} {}: {}",
            style(time).dim(),
            style(message.speaker()).bold(),
            message.text
        );
    }
    println!();
    Ok(())
}

/// Delete every session for `url` and open a fresh one.
pub async fn reset_sessions(state: &AppState, url: &str, json: bool) -> Result<()> {
    let removed = state.engine.sessions().list_for_url(url).await?.len();
    let fresh = state.engine.sessions().resolve(url, true).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "removed": removed, "session_id": fresh.id.to_string() })
        );
    } else {
        println!(
            "  {} Removed {removed} chat{} for {} ({} is new)",
            style("ok").green().bold(),
            if removed == 1 { "" } else { "s" },
            style(url).cyan(),
            style(fresh.id).dim()
        );
    }
    Ok(())
}

pub async fn delete_session(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let sessions = state.engine.sessions();
    sessions
        .get(id)
        .await?
        .with_context(|| format!("Session '{id}' not found"))?;
    sessions.delete(id).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id.to_string() }));
    } else {
        println!("  {} Deleted session {}", style("ok").green().bold(), style(id).dim());
    }
    Ok(())
}
