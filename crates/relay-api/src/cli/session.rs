//! Session inspection CLI command.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use relay_types::session::{EventKind, SessionId, SessionState};

use crate::state::AppState;

/// Print a session record and its event history.
///
/// # Examples
///
/// ```bash
/// relayd session show 0190f5c2-...
/// relayd session show 0190f5c2-... --json
/// ```
pub async fn show_session(state: &AppState, id: &str, json: bool) -> Result<()> {
    let session_id = SessionId::new(id);
    let store = state.coordinator.store();

    let Some(record) = store.get_session(&session_id).await else {
        bail!("Session '{id}' not found");
    };
    let events = store.get_history(&session_id).await;

    if json {
        let out = serde_json::json!({
            "session": record,
            "events": events,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let state_label = match record.state {
        SessionState::Active => style("active").green(),
        SessionState::Closed => style("closed").dim(),
    };

    println!();
    println!(
        "  Session {} ({})",
        style(record.session_id.as_str()).cyan().bold(),
        state_label
    );
    println!();
    println!(
        "  {:<10} {}",
        style("User").dim(),
        record.user_id.as_deref().unwrap_or("-")
    );
    println!(
        "  {:<10} {}",
        style("Started").dim(),
        record.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(ended) = record.ended_at {
        println!(
            "  {:<10} {}",
            style("Ended").dim(),
            ended.format("%Y-%m-%d %H:%M:%S")
        );
    }
    if let Some(secs) = record.duration_seconds {
        println!("  {:<10} {}", style("Duration").dim(), format_duration(secs));
    }
    if let Some(summary) = &record.summary {
        println!("  {:<10} {}", style("Summary").dim(), summary);
    }
    println!();

    if events.is_empty() {
        println!("  {} No events recorded.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for event in &events {
        let kind_color = match event.kind {
            EventKind::UserMessage => Color::Cyan,
            EventKind::AiResponse => Color::Green,
            EventKind::ToolCall => Color::Yellow,
            EventKind::System => Color::DarkGrey,
        };
        table.add_row(vec![
            Cell::new(event.created_at.format("%H:%M:%S").to_string()).fg(Color::DarkGrey),
            Cell::new(event.kind.to_string()).fg(kind_color),
            Cell::new(truncate(&event.content, 80)),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "  {} event{}",
        style(events.len()).bold(),
        if events.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

fn format_duration(total_secs: i64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let head: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
