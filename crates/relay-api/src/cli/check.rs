//! Configuration and store health check.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Print the resolved configuration (API key redacted) and probe the store.
pub async fn check(state: &AppState, json: bool) -> Result<()> {
    let config = &state.config;
    let database = state.database_status().await;
    let healthy = database != "unreachable" && state.api_key_configured;

    if json {
        let out = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "server": {
                "host": config.server.host,
                "port": config.server.port,
            },
            "llm": {
                "base_url": config.llm.base_url,
                "model": config.llm.model,
                "temperature": config.llm.temperature,
                "max_tokens": config.llm.max_tokens,
                "timeout_secs": config.llm.timeout_secs,
                "api_key": if state.api_key_configured { "set" } else { "missing" },
            },
            "session": {
                "idle_timeout_secs": config.session.idle_timeout_secs,
                "summary_drain_secs": config.session.summary_drain_secs,
            },
            "database": database,
            "healthy": healthy,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!(
        "  {} relayd v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!(
        "  {:<14} {}:{}",
        style("Listen").dim(),
        config.server.host,
        config.server.port
    );
    println!("  {:<14} {}", style("Backend").dim(), config.llm.base_url);
    println!(
        "  {:<14} {} (temperature {}, max {} tokens)",
        style("Model").dim(),
        config.llm.model,
        config.llm.temperature,
        config.llm.max_tokens
    );
    let idle = match config.session.idle_timeout_secs {
        0 => "disabled".to_string(),
        secs => format!("{secs}s"),
    };
    println!("  {:<14} {}", style("Idle timeout").dim(), idle);
    println!();
    println!(
        "  {} API key {}",
        check_mark(state.api_key_configured),
        if state.api_key_configured { "set" } else { "missing" }
    );
    println!(
        "  {} Session store: {}",
        check_mark(database != "unreachable"),
        database
    );
    println!();
    Ok(())
}
