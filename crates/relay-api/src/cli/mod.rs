//! CLI command definitions for the `relayd` binary.
//!
//! Uses clap derive macros. Every configuration override can also be given
//! through the environment.

pub mod check;
pub mod session;

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use relay_infra::config::ConfigOverrides;

/// Real-time conversational relay.
#[derive(Parser)]
#[command(name = "relayd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit newline-delimited JSON logs.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Path to relay.toml (defaults to the platform config directory).
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Values layered over the config file.
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// API key for the completion backend.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend.
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Model identifier.
    #[arg(long, global = true, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[arg(long, global = true, env = "LLM_TEMPERATURE")]
    pub temperature: Option<f64>,

    /// Maximum tokens per completion.
    #[arg(long, global = true, env = "LLM_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Backend connect timeout in seconds.
    #[arg(long, global = true, env = "LLM_TIMEOUT")]
    pub llm_timeout: Option<u64>,

    /// SQLite URL of the durable store (e.g. `sqlite://relay.db`).
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Idle timeout in seconds (0 disables).
    #[arg(long, global = true, env = "SESSION_TIMEOUT_SECONDS")]
    pub session_timeout: Option<u64>,

    /// Verbose logging.
    #[arg(
        long,
        global = true,
        env = "DEBUG",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,
}

impl OverrideArgs {
    /// Split into the API key and the file-level overrides.
    pub fn into_parts(self, host: Option<String>, port: Option<u16>) -> (Option<String>, ConfigOverrides) {
        let overrides = ConfigOverrides {
            base_url: self.base_url,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.llm_timeout,
            database_url: self.database_url,
            host,
            port,
            idle_timeout_secs: self.session_timeout,
            debug: self.debug,
        };
        let api_key = self.api_key.filter(|k| !k.trim().is_empty());
        (api_key, overrides)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve {
        /// Port to listen on.
        #[arg(long, env = "SERVER_PORT")]
        port: Option<u16>,

        /// Host to bind to.
        #[arg(long, env = "SERVER_HOST")]
        host: Option<String>,
    },

    /// Inspect persisted sessions.
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Show resolved configuration and probe the durable store.
    Check,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Show a session record and its event history.
    Show {
        /// Session id.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "relayd",
            "--model",
            "gpt-4o",
            "serve",
            "--port",
            "9000",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve { port, .. } => assert_eq!(port, Some(9000)),
            _ => panic!("expected serve"),
        }
        assert_eq!(cli.overrides.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_into_parts_drops_blank_key() {
        let args = OverrideArgs {
            api_key: Some("  ".to_string()),
            session_timeout: Some(30),
            ..Default::default()
        };
        let (key, overrides) = args.into_parts(None, Some(8080));
        assert!(key.is_none());
        assert_eq!(overrides.idle_timeout_secs, Some(30));
        assert_eq!(overrides.port, Some(8080));
    }
}
