//! Built-in tools: user profile lookup and system metrics.
//!
//! Tool names resolve through a fixed table to a closed [`ToolKind`];
//! anything not in the table is [`ToolKind::Unknown`].

use std::future::Future;

use chrono::Utc;
use serde_json::{Map, Value, json};

use relay_types::error::ToolError;
use relay_types::tool::ToolDefinition;

use super::executor::ToolExecutor;

const CPU_USAGE_PERCENT: f64 = 42.5;
const MEMORY_USAGE_PERCENT: f64 = 58.3;
const MEMORY_AVAILABLE_GB: f64 = 8.2;

/// Closed set of tools the relay knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    FetchUserProfile,
    GetSystemMetrics,
    Unknown,
}

type Handler = fn(&Map<String, Value>) -> Result<Value, ToolError>;

const TOOL_TABLE: &[(&str, ToolKind)] = &[
    ("fetch_user_profile", ToolKind::FetchUserProfile),
    ("get_system_metrics", ToolKind::GetSystemMetrics),
];

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        TOOL_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
            .unwrap_or(ToolKind::Unknown)
    }

    fn handler(self) -> Option<Handler> {
        match self {
            ToolKind::FetchUserProfile => Some(fetch_user_profile),
            ToolKind::GetSystemMetrics => Some(get_system_metrics),
            ToolKind::Unknown => None,
        }
    }
}

/// The relay's own tool set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTools;

impl ToolExecutor for BuiltinTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "fetch_user_profile".to_string(),
                description: "Fetch a user's profile information from the internal database"
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "user_id": {
                            "type": "string",
                            "description": "The ID of the user to look up"
                        }
                    },
                    "required": ["user_id"]
                }),
            },
            ToolDefinition {
                name: "get_system_metrics".to_string(),
                description: "Get current system metrics such as CPU and memory usage"
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "metric_type": {
                            "type": "string",
                            "enum": ["cpu", "memory", "all"],
                            "description": "Which metrics to return"
                        }
                    },
                    "required": ["metric_type"]
                }),
            },
        ]
    }

    fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send {
        let result = match ToolKind::from_name(name).handler() {
            None => Ok(json!({ "error": format!("Unknown tool: {name}") })),
            Some(handler) => match arguments.as_object() {
                Some(args) => handler(args),
                None => Err(ToolError::InvalidArguments(
                    "arguments must be a JSON object".to_string(),
                )),
            },
        };
        async move { result }
    }
}

fn fetch_user_profile(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let user_id = args
        .get("user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments("missing string field 'user_id'".to_string()))?;

    let profile = match user_id {
        "user1" => json!({
            "name": "Alice Johnson",
            "email": "alice@example.com",
            "status": "active",
            "plan": "premium",
            "created_at": "2023-06-15",
        }),
        "user2" => json!({
            "name": "Bob Smith",
            "email": "bob@example.com",
            "status": "active",
            "plan": "free",
            "created_at": "2024-01-20",
        }),
        other => {
            let short: String = other.chars().take(8).collect();
            json!({
                "name": format!("User {short}"),
                "email": format!("{other}@example.com"),
                "status": "pending",
                "plan": "free",
                "created_at": "2024-01-01",
            })
        }
    };

    let mut result = Map::new();
    result.insert("user_id".to_string(), Value::String(user_id.to_string()));
    if let Value::Object(fields) = profile {
        result.extend(fields);
    }
    Ok(Value::Object(result))
}

fn get_system_metrics(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let metric_type = args.get("metric_type").and_then(Value::as_str).unwrap_or("all");

    let metrics = match metric_type {
        "cpu" => json!({
            "cpu_usage_percent": CPU_USAGE_PERCENT,
            "timestamp": timestamp,
        }),
        "memory" => json!({
            "memory_usage_percent": MEMORY_USAGE_PERCENT,
            "memory_available_gb": MEMORY_AVAILABLE_GB,
            "timestamp": timestamp,
        }),
        _ => json!({
            "cpu_usage_percent": CPU_USAGE_PERCENT,
            "memory_usage_percent": MEMORY_USAGE_PERCENT,
            "memory_available_gb": MEMORY_AVAILABLE_GB,
            "timestamp": timestamp,
        }),
    };
    Ok(metrics)
}
