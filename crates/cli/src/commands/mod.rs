pub mod config;
pub mod migrate;
pub mod org;
pub mod phases;
pub mod seed;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use caseforge_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, Value::Null)
    }

    /// Success envelope carrying a structured `data` payload.
    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure whose exit code follows from its error class.
    pub fn classified(command: &str, error_class: &str, message: impl Into<String>) -> Self {
        Self::failure(command, error_class, message, exit_code_for(error_class))
    }
}

/// Exit code per error class. Unknown classes map to 1.
pub fn exit_code_for(error_class: &str) -> u8 {
    match error_class {
        "config_validation" | "distribution_config" => 2,
        "runtime_init" => 3,
        "db_connectivity" => 4,
        "migration" => 5,
        "missing_prerequisite" => 6,
        "persistence_batch" | "store_read" => 7,
        "invariant_violation" | "template" => 8,
        _ => 1,
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        let message = format!("configuration issue: {error}");
        CommandResult::classified(command, "config_validation", message)
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
        .map_err(|error| CommandResult::classified(command, "runtime_init", format!("{error:#}")))
}
