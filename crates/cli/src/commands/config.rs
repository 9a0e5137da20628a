use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::Value;

use caseforge_core::config::{AppConfig, LoadOptions};

use crate::commands::{load_config, CommandResult};

/// Where an effective value came from, highest precedence first: env, file, default.
const ATTRIBUTED_KEYS: &[(&str, &str)] = &[
    ("database.url", "CASEFORGE_DATABASE_URL"),
    ("database.max_connections", "CASEFORGE_DATABASE_MAX_CONNECTIONS"),
    ("database.timeout_secs", "CASEFORGE_DATABASE_TIMEOUT_SECS"),
    ("logging.level", "CASEFORGE_LOGGING_LEVEL"),
    ("logging.format", "CASEFORGE_LOGGING_FORMAT"),
    ("generation.master_seed", "CASEFORGE_MASTER_SEED"),
    ("generation.current_date", "CASEFORGE_CURRENT_DATE"),
    ("generation.batch_size", "CASEFORGE_BATCH_SIZE"),
    ("generation.volumes.intake_records", "CASEFORGE_INTAKE_RECORDS"),
    ("generation.volumes.employees", "CASEFORGE_EMPLOYEES"),
];

#[derive(Debug, Serialize)]
struct SourcedValue {
    key: &'static str,
    source: String,
}

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    config_file: Option<String>,
    case_target: usize,
    sources: Vec<SourcedValue>,
    config: AppConfig,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = ATTRIBUTED_KEYS
        .iter()
        .map(|&(key, env_key)| SourcedValue {
            key,
            source: field_source(
                key,
                env_key,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    let effective = EffectiveConfig {
        config_file: config_file_path.map(|path| path.display().to_string()),
        case_target: config.generation.case_target(),
        sources,
        config,
    };
    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        effective,
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    [PathBuf::from("caseforge.toml"), PathBuf::from("config/caseforge.toml")]
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
