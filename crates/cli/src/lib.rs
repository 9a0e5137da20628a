pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use caseforge_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "caseforge",
    about = "Caseforge dataset generator CLI",
    long_about = "Generate deterministic, referentially consistent case-management datasets.",
    after_help = "Examples:\n  caseforge migrate\n  caseforge org acme --name \"Acme Holdings\"\n  caseforge seed --org acme --seed 7\n  caseforge seed --org acme --dry-run"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a caseforge.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the SQLite database url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override the log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the master seed")]
    seed: Option<u64>,
    #[arg(long, global = true, help = "Override the generation date (YYYY-MM-DD)")]
    current_date: Option<NaiveDate>,
    #[arg(long, global = true, help = "Override the intake record volume")]
    intake_records: Option<usize>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                master_seed: self.seed,
                current_date: self.current_date,
                intake_records: self.intake_records,
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Register an organization so it can be seeded")]
    Org {
        slug: String,
        #[arg(long, help = "Display name, defaults to the slug")]
        name: Option<String>,
    },
    #[command(about = "Generate and persist the full dataset for one organization")]
    Seed {
        #[arg(long = "org", help = "Slug of a registered organization")]
        org: String,
        #[arg(long, help = "Generate into memory only and report what would be written")]
        dry_run: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "List generation phases with their dependencies")]
    Phases,
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when commands run in-process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match &cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Org { slug, name } => commands::org::run(&options, slug, name.as_deref()),
        Command::Seed { org, dry_run } => commands::seed::run(&options, org, *dry_run),
        Command::Config => commands::config::run(&options),
        Command::Phases => commands::phases::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_overrides_map_onto_load_options() {
        let cli = Cli::try_parse_from([
            "caseforge",
            "seed",
            "--org",
            "acme",
            "--seed",
            "7",
            "--current-date",
            "2026-02-02",
            "--intake-records",
            "300",
        ])
        .expect("parse");

        let options = cli.global.load_options();
        assert_eq!(options.overrides.master_seed, Some(7));
        assert_eq!(options.overrides.intake_records, Some(300));
        assert_eq!(
            options.overrides.current_date.map(|date| date.to_string()).as_deref(),
            Some("2026-02-02")
        );
        assert!(!options.require_file);
        assert!(matches!(cli.command, Command::Seed { ref org, dry_run: false } if org == "acme"));
    }

    #[test]
    fn malformed_dates_are_rejected_by_the_parser() {
        let parsed = Cli::try_parse_from(["caseforge", "phases", "--current-date", "02/02/2026"]);
        assert!(parsed.is_err());
    }
}
