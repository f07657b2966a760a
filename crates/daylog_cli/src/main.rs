//! Command-line front end for the daylog pipeline.
//!
//! # Responsibility
//! - Parse arguments, load the converter config and start logging.
//! - Print diagnostics per source and map failures to the exit status.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use daylog_core::{
    convert_sources, default_log_level, import_sources, init_logging, read_sources,
    replace_month_from_sources, Converter, ConverterConfig, MonthKey, PipelineOutput,
    Severity,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "daylog", version, about = "Validate, convert and import time logs")]
struct Cli {
    /// Converter configuration as JSON (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report structural and semantic diagnostics without writing anything
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert sources and print the resulting days
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print every day as a JSON document
        #[arg(long)]
        json: bool,
    },

    /// Convert sources and write them into a SQLite database
    Import {
        db: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Replace one month (YYYY-MM) instead of upserting every day
        #[arg(long, value_parser = parse_month)]
        replace_month: Option<MonthKey>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let log_dir = log_dir
            .to_str()
            .context("log directory must be valid UTF-8")?;
        init_logging(level, log_dir).context("failed to start logging")?;
    }

    let converter = Converter::new(load_config(cli.config.as_deref())?)
        .context("invalid converter configuration")?;

    match cli.command {
        Command::Validate { files } => {
            let sources = read_sources(&files)?;
            let output = convert_sources(&converter, &sources);
            Ok(print_outcomes(&output))
        }

        Command::Convert { files, json } => {
            let sources = read_sources(&files)?;
            let output = convert_sources(&converter, &sources);
            let status = print_outcomes(&output);
            for day in output.days() {
                if json {
                    println!("{}", serde_json::to_string_pretty(&day.to_json()?)?);
                } else {
                    println!(
                        "{} getup={} activities={} sleep_total_s={}",
                        day.date,
                        day.getup_time.as_deref().unwrap_or("-"),
                        day.activities.len(),
                        day.stats.sleep_total_time
                    );
                }
            }
            Ok(status)
        }

        Command::Import {
            db,
            files,
            replace_month,
        } => {
            let sources = read_sources(&files)?;
            let conn = daylog_core::open_db(&db)
                .with_context(|| format!("failed to open `{}`", db.display()))?;
            let (output, summary) = match replace_month {
                Some(month) => replace_month_from_sources(&conn, &converter, &sources, month)?,
                None => import_sources(&conn, &converter, &sources)?,
            };
            let status = print_outcomes(&output);
            info!(
                "event=cli_import module=cli status=ok days={} records={}",
                summary.days_written, summary.records_written
            );
            println!(
                "imported days={} records={} new_projects={} replaced_days={}",
                summary.days_written,
                summary.records_written,
                summary.projects_inserted,
                summary.days_deleted
            );
            Ok(status)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConverterConfig> {
    let Some(path) = path else {
        return Ok(ConverterConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config `{}`", path.display()))
}

/// Prints every diagnostic; fails when a source was rejected or has errors.
fn print_outcomes(output: &PipelineOutput) -> ExitCode {
    let mut failed = false;
    for outcome in &output.outcomes {
        for error in outcome.report.iter() {
            eprintln!("{}: {}", outcome.name, error);
            failed |= error.severity() == Severity::Error;
        }
        if !outcome.accepted {
            eprintln!("{}: rejected, no days taken from this file", outcome.name);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn parse_month(value: &str) -> Result<MonthKey> {
    let Some((year, month)) = value.split_once('-') else {
        bail!("expected YYYY-MM, got `{value}`");
    };
    let year: i32 = year.parse().context("invalid year")?;
    let month: u32 = month.parse().context("invalid month")?;
    if !(1..=12).contains(&month) {
        bail!("month must be 1-12, got {month}");
    }
    Ok(MonthKey::new(year, month))
}
