//! CLI tool for maintaining a third-party notices document

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process;
use third_party_notices::{run_check, run_update, NoticeConfig, NoticeError, UpdateOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "notices")]
#[command(about = "Maintain and validate a third-party notices document for a .NET project", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to custom configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the notices document from the resolved dependencies
    Update {
        /// Project file or directory to scan for package references
        #[arg(long)]
        project: Option<PathBuf>,

        /// Notices document to read and rewrite
        #[arg(long)]
        notices: Option<PathBuf>,

        /// Allow network fallbacks (SPDX registry, declared URLs, repositories)
        #[arg(long)]
        allow_network: bool,

        /// Ignore cached license texts and re-acquire everything
        #[arg(long)]
        force_refresh: bool,

        /// Show a diff of the planned document without writing it
        #[arg(long)]
        dry_run: bool,

        /// Do not rewrite the families configuration after the run
        #[arg(long)]
        no_sync_families: bool,

        /// Re-acquire only the family containing this package
        #[arg(long)]
        package: Option<String>,

        /// Write the run trace to this path instead of the default
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Validate an existing notices document (exit code based)
    Check {
        /// Notices document to validate
        #[arg(long)]
        notices: Option<PathBuf>,

        /// Write the structured report to this path as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = if let Some(config_path) = &cli.config {
        match NoticeConfig::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{} Failed to load config: {}", "Error:".red().bold(), e);
                process::exit(1);
            }
        }
    } else {
        NoticeConfig::default()
    };

    match cli.command {
        Commands::Update {
            project,
            notices,
            allow_network,
            force_refresh,
            dry_run,
            no_sync_families,
            package,
            trace,
        } => {
            if let Some(project) = project {
                config.paths.project_file = project;
            }
            if let Some(notices) = notices {
                config.paths.notices_file = notices;
            }
            let opts = UpdateOptions {
                allow_network,
                force_refresh,
                dry_run,
                sync_families: !no_sync_families,
                package,
                trace_file: trace,
            };

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            spinner.set_message("Updating third-party notices...");
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));

            let result = run_update(&config, &opts);

            spinner.finish_and_clear();

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(NoticeError::NoDirectPackages(path)) => {
                    eprintln!(
                        "{} No direct package references found in {}",
                        "Error:".red().bold(),
                        path
                    );
                    process::exit(1);
                }
                Err(NoticeError::UnresolvedPackages(ids)) => {
                    eprintln!(
                        "{} {} package(s) could not be resolved to a version:",
                        "Error:".red().bold(),
                        ids.len()
                    );
                    for id in &ids {
                        eprintln!("  - {}", id);
                    }
                    process::exit(2);
                }
                Err(NoticeError::MissingLicenses(ids)) => {
                    eprintln!(
                        "{} No license text could be acquired for {} package(s):",
                        "Error:".red().bold(),
                        ids.len()
                    );
                    for id in &ids {
                        eprintln!("  - {}", id);
                    }
                    process::exit(2);
                }
                Err(e) => {
                    eprintln!("{} Update failed: {}", "Error:".red().bold(), e);
                    process::exit(1);
                }
            };

            for warning in &outcome.warnings {
                eprintln!(
                    "{} family {} has {} license variants across {} package(s)",
                    "Warning:".yellow().bold(),
                    warning.family,
                    warning.variants.len(),
                    warning.packages.len()
                );
            }

            if let Some(diff) = &outcome.diff {
                if diff.trim().is_empty() {
                    println!(
                        "{} {} is already up to date",
                        "Success:".green().bold(),
                        config.paths.notices_file.display()
                    );
                } else {
                    println!("{}", diff);
                    println!("{} Dry run, nothing written", "Note:".cyan().bold());
                }
            } else {
                println!(
                    "{} Wrote {} ({} packages in {} families)",
                    "Success:".green().bold(),
                    config.paths.notices_file.display(),
                    outcome.packages.len(),
                    outcome.family_map.len()
                );
            }
            println!("Trace: {}", outcome.trace_path.display());
        }

        Commands::Check { notices, trace } => {
            let notices_path = notices.unwrap_or_else(|| config.paths.notices_file.clone());
            let report = match run_check(&config, &notices_path) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("{} Check failed: {}", "Error:".red().bold(), e);
                    process::exit(1);
                }
            };

            if let Some(trace_path) = trace {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => {
                        if let Err(e) = std::fs::write(&trace_path, json) {
                            eprintln!(
                                "{} Failed to write report to {}: {}",
                                "Error:".red().bold(),
                                trace_path.display(),
                                e
                            );
                            process::exit(1);
                        }
                    }
                    Err(e) => {
                        eprintln!("{} Failed to serialize report: {}", "Error:".red().bold(), e);
                        process::exit(1);
                    }
                }
            }

            for error in &report.errors {
                eprintln!("{} {}", "Error:".red().bold(), error);
            }
            for warning in &report.warnings {
                eprintln!("{} {}", "Warning:".yellow().bold(), warning);
            }

            if report.has_errors() {
                process::exit(2);
            }
            if report.has_warnings() {
                println!(
                    "{} {} section(s) checked, {} warning(s)",
                    "Passed:".yellow().bold(),
                    report.sections_count,
                    report.warnings.len()
                );
                process::exit(1);
            }
            println!(
                "{} {} section(s) checked, no issues",
                "Success:".green().bold(),
                report.sections_count
            );
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
