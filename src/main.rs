use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use casewizard::config::Config;
use casewizard::logging;
use casewizard::session::{self, ActionOutcome, SessionReport, SessionScript};
use casewizard::AppContext;

#[derive(Parser)]
#[command(name = "casewizard")]
#[command(about = "Replay and inspect guarded case/authorization wizard sessions")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session script
    Run {
        /// Session script (TOML)
        script: PathBuf,

        /// Ask leave confirmations on the terminal instead of using scripted answers
        #[arg(short, long)]
        interactive: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also write it to this file
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = match cli.command {
        Commands::Run {
            script,
            interactive,
            json,
        } => cmd_run(config, &script, interactive, json).await,
        Commands::Config { write } => cmd_config(&config, write.as_deref()),
    };

    // Print log file path on exit if logs were written
    if let Some(log_path) = &logging_handle.log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    result
}

fn cmd_config(config: &Config, write: Option<&Path>) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
    print!("{}", rendered);

    if let Some(path) = write {
        config.save(path)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

async fn cmd_run(config: Config, script: &Path, interactive: bool, json: bool) -> Result<()> {
    let script = SessionScript::load(script)?;
    let ctx = AppContext::from_config(config);

    let report = session::run_session(&script, &ctx, interactive).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("Work item: {}", report.work_item);
    println!();

    for result in &report.results {
        let outcome = match &result.outcome {
            ActionOutcome::Done => "done".to_string(),
            ActionOutcome::Navigation(nav) => format!("{:?}", nav),
            ActionOutcome::Closed(closed) => {
                if *closed {
                    "closed".to_string()
                } else {
                    "kept open".to_string()
                }
            }
            ActionOutcome::Failed(reason) => format!("failed: {}", reason),
        };
        println!("  {:>3}  {:<24} {}", result.index + 1, result.action, outcome);
    }

    println!();
    let steps: Vec<String> = report
        .steps
        .iter()
        .map(|s| {
            if s.disabled {
                format!("{} (disabled)", s.id)
            } else {
                s.id.clone()
            }
        })
        .collect();
    println!("Steps:        {}", steps.join(", "));
    println!(
        "Active step:  {}",
        report.active_step.as_deref().unwrap_or("(none)")
    );
    println!("Open tabs:    {}", report.tabs.join(", "));
    println!(
        "Selected tab: {}",
        report.selected_tab.as_deref().unwrap_or("(none)")
    );

    if !report.toasts.is_empty() {
        println!();
        println!("Toasts:");
        for toast in &report.toasts {
            println!(
                "  [{}] {} {}",
                toast.timestamp.format("%H:%M:%S"),
                toast.kind,
                toast.text
            );
        }
    }
}
