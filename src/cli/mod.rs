//! CLI command definitions and handlers

mod audits;
mod init;
mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::GatherMode;
use crate::reporters::OutputFormat;

/// pagescore - Web page audit scoring
#[derive(Parser, Debug)]
#[command(name = "pagescore")]
#[command(
    version,
    about = "Score web page audits from saved artifacts: isolated audits, weighted categories, one overall score",
    after_help = "\
Examples:
  pagescore run artifacts.json                      Score a page, JSON report on stdout
  pagescore run artifacts.json --format text        Terminal summary
  pagescore run artifacts.json -o report.json       Write the report to a file
  pagescore score report.json --config strict.toml  Re-score saved audits with other weights
  pagescore audits                                  List the built-in audits"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every configured audit against an artifacts file and score the page
    #[command(after_help = "\
Examples:
  pagescore run artifacts.json
  pagescore run artifacts.json --config pagescore.toml --format text
  pagescore run artifacts.json -o report.json")]
    Run {
        /// Artifacts JSON file (artifact name -> value)
        artifacts: PathBuf,

        /// Config file (TOML or JSON). Defaults to pagescore.toml or
        /// .pagescorerc.json in the current directory, then the built-in config
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format: json, text
        #[arg(long, short = 'f', default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Score saved audit results without running audits
    #[command(after_help = "\
Accepts a full JSON report (its audits are re-scored) or a bare map of
audit id to audit result.

Examples:
  pagescore score report.json --config strict.toml
  pagescore score audits.json --gather-mode snapshot --format text")]
    Score {
        /// Saved report or audit results JSON file
        results: PathBuf,

        /// Config file (TOML or JSON)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Gather mode the results were produced in (default: taken from
        /// the saved report, else navigation)
        #[arg(long)]
        gather_mode: Option<GatherMode>,

        /// Output format: json, text
        #[arg(long, short = 'f', default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write a pagescore.toml with the built-in categories and weights
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing pagescore.toml
        #[arg(long)]
        force: bool,
    },

    /// List the registered audits
    Audits,
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            artifacts,
            config,
            format,
            output,
        } => run::run(&artifacts, config.as_deref(), format, output.as_deref()).await,

        Commands::Score {
            results,
            config,
            gather_mode,
            format,
            output,
        } => run::score(
            &results,
            config.as_deref(),
            gather_mode,
            format,
            output.as_deref(),
        ),

        Commands::Init { path, force } => init::run(&path, force),

        Commands::Audits => audits::run(),
    }
}
