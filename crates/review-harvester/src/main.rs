// Copyright 2026 Review Harvester Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use review_harvester::cli;
use review_harvester::cli::output::{self, OutputMode};
use review_harvester::config::HarvestConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "review-harvester",
    about = "Review Harvester: collect review pages from a paginated listing into a CSV table",
    version,
    after_help = "Run 'review-harvester <command> --help' for details on each command.\nSettings not given as flags are read from REVIEW_HARVESTER_* environment variables."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the listing, extract every review, and write the table
    Crawl {
        /// Listing entry point
        #[arg(long)]
        start_url: Option<String>,
        /// Number of listing pages to walk
        #[arg(long)]
        max_pages: Option<u32>,
        /// Number of extraction workers (one browser each)
        #[arg(long, short = 'w')]
        workers: Option<usize>,
        /// Output CSV path
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Drop repeated review URLs before extraction
        #[arg(long)]
        dedupe: bool,
        /// Show the browser windows
        #[arg(long)]
        headful: bool,
    },
    /// Walk the listing and print the review URLs without extracting them
    Frontier {
        /// Listing entry point
        #[arg(long)]
        start_url: Option<String>,
        /// Number of listing pages to walk
        #[arg(long)]
        max_pages: Option<u32>,
        /// Drop repeated review URLs
        #[arg(long)]
        dedupe: bool,
    },
    /// Extract a single review page and print the record
    Parse {
        /// Review page URL
        url: String,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(mode: OutputMode) {
    let default_level = if mode.verbose {
        "review_harvester=debug"
    } else if mode.quiet {
        "review_harvester=warn"
    } else {
        "review_harvester=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if mode.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    output::init(mode);
    init_tracing(mode);

    let mut config = HarvestConfig::from_env();
    let result = match cli.command {
        Commands::Crawl {
            start_url,
            max_pages,
            workers,
            out,
            dedupe,
            headful,
        } => {
            if let Some(start_url) = start_url {
                config.start_url = start_url;
            }
            if let Some(max_pages) = max_pages {
                config.max_pages = max_pages;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(out) = out {
                config.out_path = out;
            }
            config.dedupe |= dedupe;
            if headful {
                config.headless = false;
            }
            cli::crawl_cmd::run(&config).await
        }
        Commands::Frontier {
            start_url,
            max_pages,
            dedupe,
        } => {
            if let Some(start_url) = start_url {
                config.start_url = start_url;
            }
            if let Some(max_pages) = max_pages {
                config.max_pages = max_pages;
            }
            config.dedupe |= dedupe;
            cli::frontier_cmd::run(&config).await
        }
        Commands::Parse { url } => cli::parse_cmd::run(&config, &url).await,
        Commands::Doctor => cli::doctor::run(&config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "review-harvester", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !output::is_quiet() && !output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
