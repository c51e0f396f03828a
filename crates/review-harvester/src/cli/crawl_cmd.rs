//! `review-harvester crawl`: full two-phase run.

use crate::aggregate::CsvTableWriter;
use crate::cli::{output, progress_bar};
use crate::config::HarvestConfig;
use crate::pipeline::{self, HarvestReport};
use crate::progress::{self, Progress};
use crate::renderer::chromium::ChromiumRenderer;
use anyhow::{Context, Result};

/// Run the crawl command.
pub async fn run(config: &HarvestConfig) -> Result<()> {
    config.validate()?;
    let renderer = ChromiumRenderer::new(config)?;
    let run_id = uuid::Uuid::new_v4().to_string();

    let show_bar = !output::is_quiet() && !output::is_json();
    let (progress, bar) = if show_bar {
        let (tx, rx) = progress::channel();
        (Progress::new(Some(tx), run_id), Some(progress_bar::spawn(rx)))
    } else {
        (Progress::new(None, run_id), None)
    };

    let result = pipeline::run(config, &renderer, &CsvTableWriter, &progress).await;
    drop(progress);
    if let Some(bar) = bar {
        let _ = bar.await;
    }
    let report = result.context("harvest failed")?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&report)?);
    } else if !output::is_quiet() {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &HarvestReport) {
    println!("Frontier completed in {:.0}s", report.frontier_secs);
    println!("Extraction completed in {:.0}s", report.extraction_secs);
    println!(
        "Reviews processed: {} of {} urls ({} failed, {} workers)",
        report.records_written, report.urls_discovered, report.jobs_failed, report.workers
    );
    println!("Exported to {}", report.out_path.display());
    if report.output_verified {
        println!("Output file updated");
    } else {
        println!("Output file could not be verified as updated");
    }
    println!("Total time: {:.1} minutes", report.total_secs / 60.0);
}
