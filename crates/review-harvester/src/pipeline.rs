//! Two-phase harvest: frontier discovery, then parallel extraction and export.

use crate::aggregate::{Aggregator, TableWriter};
use crate::config::HarvestConfig;
use crate::dispatch::WorkerPool;
use crate::error::HarvestResult;
use crate::frontier::{dedupe_preserving_order, FrontierCollector};
use crate::progress::{Phase, Progress, ProgressEventKind};
use crate::renderer::Renderer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{info, warn};

/// Summary of one harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub run_id: String,
    pub start_url: String,
    /// Frontier length after optional deduplication.
    pub urls_discovered: usize,
    pub records_written: usize,
    /// URL jobs that produced no record.
    pub jobs_failed: usize,
    pub workers: usize,
    pub frontier_secs: f64,
    pub extraction_secs: f64,
    pub total_secs: f64,
    pub out_path: PathBuf,
    /// Whether the output file's modification time shows this run wrote it.
    pub output_verified: bool,
    pub finished_at: DateTime<Utc>,
}

/// Phase one: open a session, walk the listing, close the session.
pub async fn collect_frontier(
    config: &HarvestConfig,
    renderer: &dyn Renderer,
    progress: &Progress,
) -> HarvestResult<Vec<String>> {
    let start = Instant::now();
    progress.emit(ProgressEventKind::PhaseStarted {
        phase: Phase::Frontier,
        message: format!("walking up to {} listing pages", config.max_pages),
    });

    let mut session = renderer.new_session().await?;
    let mut collector = FrontierCollector::new(config.timings.clone(), progress.clone());
    let opened = collector.open(session.as_mut(), &config.start_url).await;
    let urls = match opened {
        Ok(()) => collector.collect(session.as_mut(), config.max_pages).await,
        Err(e) => {
            let _ = session.close().await;
            return Err(e.into());
        }
    };
    if let Err(e) = session.close().await {
        warn!("failed to close listing session: {e:#}");
    }

    let total = urls.len();
    let urls = if config.dedupe {
        dedupe_preserving_order(urls)
    } else {
        urls
    };
    if urls.len() < total {
        info!("dropped {} repeated urls", total - urls.len());
    }

    progress.emit(ProgressEventKind::PhaseCompleted {
        phase: Phase::Frontier,
        message: format!("{} review urls", urls.len()),
        duration_ms: start.elapsed().as_millis() as u64,
    });
    Ok(urls)
}

/// Run both phases and export the table to `config.out_path`.
pub async fn run(
    config: &HarvestConfig,
    renderer: &dyn Renderer,
    writer: &dyn TableWriter,
    progress: &Progress,
) -> HarvestResult<HarvestReport> {
    config.validate()?;
    let start = Instant::now();
    info!(
        "harvest {} starting at {} (max_pages={}, workers={})",
        progress.run_id(),
        config.start_url,
        config.max_pages,
        config.workers
    );

    let urls = collect_frontier(config, renderer, progress).await?;
    let frontier_elapsed = start.elapsed();
    let urls_discovered = urls.len();
    info!("frontier complete: {urls_discovered} urls in {frontier_elapsed:.1?}");

    progress.emit(ProgressEventKind::PhaseStarted {
        phase: Phase::Extraction,
        message: format!("{urls_discovered} pages over {} workers", config.workers),
    });
    let pool = WorkerPool::new(config.workers, config.timings.clone(), progress.clone());
    let mut outcome = pool.dispatch(renderer, urls).await?;
    let extraction_elapsed = start.elapsed() - frontier_elapsed;
    progress.emit(ProgressEventKind::PhaseCompleted {
        phase: Phase::Extraction,
        message: format!(
            "{} jobs done, {} failed",
            outcome.jobs_done, outcome.jobs_failed
        ),
        duration_ms: extraction_elapsed.as_millis() as u64,
    });

    progress.emit(ProgressEventKind::PhaseStarted {
        phase: Phase::Export,
        message: config.out_path.display().to_string(),
    });
    let write_started = SystemTime::now();
    let rows = Aggregator::new(writer).export(&mut outcome.results, &config.out_path)?;
    let output_verified = written_since(&config.out_path, write_started);
    if !output_verified {
        warn!("{} was not updated by this run", config.out_path.display());
    }
    progress.emit(ProgressEventKind::PhaseCompleted {
        phase: Phase::Export,
        message: format!("{} rows", rows.len()),
        duration_ms: (start.elapsed() - frontier_elapsed - extraction_elapsed).as_millis()
            as u64,
    });

    let report = HarvestReport {
        run_id: progress.run_id().to_string(),
        start_url: config.start_url.clone(),
        urls_discovered,
        records_written: rows.len(),
        jobs_failed: outcome.jobs_failed,
        workers: outcome.workers,
        frontier_secs: frontier_elapsed.as_secs_f64(),
        extraction_secs: extraction_elapsed.as_secs_f64(),
        total_secs: start.elapsed().as_secs_f64(),
        out_path: config.out_path.clone(),
        output_verified,
        finished_at: Utc::now(),
    };
    info!(
        "harvest done: {} records from {} urls in {:.1}s",
        report.records_written, report.urls_discovered, report.total_secs
    );
    Ok(report)
}

/// Whether `path` was modified at or after `since`, allowing one second of
/// filesystem timestamp granularity.
fn written_since(path: &Path, since: SystemTime) -> bool {
    let floor = since
        .checked_sub(Duration::from_secs(1))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| modified >= floor)
        .unwrap_or(false)
}
