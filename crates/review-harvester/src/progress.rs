// Copyright 2026 Review Harvester Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for harvest telemetry.
//!
//! The collector and the worker pool emit `ProgressEvent`s which flow through
//! a `tokio::sync::broadcast` channel to any subscriber (the CLI progress bar,
//! tests). When no subscriber exists, events are silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A progress event emitted during a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A pipeline phase has started.
    PhaseStarted { phase: Phase, message: String },
    /// A pipeline phase finished.
    PhaseCompleted {
        phase: Phase,
        message: String,
        duration_ms: u64,
    },
    /// One listing page was scrolled and its review links collected.
    PageCollected {
        page: u32,
        links: usize,
        total_links: usize,
    },
    /// The job queue was seeded.
    JobsQueued { urls: usize, workers: usize },
    /// A worker published a record.
    RecordExtracted { worker: usize, url: String },
    /// A worker discarded a job.
    JobFailed {
        worker: usize,
        url: String,
        reason: String,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Listing traversal and link collection.
    Frontier,
    /// Parallel page extraction.
    Extraction,
    /// Aggregation and table export.
    Export,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frontier => write!(f, "Frontier"),
            Self::Extraction => write!(f, "Extraction"),
            Self::Export => write!(f, "Export"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Cloneable emitter shared by the collector and every worker of one run.
///
/// Send errors (no receiver listening) are ignored.
#[derive(Clone)]
pub struct Progress {
    tx: Option<ProgressSender>,
    run_id: Arc<str>,
    seq: Arc<AtomicU64>,
}

impl Progress {
    pub fn new(tx: Option<ProgressSender>, run_id: impl Into<String>) -> Self {
        Self {
            tx,
            run_id: Arc::from(run_id.into()),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// An emitter that drops everything.
    pub fn disabled() -> Self {
        Self::new(None, "")
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.to_string(),
                seq,
                event,
            });
        }
    }
}
