//! Terminal progress display driven by harvest progress events.

use crate::progress::{ProgressEventKind, ProgressReceiver};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Render events from `rx` until every sender is dropped.
pub fn spawn(mut rx: ProgressReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event.event {
                ProgressEventKind::PhaseStarted { phase, message } => {
                    bar.set_message(format!("{phase}: {message}"));
                }
                ProgressEventKind::PageCollected {
                    page, total_links, ..
                } => {
                    bar.set_message(format!("Frontier: page {page}, {total_links} links"));
                }
                ProgressEventKind::JobsQueued { urls, .. } => {
                    bar.set_length(urls as u64);
                    bar.set_position(0);
                    if let Ok(style) = ProgressStyle::with_template(
                        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
                    ) {
                        bar.set_style(style);
                    }
                }
                ProgressEventKind::RecordExtracted { .. } => bar.inc(1),
                ProgressEventKind::JobFailed { url, .. } => {
                    bar.inc(1);
                    bar.println(format!("  failed: {url}"));
                }
                ProgressEventKind::Warning { message } => {
                    bar.println(format!("  warning: {message}"));
                }
                ProgressEventKind::PhaseCompleted { .. } => {}
            }
        }
        bar.finish_and_clear();
    })
}
