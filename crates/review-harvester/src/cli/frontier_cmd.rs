//! `review-harvester frontier`: walk the listing and print review URLs.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::pipeline;
use crate::progress::Progress;
use crate::renderer::chromium::ChromiumRenderer;
use anyhow::Result;

/// Run the frontier command.
pub async fn run(config: &HarvestConfig) -> Result<()> {
    config.validate()?;
    let renderer = ChromiumRenderer::new(config)?;
    let urls = pipeline::collect_frontier(config, &renderer, &Progress::disabled()).await?;

    if output::is_json() {
        output::print_json(&serde_json::json!(urls));
        return Ok(());
    }
    for url in &urls {
        println!("{url}");
    }
    if !output::is_quiet() {
        eprintln!("{} review urls", urls.len());
    }
    Ok(())
}
