//! `review-harvester parse <url>`: extract a single review page.

use crate::cli::output;
use crate::config::HarvestConfig;
use crate::parser;
use crate::record::COLUMNS;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;

/// Run the parse command.
pub async fn run(config: &HarvestConfig, url: &str) -> Result<()> {
    let renderer = ChromiumRenderer::new(config)?;
    let mut session = renderer.new_session().await?;
    let parsed = parser::parse(session.as_mut(), url, &config.timings).await;
    let _ = session.close().await;
    let record = parsed?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&record)?);
        return Ok(());
    }
    let width = COLUMNS.iter().map(|c| c.len()).max().unwrap_or(0);
    for (column, value) in COLUMNS.iter().zip(record.values()) {
        println!("{column:>width$}  {value}");
    }
    Ok(())
}
