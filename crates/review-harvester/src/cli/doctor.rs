//! Environment readiness check.

use crate::config::HarvestConfig;
use crate::renderer::chromium::{find_chromium, CHROMIUM_PATH_ENV};
use anyhow::Result;

/// Check Chromium availability and the output destination.
pub async fn run(config: &HarvestConfig) -> Result<()> {
    println!("Review Harvester Doctor");
    println!("=======================");
    println!();

    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome or set {CHROMIUM_PATH_ENV}."),
    }

    match config.validate() {
        Ok(()) => println!(
            "[OK] Configuration valid ({} workers, {} pages)",
            config.workers, config.max_pages
        ),
        Err(e) => println!("[!!] {e}"),
    }

    let out_dir = config
        .out_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    if out_dir.exists() {
        println!("[OK] Output directory {} exists", out_dir.display());
    } else {
        println!("[..] Output directory {} will be created", out_dir.display());
    }

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
