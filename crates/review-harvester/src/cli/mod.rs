//! CLI subcommand implementations for the review-harvester binary.

pub mod crawl_cmd;
pub mod doctor;
pub mod frontier_cmd;
pub mod output;
pub mod parse_cmd;
pub mod progress_bar;
