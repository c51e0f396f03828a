// Copyright 2026 Review Harvester Contributors
// SPDX-License-Identifier: Apache-2.0

//! Review harvester library: discover review pages from a paginated listing,
//! then extract a fixed schema from each with a pool of browser workers.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod renderer;

pub use config::HarvestConfig;
pub use error::{HarvestError, HarvestResult};
pub use record::{Record, COLUMNS};
