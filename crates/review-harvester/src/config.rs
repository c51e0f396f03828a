//! Harvest configuration: built-in defaults, then `REVIEW_HARVESTER_*`
//! environment overrides, then whatever the CLI sets on top.

use crate::error::{HarvestError, HarvestResult};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_START_URL: &str = "https://www.movierankings.net";
pub const DEFAULT_MAX_PAGES: u32 = 58;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_OUT_PATH: &str = "dataset/movies_raw.csv";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/122.0.0.0 Safari/537.36";

const ENV_PREFIX: &str = "REVIEW_HARVESTER_";

/// Waits and pauses used while driving pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// Readiness waits: listing control, first listing item, page heading.
    pub ready_timeout: Duration,
    /// Sleep used when a review page never signals readiness.
    pub ready_fallback_delay: Duration,
    /// Pause around the full-listing click.
    pub control_pause: Duration,
    /// Pause between a scroll and the offset sample that follows it.
    pub scroll_pause: Duration,
    /// Pause after the offset stabilizes, for trailing async content.
    pub scroll_settle: Duration,
    /// Pause after clicking "Next".
    pub next_pause: Duration,
    /// Pause after the last listing page before the session closes.
    pub final_page_pause: Duration,
    /// Pause a worker takes after each successful job.
    pub job_pause: Duration,
    /// Hard limit on a single navigation.
    pub page_load_timeout: Duration,
    /// Poll interval for condition waits.
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
            ready_fallback_delay: Duration::from_secs(2),
            control_pause: Duration::from_millis(500),
            scroll_pause: Duration::from_millis(200),
            scroll_settle: Duration::from_millis(200),
            next_pause: Duration::from_millis(200),
            final_page_pause: Duration::from_secs(1),
            job_pause: Duration::from_millis(100),
            page_load_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl Timings {
    /// All pauses zeroed and waits shortened; used for replaying fixture pages.
    pub fn instant() -> Self {
        Self {
            ready_timeout: Duration::from_millis(50),
            ready_fallback_delay: Duration::ZERO,
            control_pause: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            next_pause: Duration::ZERO,
            final_page_pause: Duration::ZERO,
            job_pause: Duration::ZERO,
            page_load_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
        }
    }
}

/// Everything a harvest run needs to know.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Listing entry point.
    pub start_url: String,
    /// Upper bound on listing pages visited.
    pub max_pages: u32,
    /// Number of extraction workers, each with its own browser session.
    pub workers: usize,
    /// Destination of the exported table.
    pub out_path: PathBuf,
    /// Drop repeated frontier URLs, keeping the first occurrence.
    pub dedupe: bool,
    pub user_agent: String,
    pub headless: bool,
    pub timings: Timings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            workers: DEFAULT_WORKERS,
            out_path: PathBuf::from(DEFAULT_OUT_PATH),
            dedupe: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headless: true,
            timings: Timings::default(),
        }
    }
}

impl HarvestConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `REVIEW_HARVESTER_*` key. Unparseable values fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let read_ms = |key: &str, default: Duration| {
            read(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let defaults = Self::default();
        let timing_defaults = Timings::default();
        Self {
            start_url: read("START_URL").unwrap_or(defaults.start_url),
            max_pages: read("MAX_PAGES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_pages),
            workers: read("WORKERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.workers),
            out_path: read("OUT").map(PathBuf::from).unwrap_or(defaults.out_path),
            dedupe: read("DEDUPE").map(|v| parse_flag(&v)).unwrap_or(false),
            user_agent: read("USER_AGENT").unwrap_or(defaults.user_agent),
            headless: read("HEADLESS").map(|v| parse_flag(&v)).unwrap_or(true),
            timings: Timings {
                ready_timeout: read_ms("READY_TIMEOUT_MS", timing_defaults.ready_timeout),
                page_load_timeout: read_ms(
                    "PAGE_LOAD_TIMEOUT_MS",
                    timing_defaults.page_load_timeout,
                ),
                scroll_pause: read_ms("SCROLL_PAUSE_MS", timing_defaults.scroll_pause),
                job_pause: read_ms("JOB_PAUSE_MS", timing_defaults.job_pause),
                ..timing_defaults
            },
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> HarvestResult<()> {
        if self.workers == 0 {
            return Err(HarvestError::Config("workers must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(HarvestError::Config("max_pages must be at least 1".into()));
        }
        url::Url::parse(&self.start_url).map_err(|e| {
            HarvestError::Config(format!("invalid start url {:?}: {e}", self.start_url))
        })?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.max_pages, 58);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.out_path, PathBuf::from("dataset/movies_raw.csv"));
        assert!(!cfg.dedupe);
        assert_eq!(cfg.timings.ready_timeout, Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let cfg = HarvestConfig::from_lookup(lookup(&[
            ("MAX_PAGES", "3"),
            ("WORKERS", " 8 "),
            ("DEDUPE", "yes"),
            ("OUT", "/tmp/out.csv"),
            ("SCROLL_PAUSE_MS", "750"),
        ]));
        assert_eq!(cfg.max_pages, 3);
        assert_eq!(cfg.workers, 8);
        assert!(cfg.dedupe);
        assert_eq!(cfg.out_path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(cfg.timings.scroll_pause, Duration::from_millis(750));
        assert_eq!(cfg.timings.next_pause, Timings::default().next_pause);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let cfg = HarvestConfig::from_lookup(lookup(&[("WORKERS", "many"), ("MAX_PAGES", "")]));
        assert_eq!(cfg.workers, DEFAULT_WORKERS);
        assert_eq!(cfg.max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_validate_rejects_zero_workers_and_bad_url() {
        let cfg = HarvestConfig {
            workers: 0,
            ..HarvestConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(HarvestError::Config(_))));

        let cfg = HarvestConfig {
            max_pages: 0,
            ..HarvestConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = HarvestConfig {
            start_url: "not a url".into(),
            ..HarvestConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
