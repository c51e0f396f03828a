//! Global output mode flags, set once from the command line.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

static MODE: OnceLock<OutputMode> = OnceLock::new();

/// Record the output mode. Later calls are ignored.
pub fn init(mode: OutputMode) {
    let _ = MODE.set(mode);
}

fn mode() -> OutputMode {
    MODE.get().copied().unwrap_or_default()
}

pub fn is_json() -> bool {
    mode().json
}

pub fn is_quiet() -> bool {
    mode().quiet
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}
