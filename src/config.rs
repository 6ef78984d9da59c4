#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::Result;

use crate::{grade::DeductionTable, style::StyleDeductions};

/// Default per-statement query timeout, in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Default fraction of a problem's points needed to count as passed.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.999;

/// Runtime configuration shared across the crate.
#[derive(Debug, Clone)]
pub struct ConfigState {
    /// Per-statement query timeout; `None` disables it.
    query_timeout:   Option<Duration>,
    /// Number of submissions graded at once.
    workers:         usize,
    /// Optional JSON file overriding the deduction table.
    deductions_path: Option<PathBuf>,
    /// Optional JSON file overriding style deductions.
    style_path:      Option<PathBuf>,
    /// Fraction of a problem's points needed for a Gradescope pass.
    pass_threshold:  f64,
}

impl ConfigState {
    /// Construct a new configuration instance from the environment.
    fn new() -> Result<Self> {
        let timeout = read_timeout_secs("SQLGRADER_QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS);
        let query_timeout = (!timeout.is_zero()).then_some(timeout);

        let workers = std::env::var("SQLGRADER_WORKERS")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(usize::from)
                    .unwrap_or(1)
            });

        let pass_threshold = std::env::var("SQLGRADER_PASS_THRESHOLD")
            .ok()
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(DEFAULT_PASS_THRESHOLD);

        Ok(Self {
            query_timeout,
            workers,
            deductions_path: read_path("SQLGRADER_DEDUCTIONS"),
            style_path: read_path("SQLGRADER_STYLE_DEDUCTIONS"),
            pass_threshold,
        })
    }

    /// Returns the per-statement query timeout.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Returns the number of concurrent grading workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the Gradescope pass threshold.
    pub fn pass_threshold(&self) -> f64 {
        self.pass_threshold
    }

    /// Returns the deduction table, with overrides applied if configured.
    pub fn deduction_table(&self) -> Result<DeductionTable> {
        match &self.deductions_path {
            Some(path) => DeductionTable::load(path),
            None => Ok(DeductionTable::default()),
        }
    }

    /// Returns the style deductions, read from file if configured.
    pub fn style_deductions(&self) -> Result<StyleDeductions> {
        match &self.style_path {
            Some(path) => StyleDeductions::load(path),
            None => Ok(StyleDeductions::default()),
        }
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Ensure the global configuration has been initialized and return a handle.
pub fn ensure_initialized() -> Result<ConfigHandle> {
    let mut guard = slot().lock().expect("config slot poisoned");
    if let Some(cfg) = guard.as_ref() {
        return Ok(ConfigHandle(Arc::clone(cfg)));
    }

    let cfg = Arc::new(ConfigState::new()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

/// Returns the active configuration, initializing it on demand.
pub fn get() -> ConfigHandle {
    ensure_initialized().expect("configuration initialization failed")
}

/// Returns the configured query timeout.
pub fn query_timeout() -> Option<Duration> {
    get().query_timeout()
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// Reads a non-empty path from an environment variable.
fn read_path(env: &str) -> Option<PathBuf> {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
