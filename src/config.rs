#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};

/// Default parser helper program.
pub const DEFAULT_PARSER_CMD: &str = "pg_query_json";
/// Default execution helper program.
pub const DEFAULT_BACKEND_CMD: &str = "sqlgrade-exec";

/// Process-wide runtime configuration sourced from the environment.
#[derive(Debug, Clone)]
pub struct ConfigState {
    /// Program invoked to parse SQL into JSON parse trees.
    parser_cmd:      String,
    /// Program invoked to execute SQL against the grading database.
    backend_cmd:     String,
    /// Deadline for one parser invocation.
    parser_timeout:  Duration,
    /// Deadline for one execution invocation.
    backend_timeout: Duration,
    /// Upper bound on concurrently running tasks per pipeline stage.
    workers:         usize,
}

impl ConfigState {
    /// Construct a new configuration instance by reading the environment.
    fn new() -> Result<Self> {
        let parser_cmd = read_command("SQLGRADE_PARSER_CMD", DEFAULT_PARSER_CMD);
        let backend_cmd = read_command("SQLGRADE_BACKEND_CMD", DEFAULT_BACKEND_CMD);

        let workers = match std::env::var("SQLGRADE_WORKERS") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("SQLGRADE_WORKERS must be a positive integer, got {value:?}"))?
                .max(1),
            Err(_) => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };

        Ok(Self {
            parser_cmd,
            backend_cmd,
            parser_timeout: read_timeout_secs("SQLGRADE_PARSER_TIMEOUT_SECS", 30),
            backend_timeout: read_timeout_secs("SQLGRADE_BACKEND_TIMEOUT_SECS", 60),
            workers,
        })
    }

    /// Returns the parser helper program.
    pub fn parser_cmd(&self) -> &str {
        &self.parser_cmd
    }

    /// Returns the execution helper program.
    pub fn backend_cmd(&self) -> &str {
        &self.backend_cmd
    }

    /// Returns the parser deadline.
    pub fn parser_timeout(&self) -> Duration {
        self.parser_timeout
    }

    /// Returns the execution deadline.
    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }

    /// Returns the worker bound for pipeline stages.
    pub fn workers(&self) -> usize {
        self.workers
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
    let mut guard = slot().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(cfg) = guard.as_ref() {
        return Ok(ConfigHandle(Arc::clone(cfg)));
    }

    let cfg = Arc::new(ConfigState::new()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

/// Returns the active configuration, initializing it on demand.
pub fn get() -> Result<ConfigHandle> {
    ensure_initialized().context("configuration initialization failed")
}

/// Reads a helper program name, falling back to `default` when unset or
/// blank.
fn read_command(env: &str, default: &str) -> String {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses an environment variable into a `Duration`, falling back to
/// `default_secs` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}
