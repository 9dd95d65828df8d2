#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Collaborators the grader relies on but does not implement: an SQL parser
//! that yields JSON parse trees, and a database that executes statements.

use std::{ffi::OsString, future::Future, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use which::which;

use crate::{
    config::ConfigState,
    process::{StdinSource, run_collect},
    sql::ParseNode,
    types::DiffEntry,
};

/// A successfully parsed statement.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// Parse tree of the whole input.
    pub tree:        Arc<ParseNode>,
    /// Canonical structural hash of the statement.
    pub fingerprint: String,
}

/// Why a statement could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not valid SQL.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// The parser itself could not be run.
    #[error("parser helper failed: {0:#}")]
    Helper(anyhow::Error),
}

/// Turns SQL text into parse trees.
pub trait SqlParser: Send + Sync + 'static {
    /// Parses `sql`.
    fn parse(&self, sql: &str) -> impl Future<Output = Result<ParsedStatement, ParseError>> + Send;
}

/// Outcome of running a statement that is not a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonSelectOutcome {
    /// Changes observed in the database, including classified errors.
    pub changes: Vec<DiffEntry>,
    /// Error text reported by the database, if the statement failed.
    pub error:   Option<String>,
}

/// Runs statements against the grading database.
pub trait ExecutionBackend: Send + Sync + 'static {
    /// Runs a SELECT and returns its rows as text.
    fn execute_select(&self, sql: &str) -> impl Future<Output = Result<Vec<Vec<String>>>> + Send;

    /// Runs any other statement and reports the changes it made.
    fn execute_non_select(&self, sql: &str) -> impl Future<Output = Result<NonSelectOutcome>> + Send;

    /// Whether statements may run concurrently against this backend.
    fn parallel_safe(&self) -> bool;
}

/// Resolves a helper program on `PATH`, accepting explicit paths as-is.
fn resolve(program: &str) -> Result<PathBuf> {
    which(program).with_context(|| format!("Cannot find helper program `{program}` on PATH"))
}

/// Output document of the parser helper.
#[derive(Debug, Deserialize)]
struct ParserReply {
    /// JSON parse tree, absent on failure.
    #[serde(default)]
    parse_tree:  Option<Value>,
    /// Statement fingerprint.
    #[serde(default)]
    fingerprint: Option<String>,
    /// Parser error message.
    #[serde(default)]
    error:       Option<String>,
}

/// Parser backed by an external helper program that reads SQL on stdin and
/// writes a JSON reply on stdout.
#[derive(Debug, Clone)]
pub struct HelperParser {
    /// Resolved helper executable.
    program:  PathBuf,
    /// Deadline for one invocation.
    deadline: Duration,
}

impl HelperParser {
    /// Creates a parser for an explicit helper program.
    pub fn new(program: &str, deadline: Duration) -> Result<Self> {
        Ok(Self {
            program: resolve(program)?,
            deadline,
        })
    }

    /// Creates a parser from the runtime configuration.
    pub fn from_config(config: &ConfigState) -> Result<Self> {
        Self::new(config.parser_cmd(), config.parser_timeout())
    }

    /// Invokes the helper and decodes its reply.
    async fn invoke(&self, sql: &str) -> Result<ParserReply> {
        let name = self.program.display().to_string();
        let collected = run_collect(
            &self.program,
            &[],
            StdinSource::Bytes(sql.as_bytes().to_vec()),
            Some(self.deadline),
        )
        .await?
        .ensure_success(&name)?;
        serde_json::from_slice(&collected.stdout)
            .with_context(|| format!("{name} wrote an invalid reply: {}", collected.stdout_text()))
    }
}

impl SqlParser for HelperParser {
    async fn parse(&self, sql: &str) -> Result<ParsedStatement, ParseError> {
        let reply = self.invoke(sql).await.map_err(ParseError::Helper)?;
        if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
            return Err(ParseError::Syntax(error));
        }
        let tree = reply
            .parse_tree
            .filter(|tree| !tree.is_null())
            .ok_or_else(|| ParseError::Syntax("parser returned no parse tree".to_string()))?;
        Ok(ParsedStatement {
            tree:        ParseNode::from_json(&tree),
            fingerprint: reply.fingerprint.unwrap_or_default(),
        })
    }
}

/// Output document of the execution helper.
#[derive(Debug, Default, Deserialize)]
struct ExecutionReply {
    /// Rows returned by a SELECT.
    #[serde(default)]
    rows:    Vec<Vec<Value>>,
    /// Changes made by any other statement.
    #[serde(default)]
    changes: Vec<DiffEntry>,
    /// Database error message.
    #[serde(default)]
    error:   Option<String>,
}

/// Renders a JSON cell the way the database would print it.
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Execution backend that shells out to a helper program per statement.
///
/// The helper owns the database connection, so concurrent calls would
/// interleave on the same database; it is therefore not parallel-safe.
#[derive(Debug, Clone)]
pub struct HelperBackend {
    /// Resolved helper executable.
    program:  PathBuf,
    /// Deadline for one invocation.
    deadline: Duration,
}

impl HelperBackend {
    /// Creates a backend for an explicit helper program.
    pub fn new(program: &str, deadline: Duration) -> Result<Self> {
        Ok(Self {
            program: resolve(program)?,
            deadline,
        })
    }

    /// Creates a backend from the runtime configuration.
    pub fn from_config(config: &ConfigState) -> Result<Self> {
        Self::new(config.backend_cmd(), config.backend_timeout())
    }

    /// Invokes the helper in `mode` and decodes its reply.
    async fn invoke(&self, mode: &str, sql: &str) -> Result<ExecutionReply> {
        let name = self.program.display().to_string();
        debug!("running {name} {mode}");
        let collected = run_collect(
            &self.program,
            &[OsString::from(mode)],
            StdinSource::Bytes(sql.as_bytes().to_vec()),
            Some(self.deadline),
        )
        .await?
        .ensure_success(&name)?;
        serde_json::from_slice(&collected.stdout)
            .with_context(|| format!("{name} wrote an invalid reply: {}", collected.stdout_text()))
    }
}

impl ExecutionBackend for HelperBackend {
    async fn execute_select(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let reply = self.invoke("select", sql).await?;
        if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
            anyhow::bail!("query failed: {error}");
        }
        Ok(reply
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn execute_non_select(&self, sql: &str) -> Result<NonSelectOutcome> {
        let reply = self.invoke("non-select", sql).await?;
        let error = reply.error.filter(|e| !e.is_empty());
        let mut changes = reply.changes;
        if let Some(entry) = error.as_deref().and_then(DiffEntry::from_execution_error)
            && !changes.contains(&entry)
        {
            changes.push(entry);
        }
        Ok(NonSelectOutcome { changes, error })
    }

    fn parallel_safe(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_as_database_text() {
        assert_eq!(cell_text(Value::Null), "NULL");
        assert_eq!(cell_text(Value::String("Dune".into())), "Dune");
        assert_eq!(cell_text(serde_json::json!(42)), "42");
    }

    #[test]
    fn execution_reply_defaults_missing_fields() {
        let reply: ExecutionReply =
            serde_json::from_str(r#"{"changes": [{"table": "book", "operation": "table_created"}]}"#)
                .expect("valid reply");
        assert!(reply.rows.is_empty());
        assert_eq!(reply.changes[0].detail, "");
        assert!(reply.error.is_none());
    }
}
