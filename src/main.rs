#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # sqlgrade
//!
//! Command line front end: grades assignment bundles, prints correctness
//! matrices and measures parse-tree distances.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use sqlgrade::{
    HelperBackend, HelperParser, config,
    grade::{Assignment, CorrectnessMatrix, SessionConfig, SummaryRow, grade_assignment},
    sql::{ParseNode, tree_edit_distance},
};
use tabled::{
    Table,
    settings::{Alignment, Modify, Panel, Style, object::Rows},
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade an assignment bundle, optionally writing records to a file
    Grade(PathBuf, Option<PathBuf>),
    /// Print the correctness matrix of a session
    Matrix(Option<PathBuf>),
    /// Tree-edit distance between two parse trees
    Distance(PathBuf, PathBuf),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses a parse-tree JSON path
    fn tree(name: &'static str) -> impl Parser<PathBuf> {
        positional(name).help("Path to a parse tree JSON document")
    }

    let assignment = positional::<PathBuf>("ASSIGNMENT")
        .help("Path to an assignment bundle (session, models and submissions)");
    let out = long("out")
        .short('o')
        .help("Write output records here instead of stdout")
        .argument::<PathBuf>("FILE")
        .optional();
    let grade = construct!(Cmd::Grade(assignment, out))
        .to_options()
        .command("grade")
        .help("Grade every submission of an assignment");

    let session = long("session")
        .short('s')
        .help("Session configuration JSON; the default session when omitted")
        .argument::<PathBuf>("FILE")
        .optional();
    let matrix = construct!(Cmd::Matrix(session))
        .to_options()
        .command("matrix")
        .help("Print the correctness matrix");

    let tree_a = tree("A");
    let tree_b = tree("B");
    let distance = construct!(Cmd::Distance(tree_a, tree_b))
        .to_options()
        .command("distance")
        .help("Compute the tree-edit distance between two parse trees");

    let cmd = construct!([grade, matrix, distance]);

    cmd.to_options()
        .descr("Clause-aware SQL auto-grader")
        .run()
}

/// Reads and deserializes a JSON file.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Could not parse {}", path.display()))
}

/// Log level from `SQLGRADE_LOG`, INFO when unset or unknown.
fn log_level() -> Level {
    std::env::var("SQLGRADE_LOG")
        .ok()
        .and_then(|value| value.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

/// Runs the `grade` command.
async fn grade(assignment: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let cfg = config::get()?;
    let assignment: Assignment = read_json(&assignment)?;
    let parser = HelperParser::from_config(&cfg)?;
    let backend = HelperBackend::from_config(&cfg)?;

    let records = grade_assignment(assignment, parser, backend, cfg.workers()).await?;

    let rows: Vec<SummaryRow> = records.iter().map(SummaryRow::from).collect();
    let (grade, out_of) = records
        .iter()
        .fold((0f64, 0f64), |acc, r| (acc.0 + r.grade, acc.1 + r.out_of));
    eprintln!(
        "{}",
        Table::new(&rows)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(format!("Total: {grade:.2}/{out_of:.2}")))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
    );

    let json = serde_json::to_string_pretty(&records).context("Could not serialize records")?;
    match out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Could not write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green().bold(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Runs the `matrix` command.
fn matrix(session: Option<PathBuf>) -> Result<()> {
    let session: SessionConfig = match session {
        Some(path) => read_json(&path)?,
        None => SessionConfig::default(),
    };
    let matrix = CorrectnessMatrix::new(&session)?;
    println!(
        "{}",
        Table::new(matrix.rows())
            .with(Panel::header(format!(
                "Correctness matrix ({}, syntax {}, semantics {}, results {})",
                session.order, session.syntax_level, session.semantics_level, session.results_level
            )))
            .with(Style::modern())
    );
    Ok(())
}

/// Runs the `distance` command.
fn distance(a: PathBuf, b: PathBuf) -> Result<()> {
    let read_tree = |path: &Path| -> Result<_> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        ParseNode::from_json_str(&text)
    };
    let (a, b) = (read_tree(&a)?, read_tree(&b)?);
    println!("{}", tree_edit_distance(&a, &b));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(log_level());
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Grade(assignment, out) => grade(assignment, out).await,
        Cmd::Matrix(session) => matrix(session),
        Cmd::Distance(a, b) => distance(a, b),
    }
}
