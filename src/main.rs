#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # sqlgrader
//!
//! Grades annotated `.sql` submissions against an assignment file.
//!
//! ```text
//! sqlgrader grade --assignment hw3.json --schema schema.sql --style alice.sql bob.sql
//! sqlgrader validate hw3.json
//! ```
//!
//! Environment variables (also read from `.env`):
//! `SQLGRADER_QUERY_TIMEOUT_SECS`, `SQLGRADER_WORKERS`, `SQLGRADER_DEDUCTIONS`,
//! `SQLGRADER_STYLE_DEDUCTIONS` and `SQLGRADER_PASS_THRESHOLD`.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use futures::{StreamExt, stream};
use itertools::Itertools;
use sqlgrader::{
    config,
    db::SqliteExecutor,
    grade::{DeductionTable, GradedSubmission, GradescopeSubmission},
    spec::Assignment,
    style::StyleDeductions,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Options for the `grade` subcommand.
#[derive(Debug, Clone)]
struct GradeOpts {
    /// Assignment definition.
    assignment: PathBuf,
    /// Schema and seed data, run on every fresh connection.
    schema:     PathBuf,
    /// Check style as well.
    style:      bool,
    /// Where to write Gradescope results.
    gradescope: Option<PathBuf>,
    /// Log at debug level.
    verbose:    bool,
    /// Submission files.
    files:      Vec<PathBuf>,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade submissions
    Grade(GradeOpts),
    /// Check an assignment file
    Validate(PathBuf),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    let assignment = long("assignment")
        .short('a')
        .help("Assignment definition (JSON)")
        .argument::<PathBuf>("FILE");
    let schema = long("schema")
        .short('s')
        .help("SQL script that creates and seeds the database")
        .argument::<PathBuf>("FILE");
    let style = long("style").help("Also check and deduct for style").switch();
    let gradescope = long("gradescope")
        .help("Write Gradescope results.json here (a directory when grading several files)")
        .argument::<PathBuf>("PATH")
        .optional();
    let verbose = long("verbose").short('v').help("Log debug output").switch();
    let files = positional::<PathBuf>("FILE")
        .help("Submission files to grade")
        .some("At least one submission file is required");

    let grade = construct!(GradeOpts {
        assignment,
        schema,
        style,
        gradescope,
        verbose,
        files
    })
    .map(Cmd::Grade)
    .to_options()
    .command("grade")
    .help("Grade one or more submissions");

    let validate = positional::<PathBuf>("FILE")
        .help("Assignment definition (JSON)")
        .map(Cmd::Validate)
        .to_options()
        .command("validate")
        .help("Check an assignment file for mistakes");

    construct!([grade, validate])
        .to_options()
        .descr("Autograder for SQL assignments")
        .run()
}

/// Everything a worker needs to grade one file.
struct Job {
    /// The assignment.
    assignment: Arc<Assignment>,
    /// Deduction table.
    deductions: Arc<DeductionTable>,
    /// Style deductions, when style is checked.
    style:      Option<Arc<StyleDeductions>>,
    /// Schema script.
    schema:     Arc<String>,
}

impl Job {
    /// Grades one submission file on a fresh in-memory database.
    fn run(&self, path: &Path) -> Result<GradedSubmission> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read submission {}", path.display()))?;
        let mut db = SqliteExecutor::memory()?
            .with_init_script(self.schema.as_str())?
            .with_timeout(config::query_timeout());

        let student = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let graded = sqlgrader::grade_text(
            &self.assignment,
            &self.deductions,
            self.style.as_deref(),
            &student,
            &text,
            &mut db,
        )
        .with_context(|| format!("Grading {} was aborted", path.display()))?;
        Ok(graded)
    }
}

/// Grades every file, at most `workers` at a time, keeping input order.
async fn grade(opts: GradeOpts) -> Result<()> {
    let cfg = config::ensure_initialized()?;

    let assignment = Assignment::load(&opts.assignment)?;
    let schema = std::fs::read_to_string(&opts.schema)
        .with_context(|| format!("Could not read schema {}", opts.schema.display()))?;

    let job = Arc::new(Job {
        assignment: Arc::new(assignment),
        deductions: Arc::new(cfg.deduction_table()?),
        style:      if opts.style {
            Some(Arc::new(cfg.style_deductions()?))
        } else {
            None
        },
        schema:     Arc::new(schema),
    });

    tracing::info!(
        "Grading {} submission(s) with {} worker(s)",
        opts.files.len(),
        cfg.workers()
    );

    let results: Vec<(PathBuf, Result<GradedSubmission>)> = stream::iter(opts.files.clone())
        .map(|path| {
            let job = Arc::clone(&job);
            async move {
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || job.run(&task_path))
                    .await
                    .context("Grading worker panicked")
                    .and_then(|r| r);
                (path, result)
            }
        })
        .buffered(cfg.workers())
        .collect()
        .await;

    let several = results.len() > 1;
    let mut failed = Vec::new();
    for (path, result) in results {
        let graded = match result {
            Ok(graded) => graded,
            Err(e) => {
                tracing::error!("{:?}", e);
                failed.push(path.display().to_string());
                continue;
            }
        };

        eprintln!("{}", graded.summary_table());
        let total = format!("{graded}");
        if graded.got_points() >= graded.out_of() {
            eprintln!("{}", total.green().bold());
        } else {
            eprintln!("{}", total.yellow().bold());
        }
        println!("{}", serde_json::to_string(&graded)?);

        if let Some(out) = &opts.gradescope {
            let target = if several {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| graded.student.clone());
                std::fs::create_dir_all(out)
                    .with_context(|| format!("Could not create {}", out.display()))?;
                out.join(format!("{stem}.json"))
            } else {
                out.clone()
            };
            GradescopeSubmission::from_graded(&graded, cfg.pass_threshold()).write(&target)?;
        }
    }

    if !failed.is_empty() {
        bail!("Could not grade: {}", failed.iter().join(", "));
    }
    Ok(())
}

/// Loads an assignment file, which validates it, and prints a summary.
fn validate(path: &Path) -> Result<()> {
    let assignment = Assignment::load(path)?;
    let tests: usize = assignment.problems.iter().map(|p| p.tests.len()).sum();
    eprintln!(
        "{}: {} problems, {} tests, {:.2} points",
        assignment.name.green(),
        assignment.problems.len(),
        tests,
        assignment.points()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cmd = options();
    let level = match &cmd {
        Cmd::Grade(opts) if opts.verbose => Level::DEBUG,
        _ => Level::INFO,
    };

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match cmd {
        Cmd::Grade(opts) => grade(opts).await,
        Cmd::Validate(path) => validate(&path),
    }
}
