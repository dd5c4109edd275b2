/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The mint binary: drives the conformance suites against the server
//! configured in the environment and writes one JSON record per test.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mint::config::Config;
use mint::context::SuiteContext;
use mint::error::Error;
use mint::report::ReportSink;
use mint::runner::{self, RunSummary};
use mint::suites;

#[derive(Debug, Parser)]
#[command(name = "mint")]
#[command(about = "S3 API conformance test harness")]
struct Args {
    /// File receiving one JSON record per test (defaults to stdout)
    output_log: Option<PathBuf>,

    /// File receiving FAIL records (defaults to stderr)
    error_log: Option<PathBuf>,

    /// Run only the named suite; repeatable
    #[arg(long = "suite", value_name = "NAME")]
    suites: Vec<String>,

    /// List available suites and exit
    #[arg(long)]
    list: bool,

    /// Skip the server reachability check
    #[arg(long)]
    no_preflight: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        for suite in suites::all() {
            println!("{}", suite.name());
        }
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(summary) if summary.success() => {
            info!(
                passed = summary.passed,
                skipped = summary.skipped,
                total = summary.total(),
                "all tests passed"
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            error!(
                failed = summary.failed,
                passed = summary.passed,
                skipped = summary.skipped,
                total = summary.total(),
                "run finished with failures"
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %render(&err), "harness error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunSummary, Error> {
    let config = Config::from_env()?;
    let selected = if args.suites.is_empty() {
        suites::all()
    } else {
        suites::select(&args.suites)?
    };

    let ctx = SuiteContext::new(config)?;
    if !args.no_preflight {
        ctx.preflight().await?;
    }

    let mut sink = ReportSink::from_paths(args.output_log.as_deref(), args.error_log.as_deref())?;
    let mut summary = RunSummary::default();
    let start = Instant::now();
    for suite in &selected {
        info!(suite = suite.name(), "starting suite");
        runner::run_suite(suite, &ctx, &mut sink, &mut summary).await?;
    }
    info!(
        duration_ms = start.elapsed().as_millis() as u64,
        suites = selected.len(),
        "run complete"
    );
    Ok(summary)
}

fn render(err: &Error) -> String {
    use std::error::Error as _;
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        out.push_str(": ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_paths_and_suite_filters() {
        let args = Args::parse_from([
            "mint",
            "output.log",
            "error.log",
            "--suite",
            "versioning",
            "--suite",
            "bucket",
        ]);
        assert_eq!(args.output_log.as_deref(), Some(std::path::Path::new("output.log")));
        assert_eq!(args.error_log.as_deref(), Some(std::path::Path::new("error.log")));
        assert_eq!(args.suites, ["versioning", "bucket"]);
        assert!(!args.list);
        assert!(!args.no_preflight);
    }

    #[test]
    fn log_paths_are_optional() {
        let args = Args::parse_from(["mint"]);
        assert!(args.output_log.is_none());
        assert!(args.error_log.is_none());
        assert!(args.suites.is_empty());
    }
}
