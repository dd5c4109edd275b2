/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RunMode;
use crate::context::SuiteContext;
use crate::error::{error_chain, BoxError, Error};
use crate::report::{Record, ReportSink, Status};

/// Per-test argument scope.
///
/// Whatever a test registers here ends up in the record's `args` field,
/// whether the test passes or fails.
#[derive(Debug, Default)]
pub struct TestScope {
    args: BTreeMap<String, Value>,
}

impl TestScope {
    /// Record a test argument.
    pub fn arg(&mut self, key: &str, value: impl Into<Value>) {
        self.args.insert(key.to_string(), value.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Failed,
    Skipped,
}

/// Why a test did not pass.
///
/// A failure becomes a FAIL record; a skip becomes NA (the server does not
/// implement the feature under test).
#[derive(Debug)]
pub struct TestFailure {
    kind: FailureKind,
    message: String,
    source: Option<BoxError>,
}

impl TestFailure {
    /// A failed assertion with no underlying error.
    pub fn new(message: impl Into<String>) -> Self {
        TestFailure {
            kind: FailureKind::Failed,
            message: message.into(),
            source: None,
        }
    }

    /// A failure caused by an underlying error.
    pub fn with_source<E>(message: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        TestFailure {
            kind: FailureKind::Failed,
            message: message.into(),
            source: Some(err.into()),
        }
    }

    /// Skip the test; the server lacks the feature under test.
    pub fn skip(reason: impl Into<String>) -> Self {
        TestFailure {
            kind: FailureKind::Skipped,
            message: reason.into(),
            source: None,
        }
    }
}

/// Return type of every test body.
pub type TestResult = Result<(), TestFailure>;

/// Adapter for `map_err`: fail the test with `message`, keeping the cause.
pub fn fail<E>(message: &'static str) -> impl FnOnce(E) -> TestFailure
where
    E: Into<BoxError>,
{
    move |err| TestFailure::with_source(message, err)
}

/// Assert `cond`, failing the test with `message` otherwise.
pub fn ensure(cond: bool, message: &'static str) -> TestResult {
    if cond {
        Ok(())
    } else {
        Err(TestFailure::new(message))
    }
}

/// Whether an SDK error carries the given S3 error code.
///
/// Matches on the debug rendering, which always includes the code; the
/// alternative is threading `ProvideErrorMetadata` bounds through every
/// call site.
pub fn has_error_code<E: fmt::Debug>(err: &E, code: &str) -> bool {
    format!("{err:?}").contains(code)
}

/// Assert that `result` is an error carrying the given S3 error code.
pub fn ensure_error_code<T, E: fmt::Debug>(
    result: &Result<T, E>,
    code: &'static str,
    message: &'static str,
) -> TestResult {
    match result {
        Ok(_) => Err(TestFailure::new(message)),
        Err(err) => {
            if has_error_code(err, code) {
                Ok(())
            } else {
                Err(TestFailure::with_source(
                    message,
                    format!("expected error code {code}, got: {err:?}"),
                ))
            }
        }
    }
}

/// Whether the server answered `NotImplemented` for the request.
pub fn is_not_implemented<E: fmt::Debug>(err: &E) -> bool {
    has_error_code(err, "NotImplemented")
}

type TestFn = for<'a> fn(&'a SuiteContext, &'a mut TestScope) -> BoxFuture<'a, TestResult>;

/// A single conformance test.
pub struct Test {
    function: &'static str,
    mode: RunMode,
    run: TestFn,
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("function", &self.function)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Test {
    /// A test that runs in every mode.
    pub fn new(function: &'static str, run: TestFn) -> Self {
        Test {
            function,
            mode: RunMode::Core,
            run,
        }
    }

    /// A test that only runs in full mode (large payloads, slow paths).
    pub fn full_mode(function: &'static str, run: TestFn) -> Self {
        Test {
            function,
            mode: RunMode::Full,
            run,
        }
    }

    /// The test function label.
    pub fn function(&self) -> &'static str {
        self.function
    }
}

/// A named, ordered group of tests; the unit of selection.
#[derive(Debug)]
pub struct Suite {
    name: &'static str,
    tests: Vec<Test>,
}

impl Suite {
    /// Create a suite.
    pub fn new(name: &'static str, tests: Vec<Test>) -> Self {
        Suite { name, tests }
    }

    /// The suite name, as reported in the `name` record field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The tests in execution order.
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }
}

/// Aggregate counts for a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Tests skipped as NA.
    pub skipped: usize,
}

impl RunSummary {
    /// Total number of executed tests.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Whether the run had no failures. NA does not fail a run.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    fn absorb(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::NotApplicable => self.skipped += 1,
        }
    }
}

/// Run a suite sequentially, appending one record per executed test.
///
/// A FAIL is recorded and the run continues; only sink I/O aborts the run.
pub async fn run_suite(
    suite: &Suite,
    ctx: &SuiteContext,
    sink: &mut ReportSink,
    summary: &mut RunSummary,
) -> Result<(), Error> {
    for test in suite.tests() {
        if test.mode == RunMode::Full && ctx.config().mode() != RunMode::Full {
            debug!(suite = suite.name(), function = test.function(), "full-mode test skipped");
            continue;
        }

        info!(suite = suite.name(), function = test.function(), "running");
        let mut scope = TestScope::default();
        let start = Instant::now();
        let outcome = (test.run)(ctx, &mut scope).await;
        let duration = start.elapsed().as_millis() as u64;

        let record = build_record(suite.name(), test.function(), scope, duration, outcome);
        match record.status {
            Status::Fail => warn!(
                suite = suite.name(),
                function = test.function(),
                message = record.message.as_deref().unwrap_or(""),
                "FAIL"
            ),
            Status::NotApplicable => {
                info!(suite = suite.name(), function = test.function(), "NA")
            }
            Status::Pass => debug!(suite = suite.name(), function = test.function(), "PASS"),
        }
        summary.absorb(record.status);
        sink.write(&record)?;
    }
    Ok(())
}

fn build_record(
    suite: &str,
    function: &str,
    scope: TestScope,
    duration: u64,
    outcome: TestResult,
) -> Record {
    let mut record = Record {
        name: suite.to_string(),
        function: function.to_string(),
        args: scope.args,
        duration,
        status: Status::Pass,
        alert: None,
        message: None,
        error: None,
    };

    if let Err(failure) = outcome {
        match failure.kind {
            FailureKind::Skipped => {
                record.status = Status::NotApplicable;
                record.alert = Some(failure.message);
            }
            FailureKind::Failed => {
                record.status = Status::Fail;
                record.message = Some(failure.message);
                record.error = failure.source.as_deref().map(|err| error_chain(err));
            }
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_record_has_no_message() {
        let record = build_record("bucket", "testMakeBucket", TestScope::default(), 10, Ok(()));
        assert_eq!(record.status, Status::Pass);
        assert!(record.message.is_none());
        assert!(record.error.is_none());
    }

    #[test]
    fn failure_record_carries_message_and_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let outcome = Err(TestFailure::with_source("PutObject failed", io));
        let record = build_record("object", "testPutObject", TestScope::default(), 10, outcome);
        assert_eq!(record.status, Status::Fail);
        assert_eq!(record.message.as_deref(), Some("PutObject failed"));
        assert!(record.error.as_deref().unwrap().contains("connection reset"));
    }

    #[test]
    fn skip_record_is_na_with_alert() {
        let outcome = Err(TestFailure::skip("Versioning is not implemented"));
        let record = build_record("versioning", "testPutObject", TestScope::default(), 5, outcome);
        assert_eq!(record.status, Status::NotApplicable);
        assert_eq!(record.alert.as_deref(), Some("Versioning is not implemented"));
        assert!(record.message.is_none());
    }

    #[test]
    fn scope_args_survive_into_record() {
        let mut scope = TestScope::default();
        scope.arg("bucketName", "mint-abc");
        scope.arg("objectName", "obj");
        let record = build_record("object", "testPutObject", scope, 1, Ok(()));
        assert_eq!(record.args["bucketName"], "mint-abc");
        assert_eq!(record.args["objectName"], "obj");
    }

    #[test]
    fn ensure_failure_message() {
        let result = ensure(1 == 2, "sizes differ");
        let failure = result.unwrap_err();
        assert_eq!(failure.message, "sizes differ");
        assert_eq!(failure.kind, FailureKind::Failed);
    }

    #[test]
    fn error_code_matching() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct FakeErr(String);

        let err = FakeErr("service error: code: \"NoSuchKey\", message: ...".to_string());
        assert!(has_error_code(&err, "NoSuchKey"));
        assert!(!has_error_code(&err, "NoSuchBucket"));

        let result: Result<(), FakeErr> = Err(err);
        assert!(ensure_error_code(&result, "NoSuchKey", "expected NoSuchKey").is_ok());
        assert!(ensure_error_code(&result, "NoSuchBucket", "expected NoSuchBucket").is_err());

        let ok: Result<(), FakeErr> = Ok(());
        assert!(ensure_error_code(&ok, "NoSuchKey", "expected NoSuchKey").is_err());
    }

    #[test]
    fn summary_aggregation() {
        let mut summary = RunSummary::default();
        summary.absorb(Status::Pass);
        summary.absorb(Status::Pass);
        summary.absorb(Status::Fail);
        summary.absorb(Status::NotApplicable);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.success());
    }
}
