/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// The test ran and every assertion held.
    #[serde(rename = "PASS")]
    Pass,

    /// A request or assertion failed.
    #[serde(rename = "FAIL")]
    Fail,

    /// The server does not implement the feature under test.
    #[serde(rename = "NA")]
    NotApplicable,
}

/// One JSON log line, emitted once per executed test.
///
/// Optional fields are omitted from the serialized form when absent, so a
/// passing test serializes to exactly `name`/`function`/`args`/`duration`/
/// `status`.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Suite name, e.g. `"versioning"`.
    pub name: String,
    /// Test function label, e.g. `"testPutObject"`.
    pub function: String,
    /// Test arguments (bucket name, object name, expiry, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, Value>,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
    /// PASS, FAIL or NA.
    pub status: Status,
    /// Operator-facing alert text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    /// Failure or skip description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rendered cause chain of the underlying error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Destination for test records.
///
/// Every record is written to the output log as one JSON line; FAIL records
/// are additionally written to the error log, preserving the original
/// `run.sh <output-log> <error-log>` contract.
pub struct ReportSink {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl fmt::Debug for ReportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportSink").finish_non_exhaustive()
    }
}

impl ReportSink {
    /// Open a sink over the given log paths.
    ///
    /// `None` means the standard stream: stdout for records, stderr for
    /// failures.
    pub fn from_paths(out: Option<&Path>, err: Option<&Path>) -> io::Result<Self> {
        let out: Box<dyn Write + Send> = match out {
            Some(path) => Box::new(LineWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        };
        let err: Box<dyn Write + Send> = match err {
            Some(path) => Box::new(LineWriter::new(File::create(path)?)),
            None => Box::new(io::stderr()),
        };
        Ok(ReportSink { out, err })
    }

    /// Sink writing into in-memory buffers.
    #[cfg(test)]
    pub(crate) fn buffered() -> (Self, BufferHandles) {
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Shared(Arc<Mutex<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let out = Shared(Arc::new(Mutex::new(Vec::new())));
        let err = Shared(Arc::new(Mutex::new(Vec::new())));
        let handles = BufferHandles {
            out: out.0.clone(),
            err: err.0.clone(),
        };
        let sink = ReportSink {
            out: Box::new(out),
            err: Box::new(err),
        };
        (sink, handles)
    }

    /// Append one record.
    pub fn write(&mut self, record: &Record) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.out, "{line}")?;
        if record.status == Status::Fail {
            writeln!(self.err, "{line}")?;
            self.err.flush()?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
pub(crate) struct BufferHandles {
    pub(crate) out: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    pub(crate) err: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl BufferHandles {
    pub(crate) fn out_lines(&self) -> Vec<serde_json::Value> {
        lines(&self.out.lock().unwrap())
    }

    pub(crate) fn err_lines(&self) -> Vec<serde_json::Value> {
        lines(&self.err.lock().unwrap())
    }
}

#[cfg(test)]
fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
    std::str::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_record() -> Record {
        Record {
            name: "bucket".to_string(),
            function: "testMakeBucket".to_string(),
            args: BTreeMap::from([("bucketName".to_string(), Value::from("mint-test-abc"))]),
            duration: 42,
            status: Status::Pass,
            alert: None,
            message: None,
            error: None,
        }
    }

    #[test]
    fn pass_serializes_without_optional_fields() {
        let json = serde_json::to_value(pass_record()).unwrap();
        assert_eq!(json["name"], "bucket");
        assert_eq!(json["function"], "testMakeBucket");
        assert_eq!(json["args"]["bucketName"], "mint-test-abc");
        assert_eq!(json["duration"], 42);
        assert_eq!(json["status"], "PASS");
        assert!(json.get("alert").is_none());
        assert!(json.get("message").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn empty_args_are_omitted() {
        let mut record = pass_record();
        record.args.clear();
        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("args").is_none());
    }

    #[test]
    fn fail_carries_message_and_error() {
        let record = Record {
            status: Status::Fail,
            message: Some("CreateBucket failed".to_string()),
            error: Some("service error: access denied".to_string()),
            ..pass_record()
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["message"], "CreateBucket failed");
        assert_eq!(json["error"], "service error: access denied");
    }

    #[test]
    fn na_status_string() {
        let record = Record {
            status: Status::NotApplicable,
            alert: Some("Versioning is not implemented".to_string()),
            ..pass_record()
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["status"], "NA");
        assert_eq!(json["alert"], "Versioning is not implemented");
    }

    #[test]
    fn sink_routes_failures_to_both_logs() {
        let (mut sink, handles) = ReportSink::buffered();

        sink.write(&pass_record()).unwrap();
        let fail = Record {
            status: Status::Fail,
            message: Some("boom".to_string()),
            ..pass_record()
        };
        sink.write(&fail).unwrap();

        let out = handles.out_lines();
        let err = handles.err_lines();
        assert_eq!(out.len(), 2);
        assert_eq!(err.len(), 1);
        assert_eq!(err[0]["status"], "FAIL");
    }
}
