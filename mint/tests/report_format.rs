/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The JSON log format is the harness's public contract: one record per
//! line, `name`/`function`/`args`/`duration`/`status` always present, and
//! FAIL records duplicated into the error log.

use std::collections::BTreeMap;

use mint::report::{Record, ReportSink, Status};

fn record(function: &str, status: Status) -> Record {
    Record {
        name: "object".to_string(),
        function: function.to_string(),
        args: BTreeMap::from([
            ("bucketName".to_string(), "object-test-1a2b3c".into()),
            ("objectName".to_string(), "object-d4e5f6".into()),
        ]),
        duration: 137,
        status,
        alert: None,
        message: None,
        error: None,
    }
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn one_json_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("output.log");
    let err_path = dir.path().join("error.log");

    let mut sink = ReportSink::from_paths(Some(&out_path), Some(&err_path)).unwrap();
    sink.write(&record("testPutObject", Status::Pass)).unwrap();
    sink.write(&record("testGetObjectRange", Status::Pass)).unwrap();
    drop(sink);

    let lines = read_lines(&out_path);
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["name"], "object");
        assert_eq!(line["status"], "PASS");
        assert_eq!(line["duration"], 137);
        assert_eq!(line["args"]["bucketName"], "object-test-1a2b3c");
    }
    assert_eq!(lines[0]["function"], "testPutObject");
    assert_eq!(lines[1]["function"], "testGetObjectRange");
}

#[test]
fn failures_land_in_both_logs() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("output.log");
    let err_path = dir.path().join("error.log");

    let mut sink = ReportSink::from_paths(Some(&out_path), Some(&err_path)).unwrap();
    sink.write(&record("testPutObject", Status::Pass)).unwrap();

    let mut failed = record("testCopyObject", Status::Fail);
    failed.message = Some("CopyObject failed".to_string());
    failed.error = Some("service error: NoSuchKey".to_string());
    sink.write(&failed).unwrap();

    let mut skipped = record("testPutObject", Status::NotApplicable);
    skipped.alert = Some("Versioning is not implemented".to_string());
    sink.write(&skipped).unwrap();
    drop(sink);

    let out = read_lines(&out_path);
    let err = read_lines(&err_path);
    assert_eq!(out.len(), 3);
    assert_eq!(err.len(), 1);

    assert_eq!(err[0]["status"], "FAIL");
    assert_eq!(err[0]["function"], "testCopyObject");
    assert_eq!(err[0]["message"], "CopyObject failed");
    assert_eq!(err[0]["error"], "service error: NoSuchKey");

    // NA records stay out of the error log and carry only the alert.
    assert_eq!(out[2]["status"], "NA");
    assert_eq!(out[2]["alert"], "Versioning is not implemented");
    assert!(out[2].get("message").is_none());
}
