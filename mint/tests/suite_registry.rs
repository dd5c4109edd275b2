/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeSet;

use mint::suites;

#[test]
fn registry_covers_every_conformance_area() {
    let names: BTreeSet<&str> = suites::all().iter().map(|s| s.name()).collect();
    let expected: BTreeSet<&str> = [
        "bucket",
        "object",
        "multipart",
        "listing",
        "versioning",
        "tagging",
        "presigned",
        "object-lock",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_functions_are_unique_within_a_suite() {
    for suite in suites::all() {
        let mut functions: Vec<&str> = suite.tests().iter().map(|t| t.function()).collect();
        let total = functions.len();
        functions.sort_unstable();
        functions.dedup();
        assert_eq!(functions.len(), total, "duplicate test label in {}", suite.name());
    }
}

#[test]
fn selection_is_by_exact_name() {
    let picked = suites::select(&["object-lock".to_string()]).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].name(), "object-lock");

    assert!(suites::select(&["object-loc".to_string()]).is_err());
    assert!(suites::select(&["OBJECT".to_string()]).is_err());
}
