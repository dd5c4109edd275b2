/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_smithy_types::DateTime;

use crate::error::{invalid_config, Error};
use crate::runner::Suite;

/// Bucket CRUD and bucket-name error cases
pub mod bucket;

/// Object CRUD, ranged reads, metadata, batch delete, checksums
pub mod object;

/// Multipart upload lifecycle
pub mod multipart;

/// ListObjectsV2 content, prefixes and pagination
pub mod listing;

/// Versioning, delete markers and ListObjectVersions pagination
pub mod versioning;

/// Object and bucket tagging
pub mod tagging;

/// Presigned GET/PUT over raw HTTP
pub mod presigned;

/// Object lock: retention and legal hold
pub mod lock;

/// All suites in registration order.
pub fn all() -> Vec<Suite> {
    vec![
        bucket::suite(),
        object::suite(),
        multipart::suite(),
        listing::suite(),
        versioning::suite(),
        tagging::suite(),
        presigned::suite(),
        lock::suite(),
    ]
}

/// Resolve `--suite` selections, preserving the given order.
pub fn select(names: &[String]) -> Result<Vec<Suite>, Error> {
    let mut selected = Vec::new();
    for name in names {
        let suite = all()
            .into_iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| invalid_config(format!("unknown suite '{name}'")))?;
        selected.push(suite);
    }
    Ok(selected)
}

/// Whether a server-reported timestamp is plausibly from this run.
pub(crate) fn within_last_hour(dt: &DateTime) -> bool {
    use std::time::SystemTime;
    match SystemTime::try_from(*dt) {
        Ok(t) => match t.elapsed() {
            Ok(elapsed) => elapsed.as_secs() < 3600,
            // Small clock skew puts the timestamp in our future; accept it.
            Err(_) => true,
        },
        Err(_) => false,
    }
}

/// Whether an ETag has the quoted shape S3 requires.
pub(crate) fn is_quoted_etag(etag: &str) -> bool {
    etag.len() >= 2 && etag.starts_with('"') && etag.ends_with('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let suites = all();
        let mut names: Vec<_> = suites.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), suites.len());
    }

    #[test]
    fn every_suite_has_tests() {
        for suite in all() {
            assert!(!suite.tests().is_empty(), "suite {} is empty", suite.name());
        }
    }

    #[test]
    fn select_preserves_order() {
        let names = vec!["versioning".to_string(), "bucket".to_string()];
        let selected = select(&names).unwrap();
        assert_eq!(selected[0].name(), "versioning");
        assert_eq!(selected[1].name(), "bucket");
    }

    #[test]
    fn select_rejects_unknown_suite() {
        let names = vec!["s3select".to_string()];
        assert!(select(&names).is_err());
    }

    #[test]
    fn etag_shape() {
        assert!(is_quoted_etag("\"d41d8cd98f00b204e9800998ecf8427e\""));
        assert!(!is_quoted_etag("d41d8cd98f00b204e9800998ecf8427e"));
        assert!(!is_quoted_etag("\""));
    }

    #[test]
    fn recent_timestamps() {
        let now = DateTime::from(std::time::SystemTime::now());
        assert!(within_last_hour(&now));
        let stale = DateTime::from_secs(now.secs() - 7200);
        assert!(!within_last_hour(&stale));
    }
}
