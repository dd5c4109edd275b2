/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;
use rand::RngCore;

use crate::error::{data_unavailable, Error};
use crate::{KILOBYTE, MEGABYTE};

/// Payload names and sizes, following the original data-file convention.
const DATA_FILES: &[(&str, u64)] = &[
    ("datafile-1-b", 1),
    ("datafile-33-kB", 33 * KILOBYTE),
    ("datafile-100-kB", 100 * KILOBYTE),
    ("datafile-1-MB", MEGABYTE),
    ("datafile-5-MB", 5 * MEGABYTE),
    ("datafile-65-MB", 65 * MEGABYTE),
];

/// Source of test payloads.
///
/// When a data directory is configured (`MINT_DATA_DIR`) the named files are
/// read from it; a missing file is an error. Without a directory, payloads
/// are generated from random bytes. Either way a payload is produced once
/// and cached, so every test in a run sees the same bytes for a name.
#[derive(Debug)]
pub struct DataSource {
    dir: Option<PathBuf>,
    cache: Mutex<HashMap<&'static str, Bytes>>,
}

impl DataSource {
    /// Create a data source, reading payloads from `dir` when given.
    pub fn new(dir: Option<PathBuf>) -> Self {
        DataSource {
            dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Declared size of the named payload.
    pub fn size_of(name: &str) -> Option<u64> {
        DATA_FILES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, size)| *size)
    }

    /// The payload bytes for a well-known name, e.g. `"datafile-1-MB"`.
    pub async fn bytes(&self, name: &str) -> Result<Bytes, Error> {
        let (name, size) = DATA_FILES
            .iter()
            .find(|(n, _)| *n == name)
            .copied()
            .ok_or_else(|| data_unavailable(format!("unknown data file '{name}'")))?;

        if let Some(bytes) = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
        {
            return Ok(bytes.clone());
        }

        let bytes = match &self.dir {
            Some(dir) => {
                let path = dir.join(name);
                let contents = tokio::fs::read(&path).await.map_err(|err| {
                    data_unavailable(format!("reading {}: {err}", path.display()))
                })?;
                Bytes::from(contents)
            }
            None => generate(size as usize),
        };

        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, bytes.clone());
        Ok(bytes)
    }
}

fn generate(size: usize) -> Bytes {
    let mut buf = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut buf);
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_payload_has_declared_size() {
        let data = DataSource::new(None);
        let bytes = data.bytes("datafile-100-kB").await.unwrap();
        assert_eq!(bytes.len() as u64, DataSource::size_of("datafile-100-kB").unwrap());
    }

    #[tokio::test]
    async fn repeated_reads_agree_within_a_run() {
        let data = DataSource::new(None);
        let first = data.bytes("datafile-1-MB").await.unwrap();
        let second = data.bytes("datafile-1-MB").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_name_is_an_error() {
        let data = DataSource::new(None);
        assert!(data.bytes("datafile-7-GB").await.is_err());
    }

    #[tokio::test]
    async fn reads_from_data_dir_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("datafile-1-b"), b"x").unwrap();

        let data = DataSource::new(Some(dir.path().to_path_buf()));
        let bytes = data.bytes("datafile-1-b").await.unwrap();
        assert_eq!(&bytes[..], b"x");
    }

    #[tokio::test]
    async fn missing_file_in_data_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataSource::new(Some(dir.path().to_path_buf()));
        assert!(data.bytes("datafile-1-b").await.is_err());
    }
}
