/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::{Duration, Instant};

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::data::DataSource;
use crate::error::{server_unreachable, Error, ErrorKind};
use crate::runner::{fail, has_error_code, is_not_implemented, TestFailure, TestResult};

/// How long cleanup keeps retrying bucket deletion. Compliance-retention
/// tests leave versions that only become deletable once their (short)
/// retention window lapses.
const CLEANUP_DEADLINE: Duration = Duration::from_secs(90);

const CLEANUP_BACKOFF: Duration = Duration::from_secs(3);

const PREFLIGHT_ATTEMPTS: u32 = 4;

const PREFLIGHT_BACKOFF: Duration = Duration::from_secs(3);

/// Shared per-run state handed to every test: the S3 client, a raw HTTP
/// client for presigned requests, the configuration and the payload source.
#[derive(Debug)]
pub struct SuiteContext {
    config: Config,
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    data: DataSource,
}

impl SuiteContext {
    /// Build the context from configuration.
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = config.client();
        // Conformance targets routinely run with self-signed certificates.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.secure())
            .build()
            .map_err(|err| Error::new(ErrorKind::RuntimeError, err))?;
        let data = DataSource::new(config.data_dir().map(|p| p.to_path_buf()));
        Ok(SuiteContext {
            config,
            client,
            http,
            data,
        })
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The S3 client for the server under test.
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    /// Raw HTTP client, used to exercise presigned URLs.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The payload source.
    pub fn data(&self) -> &DataSource {
        &self.data
    }

    /// A fresh S3-compliant bucket name with the given prefix.
    pub fn random_bucket_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..12])
    }

    /// A fresh object key.
    pub fn random_key(&self) -> String {
        format!("object-{}", &Uuid::new_v4().simple().to_string()[..12])
    }

    /// Verify the server is reachable and accepts the credentials before any
    /// test runs.
    pub async fn preflight(&self) -> Result<(), Error> {
        let mut last = String::new();
        for attempt in 1..=PREFLIGHT_ATTEMPTS {
            match self.client.list_buckets().send().await {
                Ok(_) => {
                    info!(endpoint = self.config.server_endpoint(), "server reachable");
                    return Ok(());
                }
                Err(err) => {
                    debug!(attempt, error = ?err, "preflight attempt failed");
                    last = format!("{err:?}");
                }
            }
            if attempt < PREFLIGHT_ATTEMPTS {
                tokio::time::sleep(PREFLIGHT_BACKOFF).await;
            }
        }
        Err(server_unreachable(format!(
            "no response from {} after {PREFLIGHT_ATTEMPTS} attempts: {last}",
            self.config.server_endpoint()
        )))
    }

    /// Create a bucket.
    pub async fn create_bucket(&self, bucket: &str) -> TestResult {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(fail("CreateBucket failed"))?;
        Ok(())
    }

    /// Create a bucket with object lock enabled; skips the test when the
    /// server does not implement object locking.
    pub async fn create_bucket_with_object_lock(&self, bucket: &str) -> TestResult {
        match self
            .client
            .create_bucket()
            .bucket(bucket)
            .object_lock_enabled_for_bucket(true)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_not_implemented(&err) => {
                Err(TestFailure::skip("Object locking is not implemented"))
            }
            Err(err) => Err(fail("CreateBucket with object lock failed")(err)),
        }
    }

    /// Enable versioning on a bucket; skips the test when the server does
    /// not implement versioning.
    pub async fn enable_versioning(&self, bucket: &str) -> TestResult {
        match self
            .client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_not_implemented(&err) => {
                Err(TestFailure::skip("Versioning is not implemented"))
            }
            Err(err) => Err(fail("PutBucketVersioning failed")(err)),
        }
    }

    /// Suspend versioning on a bucket.
    pub async fn suspend_versioning(&self, bucket: &str) -> TestResult {
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Suspended)
                    .build(),
            )
            .send()
            .await
            .map_err(fail("PutBucketVersioning (suspend) failed"))?;
        Ok(())
    }

    /// Put an object from bytes.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<aws_sdk_s3::operation::put_object::PutObjectOutput, TestFailure> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(fail("PutObject failed"))
    }

    /// Get an object's full contents.
    pub async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Bytes, TestFailure> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(fail("GetObject failed"))?;
        let data = output
            .body
            .collect()
            .await
            .map_err(fail("reading GetObject body failed"))?;
        Ok(data.into_bytes())
    }

    /// Best-effort removal of a bucket and everything in it.
    ///
    /// Pages through `ListObjectVersions`, deletes every version and delete
    /// marker with governance bypass, then deletes the bucket. Retries with
    /// backoff until [`CLEANUP_DEADLINE`] so compliance-retention windows
    /// can lapse.
    pub async fn cleanup_bucket(&self, bucket: &str) {
        let deadline = Instant::now() + CLEANUP_DEADLINE;
        loop {
            self.delete_all_versions(bucket).await;
            match self.client.delete_bucket().bucket(bucket).send().await {
                Ok(_) => return,
                Err(err) if has_error_code(&err, "NoSuchBucket") => return,
                Err(err) => {
                    if Instant::now() >= deadline {
                        warn!(bucket, error = ?err, "giving up on bucket cleanup");
                        return;
                    }
                    debug!(bucket, error = ?err, "bucket not yet deletable, retrying");
                    tokio::time::sleep(CLEANUP_BACKOFF).await;
                }
            }
        }
    }

    async fn delete_all_versions(&self, bucket: &str) {
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;
        loop {
            let page = match self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_id_marker.clone())
                .send()
                .await
            {
                Ok(page) => page,
                Err(_) => return,
            };

            let targets = page
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()))
                .chain(page.delete_markers().iter().map(|m| (m.key(), m.version_id())));
            for (key, version_id) in targets {
                let (Some(key), Some(version_id)) = (key, version_id) else {
                    continue;
                };
                if let Err(err) = self
                    .client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .version_id(version_id)
                    .bypass_governance_retention(true)
                    .send()
                    .await
                {
                    debug!(bucket, key, version_id, error = ?err, "version delete failed");
                }
            }

            if page.is_truncated() != Some(true) {
                return;
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_id_marker = page.next_version_id_marker().map(str::to_string);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config::from_lookup(|name| match name {
            "SERVER_ENDPOINT" => Some("localhost:9000".to_string()),
            "ACCESS_KEY" => Some("minio".to_string()),
            "SECRET_KEY" => Some("minio123".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn bucket_names_are_unique_and_compliant() {
        let ctx = SuiteContext::new(test_config()).unwrap();
        let a = ctx.random_bucket_name("mint-test-");
        let b = ctx.random_bucket_name("mint-test-");
        assert_ne!(a, b);
        for name in [&a, &b] {
            assert!(name.len() >= 3 && name.len() <= 63);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }

    #[test]
    fn keys_carry_prefix() {
        let ctx = SuiteContext::new(test_config()).unwrap();
        assert!(ctx.random_key().starts_with("object-"));
    }
}
