/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::env;
use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Region, ResponseChecksumValidation};

use crate::error::{invalid_config, Error};

const DEFAULT_REGION: &str = "us-east-1";

/// Which tests a run executes.
///
/// Core skips tests flagged as large or slow (multi-part uploads of the big
/// payloads, presigned-expiry sleeps); full runs everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// The standard selection
    #[default]
    Core,

    /// Core plus large/slow tests
    Full,
}

impl RunMode {
    fn parse(value: &str) -> Result<Self, Error> {
        match value.to_ascii_lowercase().as_str() {
            "core" => Ok(RunMode::Core),
            "full" => Ok(RunMode::Full),
            other => Err(invalid_config(format!(
                "MINT_MODE must be 'core' or 'full', got '{other}'"
            ))),
        }
    }
}

/// Harness configuration, loaded from the environment.
///
/// | variable          | required | meaning                                  |
/// |-------------------|----------|------------------------------------------|
/// | `SERVER_ENDPOINT` | yes      | `host:port` of the server under test     |
/// | `ACCESS_KEY`      | yes      | access key                               |
/// | `SECRET_KEY`      | yes      | secret key                               |
/// | `ENABLE_HTTPS`    | no       | `1`/`true` selects the https scheme      |
/// | `SERVER_REGION`   | no       | signing region, default `us-east-1`      |
/// | `MINT_DATA_DIR`   | no       | directory holding test payload files     |
/// | `MINT_MODE`       | no       | `core` (default) or `full`               |
#[derive(Debug, Clone)]
pub struct Config {
    server_endpoint: String,
    access_key: String,
    secret_key: String,
    secure: bool,
    region: String,
    data_dir: Option<PathBuf>,
    mode: RunMode,
}

impl Config {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| match lookup(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(invalid_config(format!("{name} must be set"))),
        };

        let secure = match lookup("ENABLE_HTTPS").as_deref() {
            None | Some("") | Some("0") => false,
            Some(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        };

        let mode = match lookup("MINT_MODE") {
            Some(value) if !value.is_empty() => RunMode::parse(&value)?,
            _ => RunMode::default(),
        };

        Ok(Config {
            server_endpoint: required("SERVER_ENDPOINT")?,
            access_key: required("ACCESS_KEY")?,
            secret_key: required("SECRET_KEY")?,
            secure,
            region: lookup("SERVER_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            data_dir: lookup("MINT_DATA_DIR").filter(|d| !d.is_empty()).map(PathBuf::from),
            mode,
        })
    }

    /// The `host:port` of the server under test.
    pub fn server_endpoint(&self) -> &str {
        &self.server_endpoint
    }

    /// Whether requests use HTTPS.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// The signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Directory holding pre-generated test payload files, if configured.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// The run mode.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// The full endpoint URL, scheme included.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.server_endpoint)
    }

    /// Build an S3 client for the server under test.
    ///
    /// Path-style addressing and relaxed response checksum validation, the
    /// usual settings for S3-compatible endpoints.
    pub fn client(&self) -> aws_sdk_s3::Client {
        self.client_with_credentials(&self.access_key, &self.secret_key)
    }

    /// Build an S3 client with explicit credentials.
    ///
    /// The error-case tests use this to talk to the server with credentials
    /// it does not know.
    pub fn client_with_credentials(&self, access_key: &str, secret_key: &str) -> aws_sdk_s3::Client {
        let credentials = Credentials::new(access_key, secret_key, None, None, "mint");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(self.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(true)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        aws_sdk_s3::Client::from_conf(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_ENDPOINT", "localhost:9000"),
            ("ACCESS_KEY", "minio"),
            ("SECRET_KEY", "minio123"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, Error> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn defaults() {
        let config = load(&base_env()).unwrap();
        assert!(!config.secure());
        assert_eq!(config.region(), "us-east-1");
        assert_eq!(config.mode(), RunMode::Core);
        assert_eq!(config.data_dir(), None);
        assert_eq!(config.endpoint_url(), "http://localhost:9000");
    }

    #[test]
    fn missing_endpoint_is_a_config_error() {
        let mut env = base_env();
        env.remove("SERVER_ENDPOINT");
        let err = load(&env).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Config);
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        let mut env = base_env();
        env.insert("SECRET_KEY", "");
        assert!(load(&env).is_err());
    }

    #[test]
    fn https_flag_variants() {
        for (value, expected) in [("1", true), ("true", true), ("TRUE", true), ("0", false), ("", false)] {
            let mut env = base_env();
            env.insert("ENABLE_HTTPS", value);
            let config = load(&env).unwrap();
            assert_eq!(config.secure(), expected, "ENABLE_HTTPS={value}");
        }
        let config = load(&base_env()).unwrap();
        assert!(!config.secure());
    }

    #[test]
    fn https_scheme_in_endpoint_url() {
        let mut env = base_env();
        env.insert("ENABLE_HTTPS", "1");
        let config = load(&env).unwrap();
        assert_eq!(config.endpoint_url(), "https://localhost:9000");
    }

    #[test]
    fn mode_parsing() {
        let mut env = base_env();
        env.insert("MINT_MODE", "full");
        assert_eq!(load(&env).unwrap().mode(), RunMode::Full);

        env.insert("MINT_MODE", "CORE");
        assert_eq!(load(&env).unwrap().mode(), RunMode::Core);

        env.insert("MINT_MODE", "fast");
        assert!(load(&env).is_err());
    }

    #[test]
    fn data_dir_passthrough() {
        let mut env = base_env();
        env.insert("MINT_DATA_DIR", "/mint/data");
        let config = load(&env).unwrap();
        assert_eq!(config.data_dir(), Some(Path::new("/mint/data")));
    }
}
