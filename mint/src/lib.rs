/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Mint: S3 API conformance test harness.
//!
//! Drives a running S3-compatible object storage server through the AWS SDK
//! and emits one JSON record per test. Suites cover bucket and object CRUD,
//! multipart uploads, listing pagination, versioning and delete markers,
//! tagging, presigned URLs, and object lock.
//!
//! Configuration comes from the environment (`SERVER_ENDPOINT`, `ACCESS_KEY`,
//! `SECRET_KEY`, `ENABLE_HTTPS`, `SERVER_REGION`, `MINT_DATA_DIR`,
//! `MINT_MODE`); see [`config::Config`].

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub(crate) const KILOBYTE: u64 = 1000;

pub(crate) const MEGABYTE: u64 = 1000 * 1000;

pub(crate) const MEBIBYTE: u64 = 1024 * 1024;

/// Harness configuration loaded from the environment
pub mod config;

/// Error types emitted by `mint`
pub mod error;

/// JSON test records and log sinks
pub mod report;

/// Test payloads of well-known sizes
pub mod data;

/// Test and suite types, sequential execution
pub mod runner;

/// Shared per-run state handed to every test
pub mod context;

/// Conformance test suites
pub mod suites;
