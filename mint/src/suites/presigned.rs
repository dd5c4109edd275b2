/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Presigned URL tests, exercised over raw HTTP so the signature itself is
//! what the server validates.

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::context::SuiteContext;
use crate::runner::{ensure, fail, Suite, Test, TestFailure, TestResult, TestScope};

const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

pub(crate) fn suite() -> Suite {
    Suite::new(
        "presigned",
        vec![
            Test::new("testPresignedGetObject", presigned_get_object),
            Test::new("testPresignedPutObject", presigned_put_object),
            Test::new("testPresignedPutInvalidHash", presigned_put_invalid_hash),
            Test::full_mode("testPresignedExpiry", presigned_expiry),
        ],
    )
}

/// The S3 XML error body returned to unauthenticated HTTP callers.
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct ErrorResponse {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    #[allow(dead_code)]
    message: String,
    #[serde(rename = "Key", default)]
    #[allow(dead_code)]
    key: String,
}

fn parse_error_response(body: &str) -> Result<ErrorResponse, TestFailure> {
    quick_xml::de::from_str(body).map_err(fail("unmarshalling the XML error body failed"))
}

fn presigned_get_object<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("presigned-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("expiry", PRESIGN_EXPIRY.as_secs());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data.clone()).await?;

            let presigned = ctx
                .client()
                .get_object()
                .bucket(&bucket)
                .key(&object)
                .presigned(
                    PresigningConfig::expires_in(PRESIGN_EXPIRY)
                        .map_err(fail("building PresigningConfig failed"))?,
                )
                .await
                .map_err(fail("presigning GetObject failed"))?;

            let response = ctx
                .http()
                .get(presigned.uri())
                .send()
                .await
                .map_err(fail("fetching the presigned GET failed"))?;
            ensure(
                response.status().is_success(),
                "presigned GET returned a non-success status",
            )?;
            let body = response
                .bytes()
                .await
                .map_err(fail("reading the presigned GET body failed"))?;
            ensure(body == data, "presigned GET content differs from the uploaded object")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn presigned_put_object<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("presigned-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("expiry", PRESIGN_EXPIRY.as_secs());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;

            let presigned = ctx
                .client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .presigned(
                    PresigningConfig::expires_in(PRESIGN_EXPIRY)
                        .map_err(fail("building PresigningConfig failed"))?,
                )
                .await
                .map_err(fail("presigning PutObject failed"))?;

            let response = ctx
                .http()
                .put(presigned.uri())
                .body(data.to_vec())
                .send()
                .await
                .map_err(fail("sending the presigned PUT failed"))?;
            ensure(
                response.status().is_success(),
                "presigned PUT returned a non-success status",
            )?;

            let returned = ctx.get_object_bytes(&bucket, &object).await?;
            ensure(returned == data, "object uploaded via presigned PUT differs")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn presigned_put_invalid_hash<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("presigned-test-");
        let object = "presignedTest";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);
        scope.arg("expiry", PRESIGN_EXPIRY.as_secs());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let presigned = ctx
                .client()
                .put_object()
                .bucket(&bucket)
                .key(object)
                .presigned(
                    PresigningConfig::expires_in(PRESIGN_EXPIRY)
                        .map_err(fail("building PresigningConfig failed"))?,
                )
                .await
                .map_err(fail("presigning PutObject failed"))?;

            // A tampered payload hash must invalidate the signature.
            let response = ctx
                .http()
                .put(presigned.uri())
                .header("x-amz-content-sha256", "invalid-sha256")
                .body(Vec::new())
                .send()
                .await
                .map_err(fail("sending the tampered presigned PUT failed"))?;
            ensure(
                !response.status().is_success(),
                "tampered presigned PUT expected to be rejected",
            )?;
            let body = response
                .text()
                .await
                .map_err(fail("reading the error body failed"))?;
            let error = parse_error_response(&body)?;
            if error.code != "SignatureDoesNotMatch" {
                return Err(TestFailure::new(format!(
                    "expected SignatureDoesNotMatch, got {}",
                    error.code
                )));
            }
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn presigned_expiry<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("presigned-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("expiry", 1);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data).await?;

            let presigned = ctx
                .client()
                .get_object()
                .bucket(&bucket)
                .key(&object)
                .presigned(
                    PresigningConfig::expires_in(Duration::from_secs(1))
                        .map_err(fail("building PresigningConfig failed"))?,
                )
                .await
                .map_err(fail("presigning GetObject failed"))?;

            tokio::time::sleep(Duration::from_secs(3)).await;

            let response = ctx
                .http()
                .get(presigned.uri())
                .send()
                .await
                .map_err(fail("fetching the expired presigned GET failed"))?;
            ensure(
                response.status().as_u16() == 403,
                "expired presigned GET expected a 403",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_error_body() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>SignatureDoesNotMatch</Code><Message>The request signature we calculated does not match the signature you provided.</Message><Key>presignedTest</Key><BucketName>mint-xyz</BucketName><Resource>/mint-xyz/presignedTest</Resource><RequestId>17F</RequestId><HostId>h</HostId></Error>"#;
        let parsed = parse_error_response(body).unwrap();
        assert_eq!(parsed.code, "SignatureDoesNotMatch");
        assert_eq!(parsed.key, "presignedTest");
    }

    #[test]
    fn rejects_non_xml_body() {
        assert!(parse_error_response("AccessDenied").is_err());
    }
}
