/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Object CRUD tests: put/get/head/copy/delete, ranged reads, metadata,
//! batch delete, checksums and a concurrent-upload smoke test.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ChecksumAlgorithm, Delete, ObjectAttributes, ObjectIdentifier};
use futures_util::future::{join_all, BoxFuture};

use crate::context::SuiteContext;
use crate::runner::{
    ensure, ensure_error_code, fail, Suite, Test, TestFailure, TestResult, TestScope,
};
use crate::suites::{is_quoted_etag, within_last_hour};

const CONCURRENT_UPLOADS: usize = 4;

pub(crate) fn suite() -> Suite {
    Suite::new(
        "object",
        vec![
            Test::new("testPutObject", put_object),
            Test::new("testPutObjectWithMetadata", put_object_with_metadata),
            Test::new("testGetObjectRange", get_object_range),
            Test::new("testStatObject", stat_object),
            Test::new("testCopyObject", copy_object),
            Test::new("testRemoveObject", remove_object),
            Test::new("testRemoveMultipleObjects", remove_multiple_objects),
            Test::new("testPutObjectChecksum", put_object_checksum),
            Test::new("testConcurrentPutObject", concurrent_put_object),
        ],
    )
}

fn put_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("size", 33_000);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;
            let put = ctx.put_object(&bucket, &object, data.clone()).await?;
            ensure(
                put.e_tag().is_some_and(is_quoted_etag),
                "PutObject returned a malformed ETag",
            )?;

            let returned = ctx.get_object_bytes(&bucket, &object).await?;
            ensure(returned == data, "GetObject content differs from what was uploaded")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_object_with_metadata<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("contentType", "text/plain");

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .body(ByteStream::from(data))
                .content_type("text/plain")
                .metadata("purpose", "conformance")
                .send()
                .await
                .map_err(fail("PutObject with metadata failed"))?;

            let head = ctx
                .client()
                .head_object()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("HeadObject failed"))?;
            ensure(
                head.content_type() == Some("text/plain"),
                "HeadObject returned unexpected Content-Type",
            )?;
            let meta = head
                .metadata()
                .ok_or_else(|| TestFailure::new("HeadObject returned no user metadata"))?;
            ensure(
                meta.get("purpose").map(String::as_str) == Some("conformance"),
                "HeadObject missing the uploaded user metadata",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn get_object_range<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("range", "bytes=1000-1999");

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-100-kB").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data.clone()).await?;

            let ranged = ctx
                .client()
                .get_object()
                .bucket(&bucket)
                .key(&object)
                .range("bytes=1000-1999")
                .send()
                .await
                .map_err(fail("ranged GetObject failed"))?;
            ensure(
                ranged.content_range().is_some(),
                "ranged GetObject returned no Content-Range",
            )?;
            let body = ranged
                .body
                .collect()
                .await
                .map_err(fail("reading ranged GetObject body failed"))?
                .into_bytes();
            ensure(body.len() == 1000, "ranged GetObject returned unexpected length")?;
            ensure(
                body == data.slice(1000..2000),
                "ranged GetObject content differs from the requested slice",
            )?;

            // Open-ended suffix of the payload.
            let tail_start = data.len() - 1000;
            let tail = ctx
                .client()
                .get_object()
                .bucket(&bucket)
                .key(&object)
                .range(format!("bytes={tail_start}-"))
                .send()
                .await
                .map_err(fail("open-ended ranged GetObject failed"))?
                .body
                .collect()
                .await
                .map_err(fail("reading open-ended range body failed"))?
                .into_bytes();
            ensure(
                tail == data.slice(tail_start..),
                "open-ended range content differs from the payload tail",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn stat_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;
            let size = data.len() as i64;
            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .body(ByteStream::from(data))
                .content_type("application/octet-stream")
                .send()
                .await
                .map_err(fail("PutObject failed"))?;

            let head = ctx
                .client()
                .head_object()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("HeadObject failed"))?;
            ensure(
                head.content_length() == Some(size),
                "HeadObject returned unexpected Content-Length",
            )?;
            ensure(
                head.content_type() == Some("application/octet-stream"),
                "HeadObject returned unexpected Content-Type",
            )?;
            ensure(
                head.e_tag().is_some_and(is_quoted_etag),
                "HeadObject returned a malformed ETag",
            )?;
            ensure(
                head.last_modified().is_some_and(within_last_hour),
                "HeadObject returned a stale LastModified",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn copy_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let source = ctx.random_key();
        let target = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectSource", source.as_str());
        scope.arg("objectName", target.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;
            let put = ctx.put_object(&bucket, &source, data.clone()).await?;

            ctx.client()
                .copy_object()
                .copy_source(format!("{bucket}/{source}"))
                .bucket(&bucket)
                .key(&target)
                .send()
                .await
                .map_err(fail("CopyObject failed"))?;

            let copied = ctx.get_object_bytes(&bucket, &target).await?;
            ensure(copied == data, "copied object content differs from the source")?;

            let head = ctx
                .client()
                .head_object()
                .bucket(&bucket)
                .key(&target)
                .send()
                .await
                .map_err(fail("HeadObject on the copy failed"))?;
            ensure(
                head.e_tag() == put.e_tag(),
                "copied object ETag differs from the source",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn remove_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data).await?;

            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("DeleteObject failed"))?;

            let head = ctx.client().head_object().bucket(&bucket).key(&object).send().await;
            ensure(head.is_err(), "HeadObject expected to fail after delete")?;

            let get = ctx.client().get_object().bucket(&bucket).key(&object).send().await;
            ensure_error_code(&get, "NoSuchKey", "GetObject after delete expected NoSuchKey")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn remove_multiple_objects<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectCount", 10);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            let mut identifiers = Vec::new();
            for i in 0..10 {
                let key = format!("batch-object-{i}");
                ctx.put_object(&bucket, &key, data.clone()).await?;
                identifiers.push(
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(fail("building ObjectIdentifier failed"))?,
                );
            }

            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(fail("building Delete failed"))?;
            let output = ctx
                .client()
                .delete_objects()
                .bucket(&bucket)
                .delete(delete)
                .send()
                .await
                .map_err(fail("DeleteObjects failed"))?;
            ensure(
                output.errors().is_empty(),
                "DeleteObjects reported per-key errors",
            )?;

            let listed = ctx
                .client()
                .list_objects_v2()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectsV2 failed"))?;
            ensure(
                listed.contents().is_empty(),
                "bucket still lists objects after batch delete",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_object_checksum<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("checksumAlgorithm", "CRC32");

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-33-kB").await.map_err(fail("loading payload"))?;
            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .body(ByteStream::from(data.clone()))
                .checksum_algorithm(ChecksumAlgorithm::Crc32)
                .send()
                .await
                .map_err(fail("PutObject with checksum algorithm failed"))?;

            let attributes = ctx
                .client()
                .get_object_attributes()
                .bucket(&bucket)
                .key(&object)
                .object_attributes(ObjectAttributes::Checksum)
                .object_attributes(ObjectAttributes::ObjectSize)
                .send()
                .await
                .map_err(fail("GetObjectAttributes failed"))?;
            ensure(
                attributes.object_size() == Some(data.len() as i64),
                "GetObjectAttributes returned unexpected object size",
            )?;
            let checksum = attributes
                .checksum()
                .and_then(|c| c.checksum_crc32())
                .unwrap_or_default();
            ensure(!checksum.is_empty(), "GetObjectAttributes returned no CRC32 checksum")?;

            // A corrupted precomputed checksum must be rejected.
            let corrupted = ctx
                .client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .body(ByteStream::from(data))
                .checksum_crc32("AAAAAA==")
                .send()
                .await;
            ensure(
                corrupted.is_err(),
                "PutObject with a corrupted CRC32 expected to fail",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn concurrent_put_object<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("object-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("uploads", CONCURRENT_UPLOADS as u64);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-MB").await.map_err(fail("loading payload"))?;

            // Fire-and-join: same payload, distinct keys, one task each.
            let mut tasks = Vec::with_capacity(CONCURRENT_UPLOADS);
            for i in 0..CONCURRENT_UPLOADS {
                let client = ctx.client().clone();
                let bucket = bucket.clone();
                let data = data.clone();
                tasks.push(tokio::spawn(async move {
                    client
                        .put_object()
                        .bucket(bucket)
                        .key(format!("concurrent-object-{i}"))
                        .body(ByteStream::from(data))
                        .send()
                        .await
                }));
            }
            for joined in join_all(tasks).await {
                let put = joined.map_err(fail("upload task panicked"))?;
                put.map_err(fail("concurrent PutObject failed"))?;
            }

            for i in 0..CONCURRENT_UPLOADS {
                let head = ctx
                    .client()
                    .head_object()
                    .bucket(&bucket)
                    .key(format!("concurrent-object-{i}"))
                    .send()
                    .await
                    .map_err(fail("HeadObject after concurrent upload failed"))?;
                ensure(
                    head.content_length() == Some(data.len() as i64),
                    "concurrently uploaded object has unexpected size",
                )?;
            }
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
