/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Object and bucket tagging tests.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{
    ensure, ensure_error_code, fail, has_error_code, Suite, Test, TestFailure, TestResult,
    TestScope,
};

pub(crate) fn suite() -> Suite {
    Suite::new(
        "tagging",
        vec![
            Test::new("testObjectTagging", object_tagging),
            Test::new("testPutObjectWithTags", put_object_with_tags),
            Test::new("testObjectTaggingVersions", object_tagging_versions),
            Test::new("testObjectTaggingError", object_tagging_error),
            Test::new("testBucketTagging", bucket_tagging),
        ],
    )
}

fn tag(key: &str, value: &str) -> Result<Tag, TestFailure> {
    Tag::builder()
        .key(key)
        .value(value)
        .build()
        .map_err(fail("building Tag failed"))
}

fn tag_set(pairs: &[(&str, &str)]) -> Result<Tagging, TestFailure> {
    let mut builder = Tagging::builder();
    for (key, value) in pairs {
        builder = builder.tag_set(tag(key, value)?);
    }
    builder.build().map_err(fail("building Tagging failed"))
}

fn object_tagging<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("tagging-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data).await?;

            ctx.client()
                .put_object_tagging()
                .bucket(&bucket)
                .key(&object)
                .tagging(tag_set(&[("tag1", "value1"), ("tag2", "value2")])?)
                .send()
                .await
                .map_err(fail("PutObjectTagging failed"))?;

            let tagged = ctx
                .client()
                .get_object_tagging()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("GetObjectTagging failed"))?;
            let mut pairs: Vec<(&str, &str)> =
                tagged.tag_set().iter().map(|t| (t.key(), t.value())).collect();
            pairs.sort_unstable();
            ensure(
                pairs == [("tag1", "value1"), ("tag2", "value2")],
                "GetObjectTagging returned an unexpected tag set",
            )?;

            ctx.client()
                .delete_object_tagging()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("DeleteObjectTagging failed"))?;
            let cleared = ctx
                .client()
                .get_object_tagging()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("GetObjectTagging after delete failed"))?;
            ensure(
                cleared.tag_set().is_empty(),
                "tag set expected to be empty after DeleteObjectTagging",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_object_with_tags<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("tagging-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key(&object)
                .body(ByteStream::from(data))
                .tagging("source=mint&kind=conformance")
                .send()
                .await
                .map_err(fail("PutObject with tagging failed"))?;

            let tagged = ctx
                .client()
                .get_object_tagging()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("GetObjectTagging failed"))?;
            let mut pairs: Vec<(&str, &str)> =
                tagged.tag_set().iter().map(|t| (t.key(), t.value())).collect();
            pairs.sort_unstable();
            ensure(
                pairs == [("kind", "conformance"), ("source", "mint")],
                "tags supplied at put time did not round-trip",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn object_tagging_versions<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("tagging-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            let first = ctx
                .put_object(&bucket, object, Bytes::from_static(b"version one"))
                .await?;
            let first_id = first
                .version_id()
                .ok_or_else(|| TestFailure::new("PutObject returned no VersionId"))?
                .to_string();
            let second = ctx
                .put_object(&bucket, object, Bytes::from_static(b"version two"))
                .await?;
            let second_id = second
                .version_id()
                .ok_or_else(|| TestFailure::new("PutObject returned no VersionId"))?
                .to_string();

            for (version_id, value) in [(&first_id, "old"), (&second_id, "new")] {
                ctx.client()
                    .put_object_tagging()
                    .bucket(&bucket)
                    .key(object)
                    .version_id(version_id)
                    .tagging(tag_set(&[("epoch", value)])?)
                    .send()
                    .await
                    .map_err(fail("versioned PutObjectTagging failed"))?;
            }

            // Per-version tag sets stay independent.
            for (version_id, value) in [(&first_id, "old"), (&second_id, "new")] {
                let tagged = ctx
                    .client()
                    .get_object_tagging()
                    .bucket(&bucket)
                    .key(object)
                    .version_id(version_id)
                    .send()
                    .await
                    .map_err(fail("versioned GetObjectTagging failed"))?;
                ensure(
                    tagged.tag_set().iter().any(|t| t.key() == "epoch" && t.value() == value),
                    "version carries an unexpected tag set",
                )?;
            }
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn object_tagging_error<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("tagging-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let missing = ctx
                .client()
                .put_object_tagging()
                .bucket(&bucket)
                .key("absent-object")
                .tagging(tag_set(&[("tag1", "value1")])?)
                .send()
                .await;
            ensure_error_code(
                &missing,
                "NoSuchKey",
                "PutObjectTagging on a missing key expected NoSuchKey",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn bucket_tagging<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("tagging-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.client()
                .put_bucket_tagging()
                .bucket(&bucket)
                .tagging(tag_set(&[("team", "storage"), ("stage", "conformance")])?)
                .send()
                .await
                .map_err(fail("PutBucketTagging failed"))?;

            let tagged = ctx
                .client()
                .get_bucket_tagging()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("GetBucketTagging failed"))?;
            let mut pairs: Vec<(&str, &str)> =
                tagged.tag_set().iter().map(|t| (t.key(), t.value())).collect();
            pairs.sort_unstable();
            ensure(
                pairs == [("stage", "conformance"), ("team", "storage")],
                "GetBucketTagging returned an unexpected tag set",
            )?;

            ctx.client()
                .delete_bucket_tagging()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("DeleteBucketTagging failed"))?;
            match ctx.client().get_bucket_tagging().bucket(&bucket).send().await {
                // AWS answers NoSuchTagSet; some implementations return an
                // empty set instead.
                Ok(output) => ensure(
                    output.tag_set().is_empty(),
                    "bucket tag set expected to be empty after delete",
                ),
                Err(err) => ensure(
                    has_error_code(&err, "NoSuchTagSet"),
                    "GetBucketTagging after delete failed with unexpected error code",
                ),
            }
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
