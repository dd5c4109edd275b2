/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Bucket CRUD tests.

use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{ensure, fail, has_error_code, Suite, Test, TestFailure, TestResult, TestScope};

pub(crate) fn suite() -> Suite {
    Suite::new(
        "bucket",
        vec![
            Test::new("testMakeBucket", make_bucket),
            Test::new("testMakeBucketError", make_bucket_error),
            Test::new("testListBuckets", list_buckets),
            Test::new("testRemoveBucketNotEmpty", remove_bucket_not_empty),
        ],
    )
}

fn make_bucket<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("bucket-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.client()
                .head_bucket()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("HeadBucket failed after CreateBucket"))?;
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result?;

        let head = ctx.client().head_bucket().bucket(&bucket).send().await;
        ensure(head.is_err(), "HeadBucket expected to fail after bucket removal")
    })
}

fn make_bucket_error<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        // Uppercase and illegal characters are rejected either by the SDK or
        // by the server; a too-short name only by the server.
        for invalid in ["Mint-Bucket", "mint..bucket", "m"] {
            let result = ctx.client().create_bucket().bucket(invalid).send().await;
            ensure(result.is_err(), "CreateBucket with invalid name expected to fail")?;
        }

        let bucket = ctx.random_bucket_name("bucket-test-");
        scope.arg("bucketName", bucket.as_str());
        ctx.create_bucket(&bucket).await?;

        let result: TestResult = async {
            match ctx.client().create_bucket().bucket(&bucket).send().await {
                Ok(_) => Err(TestFailure::new("duplicate CreateBucket expected to fail")),
                Err(err) => ensure(
                    has_error_code(&err, "BucketAlreadyOwnedByYou")
                        || has_error_code(&err, "BucketAlreadyExists"),
                    "duplicate CreateBucket failed with unexpected error code",
                ),
            }
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_buckets<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let first = ctx.random_bucket_name("bucket-test-");
        let second = ctx.random_bucket_name("bucket-test-");
        scope.arg("bucketNames", format!("{first},{second}"));

        ctx.create_bucket(&first).await?;
        let result: TestResult = async {
            ctx.create_bucket(&second).await?;

            let listed = ctx
                .client()
                .list_buckets()
                .send()
                .await
                .map_err(fail("ListBuckets failed"))?;
            let names: Vec<&str> = listed.buckets().iter().filter_map(|b| b.name()).collect();
            ensure(
                names.contains(&first.as_str()) && names.contains(&second.as_str()),
                "ListBuckets missing a created bucket",
            )
        }
        .await;
        ctx.cleanup_bucket(&first).await;
        ctx.cleanup_bucket(&second).await;
        result
    })
}

fn remove_bucket_not_empty<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("bucket-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            ctx.put_object(&bucket, &object, data).await?;

            match ctx.client().delete_bucket().bucket(&bucket).send().await {
                Ok(_) => Err(TestFailure::new(
                    "DeleteBucket on a non-empty bucket expected to fail",
                )),
                Err(err) => ensure(
                    has_error_code(&err, "BucketNotEmpty"),
                    "DeleteBucket failed with unexpected error code",
                ),
            }
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
