/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! ListObjectsV2 tests: content checks, prefix/delimiter grouping and
//! continuation-token pagination.

use std::collections::BTreeSet;

use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{ensure, fail, Suite, Test, TestFailure, TestResult, TestScope};

pub(crate) fn suite() -> Suite {
    Suite::new(
        "listing",
        vec![
            Test::new("testListObjects", list_objects),
            Test::new("testListObjectsPrefixDelimiter", list_objects_prefix_delimiter),
            Test::new("testListObjectsPagination", list_objects_pagination),
        ],
    )
}

fn list_objects<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("listing-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectCount", 10);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            for i in 0..10 {
                ctx.put_object(&bucket, &format!("listed-object-{i}"), data.clone()).await?;
            }

            let listed = ctx
                .client()
                .list_objects_v2()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectsV2 failed"))?;
            ensure(listed.contents().len() == 10, "ListObjectsV2 returned unexpected count")?;
            ensure(
                listed.key_count() == Some(10),
                "ListObjectsV2 returned unexpected KeyCount",
            )?;

            let keys: Vec<&str> = listed.contents().iter().filter_map(|o| o.key()).collect();
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            ensure(keys == sorted, "ListObjectsV2 keys are not sorted")?;
            ensure(
                listed.contents().iter().all(|o| o.size() == Some(data.len() as i64)),
                "ListObjectsV2 returned unexpected sizes",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_objects_prefix_delimiter<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("listing-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            for key in ["dir/object", "dir/dir/object", "object"] {
                ctx.put_object(&bucket, key, data.clone()).await?;
            }

            // Recursive listing sees every key.
            let all = ctx
                .client()
                .list_objects_v2()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectsV2 failed"))?;
            let keys: Vec<&str> = all.contents().iter().filter_map(|o| o.key()).collect();
            ensure(
                keys == ["dir/dir/object", "dir/object", "object"],
                "recursive listing returned unexpected keys",
            )?;
            ensure(
                all.common_prefixes().is_empty(),
                "recursive listing returned unexpected common prefixes",
            )?;

            // Delimiter rolls the directory up into a common prefix.
            let delimited = ctx
                .client()
                .list_objects_v2()
                .bucket(&bucket)
                .delimiter("/")
                .send()
                .await
                .map_err(fail("ListObjectsV2 with delimiter failed"))?;
            let keys: Vec<&str> = delimited.contents().iter().filter_map(|o| o.key()).collect();
            let prefixes: Vec<&str> =
                delimited.common_prefixes().iter().filter_map(|p| p.prefix()).collect();
            ensure(keys == ["object"], "delimited listing returned unexpected keys")?;
            ensure(prefixes == ["dir/"], "delimited listing returned unexpected prefixes")?;

            // Prefix and delimiter together descend one level.
            let scoped = ctx
                .client()
                .list_objects_v2()
                .bucket(&bucket)
                .prefix("dir/")
                .delimiter("/")
                .send()
                .await
                .map_err(fail("ListObjectsV2 with prefix and delimiter failed"))?;
            let keys: Vec<&str> = scoped.contents().iter().filter_map(|o| o.key()).collect();
            let prefixes: Vec<&str> =
                scoped.common_prefixes().iter().filter_map(|p| p.prefix()).collect();
            ensure(keys == ["dir/object"], "scoped listing returned unexpected keys")?;
            ensure(prefixes == ["dir/dir/"], "scoped listing returned unexpected prefixes")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_objects_pagination<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("listing-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectCount", 10);
        scope.arg("maxKeys", 3);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-1-b").await.map_err(fail("loading payload"))?;
            let mut expected = BTreeSet::new();
            for i in 0..10 {
                let key = format!("paged-object-{i}");
                ctx.put_object(&bucket, &key, data.clone()).await?;
                expected.insert(key);
            }

            let mut seen = BTreeSet::new();
            let mut continuation: Option<String> = None;
            let mut pages = 0;
            loop {
                let page = ctx
                    .client()
                    .list_objects_v2()
                    .bucket(&bucket)
                    .max_keys(3)
                    .set_continuation_token(continuation.clone())
                    .send()
                    .await
                    .map_err(fail("paginated ListObjectsV2 failed"))?;
                pages += 1;
                ensure(page.contents().len() <= 3, "page exceeded MaxKeys")?;
                for object in page.contents() {
                    let key = object.key().unwrap_or_default().to_string();
                    ensure(seen.insert(key), "pagination returned a key twice")?;
                }

                if page.is_truncated() == Some(true) {
                    continuation = Some(
                        page.next_continuation_token()
                            .ok_or_else(|| {
                                TestFailure::new(
                                    "truncated page carried no NextContinuationToken",
                                )
                            })?
                            .to_string(),
                    );
                } else {
                    break;
                }
                ensure(pages < 32, "pagination did not terminate")?;
            }

            ensure(pages == 4, "pagination produced an unexpected page count")?;
            ensure(seen == expected, "pagination did not cover every key exactly once")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
