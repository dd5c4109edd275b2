/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Versioning tests: version creation and ordering, delete markers,
//! version-targeted reads and deletes, suspension, and the pagination of
//! `ListObjectVersions` by key marker and version-id marker.

use std::collections::BTreeSet;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketVersioningStatus, ObjectVersionStorageClass};
use aws_smithy_types::DateTime;
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{ensure, fail, Suite, Test, TestFailure, TestResult, TestScope};
use crate::suites::{is_quoted_etag, within_last_hour};

const CONTENT_V1: &[u8] = b"my content 1";
const CONTENT_V2: &[u8] = b"content file 2";

pub(crate) fn suite() -> Suite {
    Suite::new(
        "versioning",
        vec![
            Test::new("testMakeBucketVersioned", make_bucket_versioned),
            Test::new("testPutObject", put_object),
            Test::new("testPutObjectWithTaggingAndMetadata", put_object_with_tagging_and_metadata),
            Test::new("testGetObjectVersions", get_object_versions),
            Test::new("testStatObject", stat_object),
            Test::new("testListObjectVersionsSimple", list_object_versions_simple),
            Test::new("testDeleteVersion", delete_version),
            Test::new(
                "testListObjectVersionsWithPrefixAndDelimiter",
                list_object_versions_prefix_delimiter,
            ),
            Test::new("testListObjectVersionsKeysContinuation", keys_continuation),
            Test::new("testListObjectVersionsVersionIdContinuation", version_id_continuation),
            Test::new("testListObjectsVersionsWithEmptyDirObject", empty_dir_object),
            Test::new("testVersioningSuspend", versioning_suspend),
            Test::new("testListObjectVersionsErrors", list_object_versions_errors),
        ],
    )
}

fn timestamp(dt: Option<&DateTime>) -> (i64, u32) {
    dt.map(|d| (d.secs(), d.subsec_nanos())).unwrap_or((0, 0))
}

fn make_bucket_versioned<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;
            let config = ctx
                .client()
                .get_bucket_versioning()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("GetBucketVersioning failed"))?;
            ensure(
                config.status() == Some(&BucketVersioningStatus::Enabled),
                "GetBucketVersioning returned unexpected status",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V2)).await?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            let versions = listed.versions();
            ensure(versions.len() == 2, "ListObjectVersions returned unexpected version count")?;

            let newest = &versions[0];
            let oldest = &versions[1];
            let newest_id = newest.version_id().unwrap_or_default();
            let oldest_id = oldest.version_id().unwrap_or_default();
            ensure(
                !newest_id.is_empty() && !oldest_id.is_empty() && newest_id != oldest_id,
                "ListObjectVersions returned unexpected VersionId field",
            )?;
            ensure(
                newest.is_latest() == Some(true) && oldest.is_latest() == Some(false),
                "ListObjectVersions returned unexpected IsLatest field",
            )?;
            ensure(
                newest.size() == Some(CONTENT_V2.len() as i64)
                    && oldest.size() == Some(CONTENT_V1.len() as i64),
                "ListObjectVersions returned unexpected Size field",
            )?;
            ensure(
                newest.e_tag().is_some_and(is_quoted_etag)
                    && oldest.e_tag().is_some_and(is_quoted_etag),
                "ListObjectVersions returned unexpected ETag field",
            )?;
            ensure(
                newest.key() == Some(object) && oldest.key() == Some(object),
                "ListObjectVersions returned unexpected Key field",
            )?;
            ensure(
                timestamp(newest.last_modified()) >= timestamp(oldest.last_modified()),
                "ListObjectVersions returned unexpected LastModified ordering",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_object_with_tagging_and_metadata<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            // First version carries tagging and metadata, second neither.
            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key(object)
                .body(ByteStream::from(Bytes::from_static(CONTENT_V1)))
                .tagging("key1=value1")
                .metadata("mymetadata", "mint")
                .send()
                .await
                .map_err(fail("PutObject with tagging failed"))?;
            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V2)).await?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(
                listed.versions().len() == 2,
                "ListObjectVersions returned unexpected version count",
            )?;
            let tagged_id = listed.versions()[1].version_id().unwrap_or_default().to_string();
            let plain_id = listed.versions()[0].version_id().unwrap_or_default().to_string();

            let tagged = ctx
                .client()
                .get_object_tagging()
                .bucket(&bucket)
                .key(object)
                .version_id(&tagged_id)
                .send()
                .await
                .map_err(fail("GetObjectTagging for the first version failed"))?;
            ensure(
                tagged.tag_set().iter().any(|t| t.key() == "key1" && t.value() == "value1"),
                "first version is missing its tag",
            )?;

            let plain = ctx
                .client()
                .get_object_tagging()
                .bucket(&bucket)
                .key(object)
                .version_id(&plain_id)
                .send()
                .await
                .map_err(fail("GetObjectTagging for the second version failed"))?;
            ensure(plain.tag_set().is_empty(), "second version unexpectedly carries tags")?;

            let head = ctx
                .client()
                .head_object()
                .bucket(&bucket)
                .key(object)
                .version_id(&tagged_id)
                .send()
                .await
                .map_err(fail("HeadObject for the first version failed"))?;
            ensure(
                head.metadata()
                    .and_then(|m| m.get("mymetadata"))
                    .map(String::as_str)
                    == Some("mint"),
                "first version is missing its metadata",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn get_object_versions<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            let first = ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            let first_id = first
                .version_id()
                .ok_or_else(|| TestFailure::new("PutObject returned no VersionId"))?
                .to_string();
            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V2)).await?;

            let latest = ctx.get_object_bytes(&bucket, object).await?;
            ensure(latest == CONTENT_V2, "unversioned GetObject did not return the latest content")?;

            let old = ctx
                .client()
                .get_object()
                .bucket(&bucket)
                .key(object)
                .version_id(&first_id)
                .send()
                .await
                .map_err(fail("GetObject by VersionId failed"))?;
            ensure(
                old.version_id() == Some(first_id.as_str()),
                "GetObject returned an unexpected VersionId",
            )?;
            let body = old
                .body
                .collect()
                .await
                .map_err(fail("reading versioned GetObject body failed"))?
                .into_bytes();
            ensure(body == CONTENT_V1, "GetObject by VersionId returned the wrong content")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn stat_object<'a>(ctx: &'a SuiteContext, scope: &'a mut TestScope) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V2)).await?;
            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(object)
                .send()
                .await
                .map_err(fail("DeleteObject failed"))?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(
                listed.delete_markers().len() == 1 && listed.versions().len() == 2,
                "ListObjectVersions returned unexpected entries",
            )?;

            // Heading the delete-marker version must fail with MethodNotAllowed.
            let marker_id = listed.delete_markers()[0].version_id().unwrap_or_default();
            let marker_head = ctx
                .client()
                .head_object()
                .bucket(&bucket)
                .key(object)
                .version_id(marker_id)
                .send()
                .await;
            ensure(
                marker_head.is_err(),
                "HeadObject on a delete marker expected to fail",
            )?;

            let expected_sizes =
                [CONTENT_V2.len() as i64, CONTENT_V1.len() as i64];
            for (version, expected) in listed.versions().iter().zip(expected_sizes) {
                let head = ctx
                    .client()
                    .head_object()
                    .bucket(&bucket)
                    .key(object)
                    .version_id(version.version_id().unwrap_or_default())
                    .send()
                    .await
                    .map_err(fail("HeadObject by VersionId failed"))?;
                ensure(
                    head.content_length() == Some(expected),
                    "versioned HeadObject returned unexpected Content-Length",
                )?;
                ensure(
                    head.e_tag().is_some_and(is_quoted_etag),
                    "versioned HeadObject returned a malformed ETag",
                )?;
                ensure(
                    head.delete_marker() != Some(true),
                    "versioned HeadObject unexpectedly flagged a delete marker",
                )?;
                ensure(
                    head.last_modified().is_some_and(within_last_hour),
                    "versioned HeadObject returned a stale LastModified",
                )?;
            }
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_object_versions_simple<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            for _ in 0..10 {
                ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            }
            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(object)
                .send()
                .await
                .map_err(fail("DeleteObject failed"))?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;

            let mut version_ids = BTreeSet::new();

            // Exactly one delete marker, and it is the latest entry.
            ensure(
                listed.delete_markers().len() == 1,
                "ListObjectVersions returned unexpected delete marker count",
            )?;
            let marker = &listed.delete_markers()[0];
            ensure(
                marker.is_latest() == Some(true),
                "delete marker expected to be the latest entry",
            )?;
            ensure(marker.key() == Some(object), "delete marker carries an unexpected key")?;
            ensure(
                marker.last_modified().is_some_and(within_last_hour),
                "delete marker carries a stale LastModified",
            )?;
            let marker_id = marker.version_id().unwrap_or_default();
            ensure(!marker_id.is_empty(), "delete marker carries no VersionId")?;
            version_ids.insert(marker_id.to_string());

            ensure(
                listed.versions().len() == 10,
                "ListObjectVersions returned unexpected version count",
            )?;
            for version in listed.versions() {
                ensure(
                    version.is_latest() == Some(false),
                    "no version should be latest after the delete",
                )?;
                ensure(version.key() == Some(object), "version carries an unexpected key")?;
                ensure(
                    version.last_modified().is_some_and(within_last_hour),
                    "version carries a stale LastModified",
                )?;
                ensure(
                    version.size() == Some(CONTENT_V1.len() as i64),
                    "version carries an unexpected size",
                )?;
                ensure(
                    version.e_tag().is_some_and(is_quoted_etag),
                    "version carries a malformed ETag",
                )?;
                ensure(
                    version.storage_class() == Some(&ObjectVersionStorageClass::Standard),
                    "version carries an unexpected storage class",
                )?;
                let id = version.version_id().unwrap_or_default();
                ensure(!id.is_empty(), "version carries no VersionId")?;
                version_ids.insert(id.to_string());
            }
            ensure(
                version_ids.len() == 11,
                "ListObjectVersions did not return 11 distinct version IDs",
            )?;

            // The key now resolves to the delete marker.
            let head = ctx.client().head_object().bucket(&bucket).key(object).send().await;
            ensure(head.is_err(), "HeadObject expected to fail after the delete")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn delete_version<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            let mut ids = Vec::new();
            for _ in 0..3 {
                let put = ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
                ids.push(
                    put.version_id()
                        .ok_or_else(|| TestFailure::new("PutObject returned no VersionId"))?
                        .to_string(),
                );
            }

            // Deleting a specific version removes it permanently; no marker.
            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(object)
                .version_id(&ids[1])
                .send()
                .await
                .map_err(fail("DeleteObject by VersionId failed"))?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(
                listed.delete_markers().is_empty(),
                "version-targeted delete unexpectedly created a delete marker",
            )?;
            let remaining: Vec<&str> =
                listed.versions().iter().filter_map(|v| v.version_id()).collect();
            ensure(remaining.len() == 2, "unexpected number of versions remain")?;
            ensure(
                !remaining.contains(&ids[1].as_str()),
                "deleted version still listed",
            )?;
            ensure(
                remaining.contains(&ids[0].as_str()) && remaining.contains(&ids[2].as_str()),
                "surviving versions are missing from the listing",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_object_versions_prefix_delimiter<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            for key in ["dir/object", "dir/dir/object", "object"] {
                ctx.put_object(&bucket, key, Bytes::from_static(CONTENT_V1)).await?;
            }

            let keys_of = |out: &aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput| -> Vec<(String, bool)> {
                out.versions()
                    .iter()
                    .map(|v| {
                        (
                            v.key().unwrap_or_default().to_string(),
                            v.is_latest().unwrap_or_default(),
                        )
                    })
                    .collect()
            };
            let prefixes_of = |out: &aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput| -> Vec<String> {
                out.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(str::to_string))
                    .collect()
            };

            // Recursive listing.
            let all = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(
                keys_of(&all)
                    == [
                        ("dir/dir/object".to_string(), true),
                        ("dir/object".to_string(), true),
                        ("object".to_string(), true),
                    ],
                "recursive version listing returned unexpected keys",
            )?;
            ensure(
                prefixes_of(&all).is_empty(),
                "recursive version listing returned unexpected prefixes",
            )?;

            // Listing with delimiter.
            let delimited = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .delimiter("/")
                .send()
                .await
                .map_err(fail("ListObjectVersions with delimiter failed"))?;
            ensure(
                keys_of(&delimited) == [("object".to_string(), true)],
                "delimited version listing returned unexpected keys",
            )?;
            ensure(
                prefixes_of(&delimited) == ["dir/"],
                "delimited version listing returned unexpected prefixes",
            )?;

            // Listing with prefix and delimiter.
            let scoped = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .prefix("dir/")
                .delimiter("/")
                .send()
                .await
                .map_err(fail("ListObjectVersions with prefix and delimiter failed"))?;
            ensure(
                keys_of(&scoped) == [("dir/object".to_string(), true)],
                "scoped version listing returned unexpected keys",
            )?;
            ensure(
                prefixes_of(&scoped) == ["dir/dir/"],
                "scoped version listing returned unexpected prefixes",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn keys_continuation<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectCount", 10);
        scope.arg("maxKeys", 5);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            let mut expected = BTreeSet::new();
            for i in 0..10 {
                let key = format!("testobject-{i}");
                ctx.put_object(&bucket, &key, Bytes::from_static(CONTENT_V1)).await?;
                expected.insert(key);
            }

            let first = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .max_keys(5)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(first.versions().len() == 5, "first page returned unexpected count")?;
            ensure(
                first.is_truncated() == Some(true),
                "first page expected to be truncated",
            )?;
            let key_marker = first
                .next_key_marker()
                .ok_or_else(|| TestFailure::new("truncated page carried no NextKeyMarker"))?
                .to_string();

            let second = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .max_keys(5)
                .key_marker(&key_marker)
                .send()
                .await
                .map_err(fail("continued ListObjectVersions failed"))?;
            ensure(second.versions().len() == 5, "second page returned unexpected count")?;
            ensure(
                second.is_truncated() != Some(true),
                "second page unexpectedly truncated",
            )?;

            let mut seen = BTreeSet::new();
            for version in first.versions().iter().chain(second.versions()) {
                ensure(
                    seen.insert(version.key().unwrap_or_default().to_string()),
                    "continuation returned a key twice",
                )?;
            }
            ensure(seen == expected, "continuation did not cover every key exactly once")
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn version_id_continuation<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);
        scope.arg("maxKeys", 5);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            for _ in 0..10 {
                ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            }

            let mut version_ids = BTreeSet::new();
            let first = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .max_keys(5)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(first.versions().len() == 5, "first page returned unexpected count")?;
            ensure(
                first.is_truncated() == Some(true),
                "first page expected to be truncated",
            )?;
            ensure(
                first.versions()[0].is_latest() == Some(true),
                "first entry of the first page expected to be latest",
            )?;
            let key_marker = first
                .next_key_marker()
                .ok_or_else(|| TestFailure::new("truncated page carried no NextKeyMarker"))?
                .to_string();
            let id_marker = first
                .next_version_id_marker()
                .ok_or_else(|| {
                    TestFailure::new("truncated page carried no NextVersionIdMarker")
                })?
                .to_string();
            for version in first.versions() {
                version_ids.insert(version.version_id().unwrap_or_default().to_string());
            }

            let second = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .max_keys(5)
                .key_marker(&key_marker)
                .version_id_marker(&id_marker)
                .send()
                .await
                .map_err(fail("continued ListObjectVersions failed"))?;
            ensure(second.versions().len() == 5, "second page returned unexpected count")?;
            ensure(
                second.is_truncated() != Some(true),
                "second page unexpectedly truncated",
            )?;
            for version in second.versions() {
                ensure(
                    version.is_latest() == Some(false),
                    "second page unexpectedly contains the latest version",
                )?;
                version_ids.insert(version.version_id().unwrap_or_default().to_string());
            }

            ensure(
                version_ids.len() == 10,
                "continuation did not yield 10 distinct version IDs",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn empty_dir_object<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", "dir/");

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            ctx.client()
                .put_object()
                .bucket(&bucket)
                .key("dir/")
                .body(ByteStream::from(Bytes::new()))
                .send()
                .await
                .map_err(fail("PutObject for the empty dir object failed"))?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            ensure(
                listed.versions().len() == 1,
                "ListObjectVersions returned unexpected version count",
            )?;
            let version = &listed.versions()[0];
            ensure(version.key() == Some("dir/"), "empty dir object carries an unexpected key")?;
            ensure(version.size() == Some(0), "empty dir object carries an unexpected size")?;
            ensure(
                version.is_latest() == Some(true),
                "empty dir object expected to be latest",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn versioning_suspend<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        let object = "testObject";
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object);

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;
            let put = ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V1)).await?;
            ensure(
                put.version_id().is_some_and(|v| v != "null"),
                "versioned PutObject returned no real VersionId",
            )?;

            ctx.suspend_versioning(&bucket).await?;
            let config = ctx
                .client()
                .get_bucket_versioning()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("GetBucketVersioning failed"))?;
            ensure(
                config.status() == Some(&BucketVersioningStatus::Suspended),
                "GetBucketVersioning expected Suspended",
            )?;

            // A put under suspension takes the "null" version.
            let suspended = ctx.put_object(&bucket, object, Bytes::from_static(CONTENT_V2)).await?;
            ensure(
                suspended.version_id().map_or(true, |v| v == "null"),
                "PutObject under suspension returned a real VersionId",
            )?;

            let listed = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListObjectVersions failed"))?;
            let null_version = listed
                .versions()
                .iter()
                .find(|v| v.version_id() == Some("null"))
                .ok_or_else(|| TestFailure::new("no null version listed after suspension"))?;
            ensure(
                null_version.is_latest() == Some(true),
                "null version expected to be latest",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_object_versions_errors<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("versioning-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            ctx.enable_versioning(&bucket).await?;

            // A version-id marker without a key marker is invalid.
            let dangling_marker = ctx
                .client()
                .list_object_versions()
                .bucket(&bucket)
                .version_id_marker("test")
                .send()
                .await;
            ensure(
                dangling_marker.is_err(),
                "ListObjectVersions with a dangling VersionIdMarker expected to fail",
            )?;

            // Credentials the server does not know must be rejected.
            let stranger = ctx.config().client_with_credentials("test", "test");
            let denied = stranger.list_object_versions().bucket(&bucket).send().await;
            ensure(
                denied.is_err(),
                "ListObjectVersions with unknown credentials expected to fail",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
