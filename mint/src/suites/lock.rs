/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Object lock tests: lock configuration, legal hold, and governance and
//! compliance retention.
//!
//! Retention windows are kept short so cleanup only has to outwait seconds,
//! not days; see `cleanup_bucket`.

use std::time::{Duration, SystemTime};

use aws_sdk_s3::types::{
    DefaultRetention, ObjectLockConfiguration, ObjectLockEnabled, ObjectLockLegalHold,
    ObjectLockLegalHoldStatus, ObjectLockRetention, ObjectLockRetentionMode, ObjectLockRule,
};
use aws_smithy_types::DateTime;
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{
    ensure, ensure_error_code, fail, Suite, Test, TestFailure, TestResult, TestScope,
};

const GOVERNANCE_WINDOW: Duration = Duration::from_secs(60);

const COMPLIANCE_WINDOW: Duration = Duration::from_secs(15);

pub(crate) fn suite() -> Suite {
    Suite::new(
        "object-lock",
        vec![
            Test::new("testObjectLockConfig", object_lock_config),
            Test::new("testLockingLegalhold", locking_legalhold),
            Test::new("testPutGetRetentionGovernance", put_get_retention_governance),
            Test::new("testRetentionCompliance", retention_compliance),
            Test::new("testLockingRetentionGovernance", locking_retention_governance),
        ],
    )
}

fn retain_until(window: Duration) -> DateTime {
    DateTime::from(SystemTime::now() + window)
}

fn retention(mode: ObjectLockRetentionMode, window: Duration) -> ObjectLockRetention {
    ObjectLockRetention::builder()
        .mode(mode)
        .retain_until_date(retain_until(window))
        .build()
}

async fn put_locked_object(
    ctx: &SuiteContext,
    bucket: &str,
    key: &str,
) -> Result<String, TestFailure> {
    let put = ctx.put_object(bucket, key, Bytes::from_static(b"locked content")).await?;
    put.version_id()
        .map(str::to_string)
        .ok_or_else(|| TestFailure::new("PutObject in a lock bucket returned no VersionId"))
}

fn object_lock_config<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("lock-test-");
        scope.arg("bucketName", bucket.as_str());

        ctx.create_bucket_with_object_lock(&bucket).await?;
        let result: TestResult = async {
            let config = ctx
                .client()
                .get_object_lock_configuration()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("GetObjectLockConfiguration failed"))?;
            ensure(
                config
                    .object_lock_configuration()
                    .and_then(|c| c.object_lock_enabled())
                    == Some(&ObjectLockEnabled::Enabled),
                "object lock expected to be enabled on the bucket",
            )?;

            // A default governance rule round-trips.
            ctx.client()
                .put_object_lock_configuration()
                .bucket(&bucket)
                .object_lock_configuration(
                    ObjectLockConfiguration::builder()
                        .object_lock_enabled(ObjectLockEnabled::Enabled)
                        .rule(
                            ObjectLockRule::builder()
                                .default_retention(
                                    DefaultRetention::builder()
                                        .mode(ObjectLockRetentionMode::Governance)
                                        .days(1)
                                        .build(),
                                )
                                .build(),
                        )
                        .build(),
                )
                .send()
                .await
                .map_err(fail("PutObjectLockConfiguration failed"))?;

            let updated = ctx
                .client()
                .get_object_lock_configuration()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("GetObjectLockConfiguration after update failed"))?;
            let default = updated
                .object_lock_configuration()
                .and_then(|c| c.rule())
                .and_then(|r| r.default_retention())
                .ok_or_else(|| TestFailure::new("default retention rule did not round-trip"))?;
            ensure(
                default.mode() == Some(&ObjectLockRetentionMode::Governance),
                "default retention rule carries an unexpected mode",
            )?;
            ensure(
                default.days() == Some(1),
                "default retention rule carries an unexpected duration",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn locking_legalhold<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("lock-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket_with_object_lock(&bucket).await?;
        let result: TestResult = async {
            let version_id = put_locked_object(ctx, &bucket, &object).await?;

            ctx.client()
                .put_object_legal_hold()
                .bucket(&bucket)
                .key(&object)
                .legal_hold(
                    ObjectLockLegalHold::builder()
                        .status(ObjectLockLegalHoldStatus::On)
                        .build(),
                )
                .send()
                .await
                .map_err(fail("PutObjectLegalHold (On) failed"))?;

            let held = ctx
                .client()
                .get_object_legal_hold()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("GetObjectLegalHold failed"))?;
            ensure(
                held.legal_hold().and_then(|h| h.status())
                    == Some(&ObjectLockLegalHoldStatus::On),
                "legal hold expected to be On",
            )?;

            let blocked = ctx
                .client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await;
            ensure(
                blocked.is_err(),
                "version delete expected to fail while legal hold is On",
            )?;

            ctx.client()
                .put_object_legal_hold()
                .bucket(&bucket)
                .key(&object)
                .legal_hold(
                    ObjectLockLegalHold::builder()
                        .status(ObjectLockLegalHoldStatus::Off)
                        .build(),
                )
                .send()
                .await
                .map_err(fail("PutObjectLegalHold (Off) failed"))?;

            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await
                .map_err(fail("version delete failed after legal hold release"))?;
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn put_get_retention_governance<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("lock-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("retentionSeconds", GOVERNANCE_WINDOW.as_secs());

        ctx.create_bucket_with_object_lock(&bucket).await?;
        let result: TestResult = async {
            let version_id = put_locked_object(ctx, &bucket, &object).await?;

            let now = DateTime::from(SystemTime::now());
            ctx.client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(retention(ObjectLockRetentionMode::Governance, GOVERNANCE_WINDOW))
                .send()
                .await
                .map_err(fail("PutObjectRetention (governance) failed"))?;

            let stored = ctx
                .client()
                .get_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await
                .map_err(fail("GetObjectRetention failed"))?;
            let stored = stored
                .retention()
                .ok_or_else(|| TestFailure::new("GetObjectRetention returned no retention"))?;
            ensure(
                stored.mode() == Some(&ObjectLockRetentionMode::Governance),
                "stored retention carries an unexpected mode",
            )?;
            ensure(
                stored.retain_until_date().is_some_and(|d| d.secs() > now.secs()),
                "stored retain-until date is not in the future",
            )?;

            let blocked = ctx
                .client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await;
            ensure_error_code(
                &blocked,
                "AccessDenied",
                "version delete under governance retention expected AccessDenied",
            )?;

            ctx.client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .bypass_governance_retention(true)
                .send()
                .await
                .map_err(fail("version delete with governance bypass failed"))?;
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn retention_compliance<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("lock-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("retentionSeconds", COMPLIANCE_WINDOW.as_secs());

        ctx.create_bucket_with_object_lock(&bucket).await?;
        let result: TestResult = async {
            let version_id = put_locked_object(ctx, &bucket, &object).await?;

            ctx.client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(retention(ObjectLockRetentionMode::Compliance, COMPLIANCE_WINDOW))
                .send()
                .await
                .map_err(fail("PutObjectRetention (compliance) failed"))?;

            let stored = ctx
                .client()
                .get_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await
                .map_err(fail("GetObjectRetention failed"))?;
            ensure(
                stored.retention().and_then(|r| r.mode())
                    == Some(&ObjectLockRetentionMode::Compliance),
                "stored retention carries an unexpected mode",
            )?;

            // Compliance protection admits no bypass.
            let blocked = ctx
                .client()
                .delete_object()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .bypass_governance_retention(true)
                .send()
                .await;
            ensure(
                blocked.is_err(),
                "version delete under compliance retention expected to fail even with bypass",
            )
        }
        .await;
        // Succeeds once the compliance window lapses.
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn locking_retention_governance<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("lock-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket_with_object_lock(&bucket).await?;
        let result: TestResult = async {
            let version_id = put_locked_object(ctx, &bucket, &object).await?;

            ctx.client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(retention(ObjectLockRetentionMode::Governance, GOVERNANCE_WINDOW))
                .send()
                .await
                .map_err(fail("PutObjectRetention failed"))?;

            // Shortening the window without bypass is refused.
            let shortened = ctx
                .client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(retention(
                    ObjectLockRetentionMode::Governance,
                    Duration::from_secs(10),
                ))
                .send()
                .await;
            ensure(
                shortened.is_err(),
                "shortening governance retention without bypass expected to fail",
            )?;

            // Extending is always allowed.
            let extended_until = GOVERNANCE_WINDOW * 2;
            ctx.client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(retention(ObjectLockRetentionMode::Governance, extended_until))
                .send()
                .await
                .map_err(fail("extending governance retention failed"))?;

            let stored = ctx
                .client()
                .get_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .send()
                .await
                .map_err(fail("GetObjectRetention failed"))?;
            let floor = DateTime::from(SystemTime::now() + GOVERNANCE_WINDOW);
            ensure(
                stored
                    .retention()
                    .and_then(|r| r.retain_until_date())
                    .is_some_and(|d| d.secs() > floor.secs()),
                "retain-until date did not move out after the extension",
            )?;

            // Clearing retention without bypass is refused too.
            let cleared = ctx
                .client()
                .put_object_retention()
                .bucket(&bucket)
                .key(&object)
                .version_id(&version_id)
                .retention(ObjectLockRetention::builder().build())
                .send()
                .await;
            ensure(
                cleared.is_err(),
                "clearing governance retention without bypass expected to fail",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
