/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Multipart upload lifecycle tests.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::context::SuiteContext;
use crate::runner::{
    ensure, ensure_error_code, fail, Suite, Test, TestFailure, TestResult, TestScope,
};
use crate::MEBIBYTE;

/// Part size for the full-mode upload; at least the 5 MiB S3 minimum.
const PART_SIZE: u64 = 8 * MEBIBYTE;

pub(crate) fn suite() -> Suite {
    Suite::new(
        "multipart",
        vec![
            Test::full_mode("testMultipartUpload", multipart_upload),
            Test::new("testListMultipartUploads", list_multipart_uploads),
            Test::new("testAbortMultipartUpload", abort_multipart_upload),
        ],
    )
}

fn multipart_upload<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("multipart-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());
        scope.arg("fileName", "datafile-65-MB");

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let data = ctx.data().bytes("datafile-65-MB").await.map_err(fail("loading payload"))?;

            let created = ctx
                .client()
                .create_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("CreateMultipartUpload failed"))?;
            let upload_id = created
                .upload_id()
                .ok_or_else(|| TestFailure::new("CreateMultipartUpload returned no upload ID"))?
                .to_string();

            let mut uploaded_etags = Vec::new();
            let mut offset = 0usize;
            let mut part_number = 1i32;
            while offset < data.len() {
                let end = (offset + PART_SIZE as usize).min(data.len());
                let part = ctx
                    .client()
                    .upload_part()
                    .bucket(&bucket)
                    .key(&object)
                    .upload_id(&upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(data.slice(offset..end)))
                    .send()
                    .await
                    .map_err(fail("UploadPart failed"))?;
                let etag = part
                    .e_tag()
                    .ok_or_else(|| TestFailure::new("UploadPart returned no ETag"))?
                    .to_string();
                uploaded_etags.push(etag);
                offset = end;
                part_number += 1;
            }

            let listed = ctx
                .client()
                .list_parts()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(fail("ListParts failed"))?;
            ensure(
                listed.parts().len() == uploaded_etags.len(),
                "ListParts count differs from uploaded parts",
            )?;
            let mut completed = Vec::new();
            for (i, part) in listed.parts().iter().enumerate() {
                ensure(
                    part.e_tag() == Some(uploaded_etags[i].as_str()),
                    "ListParts ETag differs from the uploaded part",
                )?;
                completed.push(
                    CompletedPart::builder()
                        .set_e_tag(part.e_tag().map(str::to_string))
                        .set_part_number(part.part_number())
                        .build(),
                );
            }

            ctx.client()
                .complete_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder().set_parts(Some(completed)).build(),
                )
                .send()
                .await
                .map_err(fail("CompleteMultipartUpload failed"))?;

            let returned = ctx.get_object_bytes(&bucket, &object).await?;
            ensure(
                returned == data,
                "multipart object content differs from the uploaded parts",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn list_multipart_uploads<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("multipart-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let created = ctx
                .client()
                .create_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("CreateMultipartUpload failed"))?;
            let upload_id = created
                .upload_id()
                .ok_or_else(|| TestFailure::new("CreateMultipartUpload returned no upload ID"))?
                .to_string();

            let in_progress = ctx
                .client()
                .list_multipart_uploads()
                .bucket(&bucket)
                .send()
                .await
                .map_err(fail("ListMultipartUploads failed"))?;
            ensure(
                in_progress
                    .uploads()
                    .iter()
                    .any(|u| u.key() == Some(object.as_str()) && u.upload_id() == Some(&upload_id)),
                "ListMultipartUploads missing the in-progress upload",
            )?;

            let mut uploaded_etags = Vec::new();
            for part_number in 1..=5 {
                let part = ctx
                    .client()
                    .upload_part()
                    .bucket(&bucket)
                    .key(&object)
                    .upload_id(&upload_id)
                    .part_number(part_number)
                    .body(ByteStream::from(Bytes::from_static(b"fileToUpload")))
                    .send()
                    .await
                    .map_err(fail("UploadPart failed"))?;
                uploaded_etags.push(part.e_tag().unwrap_or_default().to_string());
            }

            let listed = ctx
                .client()
                .list_parts()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(fail("ListParts failed"))?;
            ensure(listed.parts().len() == 5, "ListParts count differs from uploaded parts")?;
            for (i, part) in listed.parts().iter().enumerate() {
                ensure(
                    part.e_tag() == Some(uploaded_etags[i].as_str()),
                    "ListParts ETag differs from the uploaded part",
                )?;
            }

            // Every part is below the 5 MiB minimum, so completion must fail.
            let completed: Vec<CompletedPart> = listed
                .parts()
                .iter()
                .map(|part| {
                    CompletedPart::builder()
                        .set_e_tag(part.e_tag().map(str::to_string))
                        .set_part_number(part.part_number())
                        .build()
                })
                .collect();
            let complete = ctx
                .client()
                .complete_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder().set_parts(Some(completed)).build(),
                )
                .send()
                .await;
            ensure_error_code(
                &complete,
                "EntityTooSmall",
                "CompleteMultipartUpload with undersized parts expected EntityTooSmall",
            )?;

            let negative_max = ctx
                .client()
                .list_parts()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .max_parts(-1)
                .send()
                .await;
            ensure(negative_max.is_err(), "ListParts with MaxParts < 0 expected to fail")?;

            let negative_marker = ctx
                .client()
                .list_parts()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .part_number_marker("-1")
                .send()
                .await;
            ensure(
                negative_marker.is_err(),
                "ListParts with PartNumberMarker < 0 expected to fail",
            )?;

            ctx.client()
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(fail("AbortMultipartUpload failed"))?;
            Ok(())
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}

fn abort_multipart_upload<'a>(
    ctx: &'a SuiteContext,
    scope: &'a mut TestScope,
) -> BoxFuture<'a, TestResult> {
    Box::pin(async move {
        let bucket = ctx.random_bucket_name("multipart-test-");
        let object = ctx.random_key();
        scope.arg("bucketName", bucket.as_str());
        scope.arg("objectName", object.as_str());

        ctx.create_bucket(&bucket).await?;
        let result: TestResult = async {
            let created = ctx
                .client()
                .create_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .send()
                .await
                .map_err(fail("CreateMultipartUpload failed"))?;
            let upload_id = created
                .upload_id()
                .ok_or_else(|| TestFailure::new("CreateMultipartUpload returned no upload ID"))?
                .to_string();

            ctx.client()
                .upload_part()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .part_number(1)
                .body(ByteStream::from(Bytes::from_static(b"fileToUpload")))
                .send()
                .await
                .map_err(fail("UploadPart failed"))?;

            ctx.client()
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(fail("AbortMultipartUpload failed"))?;

            let listed = ctx
                .client()
                .list_parts()
                .bucket(&bucket)
                .key(&object)
                .upload_id(&upload_id)
                .send()
                .await;
            ensure_error_code(
                &listed,
                "NoSuchUpload",
                "ListParts after abort expected NoSuchUpload",
            )
        }
        .await;
        ctx.cleanup_bucket(&bucket).await;
        result
    })
}
