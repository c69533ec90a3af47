//! Resumable uploads.
//!
//! A session is opened with `uploadType=resumable`; content then arrives in
//! one or more `PUT`s to the session URL. The `Content-Range` of each chunk
//! tells whether more data is expected. For 2600 bytes sent 1000 at a time,
//! a client that knows the size up front sends
//!
//! ```text
//! bytes 0-999/2600, bytes 1000-1999/2600, bytes 2000-2599/2600
//! ```
//!
//! while a streaming client sends
//!
//! ```text
//! bytes 0-999/*, bytes 1000-1999/*, bytes 2000-2599/*, bytes */2600
//! ```
//!
//! Unfinished chunks are answered with `308` and a `Range` header, or with
//! `200` plus `X-Http-Status-Code-Override: 308` for clients that send
//! `X-Guploader-No-308` because they cannot handle a native 308.

use super::{
    NO_308_HEADER, STATUS_OVERRIDE_HEADER, UPLOAD_COMMAND_HEADER, UPLOAD_STATUS_HEADER,
    UPLOAD_URL_HEADER, UploadError, UploadOutcome, UploadRequest, UploadResult, header_str,
    query_param, read_body, set_header,
};
use crate::{
    models::{
        object::{AclRule, Object},
        upload::UploadMetadata,
    },
    services::{
        content_range::{ContentRange, ContentRangeError},
        storage_service::StorageService,
    },
};
use axum::{
    body::Body,
    http::{HeaderMap, StatusCode, header},
};
use chrono::Utc;
use tracing::{debug, info};

impl StorageService {
    /// Open a resumable session and answer with its upload URL.
    pub(crate) async fn initiate_resumable(
        &self,
        bucket: &str,
        req: UploadRequest,
    ) -> UploadResult<UploadOutcome> {
        let UploadRequest {
            query,
            headers,
            object_path,
            body,
            ..
        } = req;

        let raw = read_body(body).await?;
        let metadata = UploadMetadata::from_slice(&raw)
            .map_err(|err| UploadError::BadRequest(format!("invalid metadata: {err}")))?;

        let name = query_param(&query, "name")
            .map(str::to_string)
            .or_else(|| Some(metadata.name.clone()).filter(|n| !n.is_empty()))
            .or_else(|| object_path.filter(|n| !n.is_empty()))
            .ok_or_else(|| UploadError::BadRequest("name is required".into()))?;

        let partial = Object {
            bucket_name: bucket.to_string(),
            name,
            content_type: metadata.content_type,
            content_encoding: query_param(&query, "contentEncoding")
                .unwrap_or_default()
                .to_string(),
            acl: AclRule::from_predefined(query_param(&query, "predefinedAcl")),
            metadata: metadata.metadata.unwrap_or_default(),
            ..Default::default()
        };

        let session = self.sessions.initiate(partial).await;
        let upload_url = self.resumable_url(&session.upload_id);
        info!(
            upload_id = %session.upload_id,
            bucket = %bucket,
            object = %session.object.name,
            "initiated resumable upload"
        );

        let mut response_headers = HeaderMap::new();
        set_header(&mut response_headers, header::LOCATION, &upload_url);
        if header_str(&headers, UPLOAD_COMMAND_HEADER) == Some("start") {
            set_header(&mut response_headers, UPLOAD_URL_HEADER, &upload_url);
            set_header(&mut response_headers, UPLOAD_STATUS_HEADER, "active");
        }

        Ok(UploadOutcome {
            status: StatusCode::OK,
            headers: response_headers,
            object: session.object,
        })
    }

    /// Append one chunk to the session `upload_id`, committing the object
    /// once the chunk's `Content-Range` says the upload is complete.
    pub async fn upload_file_content(
        &self,
        upload_id: &str,
        headers: &HeaderMap,
        body: Body,
    ) -> UploadResult<UploadOutcome> {
        let not_found = || UploadError::NotFound(format!("upload `{upload_id}` not found"));
        if !self.sessions.contains(upload_id).await {
            return Err(not_found());
        }

        // Parsed before the session is touched, so a bad header leaves it as it was.
        let range = parse_content_range(headers)?;
        if let Some(range) = &range {
            debug!(
                upload_id = %upload_id,
                known_range = range.known_range(),
                known_total = range.known_total(),
                "parsed Content-Range"
            );
        }

        let content_type = header_str(headers, header::CONTENT_TYPE)
            .unwrap_or_default()
            .to_string();
        let chunk = read_body(body).await?;

        let (progress, pending, received) = self
            .sessions
            .update(upload_id, |session| {
                session.append(&chunk);
                session.object.content_type = content_type;
                let progress = range
                    .as_ref()
                    .map(|range| ChunkProgress::evaluate(range, session.received_bytes()));
                let complete = progress.as_ref().is_none_or(|p| p.complete);
                let pending = (!complete).then(|| session.object.clone());
                (progress, pending, session.received_bytes())
            })
            .await
            .ok_or_else(not_found)?;

        debug!(
            upload_id = %upload_id,
            chunk = chunk.len(),
            received,
            commit = pending.is_none(),
            "received resumable chunk"
        );

        let mut response_headers = HeaderMap::new();
        if let Some(progress) = &progress {
            set_header(&mut response_headers, header::RANGE, &progress.range_header);
        }

        let (status, object) = match pending {
            None => {
                let session = self.sessions.remove(upload_id).await.ok_or_else(not_found)?;
                debug!(
                    upload_id = %upload_id,
                    elapsed_ms = (Utc::now() - session.created_at).num_milliseconds(),
                    "resumable upload complete"
                );
                (StatusCode::OK, self.commit_object(session.object).await?)
            }
            Some(object) => {
                let status = if headers.contains_key(NO_308_HEADER) {
                    set_header(&mut response_headers, STATUS_OVERRIDE_HEADER, "308");
                    StatusCode::OK
                } else {
                    StatusCode::PERMANENT_REDIRECT
                };
                (status, object)
            }
        };

        if header_str(headers, UPLOAD_COMMAND_HEADER)
            .is_some_and(|command| command.contains("upload, finalize"))
        {
            set_header(&mut response_headers, UPLOAD_STATUS_HEADER, "final");
        }

        Ok(UploadOutcome {
            status,
            headers: response_headers,
            object,
        })
    }
}

/// The chunk's `Content-Range`, if it sent a non-empty one.
///
/// A header that is present but unreadable is an error, never "absent".
fn parse_content_range(headers: &HeaderMap) -> UploadResult<Option<ContentRange>> {
    let Some(value) = headers.get(header::CONTENT_RANGE) else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }
    let raw = value
        .to_str()
        .map_err(|_| UploadError::BadRequest("invalid Content-Range: not valid header text".into()))?;
    raw.parse()
        .map(Some)
        .map_err(|err: ContentRangeError| UploadError::BadRequest(err.to_string()))
}

/// What a chunk's `Content-Range` says about the upload as a whole.
#[derive(Debug, PartialEq, Eq)]
struct ChunkProgress {
    complete: bool,

    /// Value of the `Range` response header.
    range_header: String,
}

impl ChunkProgress {
    fn evaluate(range: &ContentRange, received: usize) -> Self {
        match range.range {
            Some(bytes) => Self {
                complete: range.total.is_some_and(|total| {
                    bytes.end.checked_add(1).is_none_or(|covered| covered >= total)
                }),
                range_header: format!("bytes=0-{}", bytes.end),
            },
            // `bytes */N`: the stream has ended.
            None => Self {
                complete: true,
                range_header: format!("bytes=0-{received}"),
            },
        }
    }
}
