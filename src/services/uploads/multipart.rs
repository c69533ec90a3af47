//! `uploadType=multipart`: a `multipart/related` body whose first part is the
//! JSON object metadata and whose following part is the content.

use super::{
    UploadError, UploadOutcome, UploadRequest, UploadResult, header_str, object_with_content,
    query_param, read_body,
};
use crate::{
    models::{
        object::{AclRule, Object},
        upload::UploadMetadata,
    },
    services::storage_service::StorageService,
};
use axum::http::header;
use bytes::{Bytes, BytesMut};
use futures::{future, stream};
use std::convert::Infallible;

impl StorageService {
    pub(crate) async fn multipart_upload(
        &self,
        bucket: &str,
        req: UploadRequest,
    ) -> UploadResult<UploadOutcome> {
        let boundary = multipart_boundary(req.header(header::CONTENT_TYPE))?;
        let UploadRequest { query, body, .. } = req;

        let buffered = fill_empty_part_headers(read_body(body).await?, &boundary);
        let mut parts = multer::Multipart::new(
            stream::once(future::ready(Ok::<_, Infallible>(buffered))),
            boundary,
        );
        let mut metadata: Option<UploadMetadata> = None;
        let mut content = Bytes::new();
        let mut content_type = String::new();

        while let Some(field) = parts.next_field().await.map_err(multipart_error)? {
            if metadata.is_none() {
                let raw = field.bytes().await.map_err(multipart_error)?;
                let meta = UploadMetadata::from_slice(&raw)
                    .map_err(|err| UploadError::BadRequest(format!("invalid metadata: {err}")))?;
                content_type = meta.content_type.clone();
                metadata = Some(meta);
            } else {
                content_type = header_str(field.headers(), header::CONTENT_TYPE)
                    .unwrap_or_default()
                    .to_string();
                content = field.bytes().await.map_err(multipart_error)?;
            }
        }

        let metadata = metadata
            .ok_or_else(|| UploadError::BadRequest("multipart body has no metadata part".into()))?;
        let name = query_param(&query, "name")
            .map(str::to_string)
            .unwrap_or_else(|| metadata.name.clone());
        if name.is_empty() {
            return Err(UploadError::BadRequest("name is required".into()));
        }

        self.check_upload_preconditions(&query, bucket, &name).await?;

        let obj = Object {
            content_type,
            content_encoding: metadata.content_encoding,
            acl: AclRule::from_predefined(query_param(&query, "predefinedAcl")),
            metadata: metadata.metadata.unwrap_or_default(),
            ..object_with_content(bucket, name, content)
        };

        let stored = self.commit_object(obj).await?;
        Ok(UploadOutcome::ok(stored))
    }
}

/// Extract the `boundary` parameter of a multipart Content-Type.
fn multipart_boundary(content_type: Option<&str>) -> UploadResult<String> {
    let invalid = || UploadError::BadRequest("invalid Content-Type header".into());
    let parsed: mime::Mime = content_type
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    parsed
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(invalid)
}

/// Give every part that opens with an empty header block an empty
/// `Content-Type` line. Such parts carry no content type, and the parser
/// needs at least one header line before the blank line.
fn fill_empty_part_headers(body: Bytes, boundary: &str) -> Bytes {
    let bare_part = format!("--{boundary}\r\n\r\n").into_bytes();
    let mut filled = BytesMut::with_capacity(body.len());
    let mut copied = 0;
    let mut pos = 0;

    while pos + bare_part.len() <= body.len() {
        let at_line_start = pos == 0 || body[..pos].ends_with(b"\r\n");
        if at_line_start && body[pos..].starts_with(&bare_part) {
            let headers_at = pos + bare_part.len() - 2;
            filled.extend_from_slice(&body[copied..headers_at]);
            filled.extend_from_slice(b"Content-Type: \r\n");
            copied = headers_at;
            pos += bare_part.len();
        } else {
            pos += 1;
        }
    }

    if copied == 0 {
        return body;
    }
    filled.extend_from_slice(&body[copied..]);
    filled.freeze()
}

fn multipart_error(err: multer::Error) -> UploadError {
    UploadError::BadRequest(err.to_string())
}
