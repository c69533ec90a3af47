//! Single-request uploads whose body is the raw object content: the
//! `uploadType=media` flow and signed-URL `PUT`s.

use super::{
    UploadError, UploadOutcome, UploadRequest, UploadResult, object_with_content, read_body,
};
use crate::{
    models::object::{AclRule, Object},
    services::storage_service::StorageService,
};
use axum::http::{HeaderMap, header};
use std::collections::HashMap;

const META_HEADER_PREFIX: &str = "x-goog-meta-";

impl StorageService {
    pub(crate) async fn simple_upload(
        &self,
        bucket: &str,
        req: UploadRequest,
    ) -> UploadResult<UploadOutcome> {
        let name = req
            .query_param("name")
            .ok_or_else(|| UploadError::BadRequest("name is required for simple uploads".into()))?
            .to_string();
        let content_type = req.header(header::CONTENT_TYPE).unwrap_or_default().to_string();
        let content_encoding = req.query_param("contentEncoding").unwrap_or_default().to_string();
        let acl = AclRule::from_predefined(req.query_param("predefinedAcl"));

        let content = read_body(req.body).await?;
        let obj = Object {
            content_type,
            content_encoding,
            acl,
            ..object_with_content(bucket, name, content)
        };

        let stored = self.commit_object(obj).await?;
        Ok(UploadOutcome::ok(stored))
    }

    pub(crate) async fn signed_upload(
        &self,
        bucket: &str,
        req: UploadRequest,
    ) -> UploadResult<UploadOutcome> {
        let name = req
            .object_path
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| UploadError::BadRequest("object name is required for signed uploads".into()))?;
        let content_type = req.header(header::CONTENT_TYPE).unwrap_or_default().to_string();
        let content_encoding = req
            .query_param("contentEncoding")
            .or_else(|| req.header(header::CONTENT_ENCODING))
            .unwrap_or_default()
            .to_string();
        let acl = AclRule::from_predefined(req.query_param("predefinedAcl"));
        let metadata = metadata_from_headers(&req.headers);

        let content = read_body(req.body).await?;
        let obj = Object {
            content_type,
            content_encoding,
            acl,
            metadata,
            ..object_with_content(bucket, name, content)
        };

        let stored = self.commit_object(obj).await?;
        Ok(UploadOutcome::ok(stored))
    }
}

/// Custom metadata carried as `x-goog-meta-<key>` request headers.
fn metadata_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            let key = name.as_str().strip_prefix(META_HEADER_PREFIX)?;
            let value = headers.get(name)?.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
