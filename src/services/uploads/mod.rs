//! Object upload flows.
//!
//! Every upload entry point funnels through [`StorageService::insert_object`],
//! which picks one [`UploadStrategy`] per request and runs it. Each strategy
//! either yields the stored (or, for resumable uploads, the pending) object
//! or fails with an [`UploadError`].

pub mod direct;
pub mod multipart;
pub mod resumable;

use crate::{
    models::object::Object,
    services::{
        checksum::{encoded_crc32c, encoded_md5},
        object_store::StoreError,
        storage_service::StorageService,
    },
};
use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{AsHeaderName, IntoHeaderName},
    },
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub const UPLOAD_PROTOCOL_HEADER: &str = "x-goog-upload-protocol";
pub const UPLOAD_COMMAND_HEADER: &str = "x-goog-upload-command";
pub const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
pub const UPLOAD_STATUS_HEADER: &str = "x-goog-upload-status";
pub const NO_308_HEADER: &str = "x-guploader-no-308";
pub const STATUS_OVERRIDE_HEADER: &str = "x-http-status-code-override";

/// Query parameter whose presence marks a signed-URL request.
const SIGNED_URL_MARKER: &str = "X-Goog-Algorithm";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Precondition failed")]
    PreconditionFailed,
    #[error("{0}")]
    NotImplemented(String),
    /// Reading the request body failed; carries the underlying message.
    #[error("{0}")]
    Io(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// The parts of an upload request the upload flows look at.
pub struct UploadRequest {
    pub method: Method,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,

    /// Object name taken from the URL path (signed-URL routes only).
    pub object_path: Option<String>,
    pub body: Body,
}

impl UploadRequest {
    /// Non-empty query parameter `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        query_param(&self.query, key)
    }

    /// Non-empty, valid-UTF-8 header `name`.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        header_str(&self.headers, name)
    }
}

/// Status, extra headers and object produced by an upload step.
#[derive(Debug)]
pub struct UploadOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub object: Object,
}

impl UploadOutcome {
    pub fn ok(object: Object) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            object,
        }
    }
}

/// How an incoming upload request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// `uploadType=media`: the body is the object content.
    Simple,
    /// `uploadType=multipart`: JSON metadata part followed by content.
    Multipart,
    /// `uploadType=resumable`: start a resumable session.
    Resumable,
    /// Signed-URL `PUT`: the body is the content, the name comes from the path.
    Signed,
}

impl UploadStrategy {
    pub fn select(
        method: &Method,
        query: &HashMap<String, String>,
        headers: &HeaderMap,
    ) -> UploadResult<Self> {
        let upload_type = query_param(query, "uploadType").or_else(|| {
            header_str(headers, UPLOAD_PROTOCOL_HEADER).filter(|p| *p == "resumable")
        });

        match upload_type {
            Some("media") => Ok(Self::Simple),
            Some("multipart") => Ok(Self::Multipart),
            Some("resumable") => Ok(Self::Resumable),
            _ if query_param(query, SIGNED_URL_MARKER).is_some() => match *method {
                Method::POST => Ok(Self::Resumable),
                Method::PUT => Ok(Self::Signed),
                _ => Err(invalid_upload_type()),
            },
            _ => Err(invalid_upload_type()),
        }
    }
}

fn invalid_upload_type() -> UploadError {
    UploadError::BadRequest("invalid uploadType".into())
}

impl StorageService {
    /// Entry point for every object upload into `bucket`.
    pub async fn insert_object(
        &self,
        bucket: &str,
        req: UploadRequest,
    ) -> UploadResult<UploadOutcome> {
        if !self.store.bucket_exists(bucket).await {
            return Err(UploadError::NotFound(format!("bucket `{bucket}` not found")));
        }

        let strategy = UploadStrategy::select(&req.method, &req.query, &req.headers)?;
        debug!(bucket = %bucket, ?strategy, "dispatching upload");

        match strategy {
            UploadStrategy::Simple => self.simple_upload(bucket, req).await,
            UploadStrategy::Signed => self.signed_upload(bucket, req).await,
            UploadStrategy::Multipart => self.multipart_upload(bucket, req).await,
            UploadStrategy::Resumable => self.initiate_resumable(bucket, req).await,
        }
    }

    /// Evaluate `ifGenerationMatch` / `ifGenerationNotMatch`.
    ///
    /// Only `ifGenerationMatch=0` ("must not exist yet") is understood.
    pub(crate) async fn check_upload_preconditions(
        &self,
        query: &HashMap<String, String>,
        bucket: &str,
        name: &str,
    ) -> UploadResult<()> {
        let if_generation_match = query_param(query, "ifGenerationMatch");

        if if_generation_match == Some("0") {
            if self.store.get_object(bucket, name).await.is_ok() {
                return Err(UploadError::PreconditionFailed);
            }
        } else if if_generation_match.is_some()
            || query_param(query, "ifGenerationNotMatch").is_some()
        {
            return Err(UploadError::NotImplemented(
                "Precondition support not implemented".into(),
            ));
        }

        Ok(())
    }
}

/// Build an object around `content` with both digests filled in.
pub(crate) fn object_with_content(bucket: &str, name: String, content: Bytes) -> Object {
    Object {
        bucket_name: bucket.to_string(),
        name,
        crc32c: encoded_crc32c(&content),
        md5_hash: encoded_md5(&content),
        content,
        ..Default::default()
    }
}

/// Drain a request body into memory.
pub(crate) async fn read_body(body: Body) -> UploadResult<Bytes> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| UploadError::Io(err.to_string()))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

pub(crate) fn query_param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

pub(crate) fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Insert a response header, skipping values that are not valid header text.
pub(crate) fn set_header<K: IntoHeaderName>(headers: &mut HeaderMap, name: K, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::{object_store::ObjectStore, session_manager::SessionManager};
    use axum::http::HeaderName;

    pub const BASE_URL: &str = "http://emulator.test";

    pub async fn service_with_bucket(bucket: &str) -> StorageService {
        let service = StorageService::new(ObjectStore::new(), SessionManager::default(), BASE_URL);
        service.create_bucket(bucket).await;
        service
    }

    pub fn request(
        method: Method,
        query: &[(&str, &str)],
        headers: &[(&'static str, &str)],
        body: impl Into<Body>,
    ) -> UploadRequest {
        let mut header_map = HeaderMap::new();
        for &(name, value) in headers {
            header_map.append(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        UploadRequest {
            method,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: header_map,
            object_path: None,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn select(
        method: Method,
        query: &[(&str, &str)],
        headers: &[(&'static str, &str)],
    ) -> UploadResult<UploadStrategy> {
        let req = request(method, query, headers, Body::empty());
        UploadStrategy::select(&req.method, &req.query, &req.headers)
    }

    #[test]
    fn upload_type_query_selects_strategy() {
        assert_eq!(
            select(Method::POST, &[("uploadType", "media")], &[]).unwrap(),
            UploadStrategy::Simple
        );
        assert_eq!(
            select(Method::POST, &[("uploadType", "multipart")], &[]).unwrap(),
            UploadStrategy::Multipart
        );
        assert_eq!(
            select(Method::POST, &[("uploadType", "resumable")], &[]).unwrap(),
            UploadStrategy::Resumable
        );
    }

    #[test]
    fn protocol_header_selects_resumable() {
        let strategy = select(Method::POST, &[], &[(UPLOAD_PROTOCOL_HEADER, "resumable")]).unwrap();
        assert_eq!(strategy, UploadStrategy::Resumable);
    }

    #[test]
    fn signed_marker_selects_by_method() {
        let signed = [("X-Goog-Algorithm", "GOOG4-RSA-SHA256")];
        assert_eq!(select(Method::POST, &signed, &[]).unwrap(), UploadStrategy::Resumable);
        assert_eq!(select(Method::PUT, &signed, &[]).unwrap(), UploadStrategy::Signed);
        assert!(select(Method::GET, &signed, &[]).is_err());
    }

    #[test]
    fn unknown_upload_type_is_bad_request() {
        for query in [&[][..], &[("uploadType", "chunked")][..]] {
            match select(Method::POST, query, &[]) {
                Err(UploadError::BadRequest(msg)) => assert_eq!(msg, "invalid uploadType"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn missing_bucket_is_not_found() {
        let service = service_with_bucket("present").await;
        let req = request(Method::POST, &[("uploadType", "media"), ("name", "x")], &[], "data");
        let err = service.insert_object("absent", req).await.unwrap_err();
        assert!(matches!(err, UploadError::NotFound(_)));
    }

    #[tokio::test]
    async fn generation_match_zero_rejects_existing_object() {
        let service = service_with_bucket("b").await;
        let query: HashMap<String, String> =
            [("ifGenerationMatch".to_string(), "0".to_string())].into();

        service.check_upload_preconditions(&query, "b", "obj").await.unwrap();

        service
            .commit_object(object_with_content("b", "obj".into(), Bytes::from_static(b"x")))
            .await
            .unwrap();
        let err = service.check_upload_preconditions(&query, "b", "obj").await.unwrap_err();
        assert!(matches!(err, UploadError::PreconditionFailed));
    }

    #[tokio::test]
    async fn other_generation_preconditions_are_not_implemented() {
        let service = service_with_bucket("b").await;
        for (key, value) in [("ifGenerationMatch", "42"), ("ifGenerationNotMatch", "0")] {
            let query: HashMap<String, String> = [(key.to_string(), value.to_string())].into();
            let err = service.check_upload_preconditions(&query, "b", "obj").await.unwrap_err();
            assert!(matches!(err, UploadError::NotImplemented(_)));
        }
        service
            .check_upload_preconditions(&HashMap::new(), "b", "obj")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn read_body_collects_all_bytes() {
        let body = read_body(Body::from("streamed content")).await.unwrap();
        assert_eq!(&body[..], b"streamed content");
    }
}
