//! HTTP handlers for bucket and object reads, and bucket creation.

use crate::{
    errors::AppError,
    models::{
        bucket::{Bucket, CreateBucketRequest},
        object::{ListObjectsResponse, Object, ObjectResponse},
    },
    services::storage_service::StorageService,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;

/// Query params accepted by the list-objects endpoint.
#[derive(Debug, Deserialize)]
pub struct ListObjectsQuery {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
}

/// `POST /storage/v1/b` — create bucket.
pub async fn create_bucket(
    State(service): State<StorageService>,
    Json(payload): Json<CreateBucketRequest>,
) -> Result<Json<Bucket>, AppError> {
    if payload.name.is_empty() {
        return Err(AppError::bad_request("bucket name is required"));
    }
    Ok(Json(service.create_bucket(&payload.name).await))
}

/// `GET /storage/v1/b/{bucket}`
pub async fn get_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Json<Bucket>, AppError> {
    Ok(Json(service.get_bucket(&bucket).await?))
}

/// `GET /storage/v1/b/{bucket}/o` — list objects, supports ?prefix=&delimiter=
pub async fn list_objects(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    Query(q): Query<ListObjectsQuery>,
) -> Result<Json<ListObjectsResponse>, AppError> {
    let objects = service
        .list_objects(
            &bucket,
            q.prefix.as_deref().unwrap_or(""),
            q.delimiter.as_deref().unwrap_or(""),
        )
        .await?;
    Ok(Json(ListObjectsResponse::new(&objects)))
}

/// `GET /storage/v1/b/{bucket}/o/{*object}` — object resource without content.
pub async fn get_object(
    State(service): State<StorageService>,
    Path((bucket, object)): Path<(String, String)>,
) -> Result<Json<ObjectResponse>, AppError> {
    let obj = service.get_object(&bucket, &object).await?;
    Ok(Json(ObjectResponse::from(&obj)))
}

/// Raw object content, served for `GET /download/storage/v1/b/{bucket}/o/{*object}`
/// and `GET /{bucket}/{*object}`.
pub async fn download_object(
    State(service): State<StorageService>,
    Path((bucket, object)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let obj = service.get_object(&bucket, &object).await?;

    let mut response = Response::new(Body::from(obj.content.clone()));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &obj);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &Object) {
    let content_type = if meta.content_type.is_empty() {
        "application/octet-stream"
    } else {
        meta.content_type.as_str()
    };
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    if !meta.content_encoding.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&meta.content_encoding) {
            headers.insert(header::CONTENT_ENCODING, value);
        }
    }

    let hash = format!("crc32c={},md5={}", meta.crc32c, meta.md5_hash);
    if let Ok(value) = HeaderValue::from_str(&hash) {
        headers.insert(HeaderName::from_static("x-goog-hash"), value);
    }

    let etag = format!("\"{}\"", meta.md5_hash);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
}
