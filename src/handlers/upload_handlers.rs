//! HTTP handlers for object uploads. They only translate between axum
//! extractors and `StorageService`'s upload flows.

use crate::{
    errors::AppError,
    models::object::ObjectResponse,
    services::{
        storage_service::StorageService,
        uploads::{UploadOutcome, UploadRequest},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

impl IntoResponse for UploadOutcome {
    fn into_response(self) -> Response {
        (
            self.status,
            self.headers,
            Json(ObjectResponse::from(&self.object)),
        )
            .into_response()
    }
}

/// `POST /upload/storage/v1/b/{bucket}/o` (and the non-upload alias).
pub async fn insert_object(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Body,
) -> Result<UploadOutcome, AppError> {
    let req = UploadRequest {
        method,
        query,
        headers,
        object_path: None,
        body,
    };
    Ok(service.insert_object(&bucket, req).await?)
}

/// `PUT|POST /{bucket}/{*object}` — signed-URL uploads address the object by path.
pub async fn insert_object_at_path(
    State(service): State<StorageService>,
    Path((bucket, object)): Path<(String, String)>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Body,
) -> Result<UploadOutcome, AppError> {
    let req = UploadRequest {
        method,
        query,
        headers,
        object_path: Some(object),
        body,
    };
    Ok(service.insert_object(&bucket, req).await?)
}

/// `PUT /upload/resumable/{upload_id}` — one chunk of a resumable upload.
pub async fn upload_file_content(
    State(service): State<StorageService>,
    Path(upload_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<UploadOutcome, AppError> {
    Ok(service.upload_file_content(&upload_id, &headers, body).await?)
}
