//! Defines routes for the storage emulator's JSON and upload APIs.
//!
//! ## Structure
//! - **Bucket-level endpoints**
//!   - `POST   /storage/v1/b` — create bucket
//!   - `GET    /storage/v1/b/{bucket}` — bucket resource
//!   - `GET    /storage/v1/b/{bucket}/o` — list objects (prefix, delimiter)
//!
//! - **Object-level endpoints**
//!   - `POST   /upload/storage/v1/b/{bucket}/o` — media / multipart / resumable upload
//!   - `PUT    /upload/resumable/{upload_id}` — resumable chunk
//!   - `GET    /storage/v1/b/{bucket}/o/{*object}` — object resource
//!   - `GET    /download/storage/v1/b/{bucket}/o/{*object}` — object content
//!   - `PUT|POST /{bucket}/{*object}` — signed-URL upload
//!   - `GET    /{bucket}/{*object}` — object content
//!
//! The wildcard `*object` allows nested names like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{create_bucket, download_object, get_bucket, get_object, list_objects},
        upload_handlers::{insert_object, insert_object_at_path, upload_file_content},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build and return the router for the emulator.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Bucket-level routes
        .route("/storage/v1/b", post(create_bucket))
        .route("/storage/v1/b/{bucket}", get(get_bucket))
        .route(
            "/storage/v1/b/{bucket}/o",
            get(list_objects).post(insert_object),
        )
        // Object-level routes
        .route("/storage/v1/b/{bucket}/o/{*object}", get(get_object))
        .route("/upload/storage/v1/b/{bucket}/o", post(insert_object))
        .route("/upload/resumable/{upload_id}", put(upload_file_content))
        .route(
            "/download/storage/v1/b/{bucket}/o/{*object}",
            get(download_object),
        )
        .route(
            "/{bucket}/{*object}",
            get(download_object)
                .put(insert_object_at_path)
                .post(insert_object_at_path),
        )
}
