//! src/services/storage_service.rs
//!
//! StorageService is the state handed to every HTTP handler. It owns the
//! object store and the resumable session table and exposes the bucket and
//! object read operations; the upload flows live in `services::uploads`.

use crate::{
    models::{bucket::Bucket, object::Object},
    services::{
        object_store::{ObjectStore, StoreError, StoreResult},
        session_manager::SessionManager,
    },
};
use tracing::info;

#[derive(Clone)]
pub struct StorageService {
    pub store: ObjectStore,
    pub sessions: SessionManager,

    /// Externally reachable base URL, used to build resumable upload URLs.
    pub base_url: String,
}

impl StorageService {
    pub fn new(store: ObjectStore, sessions: SessionManager, base_url: impl Into<String>) -> Self {
        Self {
            store,
            sessions,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL clients send resumable chunks to for `upload_id`.
    pub fn resumable_url(&self, upload_id: &str) -> String {
        format!("{}/upload/resumable/{}", self.base_url, upload_id)
    }

    /// Create a bucket. Creating an existing bucket succeeds unchanged.
    pub async fn create_bucket(&self, name: &str) -> Bucket {
        self.store.create_bucket(name).await;
        info!(bucket = %name, "created bucket");
        Bucket::new(name)
    }

    pub async fn get_bucket(&self, name: &str) -> StoreResult<Bucket> {
        if self.store.bucket_exists(name).await {
            Ok(Bucket::new(name))
        } else {
            Err(StoreError::BucketNotFound(name.to_string()))
        }
    }

    pub async fn get_object(&self, bucket: &str, name: &str) -> StoreResult<Object> {
        self.store.get_object(bucket, name).await
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> StoreResult<Vec<Object>> {
        self.store.list_objects(bucket, prefix, delimiter).await
    }

    /// Persist a completed upload.
    pub(crate) async fn commit_object(&self, obj: Object) -> StoreResult<Object> {
        let stored = self.store.create_object(obj).await?;
        info!(
            bucket = %stored.bucket_name,
            object = %stored.name,
            size = stored.size(),
            "stored object"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumable_url_ignores_trailing_slash() {
        let service = StorageService::new(
            ObjectStore::new(),
            SessionManager::default(),
            "http://localhost:4443/",
        );
        assert_eq!(
            service.resumable_url("abc"),
            "http://localhost:4443/upload/resumable/abc"
        );
    }

    #[tokio::test]
    async fn get_bucket_requires_existing_bucket() {
        let service = StorageService::new(ObjectStore::new(), SessionManager::default(), "");
        assert_eq!(
            service.get_bucket("b").await.unwrap_err(),
            StoreError::BucketNotFound("b".into())
        );
        service.create_bucket("b").await;
        assert_eq!(service.get_bucket("b").await.unwrap().name, "b");
    }
}
