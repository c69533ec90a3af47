//! src/services/object_store.rs
//!
//! ObjectStore: the in-memory bucket → object list mapping shared by every
//! request. A single reader/writer lock guards the whole map: `get`, `list`
//! and bucket lookups take the shared side, object and bucket creation take
//! the exclusive side. No method calls back into the store while holding the
//! lock.

use crate::models::object::Object;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("object `{name}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, name: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Cheaply cloneable handle to the shared bucket map.
#[derive(Clone, Default)]
pub struct ObjectStore {
    buckets: Arc<RwLock<HashMap<String, Vec<Object>>>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty bucket. Creating an existing bucket is a no-op.
    pub async fn create_bucket(&self, name: &str) {
        let mut buckets = self.buckets.write().await;
        buckets.entry(name.to_string()).or_default();
    }

    pub async fn bucket_exists(&self, name: &str) -> bool {
        self.buckets.read().await.contains_key(name)
    }

    /// Store `obj`, replacing any object with the same `(bucket, name)`.
    ///
    /// The bucket entry is created on demand. Lookup and write happen under
    /// one exclusive lock so concurrent creates of the same identity never
    /// produce duplicates.
    pub async fn create_object(&self, obj: Object) -> StoreResult<Object> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets.entry(obj.bucket_name.clone()).or_default();
        match objects.iter().position(|o| o.name == obj.name) {
            Some(index) => {
                debug!(bucket = %obj.bucket_name, object = %obj.name, "replacing object");
                objects[index] = obj.clone();
            }
            None => objects.push(obj.clone()),
        }
        Ok(obj)
    }

    /// Fetch a copy of the object `name` in `bucket`.
    pub async fn get_object(&self, bucket: &str, name: &str) -> StoreResult<Object> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.iter().find(|o| o.name == name))
            .cloned()
            .ok_or_else(|| StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }

    /// List the objects of `bucket` sorted by name.
    ///
    /// Only names starting with `prefix` are kept. With a non-empty
    /// `delimiter`, names whose remainder after the prefix still contains the
    /// delimiter are nested one level deeper and are left out.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> StoreResult<Vec<Object>> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

        let mut listed: Vec<Object> = objects
            .iter()
            .filter(|o| match o.name.strip_prefix(prefix) {
                Some(rest) => delimiter.is_empty() || !rest.contains(delimiter),
                None => false,
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Ok(listed)
    }

    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn object(bucket: &str, name: &str, content: &'static [u8]) -> Object {
        Object {
            bucket_name: bucket.into(),
            name: name.into(),
            content: Bytes::from_static(content),
            ..Default::default()
        }
    }

    fn names(objects: &[Object]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[tokio::test]
    async fn create_is_an_upsert() {
        let store = ObjectStore::new();
        store.create_object(object("b", "file", b"one")).await.unwrap();
        store.create_object(object("b", "file", b"two")).await.unwrap();

        let all = store.list_objects("b", "", "").await.unwrap();
        assert_eq!(all.len(), 1);
        let stored = store.get_object("b", "file").await.unwrap();
        assert_eq!(stored.content, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn create_object_implicitly_creates_bucket() {
        let store = ObjectStore::new();
        assert!(!store.bucket_exists("fresh").await);
        store.create_object(object("fresh", "x", b"")).await.unwrap();
        assert!(store.bucket_exists("fresh").await);
    }

    #[tokio::test]
    async fn create_bucket_is_idempotent() {
        let store = ObjectStore::new();
        store.create_bucket("b").await;
        store.create_object(object("b", "keep", b"data")).await.unwrap();
        store.create_bucket("b").await;
        assert_eq!(store.bucket_count().await, 1);
        assert!(store.get_object("b", "keep").await.is_ok());
    }

    #[tokio::test]
    async fn get_reports_missing_bucket_and_object() {
        let store = ObjectStore::new();
        store.create_bucket("b").await;
        let err = store.get_object("nope", "x").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::ObjectNotFound {
                bucket: "nope".into(),
                name: "x".into()
            }
        );
        assert!(store.get_object("b", "x").await.is_err());
    }

    #[tokio::test]
    async fn list_missing_bucket_is_not_found() {
        let store = ObjectStore::new();
        let err = store.list_objects("nope", "", "").await.unwrap_err();
        assert_eq!(err, StoreError::BucketNotFound("nope".into()));
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_delimiter() {
        let store = ObjectStore::new();
        for name in ["d", "a/c", "a/b"] {
            store.create_object(object("b", name, b"")).await.unwrap();
        }

        let leaves = store.list_objects("b", "a/", "/").await.unwrap();
        assert_eq!(names(&leaves), vec!["a/b", "a/c"]);

        let flat = store.list_objects("b", "a/", "").await.unwrap();
        assert_eq!(names(&flat), vec!["a/b", "a/c"]);

        let top = store.list_objects("b", "", "/").await.unwrap();
        assert_eq!(names(&top), vec!["d"]);

        let everything = store.list_objects("b", "", "").await.unwrap();
        assert_eq!(names(&everything), vec!["a/b", "a/c", "d"]);
    }

    #[tokio::test]
    async fn list_keeps_leaves_under_prefix() {
        let store = ObjectStore::new();
        for name in ["img/1.png", "img/2.png", "img/raw/3.png", "imgs"] {
            store.create_object(object("b", name, b"")).await.unwrap();
        }
        let listed = store.list_objects("b", "img/", "/").await.unwrap();
        assert_eq!(names(&listed), vec!["img/1.png", "img/2.png"]);
    }

    #[tokio::test]
    async fn concurrent_creates_of_same_identity_do_not_duplicate() {
        let store = ObjectStore::new();
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.create_object(object("b", "same", b"x")).await.unwrap();
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }
        assert_eq!(store.list_objects("b", "", "").await.unwrap().len(), 1);
    }
}
