//! Resumable upload sessions.
//!
//! Holds the partially uploaded object of every in-flight resumable upload,
//! keyed by an unguessable upload id. The table has its own lock, separate
//! from the object store, so chunk traffic on one session never blocks reads
//! of committed objects.

use crate::{models::object::Object, services::checksum::ContentDigest};
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle};

const UPLOAD_ID_BYTES: usize = 16;

/// A resumable upload in progress.
#[derive(Clone, Debug)]
pub struct UploadSession {
    pub upload_id: String,

    /// The object being assembled; `content` holds every byte received so far.
    pub object: Object,

    digest: ContentDigest,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UploadSession {
    fn new(upload_id: String, object: Object) -> Self {
        let mut digest = ContentDigest::new();
        digest.update(&object.content);
        let now = Utc::now();
        Self {
            upload_id,
            object,
            digest,
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a chunk and refresh the object's digests so they cover the
    /// whole accumulated content.
    ///
    /// The content buffer is extended in place when no snapshot of it is
    /// still alive; otherwise it is copied once so the snapshot stays intact.
    pub fn append(&mut self, chunk: &[u8]) {
        let mut content = match std::mem::take(&mut self.object.content).try_into_mut() {
            Ok(content) => content,
            Err(shared) => BytesMut::from(&shared[..]),
        };
        content.extend_from_slice(chunk);
        self.object.content = content.freeze();

        self.digest.update(chunk);
        self.object.crc32c = self.digest.crc32c();
        self.object.md5_hash = self.digest.md5_hash();
        self.last_activity = Utc::now();
    }

    pub fn received_bytes(&self) -> usize {
        self.object.content.len()
    }
}

/// Concurrent upload-id → session table.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    sessions: RwLock<HashMap<String, UploadSession>>,

    /// Idle time after which a session is reclaimed (`None` = never).
    ttl: Option<Duration>,
}

impl SessionManager {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner {
                sessions: RwLock::new(HashMap::new()),
                ttl: ttl.filter(|ttl| !ttl.is_zero()),
            }),
        }
    }

    /// Register a new session for `object` under a fresh random upload id.
    pub async fn initiate(&self, object: Object) -> UploadSession {
        let session = UploadSession::new(generate_upload_id(), object);
        let mut sessions = self.inner.sessions.write().await;
        sessions.insert(session.upload_id.clone(), session.clone());
        session
    }

    pub async fn contains(&self, upload_id: &str) -> bool {
        self.inner.sessions.read().await.contains_key(upload_id)
    }

    /// Run `f` on the session `upload_id` in place, under the table lock.
    ///
    /// Returns `None` when no such session exists.
    pub async fn update<R>(
        &self,
        upload_id: &str,
        f: impl FnOnce(&mut UploadSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.sessions.write().await;
        sessions.get_mut(upload_id).map(f)
    }

    pub async fn remove(&self, upload_id: &str) -> Option<UploadSession> {
        self.inner.sessions.write().await.remove(upload_id)
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL as of `now`.
    ///
    /// Returns the number of sessions removed.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.inner.ttl else {
            return 0;
        };

        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|upload_id, session| {
            let expired = (now - session.last_activity)
                .to_std()
                .map(|idle| idle > ttl)
                .unwrap_or(false);
            if expired {
                tracing::debug!(
                    upload_id = %upload_id,
                    bucket = %session.object.bucket_name,
                    object = %session.object.name,
                    "Expired resumable upload session"
                );
            }
            !expired
        });
        let removed = before - sessions.len();

        if removed > 0 {
            tracing::info!(count = removed, "Cleaned up idle resumable upload sessions");
        }
        removed
    }

    /// Spawn the periodic expiry sweep. Returns `None` when expiry is disabled.
    pub fn start_cleanup_task(self, every: Duration) -> Option<JoinHandle<()>> {
        self.inner.ttl?;
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.cleanup_expired(Utc::now()).await;
            }
        }))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(None)
    }
}

/// 16 bytes from the OS CSPRNG, hex-encoded.
fn generate_upload_id() -> String {
    let mut raw = [0u8; UPLOAD_ID_BYTES];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::checksum::{encoded_crc32c, encoded_md5};
    use std::collections::HashSet;

    async fn snapshot(manager: &SessionManager, upload_id: &str) -> Option<UploadSession> {
        manager.update(upload_id, |session| session.clone()).await
    }

    fn partial(name: &str) -> Object {
        Object {
            bucket_name: "bucket".into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn upload_ids_are_32_hex_chars_and_unique() {
        let ids: HashSet<String> = (0..256).map(|_| generate_upload_id()).collect();
        assert_eq!(ids.len(), 256);
        for id in &ids {
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[tokio::test]
    async fn initiate_registers_session() {
        let manager = SessionManager::default();
        let session = manager.initiate(partial("obj")).await;

        assert!(manager.contains(&session.upload_id).await);
        let fetched = snapshot(&manager, &session.upload_id).await.unwrap();
        assert_eq!(fetched.object.name, "obj");
        assert_eq!(fetched.received_bytes(), 0);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn update_appends_in_place() {
        let manager = SessionManager::default();
        let session = manager.initiate(partial("obj")).await;
        for chunk in [&b"hello "[..], &b"world"[..]] {
            let received = manager
                .update(&session.upload_id, |s| {
                    s.append(chunk);
                    s.received_bytes()
                })
                .await;
            assert!(received.is_some());
        }

        let fetched = snapshot(&manager, &session.upload_id).await.unwrap();
        assert_eq!(&fetched.object.content[..], b"hello world");
        assert_eq!(fetched.object.crc32c, encoded_crc32c(b"hello world"));
        assert_eq!(fetched.object.md5_hash, encoded_md5(b"hello world"));
    }

    #[tokio::test]
    async fn update_of_unknown_session_is_none() {
        let manager = SessionManager::default();
        assert!(manager.update("missing", |s| s.append(b"x")).await.is_none());
        assert!(!manager.contains("missing").await);
    }

    #[test]
    fn snapshots_are_unaffected_by_later_appends() {
        let mut session = UploadSession::new("id".into(), partial("obj"));
        session.append(b"abc");
        let earlier = session.object.content.clone();
        session.append(b"def");
        assert_eq!(&earlier[..], b"abc");
        assert_eq!(&session.object.content[..], b"abcdef");
    }

    #[test]
    fn many_small_appends_keep_content_and_digests_exact() {
        let mut session = UploadSession::new("id".into(), partial("obj"));
        let mut expected = Vec::new();
        for i in 0..1000u32 {
            let chunk = i.to_be_bytes();
            session.append(&chunk);
            expected.extend_from_slice(&chunk);
        }
        assert_eq!(session.received_bytes(), 4000);
        assert_eq!(&session.object.content[..], &expected[..]);
        assert_eq!(session.object.crc32c, encoded_crc32c(&expected));
        assert_eq!(session.object.md5_hash, encoded_md5(&expected));
    }

    #[tokio::test]
    async fn remove_returns_and_forgets_session() {
        let manager = SessionManager::default();
        let session = manager.initiate(partial("obj")).await;
        assert!(manager.remove(&session.upload_id).await.is_some());
        assert!(!manager.contains(&session.upload_id).await);
        assert!(manager.remove(&session.upload_id).await.is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_only_idle_sessions() {
        let manager = SessionManager::new(Some(Duration::from_secs(60)));
        let stale = manager.initiate(partial("stale")).await;
        let fresh = manager.initiate(partial("fresh")).await;

        manager
            .update(&stale.upload_id, |s| {
                s.last_activity = Utc::now() - chrono::Duration::seconds(120)
            })
            .await
            .unwrap();

        assert_eq!(manager.cleanup_expired(Utc::now()).await, 1);
        assert!(!manager.contains(&stale.upload_id).await);
        assert!(manager.contains(&fresh.upload_id).await);
    }

    #[tokio::test]
    async fn zero_ttl_disables_expiry() {
        let manager = SessionManager::new(Some(Duration::ZERO));
        manager.initiate(partial("obj")).await;
        let far_future = Utc::now() + chrono::Duration::days(365);
        assert_eq!(manager.cleanup_expired(far_future).await, 0);
        assert!(manager.clone().start_cleanup_task(Duration::from_secs(1)).is_none());
    }
}
