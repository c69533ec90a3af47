//! Represents a logical bucket — a top-level container for objects.

use serde::{Deserialize, Serialize};

/// JSON view of a bucket.
///
/// Buckets carry no state of their own in the emulator; the name is the
/// whole identity.
#[derive(Serialize, Clone, Debug)]
pub struct Bucket {
    pub kind: &'static str,
    pub id: String,
    pub name: String,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: "storage#bucket",
            id: name.clone(),
            name,
        }
    }
}

/// Request body for `POST /storage/v1/b`.
#[derive(Deserialize, Debug)]
pub struct CreateBucketRequest {
    pub name: String,
}
