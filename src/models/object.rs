//! Represents an object (blob) stored in a bucket, plus its JSON view.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single access-control entry attached to an object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AclRule {
    /// Grantee, e.g. `allUsers` or `projectOwner`.
    pub entity: String,

    /// Granted role, e.g. `READER` or `OWNER`.
    pub role: String,
}

impl AclRule {
    /// Expand a `predefinedAcl` query value into the ACL stored on the object.
    ///
    /// Only `publicRead` is recognised; every other value (or none) yields the
    /// project-owner default.
    pub fn from_predefined(predefined: Option<&str>) -> Vec<AclRule> {
        match predefined {
            Some("publicRead") => vec![AclRule {
                entity: "allUsers".into(),
                role: "READER".into(),
            }],
            _ => vec![AclRule {
                entity: "projectOwner".into(),
                role: "OWNER".into(),
            }],
        }
    }
}

/// An object held by the in-memory store.
///
/// Identity is `(bucket_name, name)`. The content bytes live alongside the
/// metadata; `Bytes` keeps the copies handed out by the store cheap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    pub bucket_name: String,
    pub name: String,
    pub content: Bytes,
    pub content_type: String,
    pub content_encoding: String,

    /// Base64 of the big-endian CRC32C of `content`.
    pub crc32c: String,

    /// Base64 of the MD5 of `content`.
    pub md5_hash: String,

    pub acl: Vec<AclRule>,
    pub metadata: HashMap<String, String>,
}

impl Object {
    pub fn id(&self) -> String {
        format!("{}/{}", self.bucket_name, self.name)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// JSON representation returned by every endpoint that yields an object.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResponse {
    pub kind: &'static str,
    pub id: String,
    pub bucket_name: String,
    pub name: String,
    pub size: String,
    pub content_type: String,
    pub content_encoding: String,
    pub crc32c: String,
    pub md5_hash: String,
    pub acl: Vec<AclRule>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl From<&Object> for ObjectResponse {
    fn from(obj: &Object) -> Self {
        Self {
            kind: "storage#object",
            id: obj.id(),
            bucket_name: obj.bucket_name.clone(),
            name: obj.name.clone(),
            size: obj.size().to_string(),
            content_type: obj.content_type.clone(),
            content_encoding: obj.content_encoding.clone(),
            crc32c: obj.crc32c.clone(),
            md5_hash: obj.md5_hash.clone(),
            acl: obj.acl.clone(),
            metadata: obj.metadata.clone(),
        }
    }
}

/// JSON body of a list-objects response.
#[derive(Serialize, Debug)]
pub struct ListObjectsResponse {
    pub kind: &'static str,
    pub items: Vec<ObjectResponse>,
}

impl ListObjectsResponse {
    pub fn new(objects: &[Object]) -> Self {
        Self {
            kind: "storage#objects",
            items: objects.iter().map(ObjectResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_public_read_grants_all_users() {
        let acl = AclRule::from_predefined(Some("publicRead"));
        assert_eq!(acl.len(), 1);
        assert_eq!(acl[0].entity, "allUsers");
        assert_eq!(acl[0].role, "READER");
    }

    #[test]
    fn unknown_or_missing_acl_defaults_to_owner() {
        for value in [None, Some(""), Some("private"), Some("publicread")] {
            let acl = AclRule::from_predefined(value);
            assert_eq!(
                acl,
                vec![AclRule {
                    entity: "projectOwner".into(),
                    role: "OWNER".into()
                }]
            );
        }
    }

    #[test]
    fn response_uses_camel_case_and_hides_empty_metadata() {
        let obj = Object {
            bucket_name: "bkt".into(),
            name: "dir/file.txt".into(),
            content: Bytes::from_static(b"hello"),
            content_type: "text/plain".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(ObjectResponse::from(&obj)).unwrap();
        assert_eq!(json["kind"], "storage#object");
        assert_eq!(json["id"], "bkt/dir/file.txt");
        assert_eq!(json["bucketName"], "bkt");
        assert_eq!(json["contentType"], "text/plain");
        assert_eq!(json["size"], "5");
        assert!(json.get("metadata").is_none());
    }
}
