//! Content-integrity digests attached to every stored object.
//!
//! Both digests are base64 (standard alphabet) encodings of the raw digest
//! bytes: the CRC32C is encoded big-endian, the MD5 as its 16 bytes.

use base64::{Engine as _, engine::general_purpose::STANDARD as Base64};

/// Base64 CRC32C (Castagnoli) of `content`.
pub fn encoded_crc32c(content: &[u8]) -> String {
    encode_crc(crc32c::crc32c(content))
}

/// Base64 MD5 of `content`.
pub fn encoded_md5(content: &[u8]) -> String {
    Base64.encode(md5::compute(content).0)
}

fn encode_crc(crc: u32) -> String {
    Base64.encode(crc.to_be_bytes())
}

/// Running digest state for content that grows chunk by chunk.
///
/// After any sequence of `update` calls, `crc32c()` and `md5_hash()` equal the
/// one-shot functions applied to the concatenation of every chunk.
#[derive(Clone)]
pub struct ContentDigest {
    crc: u32,
    md5: md5::Context,
}

impl ContentDigest {
    pub fn new() -> Self {
        Self {
            crc: 0,
            md5: md5::Context::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.crc = crc32c::crc32c_append(self.crc, chunk);
        self.md5.consume(chunk);
    }

    pub fn crc32c(&self) -> String {
        encode_crc(self.crc)
    }

    pub fn md5_hash(&self) -> String {
        // `compute` consumes the context; finish a copy so updates can continue.
        Base64.encode(self.md5.clone().compute().0)
    }
}

impl Default for ContentDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentDigest")
            .field("crc32c", &self.crc32c())
            .field("md5_hash", &self.md5_hash())
            .finish()
    }
}
