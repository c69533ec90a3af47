//! Core data models for the storage emulator.
//!
//! These entities represent buckets, stored objects and the JSON shapes
//! exchanged by the upload endpoints. They serialize as JSON via `serde`.

pub mod bucket;
pub mod object;
pub mod upload;
