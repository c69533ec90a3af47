//! Core emulator services: the object store, resumable sessions, upload
//! flows and the helpers they share.

pub mod checksum;
pub mod content_range;
pub mod object_store;
pub mod session_manager;
pub mod storage_service;
pub mod uploads;
