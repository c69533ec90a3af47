//! axum handlers, grouped by the resource they serve.

pub mod health_handlers;
pub mod object_handlers;
pub mod upload_handlers;
