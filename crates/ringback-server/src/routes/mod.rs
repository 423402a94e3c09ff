//! HTTP handlers.
//!
//! Webhook handlers never surface transport-level errors: each one is an
//! inner fallible function wrapped by a boundary that converts any failure
//! into a minimal valid provider document. Only `/call/send` speaks JSON
//! and HTTP status codes.

pub mod call;
pub mod sms;
pub mod voice;

use axum::http::header;
use axum::response::{IntoResponse, Response};

/// A provider action document reply.
pub(crate) fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}
