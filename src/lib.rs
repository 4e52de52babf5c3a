//! Client SDK for the share-work web service.
//!
//! The crate is organized by transport surface:
//! - `urls`: service URL and endpoint definitions.
//! - `ajax`: HTTP GET helper for the `/ajax` endpoint.
//! - `ws`: reconnecting websocket wrappers for the echo chat and files
//!   transfer endpoints.
//! - `retry`: bounded retry utilities shared by the HTTP surface.

/// AJAX client and error types.
pub mod ajax;
/// Retry helpers used by the HTTP surface.
pub mod retry;
/// Service URL definitions.
pub mod urls;
/// Websocket wrappers, connection engine, and wire envelope.
pub mod ws;
