//! Websocket wrappers for the share-work realtime endpoints.
//!
//! - `client`: shared connection engine with fixed-delay reconnect.
//! - `proto`: the `{type, key, message, value}` JSON envelope.
//! - `echo`: chat wrapper pushing messages on a fixed interval.
//! - `files`: transfer wrapper pairing each request with its reply.

/// Connection engine and lifecycle status.
pub mod client;
/// Echo chat wrapper.
pub mod echo;
/// Files transfer wrapper.
pub mod files;
/// Wire envelope and message vocabulary.
pub mod proto;
