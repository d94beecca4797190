//! Warden - rate-limited static file server
//!
//! Core library: HTTP framing, admission control, access counting, path
//! resolution and the connection dispatcher, plus a small client.

pub mod client;
pub mod config;
pub mod files;
pub mod http;
pub mod limits;
pub mod server;
