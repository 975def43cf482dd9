//! Rust SDK for the Polygon.io market-data REST API and realtime feed.
//!
//! The crate is organized by transport surface:
//! - `rest`: HTTP client for reference, stock, forex and crypto endpoints.
//! - `stream`: realtime websocket session shared across the process.
//! - `retry`: retry and timeout utilities used by the stream dialer.

/// REST client, query options and response records.
pub mod rest;
/// Retry and timeout helpers.
pub mod retry;
/// Realtime stream transport, protocol types, and the shared session.
pub mod stream;

pub use rest::{RestClient, RestClientOptions, RestError};
pub use stream::client::StreamError;
pub use stream::session::{get_stream, Stream, StreamOptions, StreamRegistry};
