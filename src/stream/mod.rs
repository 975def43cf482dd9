//! Realtime stream modules.
//!
//! - `client`: websocket dial, frame reads, command writes and close
//!   classification.
//! - `proto`: commands, status replies and typed feed records.
//! - `session`: the shared session with auth, subscriptions, the receive
//!   loop and reconnects.

/// Websocket transport primitives and the stream error type.
pub mod client;
/// Stream protocol messages.
pub mod proto;
/// Shared session and its registry.
pub mod session;
