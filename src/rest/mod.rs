//! REST API client.
//!
//! - `client`: HTTP transport, URL construction, and error mapping.
//! - `options`: query option structs and path enums.
//! - `models`: response records.
//! - `reference`, `stocks`, `forex`, `crypto`: endpoint methods on
//!   [`RestClient`].

/// HTTP transport and error type.
pub mod client;
/// Response records.
pub mod models;
/// Query options and path parameters.
pub mod options;

mod crypto;
mod forex;
mod reference;
mod stocks;

pub use client::{decode, RestClient, RestClientOptions, RestError, REST_BASE_URL};
