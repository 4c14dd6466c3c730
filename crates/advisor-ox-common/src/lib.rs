#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Shared HTTP plumbing for the advisory chat client
//!
//! Request building, error-body parsing and server-sent event decoding live here so the
//! client crate only deals with chat semantics.

pub mod error;
pub mod request_builder;
pub mod streaming;

pub use error::CommonRequestError;
pub use request_builder::{ByteStream, Endpoint, RequestBuilder, RequestConfig};
pub use streaming::{EventBuffer, SseFrame, SseParser};
