//! ICObench - Core Library
//! Signed, asynchronous client for the ICObench ICO data API

// Public modules
pub mod core;
pub mod signer;
pub mod transport;
pub mod client;

// Re-exports
pub use client::{IcoBenchClient, PendingResponse, normalize};
pub use crate::core::{
    Config, Credentials, Error, IcoBenchApi, Payload, RequestBody, Result, Transport,
    TransportOptions,
};
pub use signer::{HmacSigner, Signer, sign};
pub use transport::HttpTransport;
