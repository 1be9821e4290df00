//! Authenticated HTTP client for the Starlink Enterprise API
//!
//! This crate owns everything below the tool layer: credential handling, the
//! bearer-token cache with transparent refresh, the authenticated request
//! executor, and thin typed wrappers for each Enterprise API endpoint
//! (including the concurrent account-overview aggregation).

pub mod api;
pub mod auth;
pub mod client;
pub mod error;

// Re-export commonly used types
pub use auth::{Credentials, TokenCache, CLIENT_ID_ENV, CLIENT_SECRET_ENV};
pub use client::{StarlinkClient, DEFAULT_API_BASE};
pub use error::{ClientError, ClientResult};
