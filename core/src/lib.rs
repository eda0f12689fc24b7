//! Core components for token-authenticated object storage sessions.
//!
//! This crate provides the foundational types shared by the reqstore ecosystem.
//!
//! ## Overview
//!
//! - **Context**: A container that holds implementations for HTTP sending and environment access
//! - **Error**: The typed error taxonomy every reqstore crate returns
//!
//! Service crates (for example `reqstore-swift`) build their sessions on top of
//! [`Context`], so the transport can be swapped for a real client or an
//! in-memory double without touching session logic.
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use reqstore_core::{Context, HttpSend, Result};
//!
//! #[derive(Debug)]
//! struct AlwaysOk;
//!
//! #[async_trait]
//! impl HttpSend for AlwaysOk {
//!     async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
//!         Ok(http::Response::new(Bytes::new()))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::new().with_http_send(AlwaysOk);
//! let req = http::Request::get("https://example.com").body(Bytes::new())?;
//! let resp = ctx.http_send(req).await?;
//! assert!(resp.status().is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Hashing utilities used by temp URL signing and basic auth
//! - [`time`]: Time utilities for token expiry
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::Env;
pub use context::HttpSend;
pub use context::NoopEnv;
pub use context::NoopHttpSend;
pub use context::OsEnv;
pub use context::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};
