//! Authenticated sessions for Swift-style token object storage.
//!
//! This crate manages the token lifecycle of an object storage account and
//! dispatches requests with it:
//!
//! - [`Credentials`] are validated before any request is sent
//! - [`Authenticator`] exchanges them for a token at the cluster auth endpoint,
//!   discovering the storage account through [`DiscoverAccount`] if needed
//! - [`Session`] composes paths and headers, refreshes expired tokens and
//!   retries exactly once when the server rejects a token
//! - [`Catalog`] lists and filters collection resources such as tags
//! - [`TempUrlKeyResolver`] and [`TempUrl`] pre-sign urls
//!
//! # Example
//!
//! ```rust,no_run
//! use reqstore_core::{Context, OsEnv, Result};
//! use reqstore_http_send_reqwest::ReqwestHttpSend;
//! use reqstore_swift::{Catalog, Config, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     let config = Config::default().from_env(&ctx);
//!     let session = Session::from_config(ctx, config)?;
//!
//!     let containers = Catalog::containers(session.clone());
//!     for c in containers.list(None).await? {
//!         println!("{} ({} objects)", c.name, c.count);
//!     }
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::{validate_username, Credentials};

mod token;
pub use token::{Endpoint, Token};

mod provide_credential;
pub use provide_credential::*;

mod header;
pub use header::{HeaderOverlay, Layer};

mod request;
pub use request::{RequestSpec, Response};

mod session;
pub use session::Session;

mod catalog;
pub use catalog::{Catalog, CatalogItem, ContainerEntry, Fetch, FilterSet, Tag};

mod temp_url;
pub use temp_url::{TempUrl, TempUrlKeyResolver};

pub mod memory;
