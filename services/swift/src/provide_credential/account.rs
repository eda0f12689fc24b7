use crate::constants::DEFAULT_API_ENDPOINT;
use crate::Credentials;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqstore_core::hash::base64_encode;
use reqstore_core::{Context, Error, Result};
use serde::Deserialize;
use std::fmt::Debug;

/// One object storage account as returned by account discovery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AccountRecord {
    /// Account identifier used as the `X-Auth-User` prefix.
    #[serde(default)]
    pub username: Option<String>,
}

impl AccountRecord {
    /// Create a record for the given identifier.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }
}

/// DiscoverAccount looks up the object storage accounts owned by a user.
///
/// Only the first record's identifier is used.
#[async_trait]
pub trait DiscoverAccount: Debug + Send + Sync + 'static {
    /// Return every storage account visible to `cred`.
    async fn discover_accounts(
        &self,
        ctx: &Context,
        cred: &Credentials,
    ) -> Result<Vec<AccountRecord>>;
}

/// Pick the storage account out of a discovery result.
pub(crate) fn first_account(records: &[AccountRecord]) -> Result<String> {
    records
        .first()
        .and_then(|r| r.username.clone())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::account_resolution_failed(format!(
                "account discovery returned no usable account out of {} records",
                records.len()
            ))
        })
}

/// Discovery that returns a fixed list of records.
#[derive(Clone, Debug, Default)]
pub struct StaticAccountDiscovery {
    records: Vec<AccountRecord>,
}

impl StaticAccountDiscovery {
    /// Create a static discovery.
    pub fn new(records: Vec<AccountRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl DiscoverAccount for StaticAccountDiscovery {
    async fn discover_accounts(
        &self,
        _: &Context,
        _: &Credentials,
    ) -> Result<Vec<AccountRecord>> {
        Ok(self.records.clone())
    }
}

/// Discovery through the compute API (`SoftLayer_Account/getHubNetworkStorage`).
///
/// Uses HTTP basic auth with the same username and api key as storage.
#[derive(Clone, Debug)]
pub struct ComputeApiAccountDiscovery {
    endpoint: String,
}

impl Default for ComputeApiAccountDiscovery {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

impl ComputeApiAccountDiscovery {
    /// Create a discovery against the default API endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DiscoverAccount for ComputeApiAccountDiscovery {
    async fn discover_accounts(
        &self,
        ctx: &Context,
        cred: &Credentials,
    ) -> Result<Vec<AccountRecord>> {
        let url = format!(
            "{}/SoftLayer_Account/getHubNetworkStorage.json",
            self.endpoint.trim_end_matches('/')
        );
        debug!("discovering storage account for {} via {url}", cred.username());

        let basic = base64_encode(format!("{}:{}", cred.username(), cred.api_key()).as_bytes());
        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .header(http::header::AUTHORIZATION, format!("Basic {basic}"))
            .header(http::header::ACCEPT, "application/json")
            .body(Bytes::new())?;

        let resp = ctx.http_send(req).await?;
        if !resp.status().is_success() {
            return Err(Error::account_resolution_failed(format!(
                "account discovery failed with status {}: {}",
                resp.status(),
                String::from_utf8_lossy(resp.body())
            )));
        }

        serde_json::from_slice(resp.body()).map_err(|e| {
            Error::account_resolution_failed("failed to parse account discovery response")
                .with_source(e)
        })
    }
}
