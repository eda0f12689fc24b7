use crate::constants::*;
use crate::{Authenticator, ComputeApiAccountDiscovery, Credentials};
use reqstore_core::{Context, Error, Result};

/// Config carries all the configuration for a storage session.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// `username` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_USERNAME`]
    pub username: Option<String>,
    /// `api_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_API_KEY`]
    pub api_key: Option<String>,
    /// `cluster` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_CLUSTER`]
    pub cluster: Option<String>,
    /// `storage_account` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_ACCOUNT`]
    ///
    /// Discovered through the compute API when unset.
    pub storage_account: Option<String>,
    /// `auth_host` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_AUTH_HOST`]
    /// - default to [`DEFAULT_AUTH_HOST`]
    pub auth_host: Option<String>,
    /// `api_endpoint` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`REQSTORE_API_ENDPOINT`]
    /// - default to [`DEFAULT_API_ENDPOINT`]
    pub api_endpoint: Option<String>,
    /// User agent for auth and storage requests.
    pub user_agent: Option<String>,
}

impl Config {
    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if let Some(v) = ctx.env_var(REQSTORE_USERNAME) {
            self.username.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(REQSTORE_API_KEY) {
            self.api_key.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(REQSTORE_CLUSTER) {
            self.cluster.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(REQSTORE_ACCOUNT) {
            self.storage_account.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(REQSTORE_AUTH_HOST) {
            self.auth_host.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(REQSTORE_API_ENDPOINT) {
            self.api_endpoint.get_or_insert(v);
        }

        self
    }

    /// Build validated credentials.
    pub fn to_credentials(&self) -> Result<Credentials> {
        let required = |v: &Option<String>, name: &str| {
            v.clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config_invalid(format!("{name} is required")))
        };

        let cred = Credentials::new(
            required(&self.username, "username")?,
            required(&self.api_key, "api_key")?,
            required(&self.cluster, "cluster")?,
        )?;
        Ok(match &self.storage_account {
            Some(account) => cred.with_storage_account(account.clone()),
            None => cred,
        })
    }

    /// Build the authenticator described by this config.
    pub fn into_authenticator(self) -> Result<Authenticator> {
        let credentials = self.to_credentials()?;

        let discovery = match self.api_endpoint {
            Some(endpoint) => ComputeApiAccountDiscovery::new().with_endpoint(endpoint),
            None => ComputeApiAccountDiscovery::new(),
        };
        let mut auth = Authenticator::new(credentials).with_account_discovery(discovery);
        if let Some(host) = self.auth_host {
            auth = auth.with_auth_host(host);
        }
        if let Some(user_agent) = self.user_agent {
            auth = auth.with_user_agent(user_agent);
        }
        Ok(auth)
    }
}
