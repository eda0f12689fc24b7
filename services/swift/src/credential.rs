use crate::constants::ACCOUNT_SEPARATOR;
use reqstore_core::utils::Redact;
use reqstore_core::{Error, Result};
use std::fmt::{Debug, Formatter};

/// Credentials used to authenticate against the storage auth endpoint.
///
/// The username is the sub-account part only. A compound `parent:sub` form is
/// rejected at construction, before any request is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    api_key: String,
    cluster: String,
    storage_account: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &Redact::from(&self.api_key))
            .field("cluster", &self.cluster)
            .field("storage_account", &self.storage_account)
            .finish()
    }
}

impl Credentials {
    /// Create new credentials, validating the username.
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        validate_username(&username)?;

        Ok(Self {
            username,
            api_key: api_key.into(),
            cluster: cluster.into(),
            storage_account: None,
        })
    }

    /// Pin the storage account so no discovery call is made.
    pub fn with_storage_account(mut self, account: impl Into<String>) -> Self {
        self.storage_account = Some(account.into()).filter(|v: &String| !v.is_empty());
        self
    }

    /// Username without account prefix.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Cluster name, e.g. `dal05`.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Explicit storage account, if supplied.
    pub fn storage_account(&self) -> Option<&str> {
        self.storage_account.as_deref()
    }
}

/// Reject usernames that carry an account prefix.
pub fn validate_username(username: &str) -> Result<()> {
    if username.contains(ACCOUNT_SEPARATOR) {
        return Err(Error::invalid_credential_format(format!(
            "username {username:?} must not contain {ACCOUNT_SEPARATOR:?}, pass only the sub-account name"
        )));
    }
    Ok(())
}
