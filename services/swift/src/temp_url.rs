use crate::constants::X_ACCOUNT_META_TEMP_URL_KEY;
use crate::request::encode_path;
use crate::{RequestSpec, Session};
use http::Method;
use log::debug;
use reqstore_core::hash::hex_hmac_sha1;
use reqstore_core::time::{add_secs, now, DateTime};
use reqstore_core::utils::Redact;
use reqstore_core::Result;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Resolves the account level temp URL key.
#[derive(Debug, Default, Clone, Copy)]
pub struct TempUrlKeyResolver;

impl TempUrlKeyResolver {
    /// Fetch `X-Account-Meta-Temp-Url-Key` from the account.
    ///
    /// `Ok(None)` means no key is configured, which is not an error.
    pub async fn resolve_key(session: &Session) -> Result<Option<String>> {
        let resp = session
            .request(RequestSpec::new().with_parse_json(false))
            .await?;
        let key = resp
            .header(X_ACCOUNT_META_TEMP_URL_KEY)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());
        debug!("resolved temp url key: {:?}", Redact::from(&key));
        Ok(key)
    }
}

/// Signs time limited urls with a temp URL key.
#[derive(Clone)]
pub struct TempUrl {
    key: String,
}

impl Debug for TempUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempUrl")
            .field("key", &Redact::from(&self.key))
            .finish()
    }
}

impl TempUrl {
    /// Create a signer for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Query string carrying the signature of `path` for `method` until `expires_at`.
    ///
    /// `path` is the full, unencoded storage path, e.g. `/v1/AUTH_x/c/o`.
    pub fn query(&self, method: &Method, path: &str, expires_at: DateTime) -> String {
        let expires = expires_at.timestamp();
        let payload = format!("{method}\n{expires}\n{path}");
        let sig = hex_hmac_sha1(self.key.as_bytes(), payload.as_bytes());
        format!("temp_url_sig={sig}&temp_url_expires={expires}")
    }

    /// Sign `path` for `method` until `expires_at`.
    ///
    /// Returns the path with `temp_url_sig` and `temp_url_expires` appended.
    pub fn sign(&self, method: &Method, path: &str, expires_at: DateTime) -> String {
        format!("{path}?{}", self.query(method, path, expires_at))
    }
}

impl Session {
    /// Build a pre-signed url for `path` valid for `ttl`.
    ///
    /// Returns `Ok(None)` when the account has no temp URL key.
    pub async fn temp_url(
        &self,
        method: Method,
        path: &str,
        ttl: Duration,
    ) -> Result<Option<String>> {
        let Some(key) = TempUrlKeyResolver::resolve_key(self).await? else {
            return Ok(None);
        };

        let token = self.token().await?;
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        // The server verifies the decoded path, the url carries the encoded one.
        let query = TempUrl::new(key).query(
            &method,
            &self.compose_path(&token, Some(path)),
            add_secs(now(), ttl),
        );
        let url = token
            .endpoint
            .url(&self.compose_path(&token, Some(&encode_path(path))));
        Ok(Some(format!("{url}?{query}")))
    }
}
