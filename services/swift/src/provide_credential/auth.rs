use super::account::{first_account, DiscoverAccount};
use crate::constants::*;
use crate::token::{Endpoint, Token};
use crate::Credentials;
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use log::debug;
use reqstore_core::time::{add_secs, now};
use reqstore_core::utils::Redact;
use reqstore_core::{Context, Error, Result};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// ProvideToken performs one authentication exchange.
///
/// Session calls it whenever the cached token is missing, expired or
/// rejected by the server.
#[async_trait]
pub trait ProvideToken: Debug + Send + Sync + 'static {
    /// Authenticate and return a fresh token.
    async fn provide_token(&self, ctx: &Context) -> Result<Token>;
}

/// Authenticator exchanges username and api key for a storage token.
///
/// The storage account is resolved once: explicitly from [`Credentials`], or
/// via [`DiscoverAccount`] on first use. Later exchanges reuse it.
#[derive(Debug)]
pub struct Authenticator {
    credentials: Credentials,
    auth_host: String,
    auth_url: Option<String>,
    user_agent: String,
    discovery: Option<Arc<dyn DiscoverAccount>>,
    account: Mutex<Option<String>>,
}

impl Authenticator {
    /// Create a new authenticator.
    pub fn new(credentials: Credentials) -> Self {
        let account = credentials.storage_account().map(|v| v.to_string());
        Self {
            credentials,
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            auth_url: None,
            user_agent: USER_AGENT.to_string(),
            discovery: None,
            account: Mutex::new(account),
        }
    }

    /// Set the auth host, the cluster is prepended to it.
    pub fn with_auth_host(mut self, host: impl Into<String>) -> Self {
        self.auth_host = host.into();
        self
    }

    /// Override the full auth url, ignoring cluster and auth host.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    /// Set the user agent sent to the auth endpoint.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the account discovery used when no storage account is supplied.
    pub fn with_account_discovery(mut self, discovery: impl DiscoverAccount) -> Self {
        self.discovery = Some(Arc::new(discovery));
        self
    }

    /// Credentials this authenticator uses.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Cluster scoped auth url.
    pub fn auth_url(&self) -> String {
        match &self.auth_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}.{}{}",
                self.credentials.cluster(),
                self.auth_host,
                AUTH_PATH
            ),
        }
    }

    async fn resolve_account(&self, ctx: &Context) -> Result<String> {
        if let Some(account) = self.account.lock().expect("lock poisoned").clone() {
            return Ok(account);
        }

        let discovery = self.discovery.as_ref().ok_or_else(|| {
            Error::account_resolution_failed(
                "no storage account supplied and no account discovery configured",
            )
        })?;
        let records = discovery.discover_accounts(ctx, &self.credentials).await?;
        let account = first_account(&records)?;
        debug!("resolved storage account {account}");

        *self.account.lock().expect("lock poisoned") = Some(account.clone());
        Ok(account)
    }

    /// Perform a fresh auth exchange.
    pub async fn authenticate(&self, ctx: &Context) -> Result<Token> {
        let account = self.resolve_account(ctx).await?;
        let url = self.auth_url();
        debug!(
            "authenticating {account}{ACCOUNT_SEPARATOR}{} against {url}",
            self.credentials.username()
        );

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .header(http::header::USER_AGENT, &self.user_agent)
            .header(
                X_AUTH_USER,
                format!(
                    "{account}{ACCOUNT_SEPARATOR}{}",
                    self.credentials.username()
                ),
            )
            .header(X_AUTH_KEY, self.credentials.api_key())
            .body(Bytes::new())?;

        let issued_at = now();
        let resp = ctx.http_send(req).await?;

        let status = resp.status().as_u16();
        if !(200..=208).contains(&status) {
            return Err(Error::authentication_failed(format!(
                "auth endpoint {url} returned {status}: {}",
                String::from_utf8_lossy(resp.body())
            )));
        }

        let headers = resp.headers();
        let token = header_str(headers, X_AUTH_TOKEN)
            .or_else(|| header_str(headers, X_STORAGE_TOKEN))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::authentication_failed("auth response carries no X-Auth-Token")
            })?
            .to_string();
        let storage_url = header_str(headers, X_STORAGE_URL).ok_or_else(|| {
            Error::authentication_failed("auth response carries no X-Storage-Url")
        })?;
        let endpoint = Endpoint::parse(storage_url)?;

        let ttl = match header_str(headers, X_AUTH_TOKEN_EXPIRES) {
            Some(v) => v.trim().parse::<i64>().map_err(|e| {
                Error::authentication_failed(format!("invalid X-Auth-Token-Expires {v:?}"))
                    .with_source(e)
            })?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        debug!(
            "authenticated, token {:?} expires in {ttl}s, endpoint {}",
            Redact::from(&token),
            endpoint.url(&endpoint.base_path)
        );

        Ok(Token {
            token,
            expires_at: Some(add_secs(issued_at, ttl)),
            storage_account: account,
            endpoint,
        })
    }
}

#[async_trait]
impl ProvideToken for Authenticator {
    async fn provide_token(&self, ctx: &Context) -> Result<Token> {
        self.authenticate(ctx).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountRecord, StaticAccountDiscovery};
    use pretty_assertions::assert_eq;
    use reqstore_core::{ErrorKind, HttpSend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct AuthEndpoint {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        calls: AtomicUsize,
        seen: Mutex<Vec<http::request::Parts>>,
    }

    #[async_trait]
    impl HttpSend for AuthEndpoint {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(req.into_parts().0);
            let mut resp = http::Response::builder().status(self.status);
            for (k, v) in &self.headers {
                resp = resp.header(*k, *v);
            }
            Ok(resp.body(Bytes::from_static(b"denied"))?)
        }
    }

    fn ok_endpoint() -> Arc<AuthEndpoint> {
        Arc::new(AuthEndpoint {
            status: 200,
            headers: vec![
                ("X-Auth-Token", "AUTH_tk1234567890"),
                ("X-Auth-Token-Expires", "3600"),
                ("X-Storage-Token", "AUTH_tk1234567890"),
                (
                    "X-Storage-Url",
                    "https://dal05.objectstorage.softlayer.net/v1/AUTH_abc/",
                ),
            ],
            ..Default::default()
        })
    }

    fn credentials() -> Credentials {
        Credentials::new("SL123", "secret", "dal05").unwrap()
    }

    #[tokio::test]
    async fn test_authenticate() -> anyhow::Result<()> {
        let http = ok_endpoint();
        let ctx = Context::new().with_shared_http_send(http.clone());
        let auth = Authenticator::new(credentials().with_storage_account("SLOS1-2"));

        let token = auth.authenticate(&ctx).await?;
        assert_eq!(token.token, "AUTH_tk1234567890");
        assert_eq!(token.storage_account, "SLOS1-2");
        assert_eq!(token.endpoint.base_path, "/v1/AUTH_abc");
        assert!(token.is_valid());

        let seen = http.seen.lock().unwrap();
        let parts = &seen[0];
        assert_eq!(
            parts.uri.to_string(),
            "https://dal05.objectstorage.softlayer.net/auth/v1.0"
        );
        assert_eq!(parts.headers[X_AUTH_USER], "SLOS1-2:SL123");
        assert_eq!(parts.headers[X_AUTH_KEY], "secret");
        assert!(parts.headers.contains_key(http::header::USER_AGENT));
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_failure_status() {
        let http = Arc::new(AuthEndpoint {
            status: 401,
            ..Default::default()
        });
        let ctx = Context::new().with_shared_http_send(http.clone());
        let auth = Authenticator::new(credentials().with_storage_account("SLOS1-2"));

        let err = auth.authenticate(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert!(err.message().contains("denied"));
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authenticate_accepts_208() -> anyhow::Result<()> {
        let http = Arc::new(AuthEndpoint {
            status: 208,
            headers: vec![
                ("X-Auth-Token", "AUTH_tk1234567890"),
                ("X-Storage-Url", "https://127.0.0.1/v1/AUTH_abc"),
            ],
            ..Default::default()
        });
        let ctx = Context::new().with_shared_http_send(http);
        let auth = Authenticator::new(credentials().with_storage_account("SLOS1-2"));

        let token = auth.authenticate(&ctx).await?;
        // No expiry header means the default lifetime.
        assert!(token.is_valid());
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_discovers_account_once() -> anyhow::Result<()> {
        let http = ok_endpoint();
        let ctx = Context::new().with_shared_http_send(http.clone());
        let auth = Authenticator::new(credentials()).with_account_discovery(
            StaticAccountDiscovery::new(vec![
                AccountRecord::new("SLOS9-1"),
                AccountRecord::new("SLOS9-2"),
            ]),
        );

        let token = auth.authenticate(&ctx).await?;
        assert_eq!(token.storage_account, "SLOS9-1");
        let token = auth.authenticate(&ctx).await?;
        assert_eq!(token.storage_account, "SLOS9-1");
        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_without_account() {
        let http = ok_endpoint();
        let ctx = Context::new().with_shared_http_send(http.clone());

        let auth = Authenticator::new(credentials())
            .with_account_discovery(StaticAccountDiscovery::new(vec![]));
        let err = auth.authenticate(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountResolutionFailed);

        let auth = Authenticator::new(credentials());
        let err = auth.authenticate(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountResolutionFailed);

        // Discovery failures never reach the auth endpoint.
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_auth_url() {
        let auth = Authenticator::new(credentials()).with_auth_host("example.com");
        assert_eq!(auth.auth_url(), "https://dal05.example.com/auth/v1.0");

        let auth = auth.with_auth_url("http://127.0.0.1:8080/auth/v1.0");
        assert_eq!(auth.auth_url(), "http://127.0.0.1:8080/auth/v1.0");
    }
}
