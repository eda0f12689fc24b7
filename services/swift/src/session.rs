use crate::constants::{UNAUTHORIZED_SENTINEL, USER_AGENT};
use crate::header::{HeaderOverlay, Layer};
use crate::request::{encode_path, is_json_content_type, RequestSpec, Response};
use crate::token::{Endpoint, Token};
use crate::{Authenticator, Config, Credentials, ProvideToken};
use bytes::Bytes;
use http::{Method, StatusCode};
use log::{debug, warn};
use reqstore_core::utils::{join_path, Redact};
use reqstore_core::{Context, Error, Result};
use std::sync::{Arc, Mutex};

/// Where a dispatch stands with respect to authentication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthState {
    /// No auth failure seen yet.
    Settled,
    /// One auth failure seen, the token has been refreshed and the request
    /// is being re-issued.
    PendingRetry,
}

/// What to do with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Accept,
    Reauthenticate,
    Fail,
}

impl AuthState {
    fn next(self, unauthorized: bool) -> (AuthState, Action) {
        match (self, unauthorized) {
            (state, false) => (state, Action::Accept),
            (AuthState::Settled, true) => (AuthState::PendingRetry, Action::Reauthenticate),
            (AuthState::PendingRetry, true) => (AuthState::PendingRetry, Action::Fail),
        }
    }
}

/// Session dispatches requests to object storage with a managed token.
///
/// Cloning a session is cheap, clones share the token and account override.
///
/// ```no_run
/// use reqstore_core::{Context, Result};
/// use reqstore_http_send_reqwest::ReqwestHttpSend;
/// use reqstore_swift::{Credentials, RequestSpec, Session};
///
/// # async fn example() -> Result<()> {
/// let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
/// let cred = Credentials::new("SL123", "api-key", "dal05")?.with_storage_account("SLOS123-2");
/// let session = Session::new(ctx, cred)?;
///
/// let resp = session.request(RequestSpec::get("photos").with_query("format", "json")).await?;
/// println!("{:?}", resp.json);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    ctx: Context,
    provider: Arc<dyn ProvideToken>,
    token: Arc<tokio::sync::Mutex<Option<Token>>>,
    account_override: Arc<Mutex<Option<String>>>,
    user_agent: String,
}

impl Session {
    /// Create a session authenticating with `credentials`.
    ///
    /// Fails with `InvalidCredentialFormat` before any network activity if
    /// the username is malformed.
    pub fn new(ctx: Context, credentials: Credentials) -> Result<Self> {
        crate::validate_username(credentials.username())?;
        Ok(Self::with_provider(ctx, Authenticator::new(credentials)))
    }

    /// Create a session from a loaded [`Config`].
    pub fn from_config(ctx: Context, config: Config) -> Result<Self> {
        let user_agent = config.user_agent.clone();
        let authenticator = config.into_authenticator()?;
        let mut session = Self::with_provider(ctx, authenticator);
        if let Some(user_agent) = user_agent {
            session.user_agent = user_agent;
        }
        Ok(session)
    }

    /// Create a session with a custom token provider.
    pub fn with_provider(ctx: Context, provider: impl ProvideToken) -> Self {
        Self {
            ctx,
            provider: Arc::new(provider),
            token: Arc::new(tokio::sync::Mutex::new(None)),
            account_override: Arc::new(Mutex::new(None)),
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Set the user agent sent with storage requests.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Context used by this session.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Return a valid token, authenticating if needed.
    ///
    /// Callers arriving while an exchange is running wait for it and reuse
    /// its result.
    pub async fn token(&self) -> Result<Token> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        debug!("token missing or expired, authenticating");
        let token = self.provider.provide_token(&self.ctx).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next request authenticates again.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    /// Replace a token the server rejected.
    ///
    /// If another caller already replaced it, the newer token is reused.
    async fn refresh(&self, rejected: &Token) -> Result<Token> {
        let mut guard = self.token.lock().await;
        if let Some(current) = guard.as_ref() {
            if current.token != rejected.token && current.is_valid() {
                debug!("token already refreshed by another request");
                return Ok(current.clone());
            }
        }

        *guard = None;
        let token = self.provider.provide_token(&self.ctx).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Storage endpoint of the current token.
    pub async fn endpoint(&self) -> Result<Endpoint> {
        Ok(self.token().await?.endpoint)
    }

    /// Full url of the storage base path, account override applied.
    pub async fn storage_url(&self) -> Result<String> {
        let token = self.token().await?;
        Ok(token.endpoint.url(&self.compose_path(&token, None)))
    }

    /// Substitute the account segment of the base path for later requests.
    ///
    /// The override is applied when paths are composed, so it survives
    /// re-authentication. Pass `None` to go back to the authenticated account.
    pub fn set_account_override(&self, account: Option<String>) {
        *self.account_override.lock().expect("lock poisoned") =
            account.filter(|v| !v.is_empty());
    }

    /// Current account override.
    pub fn account_override(&self) -> Option<String> {
        self.account_override.lock().expect("lock poisoned").clone()
    }

    pub(crate) fn compose_path(&self, token: &Token, rel: Option<&str>) -> String {
        let base = token.endpoint.base_path.as_str();
        let base = match self.account_override() {
            Some(account) => match base.rsplit_once('/') {
                Some((parent, _)) => format!("{parent}/{account}"),
                None => format!("/{account}"),
            },
            None => base.to_string(),
        };
        join_path(&base, rel)
    }

    fn build_request(&self, spec: &RequestSpec, token: &Token) -> Result<http::Request<Bytes>> {
        let method = spec.method.clone().unwrap_or(Method::GET);
        let rel = spec.path.as_deref().map(encode_path);
        let path = self.compose_path(token, rel.as_deref());

        let mut url = token.endpoint.url(&path);
        if !spec.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(spec.query.iter())
                .finish();
            url.push('?');
            url.push_str(&query);
        }

        let headers = HeaderOverlay::for_storage(&self.user_agent, &token.token)?
            .with_layer(Layer::Caller, spec.headers.clone())
            .merge();

        debug!(
            "{method} {url} with token {:?}",
            Redact::from(&token.token)
        );

        let mut req = http::Request::builder()
            .method(method)
            .uri(url)
            .body(spec.body.clone().unwrap_or_default())?;
        *req.headers_mut() = headers;
        Ok(req)
    }

    /// Dispatch one request.
    ///
    /// A response signalling an auth failure triggers exactly one
    /// re-authentication and one re-issue of the same request. A second auth
    /// failure is returned as `AuthenticationFailed`.
    pub async fn request(&self, spec: RequestSpec) -> Result<Response> {
        let mut state = AuthState::Settled;
        let mut token = self.token().await?;

        loop {
            let req = self.build_request(&spec, &token)?;
            let resp = self.ctx.http_send(req).await?;

            let (next, action) = state.next(is_unauthorized(&resp));
            state = next;
            match action {
                Action::Accept => return self.finish(&spec, &token, resp),
                Action::Reauthenticate => {
                    warn!(
                        "request to {:?} was unauthorized, re-authenticating once",
                        spec.path
                    );
                    token = self.refresh(&token).await?;
                }
                Action::Fail => {
                    return Err(Error::authentication_failed(format!(
                        "request to {:?} still unauthorized after re-authentication",
                        spec.path
                    )))
                }
            }
        }
    }

    fn finish(
        &self,
        spec: &RequestSpec,
        token: &Token,
        resp: http::Response<Bytes>,
    ) -> Result<Response> {
        let (parts, body) = resp.into_parts();
        let path = self.compose_path(token, spec.path.as_deref());

        if parts.status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("{path} does not exist")).with_source(
                anyhow::anyhow!(
                    "server returned {}: {}",
                    parts.status,
                    String::from_utf8_lossy(&body)
                ),
            ));
        }
        if parts.status.is_client_error() || parts.status.is_server_error() {
            return Err(Error::unexpected(format!(
                "request to {path} failed with status {}: {}",
                parts.status,
                String::from_utf8_lossy(&body)
            )));
        }

        let json = if spec.parse_json && !body.is_empty() && is_json_content_type(&parts.headers) {
            let value = serde_json::from_slice(&body).map_err(|e| {
                Error::response_decoding_failed(format!(
                    "invalid JSON from {path}: {}",
                    String::from_utf8_lossy(&body)
                ))
                .with_source(e)
            })?;
            Some(value)
        } else {
            None
        };

        Ok(Response {
            status: parts.status,
            headers: parts.headers,
            body,
            json,
        })
    }
}

fn is_unauthorized(resp: &http::Response<Bytes>) -> bool {
    resp.status() == StatusCode::UNAUTHORIZED || resp.body().as_ref() == UNAUTHORIZED_SENTINEL
}
