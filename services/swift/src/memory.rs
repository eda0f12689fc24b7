//! In-memory object storage for tests.
//!
//! [`MemoryRepository`] implements [`HttpSend`] and answers both the auth
//! endpoint and the storage api, keyed by account. Each test owns its own
//! repository; nothing is shared across instances.

use crate::constants::*;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use log::debug;
use percent_encoding::percent_decode_str;
use reqstore_core::time::{add_secs, now, DateTime};
use reqstore_core::{HttpSend, Result};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Reserved account level path serving tags.
const TAGS: &str = "tags";

#[derive(Debug, Default, Clone)]
struct AccountData {
    containers: BTreeMap<String, BTreeMap<String, Bytes>>,
    tags: Vec<String>,
    temp_url_key: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, String>,
    accounts: BTreeMap<String, AccountData>,
    /// Issued token to its account and expiry.
    tokens: HashMap<String, (String, DateTime)>,
    issued: u64,
}

/// In-memory storage service keyed by account identifier.
#[derive(Debug)]
pub struct MemoryRepository {
    storage_base: String,
    token_ttl: i64,
    state: Mutex<State>,
    auth_calls: AtomicUsize,
    storage_calls: AtomicUsize,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new("https://storage.memory.local")
    }
}

impl MemoryRepository {
    /// Create a repository whose storage urls start with `storage_base`.
    pub fn new(storage_base: impl Into<String>) -> Self {
        Self {
            storage_base: storage_base.into().trim_end_matches('/').to_string(),
            token_ttl: 3600,
            state: Mutex::new(State::default()),
            auth_calls: AtomicUsize::new(0),
            storage_calls: AtomicUsize::new(0),
        }
    }

    /// Set the lifetime of issued tokens.
    ///
    /// Tokens are rejected with 401 once it has passed.
    pub fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl = secs;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("lock poisoned")
    }

    /// Register `username` under `account` with `api_key`.
    pub fn add_user(&self, account: &str, username: &str, api_key: &str) {
        let mut state = self.state();
        state
            .users
            .insert(format!("{account}{ACCOUNT_SEPARATOR}{username}"), api_key.to_string());
        state.accounts.entry(account.to_string()).or_default();
    }

    /// Create an empty container.
    pub fn create_container(&self, account: &str, container: &str) {
        self.state()
            .accounts
            .entry(account.to_string())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default();
    }

    /// Store an object, creating its container.
    pub fn put_object(&self, account: &str, container: &str, name: &str, body: impl Into<Bytes>) {
        self.state()
            .accounts
            .entry(account.to_string())
            .or_default()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), body.into());
    }

    /// Read an object back.
    pub fn object(&self, account: &str, container: &str, name: &str) -> Option<Bytes> {
        self.state()
            .accounts
            .get(account)?
            .containers
            .get(container)?
            .get(name)
            .cloned()
    }

    /// Replace the tags of an account, in listing order.
    pub fn set_tags(&self, account: &str, tags: &[&str]) {
        self.state().accounts.entry(account.to_string()).or_default().tags =
            tags.iter().map(|v| v.to_string()).collect();
    }

    /// Set or clear the temp url key of an account.
    pub fn set_temp_url_key(&self, account: &str, key: Option<&str>) {
        self.state()
            .accounts
            .entry(account.to_string())
            .or_default()
            .temp_url_key = key.map(|v| v.to_string());
    }

    /// Revoke every issued token, as if they expired server side.
    pub fn expire_tokens(&self) {
        self.state().tokens.clear();
    }

    /// Remove all data of one account, users included.
    pub fn reset_account(&self, account: &str) {
        let mut state = self.state();
        state.accounts.remove(account);
        let prefix = format!("{account}{ACCOUNT_SEPARATOR}");
        state.users.retain(|k, _| !k.starts_with(&prefix));
        state.tokens.retain(|_, (owner, _)| owner.as_str() != account);
    }

    /// Remove everything and zero the counters.
    pub fn reset(&self) {
        *self.state() = State::default();
        self.auth_calls.store(0, Ordering::SeqCst);
        self.storage_calls.store(0, Ordering::SeqCst);
    }

    /// Number of auth exchanges served.
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    /// Number of storage requests served.
    pub fn storage_calls(&self) -> usize {
        self.storage_calls.load(Ordering::SeqCst)
    }

    fn authenticate(&self, req: &http::Request<Bytes>) -> http::Response<Bytes> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);

        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let user = header(X_AUTH_USER);
        let key = header(X_AUTH_KEY);

        let mut state = self.state();
        if state.users.get(&user) != Some(&key) {
            return reply(StatusCode::UNAUTHORIZED, Bytes::from_static(b"Unauthorized"));
        }
        let account = user
            .split_once(ACCOUNT_SEPARATOR)
            .map(|(account, _)| account.to_string())
            .unwrap_or_default();

        state.issued += 1;
        let token = format!("AUTH_tk{:032x}", state.issued);
        let expires_at = add_secs(now(), self.token_ttl);
        state.tokens.insert(token.clone(), (account.clone(), expires_at));
        debug!("memory repository issued token for {account}");

        let mut resp = reply(StatusCode::OK, Bytes::new());
        let headers = resp.headers_mut();
        insert(headers, X_AUTH_TOKEN, &token);
        insert(headers, X_STORAGE_TOKEN, &token);
        insert(headers, X_AUTH_TOKEN_EXPIRES, &self.token_ttl.to_string());
        insert(
            headers,
            X_STORAGE_URL,
            &format!("{}/v1/AUTH_{account}", self.storage_base),
        );
        resp
    }

    fn serve(&self, req: &http::Request<Bytes>) -> http::Response<Bytes> {
        self.storage_calls.fetch_add(1, Ordering::SeqCst);

        let token = req
            .headers()
            .get(X_AUTH_TOKEN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let mut state = self.state();
        let current = now();
        state.tokens.retain(|_, (_, expires_at)| *expires_at > current);
        if !state.tokens.contains_key(token) {
            return reply(StatusCode::UNAUTHORIZED, Bytes::from_static(b"Unauthorized"));
        }

        let segments: Vec<String> = req
            .uri()
            .path()
            .split('/')
            .filter(|v| !v.is_empty())
            .map(|v| percent_decode_str(v).decode_utf8_lossy().into_owned())
            .collect();
        let Some(account) = segments
            .get(1)
            .filter(|_| segments[0] == "v1")
            .and_then(|v| v.strip_prefix("AUTH_"))
        else {
            return reply(StatusCode::NOT_FOUND, Bytes::new());
        };
        let Some(data) = state.accounts.get_mut(account) else {
            return reply(StatusCode::NOT_FOUND, Bytes::new());
        };

        let method = req.method();
        match &segments[2..] {
            [] if method == Method::GET || method == Method::HEAD => {
                let listing: Vec<_> = data
                    .containers
                    .iter()
                    .map(|(name, objects)| {
                        json!({
                            "name": name,
                            "count": objects.len(),
                            "bytes": objects.values().map(|v| v.len()).sum::<usize>(),
                        })
                    })
                    .collect();
                let mut resp = if method == Method::HEAD {
                    reply(StatusCode::NO_CONTENT, Bytes::new())
                } else {
                    json_reply(&listing)
                };
                if let Some(key) = &data.temp_url_key {
                    insert(resp.headers_mut(), X_ACCOUNT_META_TEMP_URL_KEY, key);
                }
                resp
            }
            [tags] if tags == TAGS && method == Method::GET => {
                let listing: Vec<_> = data.tags.iter().map(|v| json!({ "name": v })).collect();
                json_reply(&listing)
            }
            [tags, id] if tags == TAGS && method == Method::GET => {
                match data.tags.iter().find(|v| *v == id) {
                    Some(tag) => json_reply(&json!({ "name": tag })),
                    None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                }
            }
            [container] => match *method {
                Method::HEAD => match data.containers.get(container) {
                    Some(objects) => {
                        let mut resp = reply(StatusCode::NO_CONTENT, Bytes::new());
                        let bytes: usize = objects.values().map(|v| v.len()).sum();
                        insert(
                            resp.headers_mut(),
                            X_CONTAINER_OBJECT_COUNT,
                            &objects.len().to_string(),
                        );
                        insert(resp.headers_mut(), X_CONTAINER_BYTES_USED, &bytes.to_string());
                        resp
                    }
                    None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                },
                Method::GET => match data.containers.get(container) {
                    Some(objects) => {
                        let listing: Vec<_> = objects
                            .iter()
                            .map(|(name, body)| json!({ "name": name, "bytes": body.len() }))
                            .collect();
                        json_reply(&listing)
                    }
                    None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                },
                Method::PUT => {
                    data.containers.entry(container.clone()).or_default();
                    reply(StatusCode::CREATED, Bytes::new())
                }
                Method::DELETE => match data.containers.remove(container) {
                    Some(_) => reply(StatusCode::NO_CONTENT, Bytes::new()),
                    None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                },
                _ => reply(StatusCode::METHOD_NOT_ALLOWED, Bytes::new()),
            },
            [container, rest @ ..] => {
                let name = rest.join("/");
                match *method {
                    Method::GET => match data
                        .containers
                        .get(container)
                        .and_then(|objects| objects.get(&name))
                    {
                        Some(body) => reply(StatusCode::OK, body.clone()),
                        None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                    },
                    Method::PUT => match data.containers.get_mut(container) {
                        Some(objects) => {
                            objects.insert(name, req.body().clone());
                            reply(StatusCode::CREATED, Bytes::new())
                        }
                        None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                    },
                    Method::DELETE => match data
                        .containers
                        .get_mut(container)
                        .and_then(|objects| objects.remove(&name))
                    {
                        Some(_) => reply(StatusCode::NO_CONTENT, Bytes::new()),
                        None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                    },
                    _ => reply(StatusCode::METHOD_NOT_ALLOWED, Bytes::new()),
                }
            }
            _ => reply(StatusCode::METHOD_NOT_ALLOWED, Bytes::new()),
        }
    }
}

#[async_trait]
impl HttpSend for MemoryRepository {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        if req.uri().path().trim_end_matches('/').ends_with(AUTH_PATH) {
            Ok(self.authenticate(&req))
        } else {
            Ok(self.serve(&req))
        }
    }
}

fn reply(status: StatusCode, body: Bytes) -> http::Response<Bytes> {
    let mut resp = http::Response::new(body);
    *resp.status_mut() = status;
    resp
}

fn json_reply(value: &impl serde::Serialize) -> http::Response<Bytes> {
    // Serializing json! values never fails.
    let body = serde_json::to_vec(value).unwrap_or_default();
    let mut resp = reply(StatusCode::OK, Bytes::from(body));
    insert(
        resp.headers_mut(),
        "content-type",
        "application/json; charset=utf-8",
    );
    resp
}

fn insert(headers: &mut http::HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = http::HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn auth_request(user: &str, key: &str) -> http::Request<Bytes> {
        http::Request::get("https://dal05.objectstorage.softlayer.net/auth/v1.0")
            .header(X_AUTH_USER, user)
            .header(X_AUTH_KEY, key)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_auth_and_reset() {
        let repo = MemoryRepository::default();
        repo.add_user("SLOS1", "SL1", "key");

        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[X_STORAGE_URL],
            "https://storage.memory.local/v1/AUTH_SLOS1"
        );

        let resp = repo.http_send(auth_request("SLOS1:SL1", "bad")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(repo.auth_calls(), 2);

        repo.reset();
        assert_eq!(repo.auth_calls(), 0);
        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    fn storage_request(token: &str) -> http::Request<Bytes> {
        http::Request::get("https://storage.memory.local/v1/AUTH_SLOS1")
            .header(X_AUTH_TOKEN, token)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let repo = MemoryRepository::default().with_token_ttl(-1);
        repo.add_user("SLOS1", "SL1", "key");

        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        let token = resp.headers()[X_AUTH_TOKEN].to_str().unwrap().to_string();

        let resp = repo.http_send(storage_request(&token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(repo.state().tokens.is_empty());
    }

    #[tokio::test]
    async fn test_live_token_is_accepted() {
        let repo = MemoryRepository::default();
        repo.add_user("SLOS1", "SL1", "key");

        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        let token = resp.headers()[X_AUTH_TOKEN].to_str().unwrap().to_string();

        let resp = repo.http_send(storage_request(&token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_container_head() {
        let repo = MemoryRepository::default();
        repo.add_user("SLOS1", "SL1", "key");
        repo.put_object("SLOS1", "photos", "cat.png", "meow");

        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        let token = resp.headers()[X_AUTH_TOKEN].to_str().unwrap().to_string();

        let req = http::Request::head("https://storage.memory.local/v1/AUTH_SLOS1/photos")
            .header(X_AUTH_TOKEN, token.as_str())
            .body(Bytes::new())
            .unwrap();
        let resp = repo.http_send(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[X_CONTAINER_OBJECT_COUNT], "1");
        assert_eq!(resp.headers()[X_CONTAINER_BYTES_USED], "4");
    }

    #[tokio::test]
    async fn test_reset_account_keeps_others() {
        let repo = MemoryRepository::default();
        repo.add_user("SLOS1", "SL1", "key");
        repo.add_user("SLOS2", "SL2", "key");
        repo.put_object("SLOS2", "c", "o", "data");

        repo.reset_account("SLOS1");

        let resp = repo.http_send(auth_request("SLOS1:SL1", "key")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = repo.http_send(auth_request("SLOS2:SL2", "key")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(repo.object("SLOS2", "c", "o"), Some(Bytes::from("data")));
    }
}
