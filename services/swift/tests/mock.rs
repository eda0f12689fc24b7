use async_trait::async_trait;
use bytes::Bytes;
use reqstore_core::{Context, HttpSend, Result};
use reqstore_swift::{Credentials, Session};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const STORAGE_URL: &str = "https://storage.example.com/v1/AUTH_SLOS1";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One storage request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

/// Transport answering auth requests itself and storage requests from a script.
#[derive(Debug, Default)]
pub struct Scripted {
    responses: Mutex<VecDeque<http::Response<Bytes>>>,
    auth_calls: AtomicUsize,
    requests: Mutex<Vec<Recorded>>,
}

impl Scripted {
    pub fn new(responses: Vec<http::Response<Bytes>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSend for Scripted {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        if req.uri().path().ends_with("/auth/v1.0") {
            let n = self.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(http::Response::builder()
                .status(200)
                .header("X-Auth-Token", format!("AUTH_tk{n:020}"))
                .header("X-Auth-Token-Expires", "3600")
                .header("X-Storage-Url", STORAGE_URL)
                .body(Bytes::new())?);
        }

        let (parts, body) = req.into_parts();
        self.requests.lock().unwrap().push(Recorded {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });
        let resp = self.responses.lock().unwrap().pop_front();
        match resp {
            Some(resp) => Ok(resp),
            None => Ok(http::Response::builder()
                .status(500)
                .body(Bytes::from_static(b"script exhausted"))?),
        }
    }
}

pub fn response(status: u16, content_type: Option<&str>, body: &str) -> http::Response<Bytes> {
    let mut builder = http::Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }
    builder.body(Bytes::from(body.to_string())).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials::new("SL123", "api-key", "dal05")
        .unwrap()
        .with_storage_account("SLOS1")
}

pub fn session(http: Arc<dyn HttpSend>) -> Session {
    init_logger();
    let ctx = Context::new().with_shared_http_send(http);
    Session::new(ctx, credentials()).unwrap()
}
