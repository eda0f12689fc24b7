use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqstore_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Characters left as-is when a path segment is placed in a url.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// One request to dispatch through a [`Session`](crate::Session).
///
/// Built per call and consumed by the session.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// HTTP method, `GET` when unset.
    pub method: Option<Method>,
    /// Path relative to the storage base path, unencoded.
    ///
    /// `/` separates segments; every segment is percent-encoded on dispatch,
    /// so `?`, `#` and spaces stay part of the name.
    pub path: Option<String>,
    /// Query pairs, url encoded on dispatch.
    pub query: Vec<(String, String)>,
    /// Caller headers, they win over every session default.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
    /// Decode JSON response bodies into [`Response::json`].
    pub parse_json: bool,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            method: None,
            path: None,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            parse_json: true,
        }
    }
}

impl RequestSpec {
    /// Create a request targeting the base path with the default method.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `GET` request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new().with_method(Method::GET).with_path(path)
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the relative path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a caller header, replacing earlier values of the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| Error::request_invalid("failed to encode request body").with_source(e))?;
        Ok(self.with_body(body))
    }

    /// Toggle JSON decoding of the response.
    pub fn with_parse_json(mut self, parse_json: bool) -> Self {
        self.parse_json = parse_json;
        self
    }
}

/// Response returned by a [`Session`](crate::Session).
#[derive(Clone, Debug)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
    /// Decoded body, set when the request asked for it and the response is JSON.
    pub json: Option<serde_json::Value>,
}

impl Response {
    /// Get a header as string, `None` if absent or not valid ascii.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let decoded = match &self.json {
            Some(value) => T::deserialize(value),
            None => serde_json::from_slice(&self.body),
        };
        decoded.map_err(|e| {
            Error::response_decoding_failed(format!(
                "failed to decode response body: {}",
                String::from_utf8_lossy(&self.body)
            ))
            .with_source(e)
        })
    }
}

/// Percent-encode every `/` separated segment of `path`.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check whether a `Content-Type` announces JSON.
pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime.to_ascii_lowercase().ends_with("+json")
}
