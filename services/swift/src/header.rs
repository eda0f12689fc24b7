use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

use crate::constants::{CONTENT_TYPE_JSON, X_AUTH_TOKEN};
use reqstore_core::Result;

/// Precedence layers of a request's headers, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// `Content-Type`, `Accept` and `User-Agent` defaults.
    Content,
    /// `X-Auth-Token`.
    Auth,
    /// Headers supplied with the request.
    Caller,
}

/// Ordered header overlay.
///
/// Each layer replaces every value of a key set by a lower layer; keys a
/// layer does not mention pass through untouched.
#[derive(Clone, Debug, Default)]
pub struct HeaderOverlay {
    layers: BTreeMap<Layer, HeaderMap>,
}

impl HeaderOverlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay with the default content headers and the auth token.
    pub fn for_storage(user_agent: &str, token: &str) -> Result<Self> {
        let mut overlay = Self::new();
        overlay.insert(
            Layer::Content,
            CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        overlay.insert(
            Layer::Content,
            ACCEPT,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        overlay.insert(Layer::Content, USER_AGENT, HeaderValue::from_str(user_agent)?);

        let mut token = HeaderValue::from_str(token)?;
        token.set_sensitive(true);
        overlay.insert(Layer::Auth, HeaderName::from_static(X_AUTH_TOKEN), token);
        Ok(overlay)
    }

    /// Append one value to a layer.
    pub fn insert(&mut self, layer: Layer, name: HeaderName, value: HeaderValue) {
        self.layers.entry(layer).or_default().append(name, value);
    }

    /// Replace a whole layer.
    pub fn with_layer(mut self, layer: Layer, headers: HeaderMap) -> Self {
        self.layers.insert(layer, headers);
        self
    }

    /// Flatten the layers into the final header map.
    pub fn merge(&self) -> HeaderMap {
        let mut merged = HeaderMap::new();
        for headers in self.layers.values() {
            for name in headers.keys() {
                merged.remove(name);
                for value in headers.get_all(name) {
                    merged.append(name.clone(), value.clone());
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn caller(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(*k, HeaderValue::from_static(*v));
        }
        headers
    }

    #[test]
    fn test_defaults_and_token_present() {
        let merged = HeaderOverlay::for_storage("ua", "AUTH_tk").unwrap().merge();
        assert_eq!(merged[CONTENT_TYPE], "application/json");
        assert_eq!(merged[ACCEPT], "application/json");
        assert_eq!(merged[X_AUTH_TOKEN], "AUTH_tk");
        assert_eq!(merged[USER_AGENT], "ua");
    }

    #[test]
    fn test_caller_headers_win_for_every_overlapping_key() {
        let overrides = caller(&[
            ("content-type", "text/plain"),
            ("accept", "*/*"),
            ("x-auth-token", "AUTH_other"),
            ("user-agent", "custom"),
        ]);
        let merged = HeaderOverlay::for_storage("ua", "AUTH_tk")
            .unwrap()
            .with_layer(Layer::Caller, overrides.clone())
            .merge();

        for (name, value) in overrides.iter() {
            assert_eq!(merged.get_all(name).iter().collect::<Vec<_>>(), vec![value]);
        }
    }

    #[test]
    fn test_layer_insertion_order_does_not_matter() {
        let a = HeaderOverlay::new()
            .with_layer(Layer::Caller, caller(&[("x-auth-token", "caller")]))
            .with_layer(Layer::Auth, caller(&[("x-auth-token", "auth")]))
            .merge();
        let b = HeaderOverlay::new()
            .with_layer(Layer::Auth, caller(&[("x-auth-token", "auth")]))
            .with_layer(Layer::Caller, caller(&[("x-auth-token", "caller")]))
            .merge();
        assert_eq!(a, b);
        assert_eq!(a[X_AUTH_TOKEN], "caller");
    }

    #[test]
    fn test_non_overlapping_keys_pass_through() {
        let merged = HeaderOverlay::for_storage("ua", "AUTH_tk")
            .unwrap()
            .with_layer(
                Layer::Caller,
                caller(&[("x-object-meta-color", "red"), ("x-object-meta-color", "blue")]),
            )
            .merge();
        assert_eq!(merged[X_AUTH_TOKEN], "AUTH_tk");
        assert_eq!(merged.get_all("x-object-meta-color").iter().count(), 2);
    }
}
