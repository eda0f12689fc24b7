use crate::constants::TOKEN_EXPIRY_MARGIN_SECS;
use http::Uri;
use reqstore_core::time::{add_secs, now, DateTime};
use reqstore_core::utils::Redact;
use reqstore_core::{Error, Result};
use std::fmt::{Debug, Formatter};

/// Storage endpoint resolved from the `X-Storage-Url` of an auth response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// `http` or `https`.
    pub scheme: String,
    /// Host name without port.
    pub host: String,
    /// Port, defaulted from the scheme when the url omits it.
    pub port: u16,
    /// Base path such as `/v1/AUTH_account`, never ending with `/`.
    pub base_path: String,
}

impl Endpoint {
    /// Parse a full storage url into an endpoint.
    pub fn parse(storage_url: &str) -> Result<Self> {
        let uri: Uri = storage_url.parse().map_err(|e| {
            Error::authentication_failed(format!("invalid storage url {storage_url:?}"))
                .with_source(e)
        })?;

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| {
                Error::authentication_failed(format!("storage url {storage_url:?} has no scheme"))
            })?
            .to_ascii_lowercase();
        let host = uri
            .host()
            .ok_or_else(|| {
                Error::authentication_failed(format!("storage url {storage_url:?} has no host"))
            })?
            .to_string();
        let port = match uri.port_u16() {
            Some(port) => port,
            None if scheme == "http" => 80,
            None => 443,
        };

        Ok(Self {
            scheme,
            host,
            port,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    fn is_default_port(&self) -> bool {
        matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443)
        )
    }

    /// Build a full url for an already composed path.
    pub fn url(&self, path: &str) -> String {
        if self.is_default_port() {
            format!("{}://{}{}", self.scheme, self.host, path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.host, self.port, path)
        }
    }
}

/// Token state produced by one successful authentication.
///
/// Token, storage account and endpoint are always replaced together, so a
/// valid token implies the other two are populated.
#[derive(Clone)]
pub struct Token {
    /// Value sent as `X-Auth-Token`.
    pub token: String,
    /// Absolute expiry instant.
    pub expires_at: Option<DateTime>,
    /// Storage account the token was issued for.
    pub storage_account: String,
    /// Storage endpoint the token is valid against.
    pub endpoint: Endpoint,
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token", &Redact::from(&self.token))
            .field("expires_at", &self.expires_at)
            .field("storage_account", &self.storage_account)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Token {
    /// Check whether the token can still be used.
    ///
    /// A token expiring within [`TOKEN_EXPIRY_MARGIN_SECS`] is already invalid,
    /// as is a token without a known expiry.
    pub fn is_valid(&self) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > add_secs(now(), TOKEN_EXPIRY_MARGIN_SECS),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(expires_in: Option<i64>) -> Token {
        Token {
            token: "AUTH_tk0123456789".to_string(),
            expires_at: expires_in.map(|secs| add_secs(now(), secs)),
            storage_account: "SLOS1".to_string(),
            endpoint: Endpoint::parse("https://dal05.objectstorage.softlayer.net/v1/AUTH_x")
                .unwrap(),
        }
    }

    #[test]
    fn test_token_is_valid() {
        assert!(token(Some(3600)).is_valid());
        assert!(token(Some(31 + 5)).is_valid());

        // Within the safety margin.
        assert!(!token(Some(29)).is_valid());
        assert!(!token(Some(10)).is_valid());
        // Expired.
        assert!(!token(Some(-60)).is_valid());
        // Unknown expiry.
        assert!(!token(None).is_valid());

        let mut t = token(Some(3600));
        t.token = String::new();
        assert!(!t.is_valid());
    }

    #[test]
    fn test_parse_endpoint() {
        let ep = Endpoint::parse("https://dal05.objectstorage.softlayer.net/v1/AUTH_abc/").unwrap();
        assert_eq!(
            ep,
            Endpoint {
                scheme: "https".to_string(),
                host: "dal05.objectstorage.softlayer.net".to_string(),
                port: 443,
                base_path: "/v1/AUTH_abc".to_string(),
            }
        );
        assert_eq!(
            ep.url("/v1/AUTH_abc/photos"),
            "https://dal05.objectstorage.softlayer.net/v1/AUTH_abc/photos"
        );
    }

    #[test]
    fn test_parse_endpoint_with_port() {
        let ep = Endpoint::parse("http://127.0.0.1:8080/v1/AUTH_test").unwrap();
        assert_eq!(ep.port, 8080);
        assert_eq!(ep.scheme, "http");
        assert_eq!(ep.url("/v1/AUTH_test"), "http://127.0.0.1:8080/v1/AUTH_test");

        let ep = Endpoint::parse("http://localhost/v1/AUTH_test").unwrap();
        assert_eq!(ep.port, 80);
    }

    #[test]
    fn test_parse_endpoint_rejects_relative_url() {
        let err = Endpoint::parse("/v1/AUTH_test").unwrap_err();
        assert_eq!(err.kind(), reqstore_core::ErrorKind::AuthenticationFailed);
    }
}
