// Env values used by Config::from_env.
pub const REQSTORE_USERNAME: &str = "REQSTORE_USERNAME";
pub const REQSTORE_API_KEY: &str = "REQSTORE_API_KEY";
pub const REQSTORE_CLUSTER: &str = "REQSTORE_CLUSTER";
pub const REQSTORE_ACCOUNT: &str = "REQSTORE_ACCOUNT";
pub const REQSTORE_AUTH_HOST: &str = "REQSTORE_AUTH_HOST";
pub const REQSTORE_API_ENDPOINT: &str = "REQSTORE_API_ENDPOINT";

// Defaults.
pub const DEFAULT_AUTH_HOST: &str = "objectstorage.softlayer.net";
pub const DEFAULT_API_ENDPOINT: &str = "https://api.softlayer.com/rest/v3";
pub const AUTH_PATH: &str = "/auth/v1.0";
pub const USER_AGENT: &str = concat!("reqstore-swift/", env!("CARGO_PKG_VERSION"));

/// Separator between the storage account and the username in `X-Auth-User`.
pub const ACCOUNT_SEPARATOR: char = ':';

/// Tokens expiring within this many seconds are treated as expired.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;

// Headers.
pub const X_AUTH_USER: &str = "x-auth-user";
pub const X_AUTH_KEY: &str = "x-auth-key";
pub const X_AUTH_TOKEN: &str = "x-auth-token";
pub const X_AUTH_TOKEN_EXPIRES: &str = "x-auth-token-expires";
pub const X_STORAGE_TOKEN: &str = "x-storage-token";
pub const X_STORAGE_URL: &str = "x-storage-url";
pub const X_ACCOUNT_META_TEMP_URL_KEY: &str = "x-account-meta-temp-url-key";
pub const X_CONTAINER_OBJECT_COUNT: &str = "x-container-object-count";
pub const X_CONTAINER_BYTES_USED: &str = "x-container-bytes-used";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Body some gateways return instead of a 401 status when the token is rejected.
pub const UNAUTHORIZED_SENTINEL: &[u8] =
    b"<html><h1>Unauthorized</h1><p>This server could not verify that you are authorized to access the document you requested.</p></html>";

/// Token lifetime assumed when the auth response carries no `X-Auth-Token-Expires`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86400;
