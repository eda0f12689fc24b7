mod account;
pub use account::{AccountRecord, ComputeApiAccountDiscovery, DiscoverAccount, StaticAccountDiscovery};

mod auth;
pub use auth::{Authenticator, ProvideToken};
