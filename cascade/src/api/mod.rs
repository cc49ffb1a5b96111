pub mod api_keys;
pub mod client;
pub mod clusters;
pub mod common;
pub mod connectors;
pub mod environments;
pub mod error;
pub mod oauth;
pub mod wait;

pub use client::{Client, Credentials, RetryConfig};
pub use error::ApiError;
pub use oauth::{IdentityPoolExchange, OAuthCredentials, TokenSource};
pub use wait::{wait_for_state, StateChangeConf, WaitError};
