//! OAuth and STS token exchange with in-process caching
//!
//! The control plane accepts bearer tokens obtained either directly through
//! the client-credentials grant, or by exchanging that token at an STS
//! endpoint for one scoped to an identity pool. Tokens are cached per
//! TokenSource and refreshed only once their validity window has elapsed;
//! the window is shortened by a buffer so a token is never presented right
//! at its server-side expiry.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::error::ApiError;

/// Subtracted from a token's lifetime when computing its validity window.
/// Capped at half the lifetime so short-lived tokens keep a usable window.
pub const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// A bearer token plus the instant until which it may be reused.
/// Immutable once issued; refresh replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    valid_until: Option<Instant>,
}

impl Token {
    /// Build a token from an exchange response received at `now`.
    pub fn issued(value: String, expires_in: Duration, now: Instant) -> Self {
        let buffer = TOKEN_EXPIRY_BUFFER.min(expires_in / 2);
        Self {
            value,
            valid_until: Some(now + expires_in - buffer),
        }
    }

    /// A token is valid iff it has a value, an expiry, and the expiry is
    /// still ahead of `now`.
    pub fn is_valid(&self, now: Instant) -> bool {
        !self.value.is_empty() && self.valid_until.map_or(false, |until| now < until)
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn valid_until(&self) -> Option<Instant> {
        self.valid_until
    }
}

/// Client-credentials grant parameters.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

/// Optional second hop: exchange the client-credentials token at an STS
/// endpoint for one scoped to an identity pool.
#[derive(Debug, Clone)]
pub struct IdentityPoolExchange {
    pub sts_url: String,
    pub identity_pool_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[allow(dead_code)]
    token_type: Option<String>,
}

/// Obtains and caches bearer tokens for the control-plane API.
///
/// One instance per provider configuration; lives as long as the provider
/// process. The cache is guarded by an async mutex so concurrent resource
/// operations sharing a client perform at most one exchange per expiry.
pub struct TokenSource {
    http: reqwest::Client,
    credentials: OAuthCredentials,
    exchange: Option<IdentityPoolExchange>,
    cached: Mutex<Option<Token>>,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        credentials: OAuthCredentials,
        exchange: Option<IdentityPoolExchange>,
    ) -> Self {
        Self {
            http,
            credentials,
            exchange,
            cached: Mutex::new(None),
        }
    }

    /// Return a bearer token, reusing the cached one while it is valid.
    pub async fn bearer(&self) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        let now = Instant::now();

        if let Some(token) = cached.as_ref() {
            if token.is_valid(now) {
                return Ok(token.secret().to_string());
            }
        }

        tracing::debug!(
            token_url = %self.credentials.token_url,
            "cached token absent or expired, performing token exchange"
        );

        let token = self.fetch(now).await?;
        let secret = token.secret().to_string();
        *cached = Some(token);
        Ok(secret)
    }

    async fn fetch(&self, now: Instant) -> Result<Token, ApiError> {
        let subject = self.client_credentials_token(now).await?;

        match &self.exchange {
            None => Ok(subject),
            Some(pool) => self.identity_pool_token(&subject, pool, now).await,
        }
    }

    async fn client_credentials_token(&self, now: Instant) -> Result<Token, ApiError> {
        let mut form = vec![
            ("grant_type", CLIENT_CREDENTIALS_GRANT.to_string()),
            ("client_id", self.credentials.client_id.clone()),
            ("client_secret", self.credentials.client_secret.clone()),
        ];
        if let Some(scope) = &self.credentials.scope {
            form.push(("scope", scope.clone()));
        }

        let response = self
            .post_form(&self.credentials.token_url, &form)
            .await?;
        Ok(Token::issued(
            response.access_token,
            Duration::from_secs(response.expires_in),
            now,
        ))
    }

    async fn identity_pool_token(
        &self,
        subject: &Token,
        pool: &IdentityPoolExchange,
        now: Instant,
    ) -> Result<Token, ApiError> {
        let form = vec![
            ("grant_type", TOKEN_EXCHANGE_GRANT.to_string()),
            ("subject_token", subject.secret().to_string()),
            ("subject_token_type", ACCESS_TOKEN_TYPE.to_string()),
            ("identity_pool_id", pool.identity_pool_id.clone()),
        ];

        let response = self.post_form(&pool.sts_url, &form).await?;
        Ok(Token::issued(
            response.access_token,
            Duration::from_secs(response.expires_in),
            now,
        ))
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<TokenResponse, ApiError> {
        let response = self.http.post(url).form(form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("token response: {}, body: {}", e, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_window_is_strictly_shorter_than_lifetime() {
        let now = Instant::now();
        let expires_in = Duration::from_secs(3600);
        let token = Token::issued("tok".to_string(), expires_in, now);

        let until = token.valid_until().unwrap();
        assert!(until < now + expires_in);
        assert_eq!(until, now + expires_in - TOKEN_EXPIRY_BUFFER);
    }

    #[test]
    fn short_lifetime_halves_the_buffer() {
        let now = Instant::now();
        // Lifetime at the buffer boundary: applied buffer must be half the
        // lifetime, never the full fixed buffer.
        let expires_in = TOKEN_EXPIRY_BUFFER;
        let token = Token::issued("tok".to_string(), expires_in, now);

        let until = token.valid_until().unwrap();
        assert_eq!(until, now + expires_in / 2);
        assert!(token.is_valid(now));
    }

    #[test]
    fn tiny_lifetime_keeps_positive_window() {
        let now = Instant::now();
        let token = Token::issued("tok".to_string(), Duration::from_secs(2), now);

        assert!(token.is_valid(now));
        assert!(!token.is_valid(now + Duration::from_secs(2)));
    }

    #[test]
    fn empty_or_expired_token_is_invalid() {
        let now = Instant::now();

        let empty = Token::issued(String::new(), Duration::from_secs(3600), now);
        assert!(!empty.is_valid(now));

        let expired = Token::issued("tok".to_string(), Duration::from_secs(3600), now);
        assert!(!expired.is_valid(now + Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn valid_cached_token_is_not_refetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .with_body(r#"{"access_token":"tok-1","expires_in":3600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let source = TokenSource::new(
            reqwest::Client::new(),
            OAuthCredentials {
                token_url: format!("{}/oauth/token", server.url()),
                client_id: "cid".to_string(),
                client_secret: "csecret".to_string(),
                scope: Some("api".to_string()),
            },
            None,
        );

        assert_eq!(source.bearer().await.unwrap(), "tok-1");
        assert_eq!(source.bearer().await.unwrap(), "tok-1");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_cached_token_triggers_refresh() {
        let mut server = mockito::Server::new_async().await;
        // expires_in of 1s leaves a 500ms validity window.
        let mock = server
            .mock("POST", "/oauth/token")
            .with_body(r#"{"access_token":"tok","expires_in":1,"token_type":"Bearer"}"#)
            .expect(2)
            .create_async()
            .await;

        let source = TokenSource::new(
            reqwest::Client::new(),
            OAuthCredentials {
                token_url: format!("{}/oauth/token", server.url()),
                client_id: "cid".to_string(),
                client_secret: "csecret".to_string(),
                scope: None,
            },
            None,
        );

        let _ = source.bearer().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let _ = source.bearer().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn identity_pool_exchange_chains_both_hops() {
        let mut server = mockito::Server::new_async().await;

        let token_mock = server
            .mock("POST", "/oauth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded(
                    "grant_type".to_string(),
                    "client_credentials".to_string(),
                ),
                mockito::Matcher::UrlEncoded("client_id".to_string(), "cid".to_string()),
            ]))
            .with_body(r#"{"access_token":"subject-tok","expires_in":3600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let sts_mock = server
            .mock("POST", "/sts/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded(
                    "grant_type".to_string(),
                    "urn:ietf:params:oauth:grant-type:token-exchange".to_string(),
                ),
                mockito::Matcher::UrlEncoded(
                    "subject_token".to_string(),
                    "subject-tok".to_string(),
                ),
                mockito::Matcher::UrlEncoded(
                    "identity_pool_id".to_string(),
                    "pool-123".to_string(),
                ),
            ]))
            .with_body(r#"{"access_token":"pool-tok","expires_in":600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let source = TokenSource::new(
            reqwest::Client::new(),
            OAuthCredentials {
                token_url: format!("{}/oauth/token", server.url()),
                client_id: "cid".to_string(),
                client_secret: "csecret".to_string(),
                scope: None,
            },
            Some(IdentityPoolExchange {
                sts_url: format!("{}/sts/token", server.url()),
                identity_pool_id: "pool-123".to_string(),
            }),
        );

        assert_eq!(source.bearer().await.unwrap(), "pool-tok");

        token_mock.assert_async().await;
        sts_mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_exchange_carries_response_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let source = TokenSource::new(
            reqwest::Client::new(),
            OAuthCredentials {
                token_url: format!("{}/oauth/token", server.url()),
                client_id: "cid".to_string(),
                client_secret: "wrong".to_string(),
                scope: None,
            },
            None,
        );

        match source.bearer().await {
            Err(ApiError::TokenExchange { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid_client"));
            }
            other => panic!("expected TokenExchange error, got {:?}", other.map(|_| ())),
        }
    }
}
