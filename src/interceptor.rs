//! Attach the bearer token to every call that needs one.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use crate::error::Result;
use crate::http::{Request, Response, Transport};
use crate::session::TokenStore;
use crate::token::TOKEN_PREFIX;

/// Endpoints used to obtain credentials, relative to the host.
const UNAUTHENTICATED_ENDPOINTS: [&str; 3] =
    ["/user/login", "/user/register", "/user/reset-password"];

/// [`Transport`] decorator adding `Authorization: Bearer <token>`.
pub struct AuthInterceptor<T> {
    inner: T,
    tokens: Arc<TokenStore>,
    unauthenticated_endpoints: Vec<String>,
}

impl<T: Transport> AuthInterceptor<T> {
    /// Wrap `inner`. The allow-list is computed once from `host`.
    pub fn new(inner: T, tokens: Arc<TokenStore>, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let unauthenticated_endpoints = UNAUTHENTICATED_ENDPOINTS
            .iter()
            .map(|endpoint| format!("{host}{endpoint}"))
            .collect();

        Self {
            inner,
            tokens,
            unauthenticated_endpoints,
        }
    }

    pub fn is_unauthenticated(&self, url: &str) -> bool {
        self.unauthenticated_endpoints
            .iter()
            .any(|endpoint| url.contains(endpoint.as_str()))
    }

    /// Authorized copy of `request`, or `None` when it must go out as is.
    ///
    /// The token is reloaded from storage first. A missing token still
    /// produces the header, the backend rejects it. Characters not allowed
    /// in a header value are dropped from the token.
    pub fn authorize(&self, request: &Request) -> Result<Option<Request>> {
        if self.is_unauthenticated(&request.url) {
            return Ok(None);
        }

        if let Err(err) = self.tokens.load_token() {
            tracing::warn!(error = %err, "cannot reload token from storage");
        }
        let token: String = self
            .tokens
            .token()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_graphic() || *c == ' ' || *c == '\t')
            .collect();

        let mut value = HeaderValue::from_str(&format!("{TOKEN_PREFIX}{token}"))?;
        value.set_sensitive(true);

        let mut authorized = request.clone();
        authorized.headers.insert(AUTHORIZATION, value);
        Ok(Some(authorized))
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthInterceptor<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        match self.authorize(&request)? {
            Some(authorized) => self.inner.send(authorized).await,
            None => self.inner.send(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockTransport;
    use crate::storage::{KeyValueStore, MemoryStore, TOKEN_KEY};

    const HOST: &str = "http://api.test";

    fn interceptor() -> (AuthInterceptor<MockTransport>, Arc<TokenStore>) {
        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
        (
            AuthInterceptor::new(MockTransport::new(), Arc::clone(&tokens), HOST),
            tokens,
        )
    }

    #[tokio::test]
    async fn test_allow_listed_endpoints_are_untouched() {
        let (interceptor, tokens) = interceptor();
        tokens.save_token("abc").unwrap();

        for url in [
            "http://api.test/user/login",
            "http://api.test/user/register",
            "http://api.test/user/reset-password/alice@example.com",
        ] {
            interceptor.send(Request::post(url)).await.unwrap();
            assert!(interceptor.inner.last().headers.get(AUTHORIZATION).is_none());
        }
    }

    #[tokio::test]
    async fn test_bearer_reflects_stored_token_at_call_time() {
        let (interceptor, tokens) = interceptor();
        tokens.save_token("abc").unwrap();
        // Written behind the in-memory field's back.
        tokens.storage().set(TOKEN_KEY, "fresh").unwrap();

        interceptor
            .send(Request::get("http://api.test/user/list"))
            .await
            .unwrap();
        assert_eq!(
            interceptor.inner.last().header("authorization"),
            Some("Bearer fresh")
        );
    }

    #[tokio::test]
    async fn test_missing_token_still_sends_header() {
        let (interceptor, _) = interceptor();

        interceptor
            .send(Request::delete("http://api.test/user/delete/42"))
            .await
            .unwrap();
        assert_eq!(
            interceptor.inner.last().header("authorization"),
            Some("Bearer ")
        );
    }

    #[tokio::test]
    async fn test_token_with_forbidden_characters_is_still_sent() {
        let (interceptor, tokens) = interceptor();
        tokens.save_token("abc\r\ndéf\u{7f}").unwrap();

        interceptor
            .send(Request::get("http://api.test/user/list"))
            .await
            .unwrap();
        assert_eq!(
            interceptor.inner.last().header("authorization"),
            Some("Bearer abcdf")
        );
    }

    #[test]
    fn test_original_request_is_not_mutated() {
        let (interceptor, tokens) = interceptor();
        tokens.save_token("abc").unwrap();

        let request = Request::get("http://api.test/user/list");
        let authorized = interceptor.authorize(&request).unwrap().unwrap();

        assert!(request.headers.is_empty());
        assert_eq!(authorized.header("authorization"), Some("Bearer abc"));
        assert_eq!(authorized.url, request.url);
        assert!(interceptor
            .authorize(&Request::post("http://api.test/user/login"))
            .unwrap()
            .is_none());
    }
}
