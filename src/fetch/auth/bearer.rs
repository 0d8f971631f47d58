use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use crate::fetch::client::HttpClient;

/// An [`HttpClient`] wrapper that sends `Authorization: Bearer <token>` on
/// every request to the course backend.
///
/// The header value is validated once at construction so a bad token fails
/// at startup rather than on the first request.
pub struct BearerToken<C> {
    inner: C,
    value: HeaderValue,
}

impl<C> BearerToken<C> {
    pub fn new(inner: C, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("API token contains characters not allowed in an HTTP header")?;
        value.set_sensitive(true);

        Ok(Self { inner, value })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for BearerToken<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(AUTHORIZATION, self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_header_breaking_token() {
        assert!(BearerToken::new(BasicClient::new(), "abc\ndef").is_err());
    }

    #[test]
    fn test_marks_value_sensitive() {
        let auth = BearerToken::new(BasicClient::new(), "secret").unwrap();

        assert!(auth.value.is_sensitive());
        assert_eq!(auth.value.to_str().unwrap(), "Bearer secret");
    }
}
