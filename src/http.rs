use std::time::Duration;

use async_trait::async_trait;

use crate::error::HttpError;

/// Browser UA; several vendor endpoints answer differently to bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// URL after redirects; equals the request URL when none happened.
    pub final_url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Injectable network boundary. Strategies only ever need a GET with the
/// body and a redirect-following HEAD, so that is the whole surface.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;

    /// HEAD with redirects followed; `body` is empty.
    async fn head(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// How a CORS-bypass proxy expects its target and returns its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// Target URL-encoded into a query parameter; payload wrapped in a
    /// `{"contents": "..."}` JSON envelope (allorigins style).
    JsonEnvelope,
    /// Target appended verbatim; payload passed through untouched.
    Prefix,
}

#[derive(Debug, Clone)]
pub struct Proxy {
    pub base: String,
    pub mode: ProxyMode,
}

impl Proxy {
    pub fn new(base: impl Into<String>, mode: ProxyMode) -> Self {
        Self {
            base: base.into(),
            mode,
        }
    }

    /// Build the proxied request URL for `target`.
    pub fn wrap(&self, target: &str) -> String {
        match self.mode {
            ProxyMode::JsonEnvelope => {
                format!("{}{}", self.base, urlencoding::encode(target))
            }
            ProxyMode::Prefix => format!("{}{}", self.base, target),
        }
    }

    /// Recover the relayed payload from a proxy response body.
    /// `None` when the envelope is missing or empty.
    pub fn unwrap_body(&self, body: &str) -> Option<String> {
        match self.mode {
            ProxyMode::JsonEnvelope => {
                let envelope: serde_json::Value = serde_json::from_str(body).ok()?;
                envelope
                    .get("contents")
                    .and_then(|c| c.as_str())
                    .filter(|c| !c.trim().is_empty())
                    .map(str::to_string)
            }
            ProxyMode::Prefix => Some(body.to_string()),
        }
    }
}

/// Production transport over reqwest. Redirects are followed by the client,
/// which is what the redirect-probe strategy relies on.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| HttpError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            final_url,
            body,
        })
    }

    async fn head(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| HttpError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
            body: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_proxy_encodes_target() {
        let proxy = Proxy::new("https://relay.example/get?url=", ProxyMode::JsonEnvelope);
        let wrapped = proxy.wrap("https://api.mercadolibre.com/items/MLB123?x=1");
        assert!(wrapped.starts_with("https://relay.example/get?url=https%3A%2F%2F"));
        assert!(!wrapped.contains("items/MLB123"));
    }

    #[test]
    fn prefix_proxy_appends_verbatim() {
        let proxy = Proxy::new("https://relay.example/", ProxyMode::Prefix);
        assert_eq!(
            proxy.wrap("https://a.b/c"),
            "https://relay.example/https://a.b/c"
        );
    }

    #[test]
    fn envelope_body_unwraps_contents() {
        let proxy = Proxy::new("https://relay.example/get?url=", ProxyMode::JsonEnvelope);
        let body = r#"{"contents": "<html>hi</html>", "status": {"http_code": 200}}"#;
        assert_eq!(proxy.unwrap_body(body).as_deref(), Some("<html>hi</html>"));
    }

    #[test]
    fn empty_envelope_is_none() {
        let proxy = Proxy::new("https://relay.example/get?url=", ProxyMode::JsonEnvelope);
        assert!(proxy.unwrap_body(r#"{"contents": "  "}"#).is_none());
        assert!(proxy.unwrap_body("not json").is_none());
    }

    #[test]
    fn prefix_body_passes_through() {
        let proxy = Proxy::new("https://relay.example/", ProxyMode::Prefix);
        assert_eq!(proxy.unwrap_body("raw").as_deref(), Some("raw"));
    }
}
