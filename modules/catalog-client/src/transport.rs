use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CatalogError, Result};

/// Egress route for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Direct,
    Proxy(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Direct => write!(f, "direct"),
            Endpoint::Proxy(url) => write!(f, "{url}"),
        }
    }
}

/// An outbound GET against the catalog.
#[derive(Debug, Clone)]
pub struct CatalogRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub endpoint: Endpoint,
}

impl CatalogRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            endpoint: Endpoint::Direct,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone)]
pub struct CatalogResponse {
    pub status: u16,
    pub body: String,
}

impl CatalogResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to put one request on the wire. Decorators (header rotation,
/// endpoint rotation) wrap an inner transport and delegate to it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: CatalogRequest) -> Result<CatalogResponse>;

    /// Transport name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: CatalogRequest) -> Result<CatalogResponse> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// reqwest-backed transport. Keeps one client per endpoint so proxied
/// connections are pooled independently of direct ones.
pub struct HttpTransport {
    timeout: Duration,
    clients: Mutex<HashMap<Endpoint, reqwest::Client>>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, endpoint: &Endpoint) -> Result<reqwest::Client> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| CatalogError::Network("client cache poisoned".to_string()))?;

        if let Some(client) = clients.get(endpoint) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Endpoint::Proxy(url) = endpoint {
            let proxy = reqwest::Proxy::all(url.as_str())
                .map_err(|e| CatalogError::Network(format!("invalid proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build()?;
        clients.insert(endpoint.clone(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: CatalogRequest) -> Result<CatalogResponse> {
        let client = self.client_for(&request.endpoint)?;

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        tracing::debug!(url = %request.url, endpoint = %request.endpoint, status, "Catalog response");
        Ok(CatalogResponse { status, body })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = CatalogRequest::get("https://example.com").with_header("User-Agent", "x");
        assert!(req.has_header("user-agent"));
        assert!(!req.has_header("accept"));
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(Endpoint::Direct.to_string(), "direct");
        assert_eq!(
            Endpoint::Proxy("http://10.0.0.1:8080".into()).to_string(),
            "http://10.0.0.1:8080"
        );
    }

    #[test]
    fn proxy_clients_are_cached_per_endpoint() {
        let transport = HttpTransport::new(Duration::from_secs(5));
        let proxy = Endpoint::Proxy("http://127.0.0.1:3128".into());
        transport.client_for(&Endpoint::Direct).unwrap();
        transport.client_for(&proxy).unwrap();
        transport.client_for(&proxy).unwrap();
        assert_eq!(transport.clients.lock().unwrap().len(), 2);
    }
}
