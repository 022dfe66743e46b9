pub mod error;
pub mod headers;
pub mod transport;
pub mod types;

pub use error::{CatalogError, Result};
pub use headers::{browser_headers, BrowserHeaders};
pub use transport::{CatalogRequest, CatalogResponse, Endpoint, HttpTransport, Transport};
pub use types::{CatalogApp, SearchResponse};

use serde::de::DeserializeOwned;

/// Longest body excerpt kept in `Api` and `Undecodable` errors.
const MAX_ERROR_BODY: usize = 500;

pub struct CatalogClient<T: Transport> {
    transport: T,
    base_url: String,
}

impl<T: Transport> CatalogClient<T> {
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a catalog search and return up to `n_hits` listings.
    pub async fn search(
        &self,
        query: &str,
        lang: &str,
        country: &str,
        n_hits: u32,
    ) -> Result<Vec<CatalogApp>> {
        let num = n_hits.to_string();
        let url = self.endpoint_url(
            &["api", "search"],
            &[("q", query), ("hl", lang), ("gl", country), ("num", num.as_str())],
        )?;

        let resp: SearchResponse = self.get_json(url, query).await?;
        tracing::debug!(query, count = resp.results.len(), "Catalog search complete");
        Ok(resp.results)
    }

    /// Fetch the full detail record for one app.
    pub async fn details(&self, app_id: &str, lang: &str, country: &str) -> Result<CatalogApp> {
        let url = self.endpoint_url(&["api", "apps", app_id], &[("hl", lang), ("gl", country)])?;
        self.get_json(url, app_id).await
    }

    async fn get_json<D: DeserializeOwned>(&self, url: String, target: &str) -> Result<D> {
        let resp = self.transport.send(CatalogRequest::get(url)).await?;

        if resp.status == 404 {
            return Err(CatalogError::NotFound(target.to_string()));
        }
        if !resp.is_success() {
            return Err(CatalogError::Api {
                status: resp.status,
                message: excerpt(resp.body),
            });
        }

        serde_json::from_str(&resp.body).map_err(|e| CatalogError::Undecodable {
            reason: e.to_string(),
            body: excerpt(resp.body),
        })
    }

    fn endpoint_url(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CatalogError::Parse(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Parse(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(params);
        Ok(url.to_string())
    }
}

/// Cut a response body down to `MAX_ERROR_BODY` bytes on a char boundary.
fn excerpt(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        status: u16,
        body: &'static str,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: CatalogRequest) -> Result<CatalogResponse> {
            self.urls.lock().unwrap().push(request.url);
            Ok(CatalogResponse {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    fn client(status: u16, body: &'static str) -> CatalogClient<Canned> {
        CatalogClient::new(
            Canned {
                status,
                body,
                urls: Mutex::new(Vec::new()),
            },
            "https://catalog.test/",
        )
    }

    #[tokio::test]
    async fn search_encodes_query_and_locale() {
        let c = client(200, r#"{"results":[{"appId":"a"}]}"#);
        let apps = c.search("anime & manga", "en", "us", 30).await.unwrap();

        assert_eq!(apps.len(), 1);
        let urls = c.transport().urls.lock().unwrap();
        assert_eq!(
            urls[0],
            "https://catalog.test/api/search?q=anime+%26+manga&hl=en&gl=us&num=30"
        );
    }

    #[tokio::test]
    async fn details_404_is_not_found() {
        let c = client(404, "missing");
        let err = c.details("com.gone", "en", "us").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref id) if id == "com.gone"));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let c = client(429, "Too Many Requests");
        let err = c.search("x", "en", "us", 10).await.unwrap_err();
        match err {
            CatalogError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Too Many Requests");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn html_page_with_success_status_keeps_body_excerpt() {
        let c = client(200, "<html><title>Captcha</title>unusual traffic</html>");
        let err = c.search("x", "en", "us", 10).await.unwrap_err();
        match err {
            CatalogError::Undecodable { reason, body } => {
                assert!(reason.contains("expected value"));
                assert!(body.contains("<title>Captcha</title>"));
            }
            other => panic!("expected Undecodable error, got {other:?}"),
        }
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let cut = excerpt(body);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
