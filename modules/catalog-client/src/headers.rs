// Browser-like request headers. The catalog fingerprints bare HTTP clients,
// so every request gets a plausible desktop/mobile browser identity.

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use crate::error::Result;
use crate::transport::{CatalogRequest, CatalogResponse, Transport};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.9,es;q=0.8",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "en-US,en;q=0.9,fr;q=0.7",
    "en,en-US;q=0.9,de;q=0.7",
];

/// A fresh set of browser navigation headers with a randomly chosen
/// user agent and accept-language.
pub fn browser_headers() -> Vec<(&'static str, &'static str)> {
    let mut rng = rand::rng();
    let user_agent = USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0]);
    let language = ACCEPT_LANGUAGES
        .choose(&mut rng)
        .copied()
        .unwrap_or(ACCEPT_LANGUAGES[0]);

    vec![
        ("User-Agent", user_agent),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", language),
        ("Accept-Encoding", "gzip, deflate"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
        ("DNT", "1"),
        ("Referer", "https://play.google.com/"),
    ]
}

/// Transport decorator that stamps browser headers onto every request,
/// leaving any header the caller already set untouched.
pub struct BrowserHeaders<T: Transport> {
    inner: T,
}

impl<T: Transport> BrowserHeaders<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for BrowserHeaders<T> {
    async fn send(&self, mut request: CatalogRequest) -> Result<CatalogResponse> {
        for (name, value) in browser_headers() {
            if !request.has_header(name) {
                request.headers.push((name.to_string(), value.to_string()));
            }
        }
        self.inner.send(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<CatalogRequest>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: CatalogRequest) -> Result<CatalogResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(CatalogResponse {
                status: 200,
                body: "{}".into(),
            })
        }
    }

    #[tokio::test]
    async fn adds_browser_identity_without_overriding_caller_headers() {
        let transport = BrowserHeaders::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });

        let req = CatalogRequest::get("https://example.com").with_header("Referer", "custom");
        transport.send(req).await.unwrap();

        let seen = transport.inner.seen.lock().unwrap();
        let sent = &seen[0];
        assert!(sent.has_header("User-Agent"));
        assert!(sent.has_header("Accept-Language"));
        let referers: Vec<_> = sent
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("referer"))
            .collect();
        assert_eq!(referers.len(), 1);
        assert_eq!(referers[0].1, "custom");
    }

    #[test]
    fn user_agent_comes_from_known_pool() {
        let headers = browser_headers();
        let ua = headers.iter().find(|(k, _)| *k == "User-Agent").unwrap().1;
        assert!(USER_AGENTS.contains(&ua));
    }
}
