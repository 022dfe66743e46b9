use serde::{Deserialize, Serialize};

/// A single catalog entry as returned by the search and detail endpoints.
/// Search results carry a subset of these fields; details fill in the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogApp {
    pub app_id: String,
    pub title: String,
    pub developer: String,
    /// Display string such as "1,000,000+".
    pub installs: String,
    pub real_installs: Option<u64>,
    pub score: Option<f64>,
    pub genre: String,
    #[serde(default = "default_free")]
    pub free: bool,
    pub price: f64,
    /// Release date in the catalog's display format, e.g. "Mar 14, 2025".
    pub released: Option<String>,
    pub content_rating: String,
    pub icon: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub ratings: u64,
    pub reviews: u64,
    pub last_updated_on: Option<String>,
    pub version: Option<String>,
    pub developer_email: Option<String>,
    pub developer_website: Option<String>,
    pub header_image: Option<String>,
    pub screenshots: Vec<String>,
    pub histogram: Vec<u64>,
}

fn default_free() -> bool {
    true
}

/// Envelope for the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<CatalogApp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_listing_with_sparse_fields_deserializes() {
        let body = r#"{"results":[{"appId":"com.example.one","title":"One","installs":"5,000+"}]}"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();

        assert_eq!(resp.results.len(), 1);
        let app = &resp.results[0];
        assert_eq!(app.app_id, "com.example.one");
        assert_eq!(app.installs, "5,000+");
        assert!(app.free, "free defaults to true when absent");
        assert!(app.real_installs.is_none());
        assert!(app.score.is_none());
    }

    #[test]
    fn missing_results_key_is_empty() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.results.is_empty());
    }
}
