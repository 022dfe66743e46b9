use std::fmt;

use serde::{Deserialize, Serialize};

// --- Request shape ---

/// Catalog locale parameters. Part of every cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    pub country: String,
    pub lang: String,
}

impl Locale {
    pub fn new(country: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            lang: lang.into(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("us", "en")
    }
}

/// What an acquisition burst is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestShape {
    GeneralTop { count: usize },
    Category { name: String, count: usize },
    NicheKeywords { niche: String },
}

impl RequestShape {
    /// Logical cache key: request shape + count + locale.
    pub fn cache_key(&self, locale: &Locale) -> String {
        match self {
            RequestShape::GeneralTop { count } => {
                format!("general_top_{count}_{}_{}", locale.country, locale.lang)
            }
            RequestShape::Category { name, count } => {
                format!("cat_{name}_{count}_{}_{}", locale.country, locale.lang)
            }
            RequestShape::NicheKeywords { niche } => {
                format!("niche_kw_{niche}_{}_{}", locale.country, locale.lang)
            }
        }
    }

    /// Logical endpoint name used for timing observations.
    pub fn endpoint_name(&self) -> String {
        match self {
            RequestShape::GeneralTop { .. } => "top".to_string(),
            RequestShape::Category { name, .. } => format!("category/{name}"),
            RequestShape::NicheKeywords { niche } => format!("niche/{niche}/keywords"),
        }
    }
}

impl fmt::Display for RequestShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestShape::GeneralTop { count } => write!(f, "general top {count}"),
            RequestShape::Category { name, count } => write!(f, "category {name} top {count}"),
            RequestShape::NicheKeywords { niche } => write!(f, "{niche} keywords"),
        }
    }
}

// --- Acquired data ---

/// A catalog listing, normalized. Once an item leaves the acquisition
/// pipeline `real_installs` is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub app_id: String,
    pub title: String,
    pub developer: String,
    /// Raw display string, e.g. "10,000,000+".
    pub installs: String,
    pub real_installs: Option<u64>,
    pub score: Option<f64>,
    pub genre: String,
    pub free: bool,
    pub price: f64,
    pub released: Option<String>,
    pub content_rating: String,
    pub icon: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub ratings: u64,
    pub reviews: u64,
}

impl Item {
    /// Derived install count, falling back to parsing the display string.
    pub fn install_count(&self) -> u64 {
        self.real_installs
            .unwrap_or_else(|| parse_installs(&self.installs))
    }

    /// Fill `real_installs` from the display string if it is missing.
    pub fn ensure_installs(&mut self) {
        if self.real_installs.is_none() {
            self.real_installs = Some(parse_installs(&self.installs));
        }
    }
}

/// Convert an installs string like "100,000,000+" to an integer.
/// Thousands separators are dropped and anything after the digit run is
/// ignored; an unparseable string yields 0.
pub fn parse_installs(raw: &str) -> u64 {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | ' ' | '\u{a0}' | '\u{202f}'))
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Result count of a fixed-size keyword probe, used as a demand proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordStat {
    pub keyword: String,
    pub result_count: u32,
}

// --- Scores ---

/// Opportunity metrics for a niche (keyword demand + sampled listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicheScore {
    pub niche: String,
    pub keyword_count: usize,
    pub avg_results_per_keyword: f64,
    pub apps_analysed: usize,
    pub avg_installs: u64,
    pub saturation_pct: f64,
    pub gap_pct: f64,
    pub freshness_pct: f64,
    pub demand_points: f64,
    pub gap_points: f64,
    pub freshness_points: f64,
    pub saturation_penalty: f64,
    pub opportunity_score: f64,
}

/// A poorly rated listing that still draws real installs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapItem {
    pub app_id: String,
    pub title: String,
    pub developer: String,
    pub score: f64,
    pub real_installs: u64,
}

/// Opportunity metrics for a category listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: String,
    pub apps_analysed: usize,
    pub rated_apps: usize,
    pub avg_rating: f64,
    pub quality_gap_pct: f64,
    pub low_competition_pct: f64,
    pub unique_developers: usize,
    pub dev_spread: f64,
    pub paid_pct: f64,
    pub top_developer: String,
    pub top_developer_share_pct: f64,
    pub avg_installs: u64,
    pub quality_gap_points: f64,
    pub low_competition_points: f64,
    pub dev_spread_points: f64,
    pub dissatisfaction_points: f64,
    pub monetization_points: f64,
    pub opportunity_score: f64,
    pub gap_apps: Vec<GapItem>,
}

/// What `score` is asked about. Niche and category names overlap
/// ("Travel" is both), so the caller says which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreSubject {
    Niche(String),
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OpportunityScore {
    Niche(NicheScore),
    Category(CategoryScore),
}

impl OpportunityScore {
    pub fn subject(&self) -> &str {
        match self {
            OpportunityScore::Niche(s) => &s.niche,
            OpportunityScore::Category(s) => &s.category,
        }
    }

    pub fn composite(&self) -> f64 {
        match self {
            OpportunityScore::Niche(s) => s.opportunity_score,
            OpportunityScore::Category(s) => s.opportunity_score,
        }
    }
}

// --- Comparison ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparedApp {
    pub app_id: String,
    pub title: String,
    pub developer: String,
    pub installs: String,
    pub real_installs: u64,
    pub score: Option<f64>,
    pub ratings: u64,
    pub released: Option<String>,
    pub genre: String,
    pub total_words: usize,
    pub unique_words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWord {
    pub word: String,
    pub count_a: usize,
    pub count_b: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Description vocabulary overlap between two listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub app_a: ComparedApp,
    pub app_b: ComparedApp,
    pub shared_words: Vec<SharedWord>,
    pub only_a: Vec<WordCount>,
    pub only_b: Vec<WordCount>,
    pub overlap_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_installs_strips_separators_and_qualifiers() {
        assert_eq!(parse_installs("100,000,000+"), 100_000_000);
        assert_eq!(parse_installs("5,000+"), 5_000);
        assert_eq!(parse_installs(" 1.000.000+ "), 1_000_000);
        assert_eq!(parse_installs("500"), 500);
    }

    #[test]
    fn parse_installs_garbage_is_zero() {
        assert_eq!(parse_installs(""), 0);
        assert_eq!(parse_installs("N/A"), 0);
        assert_eq!(parse_installs("+"), 0);
    }

    #[test]
    fn ensure_installs_keeps_existing_value() {
        let mut item = sample_item("a");
        item.installs = "1,000+".into();
        item.real_installs = Some(1_234);
        item.ensure_installs();
        assert_eq!(item.real_installs, Some(1_234));

        item.real_installs = None;
        item.ensure_installs();
        assert_eq!(item.real_installs, Some(1_000));
    }

    #[test]
    fn cache_keys_compose_shape_count_and_locale() {
        let locale = Locale::new("gb", "en");
        assert_eq!(
            RequestShape::GeneralTop { count: 100 }.cache_key(&locale),
            "general_top_100_gb_en"
        );
        assert_eq!(
            RequestShape::Category {
                name: "Games".into(),
                count: 30
            }
            .cache_key(&locale),
            "cat_Games_30_gb_en"
        );
        assert_eq!(
            RequestShape::NicheKeywords {
                niche: "Anime".into()
            }
            .cache_key(&locale),
            "niche_kw_Anime_gb_en"
        );
    }

    fn sample_item(id: &str) -> Item {
        Item {
            app_id: id.into(),
            title: id.into(),
            developer: "dev".into(),
            installs: String::new(),
            real_installs: None,
            score: None,
            genre: String::new(),
            free: true,
            price: 0.0,
            released: None,
            content_rating: String::new(),
            icon: String::new(),
            summary: String::new(),
            description: String::new(),
            ratings: 0,
            reviews: 0,
        }
    }
}
