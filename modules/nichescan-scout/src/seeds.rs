//! Query variants for listings and keyword probes for niches.

use nichescan_common::FileConfig;

const GENERAL_QUERIES: &[&str] = &[
    "top free apps",
    "popular apps 2026",
    "trending apps",
    "most downloaded apps",
    "best new apps",
    "top apps this week",
    "popular free apps",
];

const CATEGORY_QUERIES: &[(&str, &[&str])] = &[
    ("Games", &["popular games", "top free games", "trending games", "best mobile games"]),
    ("Social", &["popular social media apps", "top social apps"]),
    ("Entertainment", &["popular streaming apps", "entertainment apps", "top video apps"]),
    ("Productivity", &["popular productivity apps", "best productivity tools"]),
    (
        "Anime",
        &[
            "anime apps",
            "anime streaming",
            "anime games",
            "watch anime",
            "anime manga",
            "best anime app",
            "anime wallpaper",
            "anime drawing",
        ],
    ),
    ("Health", &["health apps", "fitness apps", "workout apps", "calorie tracker", "meditation apps"]),
    ("Finance", &["finance apps", "budget apps", "investing apps", "crypto wallet", "banking apps"]),
    ("Education", &["education apps", "learning apps", "language learning", "study apps", "online courses"]),
    ("AI", &["ai apps", "ai assistant", "ai chat", "ai image generator", "chatgpt", "ai tools"]),
    ("Crypto", &["crypto apps", "bitcoin", "cryptocurrency", "nft apps", "defi wallet", "crypto trading"]),
    ("Shopping", &["shopping apps", "online shopping", "deals apps", "coupon apps"]),
    ("Food", &["food delivery apps", "recipe apps", "cooking apps", "meal planner"]),
    ("Travel", &["travel apps", "hotel booking", "flight booking", "trip planner"]),
    ("Music", &["music apps", "music streaming", "podcast apps", "music player"]),
    ("Photography", &["photo editor", "camera apps", "photo filter", "video editor"]),
    ("Art & Design", &["art apps", "drawing apps", "design apps", "coloring apps", "sketch apps"]),
    ("Auto & Vehicles", &["car apps", "vehicle apps", "driving apps", "car maintenance", "auto insurance"]),
    ("Beauty", &["beauty apps", "makeup apps", "skincare apps", "hairstyle apps", "nail art apps"]),
    ("Books & Reference", &["ebook reader", "audiobooks", "dictionary apps", "library apps", "pdf reader"]),
    ("Business", &["business apps", "crm apps", "invoice apps", "project management", "meeting apps"]),
    ("Comics", &["comics app", "manga reader", "webtoon", "comic book reader", "webcomic apps"]),
    ("Communication", &["messaging apps", "chat apps", "video call apps", "email apps", "walkie talkie"]),
    ("Dating", &["dating apps", "matchmaking apps", "relationship apps", "singles apps"]),
    ("Events", &["event apps", "ticketing apps", "event planner", "concert apps", "meetup apps"]),
    ("House & Home", &["home design apps", "interior design", "real estate apps", "smart home", "furniture apps"]),
    ("Libraries & Demo", &["demo apps", "library apps", "sample apps", "developer tools"]),
    ("Lifestyle", &["lifestyle apps", "daily routine", "horoscope apps", "journal apps", "quotes apps"]),
    ("Maps & Navigation", &["maps apps", "gps navigation", "offline maps", "traffic apps", "compass apps"]),
    ("Medical", &["medical apps", "symptom checker", "pill reminder", "doctor apps", "telehealth apps"]),
    ("News & Magazines", &["news apps", "breaking news", "magazine apps", "newspaper apps", "rss reader"]),
    ("Parenting", &["parenting apps", "baby tracker", "pregnancy apps", "kids safety", "family apps"]),
    ("Personalization", &["wallpaper apps", "launcher apps", "icon packs", "widget apps", "theme apps"]),
    ("Sports", &["sports apps", "live scores", "fantasy sports", "sports news", "workout tracker"]),
    ("Tools", &["utility apps", "file manager", "calculator apps", "flashlight", "qr scanner"]),
    ("Video Players", &["video player", "media player", "movie apps", "streaming player", "video downloader"]),
    ("Weather", &["weather apps", "weather forecast", "weather radar", "storm tracker", "weather widget"]),
];

const NICHE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Anime",
        &[
            "anime",
            "anime streaming",
            "anime games",
            "anime wallpaper",
            "anime drawing",
            "anime manga",
            "watch anime free",
            "anime avatar maker",
            "anime music",
            "anime chat",
            "anime tv",
            "anime rpg",
            "crunchyroll",
            "funimation",
            "anime stickers",
            "manga reader",
            "anime filter",
            "anime photo editor",
            "anime quiz",
            "anime radio",
        ],
    ),
    (
        "Health & Fitness",
        &[
            "fitness tracker",
            "workout planner",
            "yoga app",
            "calorie counter",
            "step counter",
            "home workout",
            "gym tracker",
            "meditation",
            "sleep tracker",
            "running app",
            "diet plan",
            "fasting app",
            "mental health",
            "habit tracker",
            "water reminder",
        ],
    ),
    (
        "Finance & Crypto",
        &[
            "budget tracker",
            "expense manager",
            "investing app",
            "stock trading",
            "crypto wallet",
            "bitcoin",
            "tax calculator",
            "savings app",
            "money transfer",
            "credit score",
            "personal finance",
            "defi",
            "nft marketplace",
            "forex trading",
            "payment app",
        ],
    ),
    (
        "AI Tools",
        &[
            "ai assistant",
            "chatgpt",
            "ai image generator",
            "ai art",
            "ai writing",
            "ai chat",
            "ai photo editor",
            "ai voice",
            "ai translate",
            "ai homework",
            "ai music",
            "text to image",
            "ai avatar",
            "ai video",
            "ai keyboard",
        ],
    ),
    (
        "Education",
        &[
            "language learning",
            "math solver",
            "flashcards",
            "online courses",
            "coding app",
            "kids learning",
            "dictionary",
            "ebook reader",
            "study planner",
            "exam preparation",
            "typing tutor",
            "science app",
            "quiz app",
            "homework help",
            "audiobooks",
        ],
    ),
    (
        "Food & Cooking",
        &[
            "recipe app",
            "meal planner",
            "food delivery",
            "cooking timer",
            "calorie tracker",
            "grocery list",
            "restaurant finder",
            "keto recipes",
            "vegan recipes",
            "baking app",
            "cocktail recipes",
            "food scanner",
            "diet app",
            "intermittent fasting",
            "nutrition",
        ],
    ),
    (
        "Travel",
        &[
            "flight booking",
            "hotel booking",
            "travel planner",
            "maps offline",
            "translate app",
            "currency converter",
            "packing list",
            "road trip",
            "vacation rental",
            "city guide",
            "travel insurance",
            "train tickets",
            "camping app",
            "hiking trails",
            "scuba diving",
        ],
    ),
    (
        "Photography",
        &[
            "photo editor",
            "camera filter",
            "collage maker",
            "video editor",
            "photo to cartoon",
            "background remover",
            "photo frame",
            "slow motion video",
            "time lapse",
            "panorama",
            "photo recovery",
            "watermark app",
            "meme maker",
            "gif maker",
            "screen recorder",
        ],
    ),
    (
        "Music",
        &[
            "music player",
            "music streaming",
            "podcast app",
            "radio app",
            "karaoke app",
            "music maker",
            "beat maker",
            "guitar tuner",
            "piano app",
            "dj app",
            "lyrics app",
            "music downloader",
            "ringtone maker",
            "sound effects",
            "audiobook app",
        ],
    ),
];

type SeedList = Vec<(String, Vec<String>)>;

fn owned(table: &[(&str, &[&str])]) -> SeedList {
    table
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

/// Replace an entry of the same name in place, or append.
fn upsert(list: &mut SeedList, name: &str, values: Vec<String>) {
    match list.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = values,
        None => list.push((name.to_string(), values)),
    }
}

/// Ordered seed registry: built-ins plus custom entries from the config file.
#[derive(Debug, Clone)]
pub struct Seeds {
    general: Vec<String>,
    categories: SeedList,
    niches: SeedList,
}

impl Default for Seeds {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Seeds {
    pub fn builtin() -> Self {
        Self {
            general: GENERAL_QUERIES.iter().map(|q| q.to_string()).collect(),
            categories: owned(CATEGORY_QUERIES),
            niches: owned(NICHE_KEYWORDS),
        }
    }

    pub fn with_custom(mut self, file: &FileConfig) -> Self {
        for category in &file.categories {
            upsert(&mut self.categories, &category.name, category.queries.clone());
        }
        for niche in &file.niches {
            upsert(&mut self.niches, &niche.name, niche.keywords.clone());
        }
        self
    }

    pub fn general_queries(&self) -> &[String] {
        &self.general
    }

    /// Query variants for a category; empty when unknown.
    pub fn category_queries(&self, name: &str) -> &[String] {
        lookup(&self.categories, name)
    }

    /// Keyword probes for a niche; empty when unknown.
    pub fn niche_keywords(&self, name: &str) -> &[String] {
        lookup(&self.niches, name)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(n, _)| n.as_str())
    }

    pub fn niches(&self) -> impl Iterator<Item = &str> {
        self.niches.iter().map(|(n, _)| n.as_str())
    }

    /// Built-in category whose name contains, or is contained in, `niche`
    /// (case-insensitive). First match in built-in order wins.
    ///
    /// Heuristic: "Health & Fitness" matches "Health", but "AI Tools" also
    /// matches "AI" by accident of substring, and a niche named "Art" would
    /// hit "Art & Design" before anything else.
    pub fn match_category(&self, niche: &str) -> Option<&'static str> {
        let needle = niche.to_lowercase();
        CATEGORY_QUERIES
            .iter()
            .map(|(name, _)| *name)
            .find(|name| {
                let candidate = name.to_lowercase();
                needle.contains(&candidate) || candidate.contains(&needle)
            })
    }
}

fn lookup<'a>(list: &'a SeedList, name: &str) -> &'a [String] {
    list.iter()
        .find(|(n, _)| n == name)
        .map(|(_, values)| values.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nichescan_common::{CustomCategory, CustomNiche};

    #[test]
    fn builtin_tables_have_expected_shape() {
        let seeds = Seeds::builtin();
        assert_eq!(seeds.general_queries().len(), 7);
        assert_eq!(seeds.categories().count(), 36);
        assert_eq!(seeds.niches().count(), 9);
        assert_eq!(seeds.niche_keywords("Anime").len(), 20);
        assert_eq!(seeds.categories().next(), Some("Games"));
    }

    #[test]
    fn unknown_names_yield_no_queries() {
        let seeds = Seeds::builtin();
        assert!(seeds.category_queries("Nope").is_empty());
        assert!(seeds.niche_keywords("Nope").is_empty());
    }

    #[test]
    fn custom_entries_replace_same_name_and_append_new() {
        let file = FileConfig {
            categories: vec![CustomCategory {
                name: "Games".into(),
                queries: vec!["indie games".into()],
            }],
            niches: vec![CustomNiche {
                name: "Retro Gaming".into(),
                keywords: vec!["emulator".into()],
            }],
            ..FileConfig::default()
        };
        let seeds = Seeds::builtin().with_custom(&file);

        assert_eq!(seeds.category_queries("Games"), ["indie games".to_string()]);
        assert_eq!(seeds.categories().next(), Some("Games"), "order preserved");
        assert_eq!(seeds.niches().last(), Some("Retro Gaming"));
    }

    #[test]
    fn category_match_is_substring_either_direction() {
        let seeds = Seeds::builtin();
        assert_eq!(seeds.match_category("Health & Fitness"), Some("Health"));
        assert_eq!(seeds.match_category("anime"), Some("Anime"));
        assert_eq!(seeds.match_category("Finance & Crypto"), Some("Finance"));
        assert_eq!(seeds.match_category("Retro Gaming"), None);
    }

    #[test]
    fn category_match_is_ambiguous_for_short_names() {
        // "AI Tools" contains "AI" but also "Tools"; built-in order decides.
        let seeds = Seeds::builtin();
        assert_eq!(seeds.match_category("AI Tools"), Some("AI"));
    }
}
