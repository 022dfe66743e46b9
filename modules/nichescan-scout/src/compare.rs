//! Description vocabulary comparison between two listings.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use nichescan_common::{ComparedApp, Comparison, Item, SharedWord, WordCount};
use regex::Regex;

const TOP_SHARED: usize = 30;
const TOP_UNIQUE: usize = 20;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]{3,}").expect("word pattern is valid"));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    "the a an and or but in on at to for of is it this that with from by as are \
     was were be been being have has had do does did will would shall should may \
     might can could not no your you we our they them their its my me he she him \
     her all any each every some more most other than so very just also about up \
     out if into over after before between under again further then once here there \
     when where why how which who whom what both few many much own same such too \
     only through during above below while because until these those & app apps \
     use new get one two make like best top"
        .split_whitespace()
        .collect()
});

/// Lowercased words of three or more ASCII letters, minus stop words.
pub fn extract_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .map(String::from)
        .collect()
}

fn frequency(words: &[String]) -> HashMap<&str, usize> {
    let mut freq = HashMap::new();
    for w in words {
        *freq.entry(w.as_str()).or_insert(0) += 1;
    }
    freq
}

fn count(freq: &HashMap<&str, usize>, word: &str) -> usize {
    freq.get(word).copied().unwrap_or(0)
}

/// Highest `key` first; ties alphabetical so output is stable.
fn ranked<'a>(
    words: impl Iterator<Item = &'a str>,
    key: impl Fn(&str) -> usize,
    limit: usize,
) -> Vec<&'a str> {
    let mut words: Vec<&str> = words.collect();
    words.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.cmp(b)));
    words.truncate(limit);
    words
}

fn summarize(item: &Item, words: &[String], unique: usize) -> ComparedApp {
    ComparedApp {
        app_id: item.app_id.clone(),
        title: item.title.clone(),
        developer: item.developer.clone(),
        installs: item.installs.clone(),
        real_installs: item.install_count(),
        score: item.score.map(|s| (s * 100.0).round() / 100.0),
        ratings: item.ratings,
        released: item.released.clone(),
        genre: item.genre.clone(),
        total_words: words.len(),
        unique_words: unique,
    }
}

pub fn compare(a: &Item, b: &Item) -> Comparison {
    let words_a = extract_words(&a.description);
    let words_b = extract_words(&b.description);
    let freq_a = frequency(&words_a);
    let freq_b = frequency(&words_b);

    let shared = ranked(
        freq_a.keys().copied().filter(|w| freq_b.contains_key(w)),
        |w| count(&freq_a, w) + count(&freq_b, w),
        usize::MAX,
    );
    let only_a = ranked(
        freq_a.keys().copied().filter(|w| !freq_b.contains_key(w)),
        |w| count(&freq_a, w),
        TOP_UNIQUE,
    );
    let only_b = ranked(
        freq_b.keys().copied().filter(|w| !freq_a.contains_key(w)),
        |w| count(&freq_b, w),
        TOP_UNIQUE,
    );

    let union = freq_a.len() + freq_b.len() - shared.len();
    let overlap_pct = if union == 0 {
        0.0
    } else {
        (shared.len() as f64 / union as f64 * 1000.0).round() / 10.0
    };

    Comparison {
        app_a: summarize(a, &words_a, freq_a.len()),
        app_b: summarize(b, &words_b, freq_b.len()),
        shared_words: shared
            .iter()
            .take(TOP_SHARED)
            .map(|w| SharedWord {
                word: w.to_string(),
                count_a: count(&freq_a, w),
                count_b: count(&freq_b, w),
            })
            .collect(),
        only_a: only_a
            .iter()
            .map(|w| WordCount {
                word: w.to_string(),
                count: count(&freq_a, w),
            })
            .collect(),
        only_b: only_b
            .iter()
            .map(|w| WordCount {
                word: w.to_string(),
                count: count(&freq_b, w),
            })
            .collect(),
        overlap_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(id: &str, description: &str) -> Item {
        Item {
            app_id: id.into(),
            title: id.into(),
            developer: String::new(),
            installs: "1,000+".into(),
            real_installs: None,
            score: Some(4.123),
            genre: String::new(),
            free: true,
            price: 0.0,
            released: None,
            content_rating: String::new(),
            icon: String::new(),
            summary: String::new(),
            description: description.into(),
            ratings: 0,
            reviews: 0,
        }
    }

    #[test]
    fn words_are_lowercase_and_filtered() {
        let words = extract_words("The BEST Anime app: watch anime, AI-powered! go 4k");
        assert_eq!(words, ["anime", "watch", "anime", "powered"]);
    }

    #[test]
    fn overlap_is_shared_over_union() {
        let a = described("a", "anime streaming anime manga offline");
        let b = described("b", "anime manga reader library");
        let cmp = compare(&a, &b);

        // union: anime streaming manga offline reader library
        assert_eq!(cmp.overlap_pct, 33.3);
        assert_eq!(cmp.shared_words[0].word, "anime");
        assert_eq!(cmp.shared_words[0].count_a, 2);
        assert_eq!(cmp.shared_words[0].count_b, 1);
        let only_a: Vec<&str> = cmp.only_a.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(only_a, ["offline", "streaming"]);
        assert_eq!(cmp.app_a.total_words, 5);
        assert_eq!(cmp.app_a.unique_words, 4);
        assert_eq!(cmp.app_a.score, Some(4.12));
    }

    #[test]
    fn empty_descriptions_do_not_divide_by_zero() {
        let cmp = compare(&described("a", ""), &described("b", "the and"));
        assert_eq!(cmp.overlap_pct, 0.0);
        assert!(cmp.shared_words.is_empty());
    }

    #[test]
    fn unique_lists_are_capped() {
        let letters = |n: usize| char::from(b'a' + n as u8);
        let many: Vec<String> = (0..40)
            .map(|i| format!("zz{}{}", letters(i / 26), letters(i % 26)))
            .collect();
        let many = many.join(" ");
        let cmp = compare(&described("a", &many), &described("b", ""));
        assert_eq!(cmp.only_a.len(), TOP_UNIQUE);
    }
}
