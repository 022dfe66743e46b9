use std::collections::HashMap;

use nichescan_common::{CategoryScore, GapItem, Item};

use super::{pct, round1};

/// Smaller samples are not scored.
pub const CATEGORY_MIN_ITEMS: usize = 5;

const GAP_RATING: f64 = 4.0;
const LOW_COMPETITION_INSTALLS: u64 = 1_000_000;
const EXEMPLAR_MAX_RATING: f64 = 3.8;
const EXEMPLAR_MIN_INSTALLS: u64 = 50_000;
const EXEMPLAR_COUNT: usize = 3;

const QUALITY_GAP_CAP: f64 = 30.0;
const LOW_COMPETITION_CAP: f64 = 25.0;
const DEV_SPREAD_MAX: f64 = 20.0;
const DISSATISFACTION_CAP: f64 = 15.0;
const MONETIZATION_CAP: f64 = 10.0;

/// Score a category listing. `None` with fewer than five items or when
/// nothing in the sample is rated.
pub fn score_category(category: &str, items: &[Item]) -> Option<CategoryScore> {
    let total = items.len();
    if total < CATEGORY_MIN_ITEMS {
        return None;
    }

    let ratings: Vec<f64> = items.iter().filter_map(|i| i.score).collect();
    if ratings.is_empty() {
        return None;
    }
    let avg_rating = ratings.iter().sum::<f64>() / ratings.len() as f64;

    let quality_gap_pct = pct(
        ratings.iter().filter(|r| **r < GAP_RATING).count(),
        ratings.len(),
    );
    let low_competition_pct = pct(
        items
            .iter()
            .filter(|i| i.install_count() < LOW_COMPETITION_INSTALLS)
            .count(),
        total,
    );

    // Developer counts, remembering first-seen order so ties are stable.
    let mut per_developer: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        per_developer.entry(item.developer.as_str()).or_insert((0, pos)).0 += 1;
    }
    let unique_developers = per_developer.len();
    let dev_spread = unique_developers as f64 / total as f64;
    let (top_developer, top_count) = per_developer
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(dev, (count, _))| (dev.to_string(), *count))
        .unwrap_or_default();

    let paid_pct = pct(items.iter().filter(|i| !i.free).count(), total);
    let total_installs: u64 = items.iter().map(Item::install_count).sum();

    let quality_gap_points = (quality_gap_pct / 100.0 * QUALITY_GAP_CAP).min(QUALITY_GAP_CAP);
    let low_competition_points =
        (low_competition_pct / 100.0 * LOW_COMPETITION_CAP).min(LOW_COMPETITION_CAP);
    let dev_spread_points = dev_spread * DEV_SPREAD_MAX;
    let dissatisfaction_points =
        ((4.5 - avg_rating).max(0.0) / 2.0 * DISSATISFACTION_CAP).min(DISSATISFACTION_CAP);
    let monetization_points = (paid_pct * 0.5).min(MONETIZATION_CAP);

    let composite = quality_gap_points
        + low_competition_points
        + dev_spread_points
        + dissatisfaction_points
        + monetization_points;

    Some(CategoryScore {
        category: category.to_string(),
        apps_analysed: total,
        rated_apps: ratings.len(),
        avg_rating: (avg_rating * 100.0).round() / 100.0,
        quality_gap_pct: round1(quality_gap_pct),
        low_competition_pct: round1(low_competition_pct),
        unique_developers,
        dev_spread: (dev_spread * 100.0).round() / 100.0,
        paid_pct: round1(paid_pct),
        top_developer,
        top_developer_share_pct: round1(pct(top_count, total)),
        avg_installs: total_installs / total as u64,
        quality_gap_points: round1(quality_gap_points),
        low_competition_points: round1(low_competition_points),
        dev_spread_points: round1(dev_spread_points),
        dissatisfaction_points: round1(dissatisfaction_points),
        monetization_points: round1(monetization_points),
        opportunity_score: round1(composite),
        gap_apps: gap_exemplars(items),
    })
}

/// Poorly rated items that still draw installs, most installed first.
fn gap_exemplars(items: &[Item]) -> Vec<GapItem> {
    let mut gaps: Vec<&Item> = items
        .iter()
        .filter(|i| {
            i.score.is_some_and(|s| s < EXEMPLAR_MAX_RATING)
                && i.install_count() > EXEMPLAR_MIN_INSTALLS
        })
        .collect();
    gaps.sort_by(|a, b| b.install_count().cmp(&a.install_count()));

    gaps.into_iter()
        .take(EXEMPLAR_COUNT)
        .map(|i| GapItem {
            app_id: i.app_id.clone(),
            title: i.title.clone(),
            developer: i.developer.clone(),
            score: i.score.unwrap_or_default(),
            real_installs: i.install_count(),
        })
        .collect()
}
