use chrono::{Days, NaiveDate};
use nichescan_common::{Item, KeywordStat, NicheScore};

use super::{parse_release_date, pct, round1};

const SATURATION_INSTALLS: u64 = 10_000_000;
const GAP_RATING: f64 = 4.0;
const FRESH_WINDOW_DAYS: u64 = 365;

const DEMAND_CAP: f64 = 40.0;
const GAP_CAP: f64 = 25.0;
const FRESH_CAP: f64 = 20.0;
const SATURATION_CAP: f64 = 25.0;

/// Score a niche from its keyword demand and a sample of its listings.
///
/// Gap and freshness percentages are capped directly at their point caps.
/// The composite is floored at zero but not clamped to 100: strong demand
/// with an empty, unsaturated field can exceed it.
pub fn score_niche(
    niche: &str,
    keywords: &[KeywordStat],
    sample: &[Item],
    today: NaiveDate,
) -> Option<NicheScore> {
    if keywords.is_empty() && sample.is_empty() {
        return None;
    }

    let total_results: u64 = keywords.iter().map(|k| k.result_count as u64).sum();
    let avg_results = total_results as f64 / keywords.len().max(1) as f64;

    let n = sample.len();
    let saturated = sample
        .iter()
        .filter(|i| i.install_count() >= SATURATION_INSTALLS)
        .count();
    let low_rated = sample
        .iter()
        .filter(|i| i.score.is_some_and(|s| s < GAP_RATING))
        .count();

    let cutoff = today
        .checked_sub_days(Days::new(FRESH_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let fresh = sample
        .iter()
        .filter_map(|i| i.released.as_deref().and_then(parse_release_date))
        .filter(|d| *d >= cutoff)
        .count();

    let total_installs: u64 = sample.iter().map(Item::install_count).sum();
    let avg_installs = if n == 0 { 0 } else { total_installs / n as u64 };

    let saturation_pct = pct(saturated, n);
    let gap_pct = pct(low_rated, n);
    let freshness_pct = pct(fresh, n);

    let demand_points = (avg_results / 30.0 * DEMAND_CAP).min(DEMAND_CAP);
    let gap_points = gap_pct.min(GAP_CAP);
    let freshness_points = freshness_pct.min(FRESH_CAP);
    let saturation_penalty = (saturation_pct / 100.0 * SATURATION_CAP).min(SATURATION_CAP);

    let composite =
        (demand_points + gap_points + freshness_points + (SATURATION_CAP - saturation_penalty))
            .max(0.0);

    Some(NicheScore {
        niche: niche.to_string(),
        keyword_count: keywords.len(),
        avg_results_per_keyword: round1(avg_results),
        apps_analysed: n,
        avg_installs,
        saturation_pct: round1(saturation_pct),
        gap_pct: round1(gap_pct),
        freshness_pct: round1(freshness_pct),
        demand_points: round1(demand_points),
        gap_points: round1(gap_points),
        freshness_points: round1(freshness_points),
        saturation_penalty: round1(saturation_penalty),
        opportunity_score: round1(composite),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn item(score: Option<f64>, installs: u64, released: Option<&str>) -> Item {
        Item {
            app_id: format!("app{installs}{score:?}{released:?}"),
            title: String::new(),
            developer: String::new(),
            installs: String::new(),
            real_installs: Some(installs),
            score,
            genre: String::new(),
            free: true,
            price: 0.0,
            released: released.map(String::from),
            content_rating: String::new(),
            icon: String::new(),
            summary: String::new(),
            description: String::new(),
            ratings: 0,
            reviews: 0,
        }
    }

    fn keywords(counts: &[u32]) -> Vec<KeywordStat> {
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| KeywordStat {
                keyword: format!("kw{i}"),
                result_count: *c,
            })
            .collect()
    }

    #[test]
    fn worked_example_scores_94_2() {
        // 30 items: 12 rated below 4.0 (40%), 8 released this year (>=25%),
        // 3 with 10M+ installs (10%). Keyword demand averages 20.
        let mut sample = Vec::new();
        for i in 0..30 {
            let score = if i < 12 { Some(3.5) } else { Some(4.5) };
            let installs = if i < 3 { 50_000_000 } else { 100_000 + i };
            let released = if i < 8 { Some("Jan 10, 2026") } else { Some("Jan 10, 2020") };
            sample.push(item(score, installs, released));
        }

        let score = score_niche("Test", &keywords(&[10, 20, 30]), &sample, today()).unwrap();

        assert_eq!(score.gap_pct, 40.0);
        assert_eq!(score.saturation_pct, 10.0);
        assert_eq!(score.demand_points, 26.7);
        assert_eq!(score.saturation_penalty, 2.5);
        assert_eq!(score.opportunity_score, 94.2);
    }

    #[test]
    fn composite_can_exceed_one_hundred_never_below_zero() {
        let sample: Vec<Item> = (0..10)
            .map(|i| item(Some(2.0), 1_000 + i, Some("May 1, 2026")))
            .collect();
        let score = score_niche("Hot", &keywords(&[30, 30]), &sample, today()).unwrap();
        assert_eq!(score.opportunity_score, 110.0);

        let saturated: Vec<Item> = (0..10)
            .map(|i| item(Some(4.9), 20_000_000 + i, None))
            .collect();
        let cold = score_niche("Cold", &keywords(&[0]), &saturated, today()).unwrap();
        assert_eq!(cold.opportunity_score, 0.0);
    }

    #[test]
    fn unrated_items_are_not_gaps() {
        let sample = vec![item(None, 10, None), item(Some(3.0), 10, None)];
        let score = score_niche("X", &keywords(&[1]), &sample, today()).unwrap();
        assert_eq!(score.gap_pct, 50.0);
    }

    #[test]
    fn freshness_window_is_one_year() {
        let sample = vec![
            item(None, 1, Some("Jun 1, 2025")),
            item(None, 2, Some("May 31, 2025")),
            item(None, 3, Some("not a date")),
        ];
        let score = score_niche("X", &keywords(&[1]), &sample, today()).unwrap();
        assert_eq!(score.freshness_pct, 33.3);
    }

    #[test]
    fn no_data_is_skipped() {
        assert!(score_niche("Empty", &[], &[], today()).is_none());
    }

    #[test]
    fn keywords_without_sample_score_demand_only() {
        let score = score_niche("X", &keywords(&[15]), &[], today()).unwrap();
        assert_eq!(score.apps_analysed, 0);
        assert_eq!(score.opportunity_score, 45.0);
    }
}
