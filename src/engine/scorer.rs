//! Frecency scoring and ranking.
//!
//! Scores combine how often a candidate was picked with how recently, using
//! fixed decay buckets rather than a continuous curve:
//!
//! | age of a selection | weight |
//! |--------------------|--------|
//! | ≤ 3 hours          | 100    |
//! | ≤ 1 day            | 80     |
//! | ≤ 3 days           | 60     |
//! | ≤ 7 days           | 30     |
//! | ≤ 14 days          | 10     |
//! | older              | 0      |
//!
//! ```text
//! base_score = times_selected × mean(weight(t) for t in selected_at)
//! ```
//!
//! The base score is then scaled by how well the stored history matches the
//! current query; see [`MatchTier`].

use crate::storage::FrecencyData;

/// Milliseconds per hour.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Milliseconds per day.
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Upper age bound (inclusive) and weight of each decay bucket, most recent first.
const DECAY_BUCKETS: [(i64, f64); 5] = [
    (3 * HOUR_MS, 100.0),
    (DAY_MS, 80.0),
    (3 * DAY_MS, 60.0),
    (7 * DAY_MS, 30.0),
    (14 * DAY_MS, 10.0),
];

/// Weight of a single selection that happened `age_ms` ago.
///
/// Timestamps from the future (negative age) count as fresh.
///
/// # Examples
///
/// ```
/// use frecent::engine::scorer::{decay_weight, DAY_MS, HOUR_MS};
///
/// assert_eq!(decay_weight(2 * HOUR_MS), 100.0);
/// assert_eq!(decay_weight(2 * DAY_MS), 60.0);
/// assert_eq!(decay_weight(20 * DAY_MS), 0.0);
/// ```
#[must_use]
pub fn decay_weight(age_ms: i64) -> f64 {
    DECAY_BUCKETS
        .iter()
        .find(|(max_age, _)| age_ms <= *max_age)
        .map_or(0.0, |(_, weight)| *weight)
}

/// Time-decayed frequency score of one selection record.
///
/// Returns `0.0` for an empty timestamp sequence.
#[must_use]
pub fn base_score(times_selected: u32, selected_at: &[i64], now: i64) -> f64 {
    if selected_at.is_empty() {
        return 0.0;
    }

    let total: f64 = selected_at.iter().map(|&t| decay_weight(now.saturating_sub(t))).sum();

    #[allow(clippy::cast_precision_loss)]
    let mean = total / selected_at.len() as f64;

    f64::from(times_selected) * mean
}

/// Which part of the history produced a candidate's score.
///
/// Tiers are tried in declaration order and the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    /// Selected before under exactly this query.
    Exact,
    /// Selected under a longer stored query that starts with this one.
    SubQuery,
    /// Selected before, under unrelated queries.
    IdOnly,
    /// Never selected (or evicted).
    None,
}

impl MatchTier {
    /// Factor applied to the base score for this tier.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::SubQuery => 0.75,
            Self::IdOnly => 0.5,
            Self::None => 0.0,
        }
    }
}

/// A candidate's frecency score and the tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Final score (base score × tier multiplier).
    pub value: f64,
    /// Tier the score came from.
    pub tier: MatchTier,
}

impl Score {
    const NONE: Self = Self {
        value: 0.0,
        tier: MatchTier::None,
    };

    fn from_tier(tier: MatchTier, times_selected: u32, selected_at: &[i64], now: i64) -> Self {
        Self {
            value: tier.multiplier() * base_score(times_selected, selected_at, now),
            tier,
        }
    }
}

/// A ranked candidate with its score attached for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    /// The candidate, unchanged.
    pub item: T,
    /// Its frecency score.
    pub score: f64,
    /// Tier the score came from.
    pub tier: MatchTier,
}

/// Read-only scorer over a frecency snapshot at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    data: &'a FrecencyData,
    now: i64,
}

impl<'a> Scorer<'a> {
    /// Creates a scorer evaluating ages relative to `now` (Unix milliseconds).
    #[must_use]
    pub const fn new(data: &'a FrecencyData, now: i64) -> Self {
        Self { data, now }
    }

    /// Scores candidate `id` for `query`.
    ///
    /// Lookup order:
    ///
    /// 1. the selection recorded under `query` itself
    /// 2. the selection recorded under the lexicographically smallest stored
    ///    query that `query` is a prefix of
    /// 3. the id's totals across all queries
    #[must_use]
    pub fn score(&self, query: &str, id: &str) -> Score {
        if let Some(selection) = self
            .data
            .queries
            .get(query)
            .and_then(|entries| entries.iter().find(|s| s.id == id))
        {
            return Score::from_tier(MatchTier::Exact, selection.times_selected, &selection.selected_at, self.now);
        }

        let sub_query = self
            .data
            .queries
            .with_prefix(query)
            .filter(|(stored, _)| *stored != query)
            .find_map(|(_, entries)| entries.iter().find(|s| s.id == id));
        if let Some(selection) = sub_query {
            return Score::from_tier(MatchTier::SubQuery, selection.times_selected, &selection.selected_at, self.now);
        }

        if let Some(selection) = self.data.selections.get(id) {
            return Score::from_tier(MatchTier::IdOnly, selection.times_selected, &selection.selected_at, self.now);
        }

        Score::NONE
    }

    /// Orders `candidates` for `query` by frecency.
    ///
    /// Candidates with a positive score come first, highest score first; equal
    /// scores keep their input order. Candidates scoring zero follow in their
    /// original (upstream) order. `id_of` returning `None` scores zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use frecent::engine::Scorer;
    /// use frecent::storage::{FrecencyData, Limits};
    ///
    /// let mut data = FrecencyData::new();
    /// data.register_selection("x", "b", 0, Limits::default());
    ///
    /// let ranked = Scorer::new(&data, 0).rank("x", vec!["a", "b"], |c| Some(*c));
    /// let order: Vec<&str> = ranked.iter().map(|s| s.item).collect();
    /// assert_eq!(order, vec!["b", "a"]);
    /// ```
    pub fn rank<T, F>(&self, query: &str, candidates: Vec<T>, id_of: F) -> Vec<Scored<T>>
    where
        F: Fn(&T) -> Option<&str>,
    {
        let _span = tracing::debug_span!("rank", query = %query, candidates = candidates.len()).entered();

        let scored: Vec<Scored<T>> = candidates
            .into_iter()
            .map(|item| {
                let score = id_of(&item).map_or(Score::NONE, |id| self.score(query, id));
                Scored {
                    item,
                    score: score.value,
                    tier: score.tier,
                }
            })
            .collect();

        let (mut ranked, unscored): (Vec<_>, Vec<_>) = scored.into_iter().partition(|s| s.score > 0.0);
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(scored = ranked.len(), unscored = unscored.len(), "ranked candidates");

        ranked.extend(unscored);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Limits;

    const NOW: i64 = 1_700_000_000_000;

    fn record(data: &mut FrecencyData, query: &str, id: &str, at: i64) {
        data.register_selection(query, id, at, Limits::default());
    }

    #[test]
    fn decay_buckets_are_inclusive_upper_bounds() {
        assert_eq!(decay_weight(-5), 100.0);
        assert_eq!(decay_weight(0), 100.0);
        assert_eq!(decay_weight(3 * HOUR_MS), 100.0);
        assert_eq!(decay_weight(3 * HOUR_MS + 1), 80.0);
        assert_eq!(decay_weight(DAY_MS), 80.0);
        assert_eq!(decay_weight(3 * DAY_MS), 60.0);
        assert_eq!(decay_weight(7 * DAY_MS), 30.0);
        assert_eq!(decay_weight(14 * DAY_MS), 10.0);
        assert_eq!(decay_weight(14 * DAY_MS + 1), 0.0);
    }

    #[test]
    fn base_score_scales_mean_weight_by_frequency() {
        assert_eq!(base_score(1, &[NOW - 2 * HOUR_MS], NOW), 100.0);
        assert_eq!(base_score(3, &[NOW - 2 * HOUR_MS], NOW), 300.0);
        assert_eq!(base_score(2, &[NOW - 2 * DAY_MS], NOW), 120.0);
        assert_eq!(base_score(4, &[NOW - 20 * DAY_MS], NOW), 0.0);
        assert_eq!(base_score(2, &[NOW - 2 * HOUR_MS, NOW - 2 * DAY_MS], NOW), 160.0);
        assert_eq!(base_score(5, &[], NOW), 0.0);
    }

    #[test]
    fn base_score_saturates_ages_far_from_now() {
        assert_eq!(base_score(3, &[i64::MIN], NOW), 0.0);
        assert_eq!(base_score(3, &[i64::MAX], NOW), 300.0);
        assert_eq!(base_score(1, &[NOW], i64::MIN), 100.0);
    }

    #[test]
    fn exact_match_wins_over_other_tiers() {
        let mut data = FrecencyData::new();
        record(&mut data, "shoes", "p1", NOW);
        record(&mut data, "shoes box", "p1", NOW);

        let score = Scorer::new(&data, NOW).score("shoes", "p1");
        assert_eq!(score.tier, MatchTier::Exact);
        assert_eq!(score.value, 100.0);
    }

    #[test]
    fn shorter_query_falls_back_to_stored_longer_query() {
        let mut data = FrecencyData::new();
        record(&mut data, "shoes", "p1", NOW);

        let scorer = Scorer::new(&data, NOW);
        let hit = scorer.score("sho", "p1");
        assert_eq!(hit.tier, MatchTier::SubQuery);
        assert_eq!(hit.value, 75.0);

        assert_eq!(scorer.score("sho", "p2").tier, MatchTier::None);
    }

    #[test]
    fn longer_query_does_not_match_stored_prefix() {
        let mut data = FrecencyData::new();
        record(&mut data, "sho", "p1", NOW);

        let score = Scorer::new(&data, NOW).score("shoes", "p1");
        assert_eq!(score.tier, MatchTier::IdOnly);
        assert_eq!(score.value, 50.0);
    }

    #[test]
    fn sub_query_tie_break_is_lexicographic() {
        let mut data = FrecencyData::new();
        record(&mut data, "shoes red", "p1", NOW - 2 * DAY_MS);
        record(&mut data, "shoes blue", "p1", NOW);

        let score = Scorer::new(&data, NOW).score("shoes", "p1");
        assert_eq!(score.tier, MatchTier::SubQuery);
        assert_eq!(score.value, 75.0);
    }

    #[test]
    fn sub_query_skips_stored_queries_without_the_candidate() {
        let mut data = FrecencyData::new();
        record(&mut data, "shoes a", "other", NOW);
        record(&mut data, "shoes b", "p1", NOW - 2 * DAY_MS);

        let score = Scorer::new(&data, NOW).score("shoes", "p1");
        assert_eq!(score.tier, MatchTier::SubQuery);
        assert_eq!(score.value, 45.0);
    }

    #[test]
    fn unrelated_query_uses_id_totals() {
        let mut data = FrecencyData::new();
        record(&mut data, "red shoes", "p1", NOW);

        let score = Scorer::new(&data, NOW).score("blue shoes", "p1");
        assert_eq!(score.tier, MatchTier::IdOnly);
        assert_eq!(score.value, 50.0);
    }

    #[test]
    fn rank_puts_scored_first_and_keeps_upstream_order_for_the_rest() {
        let mut data = FrecencyData::new();
        record(&mut data, "x", "a", NOW);
        record(&mut data, "x", "a", NOW);
        record(&mut data, "x", "b", NOW);

        let ranked = Scorer::new(&data, NOW).rank("x", vec!["d", "b", "c", "a"], |c| Some(*c));
        let order: Vec<&str> = ranked.iter().map(|s| s.item).collect();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
        assert_eq!(ranked[0].score, 200.0);
        assert_eq!(ranked[1].score, 100.0);
        assert_eq!(ranked[2].tier, MatchTier::None);
    }

    #[test]
    fn rank_is_stable_for_equal_scores() {
        let mut data = FrecencyData::new();
        for id in ["a", "b", "c"] {
            record(&mut data, "x", id, NOW);
        }

        let ranked = Scorer::new(&data, NOW).rank("x", vec!["c", "a", "b"], |c| Some(*c));
        let order: Vec<&str> = ranked.iter().map(|s| s.item).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn rank_treats_missing_ids_as_unscored() {
        let mut data = FrecencyData::new();
        record(&mut data, "x", "a", NOW);

        let candidates = vec![None, Some("a")];
        let ranked = Scorer::new(&data, NOW).rank("x", candidates, |c| *c);
        assert_eq!(ranked[0].item, Some("a"));
        assert_eq!(ranked[1].item, None);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn history_older_than_two_weeks_scores_zero() {
        let mut data = FrecencyData::new();
        record(&mut data, "x", "old", NOW - 20 * DAY_MS);

        let ranked = Scorer::new(&data, NOW).rank("x", vec!["new", "old"], |c| Some(*c));
        let order: Vec<&str> = ranked.iter().map(|s| s.item).collect();
        assert_eq!(order, vec!["new", "old"]);
        assert_eq!(ranked[1].tier, MatchTier::Exact);
    }
}
