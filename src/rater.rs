//! Skill models used to value players and groups.
//!
//! This module defines the [`Rater`] trait and the built-in models:
//! - [`LogisticRegressionRater`]: statistical model over kill/death ratio, playtime and score.
//! - [`FixedRater`]: ratings supplied directly by the host (ELO tables, tests).
//! - [`RandomRater`]: seeded random baseline, useful to exercise the search on its own.
//!
//! The search only ever sees numbers produced by a rater: per-player ratings summed into group
//! ratings, and a rating-gap tolerance obtained from [`Rater::probability_to_rating_gap`], so it
//! never has to reason about probabilities itself.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use crate::player::PlayerId;

/// A pluggable scoring and win-probability model.
///
/// Ratings must stay constant for the duration of a balancing run.
pub trait Rater: Send + Sync {
    /// Rating of a single player. Players without data get a fallback rating, never an error.
    fn rate(&self, player: &PlayerId) -> f64;

    /// Aggregate rating of a set of players.
    ///
    /// Only used to order groups in the heuristic; it does not have to equal the sum of
    /// [`rate`](Rater::rate) over the members.
    fn rate_group(&self, players: &[PlayerId]) -> f64;

    /// Probability that `side_a` beats `side_b`, in `(0, 1)`.
    ///
    /// Implementations must keep `win_probability(a, b) == 1 - win_probability(b, a)`.
    fn win_probability(&self, side_a: &[PlayerId], side_b: &[PlayerId]) -> f64;

    /// Translates an acceptable win probability into the allowed per-player rating gap.
    fn probability_to_rating_gap(&self, probability: f64) -> f64;

    /// Replaces the rating given to players without data. Raters without one ignore it.
    fn set_fallback_rating(&mut self, _rating: f64) {}
}

/// Statistics of a single player as returned by the stats provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerStats {
    /// Kill/death ratio.
    pub kdr: f64,
    /// Total playtime, in seconds.
    pub play_time: f64,
    /// Aggregate score.
    pub total_score: f64,
}

impl PlayerStats {
    fn mean<'a>(stats: impl IntoIterator<Item = &'a PlayerStats>) -> Option<PlayerStats> {
        let mut total = PlayerStats::default();
        let mut count = 0usize;
        for s in stats {
            total.kdr += s.kdr;
            total.play_time += s.play_time;
            total.total_score += s.total_score;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(PlayerStats {
            kdr: total.kdr / n,
            play_time: total.play_time / n,
            total_score: total.total_score / n,
        })
    }
}

// Fitted on historical match outcomes, applied to the difference of two stat vectors.
const INTERCEPT: f64 = 1.071732e-2;
const KDR_COEFFICIENT: f64 = 4.181450;
const PLAY_TIME_COEFFICIENT: f64 = 9.575052e-7;
const SCORE_COEFFICIENT: f64 = 7.053987e-5;

/// Rating used by default for players without statistics.
pub const DEFAULT_FALLBACK_RATING: f64 = 0.5;

/// Logistic regression over the difference between two stat vectors.
///
/// A player's rating is the modelled probability that they beat the server average, so ratings
/// live in `(0, 1)` and `0.5` is an average player.
#[derive(Debug, Clone)]
pub struct LogisticRegressionRater {
    stats: HashMap<PlayerId, PlayerStats>,
    server_average: PlayerStats,
    fallback_rating: f64,
}

impl LogisticRegressionRater {
    /// Creates a rater from the statistics known for this match.
    pub fn new(stats: HashMap<PlayerId, PlayerStats>) -> Self {
        let server_average = PlayerStats::mean(stats.values()).unwrap_or_default();
        Self {
            stats,
            server_average,
            fallback_rating: DEFAULT_FALLBACK_RATING,
        }
    }

    /// Sets the rating given to players without statistics.
    #[must_use]
    pub fn with_fallback_rating(self, fallback_rating: f64) -> Self {
        Self {
            fallback_rating,
            ..self
        }
    }

    /// Mean statistics over the whole server.
    pub fn server_average(&self) -> PlayerStats {
        self.server_average
    }

    fn average_of(&self, players: &[PlayerId]) -> Option<PlayerStats> {
        PlayerStats::mean(players.iter().filter_map(|id| {
            let stats = self.stats.get(id);
            if stats.is_none() {
                trace!("missing stats for {id}");
            }
            stats
        }))
    }

    fn formula(a: &PlayerStats, b: &PlayerStats) -> f64 {
        let z = INTERCEPT
            + KDR_COEFFICIENT * (a.kdr - b.kdr)
            + PLAY_TIME_COEFFICIENT * (a.play_time - b.play_time)
            + SCORE_COEFFICIENT * (a.total_score - b.total_score);
        1.0 / (1.0 + (-z).exp())
    }
}

impl Rater for LogisticRegressionRater {
    fn rate(&self, player: &PlayerId) -> f64 {
        match self.stats.get(player) {
            Some(stats) => Self::formula(stats, &self.server_average),
            None => {
                trace!("missing stats for {player}, using fallback rating");
                self.fallback_rating
            }
        }
    }

    fn rate_group(&self, players: &[PlayerId]) -> f64 {
        self.average_of(players)
            .map(|avg| Self::formula(&avg, &self.server_average))
            .unwrap_or(self.fallback_rating)
    }

    fn win_probability(&self, side_a: &[PlayerId], side_b: &[PlayerId]) -> f64 {
        let a = self.average_of(side_a).unwrap_or(self.server_average);
        let b = self.average_of(side_b).unwrap_or(self.server_average);
        // The intercept makes the raw model slightly asymmetric; average both directions.
        0.5 * (Self::formula(&a, &b) + 1.0 - Self::formula(&b, &a))
    }

    fn probability_to_rating_gap(&self, probability: f64) -> f64 {
        (probability - 0.5).max(0.0)
    }

    fn set_fallback_rating(&mut self, rating: f64) {
        self.fallback_rating = rating;
    }
}

/// Ratings supplied directly by the host.
///
/// Win probability is a logistic curve over the difference of mean ratings, divided by `scale`.
#[derive(Debug, Clone)]
pub struct FixedRater {
    ratings: HashMap<PlayerId, f64>,
    fallback_rating: f64,
    scale: f64,
}

impl FixedRater {
    /// Creates a rater from a rating table. Unknown players get `fallback_rating`.
    pub fn new(ratings: HashMap<PlayerId, f64>, fallback_rating: f64) -> Self {
        Self {
            ratings,
            fallback_rating,
            scale: 1.0,
        }
    }

    /// Sets the rating difference that corresponds to one logit of win probability.
    #[must_use]
    pub fn with_scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    fn mean(&self, players: &[PlayerId]) -> f64 {
        if players.is_empty() {
            return self.fallback_rating;
        }
        players.iter().map(|p| self.rate(p)).sum::<f64>() / players.len() as f64
    }
}

impl Rater for FixedRater {
    fn rate(&self, player: &PlayerId) -> f64 {
        self.ratings
            .get(player)
            .copied()
            .unwrap_or(self.fallback_rating)
    }

    fn rate_group(&self, players: &[PlayerId]) -> f64 {
        self.mean(players)
    }

    fn win_probability(&self, side_a: &[PlayerId], side_b: &[PlayerId]) -> f64 {
        let diff = (self.mean(side_a) - self.mean(side_b)) / self.scale;
        1.0 / (1.0 + (-diff).exp())
    }

    fn probability_to_rating_gap(&self, probability: f64) -> f64 {
        // The normalized search gap compares side A's mean to the overall mean, which is half
        // of the difference between the two sides' means.
        let logit = (probability / (1.0 - probability)).ln();
        (self.scale * logit / 2.0).max(0.0)
    }

    fn set_fallback_rating(&mut self, rating: f64) {
        self.fallback_rating = rating;
    }
}

/// Random baseline: uniform ratings in `[0, 1)` and an even win probability.
///
/// Ratings are derived from the seed and the player id, so repeated calls agree with each other
/// and a fixed seed makes a whole run reproducible.
#[derive(Debug, Clone, Copy)]
pub struct RandomRater {
    seed: u64,
}

impl RandomRater {
    /// Creates a rater with a random seed.
    pub fn new() -> Self {
        Self {
            seed: rand::random(),
        }
    }

    /// Creates a rater with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    fn draw(&self, key: impl Hash) -> f64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish()).gen_range(0.0..1.0)
    }
}

impl Default for RandomRater {
    fn default() -> Self {
        Self::new()
    }
}

impl Rater for RandomRater {
    fn rate(&self, player: &PlayerId) -> f64 {
        self.draw(player)
    }

    fn rate_group(&self, players: &[PlayerId]) -> f64 {
        self.draw(players)
    }

    fn win_probability(&self, _side_a: &[PlayerId], _side_b: &[PlayerId]) -> f64 {
        0.5
    }

    fn probability_to_rating_gap(&self, _probability: f64) -> f64 {
        0.0005
    }
}
