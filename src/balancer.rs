//! Balancing entry point.
//!
//! This module defines the [`Balancer`] type, which orchestrates one balancing run:
//!
//! - Validating the requested win-probability threshold
//! - Forming groups from the roster and the squad and clan hints
//! - Converting the threshold into a rating gap through the [`Rater`]
//! - Choosing between the exact search and the heuristic
//! - Returning a [`BalancePlan`] for the swap executor
//!
//! # Strategy Selection
//!
//! Up to [`EXACT_SEARCH_GROUP_LIMIT`] groups, the exact search runs in the requested mode.
//! Above it, the search space becomes impractical and the heuristic is used instead. The
//! heuristic has no min-moves objective, so asking for min-moves with that many groups is an
//! [`InvalidConfiguration`](BalanceError::InvalidConfiguration) error rather than a silent
//! approximation.
//!
//! # Time Bounds
//!
//! The search never checks the clock. Hosts that need a bound can use
//! [`Balancer::calculate_target_teams_with_deadline`], which runs the calculation on a worker
//! thread and falls back to the heuristic when the deadline passes.
//!
//! # Example
//!
//! ```
//! use team_balancer::prelude::*;
//!
//! let roster: Vec<Player> = (0..10)
//!     .map(|i| Player::new(format!("p{i}"), if i < 7 { Side::A } else { Side::B }))
//!     .collect();
//! let rater = FixedRater::new(Default::default(), 1.0);
//! let balancer = Balancer::new(rater, Configuration::new());
//! let plan = balancer
//!     .calculate_target_teams(&roster, &squads_from_roster(&roster), &[], 1.0, false)
//!     .unwrap();
//! assert_eq!(plan.side_a.len(), 5);
//! assert_eq!(plan.side_b.len(), 5);
//! ```

use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{info, instrument, trace, warn};

use crate::{
    configuration::{Configuration, EXACT_SEARCH_GROUP_LIMIT},
    error::{BalanceError, BalanceResult},
    group::{form_groups, Group},
    logger::init_logger,
    partition::{exact_partition, heuristic_partition, Partition, SearchMode, Totals},
    player::{current_sides, Membership, Player, PlayerId, Side},
    rater::Rater,
};

/// How a plan was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Branch-and-bound search in the given mode.
    Exact(SearchMode),
    /// Greedy fallback for many groups.
    Heuristic,
    /// Player-by-player deal ignoring groups.
    SizeOnly,
}

/// Target sides for every player of the roster.
///
/// `side_a` and `side_b` are disjoint and together hold every roster player exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancePlan {
    /// Players that should end up on side A.
    pub side_a: Vec<PlayerId>,
    /// Players that should end up on side B.
    pub side_b: Vec<PlayerId>,
    /// Strategy that produced the plan.
    pub strategy: Strategy,
    /// Distance between side A's rating and the balanced rating for its size, per player.
    pub skill_gap: f64,
    /// Players whose side changes (unassigned players always count).
    pub moved_players: usize,
}

impl BalancePlan {
    fn from_partition(groups: &[Group], partition: &Partition, strategy: Strategy) -> Self {
        let mut side_a = vec![];
        let mut side_b = vec![];
        for (group, &on_a) in groups.iter().zip(&partition.on_side_a) {
            let side = if on_a { &mut side_a } else { &mut side_b };
            side.extend(group.members.iter().cloned());
        }
        BalancePlan {
            side_a,
            side_b,
            strategy,
            skill_gap: partition.skill_gap,
            moved_players: partition.moved_players(groups),
        }
    }

    /// Target side of a player, if they are part of the plan.
    pub fn side_of(&self, player: &PlayerId) -> Option<Side> {
        if self.side_a.contains(player) {
            Some(Side::A)
        } else if self.side_b.contains(player) {
            Some(Side::B)
        } else {
            None
        }
    }
}

/// The main type for balancing a match.
///
/// Holds the rater and configuration; every call works on a fresh roster snapshot and keeps
/// no state between calls. Concurrent calls are fine as long as the rater is not mutated.
///
/// # Type Parameters
/// - `R`: The rating model implementing [`Rater`]
pub struct Balancer<R: Rater> {
    rater: Arc<R>,
    config: Configuration,
}

impl<R: Rater> Clone for Balancer<R> {
    fn clone(&self) -> Self {
        Self {
            rater: Arc::clone(&self.rater),
            config: self.config,
        }
    }
}

impl<R: Rater + 'static> Balancer<R> {
    /// Create a [`Balancer`] with given [`Rater`] and [`Configuration`].
    ///
    /// Installs the file logger when the configuration asks for it, and hands a configured
    /// fallback rating to the rater.
    #[instrument(skip_all)]
    pub fn new(rater: R, config: Configuration) -> Balancer<R> {
        Self::with_shared_rater(Arc::new(rater), config)
    }

    /// Same as [`Balancer::new`] for a rater shared with other owners.
    ///
    /// A configured fallback rating can only be applied while this is the rater's sole owner.
    pub fn with_shared_rater(mut rater: Arc<R>, config: Configuration) -> Balancer<R> {
        if config.log {
            if let Err(err) = init_logger(config.verbosity) {
                warn!("file logging disabled: {err:#}");
            }
        }
        if let Some(rating) = config.fallback_rating {
            match Arc::get_mut(&mut rater) {
                Some(rater) => rater.set_fallback_rating(rating),
                None => warn!(rating, "rater is shared, configured fallback rating not applied"),
            }
        }
        trace!(?config);

        Balancer { rater, config }
    }

    /// The rating model.
    pub fn rater(&self) -> &R {
        &self.rater
    }

    /// The configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Computes target sides for the roster.
    ///
    /// # Parameters
    /// - `roster`: current players
    /// - `squads`: squad membership lists, see [`squads_from_roster`](crate::player::squads_from_roster)
    /// - `clans`: clan membership lists, grouped before squads
    /// - `win_probability_threshold`: largest acceptable win probability for either side, in `(0.5, 1]`
    /// - `min_moves`: minimize moved players instead of the skill gap
    ///
    /// # Errors
    /// Any [`BalanceError`] from validation or from the selected strategy, unchanged.
    #[instrument(skip_all, fields(players = roster.len(), threshold = win_probability_threshold, min_moves = min_moves))]
    pub fn calculate_target_teams(
        &self,
        roster: &[Player],
        squads: &[Membership],
        clans: &[Membership],
        win_probability_threshold: f64,
        min_moves: bool,
    ) -> BalanceResult<BalancePlan> {
        plan_target_teams(
            &*self.rater,
            &self.config,
            roster,
            squads,
            clans,
            win_probability_threshold,
            min_moves,
        )
    }

    /// Same as [`calculate_target_teams`](Self::calculate_target_teams), bounded by `deadline`.
    ///
    /// The calculation runs on a worker thread. If it does not answer in time, skill-optimal
    /// requests are answered with the heuristic computed on the calling thread, and min-moves
    /// requests fail with [`BalanceError::DeadlineExceeded`]. The worker cannot be cancelled;
    /// it finishes in the background and its result is dropped.
    pub fn calculate_target_teams_with_deadline(
        &self,
        roster: Vec<Player>,
        squads: Vec<Membership>,
        clans: Vec<Membership>,
        win_probability_threshold: f64,
        min_moves: bool,
        deadline: Duration,
    ) -> BalanceResult<BalancePlan> {
        let (tx_result, rx_result) = mpsc::channel();
        let rater = Arc::clone(&self.rater);
        let config = self.config;
        let fallback_roster = roster.clone();
        let fallback_squads = squads.clone();
        let fallback_clans = clans.clone();

        thread::spawn(move || {
            let result = plan_target_teams(
                &*rater,
                &config,
                &roster,
                &squads,
                &clans,
                win_probability_threshold,
                min_moves,
            );
            // the receiver is gone if the deadline already passed
            let _ = tx_result.send(result);
        });

        match rx_result.recv_timeout(deadline) {
            Ok(result) => result,
            Err(err) => {
                if err == RecvTimeoutError::Disconnected {
                    warn!("balance worker exited without a result");
                } else {
                    warn!(?deadline, "balance calculation timed out");
                }
                if min_moves {
                    return Err(BalanceError::DeadlineExceeded(deadline));
                }
                validate_threshold(win_probability_threshold)?;
                let groups = form_groups(
                    &fallback_roster,
                    &fallback_clans,
                    &fallback_squads,
                    &*self.rater,
                    &self.config,
                );
                let allowed = self.rater.probability_to_rating_gap(win_probability_threshold);
                let partition = heuristic_partition(&groups, &*self.rater, allowed)?;
                Ok(BalancePlan::from_partition(
                    &groups,
                    &partition,
                    Strategy::Heuristic,
                ))
            }
        }
    }

    /// Probability that the players currently on side A beat those on side B.
    pub fn current_win_probability(&self, roster: &[Player]) -> f64 {
        let side = |s: Side| -> Vec<PlayerId> {
            roster
                .iter()
                .filter(|p| p.side == s)
                .map(|p| p.id.clone())
                .collect()
        };
        self.rater.win_probability(&side(Side::A), &side(Side::B))
    }

    /// True when either current side is more likely to win than `threshold`.
    pub fn should_balance(&self, roster: &[Player], threshold: f64) -> bool {
        let p = self.current_win_probability(roster);
        p > threshold || 1.0 - p > threshold
    }

    /// Deals players one by one, ignoring squads and clans.
    ///
    /// Players are taken in ascending rating order and each joins the side with fewer players,
    /// side A when sizes and ratings tie. This never fails and is meant as a last resort after
    /// the group-preserving strategies returned an error.
    pub fn size_only_plan(&self, roster: &[Player]) -> BalancePlan {
        let mut rated: Vec<(f64, &Player)> =
            roster.iter().map(|p| (self.rater.rate(&p.id), p)).collect();
        rated.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut side_a = vec![];
        let mut side_b = vec![];
        let (mut rating_a, mut rating_b) = (0.0, 0.0);
        for (rating, player) in rated {
            if side_a.len() < side_b.len() || (side_a.len() == side_b.len() && rating_a <= rating_b)
            {
                side_a.push(player.id.clone());
                rating_a += rating;
            } else {
                side_b.push(player.id.clone());
                rating_b += rating;
            }
        }

        let total_players = side_a.len() + side_b.len();
        let skill_gap = if side_a.is_empty() {
            0.0
        } else {
            let average = (rating_a + rating_b) / total_players as f64;
            (rating_a - average * side_a.len() as f64).abs() / side_a.len() as f64
        };
        let current = current_sides(roster);
        let moved_players = count_moves(&current, &side_a, Side::A)
            + count_moves(&current, &side_b, Side::B);

        BalancePlan {
            side_a,
            side_b,
            strategy: Strategy::SizeOnly,
            skill_gap,
            moved_players,
        }
    }
}

fn count_moves(current: &HashMap<PlayerId, Side>, target: &[PlayerId], side: Side) -> usize {
    target
        .iter()
        .filter(|id| current.get(*id) != Some(&side))
        .count()
}

fn validate_threshold(threshold: f64) -> BalanceResult<()> {
    if threshold > 0.5 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(BalanceError::InvalidConfiguration(format!(
            "win probability threshold must be in (0.5, 1], got {threshold}"
        )))
    }
}

fn plan_target_teams<R: Rater + ?Sized>(
    rater: &R,
    config: &Configuration,
    roster: &[Player],
    squads: &[Membership],
    clans: &[Membership],
    win_probability_threshold: f64,
    min_moves: bool,
) -> BalanceResult<BalancePlan> {
    validate_threshold(win_probability_threshold)?;

    let groups = form_groups(roster, clans, squads, rater, config);
    let allowed = rater.probability_to_rating_gap(win_probability_threshold);
    let totals = Totals::of(&groups);
    info!(
        groups = groups.len(),
        players = totals.total_players,
        allowed_gap = allowed,
        "balancing"
    );

    let (partition, strategy) = if groups.len() > EXACT_SEARCH_GROUP_LIMIT {
        if min_moves {
            return Err(BalanceError::InvalidConfiguration(format!(
                "min-moves balancing supports at most {EXACT_SEARCH_GROUP_LIMIT} groups, got {}",
                groups.len()
            )));
        }
        info!("too many groups for exact search, using heuristic");
        (
            heuristic_partition(&groups, rater, allowed)?,
            Strategy::Heuristic,
        )
    } else {
        let mode = if min_moves {
            SearchMode::MinMoves
        } else {
            SearchMode::SkillOptimal
        };
        (
            exact_partition(&groups, allowed, mode)?,
            Strategy::Exact(mode),
        )
    };

    let plan = BalancePlan::from_partition(&groups, &partition, strategy);
    info!(
        ?strategy,
        side_a = plan.side_a.len(),
        side_b = plan.side_b.len(),
        skill_gap = plan.skill_gap,
        moved_players = plan.moved_players,
        "balance plan ready"
    );
    Ok(plan)
}
