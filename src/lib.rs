//! # Team Balancer
//!
//! A Rust crate that splits a match roster into two sides of near-equal size and predicted
//! strength, keeping squads and clans together.
//!
//! It provides:
//! - Team assignment for a roster snapshot (`Balancer`)
//! - Rating models via the `Rater` trait
//! - Built-in raters like `LogisticRegressionRater`, `FixedRater` and `RandomRater`
//! - An exact branch-and-bound search for up to 30 groups, with a min-moves mode
//! - A greedy heuristic for larger rosters
//!
//! The engine only computes target sides. Executing the swaps is left to the host.
//!
//! # Documentation Overview
//!
//! - For the balancing entry points and the strategy selection, see the [`balancer`] module.
//! - For logging and behavior switches, see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For rating models, see the [`Rater`](crate::rater::Rater) trait and its implementations.
//! - For how players are bundled into indivisible units, see [`group`].
//! - For the search algorithms themselves, see [`partition`].
//!
//! # Usage Example
//!
//! ```
//! use std::collections::HashMap;
//! use team_balancer::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let roster = vec![
//!         Player::new("ana", Side::A).with_squad(1),
//!         Player::new("bo", Side::A).with_squad(1),
//!         Player::new("cy", Side::A),
//!         Player::new("di", Side::B),
//!         Player::new("ed", Side::B).with_clan("XX"),
//!         Player::new("fay", Side::A).with_clan("XX"),
//!     ];
//!     let stats = HashMap::from([
//!         ("ana".into(), PlayerStats { kdr: 2.5, play_time: 90_000.0, total_score: 40_000.0 }),
//!         ("bo".into(), PlayerStats { kdr: 1.1, play_time: 20_000.0, total_score: 8_000.0 }),
//!         ("cy".into(), PlayerStats { kdr: 0.7, play_time: 5_000.0, total_score: 1_500.0 }),
//!     ]);
//!
//!     let balancer = Balancer::new(LogisticRegressionRater::new(stats), Configuration::new());
//!     if balancer.should_balance(&roster, 0.6) {
//!         let plan = match balancer.calculate_target_teams(
//!             &roster,
//!             &squads_from_roster(&roster),
//!             &clans_from_roster(&roster),
//!             0.9,
//!             false,
//!         ) {
//!             Ok(plan) => plan,
//!             Err(err) => {
//!                 eprintln!("falling back to size-only teams: {err}");
//!                 balancer.size_only_plan(&roster)
//!             }
//!         };
//!         println!("A: {:?}\nB: {:?}", plan.side_a, plan.side_b);
//!     }
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;
pub mod balancer;
pub mod configuration;
pub mod error;
pub mod group;
mod logger;
pub mod partition;
pub mod player;
pub mod rater;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use team_balancer::prelude::*;
/// ```
///
/// Includes:
/// - [`Balancer`](crate::balancer::Balancer) and [`BalancePlan`](crate::balancer::BalancePlan)
/// - [`Configuration`](crate::configuration::Configuration)
/// - [`BalanceError`](crate::error::BalanceError)
/// - the roster types and membership helpers of [`player`](crate::player)
/// - all built-in [`raters`](crate::rater)
pub mod prelude {
    pub use crate::balancer::{BalancePlan, Balancer, Strategy};
    pub use crate::configuration::{Configuration, Verbosity};
    pub use crate::error::{BalanceError, BalanceResult};
    pub use crate::partition::SearchMode;
    pub use crate::player::*;
    pub use crate::rater::*;
}
