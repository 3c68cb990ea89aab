//! Partition strategies deciding which groups go to side A.
//!
//! Two strategies are provided:
//! - [`exact_partition`]: branch-and-bound search over groups, optimal for skill or for moves.
//! - [`heuristic_partition`]: greedy near-linear fallback for rosters with many groups.
//!
//! Both are pure functions of the groups and a per-player rating-gap tolerance. They never
//! relax the tolerance and never retry; see [`BalanceError`](crate::error::BalanceError).

use crate::group::Group;

mod exact;
mod heuristic;

pub use exact::{exact_partition, SearchMode};
pub use heuristic::heuristic_partition;

/// Which groups were assigned to side A.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// `on_side_a[i]` is true when `groups[i]` goes to side A. Indexed like the input groups.
    pub on_side_a: Vec<bool>,
    /// Distance between side A's rating and the balanced rating for its size, per player.
    pub skill_gap: f64,
}

impl Partition {
    pub(crate) fn empty() -> Self {
        Self {
            on_side_a: vec![],
            skill_gap: 0.0,
        }
    }

    /// Number of players whose side differs from the one assigned.
    pub fn moved_players(&self, groups: &[Group]) -> usize {
        groups
            .iter()
            .zip(&self.on_side_a)
            .map(|(g, &a)| if a { g.moves_to_a() } else { g.moves_to_b() })
            .sum()
    }

    /// Number of players assigned to side A.
    pub fn side_a_players(&self, groups: &[Group]) -> usize {
        groups
            .iter()
            .zip(&self.on_side_a)
            .filter(|&(_, &a)| a)
            .map(|(g, _)| g.size())
            .sum()
    }
}

/// Roster totals derived from the groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    /// Sum of all group ratings.
    pub total_skill: f64,
    /// Number of players.
    pub total_players: usize,
    /// `total_skill / total_players`, zero for an empty roster.
    pub average_skill: f64,
    /// Size of side A: `ceil(total_players / 2)`.
    pub player_target: usize,
    /// Rating a perfectly balanced side A would hold.
    pub target_skill: f64,
}

impl Totals {
    /// Computes the totals of a set of groups.
    pub fn of<'a>(groups: impl IntoIterator<Item = &'a Group>) -> Self {
        let (total_skill, total_players) = groups
            .into_iter()
            .fold((0.0, 0), |(skill, players), g| (skill + g.rating_sum, players + g.size()));
        let average_skill = if total_players == 0 {
            0.0
        } else {
            total_skill / total_players as f64
        };
        let player_target = total_players.div_ceil(2);
        Self {
            total_skill,
            total_players,
            average_skill,
            player_target,
            target_skill: average_skill * player_target as f64,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_groups {
    use crate::group::{Group, GroupKind};
    use crate::player::PlayerId;

    /// Builds a group of `size` players named `{prefix}{n}`, `on_a` of them currently on side A.
    pub fn group(prefix: &str, size: usize, rating_sum: f64, on_a: usize) -> Group {
        Group {
            kind: if size == 1 {
                GroupKind::Individual
            } else {
                GroupKind::Squad
            },
            members: (0..size)
                .map(|n| PlayerId::new(format!("{prefix}{n}")))
                .collect(),
            rating_sum,
            current_side_count: on_a,
            unassigned_count: 0,
        }
    }

    /// `n` singletons with the given ratings, alternately on side A and B.
    pub fn singletons(ratings: &[f64]) -> Vec<Group> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| group(&format!("p{i}_"), 1, r, usize::from(i % 2 == 0)))
            .collect()
    }
}
