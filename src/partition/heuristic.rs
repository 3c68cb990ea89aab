//! Greedy partition for rosters with too many groups for the exact search.
//!
//! Groups are processed in ascending [`Rater::rate_group`] order and each one joins the side
//! with fewer players, the lower-rated side on a tie. When a placement leaves a size
//! imbalance the remaining players cannot absorb, earlier placements are rolled back and the
//! offending group is moved earlier in the processing order.

use tracing::{debug, trace};

use super::{Partition, Totals};
use crate::{
    configuration::HEURISTIC_ITERATION_FACTOR,
    error::{BalanceError, BalanceResult},
    group::Group,
    player::Side,
    rater::Rater,
};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    size_a: usize,
    size_b: usize,
    rating_a: f64,
    rating_b: f64,
}

impl Tally {
    fn pick(&self) -> Side {
        if self.size_a < self.size_b || (self.size_a == self.size_b && self.rating_a < self.rating_b)
        {
            Side::A
        } else {
            Side::B
        }
    }

    fn add(&mut self, side: Side, group: &Group) {
        match side {
            Side::A => {
                self.size_a += group.size();
                self.rating_a += group.rating_sum;
            }
            _ => {
                self.size_b += group.size();
                self.rating_b += group.rating_sum;
            }
        }
    }

    fn remove(&mut self, side: Side, group: &Group) {
        match side {
            Side::A => {
                self.size_a -= group.size();
                self.rating_a -= group.rating_sum;
            }
            _ => {
                self.size_b -= group.size();
                self.rating_b -= group.rating_sum;
            }
        }
    }

    /// Distance between the two sides' mean ratings, zero while a side is empty.
    fn mean_difference(&self) -> f64 {
        if self.size_a == 0 || self.size_b == 0 {
            return 0.0;
        }
        (self.rating_a / self.size_a as f64 - self.rating_b / self.size_b as f64).abs()
    }

    fn imbalance(&self) -> usize {
        self.size_a.abs_diff(self.size_b)
    }

    /// Whether placing `group` now still lets the unplaced players even out the sides.
    fn can_place(&self, group: &Group, unplaced: usize) -> bool {
        let mut next = *self;
        next.add(next.pick(), group);
        next.imbalance() <= unplaced - group.size() + 1
    }
}

/// Splits the groups into two sides whose sizes differ by at most one.
///
/// `allowed_gap` is the tolerated distance between the mean ratings of the two sides. The
/// returned [`Partition::skill_gap`] uses the same per-player measure as the exact search.
///
/// # Errors
/// - [`BalanceError::ImpossibleSizeConstraint`] if a group is too large to ever be evened out.
/// - [`BalanceError::IterationLimitExceeded`] if rollbacks keep happening past
///   `1.5 × groups` placements.
/// - [`BalanceError::InfeasibleTolerance`] if the side means end up more than `allowed_gap` apart.
pub fn heuristic_partition<R: Rater + ?Sized>(
    groups: &[Group],
    rater: &R,
    allowed_gap: f64,
) -> BalanceResult<Partition> {
    if groups.is_empty() {
        return Ok(Partition::empty());
    }

    let n = groups.len();
    let keys: Vec<f64> = groups.iter().map(|g| rater.rate_group(&g.members)).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));

    let limit = (n as f64 * HEURISTIC_ITERATION_FACTOR) as usize;
    let mut iterations = 0;
    let mut tally = Tally::default();
    let mut unplaced: usize = groups.iter().map(Group::size).sum();
    // placed[k] is the side of groups[order[k]]
    let mut placed: Vec<Side> = Vec::with_capacity(n);

    while placed.len() < n {
        iterations += 1;
        if iterations > limit {
            return Err(BalanceError::IterationLimitExceeded { limit });
        }

        let position = placed.len();
        let group = &groups[order[position]];
        if tally.can_place(group, unplaced) {
            let side = tally.pick();
            tally.add(side, group);
            unplaced -= group.size();
            placed.push(side);
            continue;
        }

        // Roll back until the problem group can go in, then process it from there.
        loop {
            let Some(side) = placed.pop() else {
                return Err(BalanceError::ImpossibleSizeConstraint(format!(
                    "a group of {} players cannot be evened out in a roster of {}",
                    group.size(),
                    unplaced
                )));
            };
            let undone = &groups[order[placed.len()]];
            tally.remove(side, undone);
            unplaced += undone.size();
            if tally.can_place(group, unplaced) {
                break;
            }
        }
        let problem = order.remove(position);
        order.insert(placed.len(), problem);
        trace!(from = position, to = placed.len(), "moved problem group earlier");
    }

    let mut on_side_a = vec![false; n];
    for (position, side) in placed.iter().enumerate() {
        on_side_a[order[position]] = *side == Side::A;
    }

    let totals = Totals::of(groups);
    let skill_gap = if tally.size_a == 0 {
        0.0
    } else {
        (tally.rating_a - totals.average_skill * tally.size_a as f64).abs() / tally.size_a as f64
    };
    debug!(
        iterations,
        size_a = tally.size_a,
        size_b = tally.size_b,
        skill_gap,
        "heuristic partition finished"
    );

    let mean_difference = tally.mean_difference();
    if mean_difference > allowed_gap {
        return Err(BalanceError::InfeasibleTolerance {
            gap: mean_difference,
            allowed: allowed_gap,
        });
    }

    Ok(Partition {
        on_side_a,
        skill_gap,
    })
}
