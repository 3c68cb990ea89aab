//! Exact branch-and-bound search for side A.
//!
//! Groups are sorted by descending rating (stable, so equal ratings keep their input order) and
//! explored depth-first with an explicit stack of included indices. At every cursor position
//! the "include" branch is tried before the "exclude" branch. Only strictly better candidates
//! replace the incumbent, so ties go to the first candidate found in that order.

use tracing::{debug, trace};

use super::{Partition, Totals};
use crate::{
    error::{BalanceError, BalanceResult},
    group::Group,
};

/// Objective of the exact search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Minimize the skill gap only.
    #[default]
    SkillOptimal,
    /// Minimize moved players among candidates within tolerance, skill gap breaking ties.
    MinMoves,
}

#[derive(Debug, Clone)]
struct Candidate {
    stack: Vec<usize>,
    gap: f64,
    moves: usize,
}

/// Pre-computed view of the sorted groups.
///
/// Suffix arrays have one extra trailing entry so that `[groups.len()]` is the empty suffix.
struct SearchSpace<'a> {
    groups: Vec<&'a Group>,
    order: Vec<usize>,
    player_target: usize,
    target_skill: f64,
    players_remaining: Vec<usize>,
    max_skill_from: Vec<f64>,
    min_skill_from: Vec<f64>,
    moves_to_b_before: Vec<usize>,
}

impl<'a> SearchSpace<'a> {
    fn new(input: &'a [Group]) -> Self {
        let mut order: Vec<usize> = (0..input.len()).collect();
        order.sort_by(|&a, &b| input[b].rating_sum.total_cmp(&input[a].rating_sum));
        let groups: Vec<&Group> = order.iter().map(|&i| &input[i]).collect();

        let totals = Totals::of(groups.iter().copied());
        debug!(
            total_skill = totals.total_skill,
            total_players = totals.total_players,
            average_skill = totals.average_skill,
            player_target = totals.player_target,
            "exact search totals"
        );

        let n = groups.len();
        let mut players_remaining = vec![0; n + 1];
        let mut max_skill_from = vec![0.0; n + 1];
        let mut min_skill_from = vec![0.0; n + 1];
        for i in (0..n).rev() {
            let g = groups[i];
            players_remaining[i] = players_remaining[i + 1] + g.size();
            // negative ratings only ever lower the reachable skill, positive ones only raise it
            max_skill_from[i] = max_skill_from[i + 1] + g.rating_sum.max(0.0);
            min_skill_from[i] = min_skill_from[i + 1] + g.rating_sum.min(0.0);
        }

        let mut moves_to_b_before = vec![0; n + 1];
        for i in 0..n {
            moves_to_b_before[i + 1] = moves_to_b_before[i] + groups[i].moves_to_b();
        }

        Self {
            groups,
            order,
            player_target: totals.player_target,
            target_skill: totals.target_skill,
            players_remaining,
            max_skill_from,
            min_skill_from,
            moves_to_b_before,
        }
    }

    fn len(&self) -> usize {
        self.groups.len()
    }

    /// Subset-sum over group sizes: can whole groups make up exactly `player_target` players?
    fn size_feasible(&self) -> bool {
        let target = self.player_target;
        let mut reachable = vec![false; target + 1];
        reachable[0] = true;
        for g in &self.groups {
            let size = g.size();
            if size > target {
                continue;
            }
            for total in (size..=target).rev() {
                if reachable[total - size] {
                    reachable[total] = true;
                }
            }
        }
        reachable[target]
    }

    fn normalized(&self, gap: f64) -> f64 {
        gap / self.player_target as f64
    }

    fn bitset(&self, stack: &[usize]) -> String {
        (0..self.len())
            .map(|i| if stack.contains(&i) { '1' } else { '0' })
            .collect()
    }

    fn search_skill(&self) -> Option<Candidate> {
        let n = self.len();
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut included_skill = 0.0;
        let mut included_players = 0;
        let mut best: Option<Candidate> = None;
        let mut best_gap = f64::INFINITY;
        let mut skill_lower_bound = f64::NEG_INFINITY;
        let mut i = 0;
        let mut iterations: u64 = 0;

        loop {
            iterations += 1;
            let players_needed = self.player_target - included_players;

            if i == n
                || players_needed > self.players_remaining[i]
                || included_skill + self.max_skill_from[i] <= skill_lower_bound
                || included_skill + self.min_skill_from[i] >= self.target_skill + best_gap
            {
                let Some(j) = stack.pop() else { break };
                included_players -= self.groups[j].size();
                included_skill -= self.groups[j].rating_sum;
                i = j + 1;
                continue;
            }

            let group = self.groups[i];
            if group.size() <= players_needed {
                stack.push(i);
                included_players += group.size();
                included_skill += group.rating_sum;

                if included_players == self.player_target {
                    let gap = (included_skill - self.target_skill).abs();
                    if gap < best_gap {
                        best_gap = gap;
                        skill_lower_bound = self.target_skill - gap;
                        trace!(gap, iterations, team = self.bitset(&stack), "new best");
                        best = Some(Candidate {
                            stack: stack.clone(),
                            gap,
                            moves: 0,
                        });
                        if gap == 0.0 {
                            // nothing can be strictly better
                            break;
                        }
                    }
                    stack.pop();
                    included_players -= group.size();
                    included_skill -= group.rating_sum;
                }
            }
            i += 1;
        }

        debug!(iterations, best_gap, "skill-optimal search finished");
        best
    }

    fn search_min_moves(&self, allowed_gap: f64) -> Option<Candidate> {
        let n = self.len();
        let total_moves_to_b = self.moves_to_b_before[n];
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut included_skill = 0.0;
        let mut included_players = 0;
        // moves of included groups, relative to sending them to side B
        let mut moves_delta: i64 = 0;
        let mut best: Option<Candidate> = None;
        let mut i = 0;
        let mut iterations: u64 = 0;

        loop {
            iterations += 1;
            let players_needed = self.player_target - included_players;
            // groups before the cursor are decided, their moves are final
            let committed_moves = moves_delta + self.moves_to_b_before[i] as i64;

            if i == n
                || players_needed > self.players_remaining[i]
                || best
                    .as_ref()
                    .is_some_and(|b| committed_moves > b.moves as i64)
                || self.normalized(self.target_skill - included_skill - self.max_skill_from[i])
                    > allowed_gap
                || self.normalized(included_skill + self.min_skill_from[i] - self.target_skill)
                    > allowed_gap
            {
                let Some(j) = stack.pop() else { break };
                let g = self.groups[j];
                included_players -= g.size();
                included_skill -= g.rating_sum;
                moves_delta -= g.moves_to_a() as i64 - g.moves_to_b() as i64;
                i = j + 1;
                continue;
            }

            let group = self.groups[i];
            if group.size() <= players_needed {
                stack.push(i);
                included_players += group.size();
                included_skill += group.rating_sum;
                moves_delta += group.moves_to_a() as i64 - group.moves_to_b() as i64;

                if included_players == self.player_target {
                    let gap = (included_skill - self.target_skill).abs();
                    let moves = (moves_delta + total_moves_to_b as i64) as usize;
                    let better = match &best {
                        None => true,
                        Some(b) => moves < b.moves || (moves == b.moves && gap < b.gap),
                    };
                    if better && self.normalized(gap) <= allowed_gap {
                        trace!(moves, gap, iterations, team = self.bitset(&stack), "new best");
                        best = Some(Candidate {
                            stack: stack.clone(),
                            gap,
                            moves,
                        });
                        if moves == 0 && gap == 0.0 {
                            break;
                        }
                    }
                    stack.pop();
                    included_players -= group.size();
                    included_skill -= group.rating_sum;
                    moves_delta -= group.moves_to_a() as i64 - group.moves_to_b() as i64;
                }
            }
            i += 1;
        }

        debug!(
            iterations,
            moves = best.as_ref().map(|b| b.moves),
            "min-moves search finished"
        );
        best
    }

    fn into_partition(self, candidate: Candidate) -> Partition {
        let mut on_side_a = vec![false; self.len()];
        for &pos in &candidate.stack {
            on_side_a[self.order[pos]] = true;
        }
        Partition {
            on_side_a,
            skill_gap: self.normalized(candidate.gap),
        }
    }
}

/// Finds the set of groups for side A with exactly `ceil(players / 2)` players.
///
/// `allowed_gap` is the tolerated distance, per player, between side A's rating and the
/// balanced target.
///
/// # Errors
/// - [`BalanceError::InvalidConfiguration`] if `allowed_gap` is negative or NaN.
/// - [`BalanceError::ImpossibleSizeConstraint`] if no combination of whole groups has the
///   required size.
/// - [`BalanceError::InfeasibleTolerance`] if the best combination is outside `allowed_gap`.
pub fn exact_partition(
    groups: &[Group],
    allowed_gap: f64,
    mode: SearchMode,
) -> BalanceResult<Partition> {
    if allowed_gap.is_nan() || allowed_gap < 0.0 {
        return Err(BalanceError::InvalidConfiguration(format!(
            "allowed gap must be a non-negative number, got {allowed_gap}"
        )));
    }
    if groups.is_empty() {
        return Ok(Partition::empty());
    }

    let space = SearchSpace::new(groups);
    if !space.size_feasible() {
        let largest = space.groups.iter().map(|g| g.size()).max().unwrap_or(0);
        return Err(BalanceError::ImpossibleSizeConstraint(format!(
            "no combination of groups adds up to {} players (largest group has {largest})",
            space.player_target
        )));
    }

    let best = match mode {
        SearchMode::SkillOptimal => space.search_skill(),
        SearchMode::MinMoves => space.search_min_moves(allowed_gap),
    };

    match best {
        Some(candidate) if space.normalized(candidate.gap) <= allowed_gap => {
            Ok(space.into_partition(candidate))
        }
        Some(candidate) => Err(BalanceError::InfeasibleTolerance {
            gap: space.normalized(candidate.gap),
            allowed: allowed_gap,
        }),
        None => {
            // Min-moves pruned everything; report how close the best split gets.
            let gap = space
                .search_skill()
                .map(|c| space.normalized(c.gap))
                .unwrap_or(f64::INFINITY);
            Err(BalanceError::InfeasibleTolerance {
                gap,
                allowed: allowed_gap,
            })
        }
    }
}
