use std::collections::{HashMap, HashSet};

use team_balancer::prelude::*;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    fmt,
    layer::{Context, Filter, SubscriberExt},
    Layer, Registry,
};

struct DebugAndAbove;
impl<S> Filter<S> for DebugAndAbove {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        meta.level() <= &Level::DEBUG
    }
}

fn init_debug_logger() {
    let format = fmt::format()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_thread_names(true)
        .with_target(false);

    let reg = Registry::default().with(
        fmt::layer()
            .event_format(format)
            .with_test_writer()
            .with_filter(DebugAndAbove),
    );

    let _ = tracing::subscriber::set_global_default(reg);
}

fn id(i: usize) -> PlayerId {
    PlayerId::new(format!("p{i}"))
}

/// Player `i` is rated `i`.
fn ranked_rater(n: usize) -> FixedRater {
    let ratings = (0..n).map(|i| (id(i), i as f64)).collect();
    FixedRater::new(ratings, 0.0)
}

fn flat_rater() -> FixedRater {
    FixedRater::new(HashMap::new(), 1.0)
}

fn alternating(n: usize) -> Vec<Player> {
    (0..n)
        .map(|i| Player::new(id(i), if i % 2 == 0 { Side::A } else { Side::B }))
        .collect()
}

/// 24 players, a squad of four on A, a squad of three on B and a clan spread over both sides.
fn mixed_roster() -> Vec<Player> {
    (0..24)
        .map(|i| {
            let side = if i < 5 || (12..18).contains(&i) { Side::A } else { Side::B };
            let player = Player::new(id(i), side);
            match i {
                0..=3 => player.with_squad(1),
                5..=7 => player.with_squad(2),
                10..=12 => player.with_clan("ZZ"),
                _ => player,
            }
        })
        .collect()
}

fn apply(roster: &[Player], plan: &BalancePlan) -> Vec<Player> {
    roster
        .iter()
        .map(|p| {
            let mut p = p.clone();
            p.side = plan.side_of(&p.id).unwrap_or(Side::Unassigned);
            p
        })
        .collect()
}

fn assert_complete_and_disjoint(roster: &[Player], plan: &BalancePlan) {
    let a: HashSet<&PlayerId> = plan.side_a.iter().collect();
    let b: HashSet<&PlayerId> = plan.side_b.iter().collect();
    assert_eq!(a.len(), plan.side_a.len());
    assert_eq!(b.len(), plan.side_b.len());
    assert!(a.is_disjoint(&b));
    let roster_ids: HashSet<&PlayerId> = roster.iter().map(|p| &p.id).collect();
    assert_eq!(a.union(&b).copied().collect::<HashSet<_>>(), roster_ids);
}

fn assert_kept_together(plan: &BalancePlan, memberships: &[Membership]) {
    for members in memberships {
        let side = plan.side_of(&members[0]);
        assert!(
            members.iter().all(|m| plan.side_of(m) == side),
            "{members:?} was split"
        );
    }
}

#[test]
fn mixed_roster_keeps_groups() {
    init_debug_logger();
    let roster = mixed_roster();
    let squads = squads_from_roster(&roster);
    let clans = clans_from_roster(&roster);
    assert_eq!(squads.len(), 2);
    assert_eq!(clans.len(), 1);

    let balancer = Balancer::new(ranked_rater(24), Configuration::new());
    let plan = balancer
        .calculate_target_teams(&roster, &squads, &clans, 1.0, false)
        .unwrap();

    assert_complete_and_disjoint(&roster, &plan);
    assert_kept_together(&plan, &squads);
    assert_kept_together(&plan, &clans);
    assert_eq!(plan.side_a.len(), 12);
    assert_eq!(plan.side_b.len(), 12);
    // ratings 0..24 sum to 276, an even split is reachable
    assert_eq!(plan.skill_gap, 0.0);
}

#[test]
fn balancing_is_idempotent() {
    init_debug_logger();
    let roster = mixed_roster();
    let squads = squads_from_roster(&roster);
    let clans = clans_from_roster(&roster);
    let balancer = Balancer::new(ranked_rater(24), Configuration::new());

    let plan = balancer
        .calculate_target_teams(&roster, &squads, &clans, 1.0, false)
        .unwrap();
    let again = balancer
        .calculate_target_teams(&roster, &squads, &clans, 1.0, false)
        .unwrap();
    assert_eq!(plan, again);

    let balanced = apply(&roster, &plan);
    let settled = balancer
        .calculate_target_teams(&balanced, &squads, &clans, 1.0, true)
        .unwrap();
    assert_eq!(settled.moved_players, 0);
    assert_eq!(settled.side_a.len(), plan.side_a.len());
}

#[test]
fn twenty_equal_players_split_ten_ten() {
    init_debug_logger();
    let roster = alternating(20);
    let balancer = Balancer::new(flat_rater(), Configuration::new());
    for threshold in [0.55, 0.75, 1.0] {
        let plan = balancer
            .calculate_target_teams(&roster, &[], &[], threshold, false)
            .unwrap();
        assert_eq!(plan.side_a.len(), 10);
        assert_eq!(plan.side_b.len(), 10);
        assert_eq!(plan.skill_gap, 0.0);
    }
}

#[test]
fn min_moves_on_balanced_roster_moves_nobody() {
    init_debug_logger();
    let roster = alternating(16);
    let balancer = Balancer::new(flat_rater(), Configuration::new());
    let plan = balancer
        .calculate_target_teams(&roster, &[], &[], 0.6, true)
        .unwrap();
    assert_eq!(plan.moved_players, 0);
    assert_eq!(plan.strategy, Strategy::Exact(SearchMode::MinMoves));
}

#[test]
fn one_group_cannot_be_split() {
    init_debug_logger();
    let balancer = Balancer::new(flat_rater(), Configuration::new());

    // exact search
    let roster = alternating(6);
    let everyone: Membership = roster.iter().map(|p| p.id.clone()).collect();
    let err = balancer
        .calculate_target_teams(&roster, &[], &[everyone], 1.0, false)
        .unwrap_err();
    assert!(matches!(err, BalanceError::ImpossibleSizeConstraint(_)));

    // heuristic: 31 singletons next to a clan of 40
    let roster = alternating(71);
    let clan: Membership = roster[..40].iter().map(|p| p.id.clone()).collect();
    let err = balancer
        .calculate_target_teams(&roster, &[], &[clan], 1.0, false)
        .unwrap_err();
    assert!(err.is_size_constraint(), "{err}");

    // the host can still fall back to a size-only split
    let plan = balancer.size_only_plan(&roster);
    assert_complete_and_disjoint(&roster, &plan);
    assert_eq!(plan.side_a.len(), 36);
}

#[test]
fn forty_players_use_heuristic() {
    init_debug_logger();
    let roster = alternating(40);
    let balancer = Balancer::new(ranked_rater(40).with_scale(2.0), Configuration::new());
    let plan = balancer
        .calculate_target_teams(&roster, &[], &[], 0.75, false)
        .unwrap();
    assert_eq!(plan.strategy, Strategy::Heuristic);
    assert_eq!(plan.side_a.len(), 20);
    assert_eq!(plan.side_b.len(), 20);
    assert_complete_and_disjoint(&roster, &plan);

    assert!(matches!(
        balancer.calculate_target_teams(&roster, &[], &[], 0.75, true),
        Err(BalanceError::InvalidConfiguration(_))
    ));
}

#[test]
fn threshold_outside_range_is_rejected() {
    let roster = alternating(4);
    let balancer = Balancer::new(flat_rater(), Configuration::new());
    for threshold in [0.0, 0.5, 1.5, -1.0] {
        assert!(matches!(
            balancer.calculate_target_teams(&roster, &[], &[], threshold, false),
            Err(BalanceError::InvalidConfiguration(_))
        ));
    }
}

#[test]
fn per_player_mode_ignores_squads() {
    init_debug_logger();
    let roster: Vec<Player> = (0..8)
        .map(|i| {
            let player = Player::new(id(i), Side::A);
            if i < 6 {
                player.with_squad(1)
            } else {
                player
            }
        })
        .collect();
    let squads = squads_from_roster(&roster);

    let grouped = Balancer::new(flat_rater(), Configuration::new());
    assert!(grouped
        .calculate_target_teams(&roster, &squads, &[], 1.0, false)
        .unwrap_err()
        .is_size_constraint());

    let loose = Balancer::new(flat_rater(), Configuration::new().with_per_player(true));
    let plan = loose
        .calculate_target_teams(&roster, &squads, &[], 1.0, false)
        .unwrap();
    assert_eq!(plan.side_a.len(), 4);
    assert_complete_and_disjoint(&roster, &plan);
}

#[test]
fn stacked_teams_are_evened_out() {
    init_debug_logger();
    // p0..p5 rated 10 on A, p6..p11 rated 0 on B
    let roster: Vec<Player> = (0..12)
        .map(|i| Player::new(id(i), if i < 6 { Side::A } else { Side::B }))
        .collect();
    let ratings = (0..12)
        .map(|i| (id(i), if i < 6 { 10.0 } else { 0.0 }))
        .collect();
    let balancer = Balancer::new(FixedRater::new(ratings, 0.0), Configuration::new());
    assert!(balancer.should_balance(&roster, 0.6));

    let plan = balancer
        .calculate_target_teams(&roster, &[], &[], 0.6, true)
        .unwrap();
    assert_eq!(plan.skill_gap, 0.0);
    // three strong players cross over and three weak ones come back
    assert_eq!(plan.moved_players, 6);

    let balanced = apply(&roster, &plan);
    assert_eq!(balancer.current_win_probability(&balanced), 0.5);
    assert!(!balancer.should_balance(&balanced, 0.6));
}
