//! Group formation: turning a roster plus squad and clan hints into atomic groups.
//!
//! A group is the unit the partition strategies move. Clan membership wins over squad
//! membership, so clan-mates travel together even if that breaks up a pub squad. Players with
//! no usable membership become groups of one.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::{
    configuration::Configuration,
    player::{Membership, Player, PlayerId, Side},
    rater::Rater,
};

/// What holds a group together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Members share a clan.
    Clan,
    /// Members share a squad.
    Squad,
    /// A single player.
    Individual,
}

/// Players that must end up on the same side.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Membership origin.
    pub kind: GroupKind,
    /// Member ids, in roster order. Never empty.
    pub members: Vec<PlayerId>,
    /// Sum of the members' individual ratings.
    pub rating_sum: f64,
    /// Number of members currently on side A.
    pub current_side_count: usize,
    /// Number of members currently on no side.
    pub unassigned_count: usize,
}

impl Group {
    fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            members: vec![],
            rating_sum: 0.0,
            current_side_count: 0,
            unassigned_count: 0,
        }
    }

    fn push<R: Rater + ?Sized>(&mut self, player: &Player, rater: &R) {
        self.rating_sum += rater.rate(&player.id);
        match player.side {
            Side::A => self.current_side_count += 1,
            Side::Unassigned => self.unassigned_count += 1,
            Side::B => {}
        }
        self.members.push(player.id.clone());
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Players that change side (or join one) if this group is assigned to side A.
    pub fn moves_to_a(&self) -> usize {
        self.size() - self.current_side_count
    }

    /// Players that change side (or join one) if this group is assigned to side B.
    pub fn moves_to_b(&self) -> usize {
        self.current_side_count + self.unassigned_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey {
    Clan(usize),
    Squad(usize),
}

fn index_memberships(sets: &[Membership]) -> HashMap<&PlayerId, usize> {
    let mut index = HashMap::new();
    for (i, set) in sets.iter().enumerate() {
        for id in set {
            // first set listing a player wins
            index.entry(id).or_insert(i);
        }
    }
    index
}

/// Builds the atomic groups for one balancing run.
///
/// Groups are returned clans first, then squads, then individuals, each in order of first
/// appearance in the roster. Every roster player ends up in exactly one group; a player listed
/// twice in the roster is only counted once.
pub fn form_groups<R: Rater + ?Sized>(
    roster: &[Player],
    clans: &[Membership],
    squads: &[Membership],
    rater: &R,
    config: &Configuration,
) -> Vec<Group> {
    let clan_index = if config.preserve_clans && !config.per_player {
        index_memberships(clans)
    } else {
        HashMap::new()
    };
    let squad_index = if config.preserve_squads && !config.per_player {
        index_memberships(squads)
    } else {
        HashMap::new()
    };

    let mut keyed: HashMap<GroupKey, usize> = HashMap::new();
    let mut clan_groups: Vec<Group> = vec![];
    let mut squad_groups: Vec<Group> = vec![];
    let mut individual_groups: Vec<Group> = vec![];
    let mut seen: HashSet<&PlayerId> = HashSet::with_capacity(roster.len());

    for player in roster {
        if !seen.insert(&player.id) {
            warn!("player {} appears twice in the roster, ignoring duplicate", player.id);
            continue;
        }

        let (key, groups, kind) = if let Some(&clan) = clan_index.get(&player.id) {
            (GroupKey::Clan(clan), &mut clan_groups, GroupKind::Clan)
        } else if let Some(&squad) = squad_index.get(&player.id) {
            (GroupKey::Squad(squad), &mut squad_groups, GroupKind::Squad)
        } else {
            let mut group = Group::new(GroupKind::Individual);
            group.push(player, rater);
            individual_groups.push(group);
            continue;
        };

        let slot = *keyed.entry(key).or_insert_with(|| {
            groups.push(Group::new(kind));
            groups.len() - 1
        });
        groups[slot].push(player, rater);
    }

    debug!(
        clans = clan_groups.len(),
        squads = squad_groups.len(),
        individuals = individual_groups.len(),
        "groups formed"
    );

    clan_groups
        .into_iter()
        .chain(squad_groups)
        .chain(individual_groups)
        .collect()
}

#[cfg(test)]
mod group_tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rater::FixedRater;

    fn rater() -> FixedRater {
        let ratings = HashMap::from([
            (PlayerId::from("c1"), 3.0),
            (PlayerId::from("c2"), 4.0),
            (PlayerId::from("s1"), 1.0),
        ]);
        FixedRater::new(ratings, 2.0)
    }

    fn roster() -> Vec<Player> {
        vec![
            Player::new("c1", Side::A),
            Player::new("s1", Side::A),
            Player::new("c2", Side::B),
            Player::new("solo", Side::Unassigned),
            Player::new("s2", Side::A),
        ]
    }

    fn clans() -> Vec<Membership> {
        vec![vec!["c1".into(), "c2".into()]]
    }

    fn squads() -> Vec<Membership> {
        // c1 is also in this squad but the clan takes priority
        vec![vec!["s1".into(), "s2".into(), "c1".into()]]
    }

    #[test]
    fn clans_win_over_squads() {
        let groups = form_groups(&roster(), &clans(), &squads(), &rater(), &Configuration::new());
        assert_eq!(groups.len(), 3);

        assert_eq!(groups[0].kind, GroupKind::Clan);
        assert_eq!(groups[0].members, vec![PlayerId::from("c1"), PlayerId::from("c2")]);
        assert_eq!(groups[0].rating_sum, 7.0);
        assert_eq!(groups[0].current_side_count, 1);

        assert_eq!(groups[1].kind, GroupKind::Squad);
        assert_eq!(groups[1].members, vec![PlayerId::from("s1"), PlayerId::from("s2")]);
        assert_eq!(groups[1].rating_sum, 3.0);
        assert_eq!(groups[1].moves_to_a(), 0);
        assert_eq!(groups[1].moves_to_b(), 2);

        assert_eq!(groups[2].kind, GroupKind::Individual);
        assert_eq!(groups[2].unassigned_count, 1);
        assert_eq!(groups[2].moves_to_a(), 1);
        assert_eq!(groups[2].moves_to_b(), 1);
    }

    #[test]
    fn every_player_in_exactly_one_group() {
        let groups = form_groups(&roster(), &clans(), &squads(), &rater(), &Configuration::new());
        let total: usize = groups.iter().map(Group::size).sum();
        assert_eq!(total, roster().len());
    }

    #[test]
    fn per_player_ignores_memberships() {
        let config = Configuration::new().with_per_player(true);
        let groups = form_groups(&roster(), &clans(), &squads(), &rater(), &config);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| g.size() == 1 && g.kind == GroupKind::Individual));
    }

    #[test]
    fn disabled_clans_fall_back_to_squads() {
        let config = Configuration::new().with_preserve_clans(false);
        let groups = form_groups(&roster(), &clans(), &squads(), &rater(), &config);
        assert_eq!(groups[0].kind, GroupKind::Squad);
        assert_eq!(groups[0].size(), 3);
    }

    #[test]
    fn duplicates_and_empty_roster() {
        let mut roster = roster();
        roster.push(Player::new("solo", Side::B));
        let groups = form_groups(&roster, &[], &[], &rater(), &Configuration::new());
        assert_eq!(groups.len(), 5);

        assert!(form_groups(&[], &clans(), &squads(), &rater(), &Configuration::new()).is_empty());
    }
}
