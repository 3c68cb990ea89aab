//! Roster types: players, their current side, and their squad and clan tags.
//!
//! The roster is a snapshot supplied fresh for every balancing run. Helpers in this module
//! derive the squad and clan membership lists that [`form_groups`](crate::group::form_groups)
//! expects from the tags carried by each [`Player`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

/// Stable identifier of a player, unique within a match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The side a player is currently playing on.
///
/// Side A is the reference side: the exact search builds side A and everything else goes to
/// side B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Side {
    /// Reference side.
    A,
    /// Opposing side.
    B,
    /// Connected but not on a side yet.
    #[default]
    Unassigned,
}

/// A player in the roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier.
    pub id: PlayerId,
    /// Current side.
    pub side: Side,
    /// Squad number. Squad numbers are only unique within a side.
    pub squad: Option<u32>,
    /// Clan tag.
    pub clan: Option<String>,
}

impl Player {
    /// Creates a player without squad or clan.
    pub fn new(id: impl Into<PlayerId>, side: Side) -> Self {
        Self {
            id: id.into(),
            side,
            squad: None,
            clan: None,
        }
    }

    /// Sets the squad number.
    #[must_use]
    pub fn with_squad(self, squad: u32) -> Self {
        Self {
            squad: Some(squad),
            ..self
        }
    }

    /// Sets the clan tag.
    #[must_use]
    pub fn with_clan(self, clan: impl Into<String>) -> Self {
        Self {
            clan: Some(clan.into()),
            ..self
        }
    }
}

/// A set of players that should be kept on the same side (one squad or one clan).
pub type Membership = Vec<PlayerId>;

/// Builds one membership list per squad.
///
/// Squads are keyed by `(side, squad number)` so that squad 1 of side A and squad 1 of side B
/// stay distinct. Unassigned players are never part of a squad.
pub fn squads_from_roster(roster: &[Player]) -> Vec<Membership> {
    let mut squads: BTreeMap<(Side, u32), Membership> = BTreeMap::new();
    for player in roster {
        if player.side == Side::Unassigned {
            continue;
        }
        if let Some(squad) = player.squad {
            squads
                .entry((player.side, squad))
                .or_default()
                .push(player.id.clone());
        }
    }
    squads.into_values().collect()
}

/// Builds one membership list per clan tag, whatever side the members are on.
///
/// Clans with a single connected member are dropped since they constrain nothing.
pub fn clans_from_roster(roster: &[Player]) -> Vec<Membership> {
    let mut clans: BTreeMap<&str, Membership> = BTreeMap::new();
    for player in roster {
        if let Some(clan) = player.clan.as_deref() {
            clans.entry(clan).or_default().push(player.id.clone());
        }
    }
    clans.into_values().filter(|members| members.len() > 1).collect()
}

/// Splits the roster into the ids currently on side A and everyone else.
pub fn sides_of(roster: &[Player]) -> (Vec<PlayerId>, Vec<PlayerId>) {
    let (a, rest): (Vec<&Player>, Vec<&Player>) = roster.iter().partition(|p| p.side == Side::A);
    (
        a.into_iter().map(|p| p.id.clone()).collect(),
        rest.into_iter().map(|p| p.id.clone()).collect(),
    )
}

pub(crate) fn current_sides(roster: &[Player]) -> HashMap<PlayerId, Side> {
    roster.iter().map(|p| (p.id.clone(), p.side)).collect()
}

#[cfg(test)]
mod player_tests {
    use super::*;

    fn roster() -> Vec<Player> {
        vec![
            Player::new("a1", Side::A).with_squad(1),
            Player::new("a2", Side::A).with_squad(1).with_clan("TAG"),
            Player::new("b1", Side::B).with_squad(1).with_clan("TAG"),
            Player::new("b2", Side::B).with_clan("LONE"),
            Player::new("u1", Side::Unassigned).with_squad(1),
        ]
    }

    #[test]
    fn squads_are_keyed_by_side() {
        let squads = squads_from_roster(&roster());
        assert_eq!(squads.len(), 2);
        assert_eq!(squads[0], vec![PlayerId::from("a1"), PlayerId::from("a2")]);
        assert_eq!(squads[1], vec![PlayerId::from("b1")]);
    }

    #[test]
    fn single_member_clans_are_dropped() {
        let clans = clans_from_roster(&roster());
        assert_eq!(clans, vec![vec![PlayerId::from("a2"), PlayerId::from("b1")]]);
    }

    #[test]
    fn sides_split() {
        let (a, rest) = sides_of(&roster());
        assert_eq!(a.len(), 2);
        assert_eq!(rest.len(), 3);
    }
}
