//! Role catalog and per-player-count rule tables.
//!
//! Roles are an explicit enum with a separate alignment lookup, and the rule
//! tables travel as an immutable [`GameConfig`] value handed to the engine
//! rather than as ambient globals.

use serde::{Deserialize, Serialize};
use tracing::instrument;

// Number of players:   5   6   7   8   9   10
//
// Good                 3   4   4   5   6   6
// Evil                 2   2   3   3   3   4
//
// Mission 1            2   2   2   3   3   3
// Mission 2            3   3   3   4   4   4
// Mission 3            2   4   3   4   4   4
// Mission 4            3   3   4*  5*  5*  5*
// Mission 5            3   4   4   5   5   5
//
// Missions marked (*) require TWO fail cards to fail, others require ONE.

/// Which side a role fights for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Alignment {
    /// Loyal servants of Arthur.
    Good,
    /// Minions of Mordred.
    Evil,
}

/// A role in the game.
///
/// `Undecided` is the pre-game placeholder every player carries until the
/// owner starts play and the role permutation is dealt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Role {
    /// No role assigned yet.
    Undecided,
    /// Only knows how many evil players exist, not who they are.
    Servant,
    /// Knows who the evil players are.
    Merlin,
    /// Knows who Merlin is and is in a position to protect Merlin's identity.
    Percival,
    /// Made aware of the other evil players without the good players knowing.
    Minion,
    /// Guesses Merlin's identity for evil's last chance when good wins.
    Assassin,
    /// Hidden from Merlin, leaving Merlin in the dark.
    Mordred,
    /// Appears to Percival as Merlin.
    Morgana,
    /// Unknown to the other evil players and blind to them in turn.
    Oberon,
}

impl Role {
    /// Returns the role's alignment, or `None` for `Undecided`.
    pub fn alignment(self) -> Option<Alignment> {
        match self {
            Role::Undecided => None,
            Role::Servant | Role::Merlin | Role::Percival => Some(Alignment::Good),
            Role::Minion | Role::Assassin | Role::Mordred | Role::Morgana | Role::Oberon => {
                Some(Alignment::Evil)
            }
        }
    }

    /// Returns true if this role is evil-aligned.
    pub fn is_evil(self) -> bool {
        self.alignment() == Some(Alignment::Evil)
    }

    /// Returns true if this role is good-aligned.
    pub fn is_good(self) -> bool {
        self.alignment() == Some(Alignment::Good)
    }

    /// Returns true if this role may be chosen as an additional role at start.
    ///
    /// Merlin and Assassin are mandatory, Servant and Minion are fillers;
    /// only the four optional identities are selectable.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Role::Percival | Role::Mordred | Role::Morgana | Role::Oberon
        )
    }
}

/// Immutable rule tables keyed on player count and mission ordinal.
///
/// Constructed once via [`GameConfig::standard`] and passed into the engine,
/// so the tables are explicit inputs instead of global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Required team size per (player count 5..=10, mission ordinal 0..5).
    team_sizes: [[usize; 5]; 6],
    /// Missions a side must resolve in its favor to win.
    missions_to_win: usize,
    /// Hard cap on missions per session.
    mission_cap: usize,
    /// Hard cap on team attempts within one mission.
    attempt_cap: usize,
    /// Minimum players required to start.
    min_players: usize,
    /// Maximum players a session accepts.
    max_players: usize,
}

impl GameConfig {
    /// Returns the canonical rule set.
    #[instrument]
    pub fn standard() -> Self {
        Self {
            team_sizes: [
                [2, 3, 2, 3, 3], // 5 players
                [2, 3, 4, 3, 4], // 6 players
                [2, 3, 3, 4, 4], // 7 players
                [3, 4, 4, 5, 5], // 8 players
                [3, 4, 4, 5, 5], // 9 players
                [3, 4, 4, 5, 5], // 10 players
            ],
            missions_to_win: 3,
            mission_cap: 5,
            attempt_cap: 5,
            min_players: 5,
            max_players: 10,
        }
    }

    /// Number of evil players for a session of the given size.
    pub fn evil_count(&self, player_count: usize) -> usize {
        player_count.div_ceil(3)
    }

    /// Required team size for the given player count and mission ordinal.
    ///
    /// Returns `None` when either argument falls outside the tables.
    pub fn team_size(&self, player_count: usize, mission_ordinal: usize) -> Option<usize> {
        if player_count < self.min_players || player_count > self.max_players {
            return None;
        }
        self.team_sizes[player_count - self.min_players]
            .get(mission_ordinal)
            .copied()
    }

    /// Fail votes required to fail the mission at the given ordinal.
    ///
    /// The fourth mission (ordinal 3) needs two fail votes in games of seven
    /// or more players; every other attempt fails on a single fail vote.
    pub fn fail_threshold(&self, player_count: usize, mission_ordinal: usize) -> usize {
        if mission_ordinal == 3 && player_count >= 7 {
            2
        } else {
            1
        }
    }

    /// Missions a side must resolve in its favor to win.
    pub fn missions_to_win(&self) -> usize {
        self.missions_to_win
    }

    /// Hard cap on missions per session.
    pub fn mission_cap(&self) -> usize {
        self.mission_cap
    }

    /// Hard cap on team attempts within one mission.
    pub fn attempt_cap(&self) -> usize {
        self.attempt_cap
    }

    /// Minimum players required to start.
    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Maximum players a session accepts.
    pub fn max_players(&self) -> usize {
        self.max_players
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::standard()
    }
}
