//! Session data aggregate: players, missions, teams, and messages.
//!
//! A [`GameSession`] exclusively owns everything nested inside it; nothing is
//! shared across sessions and no back-references exist. Phase is never stored
//! as a tag — every phase predicate here derives from the data alone, so a
//! snapshot can always answer "where is this game" without trusting a cached
//! label.

use crate::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// A player's standing answer to a team proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Approval {
    /// Not cast yet.
    Undecided,
    /// Approves the proposed team.
    Approved,
    /// Denies the proposed team.
    Denied,
}

/// A team member's success/fail vote on the mission itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    /// Not cast yet.
    Undecided,
    /// Votes for the mission to succeed.
    Success,
    /// Votes for the mission to fail.
    Fail,
}

/// A player in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Assigned role, `Undecided` until the game starts.
    pub role: Role,
}

/// A chat message appended to the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender's player ID.
    pub sender: PlayerId,
    /// Message text.
    pub text: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

/// One team proposal attempt within a mission.
///
/// Ballots are keyed by player identity rather than list position, so a read
/// never has to recompute a parallel-array index to find whose vote is whose.
/// An empty `approvals` map means the leader has not submitted a selection;
/// an empty `votes` map means the proposal has not been approved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Selected member IDs, in the order the leader picked them.
    pub members: Vec<PlayerId>,
    /// One slot per session player, all `Undecided` when the team is proposed.
    pub approvals: BTreeMap<PlayerId, Approval>,
    /// One slot per selected member, all `Undecided` once approval completes.
    pub votes: BTreeMap<PlayerId, Vote>,
}

impl Team {
    /// Returns true while the leader has not submitted a member selection.
    pub fn is_unselected(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true while at least one approval slot is undecided.
    pub fn approvals_pending(&self) -> bool {
        self.approvals.values().any(|a| *a == Approval::Undecided)
    }

    /// Returns true once every approval is cast and deniers hold the tie or better.
    pub fn is_denied(&self) -> bool {
        if self.approvals.is_empty() || self.approvals_pending() {
            return false;
        }
        let denied = self
            .approvals
            .values()
            .filter(|a| **a == Approval::Denied)
            .count();
        let approved = self
            .approvals
            .values()
            .filter(|a| **a == Approval::Approved)
            .count();
        denied >= approved
    }

    /// Returns true while at least one success/fail slot is undecided.
    pub fn votes_pending(&self) -> bool {
        self.votes.values().any(|v| *v == Vote::Undecided)
    }

    /// Number of fail votes cast so far.
    pub fn fail_votes(&self) -> usize {
        self.votes.values().filter(|v| **v == Vote::Fail).count()
    }

    /// Returns true if the given player is on the selected team.
    pub fn has_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|m| m == player_id)
    }
}

/// One mission round: team attempts accumulate until one is approved and voted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Proposal attempts, oldest first. At most five per mission.
    pub teams: Vec<Team>,
}

/// The session document every command reads and mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    /// Session ID.
    pub id: SessionId,
    /// Founder's player ID.
    pub owner: PlayerId,
    /// Display name of the session.
    pub name: String,
    /// Players in join order, the owner first.
    pub players: Vec<Player>,
    /// Missions in play order, append-only.
    pub missions: Vec<Mission>,
    /// Merlin-guess outcome: unset, or whether the guess named Merlin.
    pub merlin_guess: Option<bool>,
    /// Chat log, append-only.
    pub messages: Vec<Message>,
    /// Bumped by the store on every successful mutation.
    pub version: u64,
}

impl GameSession {
    /// Creates a session founded by `owner`, who joins as the first player.
    #[instrument(skip(name), fields(name = %name))]
    pub fn new(id: SessionId, owner: PlayerId, name: String) -> Self {
        info!(session_id = %id, owner = %owner, "Creating game session");
        Self {
            id,
            owner: owner.clone(),
            name,
            players: vec![Player {
                id: owner,
                role: Role::Undecided,
            }],
            missions: Vec::new(),
            merlin_guess: None,
            messages: Vec::new(),
            version: 0,
        }
    }

    /// Returns true if `player_id` founded this session.
    pub fn has_owner(&self, player_id: &str) -> bool {
        self.owner == player_id
    }

    /// Returns true if `player_id` belongs to this session.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Position of `player_id` in the player list, if present.
    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    /// Role of `player_id`, or `None` if the session has no such player.
    pub fn player_role(&self, player_id: &str) -> Option<Role> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.role)
    }

    /// Returns true once any mission exists.
    pub fn is_playing(&self) -> bool {
        !self.missions.is_empty()
    }

    /// The most recent team attempt, if any mission is open.
    pub fn last_team(&self) -> Option<&Team> {
        self.missions.last().and_then(|m| m.teams.last())
    }

    /// Mutable access to the most recent team attempt.
    pub fn last_team_mut(&mut self) -> Option<&mut Team> {
        self.missions.last_mut().and_then(|m| m.teams.last_mut())
    }

    /// Total team attempts ever appended, across all missions.
    ///
    /// Leadership rotates once per attempt, rejected proposals included, so
    /// this count is the session-wide rotation clock.
    pub fn teams_count(&self) -> usize {
        self.missions.iter().map(|m| m.teams.len()).sum()
    }

    /// The player leading the current team attempt, if the game is underway.
    pub fn leader(&self) -> Option<&Player> {
        if self.missions.is_empty() || self.teams_count() == 0 {
            return None;
        }
        self.players
            .get((self.teams_count() - 1) % self.players.len())
    }

    /// Returns true if `player_id` leads the current team attempt.
    pub fn has_leader(&self, player_id: &str) -> bool {
        self.leader().is_some_and(|p| p.id == player_id)
    }

    /// Returns true if `player_id` is on the current team.
    pub fn has_member(&self, player_id: &str) -> bool {
        self.last_team().is_some_and(|t| t.has_member(player_id))
    }

    /// Returns true while the current attempt awaits the leader's selection.
    pub fn is_selecting_members(&self) -> bool {
        self.last_team().is_some_and(Team::is_unselected)
    }

    /// Returns true while the current attempt awaits approvals.
    pub fn is_waiting_for_approval(&self) -> bool {
        self.last_team().is_some_and(Team::approvals_pending)
    }

    /// Returns true while the current attempt awaits success/fail votes.
    pub fn is_waiting_for_vote(&self) -> bool {
        self.last_team().is_some_and(Team::votes_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_players(n: usize) -> GameSession {
        let mut session = GameSession::new("s1".into(), "p0".into(), "Round Table".into());
        for i in 1..n {
            session.players.push(Player {
                id: format!("p{i}"),
                role: Role::Undecided,
            });
        }
        session
    }

    #[test]
    fn test_owner_is_first_player() {
        let session = GameSession::new("s1".into(), "owner".into(), "Camelot".into());
        assert!(session.has_owner("owner"));
        assert!(session.has_player("owner"));
        assert_eq!(session.player_index("owner"), Some(0));
        assert_eq!(session.player_role("owner"), Some(Role::Undecided));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_leader_rotates_across_missions() {
        let mut session = session_with_players(5);
        // Two attempts in mission 0, one in mission 1: rotation never resets.
        session.missions.push(Mission {
            teams: vec![Team::default(), Team::default()],
        });
        session.missions.push(Mission {
            teams: vec![Team::default()],
        });
        assert_eq!(session.teams_count(), 3);
        assert_eq!(session.leader().unwrap().id, "p2");
        assert!(session.has_leader("p2"));
        assert!(!session.has_leader("p0"));
    }

    #[test]
    fn test_denied_requires_complete_ballot() {
        let mut team = Team {
            members: vec!["p0".into(), "p1".into()],
            ..Team::default()
        };
        for i in 0..5 {
            team.approvals.insert(format!("p{i}"), Approval::Undecided);
        }
        assert!(team.approvals_pending());
        assert!(!team.is_denied());

        // 2 denies vs 3 approves once complete: approved.
        for i in 0..5 {
            let ballot = if i < 2 {
                Approval::Denied
            } else {
                Approval::Approved
            };
            team.approvals.insert(format!("p{i}"), ballot);
        }
        assert!(!team.approvals_pending());
        assert!(!team.is_denied());
    }

    #[test]
    fn test_denied_on_tie() {
        let mut team = Team::default();
        for i in 0..6 {
            let ballot = if i < 3 {
                Approval::Denied
            } else {
                Approval::Approved
            };
            team.approvals.insert(format!("p{i}"), ballot);
        }
        assert!(team.is_denied());
    }

    #[test]
    fn test_phase_predicates_follow_last_team() {
        let mut session = session_with_players(5);
        assert!(!session.is_selecting_members());

        session.missions.push(Mission {
            teams: vec![Team::default()],
        });
        assert!(session.is_selecting_members());
        assert!(!session.is_waiting_for_approval());

        let player_ids: Vec<PlayerId> = session.players.iter().map(|p| p.id.clone()).collect();
        let team = session.last_team_mut().unwrap();
        team.members = vec!["p0".into(), "p1".into()];
        for id in &player_ids {
            team.approvals.insert(id.clone(), Approval::Undecided);
        }
        assert!(!session.is_selecting_members());
        assert!(session.is_waiting_for_approval());
        assert!(session.has_member("p1"));
        assert!(!session.has_member("p4"));
    }
}
