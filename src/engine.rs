//! Mission state machine: phase derivation, transitions, and win evaluation.
//!
//! The engine never stores a phase tag. Every transition mutates the session
//! document and every question about the game ("whose turn", "who won") is
//! re-derived from the document, so a transition and the tally it triggers
//! always happen against the same snapshot, inside the same store mutation.

use crate::error::GameError;
use crate::roles::{GameConfig, Role};
use crate::session::{Approval, GameSession, Mission, Team, Vote};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// The side that won a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    /// Good reached three successes and Merlin survived the guess.
    Good,
    /// Evil reached three fails, exhausted a mission, or named Merlin.
    Evil,
}

/// Where a session currently stands. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No mission exists yet; players may still join or leave.
    Lobby,
    /// The current leader has not submitted a team selection.
    SelectingMembers,
    /// A proposed team awaits everyone's approval ballot.
    WaitingForApproval,
    /// An approved team awaits its members' success/fail votes.
    WaitingForVote,
    /// Good reached three successes; the Assassin gets one guess at Merlin.
    GuessingMerlin,
    /// The game is over.
    Finished(Winner),
}

/// Outcome of one team attempt, as far as the session data reveals it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptResult {
    /// Selection, approval, or voting still in progress.
    Pending,
    /// The approval ballot completed with deniers holding the tie or better.
    Denied,
    /// Approved and voted, with fewer fail votes than the threshold.
    Succeeded,
    /// Approved and voted, with fail votes at or above the threshold.
    Failed,
}

/// Public record of one team attempt.
///
/// Exposes exactly what a finished attempt makes public: who was proposed,
/// who denied, and the fail-vote *count* once revealed. Individual
/// success/fail votes never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    /// Player-list indices of the proposed members.
    pub member_indices: Vec<usize>,
    /// Player-list indices of everyone who denied the proposal.
    pub denier_indices: Vec<usize>,
    /// Fail votes cast, revealed once the attempt resolves.
    pub fail_votes: Option<usize>,
    /// How the attempt ended, if it has.
    pub result: AttemptResult,
}

/// The state machine advancing sessions through mission and team phases.
#[derive(Debug, Clone, Default)]
pub struct MissionEngine {
    config: GameConfig,
}

impl MissionEngine {
    /// Creates an engine bound to the given rule tables.
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }

    /// The rule tables this engine runs under.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────
    //  Derived state
    // ─────────────────────────────────────────────────────────────

    /// Summarizes every team attempt of every mission.
    pub fn summaries(&self, session: &GameSession) -> Vec<Vec<AttemptSummary>> {
        let player_count = session.players.len();
        session
            .missions
            .iter()
            .enumerate()
            .map(|(ordinal, mission)| {
                mission
                    .teams
                    .iter()
                    .map(|team| self.summarize_attempt(session, team, player_count, ordinal))
                    .collect()
            })
            .collect()
    }

    fn summarize_attempt(
        &self,
        session: &GameSession,
        team: &Team,
        player_count: usize,
        ordinal: usize,
    ) -> AttemptSummary {
        let member_indices: Vec<usize> = team
            .members
            .iter()
            .filter_map(|id| session.player_index(id))
            .collect();
        let mut summary = AttemptSummary {
            member_indices,
            denier_indices: Vec::new(),
            fail_votes: None,
            result: AttemptResult::Pending,
        };
        if team.is_unselected() || team.approvals_pending() {
            return summary;
        }
        summary.denier_indices = team
            .approvals
            .iter()
            .filter(|(_, a)| **a == Approval::Denied)
            .filter_map(|(id, _)| session.player_index(id))
            .collect();
        if team.is_denied() {
            summary.result = AttemptResult::Denied;
        } else if !team.votes_pending() {
            let fails = team.fail_votes();
            summary.fail_votes = Some(fails);
            summary.result = if fails >= self.config.fail_threshold(player_count, ordinal) {
                AttemptResult::Failed
            } else {
                AttemptResult::Succeeded
            };
        }
        summary
    }

    /// Counts missions resolved in good's favor and in evil's favor.
    ///
    /// A mission's outcome is the result of its last attempt; denied or
    /// unresolved attempts count for neither side.
    pub fn resolved_counts(&self, session: &GameSession) -> (usize, usize) {
        let mut successes = 0;
        let mut failures = 0;
        for attempts in self.summaries(session) {
            match attempts.last().map(|a| a.result) {
                Some(AttemptResult::Succeeded) => successes += 1,
                Some(AttemptResult::Failed) => failures += 1,
                _ => {}
            }
        }
        (successes, failures)
    }

    /// Derives the session's phase from its data alone.
    pub fn phase(&self, session: &GameSession) -> Phase {
        if !session.is_playing() {
            return Phase::Lobby;
        }
        if session.is_selecting_members() {
            return Phase::SelectingMembers;
        }
        if session.is_waiting_for_approval() {
            return Phase::WaitingForApproval;
        }
        if session.is_waiting_for_vote() {
            return Phase::WaitingForVote;
        }
        let (successes, _) = self.resolved_counts(session);
        if successes >= self.config.missions_to_win() && session.merlin_guess.is_none() {
            return Phase::GuessingMerlin;
        }
        // Nothing pending and no guess outstanding: the game is over. Good
        // holds the win only when the recorded guess missed Merlin; an evil
        // mission majority, an exhausted mission, or a correct guess all
        // resolve to evil.
        match session.merlin_guess {
            Some(false) => Phase::Finished(Winner::Good),
            _ => Phase::Finished(Winner::Evil),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Transitions
    // ─────────────────────────────────────────────────────────────

    /// Appends a new mission and opens its first team attempt.
    ///
    /// Does nothing when either side has already resolved enough missions or
    /// the mission cap is reached: progression is terminal there.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn start_mission(&self, session: &mut GameSession) {
        let (successes, failures) = self.resolved_counts(session);
        if successes >= self.config.missions_to_win() || failures >= self.config.missions_to_win()
        {
            debug!(successes, failures, "Win tally reached, not starting a mission");
            return;
        }
        if session.missions.len() >= self.config.mission_cap() {
            warn!(missions = session.missions.len(), "Mission cap reached");
            return;
        }
        session.missions.push(Mission::default());
        info!(mission = session.missions.len() - 1, "Mission started");
        self.open_attempt(session);
    }

    /// Opens a fresh team attempt in the current mission.
    ///
    /// No-op once the mission holds its fifth attempt; a mission that burns
    /// every attempt without an approved team hands the game to evil.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn open_attempt(&self, session: &mut GameSession) {
        let attempt_cap = self.config.attempt_cap();
        let Some(mission) = session.missions.last_mut() else {
            return;
        };
        if mission.teams.len() >= attempt_cap {
            warn!(attempts = mission.teams.len(), "Attempt cap reached");
            return;
        }
        mission.teams.push(Team::default());
        debug!(
            attempt = mission.teams.len() - 1,
            total_attempts = session.teams_count(),
            "Team attempt opened"
        );
    }

    /// Records the leader's member selection and opens the approval ballot.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when no attempt awaits a selection;
    /// `InvalidTeamSelection` when the indices do not match the required team
    /// size, repeat, or fall out of range. Nothing is written on rejection.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn select_members(
        &self,
        session: &mut GameSession,
        member_indices: &[usize],
    ) -> Result<(), GameError> {
        if !session.is_selecting_members() {
            warn!("No team attempt awaiting selection");
            return Err(GameError::AccessDenied);
        }
        let player_count = session.players.len();
        let ordinal = session.missions.len() - 1;
        let required = self
            .config
            .team_size(player_count, ordinal)
            .ok_or(GameError::InvalidTeamSelection)?;
        let unique = member_indices
            .iter()
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        if member_indices.len() != required
            || unique != member_indices.len()
            || member_indices.iter().any(|i| *i >= player_count)
        {
            warn!(
                selected = member_indices.len(),
                required, "Invalid team selection"
            );
            return Err(GameError::InvalidTeamSelection);
        }

        let members: Vec<_> = member_indices
            .iter()
            .map(|i| session.players[*i].id.clone())
            .collect();
        let everyone: Vec<_> = session.players.iter().map(|p| p.id.clone()).collect();
        let team = session
            .last_team_mut()
            .ok_or(GameError::AccessDenied)?;
        team.members = members;
        team.approvals = everyone
            .into_iter()
            .map(|id| (id, Approval::Undecided))
            .collect();
        info!(?member_indices, "Team proposed, awaiting approvals");
        Ok(())
    }

    /// Records one player's approval ballot and, once the ballot completes,
    /// advances in the same mutation: a denied team reopens selection within
    /// the mission, an approved team opens the success/fail vote.
    ///
    /// Recasting before the ballot completes is allowed; the last write wins.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when no team awaits approvals, `NotMember` when the
    /// caller holds no slot in the ballot.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn record_approval(
        &self,
        session: &mut GameSession,
        player_id: &str,
        approval: bool,
    ) -> Result<(), GameError> {
        if !session.is_waiting_for_approval() {
            warn!("No team awaiting approval");
            return Err(GameError::AccessDenied);
        }
        let team = session.last_team_mut().ok_or(GameError::AccessDenied)?;
        let slot = team
            .approvals
            .get_mut(player_id)
            .ok_or(GameError::NotMember)?;
        *slot = if approval {
            Approval::Approved
        } else {
            Approval::Denied
        };
        if team.approvals_pending() {
            return Ok(());
        }
        if team.is_denied() {
            info!("Team denied, reopening selection");
            self.open_attempt(session);
        } else {
            team.votes = team
                .members
                .iter()
                .map(|id| (id.clone(), Vote::Undecided))
                .collect();
            info!("Team approved, awaiting success/fail votes");
        }
        Ok(())
    }

    /// Records one member's success/fail vote and, once every member has
    /// voted, resolves the mission and starts the next one in the same
    /// mutation (unless a side just won).
    ///
    /// Recasting before the vote completes is allowed; the last write wins.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when no team awaits votes, `NotMember` when the caller
    /// is not on the team.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn record_vote(
        &self,
        session: &mut GameSession,
        player_id: &str,
        success: bool,
    ) -> Result<(), GameError> {
        if !session.is_waiting_for_vote() {
            warn!("No team awaiting votes");
            return Err(GameError::AccessDenied);
        }
        let team = session.last_team_mut().ok_or(GameError::AccessDenied)?;
        let slot = team.votes.get_mut(player_id).ok_or(GameError::NotMember)?;
        *slot = if success { Vote::Success } else { Vote::Fail };
        if team.votes_pending() {
            return Ok(());
        }
        let (successes, failures) = self.resolved_counts(session);
        info!(successes, failures, "Mission resolved");
        self.start_mission(session);
        Ok(())
    }

    /// Records the Assassin's guess: whether `target_index` names Merlin.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when the session is not in the guessing phase or the
    /// index names no player.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn record_guess(
        &self,
        session: &mut GameSession,
        target_index: usize,
    ) -> Result<(), GameError> {
        if self.phase(session) != Phase::GuessingMerlin {
            warn!("Session is not awaiting a Merlin guess");
            return Err(GameError::AccessDenied);
        }
        let target = session
            .players
            .get(target_index)
            .ok_or(GameError::AccessDenied)?;
        let correct = target.role == Role::Merlin;
        session.merlin_guess = Some(correct);
        info!(target_index, correct, "Merlin guess recorded");
        Ok(())
    }
}
