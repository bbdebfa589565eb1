//! Authenticated session commands and read projections.
//!
//! Every command loads the session inside one atomic store update, validates
//! the caller, asks the engine for the transition, and lets the same update
//! carry any deterministic follow-up progression (an approval tally opening
//! the vote, a resolved vote opening the next mission). A rejected command
//! never writes.

use crate::advisor::{self, Situation};
use crate::assignment;
use crate::engine::{AttemptSummary, MissionEngine, Phase};
use crate::error::GameError;
use crate::oracle::{self, Disclosure};
use crate::roles::{GameConfig, Role};
use crate::session::{GameSession, Message, Player, PlayerId, SessionId};
use crate::store::{Commit, SessionStore};
use chrono::Utc;
use derive_getters::Getters;
use derive_new::new;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// List projection of a session: membership and progress, no roles or votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct SessionSummary {
    /// Session ID.
    id: SessionId,
    /// Display name.
    name: String,
    /// Founder's player ID.
    owner: PlayerId,
    /// Member IDs in join order.
    player_ids: Vec<PlayerId>,
    /// Missions started so far.
    mission_count: usize,
    /// One-line status.
    status: String,
}

/// One player as a given viewer is allowed to see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct PlayerView {
    /// Player ID.
    id: PlayerId,
    /// Role label and alignment as disclosed to the viewer.
    disclosure: Disclosure,
    /// Current-round status label, when the round gives this player one.
    status: Option<String>,
}

/// Detail projection of a session, redacted for one viewer.
///
/// Roles pass through the disclosure oracle before leaving the server, so
/// handing this struct to a client cannot leak another player's identity —
/// the redaction boundary lives here, not in the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct SessionView {
    /// Session ID.
    id: SessionId,
    /// Display name.
    name: String,
    /// Founder's player ID.
    owner: PlayerId,
    /// Players as the viewer may see them, in join order.
    players: Vec<PlayerView>,
    /// Index of the current leader in the player list, if a round is open.
    leader_index: Option<usize>,
    /// Per-mission, per-attempt public records.
    missions: Vec<Vec<AttemptSummary>>,
    /// Derived phase.
    phase: Phase,
    /// One-line status and winner.
    situation: Situation,
    /// The viewer's contextual hint, if any applies.
    suggestion: Option<String>,
    /// Merlin-guess outcome, set once the Assassin has guessed.
    merlin_guess: Option<bool>,
    /// Chat log.
    messages: Vec<Message>,
}

/// Runs authenticated commands against sessions held in a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct GameService {
    store: SessionStore,
    engine: MissionEngine,
}

impl Default for GameService {
    fn default() -> Self {
        Self::new()
    }
}

impl GameService {
    /// Creates a service over a fresh store with the standard rule tables.
    #[instrument]
    pub fn new() -> Self {
        Self::with_store(SessionStore::new(), GameConfig::standard())
    }

    /// Creates a service over an existing store and rule set.
    #[instrument(skip(store))]
    pub fn with_store(store: SessionStore, config: GameConfig) -> Self {
        info!("Creating game service");
        Self {
            store,
            engine: MissionEngine::new(config),
        }
    }

    /// The engine and rule tables this service runs under.
    pub fn engine(&self) -> &MissionEngine {
        &self.engine
    }

    fn authenticate(caller: &str) -> Result<(), GameError> {
        if caller.is_empty() {
            warn!("Command issued without an identity");
            return Err(GameError::NotAuthenticated);
        }
        Ok(())
    }

    fn generate_id() -> SessionId {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(17)
            .map(char::from)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    //  Commands
    // ─────────────────────────────────────────────────────────────

    /// Founds a session; the caller joins as its first player.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a caller identity.
    #[instrument(skip(self, name), fields(name = %name))]
    pub fn create_session(&self, caller: &str, name: String) -> Result<SessionId, GameError> {
        Self::authenticate(caller)?;
        let id = Self::generate_id();
        self.store
            .insert(GameSession::new(id.clone(), caller.to_string(), name))?;
        info!(session_id = %id, "Session created");
        Ok(id)
    }

    /// Joins an open session.
    ///
    /// # Errors
    ///
    /// `AlreadyMember` when the caller is in the session; `AccessDenied` once
    /// the game has started or the session is full.
    #[instrument(skip(self))]
    pub fn join(&self, caller: &str, session_id: &str) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let max_players = self.engine.config().max_players();
        self.store.update(session_id, |session| {
            if session.has_player(caller) {
                return Err(GameError::AlreadyMember);
            }
            if session.is_playing() || session.players.len() >= max_players {
                warn!(caller, "Join rejected: session closed or full");
                return Err(GameError::AccessDenied);
            }
            session.players.push(Player {
                id: caller.to_string(),
                role: Role::Undecided,
            });
            info!(caller, count = session.players.len(), "Player joined");
            Ok(())
        })
    }

    /// Leaves a session before the game starts. The last player to leave
    /// takes the session with them.
    ///
    /// The emptiness check and the removal run inside one store operation, so
    /// a join accepted concurrently can never be erased by a stale "session is
    /// empty" read.
    ///
    /// # Errors
    ///
    /// `NotMember` when the caller is not in the session; `AccessDenied` once
    /// the game has started.
    #[instrument(skip(self))]
    pub fn leave(&self, caller: &str, session_id: &str) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        self.store.update_or_remove(session_id, |session| {
            if !session.has_player(caller) {
                return Err(GameError::NotMember);
            }
            if session.is_playing() {
                warn!(caller, "Leave rejected: game in progress");
                return Err(GameError::AccessDenied);
            }
            session.players.retain(|p| p.id != caller);
            info!(caller, count = session.players.len(), "Player left");
            let commit = if session.players.is_empty() {
                Commit::Remove
            } else {
                Commit::Keep
            };
            Ok(((), commit))
        })
    }

    /// Starts play (owner only). A reset start wipes the session back to its
    /// pre-game shape instead of dealing roles.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for non-owners or a player count outside the tables;
    /// `InvalidRoleSelection` for a bad additional-role pick.
    #[instrument(skip(self, additional_roles))]
    pub fn start(
        &self,
        caller: &str,
        session_id: &str,
        reset: bool,
        additional_roles: &[Role],
    ) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let engine = &self.engine;
        self.store.update(session_id, |session| {
            if !session.has_owner(caller) {
                warn!(caller, "Start rejected: not the owner");
                return Err(GameError::AccessDenied);
            }
            if reset {
                assignment::reset_roles(session);
                return Ok(());
            }
            let config = engine.config();
            let count = session.players.len();
            if count < config.min_players() || count > config.max_players() {
                warn!(count, "Start rejected: player count outside the tables");
                return Err(GameError::AccessDenied);
            }
            assignment::deal_roles(session, config, additional_roles, &mut rand::thread_rng())?;
            engine.start_mission(session);
            Ok(())
        })
    }

    /// Submits the leader's team selection.
    ///
    /// # Errors
    ///
    /// `AccessDenied` unless the caller leads the open attempt;
    /// `InvalidTeamSelection` for a malformed selection.
    #[instrument(skip(self))]
    pub fn select_members(
        &self,
        caller: &str,
        session_id: &str,
        member_indices: &[usize],
    ) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let engine = &self.engine;
        self.store.update(session_id, |session| {
            if !session.has_leader(caller) {
                warn!(caller, "Selection rejected: not the leader");
                return Err(GameError::AccessDenied);
            }
            engine.select_members(session, member_indices)
        })
    }

    /// Casts or recasts the caller's approval ballot. Completing the ballot
    /// advances the round in the same atomic update.
    ///
    /// # Errors
    ///
    /// `NotMember` for outsiders; `AccessDenied` outside the approval phase.
    #[instrument(skip(self))]
    pub fn approve(
        &self,
        caller: &str,
        session_id: &str,
        approval: bool,
    ) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let engine = &self.engine;
        self.store.update(session_id, |session| {
            if !session.has_player(caller) {
                return Err(GameError::NotMember);
            }
            engine.record_approval(session, caller, approval)
        })
    }

    /// Casts or recasts the caller's success/fail vote. Completing the vote
    /// resolves the mission and opens the next one in the same atomic update.
    ///
    /// # Errors
    ///
    /// `NotMember` unless the caller is on the current team; `AccessDenied`
    /// outside the voting phase.
    #[instrument(skip(self))]
    pub fn vote(&self, caller: &str, session_id: &str, success: bool) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let engine = &self.engine;
        self.store.update(session_id, |session| {
            if !session.has_member(caller) {
                return Err(GameError::NotMember);
            }
            engine.record_vote(session, caller, success)
        })
    }

    /// Records the Assassin's guess at Merlin, ending the game.
    ///
    /// # Errors
    ///
    /// `AccessDenied` unless the caller holds the Assassin role and the
    /// session is in the guessing phase.
    #[instrument(skip(self))]
    pub fn guess_merlin(
        &self,
        caller: &str,
        session_id: &str,
        target_index: usize,
    ) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        let engine = &self.engine;
        self.store.update(session_id, |session| {
            if session.player_role(caller) != Some(Role::Assassin) {
                warn!(caller, "Guess rejected: not the Assassin");
                return Err(GameError::AccessDenied);
            }
            engine.record_guess(session, target_index)
        })
    }

    /// Appends a chat message. Empty text is a no-op.
    ///
    /// # Errors
    ///
    /// `NotMember` for outsiders.
    #[instrument(skip(self, text))]
    pub fn send_message(
        &self,
        caller: &str,
        session_id: &str,
        text: String,
    ) -> Result<(), GameError> {
        Self::authenticate(caller)?;
        if text.is_empty() {
            return Ok(());
        }
        self.store.update(session_id, |session| {
            if !session.has_player(caller) {
                return Err(GameError::NotMember);
            }
            session.messages.push(Message {
                sender: caller.to_string(),
                text,
                sent_at: Utc::now(),
            });
            Ok(())
        })
    }

    // ─────────────────────────────────────────────────────────────
    //  Projections
    // ─────────────────────────────────────────────────────────────

    /// Lists every session: membership and progress only, roles and votes
    /// hidden.
    #[instrument(skip(self))]
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, GameError> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(|session| {
                let status = advisor::situation(&session, &self.engine).status;
                SessionSummary::new(
                    session.id.clone(),
                    session.name.clone(),
                    session.owner.clone(),
                    session.players.iter().map(|p| p.id.clone()).collect(),
                    session.missions.len(),
                    status,
                )
            })
            .collect())
    }

    /// Builds the detail projection of one session as `viewer` may see it.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no session lives under `session_id`.
    #[instrument(skip(self))]
    pub fn session_view(
        &self,
        session_id: &str,
        viewer: &str,
    ) -> Result<SessionView, GameError> {
        let session = self.store.get(session_id)?;
        let viewer_role = session.player_role(viewer);
        let players = session
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| {
                let disclosure =
                    oracle::disclose(viewer_role, player.role, player.id == viewer);
                let status =
                    oracle::round_status(&session, viewer, index).map(str::to_string);
                PlayerView::new(player.id.clone(), disclosure, status)
            })
            .collect();
        let leader_index = session.leader().and_then(|p| session.player_index(&p.id));
        Ok(SessionView::new(
            session.id.clone(),
            session.name.clone(),
            session.owner.clone(),
            players,
            leader_index,
            self.engine.summaries(&session),
            self.engine.phase(&session),
            advisor::situation(&session, &self.engine),
            advisor::suggest(&session, &self.engine, viewer),
            session.merlin_guess,
            session.messages.clone(),
        ))
    }

    /// Returns the raw session document. Trusted, server-side reads only —
    /// nothing here is redacted.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no session lives under `session_id`.
    #[instrument(skip(self))]
    pub fn snapshot(&self, session_id: &str) -> Result<GameSession, GameError> {
        self.store.get(session_id)
    }
}
