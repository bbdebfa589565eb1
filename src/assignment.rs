//! Role assignment at game start.
//!
//! A non-reset start deals a shuffled role permutation; a reset start wipes
//! the session back to its pre-game shape so the same players can go again.

use crate::error::GameError;
use crate::roles::{GameConfig, Role};
use crate::session::GameSession;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

/// Deals roles for a fresh game.
///
/// The dealt multiset is {Merlin, Assassin} plus the chosen additional roles
/// plus enough Servant and Minion fillers to reach exactly `player_count`
/// roles with exactly `evil_count` evil among them. The multiset is permuted
/// uniformly and assigned one-to-one in player-list order, and the mission
/// list and any previous guess outcome are cleared.
///
/// # Errors
///
/// `InvalidRoleSelection` when the player count falls outside the rule
/// tables, an additional role is not one of the four optional identities,
/// repeats, or the evil picks exceed `evil_count - 1` (the Assassin is
/// mandatory and already fills one evil slot). Nothing is mutated on
/// rejection.
#[instrument(skip(session, rng), fields(session_id = %session.id))]
pub fn deal_roles(
    session: &mut GameSession,
    config: &GameConfig,
    additional_roles: &[Role],
    rng: &mut impl Rng,
) -> Result<(), GameError> {
    let player_count = session.players.len();
    if player_count < config.min_players() || player_count > config.max_players() {
        warn!(player_count, "Player count outside the rule tables");
        return Err(GameError::InvalidRoleSelection);
    }
    let evil_count = config.evil_count(player_count);

    if additional_roles.iter().any(|r| !r.is_optional()) {
        warn!(?additional_roles, "Non-optional role in additional selection");
        return Err(GameError::InvalidRoleSelection);
    }
    let mut seen = std::collections::HashSet::new();
    if !additional_roles.iter().all(|r| seen.insert(*r)) {
        warn!(?additional_roles, "Duplicate additional role");
        return Err(GameError::InvalidRoleSelection);
    }
    let additional_evil = additional_roles.iter().filter(|r| r.is_evil()).count();
    if additional_evil > evil_count.saturating_sub(1) {
        warn!(
            additional_evil,
            evil_count, "Too many additional evil roles"
        );
        return Err(GameError::InvalidRoleSelection);
    }

    let mut roles: Vec<Role> = additional_roles.to_vec();
    roles.push(Role::Merlin);
    roles.push(Role::Assassin);
    let good_so_far = roles.iter().filter(|r| r.is_good()).count();
    let evil_so_far = roles.iter().filter(|r| r.is_evil()).count();
    roles.extend(std::iter::repeat_n(
        Role::Servant,
        player_count - evil_count - good_so_far,
    ));
    roles.extend(std::iter::repeat_n(Role::Minion, evil_count - evil_so_far));
    debug_assert_eq!(roles.len(), player_count);

    roles.shuffle(rng);
    for (player, role) in session.players.iter_mut().zip(roles) {
        player.role = role;
    }
    session.missions.clear();
    session.merlin_guess = None;
    info!(player_count, evil_count, "Roles dealt");
    Ok(())
}

/// Resets a session to its pre-game shape: every role back to `Undecided`,
/// the guess outcome and message log cleared, no missions. The "play again"
/// path; no random assignment happens here.
#[instrument(skip(session), fields(session_id = %session.id))]
pub fn reset_roles(session: &mut GameSession) {
    for player in &mut session.players {
        player.role = Role::Undecided;
    }
    session.missions.clear();
    session.merlin_guess = None;
    session.messages.clear();
    info!("Session reset to pre-game state");
}
