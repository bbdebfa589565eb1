//! Contextual hints and the one-line session situation.

use crate::engine::{MissionEngine, Phase, Winner};
use crate::roles::Role;
use crate::session::{Approval, GameSession, Vote};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One-line description of where the session stands, viewer-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    /// Human-readable status line.
    pub status: String,
    /// The winning side, once the game is finished.
    pub winner: Option<Winner>,
}

/// Describes the session's current standing.
#[instrument(skip(session, engine), fields(session_id = %session.id))]
pub fn situation(session: &GameSession, engine: &MissionEngine) -> Situation {
    let config = engine.config();
    let (status, winner) = match engine.phase(session) {
        Phase::Lobby => {
            if session.players.len() < config.min_players() {
                ("Waiting for more players".to_string(), None)
            } else {
                ("Ready".to_string(), None)
            }
        }
        Phase::SelectingMembers => ("Leader is selecting team members".to_string(), None),
        Phase::WaitingForApproval => (
            "Waiting for players to approve the mission team members".to_string(),
            None,
        ),
        Phase::WaitingForVote => (
            "Waiting for team members to vote for the mission success or fail".to_string(),
            None,
        ),
        Phase::GuessingMerlin => (
            "Waiting for Assassin to guess Merlin's identity".to_string(),
            None,
        ),
        Phase::Finished(Winner::Good) => ("Good players win".to_string(), Some(Winner::Good)),
        Phase::Finished(Winner::Evil) => ("Evil players win".to_string(), Some(Winner::Evil)),
    };
    Situation { status, winner }
}

/// Produces the one hint relevant to `viewer_id` right now, if any.
///
/// Priority order: the owner setting up additional roles, the leader picking
/// a team, any player holding an approval ballot, a team member holding a
/// mission vote, and finally the Assassin with a guess to make. A hint echoes
/// the viewer's own already-cast choice where one exists.
#[instrument(skip(session, engine), fields(session_id = %session.id))]
pub fn suggest(session: &GameSession, engine: &MissionEngine, viewer_id: &str) -> Option<String> {
    let config = engine.config();
    let phase = engine.phase(session);

    if phase == Phase::Lobby && session.has_owner(viewer_id) {
        let budget = config.evil_count(session.players.len()).saturating_sub(1);
        return Some(format!(
            "Select additional roles if you want (you can only select up to \
             {budget} additional evil role(s))"
        ));
    }
    if phase == Phase::SelectingMembers && session.has_leader(viewer_id) {
        let required = config.team_size(session.players.len(), session.missions.len() - 1)?;
        return Some(format!(
            "Pick player cards then submit your selection to send {required} team members \
             on the mission"
        ));
    }
    if phase == Phase::WaitingForApproval && session.has_player(viewer_id) {
        let echo = match session.last_team()?.approvals.get(viewer_id) {
            Some(Approval::Approved) => " (You approved)",
            Some(Approval::Denied) => " (You denied)",
            _ => "",
        };
        return Some(format!(
            "Approve or deny the mission team members{echo}"
        ));
    }
    if phase == Phase::WaitingForVote && session.has_member(viewer_id) {
        let echo = match session.last_team()?.votes.get(viewer_id) {
            Some(Vote::Success) => " (You voted for success)",
            Some(Vote::Fail) => " (You voted for fail)",
            _ => "",
        };
        return Some(format!(
            "Vote for the mission to succeed or fail{echo}"
        ));
    }
    if phase == Phase::GuessingMerlin && session.player_role(viewer_id) == Some(Role::Assassin) {
        return Some("Pick one player card and guess who is Merlin".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::GameConfig;
    use crate::session::Player;

    fn engine() -> MissionEngine {
        MissionEngine::new(GameConfig::standard())
    }

    fn lobby_session(n: usize) -> GameSession {
        let mut session = GameSession::new("s1".into(), "p0".into(), "Camelot".into());
        for i in 1..n {
            session.players.push(Player {
                id: format!("p{i}"),
                role: Role::Undecided,
            });
        }
        session
    }

    fn started_session(n: usize) -> GameSession {
        let mut session = lobby_session(n);
        session.players[0].role = Role::Merlin;
        session.players[1].role = Role::Assassin;
        for i in 2..n {
            session.players[i].role = if i < 1 + GameConfig::standard().evil_count(n) {
                Role::Minion
            } else {
                Role::Servant
            };
        }
        engine().start_mission(&mut session);
        session
    }

    #[test]
    fn test_situation_pre_game() {
        let short = lobby_session(3);
        assert_eq!(
            situation(&short, &engine()).status,
            "Waiting for more players"
        );
        let ready = lobby_session(5);
        assert_eq!(situation(&ready, &engine()).status, "Ready");
    }

    #[test]
    fn test_owner_hint_names_evil_budget() {
        let session = lobby_session(7);
        let hint = suggest(&session, &engine(), "p0").unwrap();
        assert!(hint.contains("up to 2 additional evil role(s)"), "{hint}");
        assert_eq!(suggest(&session, &engine(), "p1"), None);
    }

    #[test]
    fn test_leader_hint_names_team_size() {
        let session = started_session(6);
        // First attempt: p0 leads, mission 0 of 6 players needs 2.
        let hint = suggest(&session, &engine(), "p0").unwrap();
        assert!(hint.contains("2 team members"), "{hint}");
        assert_eq!(suggest(&session, &engine(), "p1"), None);
    }

    #[test]
    fn test_approval_hint_echoes_prior_choice() {
        let mut session = started_session(5);
        engine().select_members(&mut session, &[0, 1]).unwrap();
        let before = suggest(&session, &engine(), "p2").unwrap();
        assert!(!before.contains("You"), "{before}");

        engine().record_approval(&mut session, "p2", false).unwrap();
        let after = suggest(&session, &engine(), "p2").unwrap();
        assert!(after.contains("(You denied)"), "{after}");
    }

    #[test]
    fn test_vote_hint_only_for_members() {
        let mut session = started_session(5);
        engine().select_members(&mut session, &[0, 1]).unwrap();
        for i in 0..5 {
            engine()
                .record_approval(&mut session, &format!("p{i}"), true)
                .unwrap();
        }
        engine().record_vote(&mut session, "p0", true).unwrap();

        let member = suggest(&session, &engine(), "p0").unwrap();
        assert!(member.contains("(You voted for success)"), "{member}");
        assert_eq!(suggest(&session, &engine(), "p2"), None);
    }

    #[test]
    fn test_assassin_hint_during_guess() {
        let mut session = started_session(5);
        let required = [2, 3, 2];
        for size in required {
            let indices: Vec<usize> = (0..size).collect();
            engine().select_members(&mut session, &indices).unwrap();
            for i in 0..5 {
                engine()
                    .record_approval(&mut session, &format!("p{i}"), true)
                    .unwrap();
            }
            let members = session.last_team().unwrap().members.clone();
            for id in &members {
                engine().record_vote(&mut session, id, true).unwrap();
            }
        }
        assert_eq!(engine().phase(&session), Phase::GuessingMerlin);
        // p1 is the Assassin in the fixture.
        assert!(suggest(&session, &engine(), "p1").is_some());
        assert_eq!(suggest(&session, &engine(), "p0"), None);
        assert_eq!(
            situation(&session, &engine()).status,
            "Waiting for Assassin to guess Merlin's identity"
        );
    }
}
