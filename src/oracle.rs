//! Per-viewer information disclosure.
//!
//! Everything here is pure: given who is looking and who is looked at, these
//! functions decide what may be revealed. The service builds its redacted
//! projections exclusively from these answers, so a client never has to be
//! trusted to hide a role it was handed.

use crate::roles::{Alignment, Role};
use crate::session::{Approval, GameSession, Vote};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// What a viewer is allowed to learn about one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    /// Label shown for the player: a role name, "Good", "Evil", "Unknown",
    /// or "Undecided" pre-game.
    pub label: String,
    /// Alignment shown for the player, if any is revealed.
    pub alignment: Option<Alignment>,
}

impl Disclosure {
    fn new(label: impl Into<String>, alignment: Option<Alignment>) -> Self {
        Self {
            label: label.into(),
            alignment,
        }
    }

    fn unknown() -> Self {
        Self::new("Unknown", None)
    }
}

/// Computes what `viewer_role` may learn about a player holding
/// `target_role`. `is_self` marks the viewer looking at their own card.
///
/// The asymmetries: Merlin sees every evil player except Mordred; Percival
/// cannot tell Merlin from Morgana; the evil team knows each other except
/// Oberon, who knows and is known by nobody.
#[instrument]
pub fn disclose(viewer_role: Option<Role>, target_role: Role, is_self: bool) -> Disclosure {
    if target_role == Role::Undecided {
        return Disclosure::new("Undecided", None);
    }
    let Some(viewer_role) = viewer_role else {
        // Spectators and strangers learn nothing.
        return Disclosure::unknown();
    };
    if is_self {
        return Disclosure::new(viewer_role.to_string(), viewer_role.alignment());
    }
    match viewer_role {
        Role::Undecided | Role::Servant | Role::Oberon => Disclosure::unknown(),
        Role::Merlin => {
            if target_role.is_evil() && target_role != Role::Mordred {
                Disclosure::new("Evil", Some(Alignment::Evil))
            } else {
                // Mordred hides among the good here.
                Disclosure::new("Good", Some(Alignment::Good))
            }
        }
        Role::Percival => {
            if matches!(target_role, Role::Merlin | Role::Morgana) {
                Disclosure::new("Merlin", Some(Alignment::Good))
            } else {
                Disclosure::unknown()
            }
        }
        Role::Minion | Role::Assassin | Role::Mordred | Role::Morgana => {
            if target_role.is_evil() && target_role != Role::Oberon {
                Disclosure::new("Evil", Some(Alignment::Evil))
            } else {
                // Oberon blends in with the good even to his own side.
                Disclosure::new("Good", Some(Alignment::Good))
            }
        }
    }
}

/// Status label for the player at `target_index` during the current round,
/// from `viewer_id`'s point of view.
///
/// While approvals are open every cast ballot is public. While the mission
/// vote is open only team members carry a status, and a viewer sees nothing
/// beyond "Waiting" for anyone but themself.
#[instrument(skip(session), fields(session_id = %session.id))]
pub fn round_status(
    session: &GameSession,
    viewer_id: &str,
    target_index: usize,
) -> Option<&'static str> {
    let target = session.players.get(target_index)?;
    let team = session.last_team()?;
    if session.is_waiting_for_approval() {
        return Some(match team.approvals.get(&target.id) {
            None | Some(Approval::Undecided) => "Undecided",
            Some(Approval::Approved) => "Approved",
            Some(Approval::Denied) => "Denied",
        });
    }
    if session.is_waiting_for_vote() {
        let vote = team.votes.get(&target.id)?;
        let own = target.id == viewer_id;
        return Some(match vote {
            Vote::Undecided => "Waiting",
            _ if !own => "Waiting",
            Vote::Success => "Voted Success",
            Vote::Fail => "Voted Fail",
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role::*;

    fn label(viewer: Role, target: Role) -> String {
        disclose(Some(viewer), target, false).label
    }

    #[test]
    fn test_self_disclosure_names_own_role() {
        for role in [Servant, Merlin, Percival, Minion, Assassin, Mordred, Morgana, Oberon] {
            let d = disclose(Some(role), role, true);
            assert_eq!(d.label, role.to_string());
            assert_eq!(d.alignment, role.alignment());
        }
    }

    #[test]
    fn test_undecided_target_trumps_everything() {
        let d = disclose(Some(Merlin), Undecided, false);
        assert_eq!(d.label, "Undecided");
        assert_eq!(d.alignment, None);
        let d = disclose(Some(Undecided), Undecided, true);
        assert_eq!(d.label, "Undecided");
    }

    #[test]
    fn test_servant_sees_nothing() {
        for target in [Merlin, Minion, Oberon, Servant] {
            assert_eq!(label(Servant, target), "Unknown");
        }
    }

    #[test]
    fn test_merlin_sees_evil_except_mordred() {
        for target in [Minion, Assassin, Morgana, Oberon] {
            let d = disclose(Some(Merlin), target, false);
            assert_eq!(d.label, "Evil");
            assert_eq!(d.alignment, Some(Alignment::Evil));
        }
        let d = disclose(Some(Merlin), Mordred, false);
        assert_eq!(d.label, "Good");
        assert_eq!(d.alignment, Some(Alignment::Good));
        assert_eq!(label(Merlin, Servant), "Good");
    }

    #[test]
    fn test_percival_cannot_tell_merlin_from_morgana() {
        assert_eq!(label(Percival, Merlin), "Merlin");
        assert_eq!(label(Percival, Morgana), "Merlin");
        assert_eq!(
            disclose(Some(Percival), Morgana, false).alignment,
            Some(Alignment::Good)
        );
        assert_eq!(label(Percival, Mordred), "Unknown");
        assert_eq!(label(Percival, Servant), "Unknown");
    }

    #[test]
    fn test_evil_team_knows_itself_except_oberon() {
        for viewer in [Minion, Assassin, Mordred, Morgana] {
            for target in [Minion, Assassin, Mordred, Morgana] {
                if viewer == target {
                    continue;
                }
                assert_eq!(label(viewer, target), "Evil", "{viewer} viewing {target}");
            }
            // Oberon never shows as a teammate.
            assert_eq!(label(viewer, Oberon), "Good");
            assert_eq!(label(viewer, Merlin), "Good");
        }
    }

    #[test]
    fn test_oberon_is_blind() {
        for target in [Minion, Assassin, Mordred, Morgana, Merlin, Servant] {
            assert_eq!(label(Oberon, target), "Unknown");
        }
        let d = disclose(Some(Oberon), Oberon, true);
        assert_eq!(d.label, "Oberon");
        assert_eq!(d.alignment, Some(Alignment::Evil));
    }

    #[test]
    fn test_outsider_sees_unknown() {
        let d = disclose(None, Merlin, false);
        assert_eq!(d.label, "Unknown");
        assert_eq!(d.alignment, None);
    }

    mod status {
        use super::super::*;
        use crate::session::{Mission, Player, Team};

        fn session_in_vote_phase() -> GameSession {
            let mut session = GameSession::new("s1".into(), "p0".into(), "Camelot".into());
            for i in 1..5 {
                session.players.push(Player {
                    id: format!("p{i}"),
                    role: Role::Servant,
                });
            }
            let mut team = Team {
                members: vec!["p0".into(), "p1".into()],
                ..Team::default()
            };
            for i in 0..5 {
                team.approvals.insert(format!("p{i}"), Approval::Approved);
            }
            team.votes.insert("p0".into(), Vote::Success);
            team.votes.insert("p1".into(), Vote::Undecided);
            session.missions.push(Mission { teams: vec![team] });
            session
        }

        #[test]
        fn test_approvals_are_public_once_cast() {
            let mut session = session_in_vote_phase();
            let team = session.last_team_mut().unwrap();
            team.votes.clear();
            team.approvals.insert("p1".into(), Approval::Undecided);
            team.approvals.insert("p2".into(), Approval::Denied);
            assert!(session.is_waiting_for_approval());

            // Identical for every viewer, own slot or not.
            for viewer in ["p0", "p3"] {
                assert_eq!(round_status(&session, viewer, 0), Some("Approved"));
                assert_eq!(round_status(&session, viewer, 1), Some("Undecided"));
                assert_eq!(round_status(&session, viewer, 2), Some("Denied"));
            }
        }

        #[test]
        fn test_own_vote_visible_others_waiting() {
            let session = session_in_vote_phase();
            assert!(session.is_waiting_for_vote());

            // p0 sees their own cast vote, everyone else sees Waiting.
            assert_eq!(round_status(&session, "p0", 0), Some("Voted Success"));
            assert_eq!(round_status(&session, "p1", 0), Some("Waiting"));
            // Undecided votes read Waiting even to their owner.
            assert_eq!(round_status(&session, "p1", 1), Some("Waiting"));
            // Non-members carry no status.
            assert_eq!(round_status(&session, "p0", 3), None);
        }
    }
}
