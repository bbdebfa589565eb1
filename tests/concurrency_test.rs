//! Concurrent command handling against a shared session.

use avalon_engine::{GameError, GameService, Phase, SessionId};
use std::thread;

fn started_game(n: usize) -> (GameService, SessionId) {
    let service = GameService::new();
    let id = service
        .create_session("p0", "Round Table".to_string())
        .expect("create failed");
    for i in 1..n {
        service.join(&format!("p{i}"), &id).expect("join failed");
    }
    service.start("p0", &id, false, &[]).expect("start failed");
    (service, id)
}

#[test]
fn test_racing_approvals_advance_the_round_exactly_once() {
    let (service, id) = started_game(5);
    service.select_members("p0", &id, &[0, 1]).unwrap();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let service = service.clone();
            let id = id.clone();
            thread::spawn(move || service.approve(&format!("p{i}"), &id, true).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // However the five casts interleave, the tally runs inside the same
    // atomic update as the last ballot: one approved team, one open vote.
    let session = service.snapshot(&id).unwrap();
    assert_eq!(session.missions.len(), 1);
    assert_eq!(session.missions[0].teams.len(), 1);
    assert_eq!(service.engine().phase(&session), Phase::WaitingForVote);
    assert_eq!(session.last_team().unwrap().votes.len(), 2);
}

#[test]
fn test_racing_votes_resolve_one_mission() {
    let (service, id) = started_game(5);
    service.select_members("p0", &id, &[0, 1]).unwrap();
    for i in 0..5 {
        service.approve(&format!("p{i}"), &id, true).unwrap();
    }

    let members = service
        .snapshot(&id)
        .unwrap()
        .last_team()
        .unwrap()
        .members
        .clone();
    let handles: Vec<_> = members
        .into_iter()
        .map(|member| {
            let service = service.clone();
            let id = id.clone();
            thread::spawn(move || service.vote(&member, &id, true).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let session = service.snapshot(&id).unwrap();
    assert_eq!(service.engine().resolved_counts(&session), (1, 0));
    // The resolving vote opened mission two before releasing the lock.
    assert_eq!(session.missions.len(), 2);
    assert_eq!(service.engine().phase(&session), Phase::SelectingMembers);
}

#[test]
fn test_last_member_leave_cannot_erase_an_accepted_join() {
    for _ in 0..200 {
        let service = GameService::new();
        let id = service
            .create_session("p0", "Round Table".to_string())
            .unwrap();

        let joiner = {
            let service = service.clone();
            let id = id.clone();
            thread::spawn(move || service.join("p1", &id))
        };
        let leaver = {
            let service = service.clone();
            let id = id.clone();
            thread::spawn(move || service.leave("p0", &id).unwrap())
        };
        let joined = joiner.join().unwrap();
        leaver.join().unwrap();

        // Either order is fine; an accepted join must survive the leave.
        match joined {
            Ok(()) => {
                let session = service.snapshot(&id).unwrap();
                assert!(session.has_player("p1"));
                assert!(!session.has_player("p0"));
            }
            Err(GameError::SessionNotFound) => {
                assert_eq!(service.snapshot(&id), Err(GameError::SessionNotFound));
            }
            Err(other) => panic!("unexpected join outcome: {other}"),
        }
    }
}

#[test]
fn test_every_mutation_bumps_the_version() {
    let (service, id) = started_game(5);
    let after_start = service.snapshot(&id).unwrap().version;
    service.select_members("p0", &id, &[0, 1]).unwrap();
    service.approve("p0", &id, true).unwrap();
    service.approve("p0", &id, false).unwrap();
    let session = service.snapshot(&id).unwrap();
    assert_eq!(session.version, after_start + 3);
}
