//! Property tests for the turn/round state machine.
//!
//! Properties tested:
//! - The round timer runs exactly while the room is in RoundActive
//! - Outside the lobby the turn index always points at a participant
//! - The drawer never appears among the solved guessers
//! - The round counter never passes the configured maximum
//! - Scores never decrease during a game
//! - Round-robin: everyone still seated at a full game's end drew once in
//!   every round from the one they joined in, across leaves and late joins

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use sketchroom_protocol::{GamePhase, RoomId, RoomSettings, ServerEvent, UserId};
use sketchroom_room::{AlarmKey, Outbound, RoomConfig, RoomSession};
use sketchroom_timer::TimerEvent;

const USERS: [&str; 5] = ["a", "b", "c", "d", "e"];

#[derive(Debug, Clone)]
enum Op {
    Join(usize),
    Leave(usize),
    Disconnect(usize),
    Start(usize, usize),
    GuessRight(usize),
    GuessWrong(usize),
    Expire,
    Reveal,
    EndGame(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let user = 0..USERS.len();
    prop_oneof![
        3 => user.clone().prop_map(Op::Join),
        1 => user.clone().prop_map(Op::Leave),
        1 => user.clone().prop_map(Op::Disconnect),
        2 => (user.clone(), 0usize..6).prop_map(|(u, n)| Op::Start(u, n)),
        3 => user.clone().prop_map(Op::GuessRight),
        1 => user.clone().prop_map(Op::GuessWrong),
        2 => Just(Op::Expire),
        2 => Just(Op::Reveal),
        1 => user.prop_map(Op::EndGame),
    ]
}

fn uid(i: usize) -> UserId {
    UserId::from(USERS[i])
}

fn apply(session: &mut RoomSession, op: &Op) {
    // Errors are expected for many random ops; only the state matters.
    let _ = match op {
        Op::Join(u) => session.join(&uid(*u), USERS[*u]).map(drop),
        Op::Leave(u) => session.leave(&uid(*u)).map(drop),
        Op::Disconnect(u) => {
            session.disconnect(&uid(*u));
            Ok(())
        }
        Op::Start(u, n) => {
            let words = (0..*n).map(|i| format!("w{i}")).collect();
            session.start(&uid(*u), words).map(drop)
        }
        Op::GuessRight(u) => {
            let word = session.state().current_word.clone().unwrap_or_default();
            session.submit_guess(&uid(*u), &word).map(drop)
        }
        Op::GuessWrong(u) => session.submit_guess(&uid(*u), "nope").map(drop),
        Op::Expire => {
            if let Some(token) = session.round_token() {
                session.on_timer(TimerEvent::Expired { token });
            }
            Ok(())
        }
        Op::Reveal => {
            session.on_alarm(AlarmKey::Reveal);
            Ok(())
        }
        Op::EndGame(u) => session.end_game(&uid(*u)).map(drop),
    };
}

fn fresh() -> RoomSession {
    let config = RoomConfig {
        settings: RoomSettings {
            round_duration_secs: 30,
            max_rounds: 2,
            ..RoomSettings::default()
        },
        max_players: 4,
        ..RoomConfig::default()
    };
    RoomSession::new(RoomId::from("PROP01"), "props", uid(0), config)
}

/// Mid-game events for the round-robin property. Joins only name users
/// who were not seated at the start.
#[derive(Debug, Clone)]
enum Turn {
    Join(usize),
    Leave(usize),
    Guess(usize),
    Expire,
    Reveal,
}

const STARTERS: usize = 3;

fn turn() -> impl Strategy<Value = Turn> {
    prop_oneof![
        1 => (STARTERS..USERS.len()).prop_map(Turn::Join),
        1 => (0..USERS.len()).prop_map(Turn::Leave),
        3 => (0..USERS.len()).prop_map(Turn::Guess),
        3 => Just(Turn::Expire),
        3 => Just(Turn::Reveal),
    ]
}

fn turns_started(out: Vec<Outbound>, into: &mut Vec<(UserId, u32)>) {
    for o in out {
        if let Outbound::Event(_, ServerEvent::TurnStarted { drawer_id, round }) = o {
            into.push((drawer_id, round));
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: invariants hold after every operation
    #[test]
    fn prop_invariants_hold_after_every_op(ops in prop::collection::vec(op(), 1..60)) {
        let rt = runtime();
        let _guard = rt.enter();
        let mut session = fresh();

        for op in &ops {
            let before: Vec<(UserId, u32)> = session
                .participants()
                .iter()
                .map(|p| (p.user_id.clone(), p.score))
                .collect();
            let was_in_game = session.phase().is_active();

            apply(&mut session, op);

            prop_assert_eq!(
                session.timer_active(),
                session.phase() == GamePhase::RoundActive,
                "timer/phase mismatch after {:?}", op
            );

            let n = session.participants().len();
            if session.phase() != GamePhase::Lobby && n > 0 {
                prop_assert!(
                    session.state().current_turn_index < n,
                    "turn index {} out of {} after {:?}",
                    session.state().current_turn_index, n, op
                );
            }

            if let Some(drawer) = session.drawer() {
                prop_assert!(!session.has_solved(drawer));
            }

            prop_assert!(session.state().current_round <= session.state().max_rounds);
            prop_assert!(session.participants().len() <= session.config().max_players);

            if was_in_game {
                for (user, score) in &before {
                    if let Some(p) = session.participant(user) {
                        prop_assert!(p.score >= *score, "score of {} went down", user);
                    }
                }
            }
        }
    }

    /// Property: a correct guess is scored at most once per turn
    #[test]
    fn prop_guess_scores_once_per_turn(repeats in 1usize..6) {
        let rt = runtime();
        let _guard = rt.enter();
        let mut session = fresh();
        for u in 0..3 {
            session.join(&uid(u), USERS[u]).unwrap();
        }
        session.start(&uid(0), vec!["apple".into(), "pear".into()]).unwrap();

        let word = session.state().current_word.clone().unwrap();
        for _ in 0..repeats {
            session.submit_guess(&uid(1), &word).unwrap();
        }
        let score = session.participant(&uid(1)).unwrap().score;
        prop_assert!((50..=100).contains(&score));
        prop_assert_eq!(session.participant(&uid(0)).unwrap().score, score / 5);
    }

    /// Property: over a game that runs all its rounds, each participant
    /// still seated draws exactly once per round from the round they
    /// joined in
    #[test]
    fn prop_round_robin_survives_leaves_and_late_joins(
        max_rounds in 1u32..4,
        events in prop::collection::vec(turn(), 0..40),
    ) {
        let rt = runtime();
        let _guard = rt.enter();
        let config = RoomConfig {
            settings: RoomSettings {
                round_duration_secs: 30,
                max_rounds,
                ..RoomSettings::default()
            },
            max_players: USERS.len(),
            ..RoomConfig::default()
        };
        let mut session = RoomSession::new(RoomId::from("PROP02"), "props", uid(0), config);

        let mut first_round: HashMap<UserId, u32> = HashMap::new();
        for u in 0..STARTERS {
            session.join(&uid(u), USERS[u]).unwrap();
            first_round.insert(uid(u), 1);
        }
        let words = (0..200).map(|i| format!("w{i}")).collect();
        let mut started = Vec::new();
        turns_started(session.start(&uid(0), words).unwrap(), &mut started);

        let mut gone: HashSet<UserId> = HashSet::new();
        for event in &events {
            if session.phase() == GamePhase::GameOver {
                break;
            }
            let out = match event {
                Turn::Join(u) => {
                    let user = uid(*u);
                    if gone.contains(&user) || session.participant(&user).is_some() {
                        continue;
                    }
                    match session.join(&user, USERS[*u]) {
                        Ok(out) => {
                            first_round.insert(user, session.state().current_round);
                            out
                        }
                        Err(_) => continue,
                    }
                }
                Turn::Leave(u) => {
                    let user = uid(*u);
                    match session.leave(&user) {
                        Ok(out) => {
                            gone.insert(user);
                            out
                        }
                        Err(_) => continue,
                    }
                }
                Turn::Guess(u) => {
                    let word = session.state().current_word.clone().unwrap_or_default();
                    session.submit_guess(&uid(*u), &word).unwrap_or_default()
                }
                Turn::Expire => match session.round_token() {
                    Some(token) => session.on_timer(TimerEvent::Expired { token }),
                    None => continue,
                },
                Turn::Reveal => session.on_alarm(AlarmKey::Reveal),
            };
            turns_started(out, &mut started);
        }

        // Let whatever is left of the game play out.
        for _ in 0..100 {
            let out = match session.phase() {
                GamePhase::RoundActive => match session.round_token() {
                    Some(token) => session.on_timer(TimerEvent::Expired { token }),
                    None => break,
                },
                GamePhase::RoundResolving => session.on_alarm(AlarmKey::Reveal),
                _ => break,
            };
            turns_started(out, &mut started);
        }
        prop_assert_eq!(session.phase(), GamePhase::GameOver);

        // A game cut short by too few players makes no fairness promise.
        prop_assume!(session.participants().len() >= session.config().min_players);
        prop_assert_eq!(session.state().current_round, max_rounds);

        for p in session.participants() {
            let rounds: Vec<u32> = started
                .iter()
                .filter(|(drawer, _)| drawer == &p.user_id)
                .map(|(_, round)| *round)
                .collect();
            let expected: Vec<u32> = (first_round[&p.user_id]..=max_rounds).collect();
            prop_assert_eq!(
                &rounds, &expected,
                "{} drew in rounds {:?}", p.user_id, rounds
            );
        }
    }
}
