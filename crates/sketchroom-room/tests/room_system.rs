//! Integration tests for the turn/round state machine.
//!
//! The session is driven directly: operations are applied one by one and
//! scheduled events are pulled with `next_scheduled` under paused time.

use std::time::Duration;

use sketchroom_protocol::{
    GamePhase, Recipient, RoomId, RoomSettings, ServerEvent, UserId,
};
use sketchroom_room::session::Scheduled;
use sketchroom_room::{AlarmKey, Outbound, RoomConfig, RoomError, RoomSession};
use sketchroom_timer::TimerEvent;

// =========================================================================
// Helpers
// =========================================================================

fn uid(s: &str) -> UserId {
    UserId::from(s)
}

fn config(max_rounds: u32) -> RoomConfig {
    RoomConfig {
        settings: RoomSettings {
            round_duration_secs: 30,
            max_rounds,
            ..RoomSettings::default()
        },
        ..RoomConfig::default()
    }
}

fn words(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("word{i}")).collect()
}

/// A lobby with `users` joined in order; the first one hosts.
fn room(users: &[&str], max_rounds: u32) -> RoomSession {
    let mut session = RoomSession::new(
        RoomId::from("ROOM01"),
        "test room",
        uid(users[0]),
        config(max_rounds),
    );
    for u in users {
        session.join(&uid(u), u).unwrap();
    }
    session
}

fn started(users: &[&str], max_rounds: u32) -> RoomSession {
    let mut session = room(users, max_rounds);
    session.start(&uid(users[0]), words(40)).unwrap();
    session
}

fn word(session: &RoomSession) -> String {
    session.state().current_word.clone().unwrap()
}

/// Pulls and applies the next scheduled event.
async fn step(session: &mut RoomSession) -> Vec<Outbound> {
    let due = session.next_scheduled().await;
    session.on_scheduled(due)
}

/// Steps until `phase` is reached, returning everything emitted.
async fn run_until(session: &mut RoomSession, phase: GamePhase) -> Vec<Outbound> {
    let mut all = Vec::new();
    while session.phase() != phase {
        all.extend(step(session).await);
    }
    all
}

fn drawers_started(out: &[Outbound]) -> Vec<UserId> {
    out.iter()
        .filter_map(|o| match o {
            Outbound::Event(_, ServerEvent::TurnStarted { drawer_id, .. }) => {
                Some(drawer_id.clone())
            }
            _ => None,
        })
        .collect()
}

fn has_event(out: &[Outbound], pred: impl Fn(&ServerEvent) -> bool) -> bool {
    out.iter()
        .any(|o| matches!(o, Outbound::Event(_, e) if pred(e)))
}

// =========================================================================
// Full game flow
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_three_players_two_rounds_play_six_turns() {
    let mut session = room(&["a", "b", "c"], 2);
    let mut out = session.start(&uid("a"), words(40)).unwrap();
    out.extend(run_until(&mut session, GamePhase::GameOver).await);

    let drawers = drawers_started(&out);
    assert_eq!(
        drawers,
        ["a", "b", "c", "a", "b", "c"].map(uid).to_vec(),
        "each participant draws once per round, in turn order"
    );
    assert_eq!(session.state().turns_played, 6);
    assert!(!session.timer_active());
    assert!(session.is_armed(&AlarmKey::Cleanup));
    assert!(has_event(&out, |e| matches!(e, ServerEvent::GameOver { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_is_sorted_by_score() {
    let mut session = started(&["a", "b", "c"], 1);
    let w = word(&session);

    // Instant guess: full speed bonus, drawer gets 20 %.
    session.submit_guess(&uid("b"), &w).unwrap();
    let out = run_until(&mut session, GamePhase::GameOver).await;

    let board = out
        .iter()
        .find_map(|o| match o {
            Outbound::Event(_, ServerEvent::GameOver { leaderboard }) => Some(leaderboard.clone()),
            _ => None,
        })
        .unwrap();
    let scores: Vec<(UserId, u32)> = board.iter().map(|e| (e.user_id.clone(), e.score)).collect();
    assert_eq!(scores[0], (uid("b"), 100));
    assert_eq!(scores[1], (uid("a"), 20));
    assert!(scores.windows(2).all(|w| w[0].1 >= w[1].1));
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_ties_keep_join_order() {
    // Nobody scored: the board is just the seating order.
    let mut session = started(&["dan", "amy", "bo"], 1);
    session.end_game(&uid("dan")).unwrap();
    let ids: Vec<UserId> = session.leaderboard().into_iter().map(|e| e.user_id).collect();
    assert_eq!(ids, ["dan", "amy", "bo"].map(uid).to_vec());

    // amy solves dan's and bo's words instantly, so both drawers get 20.
    let mut session = started(&["dan", "amy", "bo"], 1);
    let w = word(&session);
    session.submit_guess(&uid("amy"), &w).unwrap();
    run_until(&mut session, GamePhase::RoundResolving).await;
    run_until(&mut session, GamePhase::RoundActive).await;
    assert_eq!(session.drawer(), Some(&uid("amy")));
    run_until(&mut session, GamePhase::RoundResolving).await;
    run_until(&mut session, GamePhase::RoundActive).await;
    assert_eq!(session.drawer(), Some(&uid("bo")));
    let w = word(&session);
    session.submit_guess(&uid("amy"), &w).unwrap();
    run_until(&mut session, GamePhase::GameOver).await;

    let scores: Vec<(UserId, u32)> = session
        .leaderboard()
        .into_iter()
        .map(|e| (e.user_id, e.score))
        .collect();
    assert_eq!(
        scores,
        vec![(uid("amy"), 200), (uid("dan"), 20), (uid("bo"), 20)],
        "dan joined before bo, so dan stays ahead on the tie"
    );
}

#[tokio::test(start_paused = true)]
async fn test_timer_ticks_then_expiry_resolves_round() {
    let mut session = started(&["a", "b"], 1);

    let out = step(&mut session).await;
    assert_eq!(
        out,
        vec![Outbound::Event(
            Recipient::All,
            ServerEvent::TimerTick {
                seconds_remaining: 29
            }
        )]
    );

    let out = run_until(&mut session, GamePhase::RoundResolving).await;
    let w = session.state().current_word.clone().unwrap();
    assert!(has_event(&out, |e| *e == ServerEvent::RoundResolved { word: w.clone() }));
    assert!(!session.timer_active());
    assert!(session.is_armed(&AlarmKey::Reveal));
}

// =========================================================================
// Guessing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_round_ends_early_when_everyone_guessed() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);

    let out = session.submit_guess(&uid("b"), &w).unwrap();
    assert_eq!(session.phase(), GamePhase::RoundActive);
    assert!(has_event(&out, |e| matches!(e, ServerEvent::PlayerGuessed { .. })));

    let out = session.submit_guess(&uid("c"), &format!("  {}  ", w.to_uppercase())).unwrap();
    assert_eq!(session.phase(), GamePhase::RoundResolving);
    assert!(!session.timer_active(), "timer cancelled before the round resolved");
    assert!(has_event(&out, |e| matches!(e, ServerEvent::RoundResolved { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_correct_guess_scores_once() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);

    session.submit_guess(&uid("b"), &w).unwrap();
    let score = session.participant(&uid("b")).unwrap().score;

    let out = session.submit_guess(&uid("b"), &w).unwrap();
    assert!(out.is_empty());
    assert_eq!(session.participant(&uid("b")).unwrap().score, score);
}

#[tokio::test(start_paused = true)]
async fn test_guess_scoring_depends_on_remaining_time() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);

    tokio::time::advance(Duration::from_secs(10)).await;
    session.submit_guess(&uid("b"), &w).unwrap();

    // 20 of 30 seconds left: 50 + floor(20/30 * 50) = 83, drawer 16.
    assert_eq!(session.participant(&uid("b")).unwrap().score, 83);
    assert_eq!(session.participant(&uid("a")).unwrap().score, 16);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_guess_is_relayed_as_chat() {
    let mut session = started(&["a", "b"], 2);

    let out = session.submit_guess(&uid("b"), "definitely not it").unwrap();
    assert_eq!(
        out,
        vec![Outbound::Event(
            Recipient::All,
            ServerEvent::ChatMessage {
                user_id: uid("b"),
                text: "definitely not it".into()
            }
        )]
    );
    assert_eq!(session.participant(&uid("b")).unwrap().score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drawer_and_blank_guesses_are_ignored() {
    let mut session = started(&["a", "b"], 2);
    let w = word(&session);

    assert!(session.submit_guess(&uid("a"), &w).unwrap().is_empty());
    assert!(session.submit_guess(&uid("b"), "   ").unwrap().is_empty());
    assert_eq!(session.participant(&uid("a")).unwrap().score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_guess_outside_round_is_ignored_and_stranger_rejected() {
    let mut session = room(&["a", "b"], 2);
    assert!(session.submit_guess(&uid("b"), "anything").unwrap().is_empty());

    let err = session.submit_guess(&uid("zed"), "anything").unwrap_err();
    assert!(matches!(err, RoomError::NotInRoom(..)));
}

// =========================================================================
// Starting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_requires_host_and_two_players() {
    let mut session = room(&["a"], 2);
    let err = session.start(&uid("a"), words(5)).unwrap_err();
    assert!(matches!(err, RoomError::InsufficientPlayers { have: 1, need: 2 }));

    session.join(&uid("b"), "b").unwrap();
    let err = session.start(&uid("b"), words(5)).unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));

    session.start(&uid("a"), words(5)).unwrap();
    let err = session.start(&uid("a"), words(5)).unwrap_err();
    assert!(matches!(err, RoomError::WrongPhase { action: "start", .. }));
}

#[tokio::test(start_paused = true)]
async fn test_empty_word_batch_stays_in_lobby() {
    let mut session = room(&["a", "b"], 2);
    let err = session.start(&uid("a"), vec!["  ".into()]).unwrap_err();
    assert!(matches!(err, RoomError::WordsUnavailable));
    assert_eq!(session.phase(), GamePhase::Lobby);
    assert!(!session.timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_start_resets_scores_and_hands_first_turn_to_index_zero() {
    let mut session = room(&["a", "b"], 2);
    let out = session.start(&uid("a"), words(10)).unwrap();

    assert_eq!(session.drawer(), Some(&uid("a")));
    assert_eq!(session.state().current_round, 1);
    assert_eq!(session.state().current_turn_index, 0);
    assert!(session.timer_active());

    // Only the drawer is told the word.
    let w = word(&session);
    assert!(out.contains(&Outbound::Event(
        Recipient::User(uid("a")),
        ServerEvent::SecretWord { word: w }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_depleted_pool_ends_the_game() {
    let mut session = room(&["a", "b", "c"], 3);
    session.start(&uid("a"), words(2)).unwrap();

    run_until(&mut session, GamePhase::GameOver).await;
    assert_eq!(session.state().turns_played, 2);
    assert_eq!(session.words_left(), 0);
}

// =========================================================================
// Membership
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_rejoin_keeps_score_and_position() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);
    session.submit_guess(&uid("b"), &w).unwrap();
    let score = session.participant(&uid("b")).unwrap().score;

    session.disconnect(&uid("b"));
    assert!(!session.participant(&uid("b")).unwrap().connected);
    assert!(session.is_armed(&AlarmKey::Evict(uid("b"))));

    session.join(&uid("b"), "b").unwrap();
    let p = session.participant(&uid("b")).unwrap();
    assert!(p.connected);
    assert_eq!(p.score, score);
    assert_eq!(session.participants().len(), 3);
    assert_eq!(session.participants()[1].user_id, uid("b"));
    assert!(!session.is_armed(&AlarmKey::Evict(uid("b"))));
}

#[tokio::test(start_paused = true)]
async fn test_drawer_rejoin_gets_the_word_again() {
    let mut session = started(&["a", "b"], 2);
    let w = word(&session);
    session.disconnect(&uid("a"));

    let out = session.join(&uid("a"), "a").unwrap();
    assert_eq!(
        out[0],
        Outbound::Event(Recipient::User(uid("a")), ServerEvent::SecretWord { word: w })
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_window_expiry_removes_participant() {
    let mut session = room(&["a", "b", "c"], 2);
    session.disconnect(&uid("c"));

    let out = step(&mut session).await;
    assert!(out.contains(&Outbound::Snapshot(Recipient::All)));
    assert!(session.participant(&uid("c")).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_drawer_leaving_resolves_round_and_next_player_draws() {
    let mut session = started(&["a", "b", "c"], 2);

    let out = session.leave(&uid("a")).unwrap();
    assert_eq!(session.phase(), GamePhase::RoundResolving);
    assert!(!session.timer_active());
    assert!(has_event(&out, |e| matches!(e, ServerEvent::RoundResolved { .. })));
    assert_eq!(session.host_id(), &uid("b"), "host handed off");

    let out = run_until(&mut session, GamePhase::RoundActive).await;
    assert_eq!(drawers_started(&out), vec![uid("b")]);
    assert_eq!(session.state().current_round, 1);
    assert_eq!(session.state().current_turn_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_guesser_leaving_before_drawer_keeps_drawer() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);
    session.submit_guess(&uid("b"), &w).unwrap();
    session.submit_guess(&uid("c"), &w).unwrap();
    run_until(&mut session, GamePhase::RoundActive).await;
    assert_eq!(session.drawer(), Some(&uid("b")));

    session.leave(&uid("a")).unwrap();
    assert_eq!(session.phase(), GamePhase::RoundActive);
    assert_eq!(session.state().current_turn_index, 0);
    assert_eq!(session.drawer(), Some(&uid("b")));
}

#[tokio::test(start_paused = true)]
async fn test_last_guesser_leaving_resolves_round() {
    let mut session = started(&["a", "b", "c"], 2);
    let w = word(&session);
    session.submit_guess(&uid("b"), &w).unwrap();

    session.leave(&uid("c")).unwrap();
    assert_eq!(session.phase(), GamePhase::RoundResolving);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_below_two_players_ends_game() {
    let mut session = started(&["a", "b"], 2);
    let out = session.leave(&uid("b")).unwrap();
    assert_eq!(session.phase(), GamePhase::GameOver);
    assert!(!session.timer_active());
    assert!(has_event(&out, |e| matches!(e, ServerEvent::GameOver { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_last_participant_leaving_closes_room() {
    let mut session = room(&["a"], 2);
    let out = session.leave(&uid("a")).unwrap();
    assert_eq!(out, vec![Outbound::Close]);
}

#[tokio::test(start_paused = true)]
async fn test_host_leaving_lobby_hands_off() {
    let mut session = room(&["a", "b", "c"], 2);
    session.leave(&uid("a")).unwrap();
    assert_eq!(session.host_id(), &uid("b"));
    assert!(matches!(
        session.leave(&uid("a")).unwrap_err(),
        RoomError::NotInRoom(..)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_limits() {
    let mut session = RoomSession::new(
        RoomId::from("ROOM01"),
        "tiny",
        uid("a"),
        RoomConfig {
            max_players: 2,
            ..config(1)
        },
    );
    session.join(&uid("a"), "a").unwrap();
    session.join(&uid("b"), "b").unwrap();
    assert!(matches!(
        session.join(&uid("c"), "c").unwrap_err(),
        RoomError::RoomFull(_)
    ));
    assert!(matches!(
        session.join(&uid("d"), "   ").unwrap_err(),
        RoomError::Invalid(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_is_appended_and_game_over_rejects_newcomers() {
    let mut session = started(&["a", "b"], 2);
    session.join(&uid("c"), "c").unwrap();
    assert_eq!(session.participants()[2].user_id, uid("c"));

    session.end_game(&uid("a")).unwrap();
    let err = session.join(&uid("d"), "d").unwrap_err();
    assert!(matches!(err, RoomError::WrongPhase { action: "join", .. }));
    // Known participants may still reconnect to see results.
    session.join(&uid("b"), "b").unwrap();
}

// =========================================================================
// Host controls, drawing, scheduling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_game_is_host_only_and_needs_active_game() {
    let mut session = room(&["a", "b"], 2);
    assert!(matches!(
        session.end_game(&uid("a")).unwrap_err(),
        RoomError::WrongPhase { .. }
    ));
    session.start(&uid("a"), words(10)).unwrap();
    assert!(matches!(
        session.end_game(&uid("b")).unwrap_err(),
        RoomError::NotHost(_)
    ));
    session.end_game(&uid("a")).unwrap();
    assert_eq!(session.phase(), GamePhase::GameOver);
    assert!(!session.timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_strokes_are_drawer_only_and_skip_the_drawer() {
    let mut session = started(&["a", "b"], 2);

    let out = session.draw(&uid("a"), "M0,0L5,5".into()).unwrap();
    assert_eq!(
        out,
        vec![Outbound::Event(
            Recipient::AllExcept(uid("a")),
            ServerEvent::Stroke {
                user_id: uid("a"),
                stroke: "M0,0L5,5".into()
            }
        )]
    );
    assert!(matches!(
        session.draw(&uid("b"), "x".into()).unwrap_err(),
        RoomError::NotDrawer(_)
    ));
    assert!(!session.clear_canvas(&uid("a")).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_timer_event_is_discarded() {
    let mut session = started(&["a", "b"], 2);
    let stale = session.round_token().unwrap();
    let w = word(&session);

    session.submit_guess(&uid("b"), &w).unwrap();
    run_until(&mut session, GamePhase::RoundActive).await;
    assert_ne!(session.round_token(), Some(stale));

    let out = session.on_scheduled(Scheduled::Timer(TimerEvent::Expired { token: stale }));
    assert!(out.is_empty());
    assert_eq!(session.phase(), GamePhase::RoundActive);
    assert!(session.timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_alarm_closes_finished_room() {
    let mut session = started(&["a", "b"], 1);
    session.end_game(&uid("a")).unwrap();

    let out = step(&mut session).await;
    assert_eq!(out, vec![Outbound::Close]);
}

// =========================================================================
// Views and persistence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_snapshot_hides_word_from_guessers() {
    let mut session = room(&["a", "b"], 2);
    session.start(&uid("a"), vec!["ice cream".into()]).unwrap();

    let drawer = session.snapshot_for(&uid("a"));
    assert_eq!(drawer.game.word.as_deref(), Some("ice cream"));
    assert_eq!(drawer.game.word_mask, None);
    assert_eq!(drawer.game.seconds_remaining, Some(30));

    let guesser = session.snapshot_for(&uid("b"));
    assert_eq!(guesser.game.word, None);
    assert_eq!(guesser.game.word_mask.as_deref(), Some("___ _____"));

    session.end_game(&uid("a")).unwrap();
    let over = session.snapshot_for(&uid("b"));
    assert_eq!(over.game.word, None);
    assert_eq!(over.game.seconds_remaining, None);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_reveals_word_while_resolving() {
    let mut session = started(&["a", "b"], 2);
    let w = word(&session);
    session.submit_guess(&uid("b"), &w).unwrap();

    let view = session.snapshot_for(&uid("b"));
    assert_eq!(view.game.phase, GamePhase::RoundResolving);
    assert_eq!(view.game.word, Some(w));
    assert!(view.participants[1].solved);
}

#[tokio::test(start_paused = true)]
async fn test_lobby_snapshot_has_no_turn_index() {
    let session = room(&["a", "b"], 2);
    let view = session.snapshot_for(&uid("a"));
    assert_eq!(view.game.current_turn_index, None);
    assert_eq!(view.participants.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restore_revives_into_lobby_with_scores() {
    let mut session = started(&["a", "b"], 2);
    let w = word(&session);
    session.submit_guess(&uid("b"), &w).unwrap();
    let doc = session.document();
    assert_eq!(doc.game.phase, GamePhase::RoundResolving);

    let revived = RoomSession::restore(doc, RoomConfig::default());
    assert_eq!(revived.phase(), GamePhase::Lobby);
    assert!(!revived.timer_active());
    assert_eq!(revived.participant(&uid("b")).unwrap().score, 100);
    assert!(revived.participants().iter().all(|p| !p.connected));
    assert!(revived.is_armed(&AlarmKey::Evict(uid("a"))));
    assert_eq!(revived.config().settings.round_duration_secs, 30);
}
