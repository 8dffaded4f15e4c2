use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use tokio::time::sleep;
use waivelength_back::{
    config::{AiPolicy, AppConfig},
    dto::room::{
        AddAiRequest, CreateRoomRequest, GuessValue, OutcomeDto, RoomSnapshot, StartRoomRequest,
        TeamDto, VariantDto, VisiblePhase,
    },
    error::ServiceError,
    services::{
        ai_provider::{
            ClueRequest, ContributionProvider, GuessRequest, HeuristicProvider, ProviderError,
            ProviderResult,
        },
        room_service, room_sweeper,
    },
    state::{
        AppState, SharedState,
        model::{Code, Guess, GuessAnswer},
        room::Team,
    },
};

/// Every call fails right away.
struct FailingProvider {
    calls: Arc<AtomicUsize>,
}

impl ContributionProvider for FailingProvider {
    fn produce_clues(&self, _request: ClueRequest) -> BoxFuture<'static, ProviderResult<Vec<String>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(ProviderError::Unavailable("offline".into())) })
    }

    fn produce_guess(
        &self,
        _request: GuessRequest,
    ) -> BoxFuture<'static, ProviderResult<GuessAnswer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(ProviderError::Unavailable("offline".into())) })
    }
}

/// Answers like the heuristic provider, after `delay`.
struct SlowProvider {
    delay: Duration,
}

impl ContributionProvider for SlowProvider {
    fn produce_clues(&self, request: ClueRequest) -> BoxFuture<'static, ProviderResult<Vec<String>>> {
        let delay = self.delay;
        let answer = HeuristicProvider.produce_clues(request);
        Box::pin(async move {
            sleep(delay).await;
            answer.await
        })
    }

    fn produce_guess(
        &self,
        request: GuessRequest,
    ) -> BoxFuture<'static, ProviderResult<GuessAnswer>> {
        let delay = self.delay;
        let answer = HeuristicProvider.produce_guess(request);
        Box::pin(async move {
            sleep(delay).await;
            answer.await
        })
    }
}

fn fast_policy() -> AiPolicy {
    AiPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
        attempt_timeout: Duration::from_millis(100),
    }
}

fn state_with(provider: impl ContributionProvider + 'static, policy: AiPolicy) -> SharedState {
    AppState::new(
        AppConfig::default().with_ai_policy(policy),
        Arc::new(provider),
    )
}

async fn create(state: &SharedState, variant: VariantDto, ai_players: usize) -> RoomSnapshot {
    room_service::create_room(
        state,
        CreateRoomRequest {
            variant,
            ai_players: Some(ai_players),
        },
    )
    .await
    .unwrap()
}

fn ai_name(snapshot: &RoomSnapshot) -> String {
    snapshot
        .participants
        .iter()
        .find(|participant| participant.is_ai)
        .map(|participant| participant.name.clone())
        .unwrap()
}

fn clues(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("clue {n}")).collect()
}

/// Poll the room until `predicate` holds, failing after a few seconds.
async fn wait_for<F>(state: &SharedState, code: &str, viewer: Option<&str>, predicate: F) -> RoomSnapshot
where
    F: Fn(&RoomSnapshot) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = room_service::get_room(state, code, viewer).await.unwrap();
        if predicate(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "room never reached the expected state: {snapshot:?}"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn failing_ai_falls_back_and_the_room_advances() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = state_with(
        FailingProvider {
            calls: calls.clone(),
        },
        fast_policy(),
    );
    let room = create(&state, VariantDto::Scale, 1).await;
    let ai = ai_name(&room);

    room_service::join_room(&state, &room.code, "Zed", None)
        .await
        .unwrap();
    let started = room_service::start_room(&state, &room.code, StartRoomRequest::default(), None)
        .await
        .unwrap();
    room_service::submit_clues(&state, &room.code, "Zed", started.turn, clues(3))
        .await
        .unwrap();

    // Zed opens the rotation; the AI guesses, then its own fallback clue is up
    let snapshot = wait_for(&state, &room.code, Some("Zed"), |snapshot| {
        snapshot
            .current_round
            .as_ref()
            .is_some_and(|round| round.clue_giver == ai)
    })
    .await;

    assert_eq!(snapshot.phase, VisiblePhase::Guessing);
    let round = snapshot.current_round.unwrap();
    let clue = &round.clues[0];
    assert!(!clue.is_empty() && clue.chars().count() <= 3, "{clue}");

    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(
        snapshot.history[0].round.guesses.get(&ai),
        Some(&GuessValue::Point(0.5))
    );
    assert!(snapshot.history[0].round.reasons.is_empty());
    // two clue attempts and two guess attempts
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_final_guesses_score_the_turn_once() {
    let state = state_with(HeuristicProvider, fast_policy());
    let room = create(&state, VariantDto::Scale, 0).await;
    let code = room.code.clone();

    for name in ["ann", "bob", "cat"] {
        room_service::join_room(&state, &code, name, None)
            .await
            .unwrap();
    }
    let turn = room_service::start_room(&state, &code, StartRoomRequest::default(), None)
        .await
        .unwrap()
        .turn;
    for name in ["ann", "bob", "cat"] {
        room_service::submit_clues(&state, &code, name, turn, clues(3))
            .await
            .unwrap();
    }

    let first = {
        let state = state.clone();
        let code = code.clone();
        tokio::spawn(async move {
            room_service::submit_guess(&state, &code, "bob", turn, Guess::Scale(0.4)).await
        })
    };
    let second = {
        let state = state.clone();
        let code = code.clone();
        tokio::spawn(async move {
            room_service::submit_guess(&state, &code, "cat", turn, Guess::Scale(0.6)).await
        })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let snapshot = room_service::get_room(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.phase, VisiblePhase::Guessing);
    let round = snapshot.current_round.unwrap();
    assert_eq!(round.turn, 2);
    assert_eq!(round.clue_giver, "bob");

    let err = room_service::submit_guess(&state, &code, "bob", round.turn, Guess::Scale(0.5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotAllowed(_)));

    // a client retrying its turn-1 guess must not be counted for turn 2
    let err = room_service::submit_guess(&state, &code, "cat", turn, Guess::Scale(0.6))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidPhase(_)));
    let snapshot = room_service::get_room(&state, &code, None).await.unwrap();
    assert!(snapshot.current_round.unwrap().submitted.is_empty());
}

#[tokio::test]
async fn ai_results_for_an_evicted_room_are_dropped() {
    let state = state_with(
        SlowProvider {
            delay: Duration::from_millis(200),
        },
        AiPolicy {
            max_attempts: 1,
            backoff: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(2),
        },
    );
    let room = create(&state, VariantDto::Scale, 1).await;
    room_service::join_room(&state, &room.code, "Zed", None)
        .await
        .unwrap();
    room_service::start_room(&state, &room.code, StartRoomRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(state.ai().in_flight(), 1);

    let later = Instant::now() + Duration::from_secs(3 * 60 * 60);
    assert_eq!(room_sweeper::sweep_idle_rooms(&state, later), 1);

    let deadline = Instant::now() + Duration::from_secs(5);
    while state.ai().in_flight() > 0 {
        assert!(Instant::now() < deadline, "AI task never settled");
        sleep(Duration::from_millis(10)).await;
    }
    let err = room_service::get_room(&state, &room.code, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn slow_ai_clue_giver_times_out_into_fallback_clues() {
    let state = state_with(
        SlowProvider {
            delay: Duration::from_secs(5),
        },
        AiPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(10),
            attempt_timeout: Duration::from_millis(50),
        },
    );
    let room = create(&state, VariantDto::Code, 0).await;
    room_service::join_room(&state, &room.code, "ann", Some(Team::Red))
        .await
        .unwrap();
    room_service::add_ai(
        &state,
        &room.code,
        AddAiRequest {
            team: Some(TeamDto::Blue),
            personality: Some("Sleepy Sloth".into()),
        },
        None,
    )
    .await
    .unwrap();
    room_service::start_room(
        &state,
        &room.code,
        StartRoomRequest {
            first_team: Some(TeamDto::Blue),
            ..StartRoomRequest::default()
        },
        None,
    )
    .await
    .unwrap();

    let snapshot = wait_for(&state, &room.code, Some("ann"), |snapshot| {
        snapshot.phase == VisiblePhase::Guessing
    })
    .await;
    let round = snapshot.current_round.unwrap();
    assert_eq!(round.clue_giver, "[AI] Sleepy Sloth");
    assert_eq!(round.clues.len(), 3);
    assert!(
        round
            .clues
            .iter()
            .all(|clue| !clue.is_empty() && clue.chars().count() <= 3)
    );
    assert_eq!(snapshot.pending, vec!["red".to_string()]);
}

#[tokio::test]
async fn heuristic_ai_players_finish_a_scale_game_with_a_human() {
    let state = state_with(HeuristicProvider, fast_policy());
    let room = create(&state, VariantDto::Scale, 2).await;
    let code = room.code.clone();
    room_service::join_room(&state, &code, "Zed", None)
        .await
        .unwrap();
    let started = room_service::start_room(&state, &code, StartRoomRequest::default(), None)
        .await
        .unwrap();
    room_service::submit_clues(&state, &code, "Zed", started.turn, clues(3))
        .await
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let finished = loop {
        let snapshot = room_service::get_room(&state, &code, Some("Zed"))
            .await
            .unwrap();
        if snapshot.phase == VisiblePhase::Finished {
            break snapshot;
        }
        assert!(Instant::now() < deadline, "game never finished: {snapshot:?}");
        if snapshot.phase == VisiblePhase::Guessing && snapshot.pending.iter().any(|name| name == "Zed") {
            room_service::submit_guess(&state, &code, "Zed", snapshot.turn, Guess::Scale(0.5))
                .await
                .unwrap();
        } else {
            sleep(Duration::from_millis(10)).await;
        }
    };

    // three players, three rounds, everyone gives a clue each round
    assert_eq!(finished.history.len(), 9);
    // heuristic AI guesses explain themselves, the human's does not
    assert!(finished.history.iter().all(|record| !record.round.reasons.contains_key("Zed")));
    assert!(
        finished
            .history
            .iter()
            .any(|record| record.round.reasons.keys().any(|name| name.starts_with("[AI]")))
    );
    let scale = finished.scale.unwrap();
    assert_eq!(scale.total_rounds, 3);
    assert!(finished.finish_reason.is_some());
    let bonus_total: f64 = finished
        .history
        .iter()
        .map(|record| match &record.outcome {
            OutcomeDto::Scale {
                clue_giver_bonus, ..
            } => *clue_giver_bonus,
            OutcomeDto::Code { .. } => 0.0,
        })
        .sum();
    assert!((scale.room_score - bonus_total).abs() < 1e-9);
    assert_eq!(state.ai().in_flight(), 0);
}

#[tokio::test]
async fn code_game_against_an_ai_team_reaches_the_round_cap() {
    let state = state_with(HeuristicProvider, fast_policy());
    let room = create(&state, VariantDto::Code, 0).await;
    let code = room.code.clone();
    room_service::join_room(&state, &code, "ann", Some(Team::Red))
        .await
        .unwrap();
    room_service::add_ai(
        &state,
        &code,
        AddAiRequest {
            team: Some(TeamDto::Blue),
            personality: None,
        },
        None,
    )
    .await
    .unwrap();
    room_service::set_code_words(&state, &code, Team::Red, None, Some("ann"))
        .await
        .unwrap();
    room_service::start_room(
        &state,
        &code,
        StartRoomRequest {
            max_rounds: Some(2),
            ..StartRoomRequest::default()
        },
        None,
    )
    .await
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let finished = loop {
        let snapshot = room_service::get_room(&state, &code, Some("ann"))
            .await
            .unwrap();
        if snapshot.phase == VisiblePhase::Finished {
            break snapshot;
        }
        assert!(Instant::now() < deadline, "game never finished: {snapshot:?}");
        let waiting_on = |label: &str| snapshot.pending.iter().any(|pending| pending == label);
        match snapshot.phase {
            VisiblePhase::ClueGiving if waiting_on("ann") => {
                room_service::submit_clues(&state, &code, "ann", snapshot.turn, clues(3))
                    .await
                    .unwrap();
            }
            VisiblePhase::Guessing if waiting_on("red") => {
                room_service::submit_guess(
                    &state,
                    &code,
                    "ann",
                    snapshot.turn,
                    Guess::Code(Code::ordered()),
                )
                .await
                .unwrap();
            }
            _ => sleep(Duration::from_millis(10)).await,
        }
    };

    assert!(finished.finish_reason.is_some());
    assert!(!finished.history.is_empty() && finished.history.len() <= 4);
    // every team's words are public once the game is over
    let teams = finished.code_game.unwrap().teams;
    assert!(teams.iter().all(|team| team.code_words.is_some()));
}
