use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, rng};
use tracing::{debug, info};

use crate::{
    dao::{
        models::{GameEntity, GameId, GamePatch, NewAnswer, NewGame, NewPlayer, PlayerPatch},
        room_store::RoomStore,
    },
    dto::{
        game::{CreateGameRequest, CreateGameResponse, PlayerSummary, leaderboard_entries},
        ws::{
            HostActionKind, HostActionRequest, JoinGameRequest, ServerMessage, SubmitAnswerRequest,
        },
    },
    error::ServiceError,
    services::{broadcast, scoring, timer_service},
    state::{
        ConnectionId, Identity, Role, SharedState,
        state_machine::{GameEvent, GamePhase},
    },
};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LENGTH: usize = 4;
const MAX_ROOM_CODE_ATTEMPTS: usize = 32;

fn game_not_found(game_id: GameId) -> ServiceError {
    ServiceError::NotFound(format!("game `{game_id}` not found"))
}

fn load_game(store: &dyn RoomStore, game_id: GameId) -> Result<GameEntity, ServiceError> {
    store.game(game_id).ok_or_else(|| game_not_found(game_id))
}

fn generate_room_code(prefix: &str) -> String {
    let mut rng = rng();
    let suffix: String = (0..ROOM_CODE_LENGTH)
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect();
    format!("{prefix}{suffix}")
}

fn default_host_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("host-{millis}")
}

/// Open a new room in the waiting state under a fresh room code.
pub fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreateGameResponse, ServiceError> {
    let config = state.config();
    let host_id = request.host_id.unwrap_or_else(default_host_id);
    let total_questions = request
        .total_questions
        .unwrap_or(config.default_total_questions());
    if total_questions == 0 {
        return Err(ServiceError::InvalidInput(
            "a game requires at least one question".into(),
        ));
    }

    for _ in 0..MAX_ROOM_CODE_ATTEMPTS {
        let room_code = generate_room_code(config.room_code_prefix());
        let Some(game) = state.store().create_game(NewGame {
            room_code: room_code.clone(),
            host_id: host_id.clone(),
            total_questions,
        }) else {
            debug!(%room_code, "room code collision; drawing another");
            continue;
        };

        state.rooms().get_or_insert(game.id, GamePhase::Waiting);
        info!(game_id = game.id, %room_code, total_questions, "game created");
        return Ok(CreateGameResponse {
            game: game.into(),
            room_code,
        });
    }

    Err(ServiceError::InvalidState(
        "could not allocate a unique room code".into(),
    ))
}

/// Attach a connection to a room, either as its host or as a new player.
pub async fn join_game(
    state: &SharedState,
    connection_id: ConnectionId,
    request: JoinGameRequest,
) -> Result<(), ServiceError> {
    if let Some(identity) = state.connections().identity(connection_id) {
        return Err(ServiceError::InvalidState(format!(
            "connection already joined game `{}`",
            identity.game_id
        )));
    }

    let store = state.store();
    let game_id = store
        .game_by_room_code(&request.room_code)
        .map(|game| game.id)
        .ok_or_else(|| ServiceError::NotFound("Game not found".into()))?;

    let room = state.lock_room(game_id).await?;
    let game = load_game(store, game_id)?;
    let config = state.config();

    if request.player_name == config.host_sentinel() {
        state.connections().attach(
            connection_id,
            Identity {
                game_id,
                role: Role::Host,
            },
        )?;
        info!(game_id, %connection_id, "host joined");
        broadcast::send_to(
            state,
            connection_id,
            &ServerMessage::HostJoined { game: game.into() },
        );
        drop(room);
        return Ok(());
    }

    if room.phase() == GamePhase::Finished {
        return Err(ServiceError::InvalidState(
            "Game has already finished".into(),
        ));
    }

    let player = store.create_player(NewPlayer {
        game_id,
        name: request.player_name.trim().to_string(),
        connection_id,
    });
    if let Err(err) = state.connections().attach(
        connection_id,
        Identity {
            game_id,
            role: Role::Player(player.id),
        },
    ) {
        store.remove_player(player.id);
        return Err(err.into());
    }

    let players: Vec<PlayerSummary> = store
        .players_by_game(game_id)
        .into_iter()
        .map(PlayerSummary::from)
        .collect();
    let player_count = players.len();
    let summary = PlayerSummary::from(player);
    info!(game_id, player_id = summary.id, name = %summary.name, player_count, "player joined");

    broadcast::send_to(
        state,
        connection_id,
        &ServerMessage::JoinedGame {
            game: game.into(),
            player: summary.clone(),
            players,
        },
    );
    broadcast::broadcast_to_room(
        state,
        game_id,
        &ServerMessage::PlayerJoined {
            player: summary,
            player_count,
        },
        None,
    );
    drop(room);
    Ok(())
}

/// Forget a closed connection. Players are removed from their room and the room is notified.
pub async fn leave_game(state: &SharedState, connection_id: ConnectionId) {
    let Some(identity) = state.connections().identity(connection_id) else {
        state.connections().unregister(connection_id);
        return;
    };

    let room = match state.lock_room(identity.game_id).await {
        Ok(room) => room,
        Err(err) => {
            debug!(%connection_id, error = %err, "room vanished before disconnect cleanup");
            state.connections().unregister(connection_id);
            return;
        }
    };

    state.connections().unregister(connection_id);
    let Some(player_id) = identity.player_id() else {
        info!(game_id = identity.game_id, %connection_id, "host disconnected");
        return;
    };

    let store = state.store();
    store.remove_player(player_id);
    let player_count = store.players_by_game(identity.game_id).len();
    info!(game_id = identity.game_id, player_id, player_count, "player left");
    broadcast::broadcast_to_room(
        state,
        identity.game_id,
        &ServerMessage::PlayerLeft {
            player_id,
            player_count,
        },
        None,
    );
    drop(room);
}

/// Execute a host command on behalf of `connection_id`.
pub async fn host_action(
    state: &SharedState,
    connection_id: ConnectionId,
    request: HostActionRequest,
) -> Result<(), ServiceError> {
    let identity = state
        .connections()
        .identity(connection_id)
        .filter(Identity::is_host)
        .ok_or_else(|| ServiceError::Unauthorized("Not authorized".into()))?;

    match request.action {
        HostActionKind::NextQuestion => next_question(state, identity.game_id).await,
        HostActionKind::SetAnswer => {
            let config = state.config();
            let letter = request
                .value
                .as_deref()
                .and_then(|value| config.parse_answer_letter(value))
                .ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "Invalid answer: expected one of {}",
                        config.answer_letters().iter().collect::<String>()
                    ))
                })?;
            set_answer(state, identity.game_id, letter).await
        }
        HostActionKind::EndGame => end_game(state, identity.game_id).await,
    }
}

/// Start the next question and its countdown.
pub async fn next_question(state: &SharedState, game_id: GameId) -> Result<(), ServiceError> {
    let mut room = state.lock_room(game_id).await?;

    let store = state.store();
    let duration = state.config().question_duration_secs();
    let (question_number, _) = room.run_transition(GameEvent::NextQuestion, |plan| {
        let game = load_game(store, game_id)?;
        let next = game.current_question + 1;
        if next > game.total_questions {
            return Err(ServiceError::InvalidState(format!(
                "No more questions: all {} questions have been played",
                game.total_questions
            )));
        }
        store
            .update_game(
                game_id,
                GamePatch {
                    current_question: Some(next),
                    state: Some(plan.to.into()),
                    timer: Some(duration),
                    correct_answer: Some(None),
                },
            )
            .ok_or_else(|| game_not_found(game_id))?;
        Ok(next)
    })?;

    info!(game_id, question_number, "question started");
    broadcast::broadcast_to_room(
        state,
        game_id,
        &ServerMessage::QuestionStarted {
            question_number,
            timer: duration,
        },
        None,
    );
    timer_service::start_question_timer(state, &mut room, question_number);
    Ok(())
}

/// Record the correct letter for the running question, grade it and publish the standings.
pub async fn set_answer(
    state: &SharedState,
    game_id: GameId,
    letter: char,
) -> Result<(), ServiceError> {
    let mut room = state.lock_room(game_id).await?;

    let store = state.store();
    let budget_ms = state.config().answer_budget_ms();
    let (question_number, _) = room.run_transition(GameEvent::SetAnswer(letter), |plan| {
        let game = load_game(store, game_id)?;
        store
            .update_game(
                game_id,
                GamePatch {
                    state: Some(plan.to.into()),
                    correct_answer: Some(Some(letter)),
                    ..GamePatch::default()
                },
            )
            .ok_or_else(|| game_not_found(game_id))?;
        grade_question(store, game_id, game.current_question, letter, budget_ms);
        Ok(game.current_question)
    })?;
    room.cancel_timer();

    let leaderboard = leaderboard_entries(scoring::leaderboard(store.players_by_game(game_id)));
    info!(game_id, question_number, correct_answer = %letter, "question scored");
    broadcast::broadcast_to_room(
        state,
        game_id,
        &ServerMessage::QuestionScored {
            correct_answer: letter,
            leaderboard,
            question_number,
        },
        None,
    );
    Ok(())
}

/// Grade every answer of `question_number` against `letter`, crediting the owning players.
///
/// Returns the number of graded answers.
fn grade_question(
    store: &dyn RoomStore,
    game_id: GameId,
    question_number: u32,
    letter: char,
    budget_ms: u64,
) -> usize {
    let answers = store.answers_for_question(game_id, question_number);
    for answer in &answers {
        let is_correct = answer.answer == letter;
        let points = scoring::points(is_correct, answer.time_to_answer_ms, budget_ms);
        store.grade_answer(answer.id, is_correct, points);

        if points == 0 {
            continue;
        }
        let Some(player) = store.player(answer.player_id) else {
            debug!(
                game_id,
                player_id = answer.player_id,
                points,
                "player left before grading; points not credited"
            );
            continue;
        };
        store.update_player(
            player.id,
            PlayerPatch {
                total_score: Some(player.total_score.saturating_add(points)),
            },
        );
    }
    answers.len()
}

/// Finish the game and publish the final leaderboard.
pub async fn end_game(state: &SharedState, game_id: GameId) -> Result<(), ServiceError> {
    let mut room = state.lock_room(game_id).await?;

    let store = state.store();
    room.run_transition(GameEvent::EndGame, |plan| {
        store
            .update_game(
                game_id,
                GamePatch {
                    state: Some(plan.to.into()),
                    ..GamePatch::default()
                },
            )
            .ok_or_else(|| game_not_found(game_id))?;
        Ok(())
    })?;
    room.cancel_timer();

    let leaderboard = leaderboard_entries(scoring::leaderboard(store.players_by_game(game_id)));
    info!(game_id, players = leaderboard.len(), "game ended");
    broadcast::broadcast_to_room(
        state,
        game_id,
        &ServerMessage::GameEnded { leaderboard },
        None,
    );
    Ok(())
}

/// Store a player's answer for the running question.
pub async fn submit_answer(
    state: &SharedState,
    connection_id: ConnectionId,
    request: SubmitAnswerRequest,
) -> Result<(), ServiceError> {
    let identity = state.connections().identity(connection_id).ok_or_else(|| {
        ServiceError::InvalidState("Join a game before submitting answers".into())
    })?;
    let player_id = identity
        .player_id()
        .ok_or_else(|| ServiceError::Unauthorized("Only players can submit answers".into()))?;
    let config = state.config();
    let letter = config
        .parse_answer_letter(&request.answer)
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid answer: expected one of {}",
                config.answer_letters().iter().collect::<String>()
            ))
        })?;

    let game_id = identity.game_id;
    let room = state.lock_room(game_id).await?;
    if room.phase() != GamePhase::Active {
        return Err(ServiceError::InvalidState(
            "No question is currently accepting answers".into(),
        ));
    }

    let store = state.store();
    let question_number = load_game(store, game_id)?.current_question;
    if store
        .answer_for_player(game_id, player_id, question_number)
        .is_some()
    {
        return Err(ServiceError::Duplicate(format!(
            "player `{player_id}` already answered question {question_number}"
        )));
    }

    store.create_answer(NewAnswer {
        game_id,
        player_id,
        question_number,
        answer: letter,
        time_to_answer_ms: request.time_to_answer_ms,
    });
    debug!(game_id, player_id, question_number, "answer recorded");

    broadcast::send_to(
        state,
        connection_id,
        &ServerMessage::AnswerSubmitted {
            answer: letter,
            time_to_answer: request.time_to_answer_ms,
        },
    );
    broadcast::broadcast_to_room(
        state,
        game_id,
        &ServerMessage::AnswerStats {
            answered_count: store.answers_for_question(game_id, question_number).len(),
            total_players: store.players_by_game(game_id).len(),
        },
        Some(connection_id),
    );
    drop(room);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::{
        dao::models::GameState,
        services::testing::{TestClient, open_room, state},
    };

    #[tokio::test]
    async fn create_game_allocates_prefixed_codes() {
        let state = state();
        let created = open_room(&state, 5);

        assert!(created.room_code.starts_with("QZ-"));
        assert_eq!(created.room_code.len(), 7);
        assert!(
            created.room_code[3..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert_eq!(created.game.total_questions, 5);
        assert_eq!(created.game.game_state, GameState::Waiting);
        assert_eq!(state.rooms().count(), 1);

        let defaulted = create_game(&state, CreateGameRequest::default()).unwrap();
        assert_eq!(defaulted.game.total_questions, 10);
        assert!(defaulted.game.host_id.starts_with("host-"));
        assert_ne!(defaulted.room_code, created.room_code);
    }

    #[tokio::test]
    async fn speed_scoring_round_trip() {
        let state = state();
        let room = open_room(&state, 3);
        let mut host = TestClient::connect(&state);
        let mut ann = TestClient::connect(&state);
        let mut bo = TestClient::connect(&state);

        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        bo.join(&state, &room.room_code, "Bo").await.unwrap();
        assert_eq!(host.kinds(), ["host_joined", "player_joined", "player_joined"]);
        assert_eq!(ann.kinds(), ["joined_game", "player_joined", "player_joined"]);
        bo.drain();

        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        let started = bo.last_of("question_started").unwrap();
        assert_eq!(started["data"]["questionNumber"], 1);
        assert_eq!(started["data"]["timer"], 15);

        ann.submit(&state, "A", 2000).await.unwrap();
        bo.submit(&state, "B", 5000).await.unwrap();
        let ack = ann.last_of("answer_submitted").unwrap();
        assert_eq!(ack["data"]["answer"], "A");
        assert_eq!(ack["data"]["timeToAnswer"], 2000);
        let stats = host.last_of("answer_stats").unwrap();
        assert_eq!(stats["data"]["answeredCount"], 2);
        assert_eq!(stats["data"]["totalPlayers"], 2);

        host.host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap();
        let scored = ann.last_of("question_scored").unwrap();
        assert_eq!(scored["data"]["correctAnswer"], "A");
        assert_eq!(scored["data"]["questionNumber"], 1);
        let leaderboard = scored["data"]["leaderboard"].as_array().unwrap();
        assert_eq!(leaderboard[0]["name"], "Ann");
        assert_eq!(leaderboard[0]["totalScore"], 187);
        assert_eq!(leaderboard[0]["rank"], 1);
        assert_eq!(leaderboard[1]["name"], "Bo");
        assert_eq!(leaderboard[1]["totalScore"], 0);
        assert_eq!(leaderboard[1]["rank"], 2);

        let game = state.store().game(room.game.id).unwrap();
        assert_eq!(game.state, GameState::Scoring);
        assert_eq!(game.correct_answer, Some('A'));
        let graded = state.store().answers_for_question(room.game.id, 1);
        assert!(graded[0].is_correct);
        assert_eq!(graded[0].points, 187);
        assert!(!graded[1].is_correct);
        assert_eq!(graded[1].points, 0);
    }

    #[tokio::test]
    async fn busy_room_does_not_block_another_room() {
        let state = state();
        let first = open_room(&state, 3);
        let second = open_room(&state, 3);
        let mut first_host = TestClient::connect(&state);
        let mut second_host = TestClient::connect(&state);
        first_host.join(&state, &first.room_code, "HOST").await.unwrap();
        second_host.join(&state, &second.room_code, "HOST").await.unwrap();
        first_host.drain();
        second_host.drain();

        let held = state
            .rooms()
            .get(first.game.id)
            .unwrap()
            .lock_owned()
            .await;
        tokio::time::timeout(
            Duration::from_secs(1),
            second_host.host(&state, HostActionKind::NextQuestion, None),
        )
        .await
        .expect("second room must not wait on the first room's lock")
        .unwrap();

        let started = second_host.last_of("question_started").unwrap();
        assert_eq!(started["data"]["questionNumber"], 1);
        assert_eq!(
            state.store().game(second.game.id).unwrap().state,
            GameState::Active
        );

        assert!(first_host.kinds().is_empty());
        let untouched = state.store().game(first.game.id).unwrap();
        assert_eq!(untouched.state, GameState::Waiting);
        assert_eq!(untouched.current_question, 0);
        assert_eq!(held.phase(), GamePhase::Waiting);
        assert_eq!(held.version(), 0);
    }

    #[tokio::test]
    async fn host_actions_require_the_host_flag() {
        let state = state();
        let room = open_room(&state, 3);
        let ann = TestClient::connect(&state);
        let stranger = TestClient::connect(&state);
        ann.join(&state, &room.room_code, "Ann").await.unwrap();

        for client in [&ann, &stranger] {
            let err = client
                .host(&state, HostActionKind::NextQuestion, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(_)));
        }
        let game = state.store().game(room.game.id).unwrap();
        assert_eq!(game.state, GameState::Waiting);
        assert_eq!(game.current_question, 0);
    }

    #[tokio::test]
    async fn duplicate_submissions_are_dropped() {
        let state = state();
        let room = open_room(&state, 3);
        let host = TestClient::connect(&state);
        let mut ann = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        ann.drain();

        ann.submit(&state, "C", 500).await.unwrap();
        let err = ann.submit(&state, "D", 700).await.unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
        assert!(!err.is_reportable());

        let answers = state.store().answers_for_question(room.game.id, 1);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, 'C');
        assert_eq!(ann.kinds(), ["answer_submitted"]);
    }

    #[tokio::test]
    async fn concurrent_duplicates_store_a_single_answer() {
        let state = state();
        let room = open_room(&state, 3);
        let host = TestClient::connect(&state);
        let ann = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            ann.submit(&state, "A", 100),
            ann.submit(&state, "B", 100)
        );
        assert!(first.is_ok() ^ second.is_ok());
        assert_eq!(state.store().answers_for_question(room.game.id, 1).len(), 1);
    }

    #[tokio::test]
    async fn submissions_outside_active_questions_are_rejected() {
        let state = state();
        let room = open_room(&state, 3);
        let host = TestClient::connect(&state);
        let ann = TestClient::connect(&state);
        let loner = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();

        let err = ann.submit(&state, "A", 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let err = loner.submit(&state, "A", 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let err = host.submit(&state, "A", 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        let err = ann.submit(&state, "E", 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(state.store().answers_for_question(room.game.id, 1).is_empty());
    }

    #[tokio::test]
    async fn questions_are_bounded_by_the_total() {
        let state = state();
        let room = open_room(&state, 1);
        let host = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();

        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        host.host(&state, HostActionKind::SetAnswer, Some("B"))
            .await
            .unwrap();
        let err = host
            .host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let game = state.store().game(room.game.id).unwrap();
        assert_eq!(game.current_question, 1);
        assert_eq!(game.state, GameState::Scoring);
    }

    #[tokio::test]
    async fn grading_happens_once_per_question() {
        let state = state();
        let room = open_room(&state, 3);
        let host = TestClient::connect(&state);
        let ann = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        ann.submit(&state, "A", 0).await.unwrap();

        let err = host
            .host(&state, HostActionKind::SetAnswer, Some("Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = host
            .host(&state, HostActionKind::SetAnswer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        host.host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap();
        let err = host
            .host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let players = state.store().players_by_game(room.game.id);
        assert_eq!(players[0].total_score, 200);
    }

    #[tokio::test]
    async fn finished_games_absorb_everything() {
        let state = state();
        let room = open_room(&state, 3);
        let mut host = TestClient::connect(&state);
        let ann = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        host.host(&state, HostActionKind::EndGame, None)
            .await
            .unwrap();

        let ended = host.last_of("game_ended").unwrap();
        assert_eq!(ended["data"]["leaderboard"][0]["name"], "Ann");

        for action in [
            HostActionKind::NextQuestion,
            HostActionKind::EndGame,
        ] {
            let err = host.host(&state, action, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidState(_)));
        }
        let err = host
            .host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(matches!(
            ann.submit(&state, "A", 1).await,
            Err(ServiceError::InvalidState(_))
        ));

        let late = TestClient::connect(&state);
        assert!(matches!(
            late.join(&state, &room.room_code, "Cy").await,
            Err(ServiceError::InvalidState(_))
        ));
        let second_host = TestClient::connect(&state);
        second_host
            .join(&state, &room.room_code, "HOST")
            .await
            .unwrap();

        let game = state.store().game(room.game.id).unwrap();
        assert_eq!(game.state, GameState::Finished);
        assert_eq!(host.kinds(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn disconnect_notifies_the_room_and_rejoin_starts_fresh() {
        let state = state();
        let room = open_room(&state, 3);
        let mut host = TestClient::connect(&state);
        let mut ann = TestClient::connect(&state);
        let bo = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        bo.join(&state, &room.room_code, "Bo").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        bo.submit(&state, "A", 0).await.unwrap();
        host.host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap();
        let bo_id = state.store().players_by_game(room.game.id)[1].id;
        ann.drain();
        host.drain();

        leave_game(&state, bo.id).await;
        let left = ann.last_of("player_left").unwrap();
        assert_eq!(left["data"]["playerId"], Value::from(bo_id));
        assert_eq!(left["data"]["playerCount"], 1);
        assert!(state.store().player(bo_id).is_none());
        assert_eq!(state.connections().member_count(room.game.id), 2);

        let back = TestClient::connect(&state);
        back.join(&state, &room.room_code, "Bo").await.unwrap();
        let joined = host.last_of("player_joined").unwrap();
        assert_eq!(joined["data"]["player"]["totalScore"], 0);
        assert_eq!(joined["data"]["playerCount"], 2);

        leave_game(&state, host.id).await;
        assert_eq!(state.store().players_by_game(room.game.id).len(), 2);
    }

    #[tokio::test]
    async fn departed_players_are_skipped_during_grading() {
        let state = state();
        let room = open_room(&state, 3);
        let host = TestClient::connect(&state);
        let ann = TestClient::connect(&state);
        let bo = TestClient::connect(&state);
        host.join(&state, &room.room_code, "HOST").await.unwrap();
        ann.join(&state, &room.room_code, "Ann").await.unwrap();
        bo.join(&state, &room.room_code, "Bo").await.unwrap();
        host.host(&state, HostActionKind::NextQuestion, None)
            .await
            .unwrap();
        ann.submit(&state, "A", 0).await.unwrap();
        bo.submit(&state, "A", 0).await.unwrap();
        leave_game(&state, bo.id).await;

        host.host(&state, HostActionKind::SetAnswer, Some("A"))
            .await
            .unwrap();

        let players = state.store().players_by_game(room.game.id);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].total_score, 200);
    }

    #[tokio::test]
    async fn joining_validates_room_and_connection() {
        let state = state();
        let room = open_room(&state, 3);
        let ann = TestClient::connect(&state);

        assert!(matches!(
            ann.join(&state, "QZ-NOPE", "Ann").await,
            Err(ServiceError::NotFound(_))
        ));
        ann.join(&state, &room.room_code, "  Ann  ").await.unwrap();
        assert!(matches!(
            ann.join(&state, &room.room_code, "Ann again").await,
            Err(ServiceError::InvalidState(_))
        ));

        let players = state.store().players_by_game(room.game.id);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Ann");
    }
}
