use tracing::{debug, info, warn};

use crate::{
    dao::models::{GameId, GamePatch},
    dto::ws::ServerMessage,
    error::ServiceError,
    services::broadcast,
    state::{RoomRuntime, SharedState, TimerHandle, state_machine::GameEvent},
};

/// Spawn the countdown for `question_number`, replacing any countdown already running in the room.
///
/// Must be called right after the transition into the active phase, while the room is locked, so
/// the countdown binds to the state-machine version of that question.
pub fn start_question_timer(state: &SharedState, room: &mut RoomRuntime, question_number: u32) {
    let game_id = room.game_id();
    let version = room.version();
    let task = tokio::spawn(run_countdown(
        state.clone(),
        game_id,
        question_number,
        version,
    ));
    room.install_timer(TimerHandle::new(question_number, version, task));
    debug!(game_id, question_number, version, "question timer started");
}

async fn run_countdown(state: SharedState, game_id: GameId, question_number: u32, version: usize) {
    let tick_interval = state.config().tick_interval();
    loop {
        tokio::time::sleep(tick_interval).await;

        let mut room = match state.lock_room(game_id).await {
            Ok(room) => room,
            Err(err) => {
                warn!(game_id, error = %err, "question timer lost its room");
                return;
            }
        };
        if !tick(&state, &mut room, question_number, version) {
            return;
        }
    }
}

/// Apply one countdown tick. Returns whether the countdown keeps running.
fn tick(state: &SharedState, room: &mut RoomRuntime, question_number: u32, version: usize) -> bool {
    let game_id = room.game_id();
    if !room.timer_is_current(question_number, version) {
        debug!(game_id, question_number, version, "stale timer tick ignored");
        return false;
    }

    let store = state.store();
    let Some(game) = store.game(game_id) else {
        room.release_timer(version);
        return false;
    };

    let remaining = game.timer.saturating_sub(1);
    if remaining > 0 {
        store.update_game(
            game_id,
            GamePatch {
                timer: Some(remaining),
                ..GamePatch::default()
            },
        );
        broadcast::broadcast_to_room(
            state,
            game_id,
            &ServerMessage::TimerUpdate { timer: remaining },
            None,
        );
        return true;
    }

    room.release_timer(version);
    let expired = room.run_transition(GameEvent::TimerExpired, |plan| {
        store
            .update_game(
                game_id,
                GamePatch {
                    state: Some(plan.to.into()),
                    timer: Some(0),
                    ..GamePatch::default()
                },
            )
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))
    });

    match expired {
        Ok(_) => {
            info!(game_id, question_number, "question timer expired");
            broadcast::broadcast_to_room(
                state,
                game_id,
                &ServerMessage::TimerExpired { question_number },
                None,
            );
        }
        Err(err) => warn!(game_id, question_number, error = %err, "failed to expire question"),
    }
    false
}
