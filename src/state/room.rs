use std::sync::Arc;

use dashmap::DashMap;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    dao::models::GameId,
    error::ServiceError,
    state::state_machine::{GameEvent, GamePhase, GameStateMachine, Plan},
};

/// Countdown task bound to one question of one room.
#[derive(Debug)]
pub struct TimerHandle {
    question_number: u32,
    version: usize,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Wrap a spawned countdown started for `question_number` at state-machine `version`.
    pub fn new(question_number: u32, version: usize, task: JoinHandle<()>) -> Self {
        Self {
            question_number,
            version,
            task,
        }
    }
}

/// Runtime state of a room guarded by the room's mutex.
///
/// Every mutation of a room (store writes included) happens while this value is locked, which
/// totally orders transitions, submissions and timer ticks within the room.
#[derive(Debug)]
pub struct RoomRuntime {
    game_id: GameId,
    machine: GameStateMachine,
    timer: Option<TimerHandle>,
}

impl RoomRuntime {
    /// Runtime for a freshly created room.
    pub fn new(game_id: GameId) -> Self {
        Self::resume(game_id, GamePhase::Waiting)
    }

    /// Runtime for a room whose persisted phase is already known.
    pub fn resume(game_id: GameId, phase: GamePhase) -> Self {
        Self {
            game_id,
            machine: GameStateMachine::resume(phase),
            timer: None,
        }
    }

    /// Game backing this room.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Committed phase of the room.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Number of transitions committed so far.
    pub fn version(&self) -> usize {
        self.machine.version()
    }

    /// Validate `event`, run `work`, then commit the transition.
    ///
    /// `work` receives the validated plan and performs the store mutations. When it fails the plan
    /// is aborted and the phase is left untouched.
    pub fn run_transition<T, F>(
        &mut self,
        event: GameEvent,
        work: F,
    ) -> Result<(T, GamePhase), ServiceError>
    where
        F: FnOnce(&Plan) -> Result<T, ServiceError>,
    {
        let plan = self.machine.plan(event.clone())?;

        match work(&plan) {
            Ok(value) => {
                let next = self.machine.apply(plan.id)?;
                debug!(game_id = self.game_id, from = ?plan.from, to = ?next, "room transition applied");
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.machine.abort(plan.id) {
                    warn!(
                        game_id = self.game_id,
                        event = ?event,
                        plan_id = %plan.id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Install a new countdown, aborting any previous one first.
    pub fn install_timer(&mut self, timer: TimerHandle) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    /// Abort the running countdown, if any.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
            debug!(
                game_id = self.game_id,
                question = timer.question_number,
                "question timer cancelled"
            );
        }
    }

    /// Drop the handle of a countdown that finished on its own.
    pub fn release_timer(&mut self, version: usize) {
        if self
            .timer
            .as_ref()
            .is_some_and(|timer| timer.version == version)
        {
            self.timer = None;
        }
    }

    /// Whether a countdown started for (`question_number`, `version`) may still act on the room.
    pub fn timer_is_current(&self, question_number: u32, version: usize) -> bool {
        self.phase() == GamePhase::Active
            && self.version() == version
            && self.timer.as_ref().is_some_and(|timer| {
                timer.question_number == question_number && timer.version == version
            })
    }
}

/// Locked view of a room.
pub type RoomGuard = OwnedMutexGuard<RoomRuntime>;

/// Arena of room runtimes keyed by game id.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<GameId, Arc<Mutex<RoomRuntime>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the runtime for `game_id`, creating it in `phase` when absent.
    pub fn get_or_insert(&self, game_id: GameId, phase: GamePhase) -> Arc<Mutex<RoomRuntime>> {
        self.rooms
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(RoomRuntime::resume(game_id, phase))))
            .clone()
    }

    /// Number of rooms with a runtime.
    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    /// Look up an existing runtime.
    pub fn get(&self, game_id: GameId) -> Option<Arc<Mutex<RoomRuntime>>> {
        self.rooms.get(&game_id).map(|room| room.clone())
    }
}
