use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::GameState;

/// Phases a room moves through during a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Lobby, or between questions after a timer expired.
    Waiting,
    /// A question is running and answers are accepted.
    Active,
    /// The current question has been graded; only a new question or the end may follow.
    Scoring,
    /// Final leaderboard published; no further transitions.
    Finished,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Host advances to the next question.
    NextQuestion,
    /// Host supplies the correct letter for the running question.
    SetAnswer(char),
    /// The question countdown reached zero before the host graded it.
    TimerExpired,
    /// Host ends the game.
    EndGame,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: GamePhase,
        /// Current phase.
        actual: GamePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: GamePhase,
    /// Phase the state machine will transition to.
    pub to: GamePhase,
    /// Event that triggered this transition.
    pub event: GameEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
}

/// Per-room state machine for the question cycle.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Waiting,
            version: 0,
            pending: None,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the waiting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine for a room whose persisted state is already known.
    pub fn resume(phase: GamePhase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event.clone())
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, &event) {
            (GamePhase::Waiting | GamePhase::Scoring, GameEvent::NextQuestion) => GamePhase::Active,
            (GamePhase::Active, GameEvent::SetAnswer(_)) => GamePhase::Scoring,
            (GamePhase::Active, GameEvent::TimerExpired) => GamePhase::Waiting,
            (GamePhase::Waiting | GamePhase::Active | GamePhase::Scoring, GameEvent::EndGame) => {
                GamePhase::Finished
            }
            (from, _) => {
                return Err(InvalidTransition {
                    from,
                    event: event.clone(),
                });
            }
        };

        Ok(next)
    }
}

impl From<GamePhase> for GameState {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Waiting => GameState::Waiting,
            GamePhase::Active => GameState::Active,
            GamePhase::Scoring => GameState::Scoring,
            GamePhase::Finished => GameState::Finished,
        }
    }
}

impl From<GameState> for GamePhase {
    fn from(value: GameState) -> Self {
        match value {
            GameState::Waiting => GamePhase::Waiting,
            GameState::Active => GamePhase::Active,
            GameState::Scoring => GamePhase::Scoring,
            GameState::Finished => GamePhase::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    fn rejected(sm: &mut GameStateMachine, event: GameEvent) -> InvalidTransition {
        match sm.plan(event) {
            Err(PlanError::InvalidTransition(invalid)) => invalid,
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn initial_state_is_waiting() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_question_cycle_until_finish() {
        let mut sm = GameStateMachine::new();

        assert_eq!(apply(&mut sm, GameEvent::NextQuestion), GamePhase::Active);
        assert_eq!(apply(&mut sm, GameEvent::SetAnswer('A')), GamePhase::Scoring);
        assert_eq!(apply(&mut sm, GameEvent::NextQuestion), GamePhase::Active);
        assert_eq!(apply(&mut sm, GameEvent::TimerExpired), GamePhase::Waiting);
        assert_eq!(apply(&mut sm, GameEvent::NextQuestion), GamePhase::Active);
        assert_eq!(apply(&mut sm, GameEvent::EndGame), GamePhase::Finished);
        assert_eq!(sm.version(), 6);
    }

    #[test]
    fn graded_question_cannot_be_graded_again() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::NextQuestion);
        apply(&mut sm, GameEvent::SetAnswer('B'));

        let invalid = rejected(&mut sm, GameEvent::SetAnswer('B'));
        assert_eq!(invalid.from, GamePhase::Scoring);
        assert_eq!(rejected(&mut sm, GameEvent::TimerExpired).from, GamePhase::Scoring);
    }

    #[test]
    fn answer_and_expiry_require_an_active_question() {
        let mut sm = GameStateMachine::new();
        assert_eq!(
            rejected(&mut sm, GameEvent::SetAnswer('C')).event,
            GameEvent::SetAnswer('C')
        );
        assert_eq!(
            rejected(&mut sm, GameEvent::TimerExpired).from,
            GamePhase::Waiting
        );
    }

    #[test]
    fn finished_is_absorbing() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::EndGame);

        for event in [
            GameEvent::NextQuestion,
            GameEvent::SetAnswer('A'),
            GameEvent::TimerExpired,
            GameEvent::EndGame,
        ] {
            assert_eq!(rejected(&mut sm, event).from, GamePhase::Finished);
        }
        assert_eq!(sm.phase(), GamePhase::Finished);
    }

    #[test]
    fn pending_plan_blocks_new_plans_until_aborted() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::NextQuestion).unwrap();
        assert_eq!(plan.to, GamePhase::Active);
        assert_eq!(
            sm.plan(GameEvent::EndGame).unwrap_err(),
            PlanError::AlreadyPending
        );

        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), GamePhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn apply_with_wrong_plan_id_keeps_pending_plan() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::NextQuestion).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert_eq!(sm.apply(plan.id).unwrap(), GamePhase::Active);
    }

    #[test]
    fn resumed_machine_keeps_phase() {
        let sm = GameStateMachine::resume(GameState::Scoring.into());
        assert_eq!(sm.phase(), GamePhase::Scoring);
        assert_eq!(GameState::from(sm.phase()), GameState::Scoring);
    }
}
