use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of a game (room) record.
pub type GameId = u64;
/// Identifier of a player record.
pub type PlayerId = u64;
/// Identifier of an answer record.
pub type AnswerId = u64;

/// Lifecycle state persisted on every game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Room is open, no question is running.
    Waiting,
    /// A question is running and answers are accepted.
    Active,
    /// The current question has been graded.
    Scoring,
    /// The game is over; absorbing state.
    Finished,
}

/// Stored representation of one quiz room.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEntity {
    /// Stable identifier for the game.
    pub id: GameId,
    /// Short code players type to join the room.
    pub room_code: String,
    /// Opaque identifier of the host who created the room.
    pub host_id: String,
    /// Current question number, 0 until the first question starts.
    pub current_question: u32,
    /// Number of questions the host intends to run.
    pub total_questions: u32,
    /// Lifecycle state mirrored from the room state machine.
    pub state: GameState,
    /// Remaining seconds for the running question.
    pub timer: u32,
    /// Letter set by the host when the current question was graded.
    pub correct_answer: Option<char>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Stored representation of one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: PlayerId,
    /// Room the player belongs to.
    pub game_id: GameId,
    /// Display name, trimmed.
    pub name: String,
    /// Connection the player joined with; may outlive the socket if no close event arrives.
    pub connection_id: Uuid,
    /// Sum of the points of every graded answer.
    pub total_score: u32,
    /// Join timestamp.
    pub joined_at: SystemTime,
}

/// Stored representation of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerEntity {
    /// Stable identifier for the answer.
    pub id: AnswerId,
    /// Room the answer was submitted in.
    pub game_id: GameId,
    /// Player who submitted it.
    pub player_id: PlayerId,
    /// Question the answer belongs to.
    pub question_number: u32,
    /// Chosen letter.
    pub answer: char,
    /// Client-measured time between question start and submission.
    pub time_to_answer_ms: u64,
    /// Set when the question is graded; `false` until then.
    pub is_correct: bool,
    /// Points credited at grading time; 0 until then.
    pub points: u32,
    /// Submission timestamp.
    pub answered_at: SystemTime,
}

/// Fields required to insert a game.
#[derive(Debug, Clone)]
pub struct NewGame {
    /// Unique room code.
    pub room_code: String,
    /// Host identifier.
    pub host_id: String,
    /// Planned number of questions.
    pub total_questions: u32,
}

/// Fields required to insert a player.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    /// Room being joined.
    pub game_id: GameId,
    /// Display name, already trimmed.
    pub name: String,
    /// Connection that joined.
    pub connection_id: Uuid,
}

/// Fields required to insert an ungraded answer.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    /// Room the answer is submitted in.
    pub game_id: GameId,
    /// Submitting player.
    pub player_id: PlayerId,
    /// Question being answered.
    pub question_number: u32,
    /// Chosen letter.
    pub answer: char,
    /// Client-measured latency.
    pub time_to_answer_ms: u64,
}

/// Partial update merged onto a game record; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    /// New current question number.
    pub current_question: Option<u32>,
    /// New lifecycle state.
    pub state: Option<GameState>,
    /// New remaining seconds.
    pub timer: Option<u32>,
    /// `Some(None)` clears the stored letter.
    pub correct_answer: Option<Option<char>>,
}

impl GamePatch {
    /// Merge the patch onto `game`.
    pub fn apply_to(self, game: &mut GameEntity) {
        if let Some(question) = self.current_question {
            game.current_question = question;
        }
        if let Some(state) = self.state {
            game.state = state;
        }
        if let Some(timer) = self.timer {
            game.timer = timer;
        }
        if let Some(correct_answer) = self.correct_answer {
            game.correct_answer = correct_answer;
        }
    }
}

/// Partial update merged onto a player record.
#[derive(Debug, Clone, Default)]
pub struct PlayerPatch {
    /// New total score.
    pub total_score: Option<u32>,
}

impl PlayerPatch {
    /// Merge the patch onto `player`.
    pub fn apply_to(self, player: &mut PlayerEntity) {
        if let Some(score) = self.total_score {
            player.total_score = score;
        }
    }
}
