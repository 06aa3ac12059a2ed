mod memory;

pub use self::memory::MemoryRoomStore;

use crate::dao::models::{
    AnswerEntity, AnswerId, GameEntity, GameId, GamePatch, NewAnswer, NewGame, NewPlayer,
    PlayerEntity, PlayerId, PlayerPatch,
};

/// Abstraction over the record storage for games, players and answers.
///
/// Every call is atomic on its own. Multi-step sequences (read a score, then write it back) are
/// serialized by the caller through the per-room lock. Implementations never enforce business
/// rules such as answer uniqueness.
pub trait RoomStore: Send + Sync {
    /// Insert a game, returning `None` when its room code is already taken.
    fn create_game(&self, game: NewGame) -> Option<GameEntity>;
    /// Fetch a game by id.
    fn game(&self, id: GameId) -> Option<GameEntity>;
    /// Fetch a game by its room code.
    fn game_by_room_code(&self, room_code: &str) -> Option<GameEntity>;
    /// Merge `patch` onto the stored game, returning `None` when the id is unknown.
    fn update_game(&self, id: GameId, patch: GamePatch) -> Option<GameEntity>;

    /// Insert a player with a zero score at the end of its game's roster.
    fn create_player(&self, player: NewPlayer) -> PlayerEntity;
    /// Fetch a player by id.
    fn player(&self, id: PlayerId) -> Option<PlayerEntity>;
    /// Players of a game in join order.
    fn players_by_game(&self, game_id: GameId) -> Vec<PlayerEntity>;
    /// Merge `patch` onto the stored player, returning `None` when the id is unknown.
    fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Option<PlayerEntity>;
    /// Delete a player and drop it from its game's roster.
    fn remove_player(&self, id: PlayerId) -> Option<PlayerEntity>;

    /// Insert an ungraded answer.
    fn create_answer(&self, answer: NewAnswer) -> AnswerEntity;
    /// Answers for one question in submission order.
    fn answers_for_question(&self, game_id: GameId, question_number: u32) -> Vec<AnswerEntity>;
    /// The answer `player_id` gave to `question_number`, if any.
    fn answer_for_player(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        question_number: u32,
    ) -> Option<AnswerEntity>;
    /// Record the grading outcome of an answer.
    fn grade_answer(&self, id: AnswerId, is_correct: bool, points: u32) -> Option<AnswerEntity>;
}
