use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexSet;

use crate::dao::{
    models::{
        AnswerEntity, AnswerId, GameEntity, GameId, GamePatch, GameState, NewAnswer, NewGame,
        NewPlayer, PlayerEntity, PlayerId, PlayerPatch,
    },
    room_store::RoomStore,
};

/// Process-local [`RoomStore`] backed by concurrent hash maps.
///
/// Ids come from monotonically increasing counters starting at 1, so sorting by id
/// reproduces insertion order.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    games: DashMap<GameId, GameEntity>,
    room_codes: DashMap<String, GameId>,
    players: DashMap<PlayerId, PlayerEntity>,
    /// Player ids per game, kept in join order.
    roster: DashMap<GameId, IndexSet<PlayerId>>,
    /// Answers partitioned by game, kept in submission order.
    answers: DashMap<GameId, Vec<AnswerEntity>>,
    answer_games: DashMap<AnswerId, GameId>,
    next_game_id: AtomicU64,
    next_player_id: AtomicU64,
    next_answer_id: AtomicU64,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl RoomStore for MemoryRoomStore {
    fn create_game(&self, game: NewGame) -> Option<GameEntity> {
        let Entry::Vacant(slot) = self.room_codes.entry(game.room_code.clone()) else {
            return None;
        };

        let id = Self::allocate(&self.next_game_id);
        let entity = GameEntity {
            id,
            room_code: game.room_code,
            host_id: game.host_id,
            current_question: 0,
            total_questions: game.total_questions,
            state: GameState::Waiting,
            timer: 0,
            correct_answer: None,
            created_at: SystemTime::now(),
        };
        self.games.insert(id, entity.clone());
        slot.insert(id);
        Some(entity)
    }

    fn game(&self, id: GameId) -> Option<GameEntity> {
        self.games.get(&id).map(|game| game.clone())
    }

    fn game_by_room_code(&self, room_code: &str) -> Option<GameEntity> {
        let id = *self.room_codes.get(room_code)?;
        self.game(id)
    }

    fn update_game(&self, id: GameId, patch: GamePatch) -> Option<GameEntity> {
        let mut game = self.games.get_mut(&id)?;
        patch.apply_to(&mut *game);
        Some(game.clone())
    }

    fn create_player(&self, player: NewPlayer) -> PlayerEntity {
        let id = Self::allocate(&self.next_player_id);
        let entity = PlayerEntity {
            id,
            game_id: player.game_id,
            name: player.name,
            connection_id: player.connection_id,
            total_score: 0,
            joined_at: SystemTime::now(),
        };
        self.players.insert(id, entity.clone());
        self.roster.entry(entity.game_id).or_default().insert(id);
        entity
    }

    fn player(&self, id: PlayerId) -> Option<PlayerEntity> {
        self.players.get(&id).map(|player| player.clone())
    }

    fn players_by_game(&self, game_id: GameId) -> Vec<PlayerEntity> {
        let ids: Vec<PlayerId> = self
            .roster
            .get(&game_id)
            .map(|roster| roster.iter().copied().collect())
            .unwrap_or_default();
        ids.into_iter().filter_map(|id| self.player(id)).collect()
    }

    fn update_player(&self, id: PlayerId, patch: PlayerPatch) -> Option<PlayerEntity> {
        let mut player = self.players.get_mut(&id)?;
        patch.apply_to(&mut *player);
        Some(player.clone())
    }

    fn remove_player(&self, id: PlayerId) -> Option<PlayerEntity> {
        let (_, player) = self.players.remove(&id)?;
        if let Some(mut roster) = self.roster.get_mut(&player.game_id) {
            roster.shift_remove(&id);
        }
        Some(player)
    }

    fn create_answer(&self, answer: NewAnswer) -> AnswerEntity {
        let id = Self::allocate(&self.next_answer_id);
        let entity = AnswerEntity {
            id,
            game_id: answer.game_id,
            player_id: answer.player_id,
            question_number: answer.question_number,
            answer: answer.answer,
            time_to_answer_ms: answer.time_to_answer_ms,
            is_correct: false,
            points: 0,
            answered_at: SystemTime::now(),
        };
        self.answers
            .entry(entity.game_id)
            .or_default()
            .push(entity.clone());
        self.answer_games.insert(id, entity.game_id);
        entity
    }

    fn answers_for_question(&self, game_id: GameId, question_number: u32) -> Vec<AnswerEntity> {
        self.answers
            .get(&game_id)
            .map(|answers| {
                answers
                    .iter()
                    .filter(|answer| answer.question_number == question_number)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn answer_for_player(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        question_number: u32,
    ) -> Option<AnswerEntity> {
        self.answers.get(&game_id).and_then(|answers| {
            answers
                .iter()
                .find(|answer| {
                    answer.player_id == player_id && answer.question_number == question_number
                })
                .cloned()
        })
    }

    fn grade_answer(&self, id: AnswerId, is_correct: bool, points: u32) -> Option<AnswerEntity> {
        let game_id = *self.answer_games.get(&id)?;
        let mut answers = self.answers.get_mut(&game_id)?;
        let answer = answers.iter_mut().find(|answer| answer.id == id)?;
        answer.is_correct = is_correct;
        answer.points = points;
        Some(answer.clone())
    }
}
