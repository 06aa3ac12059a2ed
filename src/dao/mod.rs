/// Stored entities and partial updates.
pub mod models;
/// Storage abstraction for games, players and answers.
pub mod room_store;
