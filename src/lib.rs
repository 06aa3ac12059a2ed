//! Library crate for quiz-room-back, exposing modules for binaries and integration tests.

/// Runtime configuration loaded from disk.
pub mod config;
/// Record models and storage backends.
pub mod dao;
mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP and WebSocket route trees.
pub mod routes;
/// Room logic, delivery and background tasks.
pub mod services;
/// Shared application state, room runtimes and connection registry.
pub mod state;
