//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted for a player.
pub const MAX_PLAYER_NAME_CHARS: usize = 32;

/// Validates that a player name is non-blank and reasonably short.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Ann")   // Ok
/// validate_player_name("   ")   // Err - blank
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be empty".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_PLAYER_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code only contains printable, non-whitespace ASCII.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_graphic()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must be non-empty printable ASCII".into());
        return Err(err);
    }

    Ok(())
}
