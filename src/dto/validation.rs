//! Validation helpers for DTOs.

use validator::ValidationError;

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;
/// Upper bound on a display name.
pub const MAX_NAME_CHARS: usize = 32;

/// Validates that a room code is exactly 6 uppercase letters or digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("K7QX2M") // Ok
/// validate_room_code("k7qx2m") // Err - lowercase
/// validate_room_code("K7QX2")  // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() != ROOM_CODE_LEN {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LEN} characters (got {})",
                code.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only A-Z and 0-9".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a display name: non-blank, at most 32 characters, no control characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_empty");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_NAME_CHARS {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Name is limited to {MAX_NAME_CHARS} characters").into());
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("name_format");
        err.message = Some("Name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_code_valid() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code("ZZZZZZ").is_ok());
        assert!(validate_room_code("000000").is_ok());
    }

    #[test]
    fn test_validate_room_code_invalid_length() {
        assert!(validate_room_code("ABC12").is_err());
        assert!(validate_room_code("ABC1234").is_err());
        assert!(validate_room_code("").is_err());
    }

    #[test]
    fn test_validate_room_code_invalid_format() {
        assert!(validate_room_code("abc123").is_err());
        assert!(validate_room_code("ABC-12").is_err());
        assert!(validate_room_code("ABC 12").is_err());
    }

    #[test]
    fn test_validate_player_name() {
        assert!(validate_player_name("Brave Otter").is_ok());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_player_name("tab\tname").is_err());
    }
}
