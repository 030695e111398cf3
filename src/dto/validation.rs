//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum nickname length in characters.
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Validates that a nickname is non-blank and at most 20 characters once
/// trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_nickname("smash_bro")          // Ok
/// validate_nickname("   ")                // Err - blank
/// validate_nickname(&"x".repeat(21))      // Err - too long
/// ```
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("nickname_blank");
        err.message = Some("Nickname must not be blank".into());
        return Err(err);
    }

    let chars = trimmed.chars().count();
    if chars > NICKNAME_MAX_CHARS {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some(
            format!(
                "Nickname must be at most {NICKNAME_MAX_CHARS} characters (got {chars})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_nickname_valid() {
        assert!(validate_nickname("smash_bro").is_ok());
        assert!(validate_nickname("  padded  ").is_ok());
        assert!(validate_nickname(&"x".repeat(20)).is_ok());
    }

    #[test]
    fn test_validate_nickname_blank() {
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("   ").is_err());
        assert!(validate_nickname("\t\n").is_err());
    }

    #[test]
    fn test_validate_nickname_too_long() {
        assert!(validate_nickname(&"x".repeat(21)).is_err());
        // Trimming happens before counting.
        assert!(validate_nickname(&format!("  {}  ", "x".repeat(20))).is_ok());
    }
}
