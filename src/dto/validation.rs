//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted pool title, in characters.
pub const MAX_TITLE_CHARS: usize = 256;
/// Longest accepted team code, in characters.
pub const MAX_TEAM_CHARS: usize = 128;

/// Validates that a pool title holds 1 to 256 characters once trimmed.
///
/// ```ignore
/// validate_title("Office pool") // Ok
/// validate_title("   ")         // Err - blank
/// ```
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    validate_trimmed_length(title, MAX_TITLE_CHARS, "title")
}

/// Validates that a team code holds 1 to 128 characters once trimmed.
pub fn validate_team_code(team: &str) -> Result<(), ValidationError> {
    validate_trimmed_length(team, MAX_TEAM_CHARS, "team")
}

fn validate_trimmed_length(
    value: &str,
    max_chars: usize,
    code: &'static str,
) -> Result<(), ValidationError> {
    let chars = value.trim().chars().count();
    if chars == 0 {
        let mut err = ValidationError::new(code);
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    if chars > max_chars {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("must be at most {max_chars} characters (got {chars})").into());
        return Err(err);
    }
    Ok(())
}
