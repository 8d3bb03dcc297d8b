//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects text that is empty or made only of whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_non_blank("Name a fruit") // Ok
/// validate_non_blank("   ")          // Err
/// ```
pub fn validate_non_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Text must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Answer ranks start at 1.
pub fn validate_rank(rank: i32) -> Result<(), ValidationError> {
    if rank < 1 {
        let mut err = ValidationError::new("rank_range");
        err.message = Some(format!("Rank must be at least 1 (got {rank})").into());
        return Err(err);
    }
    Ok(())
}
