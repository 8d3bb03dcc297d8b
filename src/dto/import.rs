//! Bulk import batch and its report.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::validation::{validate_non_blank, validate_rank};

/// Answer line of an imported question.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ImportAnswer {
    #[validate(custom(function = "validate_non_blank"))]
    pub text: String,
    /// Popularity rank.
    #[validate(custom(function = "validate_rank"))]
    pub order: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ImportQuestion {
    #[validate(custom(function = "validate_non_blank"))]
    pub text: String,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<ImportAnswer>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ImportRound {
    #[validate(custom(function = "validate_non_blank"))]
    pub round_name: String,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<ImportQuestion>,
}

/// Ordered list of rounds, sent as a top-level JSON array.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ImportBatch(pub Vec<ImportRound>);

impl Validate for ImportBatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("empty_batch");
            err.message = Some("Import batch must contain at least one round".into());
            errors.add("rounds", err);
            return Err(errors);
        }

        for round in &self.0 {
            round.validate()?;
        }
        Ok(())
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportReport {
    /// Rounds fully written before processing stopped.
    pub rounds_committed: usize,
    /// Round that was being written when a failure stopped the import.
    pub failed_round: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_parses_from_a_top_level_array() {
        let batch: ImportBatch = serde_json::from_str(
            r#"[{"round_name":"Warmup","questions":[{"text":"Name a color","answers":[{"text":"Red","order":1}]}]}]"#,
        )
        .unwrap();
        assert_eq!(batch.0.len(), 1);
        assert_eq!(batch.0[0].questions[0].answers[0].order, 1);
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn nested_errors_fail_the_whole_batch() {
        let batch: ImportBatch = serde_json::from_str(
            r#"[{"round_name":"Ok","questions":[]},{"round_name":"Bad","questions":[{"text":"Q","answers":[{"text":"","order":1}]}]}]"#,
        )
        .unwrap();
        assert!(batch.validate().is_err());
        assert!(ImportBatch(Vec::new()).validate().is_err());
    }
}
