//! Schema validation before commit
//!
//! A record is valid when it has a non-empty `title` and `location`.
//! Invalid records are dropped with a warning, unless their share of the
//! batch exceeds `max_invalid_fraction`, in which case the whole batch is
//! rejected and nothing is written.

use thiserror::Error;
use tracing::{debug, warn};
use woofya_common::types::CanonicalRecord;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{invalid} of {total} records failed validation (allowed fraction {threshold})")]
pub struct SchemaValidationError {
    pub invalid: usize,
    pub total: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub accepted: Vec<CanonicalRecord>,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    max_invalid_fraction: f64,
}

impl Validator {
    /// `max_invalid_fraction` is clamped to `0.0..=1.0`
    pub fn new(max_invalid_fraction: f64) -> Self {
        let max_invalid_fraction = if max_invalid_fraction.is_nan() {
            0.0
        } else {
            max_invalid_fraction.clamp(0.0, 1.0)
        };
        Self {
            max_invalid_fraction,
        }
    }

    pub fn max_invalid_fraction(&self) -> f64 {
        self.max_invalid_fraction
    }

    pub fn validate(
        &self,
        records: Vec<CanonicalRecord>,
    ) -> Result<ValidationOutcome, SchemaValidationError> {
        let total = records.len();
        if total == 0 {
            return Ok(ValidationOutcome::default());
        }

        let invalid = records
            .iter()
            .filter(|r| !r.missing_required().is_empty())
            .count();

        if invalid > 0 && invalid as f64 / total as f64 > self.max_invalid_fraction {
            warn!(
                invalid,
                total,
                threshold = self.max_invalid_fraction,
                "Batch rejected by schema validation"
            );
            return Err(SchemaValidationError {
                invalid,
                total,
                threshold: self.max_invalid_fraction,
            });
        }

        let mut accepted = Vec::with_capacity(total - invalid);
        for record in records {
            let missing = record.missing_required();
            if !missing.is_empty() {
                warn!(
                    title = %record.title,
                    source_ids = ?record.source_ids,
                    missing = ?missing,
                    "Dropping invalid record"
                );
                continue;
            }

            if record.date.is_none() || record.description.is_empty() || record.link.is_empty() {
                debug!(
                    title = %record.title,
                    has_date = record.date.is_some(),
                    has_description = !record.description.is_empty(),
                    has_link = !record.link.is_empty(),
                    "Record missing optional fields"
                );
            }
            accepted.push(record);
        }

        Ok(ValidationOutcome {
            accepted,
            dropped: invalid,
        })
    }
}
