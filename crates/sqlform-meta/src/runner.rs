//! The validation runner.
//!
//! A generic accumulator over an ordered validator list. Every validator
//! always runs, so one pass surfaces every problem; failures merge into the
//! nested per-field structure, with flat failures landing in the non-field
//! bucket.

use std::collections::BTreeMap;

use sqlform_core::error::{ValidationError, ValidationErrors};
use sqlform_core::validators::Validator;

/// Runs an ordered validator list against a target, accumulating failures.
#[derive(Debug)]
pub struct ValidationRunner<T> {
    validators: Vec<Validator<T>>,
    errors: ValidationErrors,
}

impl<T> ValidationRunner<T> {
    /// Create a runner with no validators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
            errors: ValidationErrors::new(),
        }
    }

    /// Create a runner over an ordered validator list.
    #[must_use]
    pub fn with_validators(validators: Vec<Validator<T>>) -> Self {
        Self {
            validators,
            errors: ValidationErrors::new(),
        }
    }

    /// Append a validator to the end of the list.
    pub fn add(&mut self, validator: Validator<T>) {
        self.validators.push(validator);
    }

    /// Run every validator against the target.
    ///
    /// Never stops at the first failure. Nested failures merge under their
    /// field keys; flat failures accumulate in the non-field bucket. Returns
    /// whether the accumulator is still empty afterwards.
    pub fn is_valid(&mut self, target: &T) -> bool {
        for validator in &self.validators {
            if let Err(err) = validator.check(target) {
                tracing::debug!(validator = validator.name(), "Validator failed");
                self.errors.extend(err);
            }
        }
        self.errors.is_empty()
    }

    /// The accumulated failures so far, keyed by field name.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, ValidationError> {
        self.errors.errors()
    }

    /// Run every validator and raise the aggregated tree on failure.
    pub fn validate(mut self, target: &T) -> Result<(), ValidationError> {
        self.is_valid(target);
        self.errors.result()
    }
}

impl<T> Default for ValidationRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}
