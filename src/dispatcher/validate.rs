//! Pure validation predicate for inbound jobs. Safe to call concurrently;
//! no I/O and no shared state.

use thiserror::Error;

use crate::config::{MAX_COST, MIN_COST, MIN_RESPONSE_KEY_LENGTH};
use crate::models::{Job, JobKind};

/// The first constraint a rejected job violated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  /// the kind field is not one of the recognized operations
  #[error("invalid job kind provided - should be either HASHPASSWORD or VERIFYPASSWORD but received invalid int instead: {0}")]
  UnknownKind(i32),
  /// the response key is shorter than the enforced minimum
  #[error("response key is too short - should be 16 characters at a minimum, but provided key had a length of {0}")]
  ShortResponseKey(usize),
  /// the password field is empty
  #[error("password field is empty")]
  EmptyPassword,
  /// the cost is outside the admissible bcrypt range
  #[error("invalid cost provided - cost must be between 4 and 31, but cost of {0} was provided")]
  CostOutOfRange(i32),
  /// the hash field is empty on a verification job
  #[error("hash field is empty")]
  EmptyHash,
}

/// Checks a decoded job against the schema and business constraints, in
/// order, returning the first violation. Jobs that fail validation are
/// dropped by the dispatcher; the producer's own round-trip timeout is the
/// recovery mechanism.
pub fn validate_job(job: &Job) -> Result<(), ValidationError> {
  let kind = match JobKind::from_i32(job.kind) {
    Some(kind) => kind,
    None => return Err(ValidationError::UnknownKind(job.kind)),
  };

  // Input validation for all job kinds
  if job.response_key.len() < MIN_RESPONSE_KEY_LENGTH {
    return Err(ValidationError::ShortResponseKey(job.response_key.len()));
  }
  if job.password.is_empty() {
    return Err(ValidationError::EmptyPassword);
  }

  // Kind-specific validation
  match kind {
    JobKind::HashPassword => {
      if job.cost < MIN_COST as i32 || job.cost > MAX_COST as i32 {
        return Err(ValidationError::CostOutOfRange(job.cost));
      }
    },
    JobKind::VerifyPassword => {
      if job.hash.is_empty() {
        return Err(ValidationError::EmptyHash);
      }
    },
  }
  Ok(())
}
