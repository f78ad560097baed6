// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! In-process `PasswordHasher`, for deployments without a broker. Same
//! SHA-512 + bcrypt pipeline as the remote agents, no coordination logic.

use crate::config::{MAX_COST, MIN_COST};
use crate::password;
use crate::{HasherError, PasswordHasher};

/// A stateless hasher performing all work on the calling thread.
pub struct LocalHasher {
  cost: u32,
}

impl LocalHasher {
  /// A local hasher with the given work factor. Validates the cost range.
  pub fn new(cost: u32) -> Result<LocalHasher, HasherError> {
    if cost < MIN_COST || cost > MAX_COST {
      return Err(HasherError::InvalidCost(cost));
    }
    Ok(LocalHasher { cost })
  }
}

impl PasswordHasher for LocalHasher {
  fn hash_password(&self, password: &str) -> Result<String, HasherError> {
    if password.is_empty() {
      return Err(HasherError::EmptyPassword);
    }
    let encoded = password::encode_password(password);
    // Unlike the remote agents, the local variant reports primitive failures
    // to its caller instead of treating them as fatal.
    Ok(bcrypt::hash(&encoded, self.cost)?)
  }

  fn validate_password(&self, password: &str, hash: &str) -> Result<bool, HasherError> {
    if password.is_empty() {
      return Err(HasherError::EmptyPassword);
    }
    let encoded = password::encode_password(password);
    Ok(bcrypt::verify(&encoded, hash)?)
  }
}
