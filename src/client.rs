// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Client-side submission path for remote hashing jobs.
//!
//! Every call runs a two-phase protocol against the broker: subscribe to the
//! job's response channel first, then enqueue the job. Subscribing after the
//! enqueue would open a window in which a fast agent publishes a response no
//! one observes, so the ordering here is load-bearing.

use prost::Message;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::backend::Broker;
use crate::config::{MAX_COST, MIN_COST, RESPONSE_KEY_PREFIX};
use crate::models::{Job, JobKind, Response};
use crate::password;
use crate::{HasherError, PasswordHasher};

/// A `PasswordHasher` relying on a remote agent pool to perform the hashing.
pub struct RemoteHasher {
  cost: u32,
  timeout: Duration,
  backend: Arc<dyn Broker>,
}

impl RemoteHasher {
  /// A hasher submitting jobs at the given cost, abandoning any round trip
  /// that exceeds `timeout`. Validates the cost and probes the broker before
  /// returning.
  pub fn new(
    cost: u32,
    timeout: Duration,
    backend: Arc<dyn Broker>,
  ) -> Result<RemoteHasher, HasherError> {
    if cost < MIN_COST || cost > MAX_COST {
      return Err(HasherError::InvalidCost(cost));
    }
    backend.ping()?;
    Ok(RemoteHasher { cost, timeout, backend })
  }

  /// Deadline for a job submitted now, in the broker's own clock domain.
  fn expiry_timestamp(&self) -> Result<i64, HasherError> {
    let broker_time = self.backend.server_time()?;
    Ok(broker_time.unix_nanos() + self.timeout.as_nanos() as i64)
  }

  /// Runs the subscribe-then-send protocol for one job and blocks for the
  /// correlated response. The subscription is released on every exit path
  /// when it drops out of scope.
  fn submit(&self, job: &Job) -> Result<Response, HasherError> {
    let channel = format!("{}{}", RESPONSE_KEY_PREFIX, job.response_key);
    let mut subscription = self.backend.subscribe(&channel)?;

    let mut payload = Vec::with_capacity(job.encoded_len());
    job.encode(&mut payload)?;
    self.backend.push_job(&payload)?;

    let raw = subscription.receive(self.timeout)?;
    Ok(Response::decode(raw.as_slice())?)
  }
}

impl PasswordHasher for RemoteHasher {
  fn hash_password(&self, password: &str) -> Result<String, HasherError> {
    if password.is_empty() {
      return Err(HasherError::EmptyPassword);
    }
    let job = Job {
      kind: JobKind::HashPassword as i32,
      response_key: generate_response_key(),
      password: password::encode_password(password),
      hash: String::new(),
      cost: self.cost as i32,
      expiry_timestamp: self.expiry_timestamp()?,
    };
    let response = self.submit(&job)?;
    Ok(response.hash)
  }

  fn validate_password(&self, password: &str, hash: &str) -> Result<bool, HasherError> {
    if password.is_empty() {
      return Err(HasherError::EmptyPassword);
    }
    let job = Job {
      kind: JobKind::VerifyPassword as i32,
      response_key: generate_response_key(),
      password: password::encode_password(password),
      hash: hash.to_string(),
      cost: 0,
      expiry_timestamp: self.expiry_timestamp()?,
    };
    let response = self.submit(&job)?;
    Ok(response.is_valid)
  }
}

/// A globally-unique, unguessable correlation key: a random UUID joined with
/// a high-resolution local timestamp. Lives for one round trip only.
fn generate_response_key() -> String {
  let nanos = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_nanos())
    .unwrap_or_default();
  format!("{}-{}", Uuid::new_v4(), nanos)
}
