// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! A distributed password hashing service, offloading bcrypt work from client
//! processes to a pool of remote agents via a shared Redis broker.
//!
//! The agent side pulls jobs from a shared queue (`dispatcher`), executes them
//! on a fixed-size worker pool (`worker`) and broadcasts each result on a
//! per-job response channel (`dispatcher::sink`). The client side
//! (`client::RemoteHasher`) enqueues a job and blocks for the correlated
//! response. A purely local variant (`local::LocalHasher`) is provided for
//! deployments without a broker.

#![deny(missing_docs)]

pub mod backend;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod helpers;
pub mod local;
pub mod models;
pub mod password;
pub mod worker;

use thiserror::Error;

use crate::backend::BrokerError;

/// The common interface of the local and remote hashers.
pub trait PasswordHasher {
  /// Returns a hash of the provided password, for storage in a database.
  fn hash_password(&self, password: &str) -> Result<String, HasherError>;
  /// Takes a password and the stored hash, and returns whether the password is
  /// valid.
  fn validate_password(&self, password: &str, hash: &str) -> Result<bool, HasherError>;
}

/// Errors surfaced to callers of a `PasswordHasher`
#[derive(Debug, Error)]
pub enum HasherError {
  /// the requested work factor is outside the allowed bcrypt range
  #[error("cost of {0} is invalid - cost must be between 4 and 31")]
  InvalidCost(u32),
  /// an empty password was provided
  #[error("password cannot be empty")]
  EmptyPassword,
  /// a broker round trip failed, or no response arrived before the deadline
  #[error("broker error: {0}")]
  Broker(#[from] BrokerError),
  /// a job could not be encoded for transmission
  #[error("failed to encode job: {0}")]
  Encode(#[from] prost::EncodeError),
  /// an agent response could not be decoded
  #[error("failed to decode response from agent: {0}")]
  Decode(#[from] prost::DecodeError),
  /// the hashing primitive rejected its input
  #[error("bcrypt error: {0}")]
  Primitive(#[from] bcrypt::BcryptError),
}
