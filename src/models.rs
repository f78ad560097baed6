// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire entities exchanged through the broker, serialized with a fixed
//! field-tagged binary schema. A `Job` is built once by the submitting client
//! and never mutated; a `Response` is built by a worker and consumed by the
//! single subscriber listening on the job's response channel.

/// The two recognized job operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum JobKind {
  /// hash the provided password with the requested cost
  HashPassword = 0,
  /// compare the provided password against the provided hash
  VerifyPassword = 1,
}

/// A unit of hashing or verification work submitted for remote execution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Job {
  /// operation selector; raw int on the wire, interpreted via `JobKind::from_i32`
  #[prost(enumeration = "JobKind", tag = "1")]
  pub kind: i32,
  /// correlation key addressing the response channel for this job
  #[prost(string, tag = "2")]
  pub response_key: String,
  /// SHA-512 encoded password bytes
  #[prost(bytes = "vec", tag = "3")]
  pub password: Vec<u8>,
  /// stored hash to compare against, only meaningful for `VerifyPassword`
  #[prost(string, tag = "4")]
  pub hash: String,
  /// bcrypt work factor, only meaningful for `HashPassword`
  #[prost(int32, tag = "5")]
  pub cost: i32,
  /// deadline in nanoseconds since the Unix epoch, in the broker's own clock
  /// domain so that staleness checks do not depend on client/agent clock skew
  #[prost(int64, tag = "6")]
  pub expiry_timestamp: i64,
}

/// The outcome of a single `Job`; exactly one field is semantically populated,
/// depending on the originating job's kind.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
  /// the produced hash, for `HashPassword` jobs
  #[prost(string, tag = "1")]
  pub hash: String,
  /// whether the password matched, for `VerifyPassword` jobs
  #[prost(bool, tag = "2")]
  pub is_valid: bool,
}
