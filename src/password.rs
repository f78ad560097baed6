// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Wrappers around the costed hash primitive.
//!
//! Passwords are SHA-512 encoded before they reach bcrypt, which keeps
//! arbitrary-length inputs inside bcrypt's 72-byte limit. Hashes use the unix
//! "$2b" encoding.

use bcrypt::BcryptError;
use sha2::{Digest, Sha512};

/// SHA-512 encodes a password for transmission and hashing.
pub fn encode_password(password: &str) -> Vec<u8> {
  Sha512::digest(password.as_bytes()).to_vec()
}

/// Hashes an encoded password using the specified cost.
pub fn hash_password(password: &[u8], cost: u32) -> String {
  match bcrypt::hash(password, cost) {
    Ok(hash) => hash,
    // Bcrypt only fails if something went very wrong, like OOM or a cost
    // outside the allowed range. Invalid costs are caught by validation, so a
    // failure here signals a broken primitive and takes the worker down with
    // it rather than being silently retried.
    Err(e) => panic!("bcrypt failure for a validated cost of {}: {}", cost, e),
  }
}

/// Takes a stored hash and an encoded password, and returns whether the
/// password is valid. A mismatch is a regular `false` outcome; only a
/// malformed hash or a primitive failure produces an error.
pub fn validate_password(password: &[u8], hash: &str) -> Result<bool, BcryptError> {
  bcrypt::verify(password, hash)
}
