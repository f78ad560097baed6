// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Protocol constants and the environment-sourced service configuration

use std::env;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Redis key used for the shared job queue.
pub const REQUEST_QUEUE_KEY: &str = "cryptex:RequestQueue";
/// Redis key prefix for response publishing; the full channel name is the
/// prefix followed by the job's response key.
pub const RESPONSE_KEY_PREFIX: &str = "cryptex:Response:";
/// How long to wait before retrying after a broker read error.
pub const ERROR_RETRY_TIME: Duration = Duration::from_secs(1);
/// Timeout for broker connections. Must be longer than `POP_TIMEOUT`.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout in seconds for the blocking queue pop. This could be arbitrarily
/// long, but it bounds how quickly the fetch loop observes cancellation, so 10
/// seconds is reasonable.
pub const POP_TIMEOUT: usize = 10;
/// Maximum number of times a response publish is retried. Some tests rely on
/// this being at least 3, so it should always be 3 or more.
pub const PUBLISH_ATTEMPTS: usize = 5;
/// Minimum length for a response key. 16 is a decent length to be relatively
/// sure there are no collisions, and is also the length of a UUID in binary
/// representation. Our client uses UUIDs with a timestamp which are well over
/// 40 characters, but there is no need to enforce that level of security on
/// the agent side.
pub const MIN_RESPONSE_KEY_LENGTH: usize = 16;
/// Minimum admissible bcrypt work factor.
pub const MIN_COST: u32 = 4;
/// Maximum admissible bcrypt work factor.
pub const MAX_COST: u32 = 31;

/// Service configuration, read once at startup and passed by reference into
/// each component constructor.
#[derive(Clone, Debug)]
pub struct Config {
  /// host and port of the Redis server
  pub redis_host: String,
  /// whether the Redis connection should use TLS
  pub redis_tls: bool,
  /// username for Redis auth, empty when auth is disabled
  pub redis_username: String,
  /// password for Redis auth
  pub redis_password: String,
  /// how many worker threads to start
  pub threads: usize,
  /// retry indefinitely on broker failures instead of exiting
  pub durable: bool,
  /// log at debug level rather than info
  pub verbose: bool,
  /// emit log timestamps in UTC rather than local time
  pub utc_logging: bool,
}

/// Configuration errors, fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
  /// the broker host is not configured
  #[error("No Redis host specified. Environment variable \"REDIS_HOST\" should be set.")]
  MissingRedisHost,
}

impl Config {
  /// Reads the environment (preferring a `cryptex.env` dotenv file when
  /// present) and initialises the service configuration.
  pub fn from_env() -> Result<Config, ConfigError> {
    if dotenv::from_filename("cryptex.env").is_err() {
      eprintln!("Failed to read cryptex.env. Falling back to environment variables.");
    }

    let redis_host = match env::var("REDIS_HOST") {
      Ok(host) if !host.is_empty() => host,
      _ => return Err(ConfigError::MissingRedisHost),
    };

    let redis_tls = env::var_os("REDIS_TLS").is_some();
    if !redis_tls {
      eprintln!("Warning: TLS not enabled. Remember to configure and use TLS for any production deployments!");
    }

    let redis_username = env::var("REDIS_USERNAME").unwrap_or_default();
    if redis_username.is_empty() {
      eprintln!(
        "Warning: Redis authentication not enabled. Remember to configure and use auth for any production deployments!"
      );
    }
    let redis_password = env::var("REDIS_PASSWORD").unwrap_or_default();

    let durable = env::var_os("DURABLE").is_some();
    let verbose = env::var_os("VERBOSE").is_some();
    let utc_logging = env::var_os("UTC_LOGGING").is_some();

    let threads = env::var("THREADS")
      .ok()
      .and_then(|raw| raw.parse::<usize>().ok())
      .filter(|count| *count > 0)
      .unwrap_or_else(default_thread_count);

    Ok(Config {
      redis_host,
      redis_tls,
      redis_username,
      redis_password,
      threads,
      durable,
      verbose,
      utc_logging,
    })
  }

  /// Connection URL for the Redis broker, honoring the TLS and auth settings.
  pub fn redis_url(&self) -> String {
    let scheme = if self.redis_tls { "rediss" } else { "redis" };
    let auth = if self.redis_username.is_empty() && self.redis_password.is_empty() {
      String::new()
    } else {
      format!("{}:{}@", self.redis_username, self.redis_password)
    };
    format!("{}://{}{}/", scheme, auth, self.redis_host)
  }
}

/// Default worker count, one thread per available processor.
pub fn default_thread_count() -> usize {
  thread::available_parallelism().map(|p| p.get()).unwrap_or(1)
}
