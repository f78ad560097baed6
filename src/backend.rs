// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Access layer for the shared Redis broker, which serves as both the job
//! queue and the response broadcast medium.
//!
//! All broker traffic goes through the narrow [`Broker`] capability trait, so
//! that the dispatcher, workers and clients can be driven by an in-memory
//! test double without a live server. Connections are obtained per operation
//! and released when the operation completes; no component holds a connection
//! across a suspension point other than its own blocking call.

use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, CONNECTION_TIMEOUT, REQUEST_QUEUE_KEY};

/// Errors raised by broker round trips
#[derive(Debug, Error)]
pub enum BrokerError {
  /// the underlying Redis operation failed
  #[error("redis error: {0}")]
  Redis(#[from] redis::RedisError),
  /// no message arrived on a subscription before its deadline
  #[error("timed out waiting for a message from the broker")]
  Timeout,
  /// the broker answered with something other than the expected reply
  #[error("unexpected reply from the broker: {0}")]
  UnexpectedReply(String),
}

/// A server timestamp as reported by the broker's time query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrokerTime {
  /// whole seconds since the Unix epoch
  pub seconds: i64,
  /// sub-second remainder in nanoseconds
  pub nanos: i64,
}

impl BrokerTime {
  /// The timestamp as nanoseconds since the Unix epoch, the clock domain used
  /// for job deadlines.
  pub fn unix_nanos(&self) -> i64 { self.seconds * 1_000_000_000 + self.nanos }
}

/// The broker commands the service relies on.
pub trait Broker: Send + Sync {
  /// Liveness probe.
  fn ping(&self) -> Result<(), BrokerError>;
  /// Blocking pop from the shared job queue, bounded by `timeout` seconds.
  /// Returns `None` when the wait expired with an empty queue.
  fn pop_job(&self, timeout: usize) -> Result<Option<Vec<u8>>, BrokerError>;
  /// Push a serialized job onto the shared queue.
  fn push_job(&self, payload: &[u8]) -> Result<(), BrokerError>;
  /// The broker's current server time.
  fn server_time(&self) -> Result<BrokerTime, BrokerError>;
  /// Broadcast a payload on `channel`, returning the number of receivers.
  fn publish(&self, channel: &str, payload: &[u8]) -> Result<i64, BrokerError>;
  /// Enter subscriber mode on `channel`. The returned subscription holds its
  /// connection until dropped.
  fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BrokerError>;
}

/// A single-channel subscription, consumed by one blocking receive.
pub trait Subscription: Send {
  /// Block until a message arrives on the subscribed channel, up to `timeout`.
  fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, BrokerError>;
}

/// The production `Broker`, backed by a Redis server.
pub struct Backend {
  client: redis::Client,
}

/// Constructs a `Backend` from the service configuration.
pub fn from_config(config: &Config) -> Result<Backend, BrokerError> {
  from_address(&config.redis_url())
}

/// Constructs a `Backend` for a given Redis connection URL.
pub fn from_address(address: &str) -> Result<Backend, BrokerError> {
  let client = redis::Client::open(address)?;
  Ok(Backend { client })
}

impl Backend {
  /// Opens a fresh connection with the configured I/O timeouts applied.
  fn connection(&self) -> Result<redis::Connection, BrokerError> {
    let conn = self.client.get_connection()?;
    conn.set_read_timeout(Some(CONNECTION_TIMEOUT))?;
    conn.set_write_timeout(Some(CONNECTION_TIMEOUT))?;
    Ok(conn)
  }
}

impl Broker for Backend {
  fn ping(&self) -> Result<(), BrokerError> {
    let mut conn = self.connection()?;
    let reply: String = redis::cmd("PING").query(&mut conn)?;
    if reply != "PONG" {
      return Err(BrokerError::UnexpectedReply(reply));
    }
    Ok(())
  }

  fn pop_job(&self, timeout: usize) -> Result<Option<Vec<u8>>, BrokerError> {
    let mut conn = self.connection()?;
    let reply: Option<(String, Vec<u8>)> = redis::cmd("BRPOP")
      .arg(REQUEST_QUEUE_KEY)
      .arg(timeout)
      .query(&mut conn)?;
    Ok(reply.map(|(_key, payload)| payload))
  }

  fn push_job(&self, payload: &[u8]) -> Result<(), BrokerError> {
    let mut conn = self.connection()?;
    redis::cmd("LPUSH")
      .arg(REQUEST_QUEUE_KEY)
      .arg(payload)
      .query::<()>(&mut conn)?;
    Ok(())
  }

  fn server_time(&self) -> Result<BrokerTime, BrokerError> {
    let mut conn = self.connection()?;
    let (seconds, nanos): (i64, i64) = redis::cmd("TIME").query(&mut conn)?;
    Ok(BrokerTime { seconds, nanos })
  }

  fn publish(&self, channel: &str, payload: &[u8]) -> Result<i64, BrokerError> {
    let mut conn = self.connection()?;
    let received_by: i64 = redis::cmd("PUBLISH").arg(channel).arg(payload).query(&mut conn)?;
    Ok(received_by)
  }

  fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BrokerError> {
    let mut conn = self.connection()?;
    let mut pubsub = conn.as_pubsub();
    pubsub.subscribe(channel)?;
    // The PubSub guard unsubscribes when dropped, but this subscription must
    // outlive the call so the response can not race past us. Forget the guard
    // and keep the raw connection in subscriber mode instead.
    std::mem::forget(pubsub);
    Ok(Box::new(RedisSubscription { conn }))
  }
}

/// Subscription over a dedicated Redis connection in subscriber mode.
struct RedisSubscription {
  conn: redis::Connection,
}

impl Subscription for RedisSubscription {
  fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, BrokerError> {
    let mut pubsub = self.conn.as_pubsub();
    pubsub.set_read_timeout(Some(timeout))?;
    match pubsub.get_message() {
      Ok(message) => Ok(message.get_payload()?),
      // A read deadline and a transport failure both end the wait; the caller
      // can not distinguish them and does not need to.
      Err(e) if e.is_io_error() => Err(BrokerError::Timeout),
      Err(e) => Err(e.into()),
    }
    // Dropping the PubSub guard unsubscribes and releases the connection.
  }
}
