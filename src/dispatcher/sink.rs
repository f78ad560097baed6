//! Best-effort response publisher.
//!
//! Delivery uses a fire-and-forget broadcast channel rather than a durable
//! reply queue, so a response only lands if the subscriber is already
//! listening when a publish attempt goes out. The bounded retry loop exists
//! to straddle the race between "worker finishes first" and "client
//! subscribes first"; exhausting it drops the response, and the caller's
//! round-trip timeout is the only remaining signal.

use log::{error, warn};
use prost::Message;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::backend::Broker;
use crate::config::{ERROR_RETRY_TIME, PUBLISH_ATTEMPTS, RESPONSE_KEY_PREFIX};
use crate::models::Response;

/// Publisher for completed job responses
#[derive(Clone)]
pub struct Sink {
  /// broker access
  pub backend: Arc<dyn Broker>,
  /// maximum number of broadcast attempts per response
  pub attempts: usize,
  /// pause between attempts that reached no receiver
  pub retry_time: Duration,
}

impl Sink {
  /// A sink with the stock attempt count and retry interval.
  pub fn new(backend: Arc<dyn Broker>) -> Sink {
    Sink {
      backend,
      attempts: PUBLISH_ATTEMPTS,
      retry_time: ERROR_RETRY_TIME,
    }
  }

  /// Publishes a response on the channel addressed by `response_key`.
  /// Best-effort: every failure is logged rather than returned, since the
  /// worker has no one left to report to.
  pub fn publish(&self, response: &Response, response_key: &str) {
    let mut payload = Vec::with_capacity(response.encoded_len());
    // Encoding into a fresh Vec can not run out of space, but check it for
    // safety anyway.
    if let Err(e) = response.encode(&mut payload) {
      error!("Error publishing response \"{}\": failed to encode response: {}", response_key, e);
      return;
    }
    let channel = format!("{}{}", RESPONSE_KEY_PREFIX, response_key);

    for attempt in 1..=self.attempts {
      match self.backend.publish(&channel, &payload) {
        Err(e) => {
          error!("Error publishing response \"{}\": broker error when publishing: {}", response_key, e);
          continue;
        },
        Ok(0) => {
          warn!(
            "Published response \"{}\" wasn't received by any clients. Attempt {} of {}.",
            response_key, attempt, self.attempts
          );
          thread::sleep(self.retry_time);
          continue;
        },
        Ok(_received_by) => return,
      }
    }
    error!(
      "Unable to successfully publish response \"{}\" after {} attempt(s). Giving up.",
      response_key, self.attempts
    );
  }
}
