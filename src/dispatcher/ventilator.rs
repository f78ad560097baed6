//! Fetch loop between the shared broker queue and the worker pool.
//!
//! A single thread repeatedly performs a bounded blocking pop, decodes and
//! validates the payload, discards jobs whose deadline already passed on the
//! broker's clock, and forwards survivors into a bounded dispatch channel
//! consumed by the workers. Transient broker errors are retried with a fixed
//! backoff and never surfaced past this component.

use crossbeam::channel::{bounded, Receiver};
use log::{error, info, warn};
use prost::Message;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{Broker, BrokerError};
use crate::dispatcher::validate::validate_job;
use crate::helpers::{self, CancelSignal};
use crate::models::Job;

/// Operation parameters for the job fetch loop
pub struct Ventilator {
  /// broker access
  pub backend: Arc<dyn Broker>,
  /// tolerate a failed startup probe and keep retrying instead of aborting
  pub durable: bool,
  /// capacity of the dispatch channel handing jobs to the workers
  pub queue_size: usize,
  /// bound in seconds for each blocking queue pop
  pub pop_timeout: usize,
  /// fixed backoff after a broker read error
  pub error_retry: Duration,
}

impl Ventilator {
  /// Probes the broker, then starts the fetch thread. Returns the dispatch
  /// stream and the thread handle; the stream closes when the fetch loop
  /// exits, which it does within one pop timeout of cancellation.
  pub fn start(&self, cancel: CancelSignal) -> Result<(Receiver<Job>, JoinHandle<()>), BrokerError> {
    if !self.durable {
      // Test the broker connection before going into the fetch loop
      self.backend.ping()?;
    }

    let (jobs_tx, jobs_rx) = bounded(self.queue_size);
    let backend = Arc::clone(&self.backend);
    let pop_timeout = self.pop_timeout;
    let error_retry = self.error_retry;

    let handle = thread::spawn(move || {
      info!("Ventilator thread started.");
      loop {
        if helpers::is_cancelled(&cancel) {
          // Dropping the sender closes the dispatch stream for the workers
          return;
        }

        let payload = match backend.pop_job(pop_timeout) {
          // Pop timed out with an empty queue, check cancellation and retry
          Ok(None) => continue,
          Ok(Some(payload)) => payload,
          Err(e) => {
            error!("Error receiving job from broker: {}", e);
            thread::sleep(error_retry);
            continue;
          },
        };

        // It is unclear how malformed a payload must be for decoding to fail,
        // but whatever produced it will not be helped by a crash here.
        let job = match Job::decode(payload.as_slice()) {
          Ok(job) => job,
          Err(e) => {
            warn!("Failed to decode job payload from broker: {}", e);
            continue;
          },
        };

        if let Err(e) = validate_job(&job) {
          warn!("Invalid job received: {}", e);
          continue;
        }

        // Staleness is judged on the broker's clock, the same domain the
        // client computed the deadline in.
        if let Ok(broker_time) = backend.server_time() {
          let lateness =
            (broker_time.unix_nanos() - job.expiry_timestamp) as f64 / 1_000_000_000.0;
          if lateness > 0.0 {
            warn!(
              "Expired job received with response key \"{}\". It was {:.3} seconds late.",
              job.response_key, lateness
            );
            continue;
          }
        }

        if jobs_tx.send(job).is_err() {
          // All workers are gone; nothing left to dispatch to
          return;
        }
      }
    });

    Ok((jobs_rx, handle))
  }
}
