// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;
use std::io;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use crate::backend::Broker;
use crate::config::{Config, ERROR_RETRY_TIME, POP_TIMEOUT, PUBLISH_ATTEMPTS};
use crate::dispatcher::sink::Sink;
use crate::dispatcher::ventilator::Ventilator;
use crate::helpers::CancelSignal;
use crate::worker;

/// Manager struct responsible for wiring the job fetch loop to the worker
/// pool and supervising both until shutdown
pub struct AgentManager {
  /// broker access, shared by the ventilator, workers and sink
  pub backend: Arc<dyn Broker>,
  /// number of worker threads to start
  pub threads: usize,
  /// tolerate startup connectivity failure and retry indefinitely
  pub durable: bool,
  /// capacity of the internal dispatch channel
  pub queue_size: usize,
  /// bound in seconds for each blocking queue pop
  pub pop_timeout: usize,
  /// maximum broadcast attempts per response
  pub publish_attempts: usize,
  /// fixed backoff for broker errors and unreceived publishes
  pub retry_time: Duration,
}

impl AgentManager {
  /// A manager configured from the environment-sourced service config.
  pub fn from_config(config: &Config, backend: Arc<dyn Broker>) -> AgentManager {
    AgentManager {
      backend,
      threads: config.threads,
      durable: config.durable,
      queue_size: 1,
      pop_timeout: POP_TIMEOUT,
      publish_attempts: PUBLISH_ATTEMPTS,
      retry_time: ERROR_RETRY_TIME,
    }
  }

  /// Starts the ventilator and worker threads, then blocks until every one
  /// of them has terminated. Under normal operation that only happens after
  /// the cancellation signal fires; a worker dying any other way is a broken
  /// primitive and surfaces as an error.
  pub fn start(&self, cancel: CancelSignal) -> Result<(), Box<dyn Error + Send + Sync>> {
    let ventilator = Ventilator {
      backend: Arc::clone(&self.backend),
      durable: self.durable,
      queue_size: self.queue_size,
      pop_timeout: self.pop_timeout,
      error_retry: self.retry_time,
    };
    let (jobs, vent_thread) = ventilator.start(cancel.clone())?;

    let sink = Sink {
      backend: Arc::clone(&self.backend),
      attempts: self.publish_attempts,
      retry_time: self.retry_time,
    };
    let worker_threads = worker::start_many(jobs, sink, self.threads, cancel);

    let mut dead_threads = 0;
    if vent_thread.join().is_err() {
      error!("Ventilator thread died unexpectedly!");
      dead_threads += 1;
    }
    for worker_thread in worker_threads {
      if worker_thread.join().is_err() {
        error!("Worker thread died unexpectedly!");
        dead_threads += 1;
      }
    }

    if dead_threads > 0 {
      Err(Box::new(io::Error::new(
        ErrorKind::Other,
        format!("{} agent thread(s) died unexpectedly", dead_threads),
      )))
    } else {
      info!("Agent manager successfully terminated.");
      Ok(())
    }
  }
}
