// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Fixed-size pool of worker threads executing dispatched jobs.
//!
//! Each worker pulls from the shared dispatch stream, invokes the hash
//! primitive and hands the result to the sink. Jobs may complete out of
//! order relative to enqueue order whenever more than one worker is running.

use crossbeam::channel::Receiver;
use crossbeam::select;
use log::{error, info};
use std::thread::{self, JoinHandle};

use crate::dispatcher::sink::Sink;
use crate::helpers::{self, CancelSignal};
use crate::models::{Job, JobKind, Response};
use crate::password;

/// Starts `count` workers consuming the dispatch stream. Workers terminate
/// when the stream closes or the cancellation signal fires, whichever comes
/// first.
pub fn start_many(
  jobs: Receiver<Job>,
  sink: Sink,
  count: usize,
  cancel: CancelSignal,
) -> Vec<JoinHandle<()>> {
  let mut handles = Vec::with_capacity(count);
  for _ in 0..count {
    let worker_jobs = jobs.clone();
    let worker_sink = sink.clone();
    let worker_cancel = cancel.clone();
    handles.push(thread::spawn(move || {
      work_loop(worker_jobs, worker_sink, worker_cancel)
    }));
  }
  info!("Started {} worker thread(s).", count);
  handles
}

fn work_loop(jobs: Receiver<Job>, sink: Sink, cancel: CancelSignal) {
  loop {
    // Checked separately so that cancellation takes priority over a job that
    // is simultaneously ready on the dispatch stream.
    if helpers::is_cancelled(&cancel) {
      return;
    }
    select! {
      recv(cancel) -> _ => return,
      recv(jobs) -> received => match received {
        Ok(job) => handle_job(job, &sink),
        // Stream closed by the ventilator
        Err(_) => return,
      },
    }
  }
}

fn handle_job(job: Job, sink: &Sink) {
  match JobKind::from_i32(job.kind) {
    Some(JobKind::HashPassword) => handle_hash_job(job, sink),
    Some(JobKind::VerifyPassword) => handle_verify_job(job, sink),
    // Screened by validation in the normal path; nothing to do if one slips
    // through.
    None => {},
  }
}

fn handle_hash_job(job: Job, sink: &Sink) {
  let hash = password::hash_password(&job.password, job.cost as u32);
  let response = Response { hash, is_valid: false };
  sink.publish(&response, &job.response_key);
}

fn handle_verify_job(job: Job, sink: &Sink) {
  match password::validate_password(&job.password, &job.hash) {
    Ok(is_valid) => {
      let response = Response { hash: String::new(), is_valid };
      sink.publish(&response, &job.response_key);
    },
    Err(e) => {
      error!(
        "Error when validating password for response key \"{}\": {}",
        job.response_key, e
      );
    },
  }
}
