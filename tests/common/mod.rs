//! In-memory stand-in for the Redis broker, with scriptable server time,
//! publish acknowledgments and injectable I/O errors. The production service
//! ships against the same `Broker` trait, so every component under test runs
//! its real code path here.

#![allow(dead_code)]

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use cryptex::backend::{Broker, BrokerError, BrokerTime, Subscription};

/// Scripted outcome for a single publish call.
pub enum PublishOutcome {
  /// acknowledge the broadcast with this many receivers
  Received(i64),
  /// fail the call with an injected broker error
  Error,
}

/// A `Broker` backed by in-process queues.
pub struct MockBroker {
  queue: Mutex<VecDeque<Vec<u8>>>,
  subscribers: Mutex<HashMap<String, Vec<Sender<Vec<u8>>>>>,
  time: Mutex<BrokerTime>,
  publish_script: Mutex<VecDeque<PublishOutcome>>,
  publish_log: Mutex<Vec<String>>,
  pop_calls: AtomicUsize,
  fail_pops: AtomicUsize,
  ping_ok: AtomicBool,
}

impl MockBroker {
  pub fn new() -> MockBroker {
    MockBroker {
      queue: Mutex::new(VecDeque::new()),
      subscribers: Mutex::new(HashMap::new()),
      time: Mutex::new(BrokerTime { seconds: 1_700_000_000, nanos: 0 }),
      publish_script: Mutex::new(VecDeque::new()),
      publish_log: Mutex::new(Vec::new()),
      pop_calls: AtomicUsize::new(0),
      fail_pops: AtomicUsize::new(0),
      ping_ok: AtomicBool::new(true),
    }
  }

  /// Sets the timestamp the mock reports as the broker's server time.
  pub fn set_time(&self, seconds: i64, nanos: i64) {
    *self.time.lock().unwrap() = BrokerTime { seconds, nanos };
  }

  /// The reported server time, for computing deadlines in tests.
  pub fn time(&self) -> BrokerTime { *self.time.lock().unwrap() }

  /// Scripts the outcomes of upcoming publish calls. Once the script is
  /// exhausted, publishes deliver to real subscribers again.
  pub fn script_publish<I: IntoIterator<Item = PublishOutcome>>(&self, outcomes: I) {
    self.publish_script.lock().unwrap().extend(outcomes);
  }

  /// Channels of every publish call seen so far, in order.
  pub fn publish_log(&self) -> Vec<String> { self.publish_log.lock().unwrap().clone() }

  /// Makes the next `count` queue pops fail with an I/O error.
  pub fn fail_next_pops(&self, count: usize) {
    self.fail_pops.store(count, Ordering::SeqCst);
  }

  /// Makes liveness probes succeed or fail.
  pub fn set_ping_ok(&self, ok: bool) { self.ping_ok.store(ok, Ordering::SeqCst) }

  /// How many queue pops have been issued.
  pub fn pop_calls(&self) -> usize { self.pop_calls.load(Ordering::SeqCst) }

  /// How many jobs are still queued.
  pub fn queue_len(&self) -> usize { self.queue.lock().unwrap().len() }

  /// Whether anyone currently subscribes to `channel`.
  pub fn has_subscriber(&self, channel: &str) -> bool {
    self
      .subscribers
      .lock()
      .unwrap()
      .get(channel)
      .map(|senders| !senders.is_empty())
      .unwrap_or(false)
  }

  fn injected_error(context: &str) -> BrokerError {
    BrokerError::Redis(io::Error::new(io::ErrorKind::BrokenPipe, context.to_string()).into())
  }
}

impl Broker for MockBroker {
  fn ping(&self) -> Result<(), BrokerError> {
    if self.ping_ok.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(MockBroker::injected_error("ping refused"))
    }
  }

  fn pop_job(&self, _timeout: usize) -> Result<Option<Vec<u8>>, BrokerError> {
    self.pop_calls.fetch_add(1, Ordering::SeqCst);
    let remaining = self.fail_pops.load(Ordering::SeqCst);
    if remaining > 0 {
      self.fail_pops.store(remaining - 1, Ordering::SeqCst);
      return Err(MockBroker::injected_error("pop failed"));
    }
    let popped = self.queue.lock().unwrap().pop_front();
    if popped.is_none() {
      // Keep the fetch loop from spinning hot against an empty mock queue
      thread::sleep(Duration::from_millis(1));
    }
    Ok(popped)
  }

  fn push_job(&self, payload: &[u8]) -> Result<(), BrokerError> {
    self.queue.lock().unwrap().push_back(payload.to_vec());
    Ok(())
  }

  fn server_time(&self) -> Result<BrokerTime, BrokerError> { Ok(self.time()) }

  fn publish(&self, channel: &str, payload: &[u8]) -> Result<i64, BrokerError> {
    self.publish_log.lock().unwrap().push(channel.to_string());
    if let Some(outcome) = self.publish_script.lock().unwrap().pop_front() {
      return match outcome {
        PublishOutcome::Received(count) => Ok(count),
        PublishOutcome::Error => Err(MockBroker::injected_error("publish failed")),
      };
    }
    let mut subscribers = self.subscribers.lock().unwrap();
    let mut received_by = 0;
    if let Some(senders) = subscribers.get_mut(channel) {
      senders.retain(|sender| {
        if sender.send(payload.to_vec()).is_ok() {
          received_by += 1;
          true
        } else {
          false
        }
      });
    }
    Ok(received_by)
  }

  fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BrokerError> {
    let (tx, rx) = unbounded();
    self
      .subscribers
      .lock()
      .unwrap()
      .entry(channel.to_string())
      .or_insert_with(Vec::new)
      .push(tx);
    Ok(Box::new(MockSubscription { rx }))
  }
}

struct MockSubscription {
  rx: Receiver<Vec<u8>>,
}

impl Subscription for MockSubscription {
  fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, BrokerError> {
    match self.rx.recv_timeout(timeout) {
      Ok(payload) => Ok(payload),
      Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
        Err(BrokerError::Timeout)
      },
    }
  }
}
