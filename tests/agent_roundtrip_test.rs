// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use common::MockBroker;
use cryptex::backend::Broker;
use cryptex::client::RemoteHasher;
use cryptex::dispatcher::manager::AgentManager;
use cryptex::helpers;
use cryptex::password;
use cryptex::PasswordHasher;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn test_manager(broker: &Arc<MockBroker>) -> AgentManager {
  AgentManager {
    backend: Arc::clone(broker) as Arc<dyn Broker>,
    threads: 2,
    durable: false,
    queue_size: 1,
    pop_timeout: 1,
    publish_attempts: 5,
    retry_time: Duration::from_millis(1),
  }
}

#[test]
fn mock_round_trip() {
  // Boot a full agent (ventilator + two workers) against the mock broker
  let broker = Arc::new(MockBroker::new());
  let (canceller, cancel) = helpers::cancel_pair();
  let manager = test_manager(&broker);
  let manager_thread = thread::spawn(move || manager.start(cancel));

  // Hash a password remotely, at the cheapest cost to keep the test fast
  let hasher =
    RemoteHasher::new(4, Duration::from_secs(5), Arc::clone(&broker) as Arc<dyn Broker>).unwrap();
  let hash = hasher.hash_password("abc").unwrap();

  // The published hash verifies against the submitted password with the same
  // comparison primitive the workers use
  let encoded = password::encode_password("abc");
  assert!(password::validate_password(&encoded, &hash).unwrap());

  // And the remote verification path agrees, both ways
  assert!(hasher.validate_password("abc", &hash).unwrap());
  assert!(!hasher.validate_password("not abc", &hash).unwrap());

  // Cooperative shutdown: the stream closes and every thread drains promptly
  canceller.cancel();
  let verdict = manager_thread.join().unwrap();
  assert!(verdict.is_ok());
}

#[test]
fn several_outstanding_jobs_resolve_to_their_own_callers() {
  let broker = Arc::new(MockBroker::new());
  let (canceller, cancel) = helpers::cancel_pair();
  let manager = test_manager(&broker);
  let manager_thread = thread::spawn(move || manager.start(cancel));

  let mut submitters = Vec::new();
  for password_text in vec!["first secret", "second secret", "third secret"] {
    let submitter_broker = Arc::clone(&broker);
    submitters.push(thread::spawn(move || {
      let hasher =
        RemoteHasher::new(4, Duration::from_secs(5), submitter_broker as Arc<dyn Broker>).unwrap();
      let hash = hasher.hash_password(password_text).unwrap();
      (password_text.to_string(), hash)
    }));
  }

  for submitter in submitters {
    let (password_text, hash) = submitter.join().unwrap();
    let encoded = password::encode_password(&password_text);
    assert!(password::validate_password(&encoded, &hash).unwrap());
  }

  canceller.cancel();
  assert!(manager_thread.join().unwrap().is_ok());
}
