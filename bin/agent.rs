// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! The cryptex agent daemon: pulls hashing jobs from the shared broker queue
//! and publishes responses until the process is terminated.

use std::io::Write;
use std::process;
use std::sync::Arc;

use chrono::{Local, Utc};
use log::{error, info, warn, LevelFilter};

use cryptex::backend::{self, Broker};
use cryptex::config::Config;
use cryptex::dispatcher::manager::AgentManager;
use cryptex::helpers;

fn main() {
  let config = match Config::from_env() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}", e);
      process::exit(1);
    },
  };
  init_logger(&config);

  let backend = match backend::from_config(&config) {
    Ok(backend) => backend,
    Err(e) => {
      error!("Invalid Redis configuration: {}", e);
      process::exit(1);
    },
  };
  let backend: Arc<dyn Broker> = Arc::new(backend);

  match backend.ping() {
    Ok(()) => info!("Redis Connection Established."),
    Err(e) if config.durable => {
      warn!("Redis connection not yet available, continuing in durable mode: {}", e);
    },
    Err(e) => {
      error!("Redis connection not properly established: {}", e);
      process::exit(1);
    },
  }

  // The daemon runs until killed; the canceller is held for the lifetime of
  // main so the signal never fires on its own.
  let (_canceller, cancel) = helpers::cancel_pair();
  let manager = AgentManager::from_config(&config, backend);
  if let Err(e) = manager.start(cancel) {
    error!("Agent manager failed: {}", e);
    process::exit(1);
  }
}

/// Logger honoring the `VERBOSE` and `UTC_LOGGING` configuration flags;
/// `RUST_LOG` still takes precedence for filtering when set.
fn init_logger(config: &Config) {
  let mut builder = env_logger::Builder::new();
  builder.filter_level(if config.verbose { LevelFilter::Debug } else { LevelFilter::Info });
  if config.utc_logging {
    builder.format(|buf, record| {
      writeln!(
        buf,
        "cryptex:{} [{}] {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S%.6f"),
        record.level(),
        record.args()
      )
    });
  } else {
    builder.format(|buf, record| {
      writeln!(
        buf,
        "cryptex:{} [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
        record.level(),
        record.args()
      )
    });
  }
  builder.parse_default_env();
  builder.init();
}
