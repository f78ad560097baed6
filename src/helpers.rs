// Copyright 2015-2020 Deyan Ginev. See the LICENSE
// file at the top-level directory of this distribution.
//
// Licensed under the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>.
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Cooperative cancellation shared by the dispatcher and the worker pool

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};

/// The receiving end of a cancellation signal. Clones observe the same
/// signal, so a single `Canceller` stops every thread holding one.
pub type CancelSignal = Receiver<()>;

/// Owning half of a cancellation signal. Cancellation fires when the
/// `Canceller` is dropped or `cancel` is called, whichever comes first.
pub struct Canceller {
  tx: Sender<()>,
}

impl Canceller {
  /// Fire the cancellation signal.
  pub fn cancel(self) { drop(self.tx) }
}

/// Creates a connected canceller/signal pair.
pub fn cancel_pair() -> (Canceller, CancelSignal) {
  let (tx, rx) = bounded(0);
  (Canceller { tx }, rx)
}

/// Whether the signal has fired. Does not block.
pub fn is_cancelled(signal: &CancelSignal) -> bool {
  match signal.try_recv() {
    Err(TryRecvError::Empty) => false,
    // A message or a dropped canceller both mean shutdown.
    _ => true,
  }
}
