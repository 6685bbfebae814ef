//! Change notification fan-out
//!
//! Every layer keeps a list of caller-supplied signal channels. A change
//! triggers one non-blocking `try_send` per registered channel:
//!
//! ```text
//! refresh/set -> Notifiers::notify() -> try_send(watcher_1)
//!                                    -> try_send(watcher_2)
//!                                    -> ...
//! ```
//!
//! # Delivery guarantee
//!
//! Delivery is at-most-once and best-effort. A watcher whose channel is full
//! simply misses that specific update; there is no queueing and no
//! backpressure on the write path. Watchers that need the latest state should
//! re-read the layer after any signal.
//!
//! The registry takes no ownership of a channel's lifetime. Channels whose
//! receiver has been dropped are pruned on the next notification.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// Signal channel registered by a watcher
pub type Notifier = mpsc::Sender<()>;


/// Per-layer list of watcher channels
#[derive(Debug, Default)]
pub struct Notifiers {
    senders: Mutex<Vec<Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a watcher. The same channel may be registered more than once.
    pub fn register(
        &self,
        notifier: Notifier,
    ) {
        self.senders.lock().push(notifier);
    }

    /// Signals every registered watcher without blocking.
    ///
    /// Returns the number of watchers that accepted the signal.
    pub fn notify(&self) -> usize {
        let mut senders = self.senders.lock();
        let mut delivered = 0;

        senders.retain(|sender| match sender.try_send(()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                trace!("watcher channel full, dropping change signal");
                true
            }
            Err(TrySendError::Closed(_)) => {
                trace!("watcher channel closed, unregistering");
                false
            }
        });

        delivered
    }

    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
