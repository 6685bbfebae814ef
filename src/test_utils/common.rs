use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::time::Clock;
use crate::Notifier;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            // Never zero: zero marks "never refreshed"
            nanos: AtomicU64::new(1_000_000_000),
        })
    }

    pub fn advance(
        &self,
        by: Duration,
    ) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

/// Watcher channel with room for a single pending signal
pub fn watcher() -> (Notifier, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

/// Waits up to one second for a change signal
pub async fn wait_for_signal(receiver: &mut mpsc::Receiver<()>) -> bool {
    matches!(
        timeout(Duration::from_secs(1), receiver.recv()).await,
        Ok(Some(()))
    )
}
