use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Source of the current time used for cache staleness checks
///
/// Production code uses [`SystemClock`]; tests drive a manual clock so TTL
/// expiry does not depend on sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Nanoseconds since the Unix epoch
    fn now_nanos(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        get_now_as_nanos()
    }
}

/// return nanosecond
pub(crate) fn get_now_as_nanos() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
}
