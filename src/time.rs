//! Monotonic clock capability
//!
//! Every wait in the stack is expressed against this trait so the frame
//! receiver, the on-air wait and the transport timeouts can run against a
//! virtual clock in tests.

use core::future::Future;

/// Monotonic millisecond clock with a cooperative sleep.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch. Never goes backwards.
    fn now_ms(&self) -> u64;

    /// Suspend the current task for at least `ms` milliseconds.
    fn sleep_ms(&self, ms: u32) -> impl Future<Output = ()>;
}

impl<T: Clock> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: u32) {
        (**self).sleep_ms(ms).await
    }
}

/// Clock backed by `embassy_time`.
#[cfg(feature = "embedded")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embedded")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }

    async fn sleep_ms(&self, ms: u32) {
        embassy_time::Timer::after(embassy_time::Duration::from_millis(ms as u64)).await;
    }
}
