//! Cooperative "wait while servicing USB" primitive.
//!
//! Nothing in the firmware blocks the processor.  Every wait is a loop
//! that performs one unit of USB service per iteration through
//! [`Scheduler::step`] and checks its exit condition afterwards.  On
//! target `step` yields to the USB task; in tests it advances a fake
//! clock.

/// One unit of USB service plus a monotonic millisecond clock.
#[allow(async_fn_in_trait)]
pub trait Scheduler {
    /// Service the USB stack once and return.
    async fn step(&mut self);

    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;
}

/// Busy-wait for `ms` milliseconds, servicing USB on every iteration.
///
/// Always services at least once, even for `ms == 0`.
pub async fn wait_ms<S: Scheduler>(sched: &mut S, ms: u64) {
    let start = sched.now_ms();
    loop {
        sched.step().await;
        if sched.now_ms().saturating_sub(start) >= ms {
            break;
        }
    }
}

/// Busy-wait until `ready()` holds, servicing USB before each check.
///
/// Unbounded: if the condition never becomes true this never returns,
/// but USB keeps being serviced the whole time.
pub async fn wait_until<S: Scheduler>(sched: &mut S, mut ready: impl FnMut() -> bool) {
    while !ready() {
        sched.step().await;
    }
}
