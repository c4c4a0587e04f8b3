//! [`Scheduler`] on the Embassy executor.

use embassy_time::Instant;
use hidcap::scheduler::Scheduler;

/// Yields to the USB, HID and CDC tasks on every step.
pub struct EmbassyScheduler;

impl Scheduler for EmbassyScheduler {
    async fn step(&mut self) {
        embassy_futures::yield_now().await;
    }

    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
