//! Embassy Runtime Shell
//!
//! Clock adapter and the async loop that fires the delayed restart.

use embassy_time::{Duration, Instant, Ticker};

use crate::config::RESTART_POLL_INTERVAL_MS;
use crate::lifecycle::TickScheduler;
use crate::platform::{Clock, SystemControl};

/// Embassy time driver as a millisecond clock
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

impl defmt::Format for EmbassyClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "EmbassyClock({}ms)", self.now_ms());
    }
}

/// Poll the restart deadline and restart the chip once it is due
///
/// Meant to be awaited from a dedicated embassy task.
pub async fn drive_restart_timer<C, P>(scheduler: &TickScheduler<C>, system: &P) -> !
where
    C: Clock,
    P: SystemControl,
{
    let mut ticker = Ticker::every(Duration::from_millis(RESTART_POLL_INTERVAL_MS));
    loop {
        ticker.next().await;
        if scheduler.poll() {
            defmt::warn!("Delayed restart due");
            system.restart();
        }
    }
}
