//! Fixed-window admission control.
//!
//! Every address shares one window that starts at a whole second. When the
//! clock moves to another second the counts are thrown away in one go, so an
//! address can be admitted `limit` times at the end of one second and again
//! `limit` times right after the boundary.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

/// Source of the current whole second.
pub trait Clock: Send + Sync {
    fn epoch_second(&self) -> u64;
}

/// Wall-clock seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_second(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct RateWindow {
    epoch_second: u64,
    counts: HashMap<IpAddr, u32>,
}

pub struct AdmissionController {
    limit: u32,
    clock: Box<dyn Clock>,
    window: Mutex<RateWindow>,
}

impl AdmissionController {
    /// Creates a controller admitting `limit` connections per address per second.
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, SystemClock)
    }

    pub fn with_clock(limit: u32, clock: impl Clock + 'static) -> Self {
        let window = RateWindow {
            epoch_second: clock.epoch_second(),
            counts: HashMap::new(),
        };

        Self {
            limit,
            clock: Box::new(clock),
            window: Mutex::new(window),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Counts one attempt for `addr` and reports whether it fits the budget.
    ///
    /// The attempt is counted even when it is rejected.
    pub async fn try_admit(&self, addr: IpAddr) -> bool {
        let mut window = self.window.lock().await;

        let now = self.clock.epoch_second();
        if now != window.epoch_second {
            *window = RateWindow {
                epoch_second: now,
                counts: HashMap::new(),
            };
        }

        let count = window.counts.entry(addr).or_insert(0);
        *count = count.saturating_add(1);
        let admitted = *count <= self.limit;

        if !admitted {
            tracing::debug!(
                client = %addr,
                attempts = *count,
                limit = self.limit,
                second = now,
                "Admission denied"
            );
        }

        admitted
    }

    /// Attempts recorded for `addr` in the current window.
    pub async fn attempts(&self, addr: IpAddr) -> u32 {
        let window = self.window.lock().await;
        if window.epoch_second != self.clock.epoch_second() {
            return 0;
        }
        window.counts.get(&addr).copied().unwrap_or(0)
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
