use std::time::Duration;

use rand::Rng;

use crate::config::{Config, SimulatedWorkConfig};
use crate::files::ServedRoot;
use crate::http::pages::CannedPages;
use crate::limits::{AccessCounter, AdmissionController};

/// Everything the connection handlers share, built once before the first
/// accept.
#[derive(Debug)]
pub struct ServerState {
    pub root: ServedRoot,
    pub admission: AdmissionController,
    pub counter: AccessCounter,
    pub pages: CannedPages,
    pub work: Option<SimulatedWork>,
}

impl ServerState {
    pub fn new(root: ServedRoot, admission: AdmissionController, counter: AccessCounter) -> Self {
        Self {
            root,
            admission,
            counter,
            pages: CannedPages::new(),
            work: None,
        }
    }

    pub fn with_simulated_work(mut self, work: SimulatedWork) -> Self {
        self.work = Some(work);
        self
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let root = ServedRoot::new(&cfg.files.root, &cfg.files.allowed_extensions)?;
        let admission = AdmissionController::new(cfg.limits.requests_per_second);
        let counter = AccessCounter::new(cfg.counter.mode());

        let mut state = Self::new(root, admission, counter);
        state.work = cfg.simulated_work.map(SimulatedWork::from);
        Ok(state)
    }
}

/// A randomized pause of `base` plus up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedWork {
    pub base: Duration,
    pub jitter: Duration,
}

impl SimulatedWork {
    pub fn pick(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        self.base.saturating_add(Duration::from_millis(extra))
    }
}

impl From<SimulatedWorkConfig> for SimulatedWork {
    fn from(cfg: SimulatedWorkConfig) -> Self {
        Self {
            base: Duration::from_millis(cfg.base_ms),
            jitter: Duration::from_millis(cfg.jitter_ms),
        }
    }
}
