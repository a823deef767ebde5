//! Experiment driver: configuration in, structured results out.

use std::path::Path;
use std::time::Duration;

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::output::ResultsFile;
use crate::report::{RunReport, TrialReport};
use crate::simulator::{MarketSimulator, RunResult};

/// A validated, seeded experiment ready to run.
#[derive(Debug, Clone)]
pub struct Experiment {
    simulator: MarketSimulator,
}

impl Experiment {
    /// Uses the configured seed, or a fresh entropy seed when none is set.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        let seed = config.seed.unwrap_or_else(entropy_seed);
        Self::with_seed(config, seed)
    }

    pub fn with_seed(config: SimConfig, seed: u64) -> SimResult<Self> {
        Ok(Self {
            simulator: MarketSimulator::new(config, seed)?,
        })
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Self::new(SimConfig::from_json(json)?)
    }

    pub fn from_path(path: &Path) -> SimResult<Self> {
        Self::new(SimConfig::from_path(path)?)
    }

    pub fn config(&self) -> &SimConfig {
        self.simulator.config()
    }

    pub fn seed(&self) -> u64 {
        self.simulator.seed()
    }

    pub fn simulator(&self) -> &MarketSimulator {
        &self.simulator
    }

    /// Run every trial, timing each one.
    pub fn run(&self) -> SimResult<ExperimentOutcome> {
        let mut watch = Stopwatch::start();
        let mut trial_times = Vec::with_capacity(self.config().num_trials);
        let run = self
            .simulator
            .run_trials_with(|_| trial_times.push(watch.lap()))?;
        Ok(ExperimentOutcome {
            config: self.config().clone(),
            seed: self.seed(),
            run,
            trial_times,
        })
    }
}

/// Results of a completed experiment plus the inputs that produced them.
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub config: SimConfig,
    pub seed: u64,
    pub run: RunResult,
    /// Wall time per trial, in trial order
    pub trial_times: Vec<Duration>,
}

impl ExperimentOutcome {
    pub fn results_file(&self) -> ResultsFile<'_> {
        ResultsFile::new(&self.run.trials)
    }

    /// Persist to the configured output path.
    pub fn write_results(&self) -> SimResult<()> {
        self.write_results_to(&self.config.output_path())
    }

    pub fn write_results_to(&self, path: &Path) -> SimResult<()> {
        self.results_file().write_to(path)
    }

    /// Per-trial reports, empty unless `monitor` is set.
    pub fn monitor_reports(&self) -> Vec<TrialReport<'_>> {
        if !self.config.monitor {
            return Vec::new();
        }
        self.run
            .trials
            .iter()
            .zip(&self.trial_times)
            .map(|(summary, &elapsed)| TrialReport::new(summary).with_elapsed(elapsed))
            .collect()
    }

    pub fn run_report(&self, elapsed: Option<Duration>) -> RunReport<'_> {
        RunReport {
            config: &self.config,
            seed: self.seed,
            run: &self.run,
            elapsed,
        }
    }
}

/// Lap timer; `Instant` is unavailable on wasm32, so the browser clock stands in.
struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    last: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    last_ms: f64,
}

impl Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    fn start() -> Self {
        Self {
            last: std::time::Instant::now(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn start() -> Self {
        Self {
            last_ms: js_sys::Date::now(),
        }
    }

    /// Time since the previous lap (or the start), then reset.
    #[cfg(not(target_arch = "wasm32"))]
    fn lap(&mut self) -> Duration {
        let now = std::time::Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        elapsed
    }

    #[cfg(target_arch = "wasm32")]
    fn lap(&mut self) -> Duration {
        let now = js_sys::Date::now();
        let elapsed = Duration::from_secs_f64(((now - self.last_ms) / 1000.0).max(0.0));
        self.last_ms = now;
        elapsed
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    use rand::Rng;
    rand::rng().random()
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}
