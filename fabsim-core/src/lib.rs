// Fabricator diffusion market simulation
//
// Module structure:
// - types       Good (priced point on the attribute axis)
// - agents/     Producer inventories and sale bookkeeping
// - choice      Purchase density, best-match and roulette resolution
// - population  Scenario / test case selectors and population plans
// - simulator   Trial loop, summaries, multi-trial win tally
// - config      Run configuration
// - error       Configuration and simulation errors
// - report      Human-readable summaries
// - output      Results file
// - driver      Experiment orchestration

use wasm_bindgen::prelude::*;

pub mod agents;
pub mod choice;
pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod population;
pub mod report;
pub mod simulator;
pub mod types;

#[cfg(feature = "instrument")]
pub use instrument;

pub use agents::Producer;
pub use choice::{
    BuyingDecision, MIN_SQUARED_DISTANCE, Purchase, best_match, probability_density, resolve,
    roulette,
};
pub use config::SimConfig;
pub use driver::{Experiment, ExperimentOutcome};
pub use error::{ConfigError, SimError, SimResult};
pub use population::{PopulationPlan, ProducerKind, Scenario, TestCase};
pub use simulator::{
    MarketSimulator, ProducerRecord, RunResult, Trial, TrialSummary, WinCount, WinTally,
};
pub use types::Good;

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    experiment: Experiment,
    outcome: Option<ExperimentOutcome>,
}

#[wasm_bindgen]
impl Simulation {
    /// Build from a JSON configuration. Seeds from `Math.random` when the
    /// configuration carries no seed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<Simulation, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Ok(Self {
            experiment: Experiment::from_json(config_json)?,
            outcome: None,
        })
    }

    #[wasm_bindgen]
    pub fn from_config(config: SimConfig) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();

        Ok(Self {
            experiment: Experiment::new(config)?,
            outcome: None,
        })
    }

    #[wasm_bindgen]
    pub fn seed(&self) -> u64 {
        self.experiment.seed()
    }

    /// Run every trial and keep the outcome for later queries.
    #[wasm_bindgen]
    pub fn run(&mut self) -> Result<RunResult, JsError> {
        let outcome = self.experiment.run()?;
        let run = outcome.run.clone();
        self.outcome = Some(outcome);
        Ok(run)
    }

    /// Completed trials so far (0 before `run`).
    #[wasm_bindgen]
    pub fn trial_count(&self) -> usize {
        self.outcome.as_ref().map_or(0, |o| o.run.trials.len())
    }

    /// Results file contents, `{ "simulation_<n>": [...] }`.
    #[wasm_bindgen]
    pub fn results_json(&self) -> Result<String, JsError> {
        match &self.outcome {
            Some(outcome) => Ok(outcome.results_file().to_json()?),
            None => Err(JsError::new("simulation has not been run")),
        }
    }

    /// Monitor summaries as an array of strings (empty unless `monitor` is set).
    #[wasm_bindgen]
    pub fn monitor_reports(&self) -> Result<JsValue, JsError> {
        let reports: Vec<String> = self
            .outcome
            .iter()
            .flat_map(|o| o.monitor_reports())
            .map(|r| r.to_string())
            .collect();
        Ok(serde_wasm_bindgen::to_value(&reports)?)
    }

    #[wasm_bindgen]
    pub fn run_report(&self) -> Option<String> {
        self.outcome
            .as_ref()
            .map(|o| o.run_report(None).to_string())
    }
}
