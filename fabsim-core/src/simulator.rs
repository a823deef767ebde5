//! Trial loop and multi-trial orchestration.
//!
//! Trial lifecycle: Initialize (fresh producers, zeroed profit series) →
//! Run (timesteps × consumers) → Summarize. Each trial draws from its own
//! `StdRng` seeded from the run seed and the trial index, so trials share no
//! state and a run is reproducible from its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::Producer;
use crate::choice::{self, BuyingDecision};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::population::{PopulationPlan, ProducerKind};

// ============================================================================
// Results
// ============================================================================

/// Per-producer outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ProducerRecord {
    #[serde(rename = "producerID")]
    pub producer_id: String,
    /// Cumulative profit at the end of each timestep
    pub profits: Vec<f64>,
    pub average_price: f64,
    /// |mean sold position - mean demanded position|
    pub average_distance: f64,
    #[serde(skip)]
    pub units_sold: usize,
}

impl ProducerRecord {
    /// Sum of the profit series; trial winners maximize this.
    pub fn profit_area(&self) -> f64 {
        self.profits.iter().sum()
    }

    pub fn final_profit(&self) -> f64 {
        self.profits.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TrialSummary {
    /// 1-based trial number
    pub trial: usize,
    pub average_good_demanded: f64,
    pub winner: String,
    pub total_sales: usize,
    pub records: Vec<ProducerRecord>,
}

impl TrialSummary {
    /// Key used in the results file: `simulation_<n>`.
    pub fn label(&self) -> String {
        format!("simulation_{}", self.trial)
    }

    pub fn record(&self, producer_id: &str) -> Option<&ProducerRecord> {
        self.records.iter().find(|r| r.producer_id == producer_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct WinCount {
    pub producer_id: String,
    pub kind: ProducerKind,
    pub wins: u32,
}

/// Wins per producer, in population order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct WinTally {
    pub entries: Vec<WinCount>,
}

impl WinTally {
    pub fn new(plan: &PopulationPlan) -> Self {
        Self {
            entries: plan
                .slots()
                .iter()
                .map(|slot| WinCount {
                    producer_id: slot.id.clone(),
                    kind: slot.kind,
                    wins: 0,
                })
                .collect(),
        }
    }

    /// Credit a win; fails for an id outside the population.
    pub fn record_win(&mut self, producer_id: &str) -> SimResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.producer_id == producer_id)
            .ok_or_else(|| SimError::UnknownWinner(producer_id.to_string()))?;
        entry.wins += 1;
        Ok(())
    }

    pub fn wins_for(&self, producer_id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.producer_id == producer_id)
            .map_or(0, |e| e.wins)
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.wins).sum()
    }

    /// Wins summed per technology.
    pub fn by_kind(&self) -> Vec<(ProducerKind, u32)> {
        let mut out: Vec<(ProducerKind, u32)> = Vec::new();
        for entry in &self.entries {
            match out.iter_mut().find(|(kind, _)| *kind == entry.kind) {
                Some((_, wins)) => *wins += entry.wins,
                None => out.push((entry.kind, entry.wins)),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct RunResult {
    pub trials: Vec<TrialSummary>,
    pub wins: WinTally,
}

// ============================================================================
// Trial
// ============================================================================

/// Mutable state of one trial in progress.
#[derive(Debug, Clone)]
pub struct Trial {
    index: usize,
    sim_length: usize,
    producers: Vec<Producer>,
    profit_series: Vec<Vec<f64>>,
    demanded: Vec<f64>,
}

impl Trial {
    /// Fails with [`SimError::NoProducers`] when `producers` is empty.
    pub fn new(index: usize, producers: Vec<Producer>, sim_length: usize) -> SimResult<Self> {
        if producers.is_empty() {
            return Err(SimError::NoProducers);
        }
        let profit_series = vec![vec![0.0; sim_length]; producers.len()];
        Ok(Self {
            index,
            sim_length,
            producers,
            profit_series,
            demanded: Vec::new(),
        })
    }

    pub fn sim_length(&self) -> usize {
        self.sim_length
    }

    pub fn producers(&self) -> &[Producer] {
        &self.producers
    }

    /// Profit series per producer, in population order.
    pub fn profit_series(&self) -> &[Vec<f64>] {
        &self.profit_series
    }

    pub fn demanded(&self) -> &[f64] {
        &self.demanded
    }

    /// Run every timestep. Consumers within a timestep are served in order,
    /// then each producer's cumulative profit is written to that timestep's slot.
    #[cfg_attr(not(feature = "instrument"), allow(unused_variables))]
    pub fn run<R: Rng>(
        &mut self,
        num_consumers: usize,
        policy: BuyingDecision,
        rng: &mut R,
    ) -> SimResult<()> {
        self.demanded.reserve(self.sim_length * num_consumers);

        for timestep in 0..self.sim_length {
            for consumer in 0..num_consumers {
                let demanded: f64 = rng.random();
                self.demanded.push(demanded);
                let purchase = choice::resolve(&mut self.producers, demanded, policy, rng)?;

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "sale",
                    trial = self.index as u64,
                    timestep = timestep as u64,
                    consumer = consumer as u64,
                    demanded = demanded,
                    producer_id = self.producers[purchase.producer].id(),
                    position = purchase.good.position(),
                    price = purchase.good.price(),
                );
            }

            for (producer, series) in self.producers.iter().zip(self.profit_series.iter_mut()) {
                series[timestep] = producer.profits();

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "profit",
                    trial = self.index as u64,
                    timestep = timestep as u64,
                    producer_id = producer.id(),
                    profit = producer.profits(),
                );
            }
        }
        Ok(())
    }

    /// Collapse the finished trial into its summary. Producers are dropped.
    pub fn summarize(self) -> TrialSummary {
        let average_good_demanded = if self.demanded.is_empty() {
            0.0
        } else {
            self.demanded.iter().sum::<f64>() / self.demanded.len() as f64
        };

        let records: Vec<ProducerRecord> = self
            .producers
            .iter()
            .zip(self.profit_series)
            .map(|(producer, profits)| ProducerRecord {
                producer_id: producer.id().to_string(),
                profits,
                average_price: producer.average_price(),
                average_distance: (producer.average_position() - average_good_demanded).abs(),
                units_sold: producer.sold_goods().len(),
            })
            .collect();

        let winner = winner_index(&records)
            .map(|idx| records[idx].producer_id.clone())
            .unwrap_or_default();
        let total_sales = records.iter().map(|r| r.units_sold).sum();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "trial",
            trial = self.index as u64,
            winner = winner.as_str(),
            average_good_demanded = average_good_demanded,
            total_sales = total_sales as u64,
        );

        TrialSummary {
            trial: self.index,
            average_good_demanded,
            winner,
            total_sales,
            records,
        }
    }
}

/// Index of the record with the largest profit area; earliest wins ties.
pub fn winner_index(records: &[ProducerRecord]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, record) in records.iter().enumerate() {
        let area = record.profit_area();
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((idx, area));
        }
    }
    best.map(|(idx, _)| idx)
}

// ============================================================================
// Simulator
// ============================================================================

#[derive(Debug, Clone)]
pub struct MarketSimulator {
    config: SimConfig,
    plan: PopulationPlan,
    seed: u64,
}

impl MarketSimulator {
    /// Validate `config` and fix the run seed. Every configuration error is
    /// reported here, before any random draw.
    pub fn new(config: SimConfig, seed: u64) -> SimResult<Self> {
        config.validate()?;
        let plan = PopulationPlan::from_config(&config)?;
        Ok(Self { config, plan, seed })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn plan(&self) -> &PopulationPlan {
        &self.plan
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent generator for trial `trial` (1-based).
    pub fn trial_rng(&self, trial: usize) -> StdRng {
        StdRng::seed_from_u64(trial_seed(self.seed, trial as u64))
    }

    /// Fresh producers and zeroed profit series for trial `trial`.
    pub fn initialize<R: Rng>(&self, trial: usize, rng: &mut R) -> SimResult<Trial> {
        let producers = self.plan.build(rng);
        Trial::new(trial, producers, self.config.sim_length)
    }

    /// Initialize → Run → Summarize for one trial.
    pub fn run_trial(&self, trial: usize) -> SimResult<TrialSummary> {
        let mut rng = self.trial_rng(trial);
        let mut state = self.initialize(trial, &mut rng)?;
        state.run(self.config.num_consumers, self.config.buying_decision, &mut rng)?;
        Ok(state.summarize())
    }

    /// Run all configured trials and tally each trial's winner.
    pub fn run_trials(&self) -> SimResult<RunResult> {
        self.run_trials_with(|_| {})
    }

    /// Like [`run_trials`](Self::run_trials), calling `on_trial` as each trial finishes.
    pub fn run_trials_with(&self, mut on_trial: impl FnMut(&TrialSummary)) -> SimResult<RunResult> {
        let mut trials = Vec::with_capacity(self.config.num_trials);
        let mut wins = WinTally::new(&self.plan);

        for trial in 1..=self.config.num_trials {
            let summary = self.run_trial(trial)?;
            on_trial(&summary);
            wins.record_win(&summary.winner)?;
            trials.push(summary);
        }

        Ok(RunResult { trials, wins })
    }
}

/// SplitMix64 over the run seed and trial number. Each trial's stream depends
/// only on `(seed, trial)`, so a single trial replays without drawing the ones
/// before it from a shared generator.
fn trial_seed(seed: u64, trial: u64) -> u64 {
    let mut z = seed.wrapping_add(trial.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
