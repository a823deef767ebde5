//! Human-readable run summaries.
//!
//! Only formats; callers decide where (and whether) to print.

use std::fmt;
use std::time::Duration;

use crate::config::SimConfig;
use crate::simulator::{RunResult, TrialSummary};

const RULE: &str = "==================================================";

/// Per-trial summary shown when `monitor` is on.
#[derive(Debug, Clone, Copy)]
pub struct TrialReport<'a> {
    pub summary: &'a TrialSummary,
    /// Wall time of the trial, when measured
    pub elapsed: Option<Duration>,
}

impl<'a> TrialReport<'a> {
    pub fn new(summary: &'a TrialSummary) -> Self {
        Self {
            summary,
            elapsed: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

impl fmt::Display for TrialReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "{RULE}")?;
        writeln!(f, "{} Wins!", s.winner)?;
        writeln!(f)?;
        writeln!(f, "Average Good Demanded: {}", s.average_good_demanded)?;
        writeln!(f)?;
        for record in &s.records {
            let id = &record.producer_id;
            writeln!(f, "{id} Profits: {}", record.final_profit())?;
            writeln!(f, "{id} Average Price: {}", record.average_price)?;
            writeln!(f, "{id} Average Good Distance: {}", record.average_distance)?;
            writeln!(f)?;
        }
        writeln!(f, "Simulation {} finished with {} sales", s.trial, s.total_sales)?;
        if let Some(elapsed) = self.elapsed {
            writeln!(f, "Simulation {} took {:.3} seconds to run!", s.trial, elapsed.as_secs_f64())?;
        }
        Ok(())
    }
}

/// End-of-run summary: inputs, selectors and win counts.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub config: &'a SimConfig,
    pub seed: u64,
    pub run: &'a RunResult,
    pub elapsed: Option<Duration>,
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.config;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Input parameters were:")?;
        writeln!(f)?;
        writeln!(f, "SIMLENGTH = {}", c.sim_length)?;
        writeln!(f, "NUMGOODS = {}", c.num_goods)?;
        writeln!(f, "NUMCONSUMERS = {}", c.num_consumers)?;
        writeln!(f, "NUMPRODUCERS = {}", c.num_producers)?;
        writeln!(f, "PERCENTFACTORY = {}", c.percent_factory)?;
        writeln!(f, "SEED = {}", self.seed)?;
        writeln!(f)?;
        if let Some(test_case) = c.test_case {
            writeln!(f, "Test Case was: {test_case}")?;
        }
        writeln!(f, "Scenario was: {}", c.scenario)?;
        writeln!(f, "Buying decision was: {}", c.buying_decision)?;
        writeln!(f)?;
        writeln!(f, "Results for {} trial(s):", self.run.trials.len())?;
        writeln!(f)?;
        for entry in &self.run.wins.entries {
            writeln!(f, "{} won {} time(s)", entry.producer_id, entry.wins)?;
        }
        for (kind, wins) in self.run.wins.by_kind() {
            writeln!(f, "{kind} producers won {wins} time(s) in total")?;
        }
        if let Some(elapsed) = self.elapsed {
            writeln!(f)?;
            writeln!(f, "Trials took {:.3} seconds to run!", elapsed.as_secs_f64())?;
        }
        write!(f, "{RULE}")
    }
}
