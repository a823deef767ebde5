use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::choice::BuyingDecision;
use crate::error::{ConfigError, SimResult};
use crate::population::{Scenario, TestCase};

// ============================================================================
// Run configuration
// ============================================================================

/// Immutable parameters for a run. Upper-case aliases accept the legacy input
/// files (`SIMLENGTH`, `NUMGOODS`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    #[serde(alias = "SIMLENGTH")]
    pub sim_length: usize, // Timesteps per trial
    #[serde(alias = "NUMGOODS")]
    pub num_goods: usize, // Split between factory and fabricator catalogs
    #[serde(alias = "NUMCONSUMERS")]
    pub num_consumers: usize, // Consumers per timestep
    #[serde(alias = "NUMPRODUCERS", default = "default_num_producers")]
    pub num_producers: usize,
    #[serde(alias = "PERCENTFACTORY")]
    pub percent_factory: f64,
    #[serde(default = "default_num_trials")]
    pub num_trials: usize,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub buying_decision: BuyingDecision,
    /// Present only in validation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
    #[serde(default)]
    pub monitor: bool,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_num_producers() -> usize {
    2
}

fn default_num_trials() -> usize {
    1
}

fn default_output_file() -> String {
    "results".to_string()
}

impl SimConfig {
    /// Minimal market-mode configuration; tweak fields with the builder methods.
    pub fn new(sim_length: usize, num_goods: usize, num_consumers: usize) -> Self {
        Self {
            sim_length,
            num_goods,
            num_consumers,
            num_producers: default_num_producers(),
            percent_factory: 1.0,
            num_trials: default_num_trials(),
            scenario: Scenario::default(),
            buying_decision: BuyingDecision::default(),
            test_case: None,
            monitor: false,
            output_file: default_output_file(),
            seed: None,
        }
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_producers(mut self, num_producers: usize) -> Self {
        self.num_producers = num_producers;
        self
    }

    pub fn with_percent_factory(mut self, percent_factory: f64) -> Self {
        self.percent_factory = percent_factory;
        self
    }

    pub fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_buying_decision(mut self, buying_decision: BuyingDecision) -> Self {
        self.buying_decision = buying_decision;
        self
    }

    pub fn with_test_case(mut self, test_case: TestCase) -> Self {
        self.test_case = Some(test_case);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_output_file(mut self, output_file: impl Into<String>) -> Self {
        self.output_file = output_file.into();
        self
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    /// Goods per factory catalog: `floor(numGoods * percentFactory)`.
    pub fn num_factory_goods(&self) -> usize {
        (self.num_goods as f64 * self.percent_factory).floor() as usize
    }

    /// Goods per fabricator catalog: whatever factories don't take.
    pub fn num_fabricator_goods(&self) -> usize {
        self.num_goods.saturating_sub(self.num_factory_goods())
    }

    pub fn is_validation_mode(&self) -> bool {
        self.test_case.is_some()
    }

    /// Results path; `.json` is appended when no extension is given.
    pub fn output_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.output_file);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("json")
        }
    }

    /// Field-level checks. Population checks live in
    /// [`PopulationPlan::from_config`](crate::population::PopulationPlan::from_config).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("simLength", self.sim_length),
            ("numGoods", self.num_goods),
            ("numConsumers", self.num_consumers),
            ("numProducers", self.num_producers),
            ("numTrials", self.num_trials),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        if !(0.0..=1.0).contains(&self.percent_factory) {
            return Err(ConfigError::PercentFactoryOutOfRange(self.percent_factory));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn test_parse_legacy_keys() {
        let json = r#"{
            "SIMLENGTH": 50,
            "NUMGOODS": 10,
            "NUMCONSUMERS": 20,
            "PERCENTFACTORY": 0.7,
            "numTrials": 3,
            "scenario": "all",
            "buyingDecision": "roulette",
            "testCase": "constantPrices",
            "outputFile": "validate",
            "monitor": true
        }"#;
        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.sim_length, 50);
        assert_eq!(config.num_goods, 10);
        assert_eq!(config.num_consumers, 20);
        assert_eq!(config.num_producers, 2);
        assert_eq!(config.num_trials, 3);
        assert_eq!(config.scenario, Scenario::All);
        assert_eq!(config.buying_decision, BuyingDecision::Roulette);
        assert_eq!(config.test_case, Some(TestCase::ConstantPrices));
        assert!(config.monitor);
        assert_eq!(config.output_path(), PathBuf::from("validate.json"));
        assert_eq!(config.num_factory_goods(), 7);
        assert_eq!(config.num_fabricator_goods(), 3);
    }

    #[test]
    fn test_parse_camel_case_defaults() {
        let json = r#"{"simLength": 5, "numGoods": 4, "numConsumers": 2, "percentFactory": 0.5}"#;
        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.scenario, Scenario::Factories);
        assert_eq!(config.buying_decision, BuyingDecision::NonRoulette);
        assert_eq!(config.test_case, None);
        assert_eq!(config.num_trials, 1);
        assert_eq!(config.seed, None);
        assert!(!config.monitor);
        assert_eq!(config.output_path(), PathBuf::from("results.json"));
    }

    #[test]
    fn test_unknown_enum_names_rejected() {
        let base = r#""simLength": 5, "numGoods": 4, "numConsumers": 2, "percentFactory": 0.5"#;
        for bad in [
            r#""scenario": "cooperatives""#,
            r#""buyingDecision": "greedy""#,
            r#""testCase": "constantEverything""#,
        ] {
            let json = format!("{{{base}, {bad}}}");
            match SimConfig::from_json(&json) {
                Err(SimError::Parse(e)) => {
                    assert!(e.to_string().contains("unknown variant"), "{e}")
                }
                other => panic!("expected parse error for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_fields() {
        let ok = SimConfig::new(10, 3, 5);
        assert_eq!(ok.validate(), Ok(()));

        assert_eq!(
            SimConfig::new(0, 3, 5).validate(),
            Err(ConfigError::NonPositive { field: "simLength" })
        );
        assert_eq!(
            SimConfig::new(10, 3, 5).with_trials(0).validate(),
            Err(ConfigError::NonPositive { field: "numTrials" })
        );
        assert_eq!(
            SimConfig::new(10, 3, 5).with_producers(0).validate(),
            Err(ConfigError::NonPositive { field: "numProducers" })
        );
        assert_eq!(
            SimConfig::new(10, 3, 5).with_percent_factory(1.5).validate(),
            Err(ConfigError::PercentFactoryOutOfRange(1.5))
        );
        assert!(
            SimConfig::new(10, 3, 5)
                .with_percent_factory(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_goods_split() {
        let config = SimConfig::new(10, 10, 5).with_percent_factory(0.35);
        assert_eq!(config.num_factory_goods(), 3);
        assert_eq!(config.num_fabricator_goods(), 7);

        let config = SimConfig::new(10, 10, 5).with_percent_factory(1.0);
        assert_eq!(config.num_factory_goods(), 10);
        assert_eq!(config.num_fabricator_goods(), 0);
    }
}
