//! Producer populations.
//!
//! A [`PopulationPlan`] is derived from the configuration once, before any
//! random draw, and describes every producer slot of a trial. Each trial then
//! calls [`PopulationPlan::build`] to draw fresh inventories.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::Producer;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::types::Good;

// ============================================================================
// Scenario / test case selectors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    #[default]
    Factories,
    Fabricators,
    All,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Factories => "factories",
            Scenario::Fabricators => "fabricators",
            Scenario::All => "all",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "factories" => Ok(Scenario::Factories),
            "fabricators" => Ok(Scenario::Fabricators),
            "all" => Ok(Scenario::All),
            other => Err(ConfigError::UnknownScenario(other.to_string())),
        }
    }
}

/// Validation-mode populations hold one good attribute fixed to isolate the
/// effect of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum TestCase {
    /// Positions fixed, prices drawn
    #[serde(rename = "constantIDs")]
    ConstantIds,
    /// Prices fixed, positions drawn
    #[serde(rename = "constantPrices")]
    ConstantPrices,
    #[serde(rename = "noConstants")]
    NoConstants,
}

impl TestCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCase::ConstantIds => "constantIDs",
            TestCase::ConstantPrices => "constantPrices",
            TestCase::NoConstants => "noConstants",
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constantIDs" => Ok(TestCase::ConstantIds),
            "constantPrices" => Ok(TestCase::ConstantPrices),
            "noConstants" => Ok(TestCase::NoConstants),
            other => Err(ConfigError::UnknownTestCase(other.to_string())),
        }
    }
}

// ============================================================================
// Producer categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum ProducerKind {
    Factory,
    Fabricator,
}

impl ProducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerKind::Factory => "factory",
            ProducerKind::Fabricator => "fabricator",
        }
    }

    /// Catalog size for this technology under `config`.
    pub fn num_goods(&self, config: &SimConfig) -> usize {
        match self {
            ProducerKind::Factory => config.num_factory_goods(),
            ProducerKind::Fabricator => config.num_fabricator_goods(),
        }
    }
}

impl fmt::Display for ProducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Good generation
// ============================================================================

/// Unit interval for market-mode positions and prices.
pub const UNIT_RANGE: Range<f64> = 0.0..1.0;

// Validation-mode ranges: the first producer is cheaper/lower, the second
// dearer/higher, swapped for prices under noConstants.
pub const LOW_BAND: Range<f64> = 0.4..0.6;
pub const HIGH_BAND: Range<f64> = 0.5..0.7;

/// Source of the attribute a test case holds fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// One unit-uniform draw per good, fixed for the trial
    Drawn,
    Value(f64),
}

impl Constant {
    fn values<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<f64> {
        match *self {
            Constant::Drawn => (0..count).map(|_| rng.random_range(UNIT_RANGE)).collect(),
            Constant::Value(v) => vec![v; count],
        }
    }
}

/// How a slot's goods are drawn. Ranges are half-open.
#[derive(Debug, Clone, PartialEq)]
pub enum GoodDraw {
    Uniform { position: Range<f64>, price: Range<f64> },
    FixedPositions { positions: Constant, price: Range<f64> },
    FixedPrices { position: Range<f64>, prices: Constant },
}

impl GoodDraw {
    pub fn draw<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<Good> {
        match self {
            GoodDraw::Uniform { position, price } => (0..count)
                .map(|_| {
                    let pos = rng.random_range(position.clone());
                    Good::new(pos, rng.random_range(price.clone()))
                })
                .collect(),
            GoodDraw::FixedPositions { positions, price } => positions
                .values(count, rng)
                .into_iter()
                .map(|pos| Good::new(pos, rng.random_range(price.clone())))
                .collect(),
            GoodDraw::FixedPrices { position, prices } => prices
                .values(count, rng)
                .into_iter()
                .map(|p| Good::new(rng.random_range(position.clone()), p))
                .collect(),
        }
    }
}

// ============================================================================
// Population plan
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProducerSlot {
    pub id: String,
    pub kind: ProducerKind,
    pub num_goods: usize,
    pub draw: GoodDraw,
}

/// Validated description of a trial's producers.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationPlan {
    slots: Vec<ProducerSlot>,
}

impl PopulationPlan {
    /// Derive the plan for `config`. Fails on an empty population or on any
    /// slot whose catalog would be empty. Consumes no randomness.
    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        let slots = match config.test_case {
            None => market_slots(config),
            Some(test_case) => validation_slots(config, test_case),
        };

        if slots.is_empty() {
            return Err(ConfigError::NoProducers {
                scenario: config.scenario,
            });
        }
        if let Some(slot) = slots.iter().find(|s| s.num_goods == 0) {
            return Err(ConfigError::EmptyInventory {
                category: slot.kind,
                num_goods: config.num_goods,
                percent_factory: config.percent_factory,
            });
        }

        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[ProducerSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Producer ids in population order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.id.as_str())
    }

    /// Fresh producers with newly drawn inventories.
    pub fn build<R: Rng>(&self, rng: &mut R) -> Vec<Producer> {
        self.slots
            .iter()
            .map(|slot| {
                let inventory = slot.draw.draw(slot.num_goods, rng);
                Producer::new(slot.id.clone(), slot.kind, inventory)
            })
            .collect()
    }
}

fn market_slot(kind: ProducerKind, index: usize, config: &SimConfig) -> ProducerSlot {
    ProducerSlot {
        id: format!("{}_{}", kind, index),
        kind,
        num_goods: kind.num_goods(config),
        draw: GoodDraw::Uniform {
            position: UNIT_RANGE,
            price: UNIT_RANGE,
        },
    }
}

fn market_slots(config: &SimConfig) -> Vec<ProducerSlot> {
    let n = config.num_producers;
    match config.scenario {
        Scenario::Factories => (0..n)
            .map(|i| market_slot(ProducerKind::Factory, i, config))
            .collect(),
        Scenario::Fabricators => (0..n)
            .map(|i| market_slot(ProducerKind::Fabricator, i, config))
            .collect(),
        Scenario::All => {
            let half = n / 2;
            (0..half)
                .map(|i| market_slot(ProducerKind::Factory, i, config))
                .chain((0..half).map(|i| market_slot(ProducerKind::Fabricator, i, config)))
                .collect()
        }
    }
}

/// Exactly two producers, first and second, per the scenario's keys.
fn validation_slots(config: &SimConfig, test_case: TestCase) -> Vec<ProducerSlot> {
    use ProducerKind::{Fabricator, Factory};

    let (ids, kinds, constant) = match config.scenario {
        Scenario::Factories => (
            ["factory_0", "factory_1"],
            [Factory, Factory],
            Constant::Drawn,
        ),
        Scenario::Fabricators => (
            ["fabricator_0", "fabricator_1"],
            [Fabricator, Fabricator],
            Constant::Drawn,
        ),
        Scenario::All => (["factory", "fabricator"], [Factory, Fabricator], Constant::Value(0.5)),
    };

    let draws = match test_case {
        TestCase::ConstantIds => [
            GoodDraw::FixedPositions {
                positions: constant,
                price: LOW_BAND,
            },
            GoodDraw::FixedPositions {
                positions: constant,
                price: HIGH_BAND,
            },
        ],
        TestCase::ConstantPrices => [
            GoodDraw::FixedPrices {
                position: LOW_BAND,
                prices: constant,
            },
            GoodDraw::FixedPrices {
                position: HIGH_BAND,
                prices: constant,
            },
        ],
        TestCase::NoConstants => [
            GoodDraw::Uniform {
                position: LOW_BAND,
                price: HIGH_BAND,
            },
            GoodDraw::Uniform {
                position: HIGH_BAND,
                price: LOW_BAND,
            },
        ],
    };

    (0..2)
        .map(|i| ProducerSlot {
            id: ids[i].to_string(),
            kind: kinds[i],
            num_goods: kinds[i].num_goods(config),
            draw: draws[i].clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids(plan: &PopulationPlan) -> Vec<&str> {
        plan.ids().collect()
    }

    #[test]
    fn test_market_scenarios() {
        let config = SimConfig::new(10, 10, 5)
            .with_producers(4)
            .with_percent_factory(0.6);

        let plan = PopulationPlan::from_config(&config).unwrap();
        assert_eq!(ids(&plan), ["factory_0", "factory_1", "factory_2", "factory_3"]);
        assert_eq!(plan.len(), 4);
        assert!(!plan.is_empty());
        assert!(plan.slots().iter().all(|s| s.num_goods == 6));

        let plan =
            PopulationPlan::from_config(&config.clone().with_scenario(Scenario::Fabricators))
                .unwrap();
        assert_eq!(
            ids(&plan),
            ["fabricator_0", "fabricator_1", "fabricator_2", "fabricator_3"]
        );
        assert!(plan.slots().iter().all(|s| s.num_goods == 4));

        let plan =
            PopulationPlan::from_config(&config.clone().with_scenario(Scenario::All)).unwrap();
        assert_eq!(
            ids(&plan),
            ["factory_0", "factory_1", "fabricator_0", "fabricator_1"]
        );
    }

    #[test]
    fn test_all_with_odd_count_rounds_down() {
        let config = SimConfig::new(10, 10, 5)
            .with_producers(3)
            .with_percent_factory(0.5)
            .with_scenario(Scenario::All);
        let plan = PopulationPlan::from_config(&config).unwrap();
        assert_eq!(ids(&plan), ["factory_0", "fabricator_0"]);

        let single = config.with_producers(1);
        assert_eq!(
            PopulationPlan::from_config(&single),
            Err(ConfigError::NoProducers {
                scenario: Scenario::All
            })
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let config = SimConfig::new(10, 10, 5)
            .with_percent_factory(1.0)
            .with_scenario(Scenario::Fabricators);
        match PopulationPlan::from_config(&config) {
            Err(ConfigError::EmptyInventory { category, .. }) => {
                assert_eq!(category, ProducerKind::Fabricator)
            }
            other => panic!("expected EmptyInventory, got {other:?}"),
        }

        let config = SimConfig::new(10, 3, 5)
            .with_percent_factory(0.2)
            .with_test_case(TestCase::NoConstants);
        assert!(matches!(
            PopulationPlan::from_config(&config),
            Err(ConfigError::EmptyInventory {
                category: ProducerKind::Factory,
                ..
            })
        ));
    }

    #[test]
    fn test_validation_keys_ignore_producer_count() {
        let config = SimConfig::new(10, 10, 5)
            .with_producers(7)
            .with_percent_factory(0.3)
            .with_scenario(Scenario::All)
            .with_test_case(TestCase::ConstantIds);
        let plan = PopulationPlan::from_config(&config).unwrap();
        assert_eq!(ids(&plan), ["factory", "fabricator"]);
        assert_eq!(plan.slots()[0].num_goods, 3);
        assert_eq!(plan.slots()[1].num_goods, 7);
    }

    #[test]
    fn test_constant_ids_fix_positions() {
        let config = SimConfig::new(10, 8, 5)
            .with_percent_factory(0.5)
            .with_scenario(Scenario::All)
            .with_test_case(TestCase::ConstantIds);
        let plan = PopulationPlan::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let producers = plan.build(&mut rng);

        for good in producers[0].inventory() {
            assert_eq!(good.position(), 0.5);
            assert!((0.4..0.6).contains(&good.price()), "{}", good.price());
        }
        for good in producers[1].inventory() {
            assert_eq!(good.position(), 0.5);
            assert!((0.5..0.7).contains(&good.price()), "{}", good.price());
        }
    }

    #[test]
    fn test_constant_prices_fix_prices() {
        let config = SimConfig::new(10, 8, 5)
            .with_percent_factory(0.5)
            .with_scenario(Scenario::All)
            .with_test_case(TestCase::ConstantPrices);
        let plan = PopulationPlan::from_config(&config).unwrap();
        let producers = plan.build(&mut StdRng::seed_from_u64(5));

        assert!(producers[0].inventory().iter().all(|g| g.price() == 0.5));
        assert!(
            producers[0]
                .inventory()
                .iter()
                .all(|g| (0.4..0.6).contains(&g.position()))
        );
        assert!(
            producers[1]
                .inventory()
                .iter()
                .all(|g| (0.5..0.7).contains(&g.position()))
        );
    }

    #[test]
    fn test_no_constants_bands() {
        let config = SimConfig::new(10, 20, 5)
            .with_percent_factory(1.0)
            .with_test_case(TestCase::NoConstants);
        let plan = PopulationPlan::from_config(&config).unwrap();
        let producers = plan.build(&mut StdRng::seed_from_u64(9));

        assert_eq!(producers[0].id(), "factory_0");
        for good in producers[0].inventory() {
            assert!((0.4..0.6).contains(&good.position()));
            assert!((0.5..0.7).contains(&good.price()));
        }
        for good in producers[1].inventory() {
            assert!((0.5..0.7).contains(&good.position()));
            assert!((0.4..0.6).contains(&good.price()));
        }
    }

    #[test]
    fn test_build_draws_fresh_inventories() {
        let config = SimConfig::new(10, 5, 5).with_producers(3);
        let plan = PopulationPlan::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let first = plan.build(&mut rng);
        let second = plan.build(&mut rng);
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|p| p.inventory().len() == 5));
        assert!(first.iter().all(|p| p.profits() == 0.0));
        assert_ne!(first[0].inventory(), second[0].inventory());
        for good in first.iter().flat_map(|p| p.inventory()) {
            assert!((0.0..1.0).contains(&good.position()));
            assert!(good.price() > 0.0);
        }
    }

    #[test]
    fn test_selector_names() {
        assert_eq!("all".parse::<Scenario>(), Ok(Scenario::All));
        assert_eq!(
            "everyone".parse::<Scenario>(),
            Err(ConfigError::UnknownScenario("everyone".to_string()))
        );
        assert_eq!("constantIDs".parse::<TestCase>(), Ok(TestCase::ConstantIds));
        assert_eq!(
            "constantIds".parse::<TestCase>(),
            Err(ConfigError::UnknownTestCase("constantIds".to_string()))
        );
    }

    #[test]
    fn test_good_draw_respects_ranges_and_seed() {
        let draw = GoodDraw::Uniform {
            position: HIGH_BAND,
            price: LOW_BAND,
        };
        let goods = draw.draw(200, &mut StdRng::seed_from_u64(21));
        assert_eq!(goods.len(), 200);
        for good in &goods {
            assert!(HIGH_BAND.contains(&good.position()), "{}", good.position());
            assert!(LOW_BAND.contains(&good.price()), "{}", good.price());
        }
        assert_eq!(goods, draw.draw(200, &mut StdRng::seed_from_u64(21)));

        let fixed = GoodDraw::FixedPositions {
            positions: Constant::Drawn,
            price: UNIT_RANGE,
        };
        for good in fixed.draw(50, &mut StdRng::seed_from_u64(3)) {
            assert!(UNIT_RANGE.contains(&good.position()));
            assert!(UNIT_RANGE.contains(&good.price()));
        }
    }
}
