use thiserror::Error;

use crate::population::{ProducerKind, Scenario};

/// Problems with a run configuration. Always raised before any trial starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("percentFactory must lie in [0, 1], got {0}")]
    PercentFactoryOutOfRange(f64),

    #[error("unknown scenario {0:?} (expected factories, fabricators or all)")]
    UnknownScenario(String),

    #[error("unknown testCase {0:?} (expected constantIDs, constantPrices or noConstants)")]
    UnknownTestCase(String),

    #[error("scenario {scenario} builds no producers")]
    NoProducers { scenario: Scenario },

    #[error(
        "{category} producers would carry no goods (numGoods={num_goods}, percentFactory={percent_factory})"
    )]
    EmptyInventory {
        category: ProducerKind,
        num_goods: usize,
        percent_factory: f64,
    },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("producer {producer} has an empty inventory")]
    EmptyInventory { producer: String },

    #[error("no producers to buy from")]
    NoProducers,

    #[error("trial winner {0:?} is not part of the population")]
    UnknownWinner(String),

    #[error("unknown buyingDecision {0:?} (expected roulette or nonRoulette)")]
    UnknownPolicy(String),

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
