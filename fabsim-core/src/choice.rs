//! Consumer purchase decisions.
//!
//! A consumer demands one coordinate on the attribute axis. Each producer is
//! scored by how close its nearest good sits to that coordinate and how cheap it
//! is; the score drives either a deterministic best-match purchase or a
//! fitness-proportionate (roulette) purchase.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::Producer;
use crate::error::{SimError, SimResult};
use crate::types::Good;

// === CONSTANTS ===

/// Floor for the squared distance in the density. An exact position match
/// scores `1 / MIN_SQUARED_DISTANCE / price`, the largest finite score that
/// producer can reach.
pub const MIN_SQUARED_DISTANCE: f64 = 1e-12;

// === POLICY ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum BuyingDecision {
    /// Stochastic, weighted by density
    #[serde(rename = "roulette")]
    Roulette,
    /// Deterministic, highest density wins
    #[default]
    #[serde(rename = "nonRoulette")]
    NonRoulette,
}

impl BuyingDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyingDecision::Roulette => "roulette",
            BuyingDecision::NonRoulette => "nonRoulette",
        }
    }
}

impl fmt::Display for BuyingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuyingDecision {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roulette" => Ok(BuyingDecision::Roulette),
            "nonRoulette" => Ok(BuyingDecision::NonRoulette),
            other => Err(SimError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Outcome of one consumer's decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Purchase {
    /// Index of the selling producer in the slice passed to the resolver
    pub producer: usize,
    pub good: Good,
}

// === DENSITY ===

/// Purchase density of `producer` for a consumer demanding `demanded`:
/// `1 / d^2 / price` for the producer's closest good, with `d^2` floored at
/// [`MIN_SQUARED_DISTANCE`].
pub fn probability_density(producer: &Producer, demanded: f64) -> SimResult<f64> {
    let best = producer.closest_to(demanded)?;
    Ok(density_of(&best, demanded))
}

fn density_of(good: &Good, demanded: f64) -> f64 {
    let squared = (good.position() - demanded).powi(2).max(MIN_SQUARED_DISTANCE);
    1.0 / squared / good.price()
}

/// Density of every producer, in input order.
pub fn densities(producers: &[Producer], demanded: f64) -> SimResult<Vec<f64>> {
    producers
        .iter()
        .map(|p| probability_density(p, demanded))
        .collect()
}

/// Densities normalized to a probability distribution over producers.
pub fn selection_probabilities(producers: &[Producer], demanded: f64) -> SimResult<Vec<f64>> {
    let weights = densities(producers, demanded)?;
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

// === RESOLUTION ===

/// Highest-density producer sells its closest good. Earliest producer wins ties.
pub fn best_match(producers: &mut [Producer], demanded: f64) -> SimResult<Purchase> {
    let weights = densities(producers, demanded)?;
    let mut best: Option<(usize, f64)> = None;
    for (idx, &w) in weights.iter().enumerate() {
        if best.is_none_or(|(_, best_w)| w > best_w) {
            best = Some((idx, w));
        }
    }
    let (winner, _) = best.ok_or(SimError::NoProducers)?;
    complete_sale(producers, winner, demanded)
}

/// Fitness-proportionate selection: each producer wins with probability
/// proportional to its density.
pub fn roulette<R: Rng>(
    producers: &mut [Producer],
    demanded: f64,
    rng: &mut R,
) -> SimResult<Purchase> {
    if producers.is_empty() {
        return Err(SimError::NoProducers);
    }
    let weights = densities(producers, demanded)?;
    let spin: f64 = rng.random();
    let winner = spin_wheel(&weights, spin);
    complete_sale(producers, winner, demanded)
}

/// Walk the wheel for a spin in `[0, 1)`. The threshold is `spin * total`;
/// the first index whose running sum reaches it wins. Falls back to the last
/// index when rounding leaves the running sum just short of the threshold.
pub fn spin_wheel(weights: &[f64], spin: f64) -> usize {
    let total: f64 = weights.iter().sum();
    let threshold = spin * total;
    let mut running = 0.0;
    for (idx, w) in weights.iter().enumerate() {
        running += w;
        if running >= threshold {
            return idx;
        }
    }
    weights.len().saturating_sub(1)
}

/// Dispatch to the resolver named by `policy`.
pub fn resolve<R: Rng>(
    producers: &mut [Producer],
    demanded: f64,
    policy: BuyingDecision,
    rng: &mut R,
) -> SimResult<Purchase> {
    match policy {
        BuyingDecision::Roulette => roulette(producers, demanded, rng),
        BuyingDecision::NonRoulette => best_match(producers, demanded),
    }
}

/// Like [`resolve`] with the policy given by name.
pub fn resolve_named<R: Rng>(
    producers: &mut [Producer],
    demanded: f64,
    policy: &str,
    rng: &mut R,
) -> SimResult<Purchase> {
    let policy: BuyingDecision = policy.parse()?;
    resolve(producers, demanded, policy, rng)
}

fn complete_sale(producers: &mut [Producer], winner: usize, demanded: f64) -> SimResult<Purchase> {
    let producer = &mut producers[winner];
    let good = producer.closest_to(demanded)?;
    producer.sell(good);
    Ok(Purchase {
        producer: winner,
        good,
    })
}
