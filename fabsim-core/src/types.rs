use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

// ============================================================================
// Good - A priced point on the one-dimensional attribute axis
// ============================================================================

/// Lowest price a generated good may carry. Keeps densities finite.
pub const MIN_PRICE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Good {
    position: f64, // Location on the attribute axis, [0, 1]
    price: f64,
}

impl Good {
    pub fn new(position: f64, price: f64) -> Self {
        Self {
            position,
            price: price.max(MIN_PRICE),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Absolute distance from a demanded coordinate.
    pub fn distance_to(&self, demanded: f64) -> f64 {
        (self.position - demanded).abs()
    }
}
