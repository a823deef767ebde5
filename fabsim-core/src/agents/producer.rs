use crate::error::{SimError, SimResult};
use crate::population::ProducerKind;
use crate::types::Good;

// === PRODUCER ===

/// A seller of differentiated goods. The inventory is a catalog: selling a good
/// never removes it, so the same good can be sold any number of times.
#[derive(Debug, Clone)]
pub struct Producer {
    id: String,
    kind: ProducerKind,
    inventory: Vec<Good>,
    cumulative_profit: f64,
    sold_goods: Vec<Good>,
}

impl Producer {
    pub fn new(id: impl Into<String>, kind: ProducerKind, inventory: Vec<Good>) -> Self {
        Self {
            id: id.into(),
            kind,
            inventory,
            cumulative_profit: 0.0,
            sold_goods: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ProducerKind {
        self.kind
    }

    pub fn inventory(&self) -> &[Good] {
        &self.inventory
    }

    pub fn sold_goods(&self) -> &[Good] {
        &self.sold_goods
    }

    /// Good whose position is nearest to `demanded`.
    /// Ties go to the earliest good in inventory order.
    pub fn closest_to(&self, demanded: f64) -> SimResult<Good> {
        let mut best: Option<(Good, f64)> = None;
        for good in &self.inventory {
            let distance = good.distance_to(demanded);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((*good, distance));
            }
        }
        best.map(|(good, _)| good)
            .ok_or_else(|| SimError::EmptyInventory {
                producer: self.id.clone(),
            })
    }

    /// Record a sale of `good` at its listed price.
    pub fn sell(&mut self, good: Good) {
        self.cumulative_profit += good.price();
        self.sold_goods.push(good);
    }

    pub fn profits(&self) -> f64 {
        self.cumulative_profit
    }

    /// Mean price over all sales, 0.0 before the first sale.
    pub fn average_price(&self) -> f64 {
        mean(self.sold_goods.iter().map(Good::price), self.sold_goods.len())
    }

    /// Mean position over all sales, 0.0 before the first sale.
    pub fn average_position(&self) -> f64 {
        mean(self.sold_goods.iter().map(Good::position), self.sold_goods.len())
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}
