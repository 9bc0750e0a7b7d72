//! Capacity Tiers - Banded Pricing Tables
//!
//! Tables are owned and ordered by the back office. The resolver takes the
//! first row that contains the capacity and never sorts.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A row keyed by a `[min, max]` capacity band in kW.
pub trait CapacityBand {
    fn min_capacity(&self) -> f64;
    fn max_capacity(&self) -> f64;

    fn contains(&self, capacity_kw: f64) -> bool {
        self.min_capacity() <= capacity_kw && capacity_kw <= self.max_capacity()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityPricingRow {
    pub min_capacity: f64,
    pub max_capacity: f64,
    #[serde(default)]
    pub extra_hours: f64,
    #[serde(default)]
    pub extra_materials: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CapacityBand for CapacityPricingRow {
    fn min_capacity(&self) -> f64 { self.min_capacity }
    fn max_capacity(&self) -> f64 { self.max_capacity }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeDiameterPricingRow {
    pub min_capacity: f64,
    pub max_capacity: f64,
    /// Descriptive, e.g. `1/4"`.
    pub liquid_line: String,
    pub suction_line: String,
    pub price_per_meter: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CapacityBand for PipeDiameterPricingRow {
    fn min_capacity(&self) -> f64 { self.min_capacity }
    fn max_capacity(&self) -> f64 { self.max_capacity }
}

/// First row whose band contains `capacity_kw`, or `None`.
pub fn resolve_tier<R: CapacityBand>(capacity_kw: f64, table: &[R]) -> Option<&R> {
    if !capacity_kw.is_finite() {
        return None;
    }
    table.iter().find(|row| row.contains(capacity_kw))
}

pub fn resolve_capacity_tier(
    capacity_kw: f64,
    table: &[CapacityPricingRow],
) -> Option<&CapacityPricingRow> {
    let tier = resolve_tier(capacity_kw, table);
    debug!(capacity_kw, matched = tier.is_some(), "capacity tier lookup");
    tier
}

pub fn resolve_pipe_tier(
    capacity_kw: f64,
    table: &[PipeDiameterPricingRow],
) -> Option<&PipeDiameterPricingRow> {
    let tier = resolve_tier(capacity_kw, table);
    debug!(capacity_kw, matched = tier.is_some(), "pipe diameter tier lookup");
    tier
}
