//! Summary of one optimisation run, for audit and regression comparison.
//!
//! Carries fingerprints of the canonical and optimised plans so that two runs
//! over the same input can be checked for identical output.

use serde::{Deserialize, Serialize};

use crate::hash::Hash256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanManifest {
    /// Fingerprint of the estimated canonical plan.
    pub canonical_hash: Hash256,

    /// Fingerprint of the estimated optimised plan.
    pub optimised_hash: Hash256,

    /// Sum of estimated tuple counts over every node of the canonical plan.
    pub canonical_cost: u64,

    /// Same measure for the optimised plan.
    pub optimised_cost: u64,

    /// Estimated tuple count of the final result.
    pub output_tuples: u64,

    /// Engine version string for provenance.
    pub version: String,
}

impl PlanManifest {
    pub fn new(canonical_hash: Hash256, optimised_hash: Hash256) -> Self {
        Self {
            canonical_hash,
            optimised_hash,
            canonical_cost: 0,
            optimised_cost: 0,
            output_tuples: 0,
            version: crate::VERSION.to_string(),
        }
    }

    pub fn with_costs(mut self, canonical_cost: u64, optimised_cost: u64, output_tuples: u64) -> Self {
        self.canonical_cost = canonical_cost;
        self.optimised_cost = optimised_cost;
        self.output_tuples = output_tuples;
        self
    }

    /// Fraction of the canonical cost removed by optimisation (0 when the
    /// canonical plan had no cost to remove).
    pub fn improvement(&self) -> f64 {
        if self.canonical_cost == 0 {
            return 0.0;
        }
        1.0 - self.optimised_cost as f64 / self.canonical_cost as f64
    }
}
