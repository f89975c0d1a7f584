//! relopt: cardinality estimation and heuristic optimisation of relational
//! query plans.
//!
//! This package ties the workspace together for the integration tests and
//! benchmarks; the real work lives in `relopt-core` and `relopt-planner`.

#![forbid(unsafe_code)]

pub use relopt_core as model;
pub use relopt_planner as planner;

pub use relopt_core::prelude::*;
pub use relopt_planner::{
    estimate_plan, explain, optimise, parse_catalogue, parse_query, parse_yaml_catalogue,
    parse_yaml_query, total_cost, Estimator, Optimiser,
};
