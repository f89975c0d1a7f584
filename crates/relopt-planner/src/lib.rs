#![forbid(unsafe_code)]
//! relopt-planner: canonical plan → estimated, optimised plan.
//!
//! Design:
//! - We reuse `relopt-core::plan::Operator` for both canonical and optimised trees.
//! - This crate adds:
//!     * `cost`: the cardinality estimator (uniform-distribution model)
//!     * `rules`: the optimiser (pushdown, early projection, greedy join order)
//!     * `dsl`: catalogue text, query text, and YAML front-ends
//!     * `explain`: plan listings and a total-cost measure
//!
//! No IO here; callers hand in strings and get plans back.

pub mod cost;
pub mod dsl;
pub mod explain;
pub mod logical;
pub mod rules;

pub use cost::{estimate_plan, Estimator};
pub use dsl::catalogue::parse_catalogue;
pub use dsl::query::parse_query;
pub use dsl::yaml::{parse_yaml_catalogue, parse_yaml_query, ParsedQuery};
pub use dsl::ParseError;
pub use explain::{explain, total_cost};
pub use logical::{Attribute, Catalogue, NamedRelation, Operator, Predicate, Relation};
pub use rules::{optimise, Optimiser};
