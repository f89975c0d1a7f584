#![forbid(unsafe_code)]
//! relopt-core: the relational-algebra vocabulary shared by every crate.
//!
//! - `schema`: attributes and relations with cardinality metadata
//! - `predicate`: equality predicates (value and join)
//! - `plan`: the operator tree, with per-node cached estimates
//! - `catalogue`: registered base relations
//! - `config`, `error`, `hash`, `manifest`: ambient plumbing
//!
//! No IO and no logging here; parsing and optimisation live in `relopt-planner`.

pub mod catalogue;
pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod plan;
pub mod predicate;
pub mod prelude;
pub mod schema;

pub use error::{Error, Result};

/// Crate version, recorded in manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
