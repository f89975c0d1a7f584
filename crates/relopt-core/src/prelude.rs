//! Convenient re-exports for downstream crates.

pub use crate::catalogue::Catalogue;
pub use crate::config::OptimiserConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{plan_fingerprint, Hash256};
pub use crate::manifest::PlanManifest;
pub use crate::plan::Operator;
pub use crate::predicate::Predicate;
pub use crate::schema::{Attribute, NamedRelation, Relation};
