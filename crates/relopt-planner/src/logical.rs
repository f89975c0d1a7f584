//! Plan vocabulary re-exported from core, so front-ends and callers only need
//! this crate.

pub use relopt_core::catalogue::Catalogue;
pub use relopt_core::plan::Operator;
pub use relopt_core::predicate::Predicate;
pub use relopt_core::schema::{Attribute, NamedRelation, Relation};
