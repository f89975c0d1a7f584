use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    #[error("unresolved attribute: {0}")]
    UnresolvedAttribute(String),

    #[error("projection would retain no attributes")]
    EmptyProjection,

    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("relation already registered: {0}")]
    DuplicateRelation(String),

    #[error("attribute {attribute} already declared on relation {relation}")]
    DuplicateAttribute { relation: String, attribute: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}
