//! Equality predicates used by selections and joins.

use serde::{Deserialize, Serialize};

use crate::schema::Attribute;

/// An equality test, either against a constant or between two attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// `attribute = "literal"`
    Value { left: Attribute, value: String },
    /// `left = right`
    Join { left: Attribute, right: Attribute },
}

impl Predicate {
    pub fn value(left: Attribute, value: impl Into<String>) -> Self {
        Predicate::Value {
            left,
            value: value.into(),
        }
    }

    pub fn join(left: Attribute, right: Attribute) -> Self {
        Predicate::Join { left, right }
    }

    pub fn is_value_predicate(&self) -> bool {
        matches!(self, Predicate::Value { .. })
    }

    pub fn left_attribute(&self) -> &Attribute {
        match self {
            Predicate::Value { left, .. } | Predicate::Join { left, .. } => left,
        }
    }

    pub fn right_attribute(&self) -> Option<&Attribute> {
        match self {
            Predicate::Value { .. } => None,
            Predicate::Join { right, .. } => Some(right),
        }
    }

    /// Every attribute the predicate reads, left first.
    pub fn attributes(&self) -> Vec<&Attribute> {
        match self {
            Predicate::Value { left, .. } => vec![left],
            Predicate::Join { left, right } => vec![left, right],
        }
    }

    /// Join predicate with its sides exchanged; value predicates are returned as-is.
    pub fn swapped(&self) -> Self {
        match self {
            Predicate::Value { .. } => self.clone(),
            Predicate::Join { left, right } => Predicate::Join {
                left: right.clone(),
                right: left.clone(),
            },
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Value { left, value } => write!(f, "{}=\"{}\"", left, value),
            Predicate::Join { left, right } => write!(f, "{}={}", left, right),
        }
    }
}
