//! Relation schemas with cardinality metadata. Pure data; no statistics beyond
//! a tuple count and a distinct-value count per attribute.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named column plus its estimated number of distinct values.
///
/// Identity is by name only: the value count is metadata that changes as the
/// attribute flows through operators, so two attributes with the same name
/// compare equal regardless of their counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value_count: u64,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value_count: u64) -> Self {
        Self {
            name: name.into(),
            value_count,
        }
    }

    /// An attribute reference as it appears in predicates and projection lists,
    /// before any value count is known.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// Same attribute carrying a different value count.
    pub fn with_value_count(&self, value_count: u64) -> Self {
        Self::new(self.name.clone(), value_count)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Estimated (or registered) relation: tuple count plus ordered attributes.
///
/// Equality compares the full estimate, value counts included, so that two
/// estimator runs can be checked for identical output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relation {
    pub tuple_count: u64,
    pub attributes: Vec<Attribute>,
}

impl Relation {
    pub fn new(tuple_count: u64) -> Self {
        Self {
            tuple_count,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(tuple_count: u64, attributes: Vec<Attribute>) -> Self {
        Self {
            tuple_count,
            attributes,
        }
    }

    /// Append an attribute. Returns false (and leaves the schema untouched)
    /// if an attribute with that name is already present.
    pub fn add_attribute(&mut self, attribute: Attribute) -> bool {
        if self.contains(&attribute.name) {
            return false;
        }
        self.attributes.push(attribute);
        true
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn arity(&self) -> usize {
        self.attributes.len()
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.tuple_count == other.tuple_count
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| a.name == b.name && a.value_count == b.value_count)
    }
}

impl Eq for Relation {}

/// A relation whose schema is registered in the catalogue. Only scans carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRelation {
    pub name: String,
    pub relation: Relation,
}

impl NamedRelation {
    pub fn new(name: impl Into<String>, relation: Relation) -> Self {
        Self {
            name: name.into(),
            relation,
        }
    }

    pub fn tuple_count(&self) -> u64 {
        self.relation.tuple_count
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.relation.attributes
    }
}
