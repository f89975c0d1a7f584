//! Registered relation schemas and their base statistics.
//!
//! Read-only once built: the optimiser and estimator only ever look things up,
//! so one catalogue can be shared across concurrent optimisation runs.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::{Attribute, NamedRelation, Relation};

#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    /// Registration order, used for listings and attribute ownership.
    relations: Vec<NamedRelation>,
    index: HashMap<String, usize>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty relation with its base tuple count.
    pub fn create_relation(&mut self, name: &str, tuple_count: u64) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Error::DuplicateRelation(name.to_string()));
        }
        let slot = self.relations.len();
        self.relations
            .push(NamedRelation::new(name, Relation::new(tuple_count)));
        self.index.insert(name.to_string(), slot);
        Ok(())
    }

    /// Declare an attribute on a registered relation. A value count of zero is
    /// stored as one so that selectivities stay well defined.
    pub fn create_attribute(&mut self, relation: &str, name: &str, value_count: u64) -> Result<()> {
        let slot = *self
            .index
            .get(relation)
            .ok_or_else(|| Error::UnknownRelation(relation.to_string()))?;
        let named = &mut self.relations[slot];
        if !named
            .relation
            .add_attribute(Attribute::new(name, value_count.max(1)))
        {
            return Err(Error::DuplicateAttribute {
                relation: relation.to_string(),
                attribute: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn lookup_relation(&self, name: &str) -> Result<&NamedRelation> {
        self.index
            .get(name)
            .map(|&slot| &self.relations[slot])
            .ok_or_else(|| Error::UnknownRelation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(|r| r.name.as_str())
    }

    pub fn relations(&self) -> &[NamedRelation] {
        &self.relations
    }

    /// First registered relation declaring `attribute`.
    pub fn owner_of(&self, attribute: &str) -> Option<&str> {
        self.relations
            .iter()
            .find(|r| r.relation.contains(attribute))
            .map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
