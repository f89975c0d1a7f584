//! Relational-algebra operator tree.
//!
//! The parser layer produces a canonical, left-deep tree of Scan/Select/
//! Project/Product nodes. The optimiser builds a second, independent tree that
//! may also contain Join nodes. Every node caches the relation the estimator
//! computed for it.

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;
use crate::schema::{Attribute, NamedRelation, Relation};

/// Operator nodes. `output` is `None` until the estimator has visited the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Scan {
        relation: NamedRelation,
        output: Option<Relation>,
    },
    Select {
        input: Box<Operator>,
        predicate: Predicate,
        output: Option<Relation>,
    },
    Project {
        input: Box<Operator>,
        attributes: Vec<Attribute>,
        output: Option<Relation>,
    },
    Product {
        left: Box<Operator>,
        right: Box<Operator>,
        output: Option<Relation>,
    },
    /// Only ever produced by the optimiser. The predicate's left attribute
    /// belongs to `left`, its right attribute to `right`.
    Join {
        left: Box<Operator>,
        right: Box<Operator>,
        predicate: Predicate,
        output: Option<Relation>,
    },
}

impl Operator {
    pub fn scan(relation: NamedRelation) -> Self {
        Operator::Scan {
            relation,
            output: None,
        }
    }

    pub fn select(input: Operator, predicate: Predicate) -> Self {
        Operator::Select {
            input: Box::new(input),
            predicate,
            output: None,
        }
    }

    pub fn project(input: Operator, attributes: Vec<Attribute>) -> Self {
        Operator::Project {
            input: Box::new(input),
            attributes,
            output: None,
        }
    }

    pub fn product(left: Operator, right: Operator) -> Self {
        Operator::Product {
            left: Box::new(left),
            right: Box::new(right),
            output: None,
        }
    }

    pub fn join(left: Operator, right: Operator, predicate: Predicate) -> Self {
        Operator::Join {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
            output: None,
        }
    }

    /// Upper-case operator name, as used in plan listings.
    pub fn kind(&self) -> &'static str {
        use Operator::*;
        match self {
            Scan { .. } => "SCAN",
            Select { .. } => "SELECT",
            Project { .. } => "PROJECT",
            Product { .. } => "PRODUCT",
            Join { .. } => "JOIN",
        }
    }

    /// Child nodes, left to right.
    pub fn children(&self) -> Vec<&Operator> {
        use Operator::*;
        match self {
            Scan { .. } => vec![],
            Select { input, .. } | Project { input, .. } => vec![input.as_ref()],
            Product { left, right, .. } | Join { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Operator> {
        use Operator::*;
        match self {
            Scan { .. } => vec![],
            Select { input, .. } | Project { input, .. } => vec![input.as_mut()],
            Product { left, right, .. } | Join { left, right, .. } => {
                vec![left.as_mut(), right.as_mut()]
            }
        }
    }

    /// The cached estimate, if the estimator has visited this node.
    pub fn try_output(&self) -> Option<&Relation> {
        use Operator::*;
        match self {
            Scan { output, .. }
            | Select { output, .. }
            | Project { output, .. }
            | Product { output, .. }
            | Join { output, .. } => output.as_ref(),
        }
    }

    /// The cached estimate.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been estimated yet; reading an output
    /// before estimation is a programming error.
    pub fn output(&self) -> &Relation {
        match self.try_output() {
            Some(rel) => rel,
            None => panic!("{} node read before estimation", self.kind()),
        }
    }

    pub fn set_output(&mut self, relation: Relation) {
        use Operator::*;
        match self {
            Scan { output, .. }
            | Select { output, .. }
            | Project { output, .. }
            | Product { output, .. }
            | Join { output, .. } => *output = Some(relation),
        }
    }

    /// Names of the base relations scanned under this node, left to right.
    pub fn base_relations(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_base_relations(&mut names);
        names
    }

    fn collect_base_relations<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Operator::Scan { relation, .. } => names.push(relation.name.as_str()),
            _ => {
                for child in self.children() {
                    child.collect_base_relations(names);
                }
            }
        }
    }

    /// Number of nodes in the subtree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Operator::node_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(name: &str, attrs: &[&str]) -> Operator {
        let rel = Relation::with_attributes(
            10,
            attrs.iter().map(|a| Attribute::new(*a, 10)).collect(),
        );
        Operator::scan(NamedRelation::new(name, rel))
    }

    #[test]
    fn arity_and_base_relations() {
        let plan = Operator::product(
            Operator::product(scan("A", &["a"]), scan("B", &["b"])),
            scan("C", &["c"]),
        );
        assert_eq!(plan.children().len(), 2);
        assert_eq!(plan.base_relations(), vec!["A", "B", "C"]);
        assert_eq!(plan.node_count(), 5);
    }

    #[test]
    fn output_is_cached_once_set() {
        let mut node = scan("A", &["a"]);
        assert!(node.try_output().is_none());
        node.set_output(Relation::new(3));
        assert_eq!(node.output().tuple_count, 3);
    }

    #[test]
    #[should_panic(expected = "read before estimation")]
    fn reading_unestimated_output_panics() {
        let node = scan("A", &["a"]);
        let _ = node.output();
    }
}
