//! Cardinality estimation under the uniform-distribution model.
//!
//! The estimator assigns each operator node the relation it is expected to
//! produce: a tuple count plus a distinct-value count per attribute. Equality
//! selectivity is `1 / max(distinct values)` and a matched join key keeps the
//! smaller of its two distinct counts.
//!
//! It never recurses on its own: `estimate` reads the cached outputs of a
//! node's children, so the caller decides the traversal order. Use
//! `estimate_tree` for a one-off bottom-up walk of a whole plan.
//!
//! Value counts are floored at 1 wherever they act as divisors. Tuple counts
//! truncate and may legitimately reach 0.

use relopt_core::error::{Error, Result};
use relopt_core::plan::Operator;
use relopt_core::predicate::Predicate;
use relopt_core::schema::{Attribute, NamedRelation, Relation};

#[derive(Debug, Clone, Copy, Default)]
pub struct Estimator;

impl Estimator {
    pub fn new() -> Self {
        Self
    }

    /// Compute and cache `op`'s output from its (already estimated) children.
    ///
    /// Re-running on a node whose children are unchanged yields an identical
    /// output. Fails only on malformed nodes, e.g. a predicate naming an
    /// attribute its input does not carry.
    pub fn estimate(&self, op: &mut Operator) -> Result<()> {
        let output = self.output_for(op)?;
        op.set_output(output);
        Ok(())
    }

    /// The output `op` would be assigned, without caching it.
    pub fn output_for(&self, op: &Operator) -> Result<Relation> {
        use Operator::*;
        match op {
            Scan { relation, .. } => Ok(scan_output(relation)),
            Select {
                input, predicate, ..
            } => select_output(input.output(), predicate),
            Project {
                input, attributes, ..
            } => project_output(input.output(), attributes),
            Product { left, right, .. } => Ok(product_output(left.output(), right.output())),
            Join {
                left,
                right,
                predicate,
                ..
            } => join_output(left.output(), right.output(), predicate),
        }
    }

    /// Estimate every node of `plan`, children before parents.
    pub fn estimate_tree(&self, plan: &mut Operator) -> Result<()> {
        for child in plan.children_mut() {
            self.estimate_tree(child)?;
        }
        self.estimate(plan)
    }
}

/// One bottom-up estimation pass over a whole plan, e.g. a freshly parsed
/// canonical tree that is about to be displayed.
pub fn estimate_plan(plan: &mut Operator) -> Result<()> {
    Estimator::new().estimate_tree(plan)
}

fn lookup<'a>(input: &'a Relation, attr: &Attribute) -> Result<&'a Attribute> {
    input
        .attribute(&attr.name)
        .ok_or_else(|| Error::UnresolvedAttribute(attr.name.clone()))
}

/// Verbatim copy of the registered schema.
pub fn scan_output(relation: &NamedRelation) -> Relation {
    relation.relation.clone()
}

/// Exactly `attributes`, in order, with the input's recorded value counts.
pub fn project_output(input: &Relation, attributes: &[Attribute]) -> Result<Relation> {
    let mut output = Relation::new(input.tuple_count);
    for attr in attributes {
        output.add_attribute(lookup(input, attr)?.clone());
    }
    Ok(output)
}

pub fn select_output(input: &Relation, predicate: &Predicate) -> Result<Relation> {
    match predicate {
        Predicate::Value { left, .. } => {
            let selected = lookup(input, left)?;
            let tuple_count = input.tuple_count / selected.value_count.max(1);
            let attributes = input
                .attributes
                .iter()
                .map(|a| {
                    if a == selected {
                        a.with_value_count(1)
                    } else {
                        a.clone()
                    }
                })
                .collect();
            Ok(Relation::with_attributes(tuple_count, attributes))
        }
        Predicate::Join { left, right } => {
            let l = lookup(input, left)?;
            let r = lookup(input, right)?;
            let (vl, vr) = (l.value_count.max(1), r.value_count.max(1));
            let tuple_count = input.tuple_count / vl.max(vr);
            let shared = vl.min(vr);
            let attributes = input
                .attributes
                .iter()
                .map(|a| {
                    if a == l || a == r {
                        a.with_value_count(shared)
                    } else {
                        a.clone()
                    }
                })
                .collect();
            Ok(Relation::with_attributes(tuple_count, attributes))
        }
    }
}

/// Cartesian combination: left attributes followed by right attributes.
pub fn product_output(left: &Relation, right: &Relation) -> Relation {
    let attributes = left
        .attributes
        .iter()
        .chain(&right.attributes)
        .cloned()
        .collect();
    Relation::with_attributes(left.tuple_count.saturating_mul(right.tuple_count), attributes)
}

/// Equi-join: the predicate's left attribute must come from `left` and its
/// right attribute from `right`.
pub fn join_output(left: &Relation, right: &Relation, predicate: &Predicate) -> Result<Relation> {
    let (la, ra) = match predicate {
        Predicate::Join { left, right } => (left, right),
        Predicate::Value { .. } => {
            return Err(Error::MalformedPredicate(format!(
                "value predicate {predicate} used as a join condition"
            )))
        }
    };
    let (l, r) = match (left.attribute(&la.name), right.attribute(&ra.name)) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(Error::MalformedPredicate(format!(
                "{predicate} does not span the join operands"
            )))
        }
    };

    let (vl, vr) = (l.value_count.max(1), r.value_count.max(1));
    let tuple_count = left.tuple_count.saturating_mul(right.tuple_count) / vl.max(vr);
    let shared = vl.min(vr);

    let mut output = Relation::new(tuple_count);
    for a in &left.attributes {
        output.attributes.push(if a == l {
            a.with_value_count(shared)
        } else {
            a.clone()
        });
    }
    for a in &right.attributes {
        output.attributes.push(if a == r {
            a.with_value_count(shared)
        } else {
            a.clone()
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(name: &str, tuples: u64, attrs: &[(&str, u64)]) -> Operator {
        let rel = Relation::with_attributes(
            tuples,
            attrs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect(),
        );
        let mut op = Operator::scan(NamedRelation::new(name, rel));
        Estimator::new().estimate(&mut op).unwrap();
        op
    }

    fn vc(rel: &Relation, name: &str) -> u64 {
        rel.attribute(name).unwrap().value_count
    }

    #[test]
    fn scan_copies_registered_schema() {
        let op = scan("Works_On", 2000, &[("PNO", 100), ("SSN", 1000)]);
        assert_eq!(op.output().tuple_count, 2000);
        assert_eq!(vc(op.output(), "PNO"), 100);
        assert_eq!(op.output().arity(), 2);
    }

    #[test]
    fn value_select_divides_by_value_count() {
        let mut op = Operator::select(
            scan("Employee", 1000, &[("BDATE", 30), ("LNAME", 1000)]),
            Predicate::value(Attribute::named("BDATE"), "1957-12-31"),
        );
        Estimator::new().estimate(&mut op).unwrap();
        assert_eq!(op.output().tuple_count, 33);
        assert_eq!(vc(op.output(), "BDATE"), 1);
        assert_eq!(vc(op.output(), "LNAME"), 1000);
    }

    #[test]
    fn value_select_may_estimate_zero_tuples() {
        let mut op = Operator::select(
            scan("Project", 100, &[("PNAME", 1000)]),
            Predicate::value(Attribute::named("PNAME"), "Aquarius"),
        );
        Estimator::new().estimate(&mut op).unwrap();
        assert_eq!(op.output().tuple_count, 0);
        assert_eq!(vc(op.output(), "PNAME"), 1);
    }

    #[test]
    fn attribute_select_uses_max_then_min() {
        let mut op = Operator::select(
            scan("R", 600, &[("a", 20), ("b", 60), ("c", 7)]),
            Predicate::join(Attribute::named("a"), Attribute::named("b")),
        );
        Estimator::new().estimate(&mut op).unwrap();
        let out = op.output();
        assert_eq!(out.tuple_count, 10);
        assert_eq!(vc(out, "a"), 20);
        assert_eq!(vc(out, "b"), 20);
        assert_eq!(vc(out, "c"), 7);
    }

    #[test]
    fn project_keeps_requested_order() {
        let mut op = Operator::project(
            scan("R", 50, &[("a", 5), ("b", 6), ("c", 7)]),
            vec![Attribute::named("c"), Attribute::named("a")],
        );
        Estimator::new().estimate(&mut op).unwrap();
        let names: Vec<_> = op.output().attribute_names().collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(vc(op.output(), "c"), 7);
        assert_eq!(op.output().tuple_count, 50);
    }

    #[test]
    fn project_of_missing_attribute_is_rejected() {
        let mut op = Operator::project(scan("R", 50, &[("a", 5)]), vec![Attribute::named("z")]);
        assert_eq!(
            Estimator::new().estimate(&mut op),
            Err(Error::UnresolvedAttribute("z".into()))
        );
    }

    #[test]
    fn product_multiplies_and_concatenates() {
        let mut op = Operator::product(
            scan("L", 30, &[("a", 3)]),
            scan("R", 40, &[("b", 4), ("c", 5)]),
        );
        Estimator::new().estimate(&mut op).unwrap();
        assert_eq!(op.output().tuple_count, 1200);
        let names: Vec<_> = op.output().attribute_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn join_applies_containment_formula() {
        let mut op = Operator::join(
            scan("Employee", 1000, &[("ESSN", 1000), ("LNAME", 900)]),
            scan("Works_On", 2000, &[("PNO", 100), ("SSN", 800)]),
            Predicate::join(Attribute::named("ESSN"), Attribute::named("SSN")),
        );
        Estimator::new().estimate(&mut op).unwrap();
        let out = op.output();
        assert_eq!(out.tuple_count, 2000);
        assert_eq!(vc(out, "ESSN"), 800);
        assert_eq!(vc(out, "SSN"), 800);
        assert_eq!(vc(out, "LNAME"), 900);
        assert_eq!(out.arity(), 4);
    }

    #[test]
    fn misoriented_join_is_malformed() {
        let mut op = Operator::join(
            scan("L", 10, &[("a", 10)]),
            scan("R", 10, &[("b", 10)]),
            Predicate::join(Attribute::named("b"), Attribute::named("a")),
        );
        assert!(matches!(
            Estimator::new().estimate(&mut op),
            Err(Error::MalformedPredicate(_))
        ));
    }

    #[test]
    fn re_estimation_is_idempotent() {
        let mut op = Operator::join(
            scan("L", 10, &[("a", 3)]),
            scan("R", 12, &[("b", 4)]),
            Predicate::join(Attribute::named("a"), Attribute::named("b")),
        );
        let est = Estimator::new();
        est.estimate(&mut op).unwrap();
        let first = op.output().clone();
        est.estimate(&mut op).unwrap();
        assert_eq!(op.output(), &first);
    }

    #[test]
    fn estimate_tree_walks_bottom_up() {
        let rel = Relation::with_attributes(100, vec![Attribute::new("a", 10)]);
        let mut plan = Operator::select(
            Operator::scan(NamedRelation::new("R", rel)),
            Predicate::value(Attribute::named("a"), "x"),
        );
        Estimator::new().estimate_tree(&mut plan).unwrap();
        assert_eq!(plan.output().tuple_count, 10);
        assert!(plan.children()[0].try_output().is_some());
    }
}
