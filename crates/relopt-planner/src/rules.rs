//! Heuristic plan rewriting: selection pushdown, early projection, and greedy
//! cost-based join ordering.
//!
//! The optimiser consumes a canonical left-deep plan and builds a brand-new,
//! fully estimated tree. Canonical nodes are never mutated; predicates and
//! attributes are cloned whenever they are reattached.
//!
//! All per-run state (required attributes, pending predicates, projection
//! flag) lives in a [`Pass`] that is created fresh for every call to
//! [`Optimiser::optimise`] and threaded through the recursion, so one
//! `Optimiser` can serve any number of runs, including concurrent ones.

use std::collections::HashMap;

use relopt_core::catalogue::Catalogue;
use relopt_core::config::OptimiserConfig;
use relopt_core::error::{Error, Result};
use relopt_core::plan::Operator;
use relopt_core::predicate::Predicate;
use relopt_core::schema::Attribute;

use crate::cost::{join_output, Estimator};

/// Optimise `plan` against `catalogue` with the default configuration.
pub fn optimise(catalogue: &Catalogue, plan: &Operator) -> Result<Operator> {
    Optimiser::new(catalogue).optimise(plan)
}

/// Reference counts of attributes still needed by an unapplied predicate or
/// by an enclosing projection.
#[derive(Debug, Default, Clone)]
pub struct RequiredAttributes {
    counts: HashMap<String, usize>,
}

impl RequiredAttributes {
    pub fn acquire(&mut self, attr: &Attribute) {
        *self.counts.entry(attr.name.clone()).or_insert(0) += 1;
    }

    /// Drop one reference; the entry disappears when its count reaches zero.
    pub fn release(&mut self, attr: &Attribute) {
        if let Some(count) = self.counts.get_mut(&attr.name) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&attr.name);
            }
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// State of one optimisation run.
#[derive(Debug, Default)]
struct Pass {
    required: RequiredAttributes,
    /// Unapplied `attr = literal` predicates, first-seen order.
    pending_values: Vec<Predicate>,
    /// Unapplied `attr = attr` predicates, first-seen order.
    pending_joins: Vec<Predicate>,
    /// True while below at least one canonical Project.
    projection_requested: bool,
}

/// A partially optimised subtree and the base relations it covers.
#[derive(Debug)]
struct Fragment {
    relations: Vec<String>,
    plan: Operator,
}

impl Fragment {
    fn new(plan: Operator) -> Self {
        let relations = plan.base_relations().into_iter().map(String::from).collect();
        Self { relations, plan }
    }
}

pub struct Optimiser<'a> {
    catalogue: &'a Catalogue,
    config: OptimiserConfig,
    estimator: Estimator,
}

impl<'a> Optimiser<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self::with_config(catalogue, OptimiserConfig::default())
    }

    pub fn with_config(catalogue: &'a Catalogue, config: OptimiserConfig) -> Self {
        Self {
            catalogue,
            config,
            estimator: Estimator::new(),
        }
    }

    /// Rewrite `plan` into an equivalent, cheaper, fully estimated plan.
    ///
    /// On error the run is abandoned and no partial plan is returned; the
    /// canonical plan stays the only usable result.
    pub fn optimise(&self, plan: &Operator) -> Result<Operator> {
        let mut pass = Pass::default();
        let optimised = self.visit(plan, &mut pass)?;
        self.check_drained(&pass, &optimised)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            nodes = optimised.node_count(),
            tuples = optimised.output().tuple_count,
            "optimisation finished"
        );

        Ok(optimised)
    }

    fn visit(&self, node: &Operator, pass: &mut Pass) -> Result<Operator> {
        use Operator::*;
        match node {
            Project {
                input, attributes, ..
            } => self.visit_project(input, attributes, pass),
            Select {
                input, predicate, ..
            } => {
                for attr in predicate.attributes() {
                    pass.required.acquire(attr);
                }
                if predicate.is_value_predicate() {
                    pass.pending_values.push(predicate.clone());
                } else {
                    pass.pending_joins.push(predicate.clone());
                }
                // Re-materialised lower down, at its scan or as a join.
                self.visit(input, pass)
            }
            Scan { relation, .. } => self.visit_scan(&relation.name, pass),
            Product { .. } => {
                let mut fragments = Vec::new();
                self.collect_fragments(node, pass, &mut fragments)?;
                self.combine_fragments(fragments, pass)
            }
            Join { .. } => Err(Error::Invariant(
                "canonical plans must not contain joins".to_string(),
            )),
        }
    }

    fn visit_project(
        &self,
        input: &Operator,
        attributes: &[Attribute],
        pass: &mut Pass,
    ) -> Result<Operator> {
        if attributes.is_empty() {
            return Err(Error::EmptyProjection);
        }
        for attr in attributes {
            pass.required.acquire(attr);
        }

        let saved = pass.projection_requested;
        pass.projection_requested = true;
        let inner = self.visit(input, pass);
        pass.projection_requested = saved;
        let inner = inner?;

        let schema = inner.output();
        let mut keep: Vec<Attribute> = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let found = schema
                .attribute(&attr.name)
                .ok_or_else(|| Error::UnresolvedAttribute(attr.name.clone()))?;
            if !keep.contains(found) {
                keep.push(found.clone());
            }
        }
        // Attributes an enclosing projection or pending predicate still needs.
        for attr in &schema.attributes {
            if !keep.contains(attr) && pass.required.contains(&attr.name) {
                keep.push(attr.clone());
            }
        }

        let output = if keep.len() < schema.arity() {
            let mut project = Operator::project(inner, keep);
            self.estimator.estimate(&mut project)?;
            project
        } else {
            inner
        };

        for attr in attributes {
            pass.required.release(attr);
        }
        Ok(output)
    }

    fn visit_scan(&self, name: &str, pass: &mut Pass) -> Result<Operator> {
        let registered = self.catalogue.lookup_relation(name)?;
        let mut plan = Operator::scan(registered.clone());
        self.estimator.estimate(&mut plan)?;

        let schema = &registered.relation;
        let mut i = 0;
        while i < pass.pending_values.len() {
            if !schema.contains(&pass.pending_values[i].left_attribute().name) {
                i += 1;
                continue;
            }
            let predicate = pass.pending_values.remove(i);

            #[cfg(feature = "tracing")]
            tracing::debug!(%predicate, relation = name, "pushed selection to scan");

            pass.required.release(predicate.left_attribute());
            plan = Operator::select(plan, predicate);
            self.estimator.estimate(&mut plan)?;
        }

        // `a = b` with both sides in this relation is a plain selection too.
        let mut i = 0;
        while i < pass.pending_joins.len() {
            let local = pass.pending_joins[i]
                .attributes()
                .iter()
                .all(|a| schema.contains(&a.name));
            if !local {
                i += 1;
                continue;
            }
            let predicate = pass.pending_joins.remove(i);
            plan = self.apply_selection(plan, predicate, pass)?;
        }

        self.narrow(plan, pass)
    }

    /// Flatten a cluster of nested products into independently optimised fragments.
    fn collect_fragments(
        &self,
        node: &Operator,
        pass: &mut Pass,
        fragments: &mut Vec<Fragment>,
    ) -> Result<()> {
        match node {
            Operator::Product { left, right, .. } => {
                self.collect_fragments(left, pass, fragments)?;
                self.collect_fragments(right, pass, fragments)
            }
            other => {
                let plan = self.visit(other, pass)?;
                fragments.push(Fragment::new(plan));
                Ok(())
            }
        }
    }

    /// Greedily join fragments along pending join predicates, cheapest first,
    /// then fall back to cartesian products for whatever remains unconnected.
    fn combine_fragments(&self, mut fragments: Vec<Fragment>, pass: &mut Pass) -> Result<Operator> {
        loop {
            self.apply_local_joins(&mut fragments, pass)?;

            // (predicate index, left fragment, right fragment, oriented predicate, cost)
            let mut best: Option<(usize, usize, usize, Predicate, u64)> = None;
            for (idx, predicate) in pass.pending_joins.iter().enumerate() {
                let (left, right) = match predicate {
                    Predicate::Join { left, right } => (left, right),
                    Predicate::Value { .. } => continue,
                };
                let (Some(fl), Some(fr)) = (
                    self.resolve(&fragments, left)?,
                    self.resolve(&fragments, right)?,
                ) else {
                    continue;
                };
                if fl == fr {
                    continue;
                }
                // Earlier fragment goes on the left; flip the predicate to match.
                let (li, ri, oriented) = if fl < fr {
                    (fl, fr, predicate.clone())
                } else {
                    (fr, fl, predicate.swapped())
                };
                let trial = join_output(
                    fragments[li].plan.output(),
                    fragments[ri].plan.output(),
                    &oriented,
                )?;

                #[cfg(feature = "tracing")]
                tracing::trace!(predicate = %oriented, tuples = trial.tuple_count, "join candidate");

                let better = match &best {
                    Some((.., cost)) => trial.tuple_count < *cost,
                    None => true,
                };
                if better {
                    best = Some((idx, li, ri, oriented, trial.tuple_count));
                }
            }

            let Some((idx, li, ri, predicate, _cost)) = best else {
                break;
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(%predicate, tuples = _cost, "joining fragments");

            pass.pending_joins.remove(idx);
            for attr in predicate.attributes() {
                pass.required.release(attr);
            }
            // ri > li, so removing ri first leaves li in place.
            let right = fragments.remove(ri);
            let left = fragments.remove(li);
            let mut join = Operator::join(left.plan, right.plan, predicate);
            self.estimator.estimate(&mut join)?;
            let plan = self.narrow(join, pass)?;

            let mut relations = left.relations;
            relations.extend(right.relations);
            fragments.insert(li, Fragment { relations, plan });
        }

        let mut rest = fragments.into_iter();
        let mut acc = match rest.next() {
            Some(first) => first.plan,
            None => return Err(Error::Invariant("product without operands".to_string())),
        };
        for next in rest {
            #[cfg(feature = "tracing")]
            tracing::debug!(relations = ?next.relations, "no join predicate; falling back to product");

            acc = Operator::product(acc, next.plan);
            self.estimator.estimate(&mut acc)?;
        }
        Ok(acc)
    }

    /// Apply pending join predicates whose two sides live in the same fragment.
    fn apply_local_joins(&self, fragments: &mut [Fragment], pass: &mut Pass) -> Result<()> {
        let mut i = 0;
        while i < pass.pending_joins.len() {
            let predicate = &pass.pending_joins[i];
            let mut owners = Vec::with_capacity(2);
            for attr in predicate.attributes() {
                owners.push(self.resolve(fragments, attr)?);
            }
            let target = match owners.as_slice() {
                [Some(a), Some(b)] if a == b => *a,
                _ => {
                    i += 1;
                    continue;
                }
            };
            let predicate = pass.pending_joins.remove(i);
            let fragment = &mut fragments[target];
            let plan = std::mem::replace(&mut fragment.plan, placeholder());
            fragment.plan = self.apply_selection(plan, predicate, pass)?;
        }
        Ok(())
    }

    fn apply_selection(&self, plan: Operator, predicate: Predicate, pass: &mut Pass) -> Result<Operator> {
        #[cfg(feature = "tracing")]
        tracing::debug!(%predicate, "applying join predicate as selection");

        for attr in predicate.attributes() {
            pass.required.release(attr);
        }
        let mut select = Operator::select(plan, predicate);
        self.estimator.estimate(&mut select)?;
        self.narrow(select, pass)
    }

    /// Index of the live fragment covering the relation that owns `attr`.
    fn resolve(&self, fragments: &[Fragment], attr: &Attribute) -> Result<Option<usize>> {
        for (i, fragment) in fragments.iter().enumerate() {
            for relation in &fragment.relations {
                if self
                    .catalogue
                    .lookup_relation(relation)?
                    .relation
                    .contains(&attr.name)
                {
                    return Ok(Some(i));
                }
            }
        }
        Ok(None)
    }

    /// Early projection: keep only attributes some consumer still needs.
    ///
    /// A fragment that no longer contributes any attribute is kept behind a
    /// zero-width projection so its cardinality still counts in the result.
    fn narrow(&self, plan: Operator, pass: &Pass) -> Result<Operator> {
        if !self.config.early_projection || !pass.projection_requested {
            return Ok(plan);
        }
        let schema = plan.output();
        let keep: Vec<Attribute> = schema
            .attributes
            .iter()
            .filter(|a| pass.required.contains(&a.name))
            .cloned()
            .collect();
        if keep.len() == schema.arity() {
            return Ok(plan);
        }

        #[cfg(feature = "tracing")]
        {
            if keep.is_empty() {
                tracing::debug!(
                    relations = ?plan.base_relations(),
                    "fragment retains no attributes; keeping zero-width projection"
                );
            } else {
                tracing::trace!(kept = keep.len(), dropped = schema.arity() - keep.len(), "early projection");
            }
        }

        let mut project = Operator::project(plan, keep);
        self.estimator.estimate(&mut project)?;
        Ok(project)
    }

    /// Every predicate must have been applied by the end of the run.
    fn check_drained(&self, pass: &Pass, plan: &Operator) -> Result<()> {
        if let Some(predicate) = pass.pending_values.first() {
            return Err(Error::UnresolvedAttribute(
                predicate.left_attribute().name.clone(),
            ));
        }
        if let Some(predicate) = pass.pending_joins.first() {
            let covered = plan.base_relations();
            let mut missing = predicate.left_attribute();
            for attr in predicate.attributes() {
                let owned = covered.iter().any(|r| {
                    self.catalogue
                        .lookup_relation(r)
                        .map(|rel| rel.relation.contains(&attr.name))
                        .unwrap_or(false)
                });
                if !owned {
                    missing = attr;
                    break;
                }
            }
            return Err(Error::UnresolvedAttribute(missing.name.clone()));
        }
        Ok(())
    }
}

/// Stand-in left behind while a fragment's plan is moved out and rewrapped.
fn placeholder() -> Operator {
    Operator::scan(relopt_core::schema::NamedRelation::new(
        "",
        relopt_core::schema::Relation::default(),
    ))
}
