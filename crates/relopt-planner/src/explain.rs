//! Plan listings for diagnostics.
//!
//! Read-only: nodes are printed with whatever estimate they carry, and
//! `unestimated` where the estimator has not visited them.

use std::fmt::Write as _;

use relopt_core::plan::Operator;
use relopt_core::schema::Relation;

/// Render `plan` as an indented tree, one node per line.
pub fn explain(plan: &Operator) -> String {
    let mut out = String::new();
    format_node(plan, 0, &mut out);
    out
}

fn format_node(plan: &Operator, indent: usize, out: &mut String) {
    let prefix = "  ".repeat(indent);
    let label = match plan {
        Operator::Scan { relation, .. } => format!("SCAN {}", relation.name),
        Operator::Select { predicate, .. } => format!("SELECT [{}]", predicate),
        Operator::Project { attributes, .. } => {
            let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
            format!("PROJECT [{}]", names.join(","))
        }
        Operator::Product { .. } => "PRODUCT".to_string(),
        Operator::Join { predicate, .. } => format!("JOIN [{}]", predicate),
    };
    let _ = writeln!(out, "{}{}  {}", prefix, label, describe(plan.try_output()));
    for child in plan.children() {
        format_node(child, indent + 1, out);
    }
}

fn describe(output: Option<&Relation>) -> String {
    match output {
        Some(rel) => {
            let attrs: Vec<_> = rel
                .attributes
                .iter()
                .map(|a| format!("{}:{}", a.name, a.value_count))
                .collect();
            format!("tuples={} [{}]", rel.tuple_count, attrs.join(", "))
        }
        None => "unestimated".to_string(),
    }
}

/// Sum of estimated tuple counts over every estimated node: the total size of
/// all intermediate results the plan would materialise.
pub fn total_cost(plan: &Operator) -> u64 {
    let own = plan.try_output().map_or(0, |rel| rel.tuple_count);
    plan.children()
        .into_iter()
        .map(total_cost)
        .fold(own, u64::saturating_add)
}
