//! End-to-end integration tests

use relopt::{
    estimate_plan, explain, parse_catalogue, parse_query, parse_yaml_query, plan_fingerprint,
    total_cost, Attribute, Catalogue, Error, Operator, Optimiser, OptimiserConfig, Predicate,
};
use std::collections::BTreeSet;

const CATALOGUE: &str = include_str!("../data/cat.txt");
const QUERY: &str = include_str!("../data/q.txt");
const QUERY_YAML: &str = include_str!("../data/q.yaml");

fn catalogue() -> Catalogue {
    parse_catalogue(CATALOGUE).expect("Failed to parse catalogue")
}

fn names(plan: &Operator) -> BTreeSet<String> {
    plan.output()
        .attributes
        .iter()
        .map(|a| a.name.clone())
        .collect()
}

/// Every Select node in the plan, with the base relations below it.
fn selects(plan: &Operator) -> Vec<(String, Vec<String>)> {
    let mut out = Vec::new();
    if let Operator::Select { input, predicate, .. } = plan {
        let below = input.base_relations().into_iter().map(String::from).collect();
        out.push((predicate.to_string(), below));
    }
    for child in plan.children() {
        out.extend(selects(child));
    }
    out
}

/// Join nodes in post-order: innermost first.
fn joins(plan: &Operator) -> Vec<(Predicate, Vec<String>)> {
    let mut out = Vec::new();
    for child in plan.children() {
        out.extend(joins(child));
    }
    if let Operator::Join { predicate, .. } = plan {
        let covered = plan.base_relations().into_iter().map(String::from).collect();
        out.push((predicate.clone(), covered));
    }
    out
}

fn count_kind(plan: &Operator, kind: &str) -> usize {
    let own = usize::from(plan.kind() == kind);
    own + plan.children().into_iter().map(|c| count_kind(c, kind)).sum::<usize>()
}

#[test]
fn test_employee_project_scenario() {
    let cat = catalogue();
    let canonical = parse_query(QUERY, &cat).expect("Failed to parse query");
    let optimised = Optimiser::new(&cat)
        .optimise(&canonical)
        .expect("Optimisation failed");

    // Value selects sit directly on their scans.
    let sel = selects(&optimised);
    assert_eq!(sel.len(), 2, "{}", explain(&optimised));
    for (predicate, below) in &sel {
        let expected = if predicate.starts_with("PNAME") {
            "Project"
        } else {
            assert!(predicate.starts_with("BDATE"), "unexpected select {predicate}");
            "Employee"
        };
        assert_eq!(below, &vec![expected.to_string()]);
    }

    // Works_On ⋈ σ(Project) is the cheapest pair and goes first.
    let js = joins(&optimised);
    assert_eq!(js.len(), 2);
    assert_eq!(
        js[0].0,
        Predicate::join(Attribute::named("PNO"), Attribute::named("PNUMBER"))
    );
    assert_eq!(js[0].1, vec!["Works_On", "Project"]);
    assert_eq!(
        js[1].0,
        Predicate::join(Attribute::named("ESSN"), Attribute::named("SSN"))
    );
    assert_eq!(js[1].1, vec!["Employee", "Works_On", "Project"]);
    assert_eq!(count_kind(&optimised, "PRODUCT"), 0);

    // Output schema is exactly the requested attributes, in order.
    let out: Vec<_> = optimised.output().attribute_names().collect();
    assert_eq!(out, vec!["LNAME", "SSN"]);
}

#[test]
fn test_optimised_plan_is_cheaper() {
    let cat = catalogue();
    let mut canonical = parse_query(QUERY, &cat).unwrap();
    let optimised = Optimiser::new(&cat).optimise(&canonical).unwrap();
    estimate_plan(&mut canonical).unwrap();

    assert!(total_cost(&optimised) < total_cost(&canonical));
    // Canonical: 1000 × 2000 × 100 before any filter.
    let Operator::Project { input, .. } = &canonical else {
        panic!("canonical plan should end in a projection");
    };
    let mut node: &Operator = input;
    while let Operator::Select { input, .. } = node {
        node = input;
    }
    assert_eq!(node.output().tuple_count, 200_000_000);
}

#[test]
fn test_optimisation_is_deterministic() {
    let cat = catalogue();
    let canonical = parse_query(QUERY, &cat).unwrap();
    let optimiser = Optimiser::new(&cat);
    let first = optimiser.optimise(&canonical).unwrap();
    let second = optimiser.optimise(&canonical).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        plan_fingerprint(&first).unwrap(),
        plan_fingerprint(&second).unwrap()
    );
}

#[test]
fn test_canonical_plan_is_left_untouched() {
    let cat = catalogue();
    let canonical = parse_query(QUERY, &cat).unwrap();
    let before = plan_fingerprint(&canonical).unwrap();
    let _ = Optimiser::new(&cat).optimise(&canonical).unwrap();
    assert_eq!(plan_fingerprint(&canonical).unwrap(), before);
    assert!(canonical.try_output().is_none());
}

#[test]
fn test_text_and_yaml_front_ends_agree() {
    let cat = catalogue();
    let from_text = parse_query(QUERY, &cat).unwrap();
    let parsed = parse_yaml_query(QUERY_YAML, None).unwrap();
    assert_eq!(
        plan_fingerprint(&from_text).unwrap(),
        plan_fingerprint(&parsed.plan).unwrap()
    );
    let embedded = parsed.catalogue.expect("document embeds its catalogue");
    assert!(embedded.relation_names().eq(cat.relation_names()));
}

#[test]
fn test_schema_equivalence_across_queries() {
    let cat = catalogue();
    let queries = [
        "SELECT LNAME FROM Employee WHERE BDATE = \"1957-12-31\"",
        "SELECT * FROM Employee, Works_On WHERE ESSN = SSN",
        "SELECT PNAME, LNAME FROM Employee, Works_On, Project WHERE ESSN = SSN AND PNO = PNUMBER",
        "SELECT * FROM Works_On, Project",
        "SELECT PNAME FROM Employee, Project",
        QUERY,
    ];
    for early in [true, false] {
        let config = OptimiserConfig {
            early_projection: early,
            ..Default::default()
        };
        let optimiser = Optimiser::with_config(&cat, config);
        for q in queries {
            let mut canonical = parse_query(q, &cat).unwrap();
            let optimised = optimiser.optimise(&canonical).unwrap();
            estimate_plan(&mut canonical).unwrap();
            assert_eq!(names(&optimised), names(&canonical), "query: {q}");
        }
    }
}

#[test]
fn test_early_projection_narrows_intermediates() {
    let cat = catalogue();
    let canonical = parse_query(QUERY, &cat).unwrap();

    let narrow = Optimiser::new(&cat).optimise(&canonical).unwrap();
    let wide = Optimiser::with_config(
        &cat,
        OptimiserConfig {
            early_projection: false,
            ..Default::default()
        },
    )
    .optimise(&canonical)
    .unwrap();

    assert!(count_kind(&narrow, "PROJECT") > 1);
    assert_eq!(count_kind(&wide, "PROJECT"), 1);
    // Join order does not depend on projection.
    let order = |p: &Operator| -> Vec<String> {
        joins(p).into_iter().map(|(pred, _)| pred.to_string()).collect()
    };
    assert_eq!(order(&narrow), order(&wide));
    assert_eq!(names(&narrow), names(&wide));
}

#[test]
fn test_unresolved_predicate_is_an_error() {
    let mut cat = catalogue();
    cat.create_relation("Dept", 10).unwrap();
    cat.create_attribute("Dept", "DNUM", 10).unwrap();

    // DNUM exists in the catalogue but not under this FROM list.
    let plan = Operator::select(
        Operator::product(
            Operator::scan(cat.lookup_relation("Employee").unwrap().clone()),
            Operator::scan(cat.lookup_relation("Works_On").unwrap().clone()),
        ),
        Predicate::join(Attribute::named("ESSN"), Attribute::named("DNUM")),
    );
    assert_eq!(
        Optimiser::new(&cat).optimise(&plan),
        Err(Error::UnresolvedAttribute("DNUM".into()))
    );
}

#[test]
fn test_estimates_match_uniform_model() {
    let cat = catalogue();
    let mut plan = parse_query(
        "SELECT * FROM Employee, Works_On WHERE BDATE = \"1957-12-31\"",
        &cat,
    )
    .unwrap();
    estimate_plan(&mut plan).unwrap();
    // 1000 × 2000 / 1000 distinct birth dates.
    assert_eq!(plan.output().tuple_count, 2000);
    assert_eq!(plan.output().attribute("BDATE").unwrap().value_count, 1);
    assert_eq!(plan.output().attribute("PNO").unwrap().value_count, 100);
}
