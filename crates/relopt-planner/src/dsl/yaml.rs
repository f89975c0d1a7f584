//! YAML → Catalogue + canonical plan, for *linear* step lists.
//!
//! Example:
//! ```yaml
//! catalogue:
//!   - name: Employee
//!     tuples: 1000
//!     attributes: [ {name: ESSN, values: 1000}, {name: LNAME, values: 1000} ]
//!   - name: Works_On
//!     tuples: 2000
//!     attributes: [ {name: SSN, values: 1000} ]
//! steps:
//!   - op: scan
//!     relation: Employee
//!   - op: scan
//!     relation: Works_On
//!   - op: select
//!     attribute: ESSN
//!     equals: SSN
//!   - op: project
//!     attributes: [LNAME]
//! ```
//!
//! The first `scan` starts the plan; each later `scan` is combined with the
//! plan so far by a Product, so the result is always left-deep.

use serde::{Deserialize, Serialize};
use serde_yaml;

use relopt_core::catalogue::Catalogue;
use relopt_core::error::Error;
use relopt_core::plan::Operator;
use relopt_core::predicate::Predicate;
use relopt_core::schema::Attribute;

use super::{ParseError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDocument {
    #[serde(default)]
    pub catalogue: Option<Vec<RelationDef>>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub tuples: u64,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub values: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum Step {
    #[serde(rename = "scan")]
    Scan { relation: String },

    #[serde(rename = "select")]
    Select {
        attribute: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        equals: Option<String>,
    },

    #[serde(rename = "project")]
    Project { attributes: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    /// Catalogue embedded in the document, if any.
    pub catalogue: Option<Catalogue>,
    /// Canonical plan; built against the embedded catalogue or the one given.
    pub plan: Operator,
}

fn to_catalogue(defs: &[RelationDef]) -> Result<Catalogue> {
    let mut cat = Catalogue::new();
    for def in defs {
        cat.create_relation(&def.name, def.tuples)?;
        for attr in &def.attributes {
            cat.create_attribute(&def.name, &attr.name, attr.values)?;
        }
    }
    Ok(cat)
}

/// Parse a YAML catalogue: a bare list of relation definitions, or a query
/// document's `catalogue:` section.
pub fn parse_yaml_catalogue(yaml_src: &str) -> Result<Catalogue> {
    if let Ok(defs) = serde_yaml::from_str::<Vec<RelationDef>>(yaml_src) {
        return to_catalogue(&defs);
    }
    let doc: QueryDocument = serde_yaml::from_str(yaml_src)?;
    match doc.catalogue {
        Some(defs) => to_catalogue(&defs),
        None => Err(ParseError::MissingCatalogue),
    }
}

/// Parse a YAML query document. An embedded catalogue takes precedence over
/// `fallback`; one of the two must be present.
pub fn parse_yaml_query(yaml_src: &str, fallback: Option<&Catalogue>) -> Result<ParsedQuery> {
    let doc: QueryDocument = serde_yaml::from_str(yaml_src)?;
    let embedded = doc.catalogue.as_deref().map(to_catalogue).transpose()?;
    let catalogue = match (&embedded, fallback) {
        (Some(cat), _) => cat,
        (None, Some(cat)) => cat,
        (None, None) => return Err(ParseError::MissingCatalogue),
    };

    let mut cur: Option<Operator> = None;
    for (idx, step) in doc.steps.into_iter().enumerate() {
        let step_no = idx + 1;
        cur = Some(match (step, cur) {
            (Step::Scan { relation }, prev) => {
                let repeated = prev
                    .as_ref()
                    .is_some_and(|p| p.base_relations().contains(&relation.as_str()));
                if repeated {
                    return Err(ParseError::step(
                        step_no,
                        format!("relation {relation} is scanned more than once"),
                    ));
                }
                let scan = Operator::scan(catalogue.lookup_relation(&relation)?.clone());
                match prev {
                    None => scan,
                    Some(input) => Operator::product(input, scan),
                }
            }
            (
                Step::Select {
                    attribute,
                    value,
                    equals,
                },
                Some(input),
            ) => {
                let left = Attribute::named(attribute);
                let predicate = match (value, equals) {
                    (Some(v), None) => Predicate::value(left, v),
                    (None, Some(r)) => Predicate::join(left, Attribute::named(r)),
                    _ => {
                        return Err(ParseError::step(
                            step_no,
                            "select needs exactly one of `value` or `equals`",
                        ))
                    }
                };
                Operator::select(input, predicate)
            }
            (Step::Project { attributes }, Some(input)) => {
                if attributes.is_empty() {
                    return Err(Error::EmptyProjection.into());
                }
                Operator::project(input, attributes.into_iter().map(Attribute::named).collect())
            }
            (s, None) => {
                // Any non-scan step without a prior plan is invalid in linear pipelines.
                return Err(ParseError::step(
                    step_no,
                    format!("first step must be 'scan', got {:?}", s),
                ));
            }
        });
    }

    let plan = cur.ok_or_else(|| ParseError::step(0, "empty step list"))?;
    Ok(ParsedQuery {
        catalogue: embedded,
        plan,
    })
}
