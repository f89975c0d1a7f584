//! SQL query text → canonical plan.
//!
//! ```text
//! SELECT LNAME, SSN
//! FROM Employee, Works_On, Project
//! WHERE PNAME = "Aquarius" AND PNUMBER = PNO AND ESSN = SSN
//! ```
//!
//! Text is parsed with `sqlparser` (MySQL dialect, so `"..."` is a string)
//! and the resulting `SELECT` is restricted to what the algebra can express:
//! a comma-separated FROM list of plain relation names, and a WHERE clause
//! that is a conjunction of equalities. Literal operands make value
//! predicates; column operands make attribute equalities.
//!
//! The canonical plan is built as: FROM relations combined left-deep by
//! Product, one Select per conjunct (first conjunct innermost), then a
//! Project over the SELECT list unless it is `*`.

use sqlparser::ast::{BinaryOperator, Expr, SelectItem, SetExpr, Statement, TableFactor, Value};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser as SqlParser;

use relopt_core::catalogue::Catalogue;
use relopt_core::error::Error;
use relopt_core::plan::Operator;
use relopt_core::predicate::Predicate;
use relopt_core::schema::Attribute;

use super::{ParseError, Result};

/// Parsed query before any catalogue lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// `None` for `SELECT *`.
    pub projection: Option<Vec<String>>,
    pub relations: Vec<String>,
    pub conditions: Vec<Predicate>,
}

/// One side of an equality in the WHERE clause.
enum Operand {
    Attribute(String),
    Value(String),
}

/// Parse query text without consulting a catalogue.
pub fn parse_query_text(src: &str) -> Result<Query> {
    let mut statements = SqlParser::parse_sql(&MySqlDialect {}, src)?;
    if statements.len() != 1 {
        return Err(ParseError::syntax(
            1,
            format!("expected one statement, found {}", statements.len()),
        ));
    }
    let Some(Statement::Query(query)) = statements.pop() else {
        return Err(ParseError::syntax(1, "only SELECT queries are supported"));
    };
    let select = match *query.body {
        SetExpr::Select(select) => select,
        other => {
            return Err(ParseError::syntax(
                1,
                format!("unsupported query body: {other}"),
            ))
        }
    };
    if select.distinct.is_some() || select.having.is_some() {
        return Err(ParseError::syntax(1, "DISTINCT and HAVING are not supported"));
    }

    let projection = projection_list(&select.projection)?;

    let mut relations: Vec<String> = Vec::with_capacity(select.from.len());
    for table in &select.from {
        if !table.joins.is_empty() {
            return Err(ParseError::syntax(
                1,
                "explicit JOIN is not supported; list relations in FROM and join in WHERE",
            ));
        }
        let name = match &table.relation {
            TableFactor::Table {
                name, alias: None, ..
            } => name.to_string(),
            other => {
                return Err(ParseError::syntax(
                    1,
                    format!("expected a relation name in FROM, found {other}"),
                ))
            }
        };
        if relations.contains(&name) {
            return Err(ParseError::syntax(
                1,
                format!("relation {name} appears more than once in FROM"),
            ));
        }
        relations.push(name);
    }

    let mut conditions = Vec::new();
    if let Some(selection) = &select.selection {
        collect_conditions(selection, &mut conditions)?;
    }

    Ok(Query {
        projection,
        relations,
        conditions,
    })
}

fn projection_list(items: &[SelectItem]) -> Result<Option<Vec<String>>> {
    if let [SelectItem::Wildcard(_)] = items {
        return Ok(None);
    }
    if items.is_empty() {
        return Err(Error::EmptyProjection.into());
    }
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::UnnamedExpr(expr) => match attribute_name(expr) {
                Some(name) => names.push(name),
                None => {
                    return Err(ParseError::syntax(
                        1,
                        format!("expected an attribute in SELECT list, found {expr}"),
                    ))
                }
            },
            other => {
                return Err(ParseError::syntax(
                    1,
                    format!("unsupported SELECT item: {other}"),
                ))
            }
        }
    }
    Ok(Some(names))
}

/// Flatten an `AND` tree of equalities, left to right.
fn collect_conditions(expr: &Expr, out: &mut Vec<Predicate>) -> Result<()> {
    match expr {
        Expr::Nested(inner) => collect_conditions(inner, out),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            collect_conditions(left, out)?;
            collect_conditions(right, out)
        }
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => {
            let predicate = match (operand(left)?, operand(right)?) {
                (Operand::Attribute(l), Operand::Attribute(r)) => {
                    Predicate::join(Attribute::named(l), Attribute::named(r))
                }
                (Operand::Attribute(a), Operand::Value(v))
                | (Operand::Value(v), Operand::Attribute(a)) => {
                    Predicate::value(Attribute::named(a), v)
                }
                (Operand::Value(_), Operand::Value(_)) => {
                    return Err(ParseError::syntax(
                        1,
                        format!("condition {expr} compares two literals"),
                    ))
                }
            };
            out.push(predicate);
            Ok(())
        }
        other => Err(ParseError::syntax(
            1,
            format!("expected attr = value or attr = attr, found {other}"),
        )),
    }
}

fn operand(expr: &Expr) -> Result<Operand> {
    if let Some(name) = attribute_name(expr) {
        return Ok(Operand::Attribute(name));
    }
    match expr {
        Expr::Nested(inner) => operand(inner),
        Expr::Value(Value::SingleQuotedString(s) | Value::DoubleQuotedString(s)) => {
            Ok(Operand::Value(s.clone()))
        }
        Expr::Value(Value::Number(n, _)) => Ok(Operand::Value(n.to_string())),
        other => Err(ParseError::syntax(
            1,
            format!("expected attribute or literal, found {other}"),
        )),
    }
}

/// Attribute names are global, so `Employee.ESSN` is just `ESSN`.
fn attribute_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|ident| ident.value.clone()),
        _ => None,
    }
}

/// Parse query text and build its canonical plan against `catalogue`.
pub fn parse_query(src: &str, catalogue: &Catalogue) -> Result<Operator> {
    build_plan(&parse_query_text(src)?, catalogue)
}

/// Canonical left-deep plan for an already parsed query.
pub fn build_plan(query: &Query, catalogue: &Catalogue) -> Result<Operator> {
    let mut relations = query.relations.iter();
    let first = relations
        .next()
        .ok_or_else(|| ParseError::syntax(1, "FROM list is empty"))?;
    let mut plan = Operator::scan(catalogue.lookup_relation(first)?.clone());
    for (idx, name) in relations.enumerate() {
        if query.relations[..=idx].contains(name) {
            return Err(ParseError::syntax(
                1,
                format!("relation {name} appears more than once in FROM"),
            ));
        }
        let scan = Operator::scan(catalogue.lookup_relation(name)?.clone());
        plan = Operator::product(plan, scan);
    }

    let known = |name: &str| {
        query.relations.iter().any(|r| {
            catalogue
                .lookup_relation(r)
                .map(|rel| rel.relation.contains(name))
                .unwrap_or(false)
        })
    };
    let check = |name: &str| -> Result<()> {
        if known(name) {
            Ok(())
        } else {
            Err(Error::UnresolvedAttribute(name.to_string()).into())
        }
    };

    for predicate in &query.conditions {
        for attr in predicate.attributes() {
            check(&attr.name)?;
        }
        plan = Operator::select(plan, predicate.clone());
    }

    if let Some(names) = &query.projection {
        if names.is_empty() {
            return Err(Error::EmptyProjection.into());
        }
        for name in names {
            check(name)?;
        }
        plan = Operator::project(plan, names.iter().map(Attribute::named).collect());
    }
    Ok(plan)
}
