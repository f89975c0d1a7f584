//! Catalogue text format.
//!
//! One relation per line; blank lines and `#` comments are ignored:
//!
//! ```text
//! # name:tuples:attr:distinct,attr:distinct
//! Employee:1000:ESSN:1000,BDATE:1000,LNAME:1000
//! Works_On:2000:PNO:100,SSN:1000
//! ```

use relopt_core::catalogue::Catalogue;

use super::{ParseError, Result};

pub fn parse_catalogue(src: &str) -> Result<Catalogue> {
    let mut cat = Catalogue::new();
    for (idx, raw) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ParseError::syntax(line_no, "missing relation name"));
        }
        let tuples = match parts.next() {
            Some(t) => parse_count(t, line_no)?,
            None => {
                return Err(ParseError::syntax(
                    line_no,
                    format!("relation {name} has no tuple count"),
                ))
            }
        };
        cat.create_relation(name, tuples)?;

        let Some(attrs) = parts.next() else {
            continue;
        };
        for entry in attrs.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (attr, count) = entry.split_once(':').ok_or_else(|| {
                ParseError::syntax(line_no, format!("expected attr:count, got {entry:?}"))
            })?;
            let attr = attr.trim();
            if attr.is_empty() {
                return Err(ParseError::syntax(line_no, "missing attribute name"));
            }
            cat.create_attribute(name, attr, parse_count(count, line_no)?)?;
        }
    }
    Ok(cat)
}

fn parse_count(s: &str, line: usize) -> Result<u64> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| ParseError::syntax(line, format!("not a non-negative count: {:?}", s.trim())))
}
