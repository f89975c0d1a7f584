//! Optimiser configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimiserConfig {
    /// Narrow intermediate results to the attributes still needed upstream.
    /// Only takes effect under a projection in the canonical plan.
    pub early_projection: bool,

    /// Catalogue file read by the CLI when none is given on the command line.
    pub catalogue_path: String,

    /// `tracing` filter directive installed by the CLI.
    pub log_filter: String,
}

impl Default for OptimiserConfig {
    fn default() -> Self {
        Self {
            early_projection: true,
            catalogue_path: "data/cat.txt".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl OptimiserConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RELOPT_EARLY_PROJECTION`: `true`/`false` (also `1`/`0`, `on`/`off`)
    /// - `RELOPT_CATALOGUE`: catalogue path
    /// - `RELOPT_LOG`: log filter directive
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RELOPT_EARLY_PROJECTION") {
            if let Ok(v) = parse_flag(&s) {
                cfg.early_projection = v;
            }
        }

        if let Ok(s) = std::env::var("RELOPT_CATALOGUE") {
            cfg.catalogue_path = s;
        }

        if let Ok(s) = std::env::var("RELOPT_LOG") {
            cfg.log_filter = s;
        }

        cfg
    }
}

/// Parse a boolean switch as accepted in environment variables.
pub fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("not a boolean flag: {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_early_projection() {
        let cfg = OptimiserConfig::default();
        assert!(cfg.early_projection);
        assert_eq!(cfg.catalogue_path, "data/cat.txt");
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" ON "), Ok(true));
        assert_eq!(parse_flag("0"), Ok(false));
        assert!(matches!(parse_flag("maybe"), Err(Error::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: OptimiserConfig = serde_json::from_str(r#"{"early_projection":false}"#).unwrap();
        assert!(!cfg.early_projection);
        assert_eq!(cfg.log_filter, "warn");
    }
}
