//! relopt CLI: estimate, optimise, and explain relational query plans.

use clap::{Args, Parser, Subcommand};
use relopt_core::config::OptimiserConfig;
use relopt_core::hash::plan_fingerprint;
use relopt_core::manifest::PlanManifest;
use relopt_planner::{
    estimate_plan, explain, parse_catalogue, parse_query, parse_yaml_catalogue, parse_yaml_query,
    total_cost, Catalogue, Operator, Optimiser, ParseError,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "relopt")]
#[command(about = "Cardinality estimation and join ordering for relational query plans", long_about = None)]
struct Cli {
    /// Log filter directive (overrides RELOPT_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Catalogue file (`.yaml`/`.yml` for YAML, anything else for the text format)
    #[arg(short, long)]
    catalogue: Option<PathBuf>,

    /// Query file; read from stdin when omitted
    #[arg(short, long)]
    query: Option<PathBuf>,

    /// Treat the query as a YAML document regardless of its extension
    #[arg(long)]
    yaml: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the canonical plan and its estimates (EXPLAIN)
    Explain {
        #[command(flatten)]
        input: QueryArgs,
    },

    /// Optimise a query and show both plans with their costs
    Optimise {
        #[command(flatten)]
        input: QueryArgs,

        /// Keep every attribute until the top-level projection
        #[arg(long)]
        no_early_projection: bool,

        /// Write a JSON manifest of both plans' fingerprints and costs
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Parse the catalogue and query without estimating anything
    Validate {
        #[command(flatten)]
        input: QueryArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = OptimiserConfig::from_env();
    if let Some(filter) = &cli.log {
        config.log_filter = filter.clone();
    }
    init_tracing(&config.log_filter);

    let result = match cli.command {
        Commands::Explain { input } => explain_query(&input, &config),
        Commands::Optimise {
            input,
            no_early_projection,
            manifest,
        } => {
            apply_overrides(&mut config, no_early_projection);
            optimise_query(&input, &config, manifest.as_deref())
        }
        Commands::Validate { input } => validate_query(&input, &config).map(|plan| {
            println!(
                "✓ Query is valid ({} nodes over {})",
                plan.node_count(),
                plan.base_relations().join(", ")
            );
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line switches win over environment and defaults.
fn apply_overrides(config: &mut OptimiserConfig, no_early_projection: bool) {
    if no_early_projection {
        config.early_projection = false;
    }
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_query(input: &QueryArgs) -> CliResult<String> {
    match &input.query {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut src = String::new();
            std::io::stdin().read_to_string(&mut src)?;
            Ok(src)
        }
    }
}

fn load_catalogue(input: &QueryArgs, config: &OptimiserConfig) -> CliResult<Catalogue> {
    let path = input
        .catalogue
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.catalogue_path));
    let src = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read catalogue {}: {}", path.display(), e))?;
    let catalogue = if is_yaml_path(&path) {
        parse_yaml_catalogue(&src)?
    } else {
        parse_catalogue(&src)?
    };
    tracing::info!(path = %path.display(), relations = catalogue.len(), "loaded catalogue");
    Ok(catalogue)
}

/// Parse the query into its canonical plan. A YAML document with an
/// embedded catalogue needs no catalogue file.
fn load_plan(input: &QueryArgs, config: &OptimiserConfig) -> CliResult<(Catalogue, Operator)> {
    let src = read_query(input)?;
    let yaml = input.yaml || input.query.as_deref().is_some_and(is_yaml_path);

    if !yaml {
        let catalogue = load_catalogue(input, config)?;
        let plan = parse_query(&src, &catalogue)?;
        return Ok((catalogue, plan));
    }

    load_yaml_plan(&src, || load_catalogue(input, config))
}

/// Only a document without a catalogue section falls back to `external`;
/// any other error in the document is reported as is.
fn load_yaml_plan(
    src: &str,
    external: impl FnOnce() -> CliResult<Catalogue>,
) -> CliResult<(Catalogue, Operator)> {
    match parse_yaml_query(src, None) {
        Ok(parsed) => Ok((parsed.catalogue.unwrap_or_default(), parsed.plan)),
        Err(ParseError::MissingCatalogue) => {
            let catalogue = external()?;
            let parsed = parse_yaml_query(src, Some(&catalogue))?;
            Ok((catalogue, parsed.plan))
        }
        Err(e) => Err(e.into()),
    }
}

fn validate_query(input: &QueryArgs, config: &OptimiserConfig) -> CliResult<Operator> {
    let (_, plan) = load_plan(input, config)?;
    Ok(plan)
}

fn explain_query(input: &QueryArgs, config: &OptimiserConfig) -> CliResult<()> {
    let (_, mut plan) = load_plan(input, config)?;
    estimate_plan(&mut plan)?;

    println!("Canonical Plan");
    println!("==============");
    print!("{}", explain(&plan));
    println!();
    println!("Total Cost: {} tuples", total_cost(&plan));
    println!("Fingerprint: {}", plan_fingerprint(&plan)?);
    Ok(())
}

fn optimise_query(
    input: &QueryArgs,
    config: &OptimiserConfig,
    manifest_path: Option<&Path>,
) -> CliResult<()> {
    let (catalogue, mut canonical) = load_plan(input, config)?;
    let optimiser = Optimiser::with_config(&catalogue, config.clone());
    let optimised = optimiser.optimise(&canonical)?;
    estimate_plan(&mut canonical)?;

    let canonical_cost = total_cost(&canonical);
    let optimised_cost = total_cost(&optimised);
    let output_tuples = optimised.output().tuple_count;

    println!("Canonical Plan");
    println!("==============");
    print!("{}", explain(&canonical));
    println!("Total Cost: {} tuples", canonical_cost);
    println!();
    println!(
        "Optimised Plan (early projection {})",
        if config.early_projection { "on" } else { "off" }
    );
    println!("==============");
    print!("{}", explain(&optimised));
    println!("Total Cost: {} tuples", optimised_cost);

    if let Some(path) = manifest_path {
        let manifest = PlanManifest::new(plan_fingerprint(&canonical)?, plan_fingerprint(&optimised)?)
            .with_costs(canonical_cost, optimised_cost, output_tuples);
        fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
        tracing::info!(path = %path.display(), "wrote plan manifest");
        println!();
        println!("Manifest written to {}", path.display());
    }

    Ok(())
}
