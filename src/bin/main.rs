//! Research data governance metadata validator CLI
//!
//! Command-line tool for validating RO-Crate metadata against the built-in
//! schemas and for browsing those schemas.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use nii_dg::check::parse_iso8601;
use nii_dg::{
    load_crate, registry, CrateError, CrateSource, RecommendedPolicy, Requirement, ValidateOptions,
    ValidationReport,
};

const EXIT_VALID: u8 = 0;
const EXIT_STRUCTURE: u8 = 1;
const EXIT_INVALID: u8 = 2;

#[derive(Parser)]
#[command(name = "nii-dg")]
#[command(about = "Validate research data governance metadata in RO-Crates")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a crate and print the report
    Validate(ValidateArgs),
    /// List built-in schemas, or the entities and properties of one
    Schemas(SchemasArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Path to a crate directory, metadata JSON file, zip archive, or URL
    source: String,

    /// How missing recommended properties are reported
    #[arg(long, value_enum, default_value_t = RecommendedArg::Warn)]
    recommended: RecommendedArg,

    /// Fixed "now" for date rules (ISO 8601); defaults to the wall clock
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args)]
struct SchemasArgs {
    /// Schema to describe (default: list all schemas)
    schema: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecommendedArg {
    Ignore,
    Warn,
    Error,
}

impl From<RecommendedArg> for RecommendedPolicy {
    fn from(arg: RecommendedArg) -> Self {
        match arg {
            RecommendedArg::Ignore => RecommendedPolicy::Ignore,
            RecommendedArg::Warn => RecommendedPolicy::Warn,
            RecommendedArg::Error => RecommendedPolicy::Error,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_now(value: &str) -> Result<DateTime<Utc>, String> {
    parse_iso8601(value).ok_or_else(|| format!("'{}' is not an ISO 8601 date or date-time", value))
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> Result<(), CrateError> {
    match format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<u8, CrateError> {
    let source = CrateSource::from_arg(&args.source);
    tracing::debug!(source = %source.location(), "loading crate");

    let options = ValidateOptions {
        recommended: args.recommended.into(),
        reference_time: args.now,
    };
    let rocrate = load_crate(&source, registry())?.with_options(options);

    match rocrate.validate_all() {
        Ok(report) => {
            print_report(&report, args.format)?;
            Ok(EXIT_VALID)
        }
        Err(CrateError::ValidationFailed(report)) => {
            print_report(&report, args.format)?;
            Ok(EXIT_INVALID)
        }
        Err(e) => Err(e),
    }
}

fn run_schemas(args: SchemasArgs) -> Result<u8, CrateError> {
    let registry = registry();
    let Some(schema) = args.schema else {
        for name in registry.schemas() {
            let entities: Vec<String> = registry
                .kinds_of(name)
                .iter()
                .map(|k| k.entity_name().to_string())
                .collect();
            println!("{}: {}", name, entities.join(", "));
        }
        return Ok(EXIT_VALID);
    };

    let kinds = registry.kinds_of(&schema);
    if kinds.is_empty() {
        return Err(CrateError::UnknownEntityType {
            schema,
            entity: "*".to_string(),
        });
    }
    for kind in kinds {
        let def = kind.definition();
        println!("{}", def.name);
        if let Some(description) = &def.description {
            println!("  {}", description);
        }
        for prop in def.props() {
            let marker = match prop.requirement {
                Requirement::Required => "*",
                Requirement::Recommended => "+",
                Requirement::Optional => " ",
            };
            println!(
                "  {} {:<24} {:<12} {}",
                marker,
                prop.name,
                prop.requirement.to_string(),
                prop.expected_type
            );
        }
    }
    Ok(EXIT_VALID)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Schemas(args) => run_schemas(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_STRUCTURE)
        }
    }
}
