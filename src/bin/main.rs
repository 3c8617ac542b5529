//! Quarry CLI - Build projections and analytic queries from JSON:API requests
//!
//! Usage:
//!   quarry [--model <model.toml>] project '<path?query>'
//!   quarry [--model <model.toml>] query '<path?query>' [--arg name=value]... [--bypass-cache]
//!   quarry [--model <model.toml>] check
//!
//! Examples:
//!   quarry --model model.toml project '/book/1/authors?fields[author]=name'
//!   quarry --model model.toml query '/playerStats?filter=highScore>100' --arg rating=good

use clap::{Parser, Subcommand};
use quarry::aggregation::{DefaultQueryValidator, QueryTranslator};
use quarry::catalog::Catalog;
use quarry::config::Settings;
use quarry::dictionary::EntityMetadata;
use quarry::jsonapi::ProjectionBuilder;
use quarry::pagination::DefaultPaginationResolver;
use quarry::request::RequestContext;
use quarry::sorting::DefaultSortResolver;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - JSON:API projections and analytic queries")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to QUARRY_CONFIG, ./quarry.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model file (overrides model.path from the settings)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the entity projection for a request
    Project {
        /// Request path with optional query string, e.g. '/book?include=authors'
        request: String,
    },

    /// Translate a request over an analytic table into a query
    Query {
        /// Request path with optional query string
        request: String,

        /// Table argument as name=value (repeatable)
        #[arg(short, long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,

        /// Mark the query as bypassing the cache
        #[arg(long)]
        bypass_cache: bool,
    },

    /// Load the model and list its collections
    Check,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

fn main() -> ExitCode {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = match load_catalog(cli.model, &settings) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Project { request } => cmd_project(&catalog, &settings, &request),
        Commands::Query {
            request,
            args,
            bypass_cache,
        } => cmd_query(&catalog, &settings, &request, args, bypass_cache),
        Commands::Check => cmd_check(&catalog),
    }
}

fn load_catalog(model: Option<PathBuf>, settings: &Settings) -> Result<Catalog, String> {
    let path = match model {
        Some(path) => path,
        None => settings
            .model
            .resolved_path()
            .map_err(|e| format!("Error resolving model path: {}", e))?
            .ok_or("No model file given: pass --model or set model.path in the settings")?,
    };
    Catalog::from_file(&path).map_err(|e| format!("Error loading model '{}': {}", path.display(), e))
}

/// Split `/book/1?include=authors` into path and query string.
fn split_request(request: &str) -> (&str, &str) {
    request.split_once('?').unwrap_or((request, ""))
}

fn request_context(settings: &Settings, query: &str) -> RequestContext {
    RequestContext::from_query(query).with_api_version(&settings.request.default_api_version)
}

fn cmd_project(catalog: &Catalog, settings: &Settings, request: &str) -> ExitCode {
    let (path, query) = split_request(request);
    let ctx = request_context(settings, query);

    let filters = catalog.filter_resolver();
    let sorts = DefaultSortResolver::new(catalog.dictionary());
    let pages = DefaultPaginationResolver::new(settings.page_limits());
    let builder = ProjectionBuilder::new(catalog.dictionary(), &filters, &sorts, &pages)
        .with_strict_params(settings.request.strict_query_params);

    match builder.build_from_path(&ctx, path) {
        Ok(projection) => print_json(&projection),
        Err(e) => {
            eprintln!("Error ({}): {}", e.status(), e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct QueryOutput<'a, T: Serialize> {
    query: &'a T,
    cache_key: String,
}

fn cmd_query(
    catalog: &Catalog,
    settings: &Settings,
    request: &str,
    args: Vec<(String, String)>,
    bypass_cache: bool,
) -> ExitCode {
    let (path, query) = split_request(request);
    let ctx = args
        .into_iter()
        .fold(request_context(settings, query), |ctx, (name, value)| {
            ctx.with_table_argument(name, value)
        })
        .with_bypass_cache(bypass_cache);

    let filters = catalog.filter_resolver();
    let sorts = DefaultSortResolver::new(catalog.dictionary());
    let pages = DefaultPaginationResolver::new(settings.page_limits());
    let builder = ProjectionBuilder::new(catalog.dictionary(), &filters, &sorts, &pages)
        .with_strict_params(settings.request.strict_query_params);

    let projection = match builder.build_from_path(&ctx, path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error ({}): {}", e.status(), e);
            return ExitCode::FAILURE;
        }
    };

    let Some(table) = catalog.table(projection.entity_type()) else {
        eprintln!("Error: '{}' is not an analytic table", projection.entity_type());
        return ExitCode::FAILURE;
    };

    let validator = DefaultQueryValidator;
    let translator = QueryTranslator::new(&validator);
    match translator.translate(table, &projection, &ctx) {
        Ok(query) => print_json(&QueryOutput {
            query: &query,
            cache_key: query.cache_key_digest(),
        }),
        Err(e) => {
            eprintln!("Error ({}): {}", e.status(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(catalog: &Catalog) -> ExitCode {
    let dictionary = catalog.dictionary();

    println!("Collections:");
    for binding in dictionary.bindings().filter(|b| b.root) {
        let kind = if catalog.table(&binding.entity_type).is_some() {
            "table"
        } else {
            "entity"
        };
        println!(
            "  {} ({}, {} attributes, {} relationships)",
            dictionary.json_alias(&binding.entity_type),
            kind,
            binding.attributes.len(),
            binding.relationships.len()
        );
    }

    for table in catalog.tables() {
        println!("\nTable {}:", table.name());
        for column in table.columns() {
            let kind = if column.is_metric() {
                "metric"
            } else if column.is_time_dimension() {
                "time dimension"
            } else {
                "dimension"
            };
            println!("  {} ({}, {:?})", column.name, kind, column.value_type);
        }
        if let Some(required) = &table.require_filter {
            println!("  requires filter: {}", required.template);
        }
    }

    ExitCode::SUCCESS
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}
