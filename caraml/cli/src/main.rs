//! caraml - explore and call RAML-described JSON APIs from the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use caraml_lib::{CaramlError, CompileConfig, CompiledApi, Compiler, MethodArgs};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod nav;
mod output;

#[derive(Parser)]
#[command(name = "caraml", version)]
#[command(about = "Compile a RAML document into a live API client", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the document comes from and how its base URI is bound.
#[derive(clap::Args, Debug)]
struct CompileArgs {
    /// Path to the RAML document
    #[arg(value_name = "API")]
    api: PathBuf,

    /// TOML configuration file for base URI parameters, headers and prefix
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URI parameter, e.g. `region=se01` (repeatable)
    #[arg(short = 'b', long = "base-param", value_name = "NAME=VALUE")]
    base_params: Vec<String>,

    /// Default header sent with every request, e.g. `Authorization: Basic ...`
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Prefix for nested resources that collide with a method alias
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled resource tree
    Tree {
        #[command(flatten)]
        compile: CompileArgs,

        /// Start at this accessor path instead of the root, e.g. `users(5)`
        #[arg(short, long, value_name = "PATH")]
        at: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List the declared types
    Types {
        #[command(flatten)]
        compile: CompileArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Send one request through a bound method
    ///
    /// PATH navigates the tree, calling parametrized resources with JSON
    /// arguments: `users(5).messages(3)` or `users({"username":"aladdin"}).$get`.
    Call {
        #[command(flatten)]
        compile: CompileArgs,

        /// Accessor path of the resource
        #[arg(value_name = "PATH")]
        path: String,

        /// Method alias (get, find, post, create, put, update, patch, delete, remove, head)
        #[arg(value_name = "METHOD")]
        method: String,

        /// Query parameter, e.g. `page=2`; values are parsed as JSON when possible
        #[arg(short, long, value_name = "NAME=VALUE")]
        query: Vec<String>,

        /// JSON request body
        #[arg(short = 'd', long, value_name = "JSON")]
        body: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Caraml(#[from] CaramlError),

    #[error("invalid {flag} '{value}': expected {expected}")]
    Argument {
        flag: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid path '{path}': {message}")]
    Path { path: String, message: String },

    #[error("'{parent}' has no member '{name}' (available: {})", .available.join(", "))]
    UnknownMember {
        parent: String,
        name: String,
        available: Vec<String>,
    },

    #[error("'{resource}' has no method '{alias}'")]
    UnknownMethod { resource: String, alias: String },
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,caraml_lib=info,caraml=info".to_string(),
            2 => "info,caraml_lib=debug,caraml=debug".to_string(),
            _ => "debug,caraml_lib=trace,caraml=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

/// Splits `text` at the first `separator`, trimming both halves.
fn split_pair<'a>(
    text: &'a str,
    separator: char,
    flag: &'static str,
    expected: &'static str,
) -> Result<(&'a str, &'a str), CliError> {
    match text.split_once(separator) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(CliError::Argument {
            flag,
            value: text.to_string(),
            expected,
        }),
    }
}

/// JSON when it parses, otherwise the raw text.
fn loose_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn build_config(args: &CompileArgs) -> Result<CompileConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => CompileConfig::from_toml_file(path).map_err(CaramlError::from)?,
        None => CompileConfig::default(),
    };
    config = config.api_path(&args.api);
    for pair in &args.base_params {
        let (name, value) = split_pair(pair, '=', "--base-param", "NAME=VALUE")?;
        config = config.base_uri_parameter(name, loose_json(value));
    }
    for pair in &args.headers {
        let (name, value) = split_pair(pair, ':', "--header", "NAME: VALUE")?;
        config = config.default_header(name, value);
    }
    if let Some(prefix) = &args.prefix {
        config = config.override_prefix(prefix);
    }
    Ok(config)
}

fn compile(args: &CompileArgs) -> Result<CompiledApi, CliError> {
    let config = build_config(args)?;
    tracing::debug!(api = ?config.api_path, "compiling");
    Ok(Compiler::new(config).compile()?)
}

fn print_value(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Tree {
            compile: args,
            at,
            format,
        } => {
            let api = compile(&args)?;
            match at {
                Some(path) => {
                    let resource = nav::resolve(&api, &nav::parse_path(&path)?)?;
                    match format {
                        Format::Text => print!("{}", output::resource_text(&resource)),
                        Format::Json => print_value(&output::resource_json(&resource))?,
                    }
                }
                None => match format {
                    Format::Text => print!("{}", output::tree_text(&api)),
                    Format::Json => print_value(&output::tree_json(&api))?,
                },
            }
        }

        Commands::Types {
            compile: args,
            format,
        } => {
            let api = compile(&args)?;
            match format {
                Format::Text => print!("{}", output::types_text(&api)),
                Format::Json => print_value(&output::types_json(&api))?,
            }
        }

        Commands::Call {
            compile: args,
            path,
            method,
            query,
            body,
        } => {
            let api = compile(&args)?;
            let resource = nav::resolve(&api, &nav::parse_path(&path)?)?;
            let bound = resource.method(&method).ok_or_else(|| CliError::UnknownMethod {
                resource: resource.name().to_string(),
                alias: method.clone(),
            })?;

            let mut call = MethodArgs::new();
            for pair in &query {
                let (name, value) = split_pair(pair, '=', "--query", "NAME=VALUE")?;
                call = call.query(name, loose_json(value));
            }
            if let Some(body) = body {
                call = call.body(serde_json::from_str::<Value>(&body)?);
            }

            tracing::info!(verb = %bound.verb(), uri = bound.uri(), "calling");
            let response = bound.send(call).await?;
            print_value(&response)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let CliError::Caraml(err) = &e {
                if let Some(body) = err_body(err) {
                    eprintln!("{body}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// The response body of an HTTP error, pretty printed.
fn err_body(err: &CaramlError) -> Option<String> {
    match err {
        CaramlError::Client(client) => client
            .body()
            .filter(|body| !body.is_null())
            .and_then(|body| serde_json::to_string_pretty(body).ok()),
        _ => None,
    }
}
