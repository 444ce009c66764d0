//! SLUICE CLI
//!
//! Lists the tool catalog, runs single operations through the same gated
//! dispatcher the server uses, and generates API keys.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod catalog;
mod keygen;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use serde_json::Value;
use sluice_core::{EnvSwitch, Settings};
use sluice_server::{build_dispatcher, init_tracing};
use sluice_tool::{Dispatcher, InvocationRequest};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "SLUICE - gated tools for notes, filesystem, git and PostgreSQL", long_about = None, version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog
    Tools {
        /// Only this family (notes, fs, git, pg)
        #[arg(short, long)]
        family: Option<String>,
        /// Only operations gated by ENABLE_DANGEROUS
        #[arg(long)]
        dangerous: bool,
        /// Print JSON in the shape of MCP tools/list
        #[arg(long)]
        json: bool,
    },
    /// Invoke one operation and print the response
    Call {
        /// Operation name
        operation: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Generate API keys for the HTTP transport
    Keygen {
        /// Number of keys
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..=100))]
        count: u16,
        /// Random bytes per key
        #[arg(short, long, default_value_t = 32, value_parser = clap::value_parser!(u16).range(16..=256))]
        bytes: u16,
    },
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).wrap_err("--args is not valid JSON")?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

fn dispatcher() -> Result<Dispatcher> {
    let settings = Settings::from_env().wrap_err("invalid configuration")?;
    init_tracing(settings.server.log_format);
    if let Some(var) = &settings.pg_missing {
        eprintln!("note: {var} is not set; pg tools are unavailable");
    }
    Ok(build_dispatcher(&settings, Arc::new(EnvSwitch::new()), false)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Tools {
            family,
            dangerous,
            json,
        } => {
            let dispatcher = dispatcher()?;
            let filter = catalog::Filter {
                family,
                dangerous_only: dangerous,
            };
            if json {
                let tools = catalog::describe(&dispatcher, &filter);
                println!("{}", serde_json::to_string_pretty(&tools)?);
            } else {
                print!("{}", catalog::render(&catalog::select(&dispatcher, &filter)));
            }
            Ok(())
        }
        Commands::Call { operation, args } => {
            let arguments = parse_arguments(&args)?;
            let dispatcher = dispatcher()?;
            let response = dispatcher
                .invoke(InvocationRequest::new(operation, arguments))
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.is_error() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Keygen { count, bytes } => {
            let keys: Vec<String> = (0..count)
                .map(|_| keygen::generate(usize::from(bytes)))
                .collect();
            for key in &keys {
                println!("{key}");
            }
            if let Some(first) = keys.first() {
                println!();
                print!("{}", keygen::instructions(first));
            }
            Ok(())
        }
    }
}
