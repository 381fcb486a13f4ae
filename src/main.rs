#![allow(non_snake_case)]
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;

use RustedIntegral::Utils::config::{AppConfig, load_config};
use RustedIntegral::Utils::logger::init_logger;
use RustedIntegral::integral::pipeline::{CalculationRequest, IntegralPipeline};
use RustedIntegral::symbolic::symbolic_traits::symbolic_backend_from_string;
use RustedIntegral::web;

#[derive(Parser)]
#[command(
    name = "rusted_integral",
    version,
    about = "Definite integral calculator with step-by-step LaTeX derivation"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the calculator page and the /calculate endpoint (default)
    Serve {
        /// Address to bind, overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Compute one integral and print the response JSON
    Solve {
        /// Integrand, a function of x
        function: String,

        /// Lower bound
        #[arg(allow_hyphen_values = true)]
        lower: String,

        /// Upper bound
        #[arg(allow_hyphen_values = true)]
        upper: String,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    init_logger(&config.logging)?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Solve {
            function,
            lower,
            upper,
            pretty,
        } => solve(&config, &function, &lower, &upper, pretty),
    }
}

fn run_server(config: &AppConfig) -> Result<()> {
    let runtime = web::runtime().context("starting tokio runtime")?;
    runtime.block_on(web::serve(config))?;
    info!(" \n \n Program ended");
    Ok(())
}

fn solve(config: &AppConfig, function: &str, lower: &str, upper: &str, pretty: bool) -> Result<ExitCode> {
    let backend = symbolic_backend_from_string(&config.compute.engine).map_err(anyhow::Error::msg)?;
    let pipeline = IntegralPipeline::new(backend);
    let request = CalculationRequest::new(function, lower, upper);
    let (body, code) = match pipeline.calculate(&request) {
        Ok(response) => (serde_json::to_value(&response)?, ExitCode::SUCCESS),
        Err(e) => (
            json!({ "error": e.to_string() }),
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            },
        ),
    };
    let text = if pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{}", text);
    Ok(code)
}
