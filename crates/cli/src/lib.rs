pub mod commands;
pub mod logging;
pub mod request;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quoteform_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "quoteform",
    about = "Quotation form CLI",
    long_about = "Browse the product catalog, price quotation requests, and email quotations.",
    after_help = "Examples:\n  quoteform catalog --json\n  quoteform generate --request order.toml\n  quoteform send --request order.toml"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a quoteform.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List categories, products, prices, and variations")]
    Catalog {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate a request file and print the priced quotation")]
    Generate {
        #[arg(long, help = "Quotation request file (TOML)")]
        request: PathBuf,
    },
    #[command(about = "Generate a quotation and email it through the configured provider")]
    Send {
        #[arg(long, help = "Quotation request file (TOML)")]
        request: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check configuration, catalog, and email credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let config = AppConfig::load(options.clone()).ok();
    if let Err(error) = logging::init_from(config.as_ref()) {
        eprintln!("{error}");
    }

    let result = match cli.command {
        Command::Catalog { json } => commands::catalog::run(&options, json),
        Command::Generate { request } => commands::generate::run(&options, &request),
        Command::Send { request } => commands::send::run(&options, &request),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
