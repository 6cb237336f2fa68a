use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pronto_runtime::logging;

mod commands;
mod printer;

#[derive(Debug, Parser)]
#[command(
    name = "pronto",
    version,
    disable_version_flag = true,
    about = "Quickly search for files by name",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Search pattern
    pub pattern: Option<String>,

    /// Display version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Use DBPATH as the database
    #[arg(short = 'd', long = "database", value_name = "DBPATH")]
    pub database: Option<PathBuf>,

    /// Ignore case distinctions
    #[arg(short = 'i', long = "ignore-case")]
    pub ignore_case: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'r', long = "regexp")]
    pub regexp: bool,

    /// Update the database
    #[arg(short = 'u', long = "update")]
    pub update: bool,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();

    if cli.update {
        return commands::update::run(&cli);
    }

    match &cli.pattern {
        Some(pattern) if !pattern.is_empty() => commands::search::run(&cli, pattern),
        _ => {
            eprintln!("pronto: no search pattern provided (see --help)");
            ExitCode::from(1)
        }
    }
}
