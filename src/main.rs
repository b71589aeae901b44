mod auth;
mod cli;
mod commands;
mod config;
mod error;
mod git;
mod gitlab;
mod output;
mod prompt;
mod update;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    info!("Starting lab {}", env!("CARGO_PKG_VERSION"));
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", output::styling::bright_red("Error:"));
            ExitCode::from(error::exit_code_for(&e))
        }
    }
}
