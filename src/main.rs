#![cfg(not(tarpaulin_include))]

use std::fs;

use clap::Parser;
use log::info;
use retro_notes::app;
use retro_notes::config::{Cli, Command, DecryptConfig};
use retro_notes::secure;

/// Main entry point for the notes web application
///
/// Without a sub-command this starts the web server with the flags (or
/// environment variables) given. `decrypt` opens a `.secure` export.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().into_command() {
        Command::Serve(config) => app::run(config).await,
        Command::Decrypt(config) => decrypt(&config),
    }
}

fn decrypt(config: &DecryptConfig) -> Result<(), Box<dyn std::error::Error>> {
    let payload = fs::read(&config.file)?;
    let note = secure::decrypt_export(&payload, &config.password)?;

    match &config.output {
        Some(path) => {
            fs::write(path, note)?;
            info!("wrote decrypted note to {}", path.display());
        }
        None => println!("{}", note),
    }
    Ok(())
}
