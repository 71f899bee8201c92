#![cfg(feature = "web")]

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Retro Notes - personal notes kept in a spreadsheet
#[derive(Debug, Parser)]
#[command(name = "retro-notes", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server (the default)
    Serve(ServeConfig),

    /// Decrypt a `.secure` export and print or save the note
    Decrypt(DecryptConfig),
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    /// Address to listen on
    #[arg(long, env = "RETRO_NOTES_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "RETRO_NOTES_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Workbook holding the notes
    #[arg(long, env = "RETRO_NOTES_DB", default_value = "notes_database.xlsx")]
    pub database: PathBuf,

    /// Directory served under /static
    #[arg(long, env = "RETRO_NOTES_STATIC", default_value = "static")]
    pub static_dir: PathBuf,
}

impl ServeConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Args)]
pub struct DecryptConfig {
    /// Exported `.secure` file
    pub file: PathBuf,

    /// Password the note was exported with
    #[arg(long, env = "RETRO_NOTES_EXPORT_PASSWORD")]
    pub password: String,

    /// Write the note here instead of standard output
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// The sub-command to run; no sub-command means `serve` with the top-level flags.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}
