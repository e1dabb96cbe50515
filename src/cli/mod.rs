//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TV series catalog REST API
#[derive(Parser)]
#[command(name = "tvcatalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "server")]
    Serve,

    /// Create the database and apply migrations
    Migrate,

    /// Create a user with admin rights
    CreateAdmin {
        username: String,
        email: String,
        password: String,
    },

    /// Bulk import series, seasons and episodes from CSV files
    Import {
        /// Directory holding series.csv, seasons.csv and episodes.csv
        data_dir: PathBuf,

        /// Directory the CSV image columns are relative to
        #[arg(long)]
        images: Option<PathBuf>,
    },
}

pub use commands::*;
