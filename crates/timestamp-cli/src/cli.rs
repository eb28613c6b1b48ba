use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tsnotes", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// TOML config file with `vault_root` and `data_file`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Settings data file (JSON); overrides the config file
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Vault root used for relative paths; overrides the config file
    #[arg(long)]
    pub vault: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a path or URL into a locator
    Resolve {
        raw: String,
        /// Address the file through the localhost HTTP bridge
        #[arg(long)]
        bridge: bool,
    },

    /// Format seconds as mm:ss / hh:mm:ss
    Encode { seconds: f64 },

    /// Parse mm:ss / hh:mm:ss into seconds
    Decode { text: String },

    /// List the timestamp and video markers in a markdown note
    Markers { file: PathBuf },

    /// Resolve a path or URL, fetch it and print the handle
    Fetch {
        raw: String,
        #[arg(long)]
        bridge: bool,
    },

    /// Print the effective settings as JSON
    Settings,
}
