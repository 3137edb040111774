use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed workflow CLI for an SEO agency's client portal.
/// Storage defaults to ~/.portal/portal.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "portal", version, about = "Agency client-portal workflow CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true, env = "PORTAL_DB")]
    pub db: Option<PathBuf>,

    /// User id to act as.
    #[arg(long = "as", global = true, env = "PORTAL_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The database file to operate on.
    pub fn db_path(&self) -> PathBuf {
        match &self.db {
            Some(p) => p.clone(),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".portal").join("portal.json")
            }
        }
    }
}
