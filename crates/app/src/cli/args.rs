pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grantsync")]
#[command(about = "Reconcile declarative access grants against role bindings and storage ACLs")]
pub struct Args {
    /// Path to the grantsync config directory (defaults to ~/.grantsync)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level; overrides the configured one (RUST_LOG still wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
