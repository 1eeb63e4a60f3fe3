use clap::{Args, Parser, Subcommand};

/// tokenstore: administer the OAuth2 token table
#[derive(Parser)]
#[command(name = "tokenstore", version, about)]
pub struct Cli {
    /// Table name (overrides TOKENSTORE_TABLE)
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Seconds between sweeps (overrides TOKENSTORE_GC_INTERVAL_SECS)
    #[arg(long, global = true)]
    pub gc_interval: Option<i64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep the store open and sweeping until Ctrl-C
    Serve,

    /// Create the token table and indexes, then exit
    Migrate,

    /// Run one sweep pass now
    Sweep,

    /// Print the token info stored under a key
    Lookup(KeyArgs),

    /// Clear a key so it can no longer be looked up
    Revoke(KeyArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct KeyArgs {
    #[arg(long)]
    pub code: Option<String>,
    #[arg(long)]
    pub access: Option<String>,
    #[arg(long)]
    pub refresh: Option<String>,
}
