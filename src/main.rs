use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokenstore::{SweepOutcome, Token, TokenStore};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tokenstore=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = cli::Cli::parse();
    let (cfg, mut options) = tokenstore::config::load().context("loading configuration")?;
    if let Some(table) = args.table {
        options = options.table_name(table);
    }
    if let Some(secs) = args.gc_interval {
        options = options.gc_interval_secs(secs);
    }

    // Startup fails if the table cannot be provisioned.
    let store = TokenStore::connect(&cfg, options)
        .await
        .context("opening token store")?;

    let result = match args.command {
        Some(cli::Commands::Serve) | None => serve(&store).await,
        Some(cli::Commands::Migrate) => {
            println!("Table {} is ready.", store.table_name());
            Ok(())
        }
        Some(cli::Commands::Sweep) => match store.sweep_once().await {
            SweepOutcome::Clean => {
                println!("Nothing expired.");
                Ok(())
            }
            SweepOutcome::Purged(n) => {
                println!("Purged {} expired token(s).", n);
                Ok(())
            }
            SweepOutcome::Retry => Err(anyhow::anyhow!("delete of expired tokens failed")),
            SweepOutcome::Halt => Err(anyhow::anyhow!("counting expired tokens failed")),
        },
        Some(cli::Commands::Lookup(key)) => lookup(&store, key).await,
        Some(cli::Commands::Revoke(key)) => revoke(&store, key).await,
    };

    store.close().await;

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn serve(store: &TokenStore) -> anyhow::Result<()> {
    tracing::info!(table = store.table_name(), "token store running, Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("shutting down");
    Ok(())
}

async fn lookup(store: &TokenStore, key: cli::KeyArgs) -> anyhow::Result<()> {
    let found = match (key.code, key.access, key.refresh) {
        (Some(code), _, _) => store.get_by_code(&code).await?,
        (_, Some(access), _) => store.get_by_access(&access).await?,
        (_, _, Some(refresh)) => store.get_by_refresh(&refresh).await?,
        _ => anyhow::bail!("one of --code, --access or --refresh is required"),
    };

    match found {
        Some(info) => {
            let token = Token::from_info(info.as_ref());
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        None => println!("No token found."),
    }
    Ok(())
}

async fn revoke(store: &TokenStore, key: cli::KeyArgs) -> anyhow::Result<()> {
    match (key.code, key.access, key.refresh) {
        (Some(code), _, _) => store.remove_by_code(&code).await?,
        (_, Some(access), _) => store.remove_by_access(&access).await?,
        (_, _, Some(refresh)) => store.remove_by_refresh(&refresh).await?,
        _ => anyhow::bail!("one of --code, --access or --refresh is required"),
    }
    println!("Key cleared.");
    Ok(())
}
