//! vaultscope CLI: resolve, list, and build-tx against configured sources.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;
use url::Url;
use vaultscope::{Action, Address, CuratedVaults, Engine, EngineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();

    let config = engine_config(&cli)?;
    let engine = Engine::new(config)?;

    match cli.command {
        Command::Resolve { chain, vault } => {
            let record = engine.resolve_vault(chain, &vault).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::List { chains } => {
            let records = engine.list_vaults(&chains).await?;
            info!(count = records.len(), "vaults listed");
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::BuildTx {
            chain,
            vault,
            action,
            amount,
            user,
        } => {
            let record = engine.resolve_vault(chain, &vault).await?;
            let action = Action::from_str(&action)?;
            let user = Address::from_str(&user)?;
            let call = engine
                .build_transaction(&record, action, &amount, user)
                .await?;
            println!("{}", serde_json::to_string_pretty(&call)?);
        }
    }

    engine.shutdown();
    Ok(())
}

#[derive(Parser)]
#[command(name = "vaultscope")]
#[command(about = "Aggregate vault data, yield windows, and transaction payloads")]
struct Cli {
    /// REST API base URL.
    #[arg(long, default_value = "https://api.vaultscope.dev/v1")]
    api_url: String,

    /// Enabled chain ids.
    #[arg(long, value_delimiter = ',', default_value = "1")]
    chains: Vec<u64>,

    /// Subgraph endpoints as chain=url pairs, repeatable.
    #[arg(long = "subgraph")]
    subgraphs: Vec<String>,

    /// JSON-RPC endpoints as chain=url pairs, repeatable.
    #[arg(long = "rpc")]
    rpcs: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a single vault by address or slug.
    Resolve {
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        vault: String,
    },
    /// List all known vaults across chains.
    List {
        #[arg(long, value_delimiter = ',', default_value = "1")]
        chains: Vec<u64>,
    },
    /// Build an unsigned deposit/withdraw/approve call.
    BuildTx {
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        vault: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        user: String,
    },
}

fn engine_config(cli: &Cli) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = EngineConfig {
        chains: cli.chains.clone(),
        api_base_url: cli.api_url.clone(),
        curated: CuratedVaults::load(),
        ..EngineConfig::default()
    };
    config.subgraph_urls = parse_endpoints(&cli.subgraphs)?;
    config.rpc_urls = parse_endpoints(&cli.rpcs)?;
    Ok(config)
}

fn parse_endpoints(pairs: &[String]) -> Result<HashMap<u64, Url>, Box<dyn std::error::Error>> {
    let mut out = HashMap::new();
    for pair in pairs {
        let (chain, url) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected chain=url, got {pair:?}"))?;
        out.insert(chain.trim().parse::<u64>()?, Url::parse(url.trim())?);
    }
    Ok(out)
}
