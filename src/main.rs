#![forbid(unsafe_code)]
//! coinmesh command line: run a primary registry, run a peer, import coins

use clap::{Args, Parser, Subcommand};
use coinmesh::config::NodeConfig;
use coinmesh::node::{NodeError, PeerNode, PrimaryNode};
use coinmesh::storage::StorageBackend;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coinmesh", version, about = "Peer-to-peer coin ledger replication")]
struct Cli {
    /// TOML config file; missing file means defaults
    #[arg(short, long, global = true, default_value = "coinmesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the primary registry node
    Primary(NodeArgs),
    /// Bootstrap against the network and serve coin collections
    Peer(NodeArgs),
    /// Deposit the unminted coins of a wallet coin file into this node's store
    ImportCoins {
        /// Coin file (JSON array of records)
        file: PathBuf,
        #[command(flatten)]
        node: NodeArgs,
    },
}

#[derive(Args)]
struct NodeArgs {
    /// Node id announced to the primary
    #[arg(long)]
    node_id: Option<String>,
    /// Host other nodes use to reach this node
    #[arg(long)]
    host: Option<String>,
    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,
    /// Primary registry as host:port
    #[arg(long)]
    primary: Option<String>,
    /// Directory holding persisted collections
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Storage backend: json or sled
    #[arg(long, value_parser = parse_backend)]
    storage: Option<StorageBackend>,
}

fn parse_backend(s: &str) -> Result<StorageBackend, String> {
    match s {
        "json" => Ok(StorageBackend::Json),
        "sled" => Ok(StorageBackend::Sled),
        other => Err(format!("unknown storage backend {:?}", other)),
    }
}

impl NodeArgs {
    fn apply(self, mut config: NodeConfig) -> NodeConfig {
        if let Some(id) = self.node_id {
            config = config.with_node_id(&id);
        }
        if let Some(host) = self.host {
            config = config.with_host(&host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(primary) = self.primary {
            config = config.with_primary(&primary);
        }
        if let Some(dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(storage) = self.storage {
            config = config.with_storage(storage);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), NodeError> {
    let file_config = NodeConfig::load(&cli.config)?;

    match cli.command {
        Command::Primary(args) => {
            let config = args.apply(file_config);
            let node = PrimaryNode::start(&config).await?;
            node.join().await;
        }
        Command::Peer(args) => {
            let config = args.apply(file_config);
            let (node, report) = PeerNode::start(&config).await?;
            info!(
                registered = report.registered,
                peers_discovered = report.peers_discovered,
                unminted_committed = report.unminted.is_committed(),
                minted_committed = report.minted.is_committed(),
                "Bootstrap finished"
            );
            node.join().await;
        }
        Command::ImportCoins { file, node } => {
            let config = node.apply(file_config);
            let added = PeerNode::import_coin_file(&config, &file).await?;
            info!(added, "Coins imported");
        }
    }

    Ok(())
}
