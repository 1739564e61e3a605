use anyhow::Result;
use clap::{Parser, Subcommand};
use farguard::cli::commands::{cmd_revoke, cmd_scan};
use farguard::cli::formatters::OutputFormat;
use farguard::config::Config;
use farguard::revoke::{RevokeError, Revoker, SignerClient};
use farguard::risk::RiskScorer;
use farguard::rpc::RpcClient;
use farguard::scanner::Scanner;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farguard")]
#[command(about = "Scan an account for risky token approvals and revoke them", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List token approvals held against an account
    Scan { account: String },
    /// Set a spender's allowance on a token to zero
    Revoke {
        #[arg(long)]
        token: String,

        #[arg(long)]
        spender: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("Discovery mode: {:?}", config.discovery_mode);
    info!("Age source: {:?}", config.age_source);

    match cli.command {
        Commands::Scan { account } => {
            let client = Arc::new(RpcClient::new(&config.json_rpc_url)?);
            let scorer = RiskScorer::new(client.clone(), config.age_source.clone());
            let scanner = Scanner::new(client, scorer, config.discovery_mode.clone());

            cmd_scan(&scanner, &account, &format).await?;
        }
        Commands::Revoke { token, spender } => {
            let private_key = config.private_key.as_deref().ok_or(RevokeError::MissingSigner)?;
            let signer = SignerClient::new(&config.json_rpc_url, private_key)?;
            info!("Signing as {:?}", signer.owner());
            let revoker = Revoker::new(signer);

            if let Err(e) = cmd_revoke(&revoker, &token, &spender, &format).await {
                error!("{:#}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
