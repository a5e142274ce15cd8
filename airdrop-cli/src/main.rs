//! Airdrop Command Line Interface
//!
//! Usage:
//!   airdrop serve                  - Run the HTTP API
//!   airdrop campaign show          - Show campaign state
//!   airdrop users list             - List participants
//!   airdrop check-address <addr>   - Validate a wallet address
//!   airdrop parse-url <url>        - Parse a post URL

use airdrop_api::{run_server, ApiConfig, AppState};
use airdrop_chain::{ChainConfig, EvmTransferService};
use airdrop_core::content::{OEmbedConfig, OEmbedFetcher};
use airdrop_core::post_ref::{extract_handle, extract_id, validate_url};
use airdrop_core::{
    is_valid_address, to_checksum_address, CampaignDefaults, ParticipantStatus, PipelineSettings,
    RewardPipeline,
};
use airdrop_store::{open_store, StoreConfig, StoreHandles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod logging;

use logging::{init_logging, LogFormat};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "airdrop")]
#[command(about = "Promotional airdrop campaign service")]
#[command(version)]
struct Cli {
    /// Data directory for the persistent store; in-memory when omitted
    #[arg(short, long, env = "AIRDROP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, env = "AIRDROP_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, env = "AIRDROP_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, env = "AIRDROP_PORT", default_value = "3000")]
        port: u16,
        /// Disable permissive CORS
        #[arg(long)]
        no_cors: bool,
    },

    /// Campaign state
    Campaign {
        #[command(subcommand)]
        action: CampaignCommands,
    },

    /// Participant records
    Users {
        #[command(subcommand)]
        action: UsersCommands,
    },

    /// Validate a wallet address and print its checksummed form
    CheckAddress {
        address: String,
    },

    /// Validate a post URL and print its id and author
    ParseUrl {
        url: String,
    },
}

#[derive(Subcommand)]
enum CampaignCommands {
    /// Show the campaign document
    Show,
}

#[derive(Subcommand)]
enum UsersCommands {
    /// List participants, newest first
    List {
        /// Filter by status (pending, verified, rewarded, manual_review, rejected)
        #[arg(short, long)]
        status: Option<String>,
        /// Limit results
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format, "info") {
        eprintln!("Error: failed to initialise logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_command(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => {
            let stores = open_stores(cli.data_dir.as_ref())?;
            let state = build_state(stores)?;

            // Create the campaign document up front so misconfiguration shows at startup
            let campaign = state.pipeline.campaign().await?;
            info!(
                max_users = campaign.max_users,
                current_users = campaign.current_users,
                reward = %campaign.reward_amount,
                is_active = campaign.is_active,
                "Campaign loaded"
            );

            let config = ApiConfig {
                host,
                port,
                enable_cors: !no_cors,
            };
            run_server(config, state).await?;
            Ok(())
        }

        Commands::Campaign {
            action: CampaignCommands::Show,
        } => {
            let stores = open_stores(cli.data_dir.as_ref())?;
            let campaign = stores
                .campaigns
                .load_or_init(&CampaignDefaults::from_env())
                .await?;

            println!("Campaign:        {}", campaign.id);
            println!("Active:          {}", campaign.is_active);
            println!("Open:            {}", campaign.is_open());
            println!(
                "Participants:    {}/{}",
                campaign.current_users, campaign.max_users
            );
            println!("In flight:       {}", campaign.reserved_slots);
            println!("Remaining spots: {}", campaign.remaining_spots());
            println!("Reward:          {}", campaign.reward_amount);
            println!("Created:         {}", campaign.created_at.to_rfc3339());
            Ok(())
        }

        Commands::Users {
            action: UsersCommands::List { status, limit },
        } => {
            let status = match status.as_deref() {
                Some(s) => Some(
                    ParticipantStatus::parse(s).ok_or_else(|| format!("Unknown status: {}", s))?,
                ),
                None => None,
            };

            let stores = open_stores(cli.data_dir.as_ref())?;
            let participants = stores.participants.list_participants().await?;
            let selected: Vec<_> = participants
                .into_iter()
                .filter(|p| status.map_or(true, |s| p.status == s))
                .take(limit)
                .collect();

            if selected.is_empty() {
                println!("No participants found.");
                return Ok(());
            }

            for p in &selected {
                println!(
                    "{}  {:<13}  {}  @{}  {}  {}",
                    p.created_at.format("%Y-%m-%d %H:%M:%S"),
                    p.status.as_str(),
                    p.wallet_address,
                    p.author_handle.as_deref().unwrap_or("-"),
                    p.post_id,
                    p.tx_hash.as_deref().unwrap_or("-"),
                );
            }
            println!("{} participant(s)", selected.len());
            Ok(())
        }

        Commands::CheckAddress { address } => {
            if is_valid_address(&address) {
                println!("valid");
                if let Some(checksummed) = to_checksum_address(&address) {
                    println!("checksum: {}", checksummed);
                }
                Ok(())
            } else {
                Err(format!("invalid address: {}", address).into())
            }
        }

        Commands::ParseUrl { url } => {
            if !validate_url(&url) {
                return Err(format!("invalid post URL: {}", url).into());
            }
            println!("valid");
            println!("post id: {}", extract_id(&url).as_deref().unwrap_or("-"));
            println!("author:  {}", extract_handle(&url).as_deref().unwrap_or("-"));
            Ok(())
        }
    }
}

fn open_stores(data_dir: Option<&PathBuf>) -> CliResult<StoreHandles> {
    let config = match data_dir {
        Some(dir) => StoreConfig::Sled {
            data_dir: dir.clone(),
        },
        None => {
            warn!("No data directory given; using a volatile in-memory store");
            StoreConfig::Memory
        }
    };
    Ok(open_store(&config)?)
}

fn build_state(stores: StoreHandles) -> CliResult<AppState> {
    let fetcher = OEmbedFetcher::new(OEmbedConfig::from_env())?;
    let transfer = EvmTransferService::new(ChainConfig::from_env())?;

    let pipeline = RewardPipeline::new(
        stores.participants.clone(),
        stores.campaigns.clone(),
        Arc::new(fetcher),
        Arc::new(transfer),
        PipelineSettings::from_env(),
    );

    Ok(AppState::new(
        Arc::new(pipeline),
        stores.participants,
        stores.campaigns,
    ))
}
