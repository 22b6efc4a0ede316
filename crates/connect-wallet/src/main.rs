//! connect-wallet - drive a wallet through the connect facade from the command line.
//!
//! The wallet is reached through a JSON-RPC wallet proxy (`--proxy-url` or
//! `CONNECT_WALLET_PROXY_URL`). Without one, the development profile falls back to the
//! deterministic in-memory wallet.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use serde::Serialize;
use tracing::{info, warn};

use connect_wallet_adapters::{
    ConnectAdapterConfig, InjectedProvider, StaticEnvironment, SystemClockAdapter, WalletRpcClient,
};
use connect_wallet_core::{
    chains, AccountInfo, ConnectWallet, NetworkRequest, ProviderConfig, Settings, WalletHandle,
};

type Facade = ConnectWallet<StaticEnvironment, WalletRpcClient, SystemClockAdapter>;

/// connect-wallet: connect to a wallet and query it
#[derive(Parser)]
#[command(name = "connect-wallet")]
#[command(about = "Connect to a wallet and query it through the connect facade", long_about = None)]
struct Cli {
    /// JSON-RPC wallet proxy; overrides CONNECT_WALLET_PROXY_URL
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    /// Wallet to connect: MetaMask, WalletConnect, WalletLink or KardiaChain
    #[arg(short, long, global = true, default_value = "MetaMask")]
    wallet: String,

    /// Requested chain id
    #[arg(short, long, global = true, default_value = "1")]
    chain_id: u64,

    /// Tag every result with the wallet name
    #[arg(long, global = true)]
    provider_type: bool,

    /// Infura project id for SDK-built WalletLink providers
    #[arg(long, global = true, env = "CONNECT_WALLET_INFURA_ID")]
    infura_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print the active account
    Accounts,

    /// Print the native balance of an address (default: the connected account)
    Balance {
        #[arg(value_name = "ADDRESS")]
        address: Option<Address>,
    },

    /// Wait until a transaction is mined
    Tx {
        #[arg(value_name = "HASH")]
        hash: B256,

        /// Give up after this many receipt queries
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Print wallet events until interrupted
    Watch {
        /// Proxy polling interval in milliseconds
        #[arg(short, long, default_value = "2000")]
        interval: u64,
    },

    /// List the chain registry
    Chains,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start the async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Chains = cli.command {
        return print_json(&chains::registry_snapshot());
    }

    let mut config = ConnectAdapterConfig::try_from_env()?;
    if let Some(url) = &cli.proxy_url {
        config.wallet_proxy_url = Some(url.clone());
    }
    if let Commands::Tx {
        max_attempts: Some(max),
        ..
    } = &cli.command
    {
        config.tx_poll_max_attempts = Some(*max);
    }

    let wallet = InjectedProvider::with_config(&config);
    info!(
        mode = wallet.mode_name(),
        wallet = %cli.wallet,
        chain_id = cli.chain_id,
        "wallet runtime ready"
    );

    let mut facade = build_facade(&config, &wallet);
    let account = connect(&mut facade, &cli).await?;

    match cli.command {
        Commands::Accounts => print_json(&account),
        Commands::Balance { address } => {
            let target = address.unwrap_or(account.address);
            let wei = facade.get_balance(target).await?;
            print_json(&serde_json::json!({
                "address": target,
                "balance": wei.to_string(),
            }))
        }
        Commands::Tx { hash, .. } => {
            let receipt = tokio::select! {
                receipt = facade.tx_check(hash) => receipt?,
                _ = tokio::signal::ctrl_c() => bail!("interrupted while waiting for {hash}"),
            };
            print_json(&receipt)
        }
        Commands::Watch { interval } => watch(&mut facade, &wallet, interval).await,
        Commands::Chains => Ok(()),
    }
}

/// Every wallet kind is served by the same proxied wallet; its marker flags
/// (`CONNECT_WALLET_PROXY_FLAGS`) decide which probes accept it.
fn build_facade(config: &ConnectAdapterConfig, wallet: &InjectedProvider) -> Facade {
    let handle: WalletHandle = Arc::new(wallet.clone());
    let session = Arc::clone(&handle);
    let sdk = Arc::clone(&handle);
    let env = StaticEnvironment::new()
        .with_global("ethereum", Arc::clone(&handle))
        .with_global("kardiachain", Arc::clone(&handle))
        .with_global("coinbaseWalletExtension", handle)
        .with_session_factory(move |_, _| Ok(Arc::clone(&session)))
        .with_sdk_factory(move |_, _, _| Ok(Arc::clone(&sdk)));
    ConnectWallet::new(env, SystemClockAdapter, config.app_name.clone())
        .with_poll_policy(config.poll_policy())
}

async fn connect(facade: &mut Facade, cli: &Cli) -> Result<AccountInfo> {
    let provider = ProviderConfig {
        infura_id: cli.infura_id.clone(),
        ..ProviderConfig::named(cli.wallet.clone())
    };
    let settings = Settings {
        provider_type: cli.provider_type,
    };
    let result = facade
        .connect(&provider, NetworkRequest::new(cli.chain_id), Some(settings))
        .await;
    if !result.connected {
        print_json(&result)?;
        bail!("[{}] {}", result.code, result.message.text);
    }
    Ok(facade.get_accounts().await?)
}

async fn watch(facade: &mut Facade, wallet: &InjectedProvider, interval: u64) -> Result<()> {
    let mut stream = facade.event_subscriber()?;
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => break,
            _ = tokio::time::sleep(Duration::from_millis(interval)) => {}
        }
        if let Err(e) = wallet.poll_events().await {
            warn!(error = %e, "wallet poll failed");
        }
        while let Some(item) = stream.try_next().await {
            match item {
                Ok(event) => print_json(&event)?,
                Err(err) => {
                    warn!(code = %err.code, "{err}");
                    print_json(&err)?;
                }
            }
        }
    }

    info!("interrupted; releasing wallet listeners");
    facade.reset_connect();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
