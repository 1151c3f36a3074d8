use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use lobby_session::{
    config::{
        ConfigOverrides,
        DEFAULT_LOCAL_CHAIN_ID,
        DEFAULT_LOCAL_RPC_URL,
        SessionConfig,
    },
    deployment::{
        DeploymentEnv,
        DeploymentRecord,
        DeploymentStore,
    },
};
use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "dev", "test"])
            .required(true)
    )
)]
struct Args {
    #[arg(long)]
    local: bool,

    #[arg(long)]
    dev: bool,

    #[arg(long)]
    test: bool,

    /// Origin of the lobby backend
    #[arg(long, env = "LOBBY_SESSION_ORIGIN")]
    origin: Option<String>,

    /// WebSocket RPC URL of the chain node
    #[arg(long, env = "LOBBY_SESSION_RPC_URL")]
    rpc_url: Option<String>,

    #[arg(long, env = "LOBBY_SESSION_CHAIN_ID")]
    chain_id: Option<u64>,

    /// Game factory contract address
    #[arg(long, env = "LOBBY_SESSION_FACTORY")]
    factory: Option<String>,

    /// Tick master contract address, needed for `utilization`
    #[arg(long, env = "LOBBY_SESSION_TICK_MASTER")]
    tick_master: Option<String>,

    /// Directory holding the burner key and logs
    #[arg(long, env = "LOBBY_SESSION_PROFILE_DIR")]
    profile_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the burner wallet address
    Address,
    /// Create a lobby; defaults to a lobby holding only this wallet
    NewLobby {
        #[arg(long = "player")]
        players: Vec<String>,
        /// Raw JSON body to send instead of the player list
        #[arg(long, conflicts_with = "players")]
        data: Option<String>,
    },
    /// Join an existing lobby with this wallet
    JoinLobby { lobby_id: String },
    /// Show the players registered in a lobby
    Roster { lobby_id: String },
    /// Submit createGame and read the game address from the receipt
    CreateGame {
        lobby_id: String,
        #[arg(long = "player", required = true)]
        players: Vec<String>,
    },
    /// Wait for the factory to announce the game of a lobby
    Listen { lobby_id: String },
    /// New lobby, then create the game and wait for its confirmation
    Play {
        #[arg(long = "player")]
        players: Vec<String>,
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
    /// Ask the backend faucet to fund this wallet
    Drip,
    /// Show the chain's gas allocation utilization
    Utilization,
    /// Record factory and tick master addresses for the selected network
    RegisterDeployment {
        factory: String,
        #[arg(long = "tick")]
        tick_master: Option<String>,
    },
}

impl Args {
    fn deployment_env(&self) -> DeploymentEnv {
        if self.local {
            DeploymentEnv::Local
        } else if self.dev {
            DeploymentEnv::Dev
        } else {
            DeploymentEnv::Test
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            origin: self.origin.clone(),
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            factory: self.factory.clone(),
            tick_master: self.tick_master.clone(),
            profile_dir: self.profile_dir.clone(),
        }
    }
}

fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "lobby-session.log"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))?;
    Ok(guard)
}

fn register_deployment(
    args: &Args,
    store: &DeploymentStore,
    factory: &str,
    tick_master: Option<String>,
) -> Result<()> {
    let env = args.deployment_env();
    let local = matches!(env, DeploymentEnv::Local);
    let network_url = match (&args.rpc_url, local) {
        (Some(url), _) => url.clone(),
        (None, true) => DEFAULT_LOCAL_RPC_URL.to_string(),
        (None, false) => return Err(eyre!("--rpc-url is required to register a {env} deployment")),
    };
    let chain_id = match (args.chain_id, local) {
        (Some(id), _) => id,
        (None, true) => DEFAULT_LOCAL_CHAIN_ID,
        (None, false) => return Err(eyre!("--chain-id is required to register a {env} deployment")),
    };
    lobby_session::chain::parse_address(factory)?;
    if let Some(tick) = tick_master.as_deref() {
        lobby_session::chain::parse_address(tick)?;
    }
    store.append(DeploymentRecord::new(factory, tick_master, network_url, chain_id))?;
    println!("Recorded {env} deployment in {}", store.path().display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let env = args.deployment_env();
    let store = DeploymentStore::new(env);

    if let Command::RegisterDeployment {
        factory,
        tick_master,
    } = &args.command
    {
        return register_deployment(&args, &store, factory, tick_master.clone());
    }

    let latest = store.latest().wrap_err("loading deployment")?;
    let config = SessionConfig::resolve(env, args.overrides(), latest)?;
    let _guard = init_tracing(&config.profile_dir.join("logs"))?;
    tracing::info!(network = %env, "starting lobby-session client");
    client::run_app(config, args.command).await
}
