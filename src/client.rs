use crate::Command;
use color_eyre::eyre::{
    Result,
    eyre,
};
use ethers::{
    providers::{
        Provider,
        Ws,
    },
    signers::Signer,
    types::Address,
    utils::to_checksum,
};
use lobby_session::{
    chain::{
        self,
        events::{
            FactoryLogStream,
            listen_for_game_creation,
        },
        factory::{
            GameCoordinator,
            game_factory,
        },
        utilization::get_chain_utilization,
    },
    config::SessionConfig,
    identity::{
        BurnerWallet,
        FileProfileStorage,
    },
    lobby::{
        self,
        JoinLobbyRequest,
        NewLobbyRequest,
    },
    session::{
        Reported,
        Session,
    },
    status::StatusChannel,
};
use serde::Serialize;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::sync::watch;

type Wallet = Arc<BurnerWallet<Provider<Ws>>>;

pub async fn run_app(config: SessionConfig, command: Command) -> Result<()> {
    let storage = FileProfileStorage::open(&config.profile_dir)?;
    let session = Session::new(config.origin.clone(), storage)?;
    let printer = tokio::spawn(print_status(session.status().subscribe()));

    let outcome = dispatch(&config, &session, command).await;

    // let the printer show the final status before it goes away
    tokio::task::yield_now().await;
    printer.abort();
    outcome
}

async fn print_status(mut updates: watch::Receiver<String>) {
    while updates.changed().await.is_ok() {
        let status = updates.borrow_and_update().clone();
        println!("[status] {status}");
    }
}

async fn dispatch(
    config: &SessionConfig,
    session: &Session<FileProfileStorage>,
    command: Command,
) -> Result<()> {
    let status = session.status();
    match command {
        Command::Address => {
            let address = own_address(session, status)?;
            println!("{}", to_checksum(&address, None));
        }
        Command::NewLobby { players, data } => {
            let resp = match data {
                Some(raw) => {
                    let data: serde_json::Value = serde_json::from_str(&raw)?;
                    reported(session.lobby().new_lobby(&data).await, status, "new lobby")?
                }
                None => {
                    let players = players_or_self(session, status, players)?;
                    let req = NewLobbyRequest { players };
                    reported(session.lobby().new_lobby(&req).await, status, "new lobby")?
                }
            };
            print_json(&resp)?;
        }
        Command::JoinLobby { lobby_id } => {
            let address = own_address(session, status)?;
            let req = JoinLobbyRequest {
                lobby_id,
                player_address: to_checksum(&address, None),
            };
            let resp = reported(session.lobby().join_lobby(&req).await, status, "join lobby")?;
            print_json(&resp)?;
        }
        Command::Roster { lobby_id } => {
            let roster =
                reported(session.lobby().lobby_roster(&lobby_id).await, status, "roster")?;
            println!("lobby {}", roster.id);
            for player in roster.players {
                println!("  {player}");
            }
        }
        Command::CreateGame { lobby_id, players } => {
            let players = reported(chain::parse_players(&players), status, "players")?;
            let (_, wallet) = connect_wallet(config, session).await?;
            let coordinator =
                GameCoordinator::new(game_factory(config.factory, wallet), status.clone());
            let created = reported(
                coordinator.create_game(&lobby_id, &players).await,
                status,
                "create game",
            )?;
            match created {
                Some(event) => print_json(&event)?,
                None => println!("receipt carried no GameCreated event"),
            }
        }
        Command::Listen { lobby_id } => {
            let provider = reported(chain::connect(config.network.url()).await, status, "connect")?;
            let events = reported(
                FactoryLogStream::subscribe(provider, config.factory).await,
                status,
                "subscribe",
            )?;
            status.set_status(format!("Waiting for game of lobby {lobby_id}..."));
            let event = reported(
                listen_for_game_creation(events, lobby_id).await,
                status,
                "listen",
            )?;
            print_json(&event)?;
        }
        Command::Play {
            players,
            timeout_secs,
        } => {
            play(config, session, players, Duration::from_secs(timeout_secs)).await?;
        }
        Command::Drip => {
            let address = own_address(session, status)?;
            let outcome = reported(session.request_drip(address).await, status, "drip")?;
            if outcome.ok {
                println!("drip sent: {}", outcome.tx_hash.unwrap_or_default());
            } else {
                println!("faucet declined; balance is probably sufficient");
            }
        }
        Command::Utilization => {
            let tick_master = config
                .tick_master
                .ok_or_else(|| eyre!("no tick master address configured; pass --tick-master"))?;
            let provider = reported(chain::connect(config.network.url()).await, status, "connect")?;
            let snapshot = reported(
                get_chain_utilization(Arc::new(provider), tick_master).await,
                status,
                "utilization",
            )?;
            print_json(&snapshot)?;
        }
        Command::RegisterDeployment { .. } => {
            return Err(eyre!("register-deployment is handled before the session starts"));
        }
    }
    Ok(())
}

async fn play(
    config: &SessionConfig,
    session: &Session<FileProfileStorage>,
    players: Vec<String>,
    timeout: Duration,
) -> Result<()> {
    let status = session.status();
    let players = players_or_self(session, status, players)?;
    let resp = reported(
        session.lobby().new_lobby(&NewLobbyRequest { players }).await,
        status,
        "new lobby",
    )?;
    let lobby_id = lobby::lobby_id(&resp)
        .ok_or_else(|| eyre!("lobby response carried no lobbyId: {resp}"))?
        .to_owned();
    tracing::info!(%lobby_id, "lobby ready");

    let roster = reported(session.lobby().lobby_roster(&lobby_id).await, status, "roster")?;
    let players = reported(chain::parse_players(&roster.players), status, "players")?;

    let (provider, wallet) = connect_wallet(config, session).await?;
    let events = reported(
        FactoryLogStream::subscribe(provider, config.factory).await,
        status,
        "subscribe",
    )?;
    let coordinator = GameCoordinator::new(game_factory(config.factory, wallet), status.clone());
    let created = reported(
        coordinator
            .await_game_creation(events, &lobby_id, &players, timeout)
            .await,
        status,
        "play",
    )?;
    print_json(&created)?;
    Ok(())
}

async fn connect_wallet(
    config: &SessionConfig,
    session: &Session<FileProfileStorage>,
) -> Result<(Provider<Ws>, Wallet)> {
    let status = session.status();
    let provider = reported(chain::connect(config.network.url()).await, status, "connect")?;
    let wallet = reported(
        session.burner_wallet(provider.clone(), config.chain_id),
        status,
        "burner wallet",
    )?;
    tracing::info!(address = ?wallet.address(), "burner wallet ready");
    Ok((provider, Arc::new(wallet)))
}

fn own_address(session: &Session<FileProfileStorage>, status: &StatusChannel) -> Result<Address> {
    let signer = reported(session.identity().signer(), status, "identity")?;
    Ok(signer.address())
}

fn players_or_self(
    session: &Session<FileProfileStorage>,
    status: &StatusChannel,
    players: Vec<String>,
) -> Result<Vec<String>> {
    if !players.is_empty() {
        return Ok(players);
    }
    Ok(vec![to_checksum(&own_address(session, status)?, None)])
}

fn reported<T>(result: lobby_session::Result<T>, status: &StatusChannel, what: &str) -> Result<T> {
    result.or_report(status).ok_or_else(|| eyre!("{what} failed"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
