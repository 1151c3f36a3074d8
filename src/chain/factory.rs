use crate::{
    Error,
    Result,
    chain::{
        events::{
            GameCreated,
            GameCreationEvents,
            GameWatch,
            find_game_created,
            listen_for_game_creation,
        },
        factory_types::GameFactory,
    },
    status::StatusChannel,
};
use ethers::{
    providers::{
        Middleware,
        PendingTransaction,
    },
    types::{
        Address,
        TransactionReceipt,
        TxHash,
        U256,
    },
};
use std::{
    future::Future,
    pin::pin,
    sync::Arc,
    time::Duration,
};

/// Gas ceiling attached to every `createGame` transaction.
pub const CREATE_GAME_GAS_LIMIT: u64 = 2_000_000;

/// Write side of the game factory contract.
pub trait GameFactoryApi {
    fn send_create_game(
        &self,
        lobby_id: &str,
        players: &[Address],
        gas_limit: U256,
    ) -> impl Future<Output = Result<TxHash>>;

    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<TransactionReceipt>>;
}

impl<M: Middleware + 'static> GameFactoryApi for GameFactory<M> {
    async fn send_create_game(
        &self,
        lobby_id: &str,
        players: &[Address],
        gas_limit: U256,
    ) -> Result<TxHash> {
        let call = self
            .create_game(lobby_id.to_owned(), players.to_vec())
            .gas(gas_limit);
        let pending = call.send().await.map_err(Error::chain)?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let client = self.client();
        PendingTransaction::new(tx_hash, client.provider())
            .await
            .map_err(Error::chain)?
            .ok_or(Error::TransactionDropped(tx_hash))
    }
}

pub fn game_factory<M: Middleware>(address: Address, client: Arc<M>) -> GameFactory<M> {
    GameFactory::new(address, client)
}

/// Drives game creation on the factory and reports progress on the status line.
#[derive(Debug)]
pub struct GameCoordinator<F> {
    factory: F,
    status: StatusChannel,
}

impl<F: GameFactoryApi> GameCoordinator<F> {
    pub fn new(factory: F, status: StatusChannel) -> Self {
        Self { factory, status }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Submits `createGame` and scans the receipt for the factory's
    /// `GameCreated` event. `Ok(None)` means the transaction was included but
    /// its receipt carried no decodable event.
    pub async fn create_game(
        &self,
        lobby_id: &str,
        players: &[Address],
    ) -> Result<Option<GameCreated>> {
        tracing::info!(%lobby_id, ?players, "Creating game");
        self.status.set_status("Creating game...");
        let tx_hash = self
            .factory
            .send_create_game(lobby_id, players, U256::from(CREATE_GAME_GAS_LIMIT))
            .await?;
        tracing::info!(?tx_hash, "Transaction");
        self.status.set_status("Waiting for transaction...");
        let receipt = self.factory.wait_for_receipt(tx_hash).await?;
        tracing::info!(
            ?tx_hash,
            block = ?receipt.block_number,
            logs = receipt.logs.len(),
            "Receipt"
        );
        self.status.set_status("Game created.");
        let created = find_game_created(&receipt.logs);
        if created.is_none() {
            tracing::warn!(?tx_hash, "receipt carried no GameCreated event");
        }
        Ok(created)
    }

    /// Creates the game and confirms it by whichever arrives first: the
    /// event in the receipt, or a matching event on `events`. The whole
    /// exchange, receipt wait included, is bounded by `timeout`. The watch is
    /// registered before submission so the event cannot be missed; the losing
    /// side is dropped.
    pub async fn await_game_creation<E>(
        &self,
        events: E,
        lobby_id: &str,
        players: &[Address],
        timeout: Duration,
    ) -> Result<GameCreated>
    where
        E: GameCreationEvents + Send + 'static,
    {
        let mut watch = listen_for_game_creation(events, lobby_id);
        let confirmation = self.race_confirmation(&mut watch, lobby_id, players);
        let outcome = tokio::time::timeout(timeout, confirmation).await;
        watch.cancel();
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%lobby_id, ?timeout, "game creation not confirmed in time");
                Err(Error::ConfirmationTimeout(lobby_id.to_owned()))
            }
        }
    }

    async fn race_confirmation(
        &self,
        watch: &mut GameWatch,
        lobby_id: &str,
        players: &[Address],
    ) -> Result<GameCreated> {
        let mut creation = pin!(self.create_game(lobby_id, players));
        let from_receipt = tokio::select! {
            created = &mut creation => created?,
            event = &mut *watch => match event {
                Ok(event) => {
                    tracing::info!(%lobby_id, "game confirmed by event before its receipt");
                    self.status.set_status("Game created.");
                    return Ok(event);
                }
                Err(err) => {
                    tracing::warn!(%err, "game creation watch ended before the receipt");
                    return creation.await?.ok_or(err);
                }
            },
        };
        match from_receipt {
            Some(created) => Ok(created),
            None => {
                self.status.set_status("Waiting for game creation event...");
                watch.await
            }
        }
    }
}
