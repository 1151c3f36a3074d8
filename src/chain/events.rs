use crate::{
    Error,
    Result,
    chain::factory_types::GameCreatedFilter,
};
use ethers::{
    abi::RawLog,
    contract::EthEvent,
    providers::{
        Middleware,
        Provider,
        Ws,
    },
    types::{
        Address,
        Filter,
        Log,
    },
};
use futures::StreamExt;
use serde::Serialize;
use std::{
    future::Future,
    pin::Pin,
    task::{
        Context,
        Poll,
    },
};
use tokio::{
    sync::{
        mpsc,
        oneshot,
    },
    task::JoinHandle,
};

const EVENT_BUFFER: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCreated {
    pub game_address: Address,
    pub lobby_id: String,
    pub sender: Address,
    pub origin: Address,
}

impl From<GameCreatedFilter> for GameCreated {
    fn from(event: GameCreatedFilter) -> Self {
        Self {
            game_address: event.game_address,
            lobby_id: event.lobby_id,
            sender: event.sender,
            origin: event.origin,
        }
    }
}

/// Decodes a log as a factory `GameCreated` event. Logs from other contracts
/// or topics yield `None`.
pub fn decode_game_created(log: &Log) -> Option<GameCreated> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    <GameCreatedFilter as EthEvent>::decode_log(&raw)
        .ok()
        .map(GameCreated::from)
}

/// First `GameCreated` event among `logs`, skipping anything that does not decode.
pub fn find_game_created(logs: &[Log]) -> Option<GameCreated> {
    logs.iter().find_map(decode_game_created)
}

pub trait GameCreationEvents {
    fn next_event(&mut self) -> impl Future<Output = Result<GameCreated>> + Send;
}

/// Consumes events until one carries exactly `lobby_id`.
pub async fn wait_for_lobby<E: GameCreationEvents>(
    events: &mut E,
    lobby_id: &str,
) -> Result<GameCreated> {
    loop {
        let event = events.next_event().await?;
        if event.lobby_id == lobby_id {
            tracing::info!(
                game_address = ?event.game_address,
                lobby_id = %event.lobby_id,
                "Game created"
            );
            return Ok(event);
        }
        tracing::debug!(lobby_id = %event.lobby_id, "ignoring game created for another lobby");
    }
}

/// Starts watching `events` for the game of `lobby_id`. The returned handle
/// resolves once, on the first match. Dropping or cancelling it releases the
/// subscription.
pub fn listen_for_game_creation<E>(events: E, lobby_id: impl Into<String>) -> GameWatch
where
    E: GameCreationEvents + Send + 'static,
{
    let lobby_id = lobby_id.into();
    tracing::info!(%lobby_id, "Listening for game creation");
    let task = tokio::spawn(async move {
        let mut events = events;
        wait_for_lobby(&mut events, &lobby_id).await
    });
    GameWatch { task }
}

#[derive(Debug)]
pub struct GameWatch {
    task: JoinHandle<Result<GameCreated>>,
}

impl GameWatch {
    pub fn cancel(self) {
        tracing::debug!("cancelling game creation watch");
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for GameWatch {
    type Output = Result<GameCreated>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) => {
                tracing::warn!(?err, "game creation watch task failed");
                Poll::Ready(Err(Error::SubscriptionClosed))
            }
        }
    }
}

impl Drop for GameWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// `GameCreated` events of one factory, fed from an `eth_subscribe` log
/// subscription. The node subscription is removed when this is dropped.
#[derive(Debug)]
pub struct FactoryLogStream {
    receiver: mpsc::Receiver<GameCreated>,
    forwarder: JoinHandle<()>,
}

impl FactoryLogStream {
    pub async fn subscribe(provider: Provider<Ws>, factory: Address) -> Result<Self> {
        let filter = Filter::new()
            .address(factory)
            .topic0(GameCreatedFilter::signature());
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        let (ready_sender, ready_receiver) = oneshot::channel();

        let forwarder = tokio::spawn(async move {
            let stream = match provider.subscribe_logs(&filter).await {
                Ok(stream) => {
                    let _ = ready_sender.send(Ok(()));
                    stream
                }
                Err(err) => {
                    let _ = ready_sender.send(Err(Error::chain(err)));
                    return;
                }
            };
            futures::pin_mut!(stream);
            while let Some(log) = stream.next().await {
                match decode_game_created(&log) {
                    Some(event) => {
                        if sender.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => tracing::debug!(
                        tx_hash = ?log.transaction_hash,
                        "skipping undecodable factory log"
                    ),
                }
            }
            tracing::debug!(?factory, "game creation log subscription ended");
        });

        ready_receiver
            .await
            .map_err(|_| Error::SubscriptionClosed)??;
        Ok(Self {
            receiver,
            forwarder,
        })
    }
}

impl GameCreationEvents for FactoryLogStream {
    async fn next_event(&mut self) -> Result<GameCreated> {
        self.receiver.recv().await.ok_or(Error::SubscriptionClosed)
    }
}

impl Drop for FactoryLogStream {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use ethers::{
        abi::{
            Token,
            encode,
        },
        types::{
            Bytes,
            H256,
        },
    };

    fn game_created_log(game: Address, lobby_id: &str) -> Log {
        let data = encode(&[
            Token::Address(game),
            Token::String(lobby_id.to_owned()),
            Token::Address(Address::from_low_u64_be(1)),
            Token::Address(Address::from_low_u64_be(2)),
        ]);
        Log {
            topics: vec![GameCreatedFilter::signature()],
            data: Bytes::from(data),
            ..Default::default()
        }
    }

    fn foreign_log() -> Log {
        Log {
            topics: vec![H256::repeat_byte(0x11)],
            data: Bytes::from(vec![0u8; 64]),
            ..Default::default()
        }
    }

    fn truncated_game_created_log() -> Log {
        Log {
            topics: vec![GameCreatedFilter::signature()],
            data: Bytes::from(vec![0u8; 8]),
            ..Default::default()
        }
    }

    #[test]
    fn find_game_created__picks_the_only_decodable_entry() {
        // given
        let game = Address::from_low_u64_be(0xABC);
        let logs = vec![
            foreign_log(),
            game_created_log(game, "lobby-1"),
            truncated_game_created_log(),
        ];

        // when
        let found = find_game_created(&logs);

        // then
        let found = found.expect("a decodable GameCreated log");
        assert_eq!(found.game_address, game);
        assert_eq!(found.lobby_id, "lobby-1");
        assert_eq!(found.sender, Address::from_low_u64_be(1));
        assert_eq!(found.origin, Address::from_low_u64_be(2));
    }

    #[test]
    fn find_game_created__nothing_decodes__returns_none() {
        // given
        let logs = vec![foreign_log(), truncated_game_created_log(), foreign_log()];

        // when
        let found = find_game_created(&logs);

        // then
        assert_eq!(found, None);
    }

    #[test]
    fn find_game_created__first_match_wins() {
        // given
        let first = Address::from_low_u64_be(0x1);
        let second = Address::from_low_u64_be(0x2);
        let logs = vec![game_created_log(first, "a"), game_created_log(second, "b")];

        // when
        let found = find_game_created(&logs).unwrap();

        // then
        assert_eq!(found.game_address, first);
    }

    #[test]
    fn game_created__serializes_with_camel_case_keys() {
        // given
        let event = GameCreated {
            game_address: Address::from_low_u64_be(0xABC),
            lobby_id: String::from("x"),
            sender: Address::zero(),
            origin: Address::zero(),
        };

        // when
        let value = serde_json::to_value(&event).unwrap();

        // then
        assert_eq!(
            value["gameAddress"],
            "0x0000000000000000000000000000000000000abc"
        );
        assert_eq!(value["lobbyId"], "x");
    }
}
