use crate::{
    Error,
    Result,
    faucet::{
        self,
        DripOutcome,
    },
    identity::{
        BurnerWallet,
        IdentityStore,
        ProfileStorage,
    },
    lobby::LobbyClient,
    status::StatusChannel,
    transport::JsonTransport,
};
use ethers::{
    providers::Middleware,
    types::Address,
};
use url::Url;

/// Everything one play session needs, passed around explicitly.
#[derive(Debug)]
pub struct Session<S> {
    status: StatusChannel,
    identity: IdentityStore<S>,
    transport: JsonTransport,
    lobby: LobbyClient,
}

impl<S: ProfileStorage> Session<S> {
    pub fn new(origin: Url, storage: S) -> Result<Self> {
        let status = StatusChannel::new();
        let transport = JsonTransport::new(origin)?;
        let lobby = LobbyClient::new(transport.clone(), status.clone());
        Ok(Self {
            status,
            identity: IdentityStore::new(storage),
            transport,
            lobby,
        })
    }

    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    pub fn identity(&self) -> &IdentityStore<S> {
        &self.identity
    }

    pub fn lobby(&self) -> &LobbyClient {
        &self.lobby
    }

    pub fn transport(&self) -> &JsonTransport {
        &self.transport
    }

    pub fn burner_wallet<M: Middleware>(
        &self,
        connection: M,
        chain_id: u64,
    ) -> Result<BurnerWallet<M>> {
        self.identity.get_or_create_burner_wallet(connection, chain_id)
    }

    pub async fn request_drip(&self, address: Address) -> Result<DripOutcome> {
        faucet::request_drip(&self.transport, address).await
    }
}

/// The error sink: logs `error` and shows it on the status line.
pub fn catch_error(status: &StatusChannel, error: &Error) {
    tracing::error!(%error, "Error");
    status.set_status(format!("Error: {error}"));
}

/// Routes a failure through [`catch_error`] and leaves `None` behind, so an
/// absent value means "failed, already reported".
pub trait Reported<T> {
    fn or_report(self, status: &StatusChannel) -> Option<T>;
}

impl<T> Reported<T> for Result<T> {
    fn or_report(self, status: &StatusChannel) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                catch_error(status, &error);
                None
            }
        }
    }
}
