use crate::{
    Error,
    Result,
    status::StatusChannel,
    transport::JsonTransport,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

pub const NEW_LOBBY_PATH: &str = "/actions/new-lobby";
pub const JOIN_LOBBY_PATH: &str = "/actions/join-lobby";
const LOBBY_DATA_PREFIX: &str = "/data/lobby/";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLobbyRequest {
    pub players: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyRequest {
    pub lobby_id: String,
    pub player_address: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LobbyRoster {
    pub id: String,
    #[serde(default)]
    pub players: Vec<String>,
}

/// Lobby id carried by a backend response, if it has one.
pub fn lobby_id(response: &Value) -> Option<&str> {
    response.get("lobbyId").and_then(Value::as_str)
}

#[derive(Clone, Debug)]
pub struct LobbyClient {
    transport: JsonTransport,
    status: StatusChannel,
}

impl LobbyClient {
    pub fn new(transport: JsonTransport, status: StatusChannel) -> Self {
        Self { transport, status }
    }

    pub async fn new_lobby<T>(&self, data: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        tracing::info!(data = %to_log(data), "Creating new lobby");
        self.status.set_status("Creating game lobby...");
        let resp = self.transport.post_json(NEW_LOBBY_PATH, data).await?;
        self.status.set_status("Lobby created.");
        Ok(resp)
    }

    pub async fn join_lobby<T>(&self, data: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        tracing::info!(data = %to_log(data), "Joining lobby");
        self.status.set_status("Joining game lobby...");
        let resp = self.transport.post_json(JOIN_LOBBY_PATH, data).await?;
        self.status.set_status("Game joined.");
        Ok(resp)
    }

    pub async fn lobby_roster(&self, lobby_id: &str) -> Result<LobbyRoster> {
        let url = self.transport.item_endpoint(LOBBY_DATA_PREFIX, lobby_id)?;
        let value = self.transport.get_json_at(url).await?;
        serde_json::from_value(value).map_err(Error::from)
    }
}

fn to_log<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|_| String::from("<unserializable>"))
}
