use crate::{
    Error,
    Result,
};
use ethers::{
    providers::{
        Provider,
        Ws,
    },
    types::Address,
};
use std::str::FromStr;

pub mod events;
pub mod factory;
pub mod utilization;

pub mod factory_types {
    use ethers::contract::abigen;

    abigen!(
        GameFactory,
        r#"[
            function createGame(string lobbyId, address[] _players) returns (address)
            event GameCreated(address gameAddress, string lobbyId, address sender, address origin)
        ]"#
    );
}

pub mod tick_master_types {
    use ethers::contract::abigen;

    abigen!(
        TickMaster,
        r#"[
            function totalGasAllocation() view returns (uint256)
            function maxGasAllocation() view returns (uint256)
        ]"#
    );
}

/// Opens a WebSocket connection to the chain node.
pub async fn connect(ws_url: &str) -> Result<Provider<Ws>> {
    tracing::info!("Connecting to chain node at URL: {ws_url}");
    Provider::<Ws>::connect(ws_url)
        .await
        .map_err(|e| Error::Chain(format!("failed to connect to {ws_url}: {e}")))
}

pub fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|_| Error::InvalidAddress(raw.to_owned()))
}

pub fn parse_players<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Address>> {
    raw.iter().map(|p| parse_address(p.as_ref())).collect()
}
