use crate::{
    Result,
    transport::{
        JsonTransport,
        is_truthy,
    },
};
use ethers::{
    types::Address,
    utils::to_checksum,
};
use serde::Serialize;
use serde_json::Value;

pub const REQUEST_DRIP_PATH: &str = "/actions/request-drip";

#[derive(Debug, Serialize)]
struct DripRequest {
    address: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DripOutcome {
    pub ok: bool,
    pub tx_hash: Option<String>,
}

impl From<&Value> for DripOutcome {
    fn from(resp: &Value) -> Self {
        Self {
            ok: is_truthy(resp.get("ok")),
            tx_hash: resp.get("txHash").and_then(Value::as_str).map(str::to_owned),
        }
    }
}

/// Asks the backend faucet to top up `address`. A response without a truthy
/// `ok` means the faucet declined (for instance the balance is already high).
pub async fn request_drip(transport: &JsonTransport, address: Address) -> Result<DripOutcome> {
    let address = to_checksum(&address, None);
    tracing::info!(%address, "Requesting drip");
    let resp = transport
        .post_json(REQUEST_DRIP_PATH, &DripRequest { address })
        .await?;
    let outcome = DripOutcome::from(&resp);
    if outcome.ok {
        tracing::info!(tx_hash = ?outcome.tx_hash, "Drip requested successfully");
    }
    Ok(outcome)
}
