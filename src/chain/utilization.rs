use crate::{
    Error,
    Result,
    chain::tick_master_types::TickMaster,
};
use ethers::{
    providers::Middleware,
    types::{
        Address,
        U256,
    },
};
use serde::Serialize;
use std::{
    future::Future,
    sync::Arc,
};

/// Read side of the tick master's gas allocation counters.
pub trait UtilizationSource {
    fn current_allocation(&self) -> impl Future<Output = Result<U256>>;
    fn max_allocation(&self) -> impl Future<Output = Result<U256>>;
}

impl<M: Middleware + 'static> UtilizationSource for TickMaster<M> {
    async fn current_allocation(&self) -> Result<U256> {
        self.total_gas_allocation().call().await.map_err(Error::chain)
    }

    async fn max_allocation(&self) -> Result<U256> {
        self.max_gas_allocation().call().await.map_err(Error::chain)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct UtilizationSnapshot {
    pub current: u128,
    pub max: u128,
    pub utilization: f64,
}

impl UtilizationSnapshot {
    /// A zero ceiling follows IEEE division: `NaN` when idle, infinite otherwise.
    pub fn new(current: u128, max: u128) -> Self {
        Self {
            current,
            max,
            utilization: current as f64 / max as f64,
        }
    }
}

/// Reads both counters one after the other. The reads are not atomic and may
/// observe different blocks.
pub async fn read_utilization<S: UtilizationSource>(source: &S) -> Result<UtilizationSnapshot> {
    let current = to_u128(source.current_allocation().await?)?;
    let max = to_u128(source.max_allocation().await?)?;
    Ok(UtilizationSnapshot::new(current, max))
}

pub async fn get_chain_utilization<M: Middleware + 'static>(
    connection: Arc<M>,
    tick_master: Address,
) -> Result<UtilizationSnapshot> {
    let contract = TickMaster::new(tick_master, connection);
    read_utilization(&contract).await
}

fn to_u128(value: U256) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(Error::Overflow(value));
    }
    Ok(value.as_u128())
}
