use crate::{
    Error,
    Result,
    chain::parse_address,
    deployment::{
        DeploymentEnv,
        DeploymentRecord,
    },
};
use ethers::types::Address;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_LOCAL_RPC_URL: &str = "ws://localhost:8546";
pub const DEFAULT_LOCAL_CHAIN_ID: u64 = 1337;
pub const DEFAULT_PROFILE_DIR: &str = "~/.lobby-session";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkTarget {
    Devnet { url: String },
    Testnet { url: String },
    LocalNode { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Devnet { url }
            | NetworkTarget::Testnet { url }
            | NetworkTarget::LocalNode { url } => url,
        }
    }
}

/// Values given explicitly on the command line or in the environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub origin: Option<String>,
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub factory: Option<String>,
    pub tick_master: Option<String>,
    pub profile_dir: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub origin: Url,
    pub network: NetworkTarget,
    pub chain_id: u64,
    pub factory: Address,
    pub tick_master: Option<Address>,
    pub profile_dir: PathBuf,
}

impl SessionConfig {
    /// Explicit overrides win, then the latest deployment record of `env`,
    /// then the built-in defaults (local node only).
    pub fn resolve(
        env: DeploymentEnv,
        overrides: ConfigOverrides,
        latest: Option<DeploymentRecord>,
    ) -> Result<Self> {
        let ConfigOverrides {
            origin,
            rpc_url,
            chain_id,
            factory,
            tick_master,
            profile_dir,
        } = overrides;

        let origin = Url::parse(origin.as_deref().unwrap_or(DEFAULT_ORIGIN))?;

        let url = rpc_url
            .or_else(|| latest.as_ref().map(|r| r.network_url.clone()))
            .or_else(|| {
                matches!(env, DeploymentEnv::Local).then(|| DEFAULT_LOCAL_RPC_URL.to_string())
            })
            .ok_or_else(|| Error::Config(format!("no RPC URL known for {env}; pass --rpc-url")))?;
        let network = match env {
            DeploymentEnv::Dev => NetworkTarget::Devnet { url },
            DeploymentEnv::Test => NetworkTarget::Testnet { url },
            DeploymentEnv::Local => NetworkTarget::LocalNode { url },
        };

        let chain_id = chain_id
            .or_else(|| latest.as_ref().map(|r| r.chain_id))
            .or_else(|| matches!(env, DeploymentEnv::Local).then_some(DEFAULT_LOCAL_CHAIN_ID))
            .ok_or_else(|| Error::Config(format!("no chain id known for {env}; pass --chain-id")))?;

        let factory = factory
            .or_else(|| latest.as_ref().map(|r| r.factory_address.clone()))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no game factory address known for {env}; pass --factory or register a deployment"
                ))
            })?;
        let factory = parse_address(&factory)?;

        let tick_master = tick_master
            .or_else(|| latest.and_then(|r| r.tick_master_address))
            .map(|raw| parse_address(&raw))
            .transpose()?;

        let profile_dir = profile_dir.unwrap_or_else(|| DEFAULT_PROFILE_DIR.to_string());
        let profile_dir = PathBuf::from(shellexpand::tilde(&profile_dir).into_owned());

        Ok(Self {
            origin,
            network,
            chain_id,
            factory,
            tick_master,
            profile_dir,
        })
    }
}
