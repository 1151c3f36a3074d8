use crate::{
    Error,
    Result,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// Where the factory and tick master of one network were deployed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub factory_address: String,
    #[serde(default)]
    pub tick_master_address: Option<String>,
    pub network_url: String,
    pub chain_id: u64,
}

impl DeploymentRecord {
    pub fn new(
        factory_address: impl Into<String>,
        tick_master_address: Option<String>,
        network_url: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            deployed_at: Utc::now().to_rfc3339(),
            factory_address: factory_address.into(),
            tick_master_address,
            network_url: network_url.into(),
            chain_id,
        }
    }
}

/// Records are read from `<root>/<env>/deployments.json`. Nothing is created
/// on disk until the first record is appended.
#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Self {
        Self::in_root(DEPLOYMENTS_ROOT, env)
    }

    pub fn in_root(root: impl AsRef<Path>, env: DeploymentEnv) -> Self {
        let path = root.as_ref().join(env.dir_name()).join(DEPLOYMENTS_FILE);
        Self { path }
    }

    pub fn load(&self) -> Result<Vec<DeploymentRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_records(&self.path)
    }

    pub fn latest(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.load()?.pop())
    }

    pub fn append(&self, record: DeploymentRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        if let Some(env_dir) = self.path.parent() {
            fs::create_dir_all(env_dir).map_err(|e| {
                Error::Config(format!(
                    "failed to create {} directory: {e}",
                    env_dir.display()
                ))
            })?;
        }
        write_records(&self.path, &records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_records(path: &Path) -> Result<Vec<DeploymentRecord>> {
    let data = fs::read(path)
        .map_err(|e| Error::Config(format!("failed to read deployment records: {e}")))?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice::<Vec<DeploymentRecord>>(&data)
        .map_err(|e| Error::Config(format!("failed to parse deployment records JSON: {e}")))
}

fn write_records(path: &Path, records: &[DeploymentRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)?;
    fs::write(path, json)
        .map_err(|e| Error::Config(format!("failed to write deployment records: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn latest__empty_store__is_none() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(root.path(), DeploymentEnv::Local);

        // when
        let latest = store.latest().unwrap();

        // then
        assert_eq!(latest, None);
    }

    #[test]
    fn latest__reading_does_not_create_the_store() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(root.path(), DeploymentEnv::Test);

        // when
        let latest = store.latest().unwrap();

        // then
        assert_eq!(latest, None);
        assert!(!root.path().join("test").exists());
    }

    #[test]
    fn append__creates_missing_environment_directory() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(root.path().join("nested"), DeploymentEnv::Local);

        // when
        store
            .append(DeploymentRecord::new("0x01", None, "ws://local", 1337))
            .unwrap();

        // then
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn append__latest_returns_most_recent_record() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::in_root(root.path(), DeploymentEnv::Dev);
        let older = DeploymentRecord::new("0x01", None, "ws://a", 1);
        let newer = DeploymentRecord::new("0x02", Some(String::from("0x03")), "ws://b", 2);

        // when
        store.append(older).unwrap();
        store.append(newer.clone()).unwrap();

        // then
        assert_eq!(store.load().unwrap().len(), 2);
        assert_eq!(store.latest().unwrap(), Some(newer));
    }

    #[test]
    fn in_root__environments_are_kept_apart() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let dev = DeploymentStore::in_root(root.path(), DeploymentEnv::Dev);
        let test = DeploymentStore::in_root(root.path(), DeploymentEnv::Test);

        // when
        dev.append(DeploymentRecord::new("0x01", None, "ws://dev", 1))
            .unwrap();

        // then
        assert!(test.latest().unwrap().is_none());
        assert!(test.path().ends_with("test/deployments.json"));
    }
}
