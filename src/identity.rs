use crate::{
    Error,
    Result,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::Middleware,
    signers::{
        LocalWallet,
        Signer,
    },
};
#[cfg(unix)]
use std::os::unix::fs::{
    OpenOptionsExt,
    PermissionsExt,
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs,
    io::{
        self,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
    sync::Mutex,
};

/// Storage key the burner private key lives under.
pub const BURNER_KEY_STORAGE_KEY: &str = "burnerKey";
const STORAGE_FILE: &str = "storage.json";

pub type BurnerWallet<M> = SignerMiddleware<M, LocalWallet>;

/// String key/value storage scoped to one user profile.
pub trait ProfileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Profile storage backed by a JSON object file inside the profile directory.
#[derive(Debug, Clone)]
pub struct FileProfileStorage {
    path: PathBuf,
}

impl FileProfileStorage {
    pub fn open(profile_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = profile_dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Storage(format!(
                    "failed to create profile directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        let path = dir.join(STORAGE_FILE);
        if !path.exists() {
            write_owner_only(&path, b"{}").map_err(|e| {
                Error::Storage(format!(
                    "failed to initialize profile storage at {}: {e}",
                    path.display()
                ))
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_items(&self) -> Result<BTreeMap<String, String>> {
        let data = fs::read(&self.path).map_err(|e| {
            Error::Storage(format!("failed to read {}: {e}", self.path.display()))
        })?;
        if data.is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&data).map_err(|e| {
            Error::Storage(format!("corrupted profile storage {}: {e}", self.path.display()))
        })
    }

    fn write_items(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(items).map_err(Error::storage)?;
        write_owner_only(&self.path, &json).map_err(|e| {
            Error::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

impl ProfileStorage for FileProfileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_items()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.read_items()?;
        items.insert(key.to_owned(), value.to_owned());
        self.write_items(&items)
    }
}

/// The storage file holds a private key: readable and writable by its owner only.
fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path)?;
    // mode only applies when the file is created
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

/// Profile storage that only lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryProfileStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryProfileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let mut items = HashMap::new();
        items.insert(key.to_owned(), value.to_owned());
        Self {
            items: Mutex::new(items),
        }
    }
}

impl ProfileStorage for MemoryProfileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(Error::storage)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(Error::storage)?;
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Owns the single burner key of a profile.
#[derive(Debug)]
pub struct IdentityStore<S> {
    storage: S,
}

impl<S: ProfileStorage> IdentityStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the stored key, generating and persisting one on first use.
    pub fn get_or_create_key(&self) -> Result<String> {
        let stored = self
            .storage
            .get_item(BURNER_KEY_STORAGE_KEY)?
            .filter(|key| !key.is_empty());
        if let Some(key) = stored {
            return Ok(key);
        }
        let key = generate_key();
        self.storage.set_item(BURNER_KEY_STORAGE_KEY, &key)?;
        tracing::info!("generated new burner key");
        Ok(key)
    }

    pub fn signer(&self) -> Result<LocalWallet> {
        let key = self.get_or_create_key()?;
        parse_key(&key)
    }

    pub fn get_or_create_burner_wallet<M: Middleware>(
        &self,
        connection: M,
        chain_id: u64,
    ) -> Result<BurnerWallet<M>> {
        let signer = self.signer()?.with_chain_id(chain_id);
        Ok(SignerMiddleware::new(connection, signer))
    }
}

fn generate_key() -> String {
    loop {
        let candidate: [u8; 32] = rand::random();
        // zero and values past the curve order are not valid scalars
        if LocalWallet::from_bytes(&candidate).is_ok() {
            return format!("0x{}", hex::encode(candidate));
        }
    }
}

fn parse_key(raw: &str) -> Result<LocalWallet> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| Error::Storage(format!("stored burner key is not hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(Error::Storage(format!(
            "stored burner key has {} bytes, expected 32",
            bytes.len()
        )));
    }
    LocalWallet::from_bytes(&bytes)
        .map_err(|e| Error::Storage(format!("stored burner key is not a valid scalar: {e}")))
}
