use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const SESSIONS_ROOT: &str = ".boss-battle";
const SESSIONS_FILE: &str = "sessions.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkEnv {
    Sepolia,
    Local,
}

impl NetworkEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            NetworkEnv::Sepolia => "sepolia",
            NetworkEnv::Local => "local",
        }
    }
}

impl fmt::Display for NetworkEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkEnv::Sepolia => "Sepolia",
            NetworkEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// One account the user unlocked and allowed the client to use.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authorized_at: String,
    pub address: String,
    pub wallet: String,
    pub network_url: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl SessionRecord {
    pub fn new(
        address: impl Into<String>,
        wallet: impl Into<String>,
        network_url: impl Into<String>,
        chain_id: Option<u64>,
    ) -> Self {
        Self {
            authorized_at: Utc::now().to_rfc3339(),
            address: address.into(),
            wallet: wallet.into(),
            network_url: network_url.into(),
            chain_id,
        }
    }

    pub fn is_for_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl AsRef<Path>, env: NetworkEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in the order they were authorized, oldest first.
    pub fn load(&self) -> Result<Vec<SessionRecord>> {
        read_records(&self.path)
    }

    /// Records ordered most recent first.
    pub fn authorized(&self) -> Result<Vec<SessionRecord>> {
        let mut records = self.load()?;
        records.reverse();
        Ok(records)
    }

    /// Stores `record`, replacing any earlier entry for the same address.
    pub fn record(&self, record: SessionRecord) -> Result<()> {
        let mut records = self.load()?;
        records.retain(|existing| !existing.is_for_address(&record.address));
        tracing::debug!(address = %record.address, path = %self.path.display(), "recording session");
        records.push(record);
        write_records(&self.path, &records)
    }
}

pub fn default_root() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(SESSIONS_ROOT))
}

pub fn ensure_structure(root: impl AsRef<Path>) -> Result<()> {
    for env in [NetworkEnv::Sepolia, NetworkEnv::Local] {
        let _ = ensure_store(root.as_ref(), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: NetworkEnv) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root).with_context(|| {
            format!("Failed to create session directory {}", root.display())
        })?;
    }

    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create {} session directory", env.dir_name())
        })?;
    }

    let file_path = env_dir.join(SESSIONS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create session file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"")
            .with_context(|| format!("Failed to initialize session file for {}", env))?;
    }

    Ok(file_path)
}

fn read_records(path: impl AsRef<Path>) -> Result<Vec<SessionRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read session records")?;
    if data.is_empty() || data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    if let Ok(records) = serde_json::from_slice::<Vec<SessionRecord>>(&data) {
        return Ok(records);
    }
    if let Ok(record) = serde_json::from_slice::<SessionRecord>(&data) {
        return Ok(vec![record]);
    }
    Err(anyhow!(
        "Failed to parse session JSON at {}; expected a list of sessions",
        path.as_ref().display()
    ))
}

fn write_records(path: impl AsRef<Path>, records: &[SessionRecord]) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(records).context("Failed to serialize session records")?;
    fs::write(path.as_ref(), json).context("Failed to write session records")?;
    Ok(())
}
