use crate::{
    config::AppConfig,
    contract::{
        ChainGame,
        GameContract,
        ReadClient,
        SignerClient,
    },
    error::WalletError,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::{
        LocalWallet,
        MnemonicBuilder,
        Signer,
        coins_bip39::English,
    },
    types::Address,
};
use game_abi::parse_address;
use rpassword::prompt_password;
use sessions::{
    SessionRecord,
    SessionStore,
};
use std::{
    collections::HashMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};
use tracing::{
    debug,
    info,
    warn,
};

/// The capabilities the client needs from whatever holds the user's keys.
pub trait WalletProvider {
    type Contract: GameContract;

    /// Accounts the user already authorized. Must not prompt.
    fn list_authorized(&self) -> impl Future<Output = Result<Vec<Address>, WalletError>>;

    /// Asks the user to authorize an account. May prompt.
    fn request_authorization(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Address>, WalletError>>;

    fn contract_handle(&self, account: Address) -> Result<Self::Contract, WalletError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_dir(dir: Option<&str>, default: impl FnOnce() -> Result<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default(),
    }
}

/// Keystore files in `dir`, sorted by name. Foundry writes them without an
/// extension; `.json` files are accepted too.
pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let entry = entry.wrap_err("Failed to read wallet entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            None | Some("json") => {}
            Some(_) => continue,
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid wallet filename {:?}", path))?
            .to_owned();
        if name.starts_with('.') {
            continue;
        }
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

/// Decrypts a keystore holding either a raw private key or a mnemonic.
pub fn unlock_wallet(
    descriptor: &WalletDescriptor,
    password: &str,
) -> Result<LocalWallet, WalletError> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes()).map_err(|_| {
        WalletError::Rejected(format!("Invalid password for wallet '{}'", descriptor.name))
    })?;

    if let Ok(wallet) = LocalWallet::from_bytes(&secret) {
        return Ok(wallet);
    }

    if let Ok(mnemonic) = std::str::from_utf8(&secret)
        && mnemonic.split_whitespace().count() >= 12
    {
        return MnemonicBuilder::<English>::default()
            .phrase(mnemonic)
            .build()
            .map_err(|e| WalletError::Request(e.to_string()));
    }

    Err(WalletError::Request(format!(
        "Wallet '{}' contained unsupported key material",
        descriptor.name
    )))
}

/// Wallet provider backed by a directory of encrypted keystores.
pub struct KeystoreWallet {
    keystores: Vec<WalletDescriptor>,
    preferred: Option<String>,
    provider: Arc<ReadClient>,
    network_url: String,
    contract: Address,
    sessions: SessionStore,
    unlocked: HashMap<Address, Arc<SignerClient>>,
}

impl KeystoreWallet {
    /// Returns `None` when the wallet directory holds no keystores.
    pub fn detect(config: &AppConfig, sessions: SessionStore) -> Result<Option<Self>> {
        let keystores = list_wallets(&config.wallet_dir)?;
        if keystores.is_empty() {
            info!(dir = %config.wallet_dir.display(), "no keystores found");
            return Ok(None);
        }
        debug!(count = keystores.len(), "keystores found");
        let provider = Provider::<Http>::try_from(config.network.url())
            .wrap_err_with(|| format!("Invalid RPC URL {}", config.network.url()))?;
        Ok(Some(Self {
            keystores,
            preferred: config.wallet_name.clone(),
            provider: Arc::new(provider),
            network_url: config.network.url().to_string(),
            contract: config.contract,
            sessions,
            unlocked: HashMap::new(),
        }))
    }

    fn choose_keystore(&self) -> Result<&WalletDescriptor, WalletError> {
        match &self.preferred {
            Some(name) => self
                .keystores
                .iter()
                .find(|w| &w.name == name)
                .ok_or_else(|| WalletError::Request(format!("Wallet '{name}' not found"))),
            None => self.keystores.first().ok_or(WalletError::NoProvider),
        }
    }

    fn knows_wallet(&self, name: &str) -> bool {
        self.keystores.iter().any(|w| w.name == name)
    }
}

impl WalletProvider for KeystoreWallet {
    type Contract = ChainGame;

    async fn list_authorized(&self) -> Result<Vec<Address>, WalletError> {
        let records = self
            .sessions
            .authorized()
            .map_err(|e| WalletError::Request(format!("{e:#}")))?;
        let accounts = records
            .into_iter()
            .filter(|record| self.knows_wallet(&record.wallet))
            .filter_map(|record| match parse_address(&record.address) {
                Ok(address) => Some(address),
                Err(e) => {
                    warn!(address = %record.address, error = %e, "skipping malformed session");
                    None
                }
            })
            .collect();
        Ok(accounts)
    }

    async fn request_authorization(&mut self) -> Result<Vec<Address>, WalletError> {
        let descriptor = self.choose_keystore()?.clone();
        let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
        let password = prompt_password(prompt)
            .map_err(|e| WalletError::Rejected(format!("Failed to read password: {e}")))?;
        let wallet = unlock_wallet(&descriptor, &password)?;

        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| WalletError::Request(format!("Failed to query chain id: {e}")))?
            .as_u64();
        let wallet = wallet.with_chain_id(chain_id);
        let address = wallet.address();

        let client = SignerMiddleware::new(self.provider.as_ref().clone(), wallet);
        self.unlocked.insert(address, Arc::new(client));

        let record = SessionRecord::new(
            format!("{address:#x}"),
            descriptor.name.clone(),
            self.network_url.clone(),
            Some(chain_id),
        );
        if let Err(e) = self.sessions.record(record) {
            warn!(error = %format!("{e:#}"), "failed to remember session");
        }
        info!(account = ?address, wallet = %descriptor.name, "wallet unlocked");
        Ok(vec![address])
    }

    fn contract_handle(&self, account: Address) -> Result<ChainGame, WalletError> {
        Ok(ChainGame::new(
            self.contract,
            account,
            self.provider.clone(),
            self.unlocked.get(&account).cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn list_wallets__keeps_keystores_sorted_and_skips_other_files() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(dir.path().join("zed"), b"{}").unwrap();
        fs::write(dir.path().join("alice.json"), b"{}").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::write(dir.path().join(".hidden"), b"{}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        // when
        let wallets = list_wallets(dir.path()).unwrap();

        // then
        let names: Vec<_> = wallets.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "zed"]);
    }

    #[test]
    fn list_wallets__missing_dir_is_empty() {
        let dir = TempDir::new("keystores").unwrap();
        let wallets = list_wallets(&dir.path().join("missing")).unwrap();
        assert!(wallets.is_empty());
    }

    #[test]
    fn unlock_wallet__unreadable_keystore_is_rejected() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        let path = dir.path().join("broken");
        fs::write(&path, b"{}").unwrap();
        let descriptor = WalletDescriptor::new("broken", path);

        // when
        let res = unlock_wallet(&descriptor, "hunter2");

        // then
        assert!(matches!(res, Err(WalletError::Rejected(_))));
    }

    #[test]
    fn resolve_dir__expands_tilde_and_falls_back_to_default() {
        // given
        let fallback = PathBuf::from("/fallback");

        // when
        let explicit = resolve_dir(Some("/tmp/keys"), || Ok(fallback.clone())).unwrap();
        let defaulted = resolve_dir(None, || Ok(fallback.clone())).unwrap();

        // then
        assert_eq!(explicit, PathBuf::from("/tmp/keys"));
        assert_eq!(defaulted, fallback);
    }
}
