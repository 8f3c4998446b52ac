use crate::wallets;
use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use ethers::types::Address;
use sessions::NetworkEnv;
use std::path::PathBuf;

pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://rpc.sepolia.org";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";

#[derive(Parser, Debug)]
#[command(
    name = "boss-battle",
    version,
    about = "Terminal client for the Boss Battle on-chain game",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["sepolia", "local"])
    )
)]
pub struct Cli {
    /// Connect to Sepolia (default)
    #[arg(long)]
    pub sepolia: bool,

    /// Connect to a local node
    #[arg(long)]
    pub local: bool,

    /// Override the RPC URL for the selected network
    #[arg(long = "rpc-url")]
    pub rpc_url: Option<String>,

    /// Game contract address
    #[arg(long)]
    pub contract: Option<String>,

    /// Keystore to unlock when connecting
    #[arg(long)]
    pub wallet: Option<String>,

    /// Keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long = "wallet-dir")]
    pub wallet_dir: Option<String>,

    /// Where authorized sessions are remembered (defaults to ~/.boss-battle)
    #[arg(long = "session-dir")]
    pub session_dir: Option<String>,

    /// Log file directory (defaults to <session-dir>/logs)
    #[arg(long = "log-dir")]
    pub log_dir: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NetworkTarget {
    Sepolia { url: String },
    Local { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Sepolia { url } | NetworkTarget::Local { url } => url,
        }
    }

    pub fn env(&self) -> NetworkEnv {
        match self {
            NetworkTarget::Sepolia { .. } => NetworkEnv::Sepolia,
            NetworkTarget::Local { .. } => NetworkEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub contract: Address,
    pub wallet_name: Option<String>,
    pub wallet_dir: PathBuf,
    pub session_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        let network = if self.local {
            NetworkTarget::Local {
                url: self
                    .rpc_url
                    .unwrap_or_else(|| DEFAULT_LOCAL_RPC_URL.to_string()),
            }
        } else {
            NetworkTarget::Sepolia {
                url: self
                    .rpc_url
                    .unwrap_or_else(|| DEFAULT_SEPOLIA_RPC_URL.to_string()),
            }
        };

        let contract = match self.contract.as_deref() {
            Some(raw) => game_abi::parse_address(raw).map_err(|e| eyre!(e))?,
            None => game_abi::contract_address(),
        };

        let wallet_dir =
            wallets::resolve_dir(self.wallet_dir.as_deref(), wallets::default_wallet_dir)?;
        let session_dir = wallets::resolve_dir(self.session_dir.as_deref(), || {
            sessions::default_root().map_err(|e| eyre!("{e:#}"))
        })?;
        let log_dir = wallets::resolve_dir(self.log_dir.as_deref(), || {
            Ok(session_dir.join("logs"))
        })?;

        Ok(AppConfig {
            network,
            contract,
            wallet_name: self.wallet,
            wallet_dir,
            session_dir,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig> {
        let mut argv = vec!["boss-battle", "--wallet-dir", "/keys", "--session-dir", "/state"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)?.into_config()
    }

    #[test]
    fn into_config__defaults_to_sepolia_and_bundled_contract() {
        // when
        let config = parse(&[]).unwrap();

        // then
        assert_eq!(
            config.network,
            NetworkTarget::Sepolia {
                url: DEFAULT_SEPOLIA_RPC_URL.to_string()
            }
        );
        assert_eq!(config.contract, game_abi::contract_address());
        assert_eq!(config.log_dir, PathBuf::from("/state/logs"));
        assert_eq!(config.wallet_name, None);
    }

    #[test]
    fn into_config__local_with_custom_rpc() {
        // when
        let config = parse(&["--local", "--rpc-url", "http://node:8545"]).unwrap();

        // then
        assert_eq!(
            config.network,
            NetworkTarget::Local {
                url: "http://node:8545".to_string()
            }
        );
        assert_eq!(config.network.env(), NetworkEnv::Local);
    }

    #[test]
    fn into_config__rejects_both_networks() {
        let res = Cli::try_parse_from(["boss-battle", "--sepolia", "--local"]);
        assert!(res.is_err());
    }

    #[test]
    fn into_config__rejects_malformed_contract() {
        let res = parse(&["--contract", "0x1234"]);
        assert!(res.is_err());
    }

    #[test]
    fn into_config__keeps_wallet_name() {
        let config = parse(&["--wallet", "player"]).unwrap();
        assert_eq!(config.wallet_name.as_deref(), Some("player"));
    }
}
