use thiserror::Error;

/// Failures talking to the wallet provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet detected")]
    NoProvider,

    #[error("Authorization rejected: {0}")]
    Rejected(String),

    #[error("Wallet request failed: {0}")]
    Request(String),
}

/// Failures reading from or transacting with the game contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Contract call failed: {0}")]
    Call(String),

    #[error("Unexpected contract data: {0}")]
    Decode(String),

    #[error("Wallet is locked; connect it again to sign transactions")]
    SignerLocked,
}

impl From<WalletError> for ContractError {
    fn from(value: WalletError) -> Self {
        match value {
            WalletError::NoProvider => ContractError::Transport(value.to_string()),
            WalletError::Rejected(msg) | WalletError::Request(msg) => {
                ContractError::Transport(msg)
            }
        }
    }
}
