use ethers::types::Address;
use std::str::FromStr;

pub mod epic_game_types {
    use ethers::contract::abigen;

    abigen!(MyEpicGame, "abi/MyEpicGame.json");
}

pub use epic_game_types::{
    BigBoss,
    CharacterAttributes,
    MyEpicGame,
};

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

/// Address of the deployed game contract the client talks to by default.
pub const CONTRACT_ADDRESS: &str = "0x5a5c2fa3c2d4c9d2e0f5b1a7b2d9c7e8f1a3b4c6";

pub fn contract_address() -> Address {
    parse_address(CONTRACT_ADDRESS).expect("bundled contract address is valid hex")
}

/// Parses a hex address with or without the `0x` prefix.
pub fn parse_address(raw: &str) -> Result<Address, String> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Address::from_str(cleaned).map_err(|e| format!("Failed to parse address '{raw}': {e}"))
}
