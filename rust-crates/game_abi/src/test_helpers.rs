use ethers::types::U256;

use crate::{
    BigBoss,
    CharacterAttributes,
};

pub fn character(index: u64, name: &str, hp: u64, max_hp: u64, attack: u64) -> CharacterAttributes {
    CharacterAttributes {
        character_index: U256::from(index),
        name: name.to_string(),
        image_uri: format!("https://example.invalid/{}.png", name.to_lowercase()),
        hp: U256::from(hp),
        max_hp: U256::from(max_hp),
        attack_damage: U256::from(attack),
    }
}

/// What `checkIfUserHasNFT` returns for an account without a character.
pub fn no_character() -> CharacterAttributes {
    CharacterAttributes {
        character_index: U256::zero(),
        name: String::new(),
        image_uri: String::new(),
        hp: U256::zero(),
        max_hp: U256::zero(),
        attack_damage: U256::zero(),
    }
}

pub fn big_boss(name: &str, hp: u64, max_hp: u64, attack: u64) -> BigBoss {
    BigBoss {
        name: name.to_string(),
        image_uri: format!("https://example.invalid/{}.png", name.to_lowercase()),
        hp: U256::from(hp),
        max_hp: U256::from(max_hp),
        attack_damage: U256::from(attack),
    }
}

pub fn default_roster() -> Vec<CharacterAttributes> {
    vec![
        character(0, "Knight", 300, 300, 25),
        character(1, "Rogue", 200, 200, 50),
        character(2, "Mage", 150, 150, 75),
    ]
}
