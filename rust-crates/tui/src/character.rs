use crate::error::ContractError;
use ethers::types::U256;
use game_abi::{
    BigBoss,
    CharacterAttributes,
};

/// Display-ready view of a character NFT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharacterRecord {
    pub index: u64,
    pub name: String,
    pub image_uri: String,
    pub hp: u64,
    pub max_hp: u64,
    pub attack_damage: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BossRecord {
    pub name: String,
    pub image_uri: String,
    pub hp: u64,
    pub max_hp: u64,
    pub attack_damage: u64,
}

impl TryFrom<CharacterAttributes> for CharacterRecord {
    type Error = ContractError;

    fn try_from(raw: CharacterAttributes) -> Result<Self, Self::Error> {
        Ok(Self {
            index: decode_u64("characterIndex", raw.character_index)?,
            hp: decode_u64("hp", raw.hp)?,
            max_hp: decode_u64("maxHp", raw.max_hp)?,
            attack_damage: decode_u64("attackDamage", raw.attack_damage)?,
            name: raw.name,
            image_uri: raw.image_uri,
        })
    }
}

impl TryFrom<BigBoss> for BossRecord {
    type Error = ContractError;

    fn try_from(raw: BigBoss) -> Result<Self, Self::Error> {
        Ok(Self {
            hp: decode_u64("hp", raw.hp)?,
            max_hp: decode_u64("maxHp", raw.max_hp)?,
            attack_damage: decode_u64("attackDamage", raw.attack_damage)?,
            name: raw.name,
            image_uri: raw.image_uri,
        })
    }
}

/// Interprets a `checkIfUserHasNFT` response. An empty name means the
/// account owns no character.
pub fn owned_character(
    raw: CharacterAttributes,
) -> Result<Option<CharacterRecord>, ContractError> {
    if raw.name.is_empty() {
        return Ok(None);
    }
    CharacterRecord::try_from(raw).map(Some)
}

pub fn decode_roster(
    raw: Vec<CharacterAttributes>,
) -> Result<Vec<CharacterRecord>, ContractError> {
    raw.into_iter().map(CharacterRecord::try_from).collect()
}

fn decode_u64(field: &'static str, value: U256) -> Result<u64, ContractError> {
    if value > U256::from(u64::MAX) {
        return Err(ContractError::Decode(format!(
            "{field} value {value} does not fit in 64 bits"
        )));
    }
    Ok(value.as_u64())
}

impl CharacterRecord {
    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

impl BossRecord {
    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}
