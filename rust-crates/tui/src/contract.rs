use crate::error::ContractError;
use ethers::{
    contract::ContractError as EthersContractError,
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::LocalWallet,
    types::{
        Address,
        U256,
    },
};
use game_abi::{
    BigBoss,
    CharacterAttributes,
    MyEpicGame,
};
use std::sync::Arc;
use tracing::info;

pub type ReadClient = Provider<Http>;
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Calls the client makes against the game contract on behalf of one
/// account.
pub trait GameContract: Clone + 'static {
    fn check_if_user_has_nft(
        &self,
    ) -> impl Future<Output = Result<CharacterAttributes, ContractError>>;

    fn default_characters(
        &self,
    ) -> impl Future<Output = Result<Vec<CharacterAttributes>, ContractError>>;

    fn big_boss(&self) -> impl Future<Output = Result<BigBoss, ContractError>>;

    fn mint_character(
        &self,
        index: u64,
    ) -> impl Future<Output = Result<(), ContractError>>;

    fn attack_boss(&self) -> impl Future<Output = Result<(), ContractError>>;
}

/// Contract handle backed by a JSON-RPC endpoint. Reads are issued with
/// `from` set to the account so `msg.sender` resolves to the player; writes
/// need the account's signer, which only exists once the wallet was
/// unlocked in this process.
#[derive(Clone)]
pub struct ChainGame {
    account: Address,
    reader: MyEpicGame<ReadClient>,
    signer: Option<MyEpicGame<SignerClient>>,
}

impl ChainGame {
    pub fn new(
        contract: Address,
        account: Address,
        provider: Arc<ReadClient>,
        signer: Option<Arc<SignerClient>>,
    ) -> Self {
        Self {
            account,
            reader: MyEpicGame::new(contract, provider),
            signer: signer.map(|client| MyEpicGame::new(contract, client)),
        }
    }

    fn writer(&self) -> Result<&MyEpicGame<SignerClient>, ContractError> {
        self.signer.as_ref().ok_or(ContractError::SignerLocked)
    }
}

impl GameContract for ChainGame {
    async fn check_if_user_has_nft(&self) -> Result<CharacterAttributes, ContractError> {
        self.reader
            .check_if_user_has_nft()
            .from(self.account)
            .call()
            .await
            .map_err(call_error)
    }

    async fn default_characters(&self) -> Result<Vec<CharacterAttributes>, ContractError> {
        self.reader
            .get_all_default_characters()
            .from(self.account)
            .call()
            .await
            .map_err(call_error)
    }

    async fn big_boss(&self) -> Result<BigBoss, ContractError> {
        self.reader
            .get_big_boss()
            .from(self.account)
            .call()
            .await
            .map_err(call_error)
    }

    async fn mint_character(&self, index: u64) -> Result<(), ContractError> {
        let call = self.writer()?.mint_character_nft(U256::from(index));
        let pending = call.send().await.map_err(call_error)?;
        let receipt = pending
            .await
            .map_err(|e| ContractError::Transport(e.to_string()))?
            .ok_or_else(|| ContractError::Call("mint transaction was dropped".into()))?;
        info!(
            tx = ?receipt.transaction_hash,
            block = ?receipt.block_number,
            index,
            "character minted"
        );
        Ok(())
    }

    async fn attack_boss(&self) -> Result<(), ContractError> {
        let call = self.writer()?.attack_boss();
        let pending = call.send().await.map_err(call_error)?;
        let receipt = pending
            .await
            .map_err(|e| ContractError::Transport(e.to_string()))?
            .ok_or_else(|| ContractError::Call("attack transaction was dropped".into()))?;
        info!(tx = ?receipt.transaction_hash, block = ?receipt.block_number, "attack complete");
        Ok(())
    }
}

fn call_error<M: Middleware>(err: EthersContractError<M>) -> ContractError {
    match err {
        EthersContractError::ProviderError { .. }
        | EthersContractError::MiddlewareError { .. } => {
            ContractError::Transport(err.to_string())
        }
        other => ContractError::Call(other.to_string()),
    }
}
