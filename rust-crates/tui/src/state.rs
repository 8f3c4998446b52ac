use crate::{
    character::{
        BossRecord,
        CharacterRecord,
    },
    error::{
        ContractError,
        WalletError,
    },
};
use ethers::types::Address;

const MAX_ERRORS: usize = 5;
pub const NO_WALLET_ALERT: &str = "Get a wallet! No keystore was found. Create one with `cast wallet new` or `cast wallet import`, then restart.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Screen {
    Loading,
    ConnectWallet,
    SelectCharacter,
    Arena,
}

/// Picks the screen to show. Loading wins over everything, then a missing
/// account, then a missing character.
pub fn select_view(
    loading: bool,
    account: Option<&Address>,
    character: Option<&CharacterRecord>,
) -> Screen {
    match (loading, account, character) {
        (true, _, _) => Screen::Loading,
        (false, None, _) => Screen::ConnectWallet,
        (false, Some(_), None) => Screen::SelectCharacter,
        (false, Some(_), Some(_)) => Screen::Arena,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PendingTx {
    Mint(u64),
    Attack,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppState {
    pub loading: bool,
    pub account: Option<Address>,
    pub character: Option<CharacterRecord>,
    pub roster: Vec<CharacterRecord>,
    pub boss: Option<BossRecord>,
    pub pending_tx: Option<PendingTx>,
    pub alert: Option<String>,
    pub status: String,
    pub errors: Vec<String>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            loading: true,
            account: None,
            character: None,
            roster: Vec::new(),
            boss: None,
            pending_tx: None,
            alert: None,
            status: String::from("Starting"),
            errors: Vec::new(),
        }
    }
}

impl AppState {
    pub fn screen(&self) -> Screen {
        select_view(self.loading, self.account.as_ref(), self.character.as_ref())
    }

    /// A new status supersedes earlier errors.
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        if self.errors.len() > MAX_ERRORS {
            let overflow = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..overflow);
        }
    }

    fn is_current(&self, account: &Address) -> bool {
        self.account.as_ref() == Some(account)
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    Mounted,
    AccountsListed(Result<Vec<Address>, WalletError>),
    ConnectRequested,
    ConnectResolved(Result<Vec<Address>, WalletError>),
    CharacterFetched {
        account: Address,
        result: Result<Option<CharacterRecord>, ContractError>,
    },
    CharacterRefreshed {
        account: Address,
        result: Result<Option<CharacterRecord>, ContractError>,
    },
    RosterFetched {
        account: Address,
        result: Result<Vec<CharacterRecord>, ContractError>,
    },
    BossFetched {
        account: Address,
        result: Result<BossRecord, ContractError>,
    },
    MintRequested(u64),
    MintCompleted {
        account: Address,
        result: Result<(), ContractError>,
    },
    AttackRequested,
    AttackCompleted {
        account: Address,
        result: Result<(), ContractError>,
    },
    AlertDismissed,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    DetectWallet,
    RequestConnection,
    FetchCharacter(Address),
    RefreshCharacter(Address),
    FetchRoster(Address),
    FetchBoss(Address),
    Mint { account: Address, index: u64 },
    Attack(Address),
}

pub fn reduce(state: &mut AppState, action: Action) -> Vec<Effect> {
    match action {
        Action::Mounted => {
            state.set_status("Looking for a wallet...");
            vec![Effect::DetectWallet]
        }
        Action::AccountsListed(result) => {
            state.loading = false;
            match result {
                Ok(accounts) => match accounts.first() {
                    Some(first) => set_account(state, *first),
                    None => {
                        state.set_status("No authorized account; press c to connect");
                        Vec::new()
                    }
                },
                Err(WalletError::NoProvider) => {
                    state.set_status("No wallet detected");
                    Vec::new()
                }
                Err(e) => {
                    state.push_error(format!("Wallet check failed: {e}"));
                    Vec::new()
                }
            }
        }
        Action::ConnectRequested => {
            state.set_status("Waiting for wallet authorization...");
            vec![Effect::RequestConnection]
        }
        Action::ConnectResolved(result) => {
            state.loading = false;
            match result {
                Ok(accounts) => match accounts.first() {
                    Some(first) => set_account(state, *first),
                    None => {
                        state.push_error("Wallet returned no accounts");
                        Vec::new()
                    }
                },
                Err(WalletError::NoProvider) => {
                    state.alert = Some(NO_WALLET_ALERT.to_string());
                    state.set_status("No wallet detected");
                    Vec::new()
                }
                Err(e) => {
                    state.set_status("Wallet not connected");
                    state.push_error(format!("Connection failed: {e}"));
                    Vec::new()
                }
            }
        }
        Action::CharacterFetched { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            match result {
                Ok(Some(character)) => {
                    state.set_status(format!("Welcome back, {}", character.name));
                    apply_character(state, account, character)
                }
                Ok(None) => {
                    state.character = None;
                    state.set_status("No character yet; pick one to mint");
                    fetch_roster_if_missing(state, account)
                }
                Err(e) => {
                    state.character = None;
                    state.push_error(format!("Character lookup failed: {e}"));
                    fetch_roster_if_missing(state, account)
                }
            }
        }
        Action::CharacterRefreshed { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            match result {
                Ok(Some(character)) => apply_character(state, account, character),
                Ok(None) => {
                    state.set_status("Mint confirmed, but no character is recorded for this account");
                    Vec::new()
                }
                Err(e) => {
                    state.push_error(format!("Character refresh failed: {e}"));
                    Vec::new()
                }
            }
        }
        Action::RosterFetched { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            match result {
                Ok(roster) => state.roster = roster,
                Err(e) => state.push_error(format!("Loading characters failed: {e}")),
            }
            Vec::new()
        }
        Action::BossFetched { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            match result {
                Ok(boss) => state.boss = Some(boss),
                Err(e) => state.push_error(format!("Loading boss failed: {e}")),
            }
            Vec::new()
        }
        Action::MintRequested(index) => {
            let Some(account) = state.account else {
                return Vec::new();
            };
            if state.screen() != Screen::SelectCharacter {
                return Vec::new();
            }
            if state.pending_tx.is_some() {
                state.set_status("A transaction is already pending");
                return Vec::new();
            }
            let choice = state
                .roster
                .iter()
                .find(|c| c.index == index)
                .map(|c| c.name.clone());
            let Some(name) = choice else {
                state.push_error(format!("Unknown character #{index}"));
                return Vec::new();
            };
            state.set_status(format!("Minting {name}..."));
            state.pending_tx = Some(PendingTx::Mint(index));
            vec![Effect::Mint { account, index }]
        }
        Action::MintCompleted { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            state.pending_tx = None;
            match result {
                Ok(()) => {
                    state.set_status("Minted! Loading your character...");
                    vec![Effect::RefreshCharacter(account)]
                }
                Err(e) => {
                    state.set_status("Mint failed");
                    state.push_error(format!("Mint failed: {e}"));
                    Vec::new()
                }
            }
        }
        Action::AttackRequested => {
            let Some(account) = state.account else {
                return Vec::new();
            };
            if state.pending_tx.is_some() {
                state.set_status("A transaction is already pending");
                return Vec::new();
            }
            let Some(character) = state.character.as_ref() else {
                return Vec::new();
            };
            if character.is_defeated() {
                let message = format!("{} has no HP left", character.name);
                state.set_status(message);
                return Vec::new();
            }
            if state.boss.as_ref().is_some_and(BossRecord::is_defeated) {
                state.set_status("The boss is already defeated");
                return Vec::new();
            }
            state.set_status("Attacking...");
            state.pending_tx = Some(PendingTx::Attack);
            vec![Effect::Attack(account)]
        }
        Action::AttackCompleted { account, result } => {
            if !state.is_current(&account) {
                return Vec::new();
            }
            state.pending_tx = None;
            match result {
                Ok(()) => {
                    state.set_status("Attack landed!");
                    vec![Effect::FetchBoss(account), Effect::RefreshCharacter(account)]
                }
                Err(e) => {
                    state.set_status("Attack failed");
                    state.push_error(format!("Attack failed: {e}"));
                    Vec::new()
                }
            }
        }
        Action::AlertDismissed => {
            state.alert = None;
            Vec::new()
        }
    }
}

/// A new account invalidates everything learned about the previous one and
/// triggers exactly one ownership query. Re-selecting the current account
/// is a no-op.
fn set_account(state: &mut AppState, account: Address) -> Vec<Effect> {
    if state.is_current(&account) {
        state.set_status("Wallet connected");
        return Vec::new();
    }
    state.account = Some(account);
    state.character = None;
    state.boss = None;
    state.pending_tx = None;
    state.set_status("Checking for a character NFT...");
    vec![Effect::FetchCharacter(account)]
}

fn apply_character(
    state: &mut AppState,
    account: Address,
    character: CharacterRecord,
) -> Vec<Effect> {
    let entering_arena = state.character.is_none();
    state.character = Some(character);
    if entering_arena {
        vec![Effect::FetchBoss(account)]
    } else {
        Vec::new()
    }
}

fn fetch_roster_if_missing(state: &AppState, account: Address) -> Vec<Effect> {
    if state.roster.is_empty() {
        vec![Effect::FetchRoster(account)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn knight() -> CharacterRecord {
        CharacterRecord {
            index: 0,
            name: "Knight".to_string(),
            image_uri: "knight.png".to_string(),
            hp: 300,
            max_hp: 300,
            attack_damage: 25,
        }
    }

    fn boss(hp: u64) -> BossRecord {
        BossRecord {
            name: "Mob Boss".to_string(),
            image_uri: "boss.png".to_string(),
            hp,
            max_hp: 1000,
            attack_damage: 40,
        }
    }

    fn connected(account: Address) -> AppState {
        let mut state = AppState::default();
        reduce(&mut state, Action::AccountsListed(Ok(vec![account])));
        state
    }

    proptest! {
        #[test]
        fn select_view__ordered_rules_hold(
            loading in any::<bool>(),
            has_account in any::<bool>(),
            has_character in any::<bool>(),
        ) {
            let account = has_account.then(|| addr(0xABC));
            let character = has_character.then(knight);

            let screen = select_view(loading, account.as_ref(), character.as_ref());

            let expected = if loading {
                Screen::Loading
            } else if !has_account {
                Screen::ConnectWallet
            } else if !has_character {
                Screen::SelectCharacter
            } else {
                Screen::Arena
            };
            prop_assert_eq!(screen, expected);
        }
    }

    #[test]
    fn default__starts_loading_without_account() {
        let state = AppState::default();
        assert!(state.loading);
        assert_eq!(state.screen(), Screen::Loading);
    }

    #[test]
    fn reduce__mounted__detects_wallet_and_keeps_loading() {
        // given
        let mut state = AppState::default();

        // when
        let effects = reduce(&mut state, Action::Mounted);

        // then
        assert_eq!(effects, vec![Effect::DetectWallet]);
        assert!(state.loading);
    }

    #[test]
    fn reduce__accounts_listed_without_provider__clears_loading_only() {
        // given
        let mut state = AppState::default();

        // when
        let effects =
            reduce(&mut state, Action::AccountsListed(Err(WalletError::NoProvider)));

        // then
        assert!(effects.is_empty());
        assert!(!state.loading);
        assert_eq!(state.account, None);
        assert_eq!(state.alert, None);
        assert_eq!(state.screen(), Screen::ConnectWallet);
    }

    #[test]
    fn reduce__accounts_listed__takes_first_account_and_fetches_character() {
        // given
        let mut state = AppState::default();

        // when
        let effects = reduce(
            &mut state,
            Action::AccountsListed(Ok(vec![addr(0xABC), addr(0xDEF)])),
        );

        // then
        assert_eq!(state.account, Some(addr(0xABC)));
        assert_eq!(effects, vec![Effect::FetchCharacter(addr(0xABC))]);
    }

    #[test]
    fn reduce__accounts_listed_error__clears_loading_and_records_error() {
        // given
        let mut state = AppState::default();

        // when
        let effects = reduce(
            &mut state,
            Action::AccountsListed(Err(WalletError::Request("boom".into()))),
        );

        // then
        assert!(effects.is_empty());
        assert!(!state.loading);
        assert_eq!(state.errors.len(), 1);
    }

    #[test]
    fn reduce__connect_without_provider__raises_alert_and_keeps_account_unset() {
        // given
        let mut state = AppState::default();
        reduce(&mut state, Action::AccountsListed(Err(WalletError::NoProvider)));

        // when
        let effects = reduce(&mut state, Action::ConnectResolved(Err(WalletError::NoProvider)));

        // then
        assert!(effects.is_empty());
        assert_eq!(state.alert.as_deref(), Some(NO_WALLET_ALERT));
        assert_eq!(state.account, None);
    }

    #[test]
    fn reduce__connect_rejected__leaves_state_unchanged_apart_from_errors() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        let effects = reduce(
            &mut state,
            Action::ConnectResolved(Err(WalletError::Rejected("nope".into()))),
        );

        // then
        assert!(effects.is_empty());
        assert_eq!(state.account, Some(addr(0xABC)));
        assert_eq!(state.alert, None);
        assert_eq!(state.errors.len(), 1);
    }

    #[test]
    fn reduce__account_change__fetches_exactly_once_for_new_account() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );

        // when
        let effects = reduce(&mut state, Action::ConnectResolved(Ok(vec![addr(0xDEF)])));

        // then
        assert_eq!(effects, vec![Effect::FetchCharacter(addr(0xDEF))]);
        assert_eq!(state.character, None);
        assert_eq!(state.screen(), Screen::SelectCharacter);
    }

    #[test]
    fn reduce__same_account_again__does_not_refetch() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        let effects = reduce(&mut state, Action::ConnectResolved(Ok(vec![addr(0xABC)])));

        // then
        assert!(effects.is_empty());
    }

    #[test]
    fn reduce__character_fetched_with_name__enters_arena_and_fetches_boss() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        let effects = reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );

        // then
        assert_eq!(state.character, Some(knight()));
        assert_eq!(state.screen(), Screen::Arena);
        assert_eq!(effects, vec![Effect::FetchBoss(addr(0xABC))]);
    }

    #[test]
    fn reduce__character_fetched_none__shows_selection_and_loads_roster() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        let effects = reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(None),
            },
        );

        // then
        assert_eq!(state.character, None);
        assert_eq!(state.screen(), Screen::SelectCharacter);
        assert_eq!(effects, vec![Effect::FetchRoster(addr(0xABC))]);
    }

    #[test]
    fn reduce__character_fetch_error__fails_open_to_selection() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Err(ContractError::Transport("timeout".into())),
            },
        );

        // then
        assert_eq!(state.character, None);
        assert_eq!(state.screen(), Screen::SelectCharacter);
        assert_eq!(state.errors.len(), 1);
    }

    #[test]
    fn reduce__stale_character_result__is_ignored() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(&mut state, Action::ConnectResolved(Ok(vec![addr(0xDEF)])));

        // when
        let effects = reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );

        // then
        assert!(effects.is_empty());
        assert_eq!(state.character, None);
        assert_eq!(state.account, Some(addr(0xDEF)));
    }

    #[test]
    fn reduce__mint_requested__marks_pending_and_ignores_second_request() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(None),
            },
        );
        reduce(
            &mut state,
            Action::RosterFetched {
                account: addr(0xABC),
                result: Ok(vec![knight()]),
            },
        );

        // when
        let first = reduce(&mut state, Action::MintRequested(0));
        let second = reduce(&mut state, Action::MintRequested(0));

        // then
        assert_eq!(
            first,
            vec![Effect::Mint {
                account: addr(0xABC),
                index: 0
            }]
        );
        assert!(second.is_empty());
        assert_eq!(state.pending_tx, Some(PendingTx::Mint(0)));
    }

    #[test]
    fn reduce__mint_unknown_index__is_rejected() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(None),
            },
        );

        // when
        let effects = reduce(&mut state, Action::MintRequested(7));

        // then
        assert!(effects.is_empty());
        assert_eq!(state.pending_tx, None);
    }

    #[test]
    fn reduce__mint_completed__refreshes_character_through_setter() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::RosterFetched {
                account: addr(0xABC),
                result: Ok(vec![knight()]),
            },
        );
        reduce(&mut state, Action::MintRequested(0));

        // when
        let effects = reduce(
            &mut state,
            Action::MintCompleted {
                account: addr(0xABC),
                result: Ok(()),
            },
        );
        let after_refresh = reduce(
            &mut state,
            Action::CharacterRefreshed {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );

        // then
        assert_eq!(effects, vec![Effect::RefreshCharacter(addr(0xABC))]);
        assert_eq!(after_refresh, vec![Effect::FetchBoss(addr(0xABC))]);
        assert_eq!(state.pending_tx, None);
        assert_eq!(state.screen(), Screen::Arena);
    }

    #[test]
    fn reduce__attack_completed__refreshes_boss_and_character() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );
        reduce(
            &mut state,
            Action::BossFetched {
                account: addr(0xABC),
                result: Ok(boss(500)),
            },
        );

        // when
        let requested = reduce(&mut state, Action::AttackRequested);
        let completed = reduce(
            &mut state,
            Action::AttackCompleted {
                account: addr(0xABC),
                result: Ok(()),
            },
        );

        // then
        assert_eq!(requested, vec![Effect::Attack(addr(0xABC))]);
        assert_eq!(
            completed,
            vec![
                Effect::FetchBoss(addr(0xABC)),
                Effect::RefreshCharacter(addr(0xABC))
            ]
        );
        assert_eq!(state.pending_tx, None);
    }

    #[test]
    fn reduce__attack_on_defeated_boss__is_refused() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );
        reduce(
            &mut state,
            Action::BossFetched {
                account: addr(0xABC),
                result: Ok(boss(0)),
            },
        );

        // when
        let effects = reduce(&mut state, Action::AttackRequested);

        // then
        assert!(effects.is_empty());
        assert_eq!(state.pending_tx, None);
    }

    #[test]
    fn reduce__errors_are_bounded() {
        // given
        let mut state = AppState::default();

        // when
        for n in 0..(MAX_ERRORS + 3) {
            reduce(
                &mut state,
                Action::AccountsListed(Err(WalletError::Request(format!("e{n}")))),
            );
        }

        // then
        assert_eq!(state.errors.len(), MAX_ERRORS);
        assert!(state.errors.last().unwrap().contains(&format!("e{}", MAX_ERRORS + 2)));
    }

    #[test]
    fn reduce__next_status__clears_earlier_errors() {
        // given
        let mut state = AppState::default();
        reduce(
            &mut state,
            Action::ConnectResolved(Err(WalletError::Request("blip".into()))),
        );
        assert_eq!(state.errors.len(), 1);

        // when
        reduce(&mut state, Action::ConnectResolved(Ok(vec![addr(0xABC)])));

        // then
        assert!(state.errors.is_empty());
        assert_eq!(state.status, "Checking for a character NFT...");
    }

    #[test]
    fn reduce__failed_attack__keeps_error_visible() {
        // given
        let mut state = connected(addr(0xABC));
        reduce(
            &mut state,
            Action::CharacterFetched {
                account: addr(0xABC),
                result: Ok(Some(knight())),
            },
        );
        reduce(&mut state, Action::AttackRequested);

        // when
        reduce(
            &mut state,
            Action::AttackCompleted {
                account: addr(0xABC),
                result: Err(ContractError::Call("reverted".into())),
            },
        );

        // then
        assert_eq!(state.status, "Attack failed");
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("reverted"));
    }

    #[test]
    fn reduce__empty_refresh_after_mint__reports_without_retry() {
        // given
        let mut state = connected(addr(0xABC));

        // when
        let effects = reduce(
            &mut state,
            Action::CharacterRefreshed {
                account: addr(0xABC),
                result: Ok(None),
            },
        );

        // then
        assert!(effects.is_empty());
        assert_eq!(state.character, None);
        assert_eq!(
            state.status,
            "Mint confirmed, but no character is recorded for this account"
        );
    }

    #[test]
    fn reduce__alert_dismissed__clears_alert() {
        let mut state = AppState::default();
        reduce(&mut state, Action::ConnectResolved(Err(WalletError::NoProvider)));
        reduce(&mut state, Action::AlertDismissed);
        assert_eq!(state.alert, None);
    }
}
