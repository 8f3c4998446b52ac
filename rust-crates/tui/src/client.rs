use crate::{
    character::{
        self,
        BossRecord,
    },
    config::AppConfig,
    contract::GameContract,
    error::{
        ContractError,
        WalletError,
    },
    state::{
        self,
        Action,
        AppState,
        Effect,
        Screen,
    },
    ui,
    wallets::{
        KeystoreWallet,
        WalletProvider,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::Address;
use futures::{
    FutureExt,
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use sessions::SessionStore;
use std::collections::VecDeque;
use tracing::{
    debug,
    info,
    warn,
};


type InFlight = LocalBoxFuture<'static, Action>;

/// Owns the app state and runs the effects the reducer asks for. Wallet
/// calls are awaited inline; contract calls are queued and complete through
/// [`AppController::next_completion`].
pub struct AppController<W: WalletProvider> {
    wallet: Option<W>,
    state: AppState,
    in_flight: FuturesUnordered<InFlight>,
}

impl<W: WalletProvider> AppController<W> {
    pub fn new(wallet: Option<W>) -> Self {
        Self {
            wallet,
            state: AppState::default(),
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen()
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub async fn mount(&mut self) {
        self.dispatch(Action::Mounted).await;
    }

    /// Applies `action` and every follow-up action produced by inline
    /// effects.
    pub async fn dispatch(&mut self, action: Action) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            log_action(&action);
            let effects = state::reduce(&mut self.state, action);
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Resolves with the next finished contract call, or `None` when nothing
    /// is in flight.
    pub async fn next_completion(&mut self) -> Option<Action> {
        self.in_flight.next().await
    }

    /// Dispatches completions until no contract call is left in flight.
    pub async fn settle(&mut self) {
        while let Some(action) = self.next_completion().await {
            self.dispatch(action).await;
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::DetectWallet => {
                Some(Action::AccountsListed(self.detect_and_read_account().await))
            }
            Effect::RequestConnection => {
                Some(Action::ConnectResolved(self.request_connection().await))
            }
            Effect::FetchCharacter(account) => {
                info!(account = ?account, "checking for character NFT");
                self.queue(account, move |game| async move {
                    let result = fetch_owned_character(game).await;
                    Action::CharacterFetched { account, result }
                });
                None
            }
            Effect::RefreshCharacter(account) => {
                self.queue(account, move |game| async move {
                    let result = fetch_owned_character(game).await;
                    Action::CharacterRefreshed { account, result }
                });
                None
            }
            Effect::FetchRoster(account) => {
                self.queue(account, move |game| async move {
                    let result = match game {
                        Ok(game) => game
                            .default_characters()
                            .await
                            .and_then(character::decode_roster),
                        Err(e) => Err(e),
                    };
                    Action::RosterFetched { account, result }
                });
                None
            }
            Effect::FetchBoss(account) => {
                self.queue(account, move |game| async move {
                    let result = match game {
                        Ok(game) => game.big_boss().await.and_then(BossRecord::try_from),
                        Err(e) => Err(e),
                    };
                    Action::BossFetched { account, result }
                });
                None
            }
            Effect::Mint { account, index } => {
                info!(account = ?account, index, "minting character");
                self.queue(account, move |game| async move {
                    let result = match game {
                        Ok(game) => game.mint_character(index).await,
                        Err(e) => Err(e),
                    };
                    Action::MintCompleted { account, result }
                });
                None
            }
            Effect::Attack(account) => {
                info!(account = ?account, "attacking boss");
                self.queue(account, move |game| async move {
                    let result = match game {
                        Ok(game) => game.attack_boss().await,
                        Err(e) => Err(e),
                    };
                    Action::AttackCompleted { account, result }
                });
                None
            }
        }
    }

    async fn detect_and_read_account(&self) -> Result<Vec<Address>, WalletError> {
        let Some(wallet) = self.wallet.as_ref() else {
            info!("no wallet detected");
            return Err(WalletError::NoProvider);
        };
        debug!("wallet detected; listing authorized accounts");
        let accounts = wallet.list_authorized().await?;
        match accounts.first() {
            Some(account) => info!(account = ?account, "found an authorized account"),
            None => info!("no authorized account found"),
        }
        Ok(accounts)
    }

    async fn request_connection(&mut self) -> Result<Vec<Address>, WalletError> {
        let Some(wallet) = self.wallet.as_mut() else {
            return Err(WalletError::NoProvider);
        };
        let accounts = wallet.request_authorization().await?;
        if let Some(account) = accounts.first() {
            info!(account = ?account, "connected");
        }
        Ok(accounts)
    }

    fn contract_handle(&self, account: Address) -> Result<W::Contract, ContractError> {
        let wallet = self.wallet.as_ref().ok_or(WalletError::NoProvider)?;
        Ok(wallet.contract_handle(account)?)
    }

    fn queue<F, Fut>(&mut self, account: Address, call: F)
    where
        F: FnOnce(Result<W::Contract, ContractError>) -> Fut,
        Fut: Future<Output = Action> + 'static,
    {
        let handle = self.contract_handle(account);
        self.in_flight.push(call(handle).boxed_local());
    }
}

async fn fetch_owned_character<C: GameContract>(
    game: Result<C, ContractError>,
) -> Result<Option<character::CharacterRecord>, ContractError> {
    let raw = game?.check_if_user_has_nft().await?;
    character::owned_character(raw)
}

fn log_action(action: &Action) {
    match action {
        Action::AccountsListed(Err(WalletError::NoProvider)) => {}
        Action::ConnectResolved(Err(WalletError::NoProvider)) => {
            info!("connect requested but no wallet is available")
        }
        Action::AccountsListed(Err(e)) => {
            warn!(error = %e, "listing authorized accounts failed")
        }
        Action::ConnectResolved(Err(e)) => warn!(error = %e, "wallet connection failed"),
        Action::CharacterFetched { account, result } => match result {
            Ok(Some(c)) => info!(account = ?account, name = %c.name, "user has character NFT"),
            Ok(None) => info!(account = ?account, "no character NFT found"),
            Err(e) => warn!(account = ?account, error = %e, "character lookup failed"),
        },
        Action::CharacterRefreshed {
            account,
            result: Err(e),
        } => warn!(account = ?account, error = %e, "character refresh failed"),
        Action::RosterFetched {
            result: Err(e), ..
        } => warn!(error = %e, "loading default characters failed"),
        Action::BossFetched { result: Err(e), .. } => {
            warn!(error = %e, "loading boss failed")
        }
        Action::MintCompleted {
            account,
            result: Err(e),
        } => warn!(account = ?account, error = %e, "mint failed"),
        Action::AttackCompleted {
            account,
            result: Err(e),
        } => warn!(account = ?account, error = %e, "attack failed"),
        other => debug!(action = ?other, "dispatch"),
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let sessions = SessionStore::new(&config.session_dir, config.network.env())
        .map_err(|e| eyre!("{e:#}"))
        .wrap_err("opening session store failed")?;
    let wallet = KeystoreWallet::detect(&config, sessions)?;
    let controller = AppController::new(wallet);
    let mut ui_state = ui::UiState::new(&config);

    tracing::info!(network = %config.network.env(), rpc = %config.network.url(), "starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state).await;
    ui::terminal_exit(&mut ui_state)?;
    res
}

async fn run_loop<W: WalletProvider>(
    mut controller: AppController<W>,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut input_events = ui::input_event_stream();
    ui::draw(ui_state, controller.state()).wrap_err("initial draw failed")?;
    controller.mount().await;
    ui::draw(ui_state, controller.state()).wrap_err("draw after mount failed")?;

    loop {
        tokio::select! {
            Some(action) = controller.next_completion(), if controller.has_in_flight() => {
                controller.dispatch(action).await;
                ui::draw(ui_state, controller.state())
                    .wrap_err("draw after contract call failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(&mut input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, controller.state(), event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Connect if controller.has_wallet() => {
                        // the keystore prompt needs the plain terminal
                        drop(input_events);
                        ui::terminal_exit(ui_state)?;
                        controller.dispatch(Action::ConnectRequested).await;
                        ui::terminal_enter(ui_state)?;
                        input_events = ui::input_event_stream();
                    }
                    ui::UserEvent::Connect => {
                        controller.dispatch(Action::ConnectRequested).await;
                    }
                    ui::UserEvent::Mint(index) => {
                        controller.dispatch(Action::MintRequested(index)).await;
                    }
                    ui::UserEvent::Attack => {
                        controller.dispatch(Action::AttackRequested).await;
                    }
                    ui::UserEvent::DismissAlert => {
                        controller.dispatch(Action::AlertDismissed).await;
                    }
                }
                ui::draw(ui_state, controller.state())
                    .wrap_err("draw after user input failed")?;
            }
        }
    }
    Ok(())
}
