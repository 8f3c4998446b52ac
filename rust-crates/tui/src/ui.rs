use crate::{
    character::{
        BossRecord,
        CharacterRecord,
    },
    config::AppConfig,
    state::{
        AppState,
        PendingTx,
        Screen,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ethers::types::Address;
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Connect,
    Mint(u64),
    Attack,
    DismissAlert,
}

#[derive(Debug, Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    roster_idx: usize,
    network: String,
    contract: Address,
}

impl UiState {
    pub fn new(config: &AppConfig) -> Self {
        UiState {
            terminal: None,
            roster_idx: 0,
            network: format!("{} ({})", config.network.env(), config.network.url()),
            contract: config.contract,
        }
    }

    fn selected(&self, roster: &[CharacterRecord]) -> usize {
        self.roster_idx.min(roster.len().saturating_sub(1))
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // one Terminal per session keeps ratatui's diffing buffers
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit(state: &mut UiState) -> Result<()> {
    state.terminal = None;
    disable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, app: &AppState) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        let res = term.draw(|f| ui(f, state, app)).map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

/// Maps a terminal event to what the user asked for, given the screen
/// currently on display. Returns `None` for keys with no meaning there.
pub fn interpret_event(state: &mut UiState, app: &AppState, event: Event) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if is_ctrl_c(&key) {
        return Some(UserEvent::Quit);
    }
    if app.alert.is_some() {
        return match key.code {
            KeyCode::Enter | KeyCode::Esc => Some(UserEvent::DismissAlert),
            KeyCode::Char('q') => Some(UserEvent::Quit),
            _ => None,
        };
    }
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
        return Some(UserEvent::Quit);
    }

    match app.screen() {
        Screen::Loading => None,
        Screen::ConnectWallet => match key.code {
            KeyCode::Char('c') | KeyCode::Enter => Some(UserEvent::Connect),
            _ => None,
        },
        Screen::SelectCharacter => match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                state.roster_idx = state.selected(&app.roster).saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let last = app.roster.len().saturating_sub(1);
                state.roster_idx = (state.selected(&app.roster) + 1).min(last);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter | KeyCode::Char('m') => app
                .roster
                .get(state.selected(&app.roster))
                .map(|c| UserEvent::Mint(c.index)),
            KeyCode::Char('u') => Some(UserEvent::Connect),
            _ => None,
        },
        Screen::Arena => match key.code {
            KeyCode::Char('a') => Some(UserEvent::Attack),
            KeyCode::Char('u') => Some(UserEvent::Connect),
            _ => None,
        },
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn ui(f: &mut Frame, state: &UiState, app: &AppState) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // title + account
            Constraint::Min(8),    // screen body
            Constraint::Length(5), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], state, app);
    match app.screen() {
        Screen::Loading => draw_loading(f, chunks[1]),
        Screen::ConnectWallet => draw_connect(f, chunks[1]),
        Screen::SelectCharacter => draw_select_character(f, chunks[1], state, app),
        Screen::Arena => draw_arena(f, chunks[1], app),
    }
    draw_status(f, chunks[2], app);
    draw_help(f, chunks[3], app);
    draw_alert(f, app);
}

fn draw_header(f: &mut Frame, area: Rect, state: &UiState, app: &AppState) {
    let account = match app.account {
        Some(account) => format!("Account Connected: {account:#x}"),
        None => String::from("No account connected"),
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(
                "⚔️ Boss Battle ⚔️",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  Team up to protect the Metaverse!"),
        ]),
        Line::from(format!(
            "{account} | Network: {} | Contract: {:#x}",
            state.network, state.contract
        )),
    ];
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn draw_loading(f: &mut Frame, area: Rect) {
    let widget = Paragraph::new("Loading...")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn draw_connect(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("Connect a wallet to get in the game."),
        Line::from(""),
        Line::from(Span::styled(
            "[ c ] Connect Wallet To Get Started",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ];
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Connect"));
    f.render_widget(widget, area);
}

fn draw_select_character(f: &mut Frame, area: Rect, state: &UiState, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Mint Your Hero. Choose wisely.");
    if app.roster.is_empty() {
        let widget = Paragraph::new("Loading characters...")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(widget, area);
        return;
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = app.roster.len() as u32;
    let constraints: Vec<Constraint> = (0..cols).map(|_| Constraint::Ratio(1, cols)).collect();
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner);

    let selected = state.selected(&app.roster);
    let minting = match app.pending_tx {
        Some(PendingTx::Mint(index)) => Some(index),
        _ => None,
    };
    for (i, (character, cell)) in app.roster.iter().zip(cells.iter()).enumerate() {
        let border = if i == selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mut lines = vec![
            Line::from(Span::styled(
                character.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("HP {}", character.max_hp)),
            Line::from(format!("Attack {}", character.attack_damage)),
        ];
        if minting == Some(character.index) {
            lines.push(Line::from(Span::styled(
                "Minting...",
                Style::default().fg(Color::Magenta),
            )));
        }
        let widget = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("#{}", character.index)),
        );
        f.render_widget(widget, *cell);
    }
}

fn draw_arena(f: &mut Frame, area: Rect, app: &AppState) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    match app.boss.as_ref() {
        Some(boss) => draw_boss(f, halves[0], boss, app.pending_tx == Some(PendingTx::Attack)),
        None => {
            let widget = Paragraph::new("Loading boss...")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Boss"));
            f.render_widget(widget, halves[0]);
        }
    }
    if let Some(character) = app.character.as_ref() {
        draw_player(f, halves[1], character);
    }
}

fn draw_boss(f: &mut Frame, area: Rect, boss: &BossRecord, attacking: bool) {
    let title = format!("🔥 {} 🔥", boss.name);
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    f.render_widget(hp_gauge(boss.hp, boss.max_hp, Color::Red), rows[0]);
    f.render_widget(
        Paragraph::new(format!("⚔️ Attack Damage: {}", boss.attack_damage)),
        rows[1],
    );
    let footer = if boss.is_defeated() {
        Line::from(Span::styled("Defeated!", Style::default().fg(Color::Green)))
    } else if attacking {
        Line::from(Span::styled(
            format!("Attacking ⚔️ {}", boss.name),
            Style::default().fg(Color::Magenta),
        ))
    } else {
        Line::from(format!("💥 Attack {} [a]", boss.name))
    };
    f.render_widget(Paragraph::new(footer), rows[2]);
}

fn draw_player(f: &mut Frame, area: Rect, character: &CharacterRecord) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Your Character: {}", character.name));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    f.render_widget(hp_gauge(character.hp, character.max_hp, Color::Green), rows[0]);
    f.render_widget(
        Paragraph::new(format!("⚔️ Attack Damage: {}", character.attack_damage)),
        rows[1],
    );
    if character.is_defeated() {
        f.render_widget(
            Paragraph::new(Span::styled("Out of HP", Style::default().fg(Color::Red))),
            rows[2],
        );
    }
}

fn hp_gauge(hp: u64, max_hp: u64, color: Color) -> Gauge<'static> {
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("HP"))
        .gauge_style(Style::default().fg(color))
        .ratio(hp_ratio(hp, max_hp))
        .label(format!("{hp} / {max_hp}"))
}

fn hp_ratio(hp: u64, max_hp: u64) -> f64 {
    if max_hp == 0 {
        return 0.0;
    }
    hp.min(max_hp) as f64 / max_hp as f64
}

fn draw_status(f: &mut Frame, area: Rect, app: &AppState) {
    let widget = if app.errors.is_empty() {
        let text = if app.status.trim().is_empty() {
            "Ready"
        } else {
            app.status.as_str()
        };
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = app.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect, app: &AppState) {
    let text = if app.alert.is_some() {
        "Enter/Esc dismiss | q quit"
    } else {
        match app.screen() {
            Screen::Loading => "q/Esc quit",
            Screen::ConnectWallet => "c connect wallet | q/Esc quit",
            Screen::SelectCharacter => "←/→ choose | Enter/m mint | u switch account | q/Esc quit",
            Screen::Arena => "a attack | u switch account | q/Esc quit",
        }
    };
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_alert(f: &mut Frame, app: &AppState) {
    let Some(message) = app.alert.as_deref() else {
        return;
    };
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let widget = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Alert"));
    f.render_widget(widget, area);
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
