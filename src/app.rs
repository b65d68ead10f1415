//! App: terminal init, main loop, flight timers and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, Effects, View};
use anyhow::{Context, Result};
use coinstack::{
    Cell, CoinId, Direction, Event as GameEvent, InsertPolicy, LevelSet, Place, Session,
    SessionOptions, TapOutcome, TapRejection, Wallet,
};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Extra landing delay per same-denomination coin already flying to the tray.
const SAME_TYPE_STAGGER_MS: u64 = 30;
/// How long a status message stays in the sidebar.
const STATUS_MS: u64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Cleared,
    Failed,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

impl QuitOption {
    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::Restart => Self::Resume,
            Self::Exit => Self::Restart,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Resume => Self::Restart,
            Self::Restart => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightKind {
    Tray,
    Slot,
}

/// A coin in the air. When `due` passes the session is told it landed.
#[derive(Debug, Clone, Copy)]
pub struct Flight {
    pub coin: CoinId,
    pub kind: FlightKind,
    pub due: Instant,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    levels: LevelSet,
    level_index: usize,
    wallet: Wallet,
    session: Session,
    screen: Screen,
    /// Set while paused (or in the quit menu); flights are pushed back by the pause length.
    paused_at: Option<Instant>,
    user_paused: bool,
    cursor: Cell,
    flights: Vec<Flight>,
    effects: Effects,
    quit_selected: QuitOption,
    tray_full: bool,
    status: Option<(String, Instant)>,
}

fn start_session(levels: &LevelSet, index: usize, config: &GameConfig) -> Result<Session> {
    let level = levels
        .get(index)
        .with_context(|| format!("level {} is not playable", index + 1))?;
    let mut options = SessionOptions::from_level(level);
    if let Some(capacity) = config.capacity {
        options.capacity = capacity;
    }
    if config.append_only {
        options.policy = InsertPolicy::AppendOnly;
    }
    if let Err(e) = level.check_balance() {
        log::warn!("level {} ({}) cannot be cleared: {}", index + 1, level.name, e);
    }
    Session::new(level, options).with_context(|| format!("failed to start level {}", index + 1))
}

fn first_cell(session: &Session) -> Cell {
    let grid = session.grid();
    grid.enabled_cells()
        .find(|&c| session.top_coin(c).is_some())
        .or_else(|| grid.enabled_cells().next())
        .unwrap_or(Cell::new(0, 0))
}

fn rejection_text(reason: TapRejection) -> &'static str {
    match reason {
        TapRejection::NotPlaying => "Level is over",
        TapRejection::UnknownCoin | TapRejection::NotOnGrid => "Nothing to tap",
        TapRejection::Covered => "Coin is covered",
        TapRejection::Nailed => "Nailed down",
        TapRejection::Locked => "Locked: find a key",
        TapRejection::TrayBusy => "Tray is busy",
    }
}

impl App {
    pub fn new(levels: LevelSet, level_index: usize, config: GameConfig, theme: Theme, wallet: Wallet) -> Result<Self> {
        let session = start_session(&levels, level_index, &config)?;
        let cursor = first_cell(&session);
        let mut app = Self {
            config,
            theme,
            levels,
            level_index,
            wallet,
            session,
            screen: Screen::Playing,
            paused_at: None,
            user_paused: false,
            cursor,
            flights: Vec::new(),
            effects: Effects::default(),
            quit_selected: QuitOption::Resume,
            tray_full: false,
            status: None,
        };
        // Nails freed at level start flash right away.
        app.pump_events(Instant::now());
        Ok(app)
    }

    fn load_level(&mut self, index: usize) -> Result<()> {
        self.session = start_session(&self.levels, index, &self.config)?;
        self.level_index = index;
        log::info!("level {}: {}", index + 1, self.session.name());
        self.screen = Screen::Playing;
        self.paused_at = None;
        self.user_paused = false;
        self.cursor = first_cell(&self.session);
        self.flights.clear();
        self.effects.clear();
        self.quit_selected = QuitOption::Resume;
        self.tray_full = false;
        self.status = None;
        self.pump_events(Instant::now());
        Ok(())
    }

    fn set_status(&mut self, text: impl Into<String>, now: Instant) {
        self.status = Some((text.into(), now + Duration::from_millis(STATUS_MS)));
    }

    fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Push every pending landing back by the time spent paused.
    fn resume(&mut self, now: Instant) {
        if let Some(at) = self.paused_at.take() {
            let paused_for = now.saturating_duration_since(at);
            for flight in &mut self.flights {
                flight.due += paused_for;
            }
        }
        self.user_paused = false;
    }

    fn schedule(&mut self, coin: CoinId, kind: FlightKind, now: Instant) {
        let delay_ms = if self.config.no_animation {
            0
        } else {
            match kind {
                FlightKind::Slot => self.config.flight_ms,
                FlightKind::Tray => {
                    let denomination = self.session.coin(coin).map(|c| c.denomination);
                    let same = self
                        .flights
                        .iter()
                        .filter(|f| f.kind == FlightKind::Tray)
                        .filter(|f| self.session.coin(f.coin).map(|c| c.denomination) == denomination)
                        .count() as u64;
                    self.config.settle_ms + same * SAME_TYPE_STAGGER_MS
                }
            }
        };
        self.flights.push(Flight {
            coin,
            kind,
            due: now + Duration::from_millis(delay_ms),
        });
    }

    /// Turn queued session events into flights, flashes, wallet credits and screen changes.
    fn pump_events(&mut self, now: Instant) {
        let events: Vec<GameEvent> = self.session.drain_events().collect();
        for event in events {
            match event {
                GameEvent::CoinToTray { coin, .. } => self.schedule(coin, FlightKind::Tray, now),
                GameEvent::CoinToSlot { coin, .. } => self.schedule(coin, FlightKind::Slot, now),
                GameEvent::CoinUnlocked { cell, .. } => self.effects.flash_cell(cell),
                GameEvent::LockOpened { coin, .. } => {
                    if let Some(Place::Stack(cell)) = self.session.coin(coin).map(|c| c.place) {
                        self.effects.flash_cell(cell);
                    }
                }
                GameEvent::MergeStarted { .. } => self.effects.flash_tray(),
                GameEvent::SlotFilled { cents, .. } => {
                    self.wallet.add(cents);
                    self.save_wallet();
                }
                GameEvent::TapRejected { reason, .. } => self.set_status(rejection_text(reason), now),
                GameEvent::TrayFull => self.tray_full = true,
                GameEvent::LevelCleared { bonus_cents } => {
                    self.wallet.add(bonus_cents);
                    self.save_wallet();
                    self.screen = Screen::Cleared;
                }
                GameEvent::LevelFailed => {
                    self.save_wallet();
                    self.flights.clear();
                    self.screen = Screen::Failed;
                }
                GameEvent::StackEmptied { .. }
                | GameEvent::CoinRevealed { .. }
                | GameEvent::CoinSettled { .. } => {}
            }
        }
    }

    /// Land every flight that is due, earliest first. Landings can start new flights
    /// (a merged coin heading for a slot), which are picked up in the same pass when due.
    fn complete_flights(&mut self, now: Instant) {
        while let Some(pos) = self
            .flights
            .iter()
            .enumerate()
            .filter(|(_, f)| f.due <= now)
            .min_by_key(|(_, f)| f.due)
            .map(|(i, _)| i)
        {
            let flight = self.flights.remove(pos);
            let landed = match flight.kind {
                FlightKind::Tray => self.session.settle(flight.coin),
                FlightKind::Slot => self.session.arrive(flight.coin),
            };
            if !landed {
                log::debug!("flight for {} landed on a stale coin", flight.coin);
            }
            self.pump_events(now);
        }
    }

    fn save_wallet(&self) {
        if let Err(e) = self.wallet.save() {
            log::error!("{}", e);
        }
    }

    /// Step the cursor, skipping disabled cells; stays put at the edge.
    fn move_cursor(&mut self, dir: Direction) {
        let grid = self.session.grid();
        let mut next = self.cursor.step(dir);
        while grid.in_bounds(next) {
            if grid.is_enabled(next) {
                self.cursor = next;
                return;
            }
            next = next.step(dir);
        }
    }

    fn tap(&mut self, now: Instant) {
        let Some(coin) = self.session.top_coin(self.cursor).map(|c| c.id) else {
            self.set_status("Empty cell", now);
            return;
        };
        match self.session.tap(coin) {
            TapOutcome::ToSlot { slot } => log::debug!("{} -> slot {}", coin, slot),
            TapOutcome::ToTray { index } => log::debug!("{} -> tray {}", coin, index),
            TapOutcome::Rejected(_) => {}
        }
        self.pump_events(now);
        if self.config.no_animation {
            self.complete_flights(now);
        }
    }

    /// Returns `true` when the app should exit.
    fn handle_action(&mut self, action: Action, now: Instant) -> Result<bool> {
        match self.screen {
            Screen::Playing if self.user_paused => match action {
                Action::Pause => self.resume(now),
                Action::Quit => self.open_quit_menu(now),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Up => self.move_cursor(Direction::Up),
                Action::Down => self.move_cursor(Direction::Down),
                Action::Left => self.move_cursor(Direction::Left),
                Action::Right => self.move_cursor(Direction::Right),
                Action::Tap => self.tap(now),
                Action::Pause => {
                    self.pause(now);
                    self.user_paused = true;
                }
                Action::Quit => self.open_quit_menu(now),
                Action::Restart => self.load_level(self.level_index)?,
                Action::NextLevel | Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Up | Action::Left => self.quit_selected = self.quit_selected.prev(),
                Action::Down | Action::Right => self.quit_selected = self.quit_selected.next(),
                Action::Tap => match self.quit_selected {
                    QuitOption::Resume => {
                        self.screen = Screen::Playing;
                        self.resume(now);
                    }
                    QuitOption::Restart => self.load_level(self.level_index)?,
                    QuitOption::Exit => return Ok(true),
                },
                Action::Quit | Action::Pause => {
                    self.screen = Screen::Playing;
                    self.resume(now);
                }
                _ => {}
            },
            Screen::Cleared => match action {
                Action::NextLevel | Action::Tap => {
                    let next = (self.level_index + 1) % self.levels.len().max(1);
                    self.load_level(next)?;
                }
                Action::Restart => self.load_level(self.level_index)?,
                Action::Quit => return Ok(true),
                _ => {}
            },
            Screen::Failed => match action {
                Action::Restart | Action::Tap => self.load_level(self.level_index)?,
                Action::Quit => return Ok(true),
                _ => {}
            },
        }
        Ok(false)
    }

    fn open_quit_menu(&mut self, now: Instant) {
        self.pause(now);
        self.quit_selected = QuitOption::Resume;
        self.screen = Screen::QuitMenu;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.save_wallet();

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let status = self
                .status
                .as_ref()
                .filter(|(_, until)| now < *until)
                .map(|(text, _)| text.as_str());
            let view = View {
                screen: self.screen,
                session: &self.session,
                theme: &self.theme,
                cursor: self.cursor,
                flights: &self.flights,
                wallet_cents: self.wallet.cents(),
                level: (self.level_index, self.levels.len()),
                paused: self.user_paused,
                quit_selected: self.quit_selected,
                tray_full: self.tray_full,
                status,
                no_animation: self.config.no_animation,
            };
            let effects = &mut self.effects;
            terminal.draw(|f| ui::draw(f, &view, effects, now))?;

            // ~60 FPS
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_action(key_to_action(key), Instant::now())? {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && self.paused_at.is_none() {
                self.complete_flights(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_AND_TEN: &str = r#"{"levels": [{
        "name": "two stacks",
        "grid_width": 2,
        "grid_height": 1,
        "cells": [
            {"cell": {"x": 0, "z": 0}, "coins": [{"denomination": "One"}]},
            {"cell": {"x": 1, "z": 0}, "coins": [{"denomination": "Ten"}]}
        ],
        "slots": ["One", "Ten"]
    }]}"#;

    fn app(wallet: Wallet) -> App {
        let config = GameConfig {
            capacity: None,
            append_only: false,
            no_animation: true,
            settle_ms: 0,
            flight_ms: 0,
        };
        let levels = LevelSet::from_json(ONE_AND_TEN).unwrap();
        App::new(levels, 0, config, Theme::default(), wallet).unwrap()
    }

    #[test]
    fn slot_payout_is_saved_before_the_level_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet");
        let mut app = app(Wallet::load(&path));
        app.cursor = Cell::new(0, 0);
        app.tap(Instant::now());
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(Wallet::load(&path).cents(), 100);
    }

    #[test]
    fn cursor_starts_on_an_enabled_cell() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(Wallet::load(dir.path().join("wallet")));
        assert!(app.session.grid().is_enabled(app.cursor));
        assert!(app.flights.is_empty());
    }
}
