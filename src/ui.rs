//! Layout and drawing: slot row, coin grid, tray, sidebar, pause, quit menu, level overlays.

use crate::app::{Flight, FlightKind, QuitOption, Screen};
use crate::theme::Theme;
use coinstack::money;
use coinstack::{Cell, Coin, Direction, Phase, Session, Variant};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns/rows of one grid cell.
const CELL_W: u16 = 7;
const CELL_H: u16 = 3;
const CELL_GAP: u16 = 1;
/// Terminal columns of one tray position.
const TRAY_W: u16 = 6;
const SLOT_W: u16 = 11;
const SIDEBAR_WIDTH: u16 = 28;
/// Fade used for unlock and merge flashes.
const FLASH_MS: u32 = 300;

/// Pending tachyonfx flashes. Unlocked cells and the tray flash independently.
#[derive(Default)]
pub struct Effects {
    unlocked: Vec<Cell>,
    unlock_fx: Option<Effect>,
    tray_flash: bool,
    tray_fx: Option<Effect>,
    last_frame: Option<Instant>,
}

impl Effects {
    pub fn flash_cell(&mut self, cell: Cell) {
        if !self.unlocked.contains(&cell) {
            self.unlocked.push(cell);
        }
        // Rebuilt on the next frame with the new cell set.
        self.unlock_fx = None;
    }

    pub fn flash_tray(&mut self) {
        self.tray_flash = true;
        self.tray_fx = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Everything the frame needs that is not in the session.
pub struct View<'a> {
    pub screen: Screen,
    pub session: &'a Session,
    pub theme: &'a Theme,
    pub cursor: Cell,
    pub flights: &'a [Flight],
    pub wallet_cents: u64,
    /// 0-based current level and pack size.
    pub level: (usize, usize),
    pub paused: bool,
    pub quit_selected: QuitOption,
    pub tray_full: bool,
    pub status: Option<&'a str>,
    pub no_animation: bool,
}

/// Draw the current screen. Flashes are skipped when `no_animation` is set.
pub fn draw(frame: &mut Frame, view: &View, effects: &mut Effects, now: Instant) {
    let area = frame.area();
    let Some(board) = draw_game(frame, view, area) else {
        return;
    };
    if !view.no_animation {
        apply_flashes(frame, view, &board, effects, now);
    }
    match view.screen {
        Screen::Playing => {
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            }
        }
        Screen::QuitMenu => draw_quit_menu(frame, view.theme, view.quit_selected),
        Screen::Cleared => draw_cleared(frame, view, area),
        Screen::Failed => draw_failed(frame, view, area),
    }
}

/// Where the board pieces ended up this frame.
struct BoardRects {
    grid: Rect,
    tray: Rect,
}

/// Terminal cells for a grid coordinate or count; negatives are 0, huge values clamp.
fn cells(n: i32) -> u16 {
    u16::try_from(n.max(0)).unwrap_or(u16::MAX)
}

fn count(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn grid_size(session: &Session) -> (u16, u16) {
    let cols = cells(session.grid().width());
    let rows = cells(session.grid().height());
    (
        cols.saturating_mul(CELL_W + CELL_GAP),
        rows.saturating_mul(CELL_H),
    )
}

/// Board size in terminal cells, border included.
fn board_size(session: &Session) -> (u16, u16) {
    let (gw, gh) = grid_size(session);
    let tray_w = count(session.tray().capacity()).saturating_mul(TRAY_W);
    let slots_w = count(session.slots().len()).saturating_mul(SLOT_W + 1);
    let w = gw.max(tray_w).max(slots_w).saturating_add(2);
    // slots, gap, grid, gap, tray label, tray, border
    let h = gh.saturating_add(3 + 1 + 1 + 1 + 3 + 2);
    (w, h)
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Board + sidebar, centred. Returns `None` when the terminal is too small to draw it.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) -> Option<BoardRects> {
    let (bw, bh) = board_size(view.session);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);
    let total_h = bh.max(16);
    if area.width < total_w || area.height < total_h {
        let msg = format!(
            "Terminal too small: need {}x{}, have {}x{}",
            total_w, total_h, area.width, area.height
        );
        Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(view.theme.title))
            .render(centered(area, area.width, 1), frame.buffer_mut());
        return None;
    }

    let active = centered(area, total_w, total_h);
    let cols = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active);
    let board_area = Rect {
        height: bh,
        ..cols[0]
    };

    let (current, total) = view.level;
    let title = format!(
        " Coinstack | Level {}/{}: {} ",
        current + 1,
        total,
        view.session.name()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(view.theme.div_line).bg(view.theme.bg))
        .title(Span::styled(title, view.theme.title));
    let inner = block.inner(board_area);
    block.render(board_area, frame.buffer_mut());

    let (gw, gh) = grid_size(view.session);
    let rows = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(gh),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(inner);

    draw_slots(frame, view, rows[0]);
    let grid = centered(rows[2], gw, gh);
    draw_grid(frame, view, grid);
    let tray = draw_tray(frame, view, rows[4], rows[5]);
    draw_sidebar(frame, view, cols[1]);
    Some(BoardRects { grid, tray })
}

fn draw_slots(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let slots = view.session.slots();
    let total = count(slots.len()).saturating_mul(SLOT_W + 1);
    let row = centered(area, total, 3);
    for (i, slot) in slots.iter().enumerate() {
        let rect = Rect {
            x: row.x.saturating_add(count(i).saturating_mul(SLOT_W + 1)),
            y: row.y,
            width: SLOT_W,
            height: 3,
        };
        let color = theme.coin_color(slot.denomination);
        let incoming = view
            .flights
            .iter()
            .filter(|f| f.kind == FlightKind::Slot)
            .filter_map(|f| view.session.coin(f.coin))
            .filter(|c| c.place == coinstack::Place::SlotFlight(i))
            .count();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(
                format!(" {} ", slot.denomination.label()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(rect);
        block.render(rect, frame.buffer_mut());
        let text = if incoming > 0 {
            format!("x{} +{}", slot.filled, incoming)
        } else {
            format!("x{}", slot.filled)
        };
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.main_fg))
            .render(inner, frame.buffer_mut());
    }
}

fn cell_rect(grid_area: Rect, height: i32, cell: Cell) -> Rect {
    let row = cells(height.saturating_sub(1).saturating_sub(cell.z));
    Rect {
        x: grid_area
            .x
            .saturating_add(cells(cell.x).saturating_mul(CELL_W + CELL_GAP)),
        y: grid_area.y.saturating_add(row.saturating_mul(CELL_H)),
        width: CELL_W,
        height: CELL_H,
    }
}

fn nail_arrows(coin: &Coin) -> String {
    let Variant::Nailed { directions } = coin.variant else {
        return String::new();
    };
    directions
        .iter()
        .map(|d| match d {
            Direction::Up => '↑',
            Direction::Down => '↓',
            Direction::Left => '←',
            Direction::Right => '→',
        })
        .collect()
}

/// Label, marker and colours for the top coin of a stack.
fn coin_face(coin: &Coin, theme: &Theme) -> (String, String, Style) {
    let color = theme.coin_color(coin.denomination);
    let solid = Style::default().fg(Color::Black).bg(color);
    match coin.variant {
        Variant::Normal => (coin.denomination.label().to_string(), String::new(), solid),
        Variant::Mystery { .. } => (
            "?".to_string(),
            String::new(),
            Style::default().fg(Color::Black).bg(theme.inactive_fg),
        ),
        Variant::Nailed { .. } => (
            coin.denomination.label().to_string(),
            format!("x{}", nail_arrows(coin)),
            Style::default().fg(color).bg(theme.div_line),
        ),
        Variant::Locked => (
            coin.denomination.label().to_string(),
            "LOCK".to_string(),
            Style::default().fg(color).bg(theme.div_line),
        ),
        Variant::Key => (
            coin.denomination.label().to_string(),
            "KEY".to_string(),
            solid.add_modifier(Modifier::BOLD),
        ),
    }
}

fn draw_grid(frame: &mut Frame, view: &View, area: Rect) {
    let session = view.session;
    let theme = view.theme;
    let grid = session.grid();
    for z in 0..grid.height() {
        for x in 0..grid.width() {
            let cell = Cell::new(x, z);
            if !grid.is_enabled(cell) {
                continue;
            }
            let rect = cell_rect(area, grid.height(), cell);
            let size = session.stacks().stack_size(cell);
            let (lines, mut style) = match session.top_coin(cell) {
                Some(coin) => {
                    let (label, marker, style) = coin_face(coin, theme);
                    let count = if size > 1 {
                        format!("x{}", size)
                    } else {
                        String::new()
                    };
                    (vec![Line::from(label), Line::from(marker), Line::from(count)], style)
                }
                None => (
                    vec![Line::from(""), Line::from("·"), Line::from("")],
                    Style::default().fg(theme.div_line).bg(theme.bg),
                ),
            };
            if cell == view.cursor && view.screen == Screen::Playing {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .style(style)
                .render(rect, frame.buffer_mut());
        }
    }
}

/// Tray positions left to right; pending coins are drawn hollow. Returns the tray rect.
fn draw_tray(frame: &mut Frame, view: &View, label_area: Rect, area: Rect) -> Rect {
    let theme = view.theme;
    let tray = view.session.tray();
    let label = format!(
        "Tray {}/{}",
        tray.len(),
        tray.capacity()
    );
    let label_style = if tray.remaining_capacity() <= 1 {
        Style::default().fg(theme.coins[5]).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.main_fg)
    };
    Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(label_style)
        .render(label_area, frame.buffer_mut());

    let row = centered(area, count(tray.capacity()).saturating_mul(TRAY_W), 3);
    let entries: Vec<_> = tray.layout().collect();
    for i in 0..tray.capacity() {
        let rect = Rect {
            x: row.x.saturating_add(count(i).saturating_mul(TRAY_W)),
            y: row.y,
            width: TRAY_W - 1,
            height: 3,
        };
        let (text, style) = match entries.get(i) {
            Some((_, entry)) => {
                let color = theme.coin_color(entry.denomination);
                let style = match entry.phase {
                    Phase::Committed => Style::default().fg(Color::Black).bg(color),
                    Phase::Pending => Style::default()
                        .fg(color)
                        .bg(theme.bg)
                        .add_modifier(Modifier::DIM),
                };
                (entry.denomination.label(), style)
            }
            None => ("", Style::default().bg(theme.div_line)),
        };
        Paragraph::new(vec![Line::from(""), Line::from(text)])
            .alignment(Alignment::Center)
            .style(style)
            .render(rect, frame.buffer_mut());
    }
    row
}

fn sidebar_block(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {} ", title), theme.title))
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Fill(1),
        ])
        .split(area);

    let text = Style::default().fg(theme.main_fg);
    let wallet_block = sidebar_block(theme, "Wallet");
    let inner = wallet_block.inner(chunks[0]);
    wallet_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(vec![
        Line::from(Span::styled(
            money::dollars(view.wallet_cents),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Earned  {}", money::short(session.earned_cents())),
            text,
        )),
        Line::from(Span::styled(
            format!("Bonus   {}", money::short(session.bonus_cents())),
            text,
        )),
        Line::from(Span::styled(
            format!("Coins   {}", session.coins_left()),
            text,
        )),
    ])
    .render(inner, frame.buffer_mut());

    let cell_block = sidebar_block(theme, "Cell");
    let inner = cell_block.inner(chunks[1]);
    cell_block.render(chunks[1], frame.buffer_mut());
    let cursor_lines = match session.top_coin(view.cursor) {
        Some(coin) => {
            let kind = match coin.variant {
                Variant::Normal => "coin".to_string(),
                Variant::Mystery { .. } => "mystery".to_string(),
                Variant::Nailed { .. } => format!("nailed {}", nail_arrows(coin)),
                Variant::Locked => "locked".to_string(),
                Variant::Key => "key".to_string(),
            };
            let tappable = if session.is_tappable(coin.id) {
                "tap to move"
            } else {
                "blocked"
            };
            vec![
                Line::from(Span::styled(
                    format!("{} {} x{}", view.cursor, kind, session.stacks().stack_size(view.cursor)),
                    text,
                )),
                Line::from(Span::styled(
                    tappable,
                    Style::default().fg(theme.inactive_fg),
                )),
            ]
        }
        None => vec![Line::from(Span::styled(format!("{} empty", view.cursor), text))],
    };
    let mut lines = cursor_lines;
    if let Some(status) = view.status {
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(theme.title),
        )));
    }
    Paragraph::new(lines).render(inner, frame.buffer_mut());

    let keys_block = sidebar_block(theme, "Keys");
    let inner = keys_block.inner(chunks[2]);
    keys_block.render(chunks[2], frame.buffer_mut());
    let hint = Style::default().fg(theme.inactive_fg);
    Paragraph::new(vec![
        Line::from(Span::styled("Arrows/hjkl  move", hint)),
        Line::from(Span::styled("Enter/Space  tap", hint)),
        Line::from(Span::styled("P  pause   R  restart", hint)),
        Line::from(Span::styled("Q / Esc  quit", hint)),
    ])
    .render(inner, frame.buffer_mut());
}

/// Buffer positions covered by the given grid cells.
fn cell_positions(grid_area: Rect, height: i32, cells: &[Cell]) -> HashSet<(u16, u16)> {
    cells
        .iter()
        .flat_map(|&cell| {
            let r = cell_rect(grid_area, height, cell);
            (r.y..r.y + r.height).flat_map(move |y| (r.x..r.x + r.width).map(move |x| (x, y)))
        })
        .collect()
}

/// Create or advance the unlock and merge flashes (TachyonFX: fade to the highlight colour).
fn apply_flashes(
    frame: &mut Frame,
    view: &View,
    board: &BoardRects,
    effects: &mut Effects,
    now: Instant,
) {
    let delta = effects
        .last_frame
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    effects.last_frame = Some(now);
    let hi = view.theme.hi_fg;

    if !effects.unlocked.is_empty() {
        if effects.unlock_fx.is_none() {
            let set = cell_positions(board.grid, view.session.grid().height(), &effects.unlocked);
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
                set.contains(&(pos.x, pos.y))
            }));
            let effect = fx::fade_to(hi, hi, (FLASH_MS, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board.grid);
            effects.unlock_fx = Some(effect);
        }
        if let Some(effect) = &mut effects.unlock_fx {
            frame.render_effect(effect, board.grid, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                effects.unlocked.clear();
                effects.unlock_fx = None;
            }
        }
    }

    if effects.tray_flash {
        if effects.tray_fx.is_none() {
            let effect = fx::fade_to(view.theme.title, view.theme.bg, (FLASH_MS, Interpolation::Linear))
                .with_area(board.tray);
            effects.tray_fx = Some(effect);
        }
        if let Some(effect) = &mut effects.tray_fx {
            frame.render_effect(effect, board.tray, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                effects.tray_flash = false;
                effects.tray_fx = None;
            }
        }
    }
}

fn clear_rect(frame: &mut Frame, rect: Rect, theme: &Theme) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            frame.buffer_mut()[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.bg));
        }
    }
}

fn draw_popup(frame: &mut Frame, theme: &Theme, area: Rect, title: &str, lines: Vec<Line>) {
    let popup = centered(area, 36, lines.len() as u16 + 2);
    clear_rect(frame, popup, theme);
    Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.title).bg(theme.bg))
            .title(Span::styled(format!(" {} ", title), theme.title)),
    )
    .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P  Resume    Q  Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    draw_popup(frame, theme, area, "Coinstack", lines);
}

fn draw_cleared(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let text = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Board cleared! ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Earned  {}", money::dollars(session.earned_cents())),
            text,
        )),
        Line::from(Span::styled(
            format!("Bonus   {}", money::dollars(session.bonus_cents())),
            text,
        )),
        Line::from(Span::styled(
            format!("Wallet  {}", money::dollars(view.wallet_cents)),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "N  next   R  replay   Q  quit",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    draw_popup(frame, theme, area, "Level cleared", lines);
}

fn draw_failed(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let reason = if view.tray_full {
        "The tray is full."
    } else {
        "No moves left."
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Level failed ",
            Style::default().fg(Color::Black).bg(theme.coins[5]),
        )),
        Line::from(""),
        Line::from(Span::styled(reason, Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(
            format!("Kept {}", money::dollars(view.session.earned_cents())),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "R  retry   Q  quit",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    draw_popup(frame, theme, area, "Game over", lines);
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let quit_rect = centered(area, 24, 8);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    clear_rect(frame, quit_rect, theme);
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Restart, " Restart level "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_rect_puts_high_z_on_top() {
        let area = Rect::new(10, 5, 40, 9);
        let top = cell_rect(area, 3, Cell::new(0, 2));
        let bottom = cell_rect(area, 3, Cell::new(1, 0));
        assert_eq!((top.x, top.y), (10, 5));
        assert_eq!((bottom.x, bottom.y), (10 + CELL_W + CELL_GAP, 5 + 2 * CELL_H));
    }

    #[test]
    fn flash_positions_cover_whole_cells() {
        let area = Rect::new(0, 0, 40, 9);
        let set = cell_positions(area, 3, &[Cell::new(0, 0), Cell::new(0, 0)]);
        assert_eq!(set.len(), (CELL_W * CELL_H) as usize);
        assert!(set.contains(&(0, 2 * CELL_H)));
    }

    #[test]
    fn sizes_clamp_instead_of_overflowing() {
        assert_eq!(cells(-4), 0);
        assert_eq!(cells(i32::MAX), u16::MAX);
        assert_eq!(count(usize::MAX), u16::MAX);
        let far = cell_rect(Rect::new(u16::MAX - 1, 0, 1, 1), 1, Cell::new(i32::MAX, -5));
        assert_eq!(far.x, u16::MAX);
    }

    #[test]
    fn largest_level_fits_in_a_u16_board() {
        use coinstack::level::{MAX_GRID_SIZE, MAX_TRAY_CAPACITY};
        use coinstack::{InsertPolicy, LevelData, SessionOptions};

        let json = format!(
            r#"{{
                "name": "wide",
                "grid_width": {max},
                "grid_height": {max},
                "tray_capacity": {cap},
                "cells": [{{"cell": {{"x": 0, "z": 0}}, "coins": [{{"denomination": "One"}}]}}],
                "slots": ["One"]
            }}"#,
            max = MAX_GRID_SIZE,
            cap = MAX_TRAY_CAPACITY,
        );
        let level = LevelData::from_json(&json).unwrap();
        let options = SessionOptions {
            capacity: MAX_TRAY_CAPACITY,
            policy: InsertPolicy::GroupSameType,
        };
        let session = Session::new(&level, options).unwrap();
        let (w, h) = board_size(&session);
        // 20 tray positions are wider than 12 grid columns.
        assert_eq!(w, 20 * TRAY_W + 2);
        assert_eq!(h, 12 * CELL_H + 11);
    }

    #[test]
    fn effects_dedupe_cells_and_reset() {
        let mut fx = Effects::default();
        fx.flash_cell(Cell::new(1, 1));
        fx.flash_cell(Cell::new(1, 1));
        fx.flash_tray();
        assert_eq!(fx.unlocked.len(), 1);
        assert!(fx.tray_flash);
        fx.clear();
        assert!(fx.unlocked.is_empty());
        assert!(!fx.tray_flash);
    }
}
