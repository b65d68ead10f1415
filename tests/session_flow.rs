use coinstack::{
    Cell, CoinId, Denomination, Event, InsertPolicy, LevelData, LevelError, LevelSet, Outcome,
    Phase, Session, SessionOptions, TapOutcome, Wallet,
};
use std::collections::HashSet;

const HALF_HALF_FIVE: &str = r#"{
    "name": "three",
    "grid_width": 3,
    "grid_height": 1,
    "cells": [
        {"cell": {"x": 0, "z": 0}, "coins": [{"denomination": "Half"}]},
        {"cell": {"x": 1, "z": 0}, "coins": [{"denomination": "Five"}]},
        {"cell": {"x": 2, "z": 0}, "coins": [{"denomination": "Half"}]}
    ],
    "slots": ["Ten"]
}"#;

fn start(json: &str, options: Option<SessionOptions>) -> Session {
    let level = LevelData::from_json(json).unwrap();
    let options = options.unwrap_or_else(|| SessionOptions::from_level(&level));
    Session::new(&level, options).unwrap()
}

fn top(s: &Session, x: i32, z: i32) -> CoinId {
    s.top_coin(Cell::new(x, z)).map(|c| c.id).unwrap()
}

fn tray_layout(s: &Session) -> Vec<(Denomination, Phase)> {
    s.tray()
        .layout()
        .map(|(_, e)| (e.denomination, e.phase))
        .collect()
}

/// Land every coin in the air, repeatedly, until the session goes quiet.
/// Returns the cents paid out along the way.
fn land_everything(s: &mut Session) -> u64 {
    let mut paid = 0;
    loop {
        let events: Vec<Event> = s.drain_events().collect();
        if events.is_empty() {
            return paid;
        }
        for event in events {
            match event {
                Event::CoinToTray { coin, .. } => {
                    s.settle(coin);
                }
                Event::CoinToSlot { coin, .. } => {
                    s.arrive(coin);
                }
                Event::SlotFilled { cents, .. } => paid += cents,
                _ => {}
            }
        }
    }
}

#[test]
fn grouping_puts_second_half_next_to_the_first() {
    let mut s = start(HALF_HALF_FIVE, None);
    let (a, five, b) = (top(&s, 0, 0), top(&s, 1, 0), top(&s, 2, 0));
    assert_eq!(s.tap(a), TapOutcome::ToTray { index: 0 });
    assert_eq!(s.tap(five), TapOutcome::ToTray { index: 1 });
    assert_eq!(s.tap(b), TapOutcome::ToTray { index: 1 });
    assert_eq!(
        tray_layout(&s),
        vec![
            (Denomination::Half, Phase::Pending),
            (Denomination::Half, Phase::Pending),
            (Denomination::Five, Phase::Pending),
        ]
    );

    assert!(s.settle(a));
    assert!(s.settle(b));
    assert_eq!(
        tray_layout(&s),
        vec![
            (Denomination::One, Phase::Committed),
            (Denomination::Five, Phase::Pending),
        ]
    );
    assert!(s.settle(five));
    // One and Five can never reach the Ten slot from here.
    assert_eq!(s.outcome(), Outcome::Failed);
}

#[test]
fn append_only_keeps_tap_order() {
    let mut s = start(
        HALF_HALF_FIVE,
        Some(SessionOptions {
            capacity: 5,
            policy: InsertPolicy::AppendOnly,
        }),
    );
    for x in 0..3 {
        let id = top(&s, x, 0);
        assert_eq!(s.tap(id), TapOutcome::ToTray { index: x as usize });
    }
    let denoms: Vec<Denomination> = tray_layout(&s).into_iter().map(|(d, _)| d).collect();
    assert_eq!(
        denoms,
        vec![Denomination::Half, Denomination::Five, Denomination::Half]
    );
}

#[test]
fn pending_coins_count_against_capacity() {
    let mut s = start(
        HALF_HALF_FIVE,
        Some(SessionOptions {
            capacity: 2,
            policy: InsertPolicy::GroupSameType,
        }),
    );
    let (a, b) = (top(&s, 0, 0), top(&s, 2, 0));
    s.tap(a);
    s.tap(b);
    // Two halves in the air: a merge is coming, so the tray is not full yet.
    assert_eq!(s.outcome(), Outcome::Playing);
    assert!(matches!(s.tap(top(&s, 1, 0)), TapOutcome::Rejected(_)));
    assert_eq!(s.stacks().total(), 1);
}

/// Stack heights plus the tray contents. With every flight landed, nails, locks and
/// reveals all follow from which coins have left the board, so this pins the position.
type Position = (Vec<(Cell, usize)>, Vec<Denomination>);

fn position(s: &Session) -> Position {
    let mut stacks: Vec<(Cell, usize)> = s
        .stacks()
        .occupied_cells()
        .map(|c| (c, s.stacks().stack_size(c)))
        .collect();
    stacks.sort();
    let mut tray: Vec<Denomination> = s.tray().layout().map(|(_, e)| e.denomination).collect();
    tray.sort();
    (stacks, tray)
}

/// Depth-first search over tap orders. Returns the winning taps, first tap first.
fn solve(s: &Session, seen: &mut HashSet<Position>) -> Option<Vec<Cell>> {
    match s.outcome() {
        Outcome::Cleared => return Some(Vec::new()),
        Outcome::Failed => return None,
        Outcome::Playing => {}
    }
    if !seen.insert(position(s)) {
        return None;
    }
    let mut cells: Vec<Cell> = s.stacks().occupied_cells().collect();
    cells.sort();
    for cell in cells {
        let Some(id) = s.top_coin(cell).map(|c| c.id) else {
            continue;
        };
        if !s.is_tappable(id) {
            continue;
        }
        let mut next = s.clone();
        next.tap(id);
        land_everything(&mut next);
        if let Some(mut rest) = solve(&next, seen) {
            rest.insert(0, cell);
            return Some(rest);
        }
    }
    None
}

#[test]
fn every_builtin_level_can_be_cleared() {
    let pack = LevelSet::builtin().unwrap();
    assert!(pack.len() >= 3);
    for index in 0..pack.len() {
        let level = pack.get(index).unwrap();
        let mut s = Session::new(level, SessionOptions::from_level(level)).unwrap();
        let mut paid = land_everything(&mut s);
        let taps = solve(&s, &mut HashSet::new())
            .unwrap_or_else(|| panic!("level {} has no winning tap order", level.name));

        // Replay the winning order to check the payout adds up.
        for cell in taps {
            let id = top(&s, cell.x, cell.z);
            assert!(s.is_tappable(id), "{} not tappable in {}", cell, level.name);
            s.tap(id);
            paid += land_everything(&mut s);
        }
        assert_eq!(s.outcome(), Outcome::Cleared, "level {}", level.name);
        assert_eq!(s.coins_left(), 0);
        assert_eq!(paid, s.earned_cents());
    }
}

#[test]
fn level_pack_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pack.json");
    std::fs::write(&path, format!(r#"{{"levels": [{}]}}"#, HALF_HALF_FIVE)).unwrap();
    let pack = LevelSet::load(&path).unwrap();
    assert_eq!(pack.len(), 1);
    assert_eq!(pack.get(0).unwrap().name, "three");
    assert!(matches!(
        pack.get(1),
        Err(LevelError::NotFound { index: 1, count: 1 })
    ));

    assert!(matches!(
        LevelSet::load(&dir.path().join("missing.json")),
        Err(LevelError::Io { .. })
    ));
    std::fs::write(&path, "{\"levels\": []}").unwrap();
    assert!(matches!(LevelSet::load(&path), Err(LevelError::EmptyPack)));
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(LevelSet::load(&path), Err(LevelError::Json(_))));
}

#[test]
fn slot_payouts_reach_the_wallet() {
    let mut s = start(
        r#"{
            "name": "payday",
            "grid_width": 2,
            "grid_height": 1,
            "cells": [
                {"cell": {"x": 0, "z": 0}, "coins": [{"denomination": "Ten"}, {"denomination": "Five"}]},
                {"cell": {"x": 1, "z": 0}, "coins": [{"denomination": "Ten"}]}
            ],
            "slots": ["Ten", "Five"],
            "bonus_cents": 100
        }"#,
        None,
    );
    let dir = tempfile::tempdir().unwrap();
    let mut wallet = Wallet::load(dir.path().join("wallet"));
    let mut bonus = 0;
    for (x, z) in [(0, 0), (0, 0), (1, 0)] {
        let id = top(&s, x, z);
        assert!(matches!(s.tap(id), TapOutcome::ToSlot { .. }));
        assert!(s.arrive(id));
        for event in s.drain_events() {
            match event {
                Event::SlotFilled { cents, .. } => wallet.add(cents),
                Event::LevelCleared { bonus_cents } => bonus = bonus_cents,
                _ => {}
            }
        }
    }
    wallet.add(bonus);
    assert_eq!(s.outcome(), Outcome::Cleared);
    assert_eq!(s.slots().get(0).map(|slot| slot.filled), Some(2));
    wallet.save().unwrap();
    assert_eq!(Wallet::load(dir.path().join("wallet")).cents(), 2_600);
}
