//! Level data: JSON level packs, parsed with serde and validated before play.

use crate::coin::{Denomination, Directions, Variant};
use crate::grid::{Cell, WorldPos};
use crate::merge::MergeTable;
use crate::slots::MAX_SLOTS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Level pack compiled into the binary.
pub const BUILTIN_LEVELS: &str = include_str!("../levels/builtin.json");

/// Largest grid side a level may use.
pub const MAX_GRID_SIZE: i32 = 12;
/// Largest tray a level (or a capacity override) may ask for.
pub const MAX_TRAY_CAPACITY: usize = 20;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {index} not found (pack has {count})")]
    NotFound { index: usize, count: usize },
    #[error("level pack is empty")]
    EmptyPack,
    #[error("grid must be 1x1 to {max}x{max}, got {width}x{height}", max = MAX_GRID_SIZE)]
    BadGrid { width: i32, height: i32 },
    #[error("cell spacing must be positive, got {0}")]
    BadSpacing(f32),
    #[error("cell {0} is outside the grid")]
    OutOfBounds(Cell),
    #[error("cell {0} is disabled but has coins")]
    DisabledCell(Cell),
    #[error("cell {0} is listed twice")]
    DuplicateCell(Cell),
    #[error("level has no coins")]
    NoCoins,
    #[error("level needs 1 to {max} slots, got {0}", max = MAX_SLOTS)]
    SlotCount(usize),
    #[error("no coin or merge can ever produce {0} for its slot")]
    UnreachableSlot(Denomination),
    #[error("mystery coin at {0} has no hidden denomination")]
    MysteryWithoutReveal(Cell),
    #[error("nailed coin at {0} has no unlock directions")]
    NailWithoutDirections(Cell),
    #[error("{locks} locked coins but only {keys} keys")]
    NotEnoughKeys { locks: usize, keys: usize },
    #[error("tray capacity must be at least 1")]
    ZeroCapacity,
    #[error("tray capacity {0} is over the limit of {max}", max = MAX_TRAY_CAPACITY)]
    CapacityTooLarge(usize),
    #[error("{count} x {denomination} can never be merged into a slot")]
    Unbalanced {
        denomination: Denomination,
        count: usize,
    },
    #[error("invalid level JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoinKind {
    #[default]
    Normal,
    Mystery,
    Nailed,
    Locked,
    Key,
}

/// One coin as written in a level file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSpec {
    pub denomination: Denomination,
    #[serde(default)]
    pub kind: CoinKind,
    /// Nailed coins only.
    #[serde(default, skip_serializing_if = "no_directions")]
    pub unlock: Directions,
    /// Mystery coins only: what the coin turns out to be.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<Denomination>,
}

fn no_directions(directions: &Directions) -> bool {
    directions.is_empty()
}

impl CoinSpec {
    pub fn normal(denomination: Denomination) -> Self {
        Self {
            denomination,
            kind: CoinKind::Normal,
            unlock: Directions::NONE,
            reveal: None,
        }
    }

    pub fn variant(&self, cell: Cell) -> Result<Variant, LevelError> {
        Ok(match self.kind {
            CoinKind::Normal => Variant::Normal,
            CoinKind::Mystery => Variant::Mystery {
                reveal: self.reveal.ok_or(LevelError::MysteryWithoutReveal(cell))?,
            },
            CoinKind::Nailed => {
                if self.unlock.is_empty() {
                    return Err(LevelError::NailWithoutDirections(cell));
                }
                Variant::Nailed {
                    directions: self.unlock,
                }
            }
            CoinKind::Locked => Variant::Locked,
            CoinKind::Key => Variant::Key,
        })
    }

    /// Denomination once any mystery is revealed.
    pub fn true_denomination(&self) -> Denomination {
        match (self.kind, self.reveal) {
            (CoinKind::Mystery, Some(d)) => d,
            _ => self.denomination,
        }
    }
}

/// Coins on one cell, bottom to top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellCoins {
    pub cell: Cell,
    pub coins: Vec<CoinSpec>,
}

fn default_grid_size() -> i32 {
    5
}

fn default_spacing() -> f32 {
    1.5
}

fn default_capacity() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    #[serde(default = "default_grid_size")]
    pub grid_width: i32,
    #[serde(default = "default_grid_size")]
    pub grid_height: i32,
    #[serde(default = "default_spacing")]
    pub cell_spacing: f32,
    #[serde(default)]
    pub grid_offset: WorldPos,
    #[serde(default)]
    pub disabled_cells: Vec<Cell>,
    pub cells: Vec<CellCoins>,
    pub slots: Vec<Denomination>,
    #[serde(default)]
    pub merge_rules: MergeTable,
    #[serde(default = "default_capacity")]
    pub tray_capacity: usize,
    #[serde(default = "default_true")]
    pub group_same_types: bool,
    /// Paid into the wallet when the board is cleared.
    #[serde(default)]
    pub bonus_cents: u64,
}

impl LevelData {
    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.grid_width).contains(&cell.x) && (0..self.grid_height).contains(&cell.z)
    }

    pub fn coin_count(&self) -> usize {
        self.cells.iter().map(|c| c.coins.len()).sum()
    }

    /// Reject anything that would leave the level unplayable or inconsistent.
    pub fn validate(&self) -> Result<(), LevelError> {
        let side = 1..=MAX_GRID_SIZE;
        if !side.contains(&self.grid_width) || !side.contains(&self.grid_height) {
            return Err(LevelError::BadGrid {
                width: self.grid_width,
                height: self.grid_height,
            });
        }
        if self.cell_spacing.is_nan() || self.cell_spacing <= 0.0 {
            return Err(LevelError::BadSpacing(self.cell_spacing));
        }
        if self.tray_capacity == 0 {
            return Err(LevelError::ZeroCapacity);
        }
        if self.tray_capacity > MAX_TRAY_CAPACITY {
            return Err(LevelError::CapacityTooLarge(self.tray_capacity));
        }
        if self.slots.is_empty() || self.slots.len() > MAX_SLOTS {
            return Err(LevelError::SlotCount(self.slots.len()));
        }

        let mut seen = BTreeSet::new();
        let (mut locks, mut keys) = (0, 0);
        for entry in &self.cells {
            let cell = entry.cell;
            if !self.in_bounds(cell) {
                return Err(LevelError::OutOfBounds(cell));
            }
            if self.disabled_cells.contains(&cell) {
                return Err(LevelError::DisabledCell(cell));
            }
            if !seen.insert(cell) {
                return Err(LevelError::DuplicateCell(cell));
            }
            for spec in &entry.coins {
                match spec.variant(cell)? {
                    Variant::Locked => locks += 1,
                    Variant::Key => keys += 1,
                    Variant::Normal | Variant::Mystery { .. } | Variant::Nailed { .. } => {}
                }
            }
        }
        if self.coin_count() == 0 {
            return Err(LevelError::NoCoins);
        }
        if locks > keys {
            return Err(LevelError::NotEnoughKeys { locks, keys });
        }

        let reachable = self.reachable_denominations();
        if let Some(&missing) = self.slots.iter().find(|d| !reachable.contains(d)) {
            return Err(LevelError::UnreachableSlot(missing));
        }
        Ok(())
    }

    /// Walk the merge chain from the lowest denomination: every coin that does not match a
    /// slot has to be eaten by a rule with nothing left over, or the board can never be
    /// cleared. Passing this does not prove a level winnable (tray room and blockers
    /// still matter); failing it proves the opposite.
    pub fn check_balance(&self) -> Result<(), LevelError> {
        let mut counts: BTreeMap<Denomination, usize> = BTreeMap::new();
        for spec in self.cells.iter().flat_map(|c| &c.coins) {
            *counts.entry(spec.true_denomination()).or_default() += 1;
        }
        for denomination in Denomination::ALL {
            let count = counts.get(&denomination).copied().unwrap_or(0);
            if count == 0 || self.slots.contains(&denomination) {
                continue;
            }
            match self.merge_rules.rule_for(denomination) {
                Some(rule) if count % rule.required == 0 => {
                    *counts.entry(rule.output).or_default() += count / rule.required;
                }
                _ => return Err(LevelError::Unbalanced { denomination, count }),
            }
        }
        Ok(())
    }

    /// Denominations that can show up in play: every coin on the board plus whatever the
    /// merge rules can build from them.
    pub fn reachable_denominations(&self) -> BTreeSet<Denomination> {
        let mut reachable: BTreeSet<Denomination> = self
            .cells
            .iter()
            .flat_map(|c| c.coins.iter().map(CoinSpec::true_denomination))
            .collect();
        loop {
            let before = reachable.len();
            for rule in self.merge_rules.rules() {
                if reachable.contains(&rule.input) {
                    reachable.insert(rule.output);
                }
            }
            if reachable.len() == before {
                return reachable;
            }
        }
    }
}

/// An ordered list of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub levels: Vec<LevelData>,
}

impl LevelSet {
    pub fn builtin() -> Result<Self, LevelError> {
        Self::from_json(BUILTIN_LEVELS)
    }

    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        let set: Self = serde_json::from_str(text)?;
        if set.levels.is_empty() {
            return Err(LevelError::EmptyPack);
        }
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Level `index`, validated.
    pub fn get(&self, index: usize) -> Result<&LevelData, LevelError> {
        let level = self.levels.get(index).ok_or(LevelError::NotFound {
            index,
            count: self.levels.len(),
        })?;
        level.validate()?;
        Ok(level)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Direction;
    use crate::merge::MergeRule;

    fn level() -> LevelData {
        LevelData::from_json(
            r#"{
                "name": "t",
                "grid_width": 3,
                "grid_height": 2,
                "disabled_cells": [{"x": 2, "z": 1}],
                "cells": [
                    {"cell": {"x": 0, "z": 0}, "coins": [
                        {"denomination": "Half"},
                        {"denomination": "Five", "kind": "Nailed", "unlock": ["Down"]}
                    ]},
                    {"cell": {"x": 1, "z": 0}, "coins": [
                        {"denomination": "One", "kind": "Mystery", "reveal": "Ten"}
                    ]}
                ],
                "slots": ["Five"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_fill_in() {
        let l = level();
        assert_eq!(l.tray_capacity, 10);
        assert!(l.group_same_types);
        assert_eq!(l.cell_spacing, 1.5);
        assert_eq!(l.merge_rules, MergeTable::default());
        assert_eq!(l.cells[0].coins[1].unlock, Direction::Down.into());
        assert!(l.validate().is_ok());
    }

    #[test]
    fn coins_on_bad_cells_are_rejected() {
        let mut l = level();
        l.cells[1].cell = Cell::new(2, 1);
        assert!(matches!(l.validate(), Err(LevelError::DisabledCell(_))));
        l.cells[1].cell = Cell::new(3, 0);
        assert!(matches!(l.validate(), Err(LevelError::OutOfBounds(_))));
        l.cells[1].cell = Cell::new(0, 0);
        assert!(matches!(l.validate(), Err(LevelError::DuplicateCell(_))));
    }

    #[test]
    fn variant_payloads_are_required() {
        let mut l = level();
        l.cells[0].coins[1].unlock = Directions::NONE;
        assert!(matches!(
            l.validate(),
            Err(LevelError::NailWithoutDirections(c)) if c == Cell::new(0, 0)
        ));

        let mut l = level();
        l.cells[1].coins[0].reveal = None;
        assert!(matches!(l.validate(), Err(LevelError::MysteryWithoutReveal(_))));
    }

    #[test]
    fn slots_must_be_reachable() {
        let mut l = level();
        l.merge_rules = MergeTable::new(vec![MergeRule::new(
            Denomination::Half,
            2,
            Denomination::One,
        )])
        .unwrap();
        // Ten only exists behind the mystery coin, One only through a merge.
        l.slots = vec![Denomination::Ten, Denomination::One];
        assert!(l.validate().is_ok());
        l.slots = vec![Denomination::Fifty];
        assert!(matches!(
            l.validate(),
            Err(LevelError::UnreachableSlot(Denomination::Fifty))
        ));
        l.slots = vec![];
        assert!(matches!(l.validate(), Err(LevelError::SlotCount(0))));
    }

    #[test]
    fn locks_need_keys() {
        let mut l = level();
        l.cells[0].coins.push(CoinSpec {
            kind: CoinKind::Locked,
            ..CoinSpec::normal(Denomination::One)
        });
        assert!(matches!(
            l.validate(),
            Err(LevelError::NotEnoughKeys { locks: 1, keys: 0 })
        ));
    }

    #[test]
    fn missing_level_is_an_error() {
        let set = LevelSet {
            levels: vec![level()],
        };
        assert!(set.get(0).is_ok());
        assert!(matches!(
            set.get(3),
            Err(LevelError::NotFound { index: 3, count: 1 })
        ));
        assert!(matches!(
            LevelSet::from_json(r#"{"levels": []}"#),
            Err(LevelError::EmptyPack)
        ));
    }

    #[test]
    fn builtin_pack_is_valid() {
        let set = LevelSet::builtin().unwrap();
        assert!(set.len() >= 3);
        for i in 0..set.len() {
            let level = set.get(i).unwrap();
            assert!(
                level.check_balance().is_ok(),
                "level {} leaves coins behind: {:?}",
                i,
                level.check_balance()
            );
        }
    }

    #[test]
    fn odd_halves_cannot_balance() {
        // One Half, one Ten behind the mystery, a nailed Five: Half has no partner.
        let l = level();
        assert!(matches!(
            l.check_balance(),
            Err(LevelError::Unbalanced {
                denomination: Denomination::Half,
                count: 1
            })
        ));

        let mut l = level();
        l.cells[0].coins[0] = CoinSpec::normal(Denomination::Five);
        l.cells[0].coins.push(CoinSpec::normal(Denomination::Five));
        l.slots = vec![Denomination::Ten];
        // Three Fives: two make a Ten, one is stranded.
        assert!(matches!(
            l.check_balance(),
            Err(LevelError::Unbalanced {
                denomination: Denomination::Five,
                count: 3
            })
        ));
        l.cells[0].coins.pop();
        assert!(l.check_balance().is_ok());
    }

    #[test]
    fn merged_coins_feed_the_next_rule() {
        let mut l = level();
        // 4 Halves -> 2 Ones, plus 3 Ones -> 5 Ones -> one Five for the slot.
        l.cells[0].coins = vec![CoinSpec::normal(Denomination::Half); 4];
        l.cells[1].coins = vec![CoinSpec::normal(Denomination::One); 3];
        assert!(l.check_balance().is_ok());
        l.cells[1].coins.pop();
        assert!(matches!(
            l.check_balance(),
            Err(LevelError::Unbalanced {
                denomination: Denomination::One,
                count: 4
            })
        ));
    }

    #[test]
    fn oversized_levels_are_rejected() {
        let mut l = level();
        l.tray_capacity = 12_000;
        assert!(matches!(
            l.validate(),
            Err(LevelError::CapacityTooLarge(12_000))
        ));
        l.tray_capacity = MAX_TRAY_CAPACITY;
        assert!(l.validate().is_ok());
        l.grid_width = MAX_GRID_SIZE + 1;
        assert!(matches!(l.validate(), Err(LevelError::BadGrid { .. })));
    }

    #[test]
    fn plain_coins_serialise_without_payloads() {
        let l = level();
        let plain = serde_json::to_value(&l.cells[0].coins[0]).unwrap();
        assert!(plain.get("unlock").is_none());
        assert!(plain.get("reveal").is_none());
        let nailed = serde_json::to_value(&l.cells[0].coins[1]).unwrap();
        assert_eq!(nailed["unlock"], serde_json::json!(["Down"]));
        let back: CoinSpec = serde_json::from_value(nailed).unwrap();
        assert_eq!(back, l.cells[0].coins[1]);
    }
}
