//! Stack tracker: which coins sit on which cell, bottom to top.

use crate::coin::{CoinArena, CoinId};
use crate::events::{Event, EventQueue};
use crate::grid::Cell;
use crate::unlock;
use std::collections::HashMap;

/// Result of taking a coin off its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Coins still left on the cell.
    Remaining(usize),
    /// Cell is now empty; neighbours were checked for nailed coins.
    Emptied,
    /// The coin was not on that cell. Nothing changed.
    Untracked,
}

#[derive(Debug, Clone, Default)]
pub struct StackTracker {
    stacks: HashMap<Cell, Vec<CoinId>>,
}

impl StackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a coin on top of `cell`. Returns false if it is already there.
    pub fn register(&mut self, coin: CoinId, cell: Cell) -> bool {
        let stack = self.stacks.entry(cell).or_default();
        if stack.contains(&coin) {
            return false;
        }
        stack.push(coin);
        true
    }

    /// Take `coin` off `cell`. When that empties the cell, `StackEmptied` is queued and
    /// neighbouring nailed coins are released before returning.
    pub fn remove(
        &mut self,
        coin: CoinId,
        cell: Cell,
        coins: &mut CoinArena,
        events: &mut EventQueue,
    ) -> Removal {
        let Some(stack) = self.stacks.get_mut(&cell) else {
            log::warn!("tried to remove {} from untracked cell {}", coin, cell);
            return Removal::Untracked;
        };
        let Some(pos) = stack.iter().position(|c| *c == coin) else {
            log::warn!("{} is not in the stack at {}", coin, cell);
            return Removal::Untracked;
        };
        stack.remove(pos);
        let remaining = stack.len();
        log::debug!("{} removed from {}; {} left", coin, cell, remaining);
        if remaining > 0 {
            return Removal::Remaining(remaining);
        }

        events.push(Event::StackEmptied { cell });
        unlock::release_neighbours(cell, self, coins, events);
        Removal::Emptied
    }

    pub fn stack_size(&self, cell: Cell) -> usize {
        self.stacks.get(&cell).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, cell: Cell) -> bool {
        self.stack_size(cell) == 0
    }

    /// Bottom-to-top coins on `cell`.
    pub fn coins_at(&self, cell: Cell) -> &[CoinId] {
        self.stacks.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn top(&self, cell: Cell) -> Option<CoinId> {
        self.coins_at(cell).last().copied()
    }

    /// Cells that currently hold at least one coin.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.stacks
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(c, _)| *c)
    }

    pub fn total(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }
}
