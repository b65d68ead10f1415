//! Nailed coins: deciding when a vacated neighbour releases them.
//!
//! A coin nailed `Down` comes free when the cell below it is vacated, so for an emptied
//! cell E we look at the cell above E for coins carrying `Down`, and so on for the
//! other three sides.

use crate::coin::{Coin, CoinArena, CoinId, Direction, Variant};
use crate::events::{Event, EventQueue};
use crate::grid::{Cell, GridIndex};
use crate::stacks::StackTracker;

/// Release every nailed coin next to the freshly emptied `emptied` cell whose
/// directions point back at it. Every coin in a neighbouring stack is checked, not just
/// the top one. Returns the coins that were released.
pub fn release_neighbours(
    emptied: Cell,
    stacks: &StackTracker,
    coins: &mut CoinArena,
    events: &mut EventQueue,
) -> Vec<CoinId> {
    let mut released = Vec::new();
    for side in Direction::ALL {
        let neighbour = emptied.step(side);
        let needed = side.opposite();
        for &id in stacks.coins_at(neighbour) {
            let Some(coin) = coins.get_mut(id) else {
                log::warn!("stack at {} holds unknown coin {}", neighbour, id);
                continue;
            };
            let points_back = match coin.variant {
                Variant::Nailed { directions } => directions.contains(needed),
                Variant::Normal | Variant::Mystery { .. } | Variant::Locked | Variant::Key => {
                    false
                }
            };
            if points_back && release(coin, neighbour, events) {
                released.push(id);
            }
        }
    }
    released
}

/// Nailed -> Normal with one `CoinUnlocked`. Calling it again on the same coin is a no-op.
pub fn release(coin: &mut Coin, cell: Cell, events: &mut EventQueue) -> bool {
    if !coin.pull_nail() {
        return false;
    }
    log::info!("nailed coin {} at {} released", coin.id, cell);
    events.push(Event::CoinUnlocked { coin: coin.id, cell });
    true
}

/// Out of bounds, disabled, and empty cells never hold a nail in place.
pub fn is_clear(cell: Cell, grid: &GridIndex, stacks: &StackTracker) -> bool {
    !grid.is_enabled(cell) || stacks.is_empty(cell)
}

/// True when `coin`, sitting on `cell`, is nailed and at least one of its directions
/// leads to a clear cell.
pub fn can_release(coin: &Coin, cell: Cell, grid: &GridIndex, stacks: &StackTracker) -> bool {
    match coin.variant {
        Variant::Nailed { directions } => directions
            .iter()
            .any(|dir| is_clear(cell.step(dir), grid, stacks)),
        Variant::Normal | Variant::Mystery { .. } | Variant::Locked | Variant::Key => false,
    }
}

/// Release every nailed coin on the board that is already free to go. Used when a level
/// starts so that nails facing the edge or an empty cell do not wait for a removal.
pub fn release_ready(
    grid: &GridIndex,
    stacks: &StackTracker,
    coins: &mut CoinArena,
    events: &mut EventQueue,
) -> Vec<CoinId> {
    let mut cells: Vec<Cell> = stacks.occupied_cells().collect();
    cells.sort();
    let mut released = Vec::new();
    for cell in cells {
        for &id in stacks.coins_at(cell) {
            let ready = coins
                .get(id)
                .is_some_and(|c| can_release(c, cell, grid, stacks));
            if !ready {
                continue;
            }
            if let Some(coin) = coins.get_mut(id) {
                if release(coin, cell, events) {
                    released.push(id);
                }
            }
        }
    }
    released
}
