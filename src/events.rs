//! Outbound notifications, queued in emission order and drained by the presentation layer.

use crate::coin::{CoinId, Denomination};
use crate::grid::Cell;
use std::collections::VecDeque;

/// Why a tap did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapRejection {
    /// Session already cleared or failed.
    NotPlaying,
    UnknownCoin,
    /// Coin is in the tray or on its way to a slot.
    NotOnGrid,
    /// Another coin sits on top of it.
    Covered,
    Nailed,
    Locked,
    /// Tray holds `capacity` coins (some still landing) and the coin matches no slot.
    TrayBusy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StackEmptied {
        cell: Cell,
    },
    CoinUnlocked {
        coin: CoinId,
        cell: Cell,
    },
    CoinRevealed {
        coin: CoinId,
        denomination: Denomination,
    },
    LockOpened {
        coin: CoinId,
        key: CoinId,
    },
    /// Coin left its container and is flying to slot `slot`.
    CoinToSlot {
        coin: CoinId,
        slot: usize,
    },
    /// Coin was assigned tray position `index` and is flying there.
    CoinToTray {
        coin: CoinId,
        index: usize,
    },
    CoinSettled {
        coin: CoinId,
        index: usize,
    },
    MergeStarted {
        inputs: Vec<CoinId>,
        output: Denomination,
        merged: CoinId,
    },
    SlotFilled {
        coin: CoinId,
        slot: usize,
        cents: u64,
    },
    TapRejected {
        coin: CoinId,
        reason: TapRejection,
    },
    TrayFull,
    LevelCleared {
        bonus_cents: u64,
    },
    LevelFailed,
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        log::debug!("event: {:?}", event);
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_emission_order() {
        let mut q = EventQueue::new();
        q.push(Event::StackEmptied {
            cell: Cell::new(0, 0),
        });
        q.push(Event::TrayFull);
        q.push(Event::LevelFailed);
        assert_eq!(q.len(), 3);
        let drained: Vec<_> = q.drain().collect();
        assert_eq!(drained[1], Event::TrayFull);
        assert_eq!(drained[2], Event::LevelFailed);
        assert!(q.is_empty());
    }
}
