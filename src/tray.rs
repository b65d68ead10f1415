//! Tray sequencer: the ordered, capacity-bounded row of coins waiting to merge.
//!
//! A coin joins the sequence the moment it is requested (as `Pending`, still flying) and
//! keeps that place when it lands (`Committed`). Positions are handed out at request
//! time, so rapid taps end up in request order however their flights finish.

use crate::coin::{CoinId, Denomination};
use crate::merge::MergeTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a new coin goes relative to coins already in the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsertPolicy {
    /// Right after the last coin of the same denomination.
    #[default]
    GroupSameType,
    /// Always at the end.
    AppendOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Assigned a position, still flying in.
    Pending,
    Committed,
}

/// Fallback position when the group policy finds no coin of the same denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertHint {
    End,
    At(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrayEntry {
    pub coin: CoinId,
    pub denomination: Denomination,
    pub phase: Phase,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrayError {
    #[error("tray is at capacity ({0} coins)")]
    AtCapacity(usize),
    #[error("coin {0} is already in the tray")]
    AlreadyQueued(CoinId),
}

#[derive(Debug, Clone)]
pub struct TraySequencer {
    entries: Vec<TrayEntry>,
    capacity: usize,
    policy: InsertPolicy,
}

impl TraySequencer {
    pub fn new(capacity: usize, policy: InsertPolicy) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    /// Committed plus pending.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn committed_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.phase == Phase::Committed)
            .count()
    }

    pub fn pending_len(&self) -> usize {
        self.len() - self.committed_len()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Position a coin of `denomination` would be given right now.
    pub fn insert_index(&self, denomination: Denomination, hint: InsertHint) -> usize {
        let end = self.entries.len();
        match self.policy {
            InsertPolicy::AppendOnly => end,
            InsertPolicy::GroupSameType => {
                match self
                    .entries
                    .iter()
                    .rposition(|e| e.denomination == denomination)
                {
                    Some(last) => last + 1,
                    None => match hint {
                        InsertHint::End => end,
                        InsertHint::At(i) => i.min(end),
                    },
                }
            }
        }
    }

    /// Reserve a position for a coin that is about to fly in.
    pub fn request_insert(
        &mut self,
        coin: CoinId,
        denomination: Denomination,
    ) -> Result<usize, TrayError> {
        self.request_insert_with(coin, denomination, InsertHint::End)
    }

    pub fn request_insert_with(
        &mut self,
        coin: CoinId,
        denomination: Denomination,
        hint: InsertHint,
    ) -> Result<usize, TrayError> {
        if self.contains(coin) {
            return Err(TrayError::AlreadyQueued(coin));
        }
        if self.entries.len() >= self.capacity {
            return Err(TrayError::AtCapacity(self.capacity));
        }
        let index = self.insert_index(denomination, hint);
        self.entries.insert(
            index,
            TrayEntry {
                coin,
                denomination,
                phase: Phase::Pending,
            },
        );
        log::debug!("{} ({}) pending at tray index {}", coin, denomination, index);
        Ok(index)
    }

    /// The coin landed. Returns its position, or `None` if it is no longer pending
    /// (removed or merged away while flying, or already landed).
    pub fn confirm_insert(&mut self, coin: CoinId) -> Option<usize> {
        let index = self.index_of(coin)?;
        let entry = &mut self.entries[index];
        if entry.phase == Phase::Committed {
            log::debug!("{} already settled at {}", coin, index);
            return None;
        }
        entry.phase = Phase::Committed;
        Some(index)
    }

    /// Drop a coin from the tray, pending or committed. `None` if it was not there.
    pub fn remove(&mut self, coin: CoinId) -> Option<Phase> {
        let index = self.index_of(coin)?;
        Some(self.entries.remove(index).phase)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, coin: CoinId) -> bool {
        self.index_of(coin).is_some()
    }

    /// Position in the full sequence (pending coins hold their place).
    pub fn index_of(&self, coin: CoinId) -> Option<usize> {
        self.entries.iter().position(|e| e.coin == coin)
    }

    /// Position among committed coins only.
    pub fn committed_index_of(&self, coin: CoinId) -> Option<usize> {
        self.committed().position(|e| e.coin == coin)
    }

    pub fn phase_of(&self, coin: CoinId) -> Option<Phase> {
        self.entries.iter().find(|e| e.coin == coin).map(|e| e.phase)
    }

    /// Coins of `denomination`, pending included.
    pub fn count(&self, denomination: Denomination) -> usize {
        self.entries
            .iter()
            .filter(|e| e.denomination == denomination)
            .count()
    }

    pub fn committed(&self) -> impl Iterator<Item = &TrayEntry> {
        self.entries.iter().filter(|e| e.phase == Phase::Committed)
    }

    /// Every entry with its position, left to right.
    pub fn layout(&self) -> impl Iterator<Item = (usize, &TrayEntry)> {
        self.entries.iter().enumerate()
    }

    /// Full and no merge rule can bring any denomination down. Pending coins count
    /// towards both the fill level and the merge check.
    pub fn is_full(&self, rules: &MergeTable) -> bool {
        self.entries.len() >= self.capacity && !rules.is_available(self)
    }
}
