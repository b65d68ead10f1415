//! Target slots: up to three denominations the level wants delivered.

use crate::coin::Denomination;

pub const MAX_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub denomination: Denomination,
    /// Coins delivered so far.
    pub filled: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SlotBoard {
    slots: Vec<Slot>,
}

impl SlotBoard {
    /// Extra entries beyond `MAX_SLOTS` are ignored with a warning.
    pub fn new(denominations: impl IntoIterator<Item = Denomination>) -> Self {
        let mut slots = Vec::with_capacity(MAX_SLOTS);
        for denomination in denominations {
            if slots.len() == MAX_SLOTS {
                log::warn!("ignoring slot {}: at most {} slots", denomination, MAX_SLOTS);
                continue;
            }
            slots.push(Slot {
                denomination,
                filled: 0,
            });
        }
        Self { slots }
    }

    /// First slot that accepts `denomination`.
    pub fn matching(&self, denomination: Denomination) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.denomination == denomination)
    }

    pub fn record_delivery(&mut self, slot: usize) -> Option<&Slot> {
        let s = self.slots.get_mut(slot)?;
        s.filled += 1;
        Some(s)
    }

    pub fn get(&self, slot: usize) -> Option<&Slot> {
        self.slots.get(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_first_slot_and_caps_count() {
        let mut board = SlotBoard::new([
            Denomination::Ten,
            Denomination::One,
            Denomination::Ten,
            Denomination::Fifty,
        ]);
        assert_eq!(board.len(), MAX_SLOTS);
        assert_eq!(board.matching(Denomination::Ten), Some(0));
        assert_eq!(board.matching(Denomination::Fifty), None);
        assert_eq!(board.record_delivery(1).map(|s| s.filled), Some(1));
        assert!(board.record_delivery(7).is_none());
    }
}
