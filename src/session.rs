//! Session controller: owns one level in play and turns taps and animation callbacks
//! into state changes plus queued events.

use crate::coin::{Coin, CoinArena, CoinId, Denomination, Place, Variant};
use crate::events::{Event, EventQueue, TapRejection};
use crate::grid::{Cell, GridIndex};
use crate::level::{LevelData, LevelError, MAX_TRAY_CAPACITY};
use crate::merge::{self, MergeTable};
use crate::slots::SlotBoard;
use crate::stacks::StackTracker;
use crate::tray::{InsertPolicy, TraySequencer};
use crate::unlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub capacity: usize,
    pub policy: InsertPolicy,
}

impl SessionOptions {
    pub fn from_level(level: &LevelData) -> Self {
        Self {
            capacity: level.tray_capacity,
            policy: if level.group_same_types {
                InsertPolicy::GroupSameType
            } else {
                InsertPolicy::AppendOnly
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Cleared,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Flying to slot `slot`; call `arrive` when it lands.
    ToSlot { slot: usize },
    /// Reserved tray position `index`; call `settle` when it lands.
    ToTray { index: usize },
    Rejected(TapRejection),
}

enum Route {
    Slot(usize),
    Tray(usize),
}

#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    coins: CoinArena,
    grid: GridIndex,
    stacks: StackTracker,
    tray: TraySequencer,
    merges: MergeTable,
    slots: SlotBoard,
    events: EventQueue,
    outcome: Outcome,
    bonus_cents: u64,
    earned_cents: u64,
}

impl Session {
    /// Validate `level` and lay out its coins. Nails that are already free (facing an
    /// edge, a disabled cell, or an empty cell) are released straight away.
    pub fn new(level: &LevelData, options: SessionOptions) -> Result<Self, LevelError> {
        level.validate()?;
        if options.capacity == 0 {
            return Err(LevelError::ZeroCapacity);
        }
        if options.capacity > MAX_TRAY_CAPACITY {
            return Err(LevelError::CapacityTooLarge(options.capacity));
        }

        let grid = GridIndex::new(
            level.grid_width,
            level.grid_height,
            (level.cell_spacing, level.cell_spacing),
            level.grid_offset,
            level.disabled_cells.iter().copied(),
        );
        let mut coins = CoinArena::new();
        let mut stacks = StackTracker::new();
        for entry in &level.cells {
            for (height, spec) in entry.coins.iter().enumerate() {
                let position = grid.to_world(entry.cell, height);
                let cell = grid.to_cell(position);
                let id = coins.spawn(
                    spec.denomination,
                    spec.variant(entry.cell)?,
                    position,
                    Place::Stack(cell),
                );
                stacks.register(id, cell);
            }
        }

        let mut session = Self {
            name: level.name.clone(),
            coins,
            grid,
            stacks,
            tray: TraySequencer::new(options.capacity, options.policy),
            merges: level.merge_rules.clone(),
            slots: SlotBoard::new(level.slots.iter().copied()),
            events: EventQueue::new(),
            outcome: Outcome::Playing,
            bonus_cents: level.bonus_cents,
            earned_cents: 0,
        };
        log::info!(
            "level '{}' started: {} coins, {} slots, tray {} ({:?})",
            session.name,
            session.coins.len(),
            session.slots.len(),
            options.capacity,
            options.policy
        );
        unlock::release_ready(
            &session.grid,
            &session.stacks,
            &mut session.coins,
            &mut session.events,
        );
        session.check_dead_end();
        Ok(session)
    }

    /// Player tapped `id`. Either it leaves the grid (to a slot or the tray) or nothing
    /// changes and a `TapRejected` event says why.
    pub fn tap(&mut self, id: CoinId) -> TapOutcome {
        let (cell, denomination) = match self.check_tap(id) {
            Ok(found) => found,
            Err(reason) => return self.reject(id, reason),
        };

        // Claim the destination before touching the grid so a refused tap changes nothing.
        let route = match self.slots.matching(denomination) {
            Some(slot) => Route::Slot(slot),
            None => match self.tray.request_insert(id, denomination) {
                Ok(index) => Route::Tray(index),
                Err(e) => {
                    log::debug!("tap on {} refused: {}", id, e);
                    return self.reject(id, TapRejection::TrayBusy);
                }
            },
        };

        let mut is_key = false;
        if let Some(coin) = self.coins.get_mut(id) {
            if let Some(revealed) = coin.reveal() {
                self.events.push(Event::CoinRevealed {
                    coin: id,
                    denomination: revealed,
                });
            }
            is_key = coin.variant == Variant::Key;
        }
        self.stacks
            .remove(id, cell, &mut self.coins, &mut self.events);
        if is_key {
            self.open_oldest_lock(id);
        }

        let outcome = match route {
            Route::Slot(slot) => {
                self.set_place(id, Place::SlotFlight(slot));
                self.events.push(Event::CoinToSlot { coin: id, slot });
                TapOutcome::ToSlot { slot }
            }
            Route::Tray(index) => {
                self.set_place(id, Place::Tray);
                self.events.push(Event::CoinToTray { coin: id, index });
                if self.tray.is_full(&self.merges) {
                    self.fail_tray_full();
                }
                TapOutcome::ToTray { index }
            }
        };
        log::debug!("{} ({}) from {}: {:?}", id, denomination, cell, outcome);
        self.check_dead_end();
        outcome
    }

    /// A coin finished flying into the tray. Runs merges to a fixpoint. Returns false for
    /// coins that are no longer pending (merged, removed, or already settled).
    pub fn settle(&mut self, id: CoinId) -> bool {
        if self.outcome != Outcome::Playing {
            log::debug!("settle for {} after the level ended", id);
            return false;
        }
        let Some(index) = self.tray.confirm_insert(id) else {
            log::debug!("stale settle for {}", id);
            return false;
        };
        self.events.push(Event::CoinSettled { coin: id, index });
        merge::run_to_fixpoint(
            &self.merges,
            &mut self.tray,
            &mut self.coins,
            &self.slots,
            &mut self.events,
        );
        if self.tray.is_full(&self.merges) {
            self.fail_tray_full();
        }
        self.check_dead_end();
        true
    }

    /// A coin reached its slot. Returns false if it was not flying to one.
    pub fn arrive(&mut self, id: CoinId) -> bool {
        let slot = match self.coins.get(id).map(|c| c.place) {
            Some(Place::SlotFlight(slot)) => slot,
            Some(Place::Stack(_) | Place::Tray) | None => {
                log::debug!("stale arrival for {}", id);
                return false;
            }
        };
        let Some(coin) = self.coins.remove(id) else {
            return false;
        };
        let cents = coin.value_cents();
        self.slots.record_delivery(slot);
        self.earned_cents += cents;
        self.events.push(Event::SlotFilled {
            coin: id,
            slot,
            cents,
        });

        if self.coins.is_empty() && self.outcome == Outcome::Playing {
            self.outcome = Outcome::Cleared;
            log::info!(
                "level '{}' cleared: earned {} + bonus {} cents",
                self.name,
                self.earned_cents,
                self.bonus_cents
            );
            self.events.push(Event::LevelCleared {
                bonus_cents: self.bonus_cents,
            });
        } else {
            self.check_dead_end();
        }
        true
    }

    /// Hand queued events to the presentation layer, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coin(&self, id: CoinId) -> Option<&Coin> {
        self.coins.get(id)
    }

    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.coins.iter()
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn stacks(&self) -> &StackTracker {
        &self.stacks
    }

    pub fn tray(&self) -> &TraySequencer {
        &self.tray
    }

    pub fn slots(&self) -> &SlotBoard {
        &self.slots
    }

    pub fn merge_table(&self) -> &MergeTable {
        &self.merges
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn top_coin(&self, cell: Cell) -> Option<&Coin> {
        self.stacks.top(cell).and_then(|id| self.coins.get(id))
    }

    /// Would a tap on `id` get past the grid checks (ignoring tray room)?
    pub fn is_tappable(&self, id: CoinId) -> bool {
        self.check_tap(id).is_ok()
    }

    /// Coins not yet delivered: on the grid, in the tray, or flying.
    pub fn coins_left(&self) -> usize {
        self.coins.len()
    }

    pub fn earned_cents(&self) -> u64 {
        self.earned_cents
    }

    pub fn bonus_cents(&self) -> u64 {
        self.bonus_cents
    }

    fn check_tap(&self, id: CoinId) -> Result<(Cell, Denomination), TapRejection> {
        if self.outcome != Outcome::Playing {
            return Err(TapRejection::NotPlaying);
        }
        let coin = self.coins.get(id).ok_or(TapRejection::UnknownCoin)?;
        let cell = match coin.place {
            Place::Stack(cell) => cell,
            Place::Tray | Place::SlotFlight(_) => return Err(TapRejection::NotOnGrid),
        };
        if self.stacks.top(cell) != Some(id) {
            return Err(TapRejection::Covered);
        }
        match coin.variant {
            Variant::Nailed { .. } => Err(TapRejection::Nailed),
            Variant::Locked => Err(TapRejection::Locked),
            Variant::Normal | Variant::Mystery { .. } | Variant::Key => {
                Ok((cell, coin.true_denomination()))
            }
        }
    }

    fn reject(&mut self, id: CoinId, reason: TapRejection) -> TapOutcome {
        log::debug!("tap on {} rejected: {:?}", id, reason);
        self.events.push(Event::TapRejected { coin: id, reason });
        TapOutcome::Rejected(reason)
    }

    fn set_place(&mut self, id: CoinId, place: Place) {
        if let Some(coin) = self.coins.get_mut(id) {
            coin.place = place;
        }
    }

    /// Keys open locks oldest first.
    fn open_oldest_lock(&mut self, key: CoinId) {
        let Some(locked) = self
            .coins
            .iter()
            .find(|c| c.variant == Variant::Locked)
            .map(|c| c.id)
        else {
            log::debug!("key {} used with no locked coins left", key);
            return;
        };
        if let Some(coin) = self.coins.get_mut(locked) {
            coin.open_lock();
        }
        log::info!("key {} opened {}", key, locked);
        self.events.push(Event::LockOpened { coin: locked, key });
    }

    fn fail_tray_full(&mut self) {
        if self.outcome != Outcome::Playing {
            return;
        }
        log::info!("level '{}' failed: tray full", self.name);
        self.outcome = Outcome::Failed;
        self.events.push(Event::TrayFull);
        self.events.push(Event::LevelFailed);
    }

    /// Nothing in motion and nothing left to tap, with coins still undelivered: the level
    /// can never be cleared.
    fn check_dead_end(&mut self) {
        if self.outcome != Outcome::Playing || self.coins.is_empty() {
            return;
        }
        let in_motion = self.tray.pending_len() > 0
            || self
                .coins
                .iter()
                .any(|c| matches!(c.place, Place::SlotFlight(_)));
        if in_motion {
            return;
        }
        let can_tap = self
            .stacks
            .occupied_cells()
            .filter_map(|cell| self.stacks.top(cell))
            .any(|id| self.check_tap(id).is_ok());
        if can_tap {
            return;
        }
        log::info!("level '{}' failed: no moves left", self.name);
        self.outcome = Outcome::Failed;
        self.events.push(Event::LevelFailed);
    }
}
