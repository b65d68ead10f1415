//! Coins: denominations, variants, unlock directions, and the arena that owns them.

use crate::grid::{Cell, WorldPos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coin denominations, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Denomination {
    Half,
    One,
    Five,
    Ten,
    Fifty,
    OneHundred,
    FiveHundred,
    OneThousand,
}

impl Denomination {
    pub const ALL: [Self; 8] = [
        Self::Half,
        Self::One,
        Self::Five,
        Self::Ten,
        Self::Fifty,
        Self::OneHundred,
        Self::FiveHundred,
        Self::OneThousand,
    ];

    /// Face value in cents.
    pub fn cents(self) -> u64 {
        match self {
            Self::Half => 50,
            Self::One => 100,
            Self::Five => 500,
            Self::Ten => 1_000,
            Self::Fifty => 5_000,
            Self::OneHundred => 10_000,
            Self::FiveHundred => 50_000,
            Self::OneThousand => 100_000,
        }
    }

    /// Tier 0..8; also the colour index used by the theme.
    pub fn tier(self) -> u8 {
        self as u8
    }

    /// Short face label drawn on the coin.
    pub fn label(self) -> &'static str {
        match self {
            Self::Half => "0.5",
            Self::One => "1",
            Self::Five => "5",
            Self::Ten => "10",
            Self::Fifty => "50",
            Self::OneHundred => "100",
            Self::FiveHundred => "500",
            Self::OneThousand => "1k",
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One cardinal direction on the grid. `Up` is +z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// (dx, dz) step for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Up => 1 << 0,
            Self::Down => 1 << 1,
            Self::Left => 1 << 2,
            Self::Right => 1 << 3,
        }
    }
}

/// Set of directions a nailed coin can be released from.
///
/// Serialized as a list of direction names, e.g. `["Down", "Left"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Direction>", into = "Vec<Direction>")]
pub struct Directions(u8);

impl Directions {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    pub fn only(dir: Direction) -> Self {
        Self(dir.bit())
    }

    pub fn with(self, dir: Direction) -> Self {
        Self(self.0 | dir.bit())
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl From<Direction> for Directions {
    fn from(dir: Direction) -> Self {
        Self::only(dir)
    }
}

impl From<Vec<Direction>> for Directions {
    fn from(dirs: Vec<Direction>) -> Self {
        dirs.into_iter().fold(Self::NONE, Self::with)
    }
}

impl From<Directions> for Vec<Direction> {
    fn from(dirs: Directions) -> Self {
        dirs.iter().collect()
    }
}

/// What kind of coin this is. Only `Normal` and `Key` coins can be tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Normal,
    /// Shows a question mark until tapped, then becomes a Normal coin of `reveal`.
    Mystery { reveal: Denomination },
    /// Stuck until a neighbouring cell in one of `directions` is vacated.
    Nailed { directions: Directions },
    /// Stuck until a key coin leaves the grid.
    Locked,
    Key,
}

impl Variant {
    pub fn is_movable(self) -> bool {
        match self {
            Self::Normal | Self::Mystery { .. } | Self::Key => true,
            Self::Nailed { .. } | Self::Locked => false,
        }
    }
}

/// Stable handle for a coin for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoinId(pub u32);

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which container currently owns a coin. A coin is in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Stack(Cell),
    Tray,
    /// Flying to the slot with this index.
    SlotFlight(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub id: CoinId,
    pub denomination: Denomination,
    pub variant: Variant,
    pub position: WorldPos,
    pub place: Place,
}

impl Coin {
    pub fn value_cents(&self) -> u64 {
        self.denomination.cents()
    }

    /// Denomination the coin will have once any mystery is revealed.
    pub fn true_denomination(&self) -> Denomination {
        match self.variant {
            Variant::Mystery { reveal } => reveal,
            _ => self.denomination,
        }
    }

    pub fn is_nailed(&self) -> bool {
        matches!(self.variant, Variant::Nailed { .. })
    }

    /// Nailed -> Normal. Returns false (and changes nothing) for any other variant.
    pub fn pull_nail(&mut self) -> bool {
        match self.variant {
            Variant::Nailed { .. } => {
                self.variant = Variant::Normal;
                true
            }
            Variant::Normal | Variant::Mystery { .. } | Variant::Locked | Variant::Key => false,
        }
    }

    /// Mystery -> Normal, materialising the hidden denomination.
    pub fn reveal(&mut self) -> Option<Denomination> {
        match self.variant {
            Variant::Mystery { reveal } => {
                self.denomination = reveal;
                self.variant = Variant::Normal;
                Some(reveal)
            }
            Variant::Normal | Variant::Nailed { .. } | Variant::Locked | Variant::Key => None,
        }
    }

    /// Locked -> Normal.
    pub fn open_lock(&mut self) -> bool {
        match self.variant {
            Variant::Locked => {
                self.variant = Variant::Normal;
                true
            }
            Variant::Normal | Variant::Mystery { .. } | Variant::Nailed { .. } | Variant::Key => {
                false
            }
        }
    }
}

/// Owns every live coin of a session, keyed by id in creation order.
#[derive(Debug, Clone, Default)]
pub struct CoinArena {
    coins: BTreeMap<CoinId, Coin>,
    next_id: u32,
}

impl CoinArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &mut self,
        denomination: Denomination,
        variant: Variant,
        position: WorldPos,
        place: Place,
    ) -> CoinId {
        let id = CoinId(self.next_id);
        self.next_id += 1;
        self.coins.insert(
            id,
            Coin {
                id,
                denomination,
                variant,
                position,
                place,
            },
        );
        id
    }

    pub fn get(&self, id: CoinId) -> Option<&Coin> {
        self.coins.get(&id)
    }

    pub fn get_mut(&mut self, id: CoinId) -> Option<&mut Coin> {
        self.coins.get_mut(&id)
    }

    pub fn remove(&mut self, id: CoinId) -> Option<Coin> {
        self.coins.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.coins.values()
    }
}
