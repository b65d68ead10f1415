//! Coinstack: a coin stacking and merging puzzle.
//!
//! The library is the game model with no terminal code: coins sit in stacks on a grid,
//! tapping the top coin sends it to a matching slot or to the tray, and same-denomination
//! coins in the tray merge upward. Every state change is reported through [`Event`]s that
//! a front-end drains after each call into [`Session`].

pub mod coin;
pub mod events;
pub mod grid;
pub mod level;
pub mod merge;
pub mod money;
pub mod session;
pub mod slots;
pub mod stacks;
pub mod tray;
pub mod unlock;
pub mod wallet;

pub use coin::{Coin, CoinId, Denomination, Direction, Directions, Place, Variant};
pub use events::{Event, TapRejection};
pub use grid::{Cell, GridIndex};
pub use level::{LevelData, LevelError, LevelSet};
pub use merge::{MergeRule, MergeTable};
pub use session::{Outcome, Session, SessionOptions, TapOutcome};
pub use tray::{InsertPolicy, Phase, TraySequencer};
pub use wallet::{Wallet, WalletError};
