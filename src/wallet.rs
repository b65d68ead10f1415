//! Persist the player's wallet to disk (XDG config or ~/.config/coinstack).

use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "coinstack";
const FILENAME: &str = "wallet";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("failed to access wallet {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("wallet {} is corrupt: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },
}

/// `$XDG_CONFIG_HOME/coinstack`, falling back to `~/.config/coinstack`.
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join(APP_DIR)
}

pub fn default_path() -> PathBuf {
    config_dir().join(FILENAME)
}

/// Currency balance in cents, stored as a single number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    path: PathBuf,
    cents: u64,
}

impl Wallet {
    /// Empty wallet that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cents: 0,
        }
    }

    /// Load from `path`. A missing or unreadable file gives an empty wallet.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut wallet = Self::new(path);
        match read_cents(&wallet.path) {
            Ok(Some(cents)) => wallet.cents = cents,
            Ok(None) => log::info!("no wallet at {}, starting empty", wallet.path.display()),
            Err(e) => log::warn!("{}; starting empty", e),
        }
        wallet
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn add(&mut self, cents: u64) {
        self.cents = self.cents.saturating_add(cents);
    }

    /// Take `cents` out. Refuses (and changes nothing) if the balance is too low.
    pub fn spend(&mut self, cents: u64) -> bool {
        match self.cents.checked_sub(cents) {
            Some(left) => {
                self.cents = left;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.cents = 0;
    }

    /// Write to disk, creating the config directory if needed.
    pub fn save(&self) -> Result<(), WalletError> {
        let io_err = |source: io::Error| WalletError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, format!("{}\n", self.cents)).map_err(io_err)
    }
}

/// `Ok(None)` when the file does not exist.
fn read_cents(path: &Path) -> Result<Option<u64>, WalletError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(WalletError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    content
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|source| WalletError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
