//! Coinstack: stack, tap and merge coins in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use app::App;
use clap::{Parser, ValueEnum};
use coinstack::level::MAX_TRAY_CAPACITY;
use coinstack::{LevelSet, Wallet, wallet};
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect play (tray overrides, flight timings).
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Overrides the level's tray capacity.
    pub capacity: Option<usize>,
    pub append_only: bool,
    pub no_animation: bool,
    pub settle_ms: u64,
    pub flight_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let levels = match &args.levels {
        Some(path) => LevelSet::load(path)?,
        None => LevelSet::builtin().context("builtin level pack is broken")?,
    };
    if args.level == 0 || args.level > levels.len() {
        bail!("--level must be between 1 and {}", levels.len());
    }
    check_capacity(args.capacity)?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut wallet = Wallet::load(args.wallet.clone().unwrap_or_else(wallet::default_path));
    if args.reset_wallet {
        log::info!("resetting wallet at {}", wallet.path().display());
        wallet.reset();
        wallet.save()?;
    }

    let config = GameConfig {
        capacity: args.capacity,
        append_only: args.append_only,
        no_animation: args.no_animation,
        settle_ms: args.settle_ms,
        flight_ms: args.flight_ms,
    };
    let mut app = App::new(levels, args.level - 1, config, theme, wallet)?;
    app.run()?;
    Ok(())
}

fn check_capacity(capacity: Option<usize>) -> Result<()> {
    match capacity {
        Some(n) if n == 0 || n > MAX_TRAY_CAPACITY => {
            bail!("--capacity must be between 1 and {MAX_TRAY_CAPACITY}, got {n}")
        }
        _ => Ok(()),
    }
}

/// Log to a file; the terminal belongs to the UI. `RUST_LOG` overrides the `info` default.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| wallet::config_dir().join("coinstack.log"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Coin stacking and merging puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "coinstack",
    version,
    about = "Coin stacking puzzle in the terminal. Tap coins into slots or the tray; matching coins merge upward.",
    long_about = "Coinstack is a terminal puzzle about stacks of coins.\n\n\
        Move the cursor over a stack and tap its top coin. Coins matching a slot fly to it \
        and pay out; the rest land in the tray, where enough coins of one denomination merge \
        into the next one up. Clear the board to win; fill the tray and the level is lost.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter/Space  Tap\n  \
        P  Pause   R  Restart   N  Next level (after a clear)   Q / Esc  Quit\n\n\
        Use --levels to play a JSON level pack and --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level to start on (1-based).
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: usize,

    /// JSON level pack to play instead of the builtin levels.
    #[arg(long, value_name = "FILE")]
    pub levels: Option<PathBuf>,

    /// Override every level's tray capacity.
    #[arg(short, long, value_name = "N")]
    pub capacity: Option<usize>,

    /// Always append to the tray instead of grouping same-denomination coins.
    #[arg(long)]
    pub append_only: bool,

    /// Coins land instantly (no flight delay, no flashes).
    #[arg(long)]
    pub no_animation: bool,

    /// Time for a tapped coin to land in the tray.
    #[arg(long, default_value = "250", value_name = "MS")]
    pub settle_ms: u64,

    /// Time for a coin to reach its slot.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub flight_ms: u64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Wallet file. Defaults to ~/.config/coinstack/wallet.
    #[arg(long, value_name = "FILE")]
    pub wallet: Option<PathBuf>,

    /// Empty the wallet before playing.
    #[arg(long)]
    pub reset_wallet: bool,

    /// Log file. Defaults to ~/.config/coinstack/coinstack.log.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_on_first_level() {
        let args = Args::try_parse_from(["coinstack"]).unwrap();
        assert_eq!(args.level, 1);
        assert_eq!(args.settle_ms, 250);
        assert!(args.capacity.is_none());
        assert_eq!(args.palette, Palette::Normal);
    }

    #[test]
    fn palette_aliases_parse() {
        let args = Args::try_parse_from(["coinstack", "--palette", "colourblind", "-c", "5"]).unwrap();
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.capacity, Some(5));
    }

    #[test]
    fn capacity_override_is_bounded() {
        assert!(check_capacity(None).is_ok());
        assert!(check_capacity(Some(1)).is_ok());
        assert!(check_capacity(Some(MAX_TRAY_CAPACITY)).is_ok());
        assert!(check_capacity(Some(0)).is_err());
        assert!(check_capacity(Some(12_000)).is_err());
    }
}
