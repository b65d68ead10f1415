//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use coinstack::Denomination;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Coin colours by denomination tier, Half first.
    pub coins: [Color; 8],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (wallet, counters).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Pending tray coins, hints.
    pub inactive_fg: Color,
    /// Cursor and flashes.
    pub hi_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults: hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            coins: [
                Color::Rgb(0xAB, 0xB2, 0xBF), // main_fg / silver
                Color::Rgb(0x98, 0xC3, 0x79), // mem_box / green
                Color::Rgb(0x56, 0xB6, 0xC2), // hi_fg / cyan
                Color::Rgb(0x61, 0xAF, 0xEF), // cpu_box / blue
                Color::Rgb(0xC6, 0x78, 0xDD), // net_box / magenta
                Color::Rgb(0xE0, 0x6C, 0x75), // cpu_end / red
                Color::Rgb(0xD1, 0x9A, 0x66), // temp_mid / orange
                Color::Rgb(0xE5, 0xC0, 0x7B), // title / gold
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            hi_fg: Color::Rgb(0x56, 0xB6, 0xC2),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                log::warn!("theme {} not found, using defaults", p.display());
                return Ok(Self::default_for_palette(palette));
            }
            None => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override coin colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.coins = [
                    Color::Rgb(0xFF, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0x88, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                ];
            }
            crate::Palette::Colorblind => {
                // Tol bright and vibrant schemes.
                self.coins = [
                    Color::Rgb(0xBB, 0xBB, 0xBB),
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xEE, 0x33, 0x77),
                    Color::Rgb(0x33, 0xBB, 0xEE),
                    Color::Rgb(0xCC, 0x33, 0x11),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let d = Self::onedark_default();
        Self {
            coins: [
                get("main_fg").unwrap_or(d.coins[0]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(d.coins[1]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(d.coins[2]),
                get("cpu_box").unwrap_or(d.coins[3]),
                get("net_box").unwrap_or(d.coins[4]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(d.coins[5]),
                get("temp_mid").unwrap_or(d.coins[6]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(d.coins[7]),
            ],
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            hi_fg: get("hi_fg").unwrap_or(d.hi_fg),
        }
    }

    #[inline]
    pub fn coin_color(&self, denomination: Denomination) -> Color {
        self.coins[denomination.tier() as usize % self.coins.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
        assert!(parse_hex("#ÿÿ").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_coin_colours() {
        let map = parse_theme_file(
            "# comment\ntheme[cpu_box]=\"#010203\"\ntheme[title]='#FFF'\ntheme[bogus]=\"\"\n",
        );
        let t = Theme::from_map(&map);
        assert_eq!(t.coin_color(Denomination::Ten), Color::Rgb(1, 2, 3));
        assert_eq!(t.coin_color(Denomination::OneThousand), Color::Rgb(255, 255, 255));
        assert_eq!(t.bg, Theme::onedark_default().bg);
        assert!(!map.contains_key("bogus"));
    }

    #[test]
    fn test_palette_replaces_coins_only() {
        let mut t = Theme::onedark_default();
        let bg = t.bg;
        t.apply_palette(crate::Palette::HighContrast);
        assert_eq!(t.coin_color(Denomination::One), Color::Rgb(0, 255, 0));
        assert_eq!(t.bg, bg);
    }
}
