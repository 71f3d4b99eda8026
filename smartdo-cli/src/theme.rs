//! Light/dark preference, kept in its own one-word file.

use anyhow::{Context, Result};
use ratatui::style::Color;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::state::theme_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Anything other than `dark` reads as light.
    pub fn parse(s: &str) -> Self {
        if s.trim() == "dark" { Theme::Dark } else { Theme::Light }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                done: Color::Green,
            },
            Theme::Dark => Palette {
                bg: Color::Black,
                fg: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                done: Color::LightGreen,
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub done: Color,
}

pub fn read_theme_at(path: &Path) -> Result<Theme> {
    if !path.exists() {
        return Ok(Theme::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(Theme::parse(&s))
}

pub fn write_theme_at(path: &Path, theme: Theme) -> Result<()> {
    fs::write(path, theme.as_str()).with_context(|| format!("write {}", path.display()))
}

pub fn load_theme() -> Result<Theme> {
    read_theme_at(&theme_path()?)
}

/// Flip and persist. Returns the new theme.
pub fn toggle_theme() -> Result<Theme> {
    let p = theme_path()?;
    let next = read_theme_at(&p)?.toggled();
    write_theme_at(&p, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_read_as_light() {
        assert_eq!(Theme::parse("dark\n"), Theme::Dark);
        assert_eq!(Theme::parse("light"), Theme::Light);
        assert_eq!(Theme::parse("solarized"), Theme::Light);
    }

    #[test]
    fn persists_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("theme");
        assert_eq!(read_theme_at(&p).unwrap(), Theme::Light);
        write_theme_at(&p, Theme::Dark).unwrap();
        assert_eq!(read_theme_at(&p).unwrap(), Theme::Dark);
        assert_eq!(fs::read_to_string(&p).unwrap(), "dark");
    }
}
