//! Single-value preferences stored next to chat sessions.
//!
//! These live in the same key-value store under fixed keys, with no schema
//! versioning.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Store key for the generation API key.
pub const API_KEY_KEY: &str = "geminiApiKey";

/// Store key for the theme preference.
pub const THEME_KEY: &str = "theme";

/// Store key for the pinned sidebar position.
pub const SIDEBAR_POSITION_KEY: &str = "sidebar_position";

/// Store key for the sidebar pin flag.
pub const SIDEBAR_PINNED_KEY: &str = "sidebar_pinned";

/// UI colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("invalid theme: '{other}'")),
        }
    }
}

/// Top-left corner of the floating sidebar, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidebarPosition {
    pub x: f64,
    pub y: f64,
}

impl Default for SidebarPosition {
    fn default() -> Self {
        Self { x: 24.0, y: 24.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn test_theme_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Theme::Dark).unwrap(), "dark");
    }

    #[test]
    fn test_default_position() {
        let pos = SidebarPosition::default();
        assert_eq!((pos.x, pos.y), (24.0, 24.0));
    }
}
