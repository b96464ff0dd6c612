//! User preferences persisted to the settings file

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::constants::defaults;

/// Persisted user preferences
///
/// Missing fields take their defaults, unknown fields are ignored. Every field
/// is written back on save so the file on disk is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Keep the overlay visible even when the game is not in front
    #[serde(default)]
    pub is_pinned: bool,

    #[serde(default = "default_opacity_percent")]
    pub opacity_percent: u8,

    #[serde(default = "default_show_personal_dps")]
    pub show_personal_dps: bool,

    #[serde(default)]
    pub compact_view: bool,

    /// Last overlay position (None = let the window manager decide)
    #[serde(default)]
    pub window_x: Option<i32>,
    #[serde(default)]
    pub window_y: Option<i32>,

    /// Game server to capture traffic for
    #[serde(default, with = "crate::config::codec::registered")]
    pub server_address: Option<IpAddr>,

    /// Local interface to capture on
    #[serde(default, with = "crate::config::codec::registered")]
    pub capture_interface: Option<IpAddr>,
}

fn default_opacity_percent() -> u8 {
    defaults::OPACITY_PERCENT
}

fn default_show_personal_dps() -> bool {
    defaults::SHOW_PERSONAL_DPS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_pinned: false,
            opacity_percent: default_opacity_percent(),
            show_personal_dps: default_show_personal_dps(),
            compact_view: false,
            window_x: None,
            window_y: None,
            server_address: None,
            capture_interface: None,
        }
    }
}

impl Settings {
    /// Saved overlay position, if both coordinates are known
    pub fn window_position(&self) -> Option<(i32, i32)> {
        self.window_x.zip(self.window_y)
    }
}
