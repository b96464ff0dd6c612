//! Message types carried by the in-process messenger

use anyhow::{anyhow, Error};
use std::fmt;
use std::str::FromStr;

/// Whether the watched game process is in front, as seen by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilitySignal {
    /// Target process is active
    Visible,

    /// Target process is not active
    Hidden,

    /// Detector couldn't tell (e.g. failed to query the foreground process)
    Unknown,
}

impl From<Option<bool>> for VisibilitySignal {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => VisibilitySignal::Visible,
            Some(false) => VisibilitySignal::Hidden,
            None => VisibilitySignal::Unknown,
        }
    }
}

impl FromStr for VisibilitySignal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visible" | "true" | "1" => Ok(VisibilitySignal::Visible),
            "hidden" | "false" | "0" => Ok(VisibilitySignal::Hidden),
            "unknown" | "none" => Ok(VisibilitySignal::Unknown),
            other => Err(anyhow!("Unknown visibility signal '{}'", other)),
        }
    }
}

impl fmt::Display for VisibilitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VisibilitySignal::Visible => "visible",
            VisibilitySignal::Hidden => "hidden",
            VisibilitySignal::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Published by the detector when the target's visibility may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityMessage {
    pub signal: VisibilitySignal,
}

impl VisibilityMessage {
    pub fn new(signal: impl Into<VisibilitySignal>) -> Self {
        Self {
            signal: signal.into(),
        }
    }
}
