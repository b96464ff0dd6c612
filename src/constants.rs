//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Settings file location constants
pub mod config {
    /// Directory under the OS per-user config dir holding our files
    pub const APP_DIR: &str = "overlay-meter";

    /// Settings file name inside APP_DIR
    pub const FILENAME: &str = "settings.json";

    /// Env var overriding the settings directory
    pub const DIR_ENV: &str = "OVERLAY_METER_CONFIG_DIR";
}

/// Read-only resource layout constants
pub mod resources {
    /// Resource directory name, next to the executable
    pub const DIR_NAME: &str = "resources";

    /// Env var overriding the resource directory
    pub const DIR_ENV: &str = "OVERLAY_METER_RESOURCE_DIR";

    /// Class icon subdirectory inside the resource directory
    pub const CLASS_ICON_DIR: &str = "class-icons";

    /// Class icon file extension
    pub const CLASS_ICON_EXTENSION: &str = "png";
}

/// Logging constants
pub mod logging {
    /// Env var selecting the tracing level (trace/debug/info/warn/error)
    pub const LEVEL_ENV: &str = "LOG_LEVEL";

    /// Level used when LEVEL_ENV is unset or unrecognized
    pub const DEFAULT_LEVEL: &str = "info";
}

/// Built-in settings defaults
pub mod defaults {
    pub const OPACITY_PERCENT: u8 = 90;
    pub const SHOW_PERSONAL_DPS: bool = true;
}
