//! Configuration management for overlay-meter
//!
//! - **codec**: typed value codecs and the JSON reader/writer that uses them
//! - **settings**: the persisted Settings record
//! - **store**: SettingsStore, which loads, recovers and saves the file

pub mod codec;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use codec::{CodecRegistry, IpAddrCodec, ValueCodec};
pub use settings::Settings;
pub use store::{ConfigPaths, LoadOutcome, SettingsStore};
