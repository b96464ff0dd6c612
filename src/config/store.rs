//! Settings store: owns the Settings value and its file on disk
//!
//! The store is built once by the composition root (see `services`). Building
//! it creates the settings directory, resolves class icons and loads the file.
//! A corrupt file is replaced by defaults; I/O failures are returned.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::class_icons::{ClassIconMap, PlayerClass};
use crate::config::codec::{CodecRegistry, JsonFormat};
use crate::config::settings::Settings;
use crate::constants::config;
use crate::data::DataLocator;

/// Where the settings file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    settings_dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(settings_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings_dir: settings_dir.into(),
        }
    }

    /// `<config dir>/overlay-meter`, or `./overlay-meter` without a config dir
    pub fn default_location() -> Self {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        Self::new(path)
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.settings_dir.join(config::FILENAME)
    }
}

/// How the last `load()` obtained its settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parsed from the existing file
    Loaded,
    /// No file yet, defaults used
    Defaulted,
    /// File was unreadable as settings, defaults used
    Recovered,
}

pub struct SettingsStore {
    paths: ConfigPaths,
    data: DataLocator,
    class_icons: ClassIconMap,
    format: JsonFormat,
    settings: Settings,
    /// Mirror of `settings.is_pinned`, readable without the store lock
    pinned: Arc<AtomicBool>,
    last_load: LoadOutcome,
}

impl SettingsStore {
    /// Build the store and load settings.
    /// Fails if the settings directory can't be created or the file can't be read.
    pub fn open(paths: ConfigPaths, data: DataLocator, codecs: CodecRegistry) -> Result<Self> {
        fs::create_dir_all(paths.settings_dir()).with_context(|| {
            format!(
                "Failed to create settings directory {:?}",
                paths.settings_dir()
            )
        })?;

        let class_icons = ClassIconMap::build(data.resource_directory());
        debug!(resources = %data.resource_directory().display(), "Resolved class icons");

        let mut store = Self {
            paths,
            data,
            class_icons,
            format: JsonFormat::new(codecs),
            settings: Settings::default(),
            pinned: Arc::new(AtomicBool::new(false)),
            last_load: LoadOutcome::Defaulted,
        };
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory settings with the file contents (or defaults),
    /// then write the result back so the file is complete and valid.
    pub fn load(&mut self) -> Result<LoadOutcome> {
        let config_path = self.paths.config_file();

        let (settings, outcome) = match fs::read(&config_path) {
            Ok(bytes) => match self.format.from_slice::<Settings>(&bytes) {
                Ok(settings) => {
                    info!(path = %config_path.display(), "Loaded settings");
                    (settings, LoadOutcome::Loaded)
                }
                Err(e) => {
                    warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Settings file is corrupt, restoring defaults"
                    );
                    (Settings::default(), LoadOutcome::Recovered)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %config_path.display(), "No settings file found, using defaults");
                (Settings::default(), LoadOutcome::Defaulted)
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read settings from {:?}", config_path));
            }
        };

        self.settings = settings;
        self.sync_pinned();
        self.last_load = outcome;

        if let Err(e) = self.save() {
            warn!(
                error = ?e,
                "Failed to write settings back, changes will only last for this session"
            );
        }
        Ok(outcome)
    }

    /// Serialize the full Settings value and replace the file atomically
    pub fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();
        let json = self.to_json()?;

        atomic_write(&config_path, json.as_bytes())
            .with_context(|| format!("Failed to write settings to {:?}", config_path))?;

        debug!(path = %config_path.display(), "Saved settings");
        Ok(())
    }

    /// The exact text `save()` writes
    pub fn to_json(&self) -> Result<String> {
        self.format
            .to_string_pretty(&self.settings)
            .context("Failed to serialize settings to JSON")
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Change settings in memory; call `save()` to persist
    pub fn update(&mut self, change: impl FnOnce(&mut Settings)) {
        change(&mut self.settings);
        self.sync_pinned();
    }

    /// Update the pinned flag and persist it
    pub fn set_pinned(&mut self, pinned: bool) -> Result<()> {
        self.settings.is_pinned = pinned;
        self.sync_pinned();
        info!(pinned, "Pinned preference changed");
        self.save()
    }

    /// Throw away the current settings and persist the defaults
    pub fn reset(&mut self) -> Result<()> {
        self.settings = Settings::default();
        self.sync_pinned();
        info!("Settings reset to defaults");
        self.save()
    }

    /// Shared view of the pinned flag; stays current across load, reset and updates
    pub fn pinned_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.pinned)
    }

    fn sync_pinned(&self) {
        self.pinned.store(self.settings.is_pinned, Ordering::Release);
    }

    pub fn get_image(&self, class: PlayerClass) -> &Path {
        self.class_icons.get(class)
    }

    pub fn class_icons(&self) -> &ClassIconMap {
        &self.class_icons
    }

    pub fn last_load(&self) -> LoadOutcome {
        self.last_load
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn data(&self) -> &DataLocator {
        &self.data
    }
}

/// Write to a temp file next to `path`, then rename it over `path`
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::open(
            ConfigPaths::new(dir.path()),
            DataLocator::with_resource_directory(dir.path().join("resources")),
            CodecRegistry::with_defaults(),
        )
        .expect("open store")
    }

    fn reload(dir: &TempDir) -> Settings {
        let bytes = fs::read(dir.path().join(config::FILENAME)).expect("read settings file");
        JsonFormat::new(CodecRegistry::with_defaults())
            .from_slice(&bytes)
            .expect("settings file parses")
    }

    #[test]
    fn test_missing_file_yields_defaults_and_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_in(&dir);

        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.last_load(), LoadOutcome::Defaulted);
        assert!(dir.path().join(config::FILENAME).exists());
        assert_eq!(reload(&dir), Settings::default());
    }

    #[test]
    fn test_creates_nested_settings_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let store = SettingsStore::open(
            ConfigPaths::new(&nested),
            DataLocator::with_resource_directory(dir.path().to_path_buf()),
            CodecRegistry::with_defaults(),
        )
        .expect("open store");

        assert!(nested.is_dir());
        assert_eq!(store.paths().config_file(), nested.join(config::FILENAME));
    }

    #[test]
    fn test_existing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _first = open_in(&dir);
        let second = open_in(&dir);
        assert_eq!(second.last_load(), LoadOutcome::Loaded);
    }

    #[test]
    fn test_unusable_settings_directory_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file in the way").unwrap();

        let result = SettingsStore::open(
            ConfigPaths::new(blocker.join("settings")),
            DataLocator::with_resource_directory(dir.path().to_path_buf()),
            CodecRegistry::with_defaults(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unreadable_settings_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join(config::FILENAME)).unwrap();

        let result = SettingsStore::open(
            ConfigPaths::new(dir.path()),
            DataLocator::with_resource_directory(dir.path().to_path_buf()),
            CodecRegistry::with_defaults(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_write_back_keeps_session_going() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings_dir = dir.path().join("cfg");
        let mut store = SettingsStore::open(
            ConfigPaths::new(&settings_dir),
            DataLocator::with_resource_directory(dir.path().to_path_buf()),
            CodecRegistry::with_defaults(),
        )
        .expect("open store");
        store.set_pinned(true).expect("pin");

        fs::remove_dir_all(&settings_dir).unwrap();

        assert_eq!(store.load().expect("load"), LoadOutcome::Defaulted);
        assert_eq!(store.settings(), &Settings::default());
        assert!(!settings_dir.exists());
        assert!(store.save().is_err());
        assert!(store.set_pinned(true).is_err());
        // Kept in memory for the session
        assert!(store.settings().is_pinned);
    }

    #[test]
    fn test_pinned_flag_tracks_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(config::FILENAME), r#"{"is_pinned": true}"#).unwrap();
        let mut store = open_in(&dir);
        let flag = store.pinned_flag();
        assert!(flag.load(Ordering::Acquire));

        store.set_pinned(false).unwrap();
        assert!(!flag.load(Ordering::Acquire));

        store.update(|settings| settings.is_pinned = true);
        assert!(flag.load(Ordering::Acquire));

        store.reset().unwrap();
        assert!(!flag.load(Ordering::Acquire));

        store.update(|settings| settings.is_pinned = true);
        store.save().unwrap();
        store.update(|settings| settings.is_pinned = false);
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded);
        assert!(flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_existing_file_is_adopted() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(config::FILENAME),
            r#"{"is_pinned": true, "opacity_percent": 55, "server_address": "79.110.94.212"}"#,
        )
        .unwrap();

        let store = open_in(&dir);
        assert_eq!(store.last_load(), LoadOutcome::Loaded);
        assert!(store.settings().is_pinned);
        assert_eq!(store.settings().opacity_percent, 55);
        assert_eq!(
            store.settings().server_address,
            Some(IpAddr::V4(Ipv4Addr::new(79, 110, 94, 212)))
        );
    }

    #[test]
    fn test_syntax_error_recovers_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(config::FILENAME), "{ \"is_pinned\": tru").unwrap();

        let store = open_in(&dir);
        assert_eq!(store.last_load(), LoadOutcome::Recovered);
        assert_eq!(store.settings(), &Settings::default());
        // File normalized on disk
        assert_eq!(reload(&dir), Settings::default());
    }

    #[test]
    fn test_type_mismatch_recovers_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(config::FILENAME),
            r#"{"is_pinned": "definitely", "opacity_percent": 40}"#,
        )
        .unwrap();

        let store = open_in(&dir);
        assert_eq!(store.last_load(), LoadOutcome::Recovered);
        assert_eq!(store.settings(), &Settings::default());

        let again = open_in(&dir);
        assert_eq!(again.last_load(), LoadOutcome::Loaded);
        assert_eq!(again.settings(), &Settings::default());
    }

    #[test]
    fn test_malformed_address_recovers_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(config::FILENAME),
            r#"{"is_pinned": true, "server_address": "not.an.ip"}"#,
        )
        .unwrap();

        let store = open_in(&dir);
        assert_eq!(store.last_load(), LoadOutcome::Recovered);
        assert!(!store.settings().is_pinned);
    }

    #[test]
    fn test_binary_garbage_recovers_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(config::FILENAME), [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let store = open_in(&dir);
        assert_eq!(store.last_load(), LoadOutcome::Recovered);
        assert_eq!(reload(&dir), Settings::default());
    }

    #[test]
    fn test_unknown_fields_dropped_on_rewrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(config::FILENAME),
            r#"{"is_pinned": true, "retired_option": 3}"#,
        )
        .unwrap();

        let _store = open_in(&dir);
        let contents = fs::read_to_string(dir.path().join(config::FILENAME)).unwrap();
        assert!(!contents.contains("retired_option"));
        assert!(contents.contains("\"opacity_percent\""));
        assert!(contents.contains("\"is_pinned\": true"));
    }

    #[test]
    fn test_save_round_trips_mutations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_in(&dir);

        store.update(|settings| {
            settings.capture_interface = Some("fe80::1".parse().unwrap());
            settings.window_x = Some(120);
            settings.window_y = Some(80);
        });
        store.save().expect("save");

        let reopened = open_in(&dir);
        assert_eq!(reopened.settings(), store.settings());
    }

    #[test]
    fn test_set_pinned_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_in(&dir);

        store.set_pinned(true).expect("set pinned");
        assert!(reload(&dir).is_pinned);

        store.set_pinned(false).expect("set pinned");
        assert!(!reload(&dir).is_pinned);
    }

    #[test]
    fn test_reset_replaces_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_in(&dir);
        store.update(|settings| {
            settings.compact_view = true;
            settings.opacity_percent = 10;
        });
        store.save().unwrap();

        store.reset().expect("reset");
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(reload(&dir), Settings::default());
    }

    #[test]
    fn test_load_replaces_in_memory_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_in(&dir);
        store.update(|settings| settings.compact_view = true);

        // Not saved, so reloading discards the change
        assert_eq!(store.load().unwrap(), LoadOutcome::Loaded);
        assert!(!store.settings().compact_view);
    }

    #[test]
    fn test_get_image_uses_resource_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_in(&dir);
        assert_eq!(
            store.get_image(PlayerClass::Sorcerer),
            dir.path().join("resources/class-icons/sorcerer.png")
        );
        for class in PlayerClass::ALL {
            assert!(store.get_image(class).starts_with(store.data().resource_directory()));
        }
    }

    #[test]
    fn test_default_location_is_app_dir() {
        // Environment overrides are applied by the CLI, not here
        let paths = ConfigPaths::default_location();
        assert!(paths.settings_dir().ends_with(config::APP_DIR));
        assert_eq!(paths.config_file().file_name().unwrap(), config::FILENAME);
    }

    #[test]
    fn test_config_paths() {
        let paths = ConfigPaths::new("/home/user/.config/overlay-meter");
        assert_eq!(paths.settings_dir(), Path::new("/home/user/.config/overlay-meter"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/home/user/.config/overlay-meter/settings.json")
        );
    }
}
