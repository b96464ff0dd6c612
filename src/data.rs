//! Locates the read-only resource directory shipped with the application

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::resources;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocator {
    resource_directory: PathBuf,
}

impl DataLocator {
    /// `<exe dir>/resources`, or `<settings_dir>/resources` when the
    /// executable path can't be determined
    pub fn locate(settings_dir: &Path) -> Self {
        let exe = env::current_exe().ok();
        Self::beside(exe.as_deref(), settings_dir)
    }

    fn beside(exe: Option<&Path>, settings_dir: &Path) -> Self {
        let base = exe.and_then(Path::parent).unwrap_or(settings_dir);
        let resource_directory = base.join(resources::DIR_NAME);
        debug!(dir = %resource_directory.display(), "Located resource directory");
        Self::with_resource_directory(resource_directory)
    }

    pub fn with_resource_directory(resource_directory: PathBuf) -> Self {
        Self { resource_directory }
    }

    pub fn resource_directory(&self) -> &Path {
        &self.resource_directory
    }
}
