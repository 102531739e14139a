//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the
//! store. The core never reads environment variables while handling an
//! operation; the outer layer (CLI or a future GUI shell) decides where the
//! data directory lives and hands the resolved paths in.

use std::path::{Path, PathBuf};

use crate::{StoreError, StoreResult};

/// File name of the patients collection.
pub const PATIENTS_FILE: &str = "patients.json";
/// File name of the appointments collection.
pub const APPOINTMENTS_FILE: &str = "appointments.json";
/// File name of the visits collection.
pub const VISITS_FILE: &str = "visits.json";

/// The full set of backing files, in the order they are backed up and
/// restored.
pub const BACKING_FILES: [&str; 3] = [PATIENTS_FILE, APPOINTMENTS_FILE, VISITS_FILE];

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Creates a new `CoreConfig` rooted at `data_dir`.
    ///
    /// The directory is created if it does not yet exist, so a first run on a
    /// fresh machine starts with three empty collections.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created, or
    /// `StoreError::Validation` if the path exists but is not a directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(StoreError::Validation(format!(
                "data path is not a directory: {}",
                data_dir.display()
            )));
        }
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Root directory holding the backing files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the patients backing file.
    pub fn patients_file(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_FILE)
    }

    /// Path of the appointments backing file.
    pub fn appointments_file(&self) -> PathBuf {
        self.data_dir.join(APPOINTMENTS_FILE)
    }

    /// Path of the visits backing file.
    pub fn visits_file(&self) -> PathBuf {
        self.data_dir.join(VISITS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data");
        let cfg = CoreConfig::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(cfg.patients_file().ends_with("patients.json"));
    }

    #[test]
    fn new_rejects_file_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            CoreConfig::new(&file),
            Err(StoreError::Validation(_))
        ));
    }
}
