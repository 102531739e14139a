//! Backup and restore of the backing files.
//!
//! A backup is a plain copy of the three collection files into a directory;
//! restore copies them back and reopens the store. Restore is all-or-nothing:
//! a source directory missing any of the files is rejected before a single
//! byte is copied, so a partial backup can never half-overwrite live data.

use std::fs;
use std::path::Path;

use crate::config::{CoreConfig, BACKING_FILES};
use crate::store::ClinicStore;
use crate::{StoreError, StoreResult};

/// Copies the store's backing files into `dir`, creating it if needed.
///
/// The collections are flushed first, so a freshly opened (or never-mutated)
/// store still produces a complete three-file set.
///
/// # Errors
///
/// Returns `StoreError::Io` on any filesystem failure.
pub fn backup(store: &ClinicStore, dir: &Path) -> StoreResult<()> {
    store.flush()?;
    fs::create_dir_all(dir)?;
    for name in BACKING_FILES {
        fs::copy(store.config().data_dir().join(name), dir.join(name))?;
    }
    tracing::info!(dir = %dir.display(), "backup written");
    Ok(())
}

/// Restores the backing files from `dir` and reopens the store.
///
/// # Errors
///
/// Returns `StoreError::BackupNotFound` when `dir` is absent or any backing
/// file is missing from it; in that case nothing is copied. Otherwise
/// propagates I/O and load errors.
pub fn restore(dir: &Path, cfg: CoreConfig) -> StoreResult<ClinicStore> {
    if !dir.is_dir() {
        return Err(StoreError::BackupNotFound(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }
    for name in BACKING_FILES {
        if !dir.join(name).is_file() {
            return Err(StoreError::BackupNotFound(format!(
                "incomplete backup set: {} is missing from {}",
                name,
                dir.display()
            )));
        }
    }

    for name in BACKING_FILES {
        fs::copy(dir.join(name), cfg.data_dir().join(name))?;
    }
    tracing::info!(dir = %dir.display(), "backup restored");
    ClinicStore::open(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient;
    use tempfile::TempDir;

    fn seeded_store(temp: &TempDir) -> ClinicStore {
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let mut store = ClinicStore::open(cfg).unwrap();
        store
            .register_patient(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        store
    }

    #[test]
    fn backup_then_restore_round_trips() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("backups").join("2024-03-01");
        let mut store = seeded_store(&temp);
        backup(&store, &backup_dir).unwrap();

        // Mutate after the backup, then restore over it.
        store
            .register_patient(patient::draft("Vikram Shah", 41, "M", "9990002222"))
            .unwrap();
        assert_eq!(store.patients().len(), 2);

        let cfg = store.config().clone();
        drop(store);
        let restored = restore(&backup_dir, cfg).unwrap();
        assert_eq!(restored.patients().len(), 1);
        assert_eq!(restored.patients().list()[0].name.as_str(), "Asha Rao");
    }

    #[test]
    fn fresh_store_still_backs_up_a_complete_set() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let store = ClinicStore::open(cfg).unwrap();
        let backup_dir = temp.path().join("backup");
        backup(&store, &backup_dir).unwrap();
        for name in BACKING_FILES {
            assert!(backup_dir.join(name).is_file(), "{name} missing");
        }
    }

    #[test]
    fn restore_rejects_a_missing_directory() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let err = restore(&temp.path().join("nope"), cfg).unwrap_err();
        assert!(matches!(err, StoreError::BackupNotFound(_)));
    }

    #[test]
    fn restore_rejects_a_partial_set_without_copying() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("backup");
        let store = seeded_store(&temp);
        backup(&store, &backup_dir).unwrap();
        fs::remove_file(backup_dir.join("visits.json")).unwrap();

        let cfg = store.config().clone();
        drop(store);
        let err = restore(&backup_dir, cfg.clone()).unwrap_err();
        assert!(matches!(err, StoreError::BackupNotFound(_)));

        // Live data untouched by the rejected restore.
        let store = ClinicStore::open(cfg).unwrap();
        assert_eq!(store.patients().len(), 1);
    }
}
