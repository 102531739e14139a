//! Durable, identifier-keyed collections.
//!
//! Each entity type lives in one JSON backing file holding the next-id
//! counter and the records in insertion order. Every mutating operation
//! rewrites the whole file (via a temp file and rename, so a crash mid-write
//! leaves the previous contents intact) before it returns; a subsequent load
//! in the same process therefore always sees the last completed operation.
//!
//! Loading a missing file yields an empty collection with the counter at 1
//! (the first-run case). Loading a file that exists but fails to parse
//! surfaces [`StoreError::CorruptStore`] with the parse failure attached;
//! corruption is never silently treated as empty data.

use std::fs;
use std::path::{Path, PathBuf};

use clinic_types::EntityId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// A record type that a [`Collection`] can hold.
///
/// The collection owns identifier assignment; entities only know how to be
/// built from a validated draft and how to merge a partial update.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Typed identifier for this entity kind.
    type Id: EntityId;
    /// Raw creation input; validated inside [`Entity::new`].
    type Draft;
    /// Partial-update input; validated inside [`Entity::apply`].
    type Patch;

    /// Builds a record from a draft, validating every field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` when the draft is malformed.
    fn new(id: Self::Id, draft: Self::Draft) -> StoreResult<Self>;

    /// The record's identifier. Immutable for the life of the record.
    fn id(&self) -> Self::Id;

    /// Merges a partial update into the record, validating changed fields.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` when a changed field is malformed.
    fn apply(&mut self, patch: Self::Patch) -> StoreResult<()>;
}

/// On-disk shape of a backing file.
#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: DeserializeOwned"
))]
struct OnDisk<T> {
    next_id: u32,
    records: Vec<T>,
}

/// One entity collection bound to its backing file.
#[derive(Debug)]
pub struct Collection<T: Entity> {
    path: PathBuf,
    next_index: u32,
    records: Vec<T>,
}

impl<T: Entity> Collection<T> {
    /// Loads the collection from its backing file.
    ///
    /// A missing file is the first-run case and yields an empty collection;
    /// an unreadable or unparseable file is surfaced, not discarded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` when the file cannot be read and
    /// `StoreError::CorruptStore` when it cannot be parsed.
    pub fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                next_index: 1,
                records: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        let on_disk: OnDisk<T> =
            serde_json::from_str(&raw).map_err(|source| StoreError::CorruptStore {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            next_index: on_disk.next_id,
            records: on_disk.records,
        })
    }

    /// Validates a draft, assigns the next identifier and persists.
    ///
    /// The counter only advances when validation succeeds, so rejected
    /// drafts do not burn identifiers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for a malformed draft, or an I/O or
    /// serialisation error from persisting.
    pub fn create(&mut self, draft: T::Draft) -> StoreResult<T> {
        let id = T::Id::from_index(self.next_index);
        let entity = T::new(id, draft)?;
        self.next_index += 1;
        self.records.push(entity.clone());
        self.save()?;
        Ok(entity)
    }

    /// Merges a patch into an existing record and persists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown identifier,
    /// `StoreError::Validation` for a malformed patch field, or a
    /// persistence error.
    pub fn update(&mut self, id: T::Id, patch: T::Patch) -> StoreResult<T> {
        let record = self.get_mut(id)?;
        record.apply(patch)?;
        let updated = record.clone();
        self.save()?;
        Ok(updated)
    }

    /// Removes a record and persists. Does not cascade.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown identifier, or a
    /// persistence error.
    pub fn delete(&mut self, id: T::Id) -> StoreResult<()> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        self.records.remove(pos);
        self.save()
    }

    /// Looks a record up by identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown identifier.
    pub fn get(&self, id: T::Id) -> StoreResult<&T> {
        self.records
            .iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))
    }

    /// All records, in insertion order.
    pub fn list(&self) -> &[T] {
        &self.records
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn get_mut(&mut self, id: T::Id) -> StoreResult<&mut T> {
        self.records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))
    }

    /// Applies a closure to a record and persists the result. Used by the
    /// store for status transitions that bypass the patch type.
    pub(crate) fn mutate(
        &mut self,
        id: T::Id,
        f: impl FnOnce(&mut T) -> StoreResult<()>,
    ) -> StoreResult<T> {
        let record = self.get_mut(id)?;
        f(record)?;
        let updated = record.clone();
        self.save()?;
        Ok(updated)
    }

    /// Rewrites the backing file with the full collection.
    pub(crate) fn save(&self) -> StoreResult<()> {
        let on_disk = OnDisk {
            next_id: self.next_index,
            records: self.records.clone(),
        };
        let json =
            serde_json::to_string_pretty(&on_disk).map_err(StoreError::Serialisation)?;

        // Write-then-rename keeps the previous file intact if the write dies
        // halfway.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn not_found(id: T::Id) -> StoreError {
        StoreError::NotFound {
            kind: T::Id::KIND,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{self, Patient, PatientPatch};
    use clinic_types::PatientId;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> Collection<Patient> {
        Collection::load(temp.path().join("patients.json")).unwrap()
    }

    #[test]
    fn missing_file_loads_as_empty_first_run() {
        let temp = TempDir::new().unwrap();
        let coll = open(&temp);
        assert!(coll.is_empty());
    }

    #[test]
    fn create_then_get_returns_stored_entity() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        let created = coll
            .create(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        assert_eq!(created.id.to_string(), "P0001");
        let fetched = coll.get(created.id).unwrap();
        assert_eq!(fetched, &created);
    }

    #[test]
    fn identifiers_are_monotonic_and_never_reused() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        let p1 = coll
            .create(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        let p2 = coll
            .create(patient::draft("Vikram Shah", 41, "M", "9990002222"))
            .unwrap();
        assert_eq!(p1.id.to_string(), "P0001");
        assert_eq!(p2.id.to_string(), "P0002");

        coll.delete(p1.id).unwrap();
        let p3 = coll
            .create(patient::draft("Meena Rao", 52, "F", "9990003333"))
            .unwrap();
        assert_eq!(p3.id.to_string(), "P0003");
    }

    #[test]
    fn rejected_draft_does_not_burn_an_identifier() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        assert!(coll.create(patient::draft("", 34, "F", "9990001111")).is_err());
        let p = coll
            .create(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        assert_eq!(p.id.to_string(), "P0001");
    }

    #[test]
    fn collection_round_trips_through_its_backing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("patients.json");
        {
            let mut coll: Collection<Patient> = Collection::load(&path).unwrap();
            coll.create(patient::draft("Asha Rao", 34, "F", "9990001111"))
                .unwrap();
            coll.create(patient::draft("Vikram Shah", 41, "M", "9990002222"))
                .unwrap();
            coll.delete(PatientId::from_index(1)).unwrap();
        }
        let reloaded: Collection<Patient> = Collection::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.list()[0].name.as_str(), "Vikram Shah");
        // Counter survives the round trip too.
        assert_eq!(reloaded.next_index, 3);
    }

    #[test]
    fn update_merges_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("patients.json");
        let id = {
            let mut coll: Collection<Patient> = Collection::load(&path).unwrap();
            let p = coll
                .create(patient::draft("Asha Rao", 34, "F", "9990001111"))
                .unwrap();
            coll.update(
                p.id,
                PatientPatch {
                    age: Some(35),
                    ..Default::default()
                },
            )
            .unwrap();
            p.id
        };
        let reloaded: Collection<Patient> = Collection::load(&path).unwrap();
        assert_eq!(reloaded.get(id).unwrap().age, 35);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        let p = coll
            .create(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        coll.delete(p.id).unwrap();
        let err = coll.get(p.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound { kind: "patient", .. }
        ));
    }

    #[test]
    fn operations_on_unknown_ids_are_not_found() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        let ghost = PatientId::from_index(99);
        assert!(matches!(coll.get(ghost), Err(StoreError::NotFound { .. })));
        assert!(matches!(coll.delete(ghost), Err(StoreError::NotFound { .. })));
        assert!(matches!(
            coll.update(ghost, PatientPatch::default()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn corrupt_file_surfaces_with_cause_attached() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("patients.json");
        std::fs::write(&path, "{ not json at all").unwrap();
        let err = Collection::<Patient>::load(&path).unwrap_err();
        match err {
            StoreError::CorruptStore { path: p, source } => {
                assert_eq!(p, path);
                // The raw parse failure is preserved for the operator.
                assert!(!source.to_string().is_empty());
            }
            other => panic!("expected CorruptStore, got {other:?}"),
        }
    }

    #[test]
    fn temp_file_is_not_left_behind_after_save() {
        let temp = TempDir::new().unwrap();
        let mut coll = open(&temp);
        coll.create(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap();
        assert!(coll.path().exists());
        assert!(!coll.path().with_extension("json.tmp").exists());
    }
}
