//! Error taxonomy for the clinic record core.
//!
//! Every failure in this crate falls into one of a small number of buckets:
//! caller errors that can be corrected and resubmitted (validation, unknown
//! identifier, unknown filter field, slot clash) and data-integrity errors
//! that must reach a human operator (corrupt backing file, missing backup).
//! Nothing here is retried automatically; all I/O is local and synchronous.

use std::path::PathBuf;

/// Errors raised by store, query, report, backup and export operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Create/update input was malformed (missing field, bad age, bad date).
    /// Locally correctable by the caller, never fatal.
    #[error("invalid input: {0}")]
    Validation(String),

    /// An operation referenced an identifier that does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind ("patient", "appointment", "visit")
        kind: &'static str,
        /// The identifier in canonical form
        id: String,
    },

    /// A query named a field the target entity does not expose, or applied a
    /// clause kind the field does not support.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A backing file exists but failed to parse. The raw parse failure is
    /// preserved; corruption is never silently treated as an empty
    /// collection.
    #[error("backing file {} is corrupt: {source}", path.display())]
    CorruptStore {
        /// Path of the unreadable backing file
        path: PathBuf,
        /// Underlying parse failure
        #[source]
        source: serde_json::Error,
    },

    /// A restore source directory was absent or missing one of the backing
    /// files. Partial backup sets are rejected outright, nothing is copied.
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    /// A doctor already holds a non-cancelled appointment in the requested
    /// slot.
    #[error("{doctor} already has an appointment at {at}")]
    ScheduleConflict {
        /// Doctor holding the clashing appointment
        doctor: String,
        /// The contested slot, minute precision
        at: chrono::NaiveDateTime,
    },

    /// Underlying filesystem failure while reading or writing a backing file.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A collection could not be serialised for persistence.
    #[error("failed to serialise collection: {0}")]
    Serialisation(serde_json::Error),
}

/// Result alias used throughout the core crate.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
