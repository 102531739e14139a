//! # Clinic core
//!
//! Offline, file-based record keeping for a small clinic: patients,
//! appointments and outpatient visits persisted to one JSON file per
//! collection, with filtering, aggregate reporting, backup/restore and a
//! tabular export projection on top.
//!
//! The crate is the storage and business layer only. Window layout, widget
//! wiring, speech output and print formatting belong to the surrounding
//! shell, which reaches the core through [`ClinicStore`] and the
//! [`Announcer`]/[`Exporter`] capability seams.
//!
//! Everything is single-process and synchronous: every mutating operation
//! rewrites the affected collection's backing file before returning, and the
//! store assumes it is the only process with those files open.

pub mod announce;
pub mod appointment;
pub mod backup;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod patient;
pub mod query;
pub mod report;
pub mod store;
pub mod visit;

pub use announce::{AnnounceError, Announcer, LogAnnouncer, NullAnnouncer};
pub use appointment::{Appointment, AppointmentDraft, AppointmentPatch, AppointmentStatus};
pub use backup::{backup, restore};
pub use collection::{Collection, Entity};
pub use config::CoreConfig;
pub use error::{StoreError, StoreResult};
pub use export::{export_all, CsvExporter, Exporter, Tabular};
pub use patient::{Patient, PatientDraft, PatientPatch};
pub use query::{search, Field, Filter, Queryable};
pub use report::{
    aggregate, appointment_summary, appointment_volume, consultation_counts, visit_volume,
    AppointmentSummary, GroupBy, Period, ReportRow,
};
pub use store::{ClinicStore, Statistics};
pub use visit::{Visit, VisitDraft, VisitPatch, VisitStatus};
