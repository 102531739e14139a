//! Appointment records and the doctor slot-clash rule.
//!
//! Appointments occupy discrete slots. Two non-cancelled appointments for the
//! same doctor conflict when their scheduled times fall in the same slot,
//! where a slot is the scheduled time truncated to the minute. Cancelled
//! appointments release their slot.

use chrono::{NaiveDateTime, Timelike};
use clinic_types::{AppointmentId, NonEmptyText, PatientId};
use serde::{Deserialize, Serialize};

use crate::collection::Entity;
use crate::query::{Field, Queryable};
use crate::{StoreError, StoreResult};

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Rescheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Canonical text form, matching the serialised representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Rescheduled => "Rescheduled",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked appointment.
///
/// Holds a weak reference to the patient by identifier; deleting the patient
/// does not remove the appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor: NonEmptyText,
    pub department: NonEmptyText,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// The slot this appointment occupies: scheduled time at minute
    /// precision.
    pub fn slot(&self) -> NaiveDateTime {
        truncate_to_minute(self.scheduled_at)
    }

    /// Whether this appointment holds its slot against new bookings.
    pub fn blocks_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Whether this appointment clashes with a proposed booking for
    /// `doctor` at `at`.
    pub fn clashes_with(&self, doctor: &str, at: NaiveDateTime) -> bool {
        self.blocks_slot() && self.doctor.as_str() == doctor && self.slot() == truncate_to_minute(at)
    }
}

/// Truncates a timestamp to the start of its minute.
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Raw booking input, validated when the record is created.
#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub patient_id: PatientId,
    pub doctor: String,
    pub department: String,
    pub scheduled_at: NaiveDateTime,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

/// Partial update; `None` fields are left untouched. The patient reference
/// and identifier are immutable.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub doctor: Option<String>,
    pub department: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl Entity for Appointment {
    type Id = AppointmentId;
    type Draft = AppointmentDraft;
    type Patch = AppointmentPatch;

    fn new(id: AppointmentId, draft: AppointmentDraft) -> StoreResult<Self> {
        let doctor = NonEmptyText::new(&draft.doctor)
            .map_err(|_| StoreError::Validation("doctor name is required".into()))?;
        let department = NonEmptyText::new(&draft.department)
            .map_err(|_| StoreError::Validation("department is required".into()))?;

        Ok(Self {
            id,
            patient_id: draft.patient_id,
            doctor,
            department,
            scheduled_at: truncate_to_minute(draft.scheduled_at),
            status: AppointmentStatus::Scheduled,
            notes: draft.notes.trim().to_owned(),
            created_at: draft.created_at,
        })
    }

    fn id(&self) -> AppointmentId {
        self.id
    }

    fn apply(&mut self, patch: AppointmentPatch) -> StoreResult<()> {
        if let Some(doctor) = patch.doctor {
            self.doctor = NonEmptyText::new(&doctor)
                .map_err(|_| StoreError::Validation("doctor name is required".into()))?;
        }
        if let Some(department) = patch.department {
            self.department = NonEmptyText::new(&department)
                .map_err(|_| StoreError::Validation("department is required".into()))?;
        }
        if let Some(at) = patch.scheduled_at {
            self.scheduled_at = truncate_to_minute(at);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes.trim().to_owned();
        }
        Ok(())
    }
}

impl Queryable for Appointment {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        match name {
            "patient" => Some(Field::owned(self.patient_id.to_string())),
            "doctor" => Some(Field::text(self.doctor.as_str())),
            "department" => Some(Field::text(self.department.as_str())),
            "status" => Some(Field::text(self.status.as_str())),
            "notes" => Some(Field::text(&self.notes)),
            "scheduled" => Some(Field::Date(self.scheduled_at.date())),
            "created" => Some(Field::Date(self.created_at.date())),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn draft(
    patient_id: PatientId,
    doctor: &str,
    at: &str,
) -> AppointmentDraft {
    AppointmentDraft {
        patient_id,
        doctor: doctor.to_owned(),
        department: "General Medicine".to_owned(),
        scheduled_at: at.parse().unwrap(),
        notes: String::new(),
        created_at: "2024-02-20T12:00:00".parse().unwrap(),
    }
}
