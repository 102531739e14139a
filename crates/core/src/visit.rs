//! Outpatient (OPD) visit records.
//!
//! A visit is opened at check-in with the presenting symptoms, accumulates
//! diagnosis and prescription text through [`VisitPatch`] updates, and is
//! closed by the store's `complete_visit` operation, which also fires the
//! announcer. Both the patient reference and the optional appointment
//! reference are weak: held by identifier and checked only at write time.

use chrono::{NaiveDate, NaiveDateTime};
use clinic_types::{AppointmentId, NonEmptyText, PatientId, VisitId};
use serde::{Deserialize, Serialize};

use crate::collection::Entity;
use crate::query::{Field, Queryable};
use crate::{StoreError, StoreResult};

/// Lifecycle status of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitStatus {
    InProgress,
    Completed,
}

impl VisitStatus {
    /// Canonical text form, matching the serialised representation.
    pub fn as_str(self) -> &'static str {
        match self {
            VisitStatus::InProgress => "InProgress",
            VisitStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outpatient visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub patient_id: PatientId,
    /// The appointment this visit honours, when it was booked in advance.
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
    pub doctor: NonEmptyText,
    pub checked_in_at: NaiveDateTime,
    pub symptoms: NonEmptyText,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub prescription: String,
    pub status: VisitStatus,
    #[serde(default)]
    pub follow_up: Option<NaiveDate>,
}

/// Raw check-in input, validated when the record is created.
#[derive(Debug, Clone)]
pub struct VisitDraft {
    pub patient_id: PatientId,
    pub appointment_id: Option<AppointmentId>,
    pub doctor: String,
    pub checked_in_at: NaiveDateTime,
    pub symptoms: String,
}

/// Partial clinical update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct VisitPatch {
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    /// `Some(None)` clears a previously set follow-up date.
    pub follow_up: Option<Option<NaiveDate>>,
}

impl Entity for Visit {
    type Id = VisitId;
    type Draft = VisitDraft;
    type Patch = VisitPatch;

    fn new(id: VisitId, draft: VisitDraft) -> StoreResult<Self> {
        let doctor = NonEmptyText::new(&draft.doctor)
            .map_err(|_| StoreError::Validation("doctor name is required".into()))?;
        let symptoms = NonEmptyText::new(&draft.symptoms)
            .map_err(|_| StoreError::Validation("symptoms are required".into()))?;

        Ok(Self {
            id,
            patient_id: draft.patient_id,
            appointment_id: draft.appointment_id,
            doctor,
            checked_in_at: draft.checked_in_at,
            symptoms,
            diagnosis: String::new(),
            prescription: String::new(),
            status: VisitStatus::InProgress,
            follow_up: None,
        })
    }

    fn id(&self) -> VisitId {
        self.id
    }

    fn apply(&mut self, patch: VisitPatch) -> StoreResult<()> {
        if let Some(symptoms) = patch.symptoms {
            self.symptoms = NonEmptyText::new(&symptoms)
                .map_err(|_| StoreError::Validation("symptoms are required".into()))?;
        }
        if let Some(diagnosis) = patch.diagnosis {
            self.diagnosis = diagnosis.trim().to_owned();
        }
        if let Some(prescription) = patch.prescription {
            self.prescription = prescription.trim().to_owned();
        }
        if let Some(follow_up) = patch.follow_up {
            self.follow_up = follow_up;
        }
        Ok(())
    }
}

impl Queryable for Visit {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        match name {
            "patient" => Some(Field::owned(self.patient_id.to_string())),
            "doctor" => Some(Field::text(self.doctor.as_str())),
            "status" => Some(Field::text(self.status.as_str())),
            "symptoms" => Some(Field::text(self.symptoms.as_str())),
            "diagnosis" => Some(Field::text(&self.diagnosis)),
            "prescription" => Some(Field::text(&self.prescription)),
            "checked_in" => Some(Field::Date(self.checked_in_at.date())),
            "follow_up" => Some(self.follow_up.map_or(Field::Absent, Field::Date)),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn draft(patient_id: PatientId, doctor: &str, at: &str) -> VisitDraft {
    VisitDraft {
        patient_id,
        appointment_id: None,
        doctor: doctor.to_owned(),
        checked_in_at: at.parse().unwrap(),
        symptoms: "fever, headache".to_owned(),
    }
}
