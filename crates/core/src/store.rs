//! The clinic store: three collections plus the operations that cross them.
//!
//! An explicit store object, constructed from a [`CoreConfig`] — no
//! module-level singleton, so tests (and a future multi-profile shell) can
//! hold several independent stores at once. Referential checks between
//! collections happen here at write time; the references themselves are weak
//! and deletions never cascade.

use chrono::NaiveDate;

use clinic_types::{AppointmentId, PatientId, VisitId};

use crate::announce::{Announcer, NullAnnouncer};
use crate::appointment::{
    Appointment, AppointmentDraft, AppointmentPatch, AppointmentStatus,
};
use crate::collection::{Collection, Entity};
use crate::config::CoreConfig;
use crate::patient::{Patient, PatientDraft, PatientPatch};
use crate::query::{search, Filter};
use crate::visit::{Visit, VisitDraft, VisitPatch, VisitStatus};
use crate::{StoreError, StoreResult};

/// Dashboard-style counts over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub total_patients: usize,
    pub total_appointments: usize,
    pub total_visits: usize,
    /// Appointments whose slot falls on the given day.
    pub appointments_today: usize,
    /// Visits checked in on the given day.
    pub visits_today: usize,
    /// Appointments still holding a future claim (scheduled or rescheduled).
    pub pending_appointments: usize,
    /// Visits checked in on the given day that have completed.
    pub completed_visits_today: usize,
}

/// Process-local store over the three entity collections.
pub struct ClinicStore {
    cfg: CoreConfig,
    patients: Collection<Patient>,
    appointments: Collection<Appointment>,
    visits: Collection<Visit>,
    announcer: Box<dyn Announcer>,
}

// The announcer is an opaque capability, so Debug is written by hand over
// the inspectable parts.
impl std::fmt::Debug for ClinicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClinicStore")
            .field("data_dir", &self.cfg.data_dir())
            .field("patients", &self.patients.len())
            .field("appointments", &self.appointments.len())
            .field("visits", &self.visits.len())
            .finish_non_exhaustive()
    }
}

impl ClinicStore {
    /// Opens the store, loading all three collections from the configured
    /// data directory. Missing files start empty; corrupt files fail the
    /// open.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CorruptStore` or `StoreError::Io` from loading.
    pub fn open(cfg: CoreConfig) -> StoreResult<Self> {
        Self::open_with_announcer(cfg, Box::new(NullAnnouncer))
    }

    /// Opens the store with an injected announcer.
    pub fn open_with_announcer(
        cfg: CoreConfig,
        announcer: Box<dyn Announcer>,
    ) -> StoreResult<Self> {
        let patients = Collection::load(cfg.patients_file())?;
        let appointments = Collection::load(cfg.appointments_file())?;
        let visits = Collection::load(cfg.visits_file())?;
        tracing::info!(
            data_dir = %cfg.data_dir().display(),
            patients = patients.len(),
            appointments = appointments.len(),
            visits = visits.len(),
            "store opened"
        );
        Ok(Self {
            cfg,
            patients,
            appointments,
            visits,
            announcer,
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Read access to the patients collection.
    pub fn patients(&self) -> &Collection<Patient> {
        &self.patients
    }

    /// Read access to the appointments collection.
    pub fn appointments(&self) -> &Collection<Appointment> {
        &self.appointments
    }

    /// Read access to the visits collection.
    pub fn visits(&self) -> &Collection<Visit> {
        &self.visits
    }

    // --- patients -------------------------------------------------------

    /// Registers a patient, assigning the next patient identifier.
    pub fn register_patient(&mut self, draft: PatientDraft) -> StoreResult<Patient> {
        self.patients.create(draft)
    }

    /// Updates a patient in place; the identifier is immutable.
    pub fn update_patient(&mut self, id: PatientId, patch: PatientPatch) -> StoreResult<Patient> {
        self.patients.update(id, patch)
    }

    /// Removes a patient. Appointments and visits that reference the
    /// patient are left untouched.
    pub fn delete_patient(&mut self, id: PatientId) -> StoreResult<()> {
        self.patients.delete(id)
    }

    /// Filters the patient snapshot, preserving registration order.
    pub fn search_patients(&self, filter: &Filter) -> StoreResult<Vec<&Patient>> {
        search(self.patients.list(), filter)
    }

    // --- appointments ---------------------------------------------------

    /// Books an appointment.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the patient does not exist,
    /// `StoreError::ScheduleConflict` when the doctor already holds a
    /// non-cancelled appointment in the same minute slot, plus the usual
    /// validation and persistence errors.
    pub fn book_appointment(&mut self, draft: AppointmentDraft) -> StoreResult<Appointment> {
        self.patients.get(draft.patient_id)?;
        self.check_slot(&draft.doctor, draft.scheduled_at, None)?;
        self.appointments.create(draft)
    }

    /// Applies a partial update to an appointment, re-running the slot-clash
    /// check when the doctor or time changes.
    pub fn update_appointment(
        &mut self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> StoreResult<Appointment> {
        let mut updated = self.appointments.get(id)?.clone();
        updated.apply(patch)?;
        if updated.blocks_slot() {
            self.check_slot(updated.doctor.as_str(), updated.scheduled_at, Some(id))?;
        }
        self.appointments.mutate(id, move |a| {
            *a = updated;
            Ok(())
        })
    }

    /// Moves an appointment to a new slot and marks it rescheduled.
    pub fn reschedule_appointment(
        &mut self,
        id: AppointmentId,
        at: chrono::NaiveDateTime,
    ) -> StoreResult<Appointment> {
        self.update_appointment(
            id,
            AppointmentPatch {
                scheduled_at: Some(at),
                status: Some(AppointmentStatus::Rescheduled),
                ..Default::default()
            },
        )
    }

    /// Cancels an appointment, releasing its slot.
    pub fn cancel_appointment(&mut self, id: AppointmentId) -> StoreResult<Appointment> {
        self.set_appointment_status(id, AppointmentStatus::Cancelled)
    }

    /// Marks an appointment completed.
    pub fn complete_appointment(&mut self, id: AppointmentId) -> StoreResult<Appointment> {
        self.set_appointment_status(id, AppointmentStatus::Completed)
    }

    /// Removes an appointment record entirely.
    pub fn delete_appointment(&mut self, id: AppointmentId) -> StoreResult<()> {
        self.appointments.delete(id)
    }

    /// Filters the appointment snapshot, preserving booking order.
    pub fn search_appointments(&self, filter: &Filter) -> StoreResult<Vec<&Appointment>> {
        search(self.appointments.list(), filter)
    }

    // --- visits ---------------------------------------------------------

    /// Opens a visit at check-in.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the patient, or the referenced
    /// appointment if any, does not exist.
    pub fn check_in(&mut self, draft: VisitDraft) -> StoreResult<Visit> {
        self.patients.get(draft.patient_id)?;
        if let Some(appointment_id) = draft.appointment_id {
            self.appointments.get(appointment_id)?;
        }
        self.visits.create(draft)
    }

    /// Records diagnosis, prescription or follow-up on an open visit.
    pub fn record_outcome(&mut self, id: VisitId, patch: VisitPatch) -> StoreResult<Visit> {
        self.visits.update(id, patch)
    }

    /// Completes a visit and fires the announcer.
    ///
    /// The status change is persisted first; an announcer failure is logged
    /// and never rolls the visit back.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` when the visit is already completed.
    pub fn complete_visit(&mut self, id: VisitId) -> StoreResult<Visit> {
        let visit = self.visits.mutate(id, |v| {
            if v.status == VisitStatus::Completed {
                return Err(StoreError::Validation(format!(
                    "visit {} is already completed",
                    v.id
                )));
            }
            v.status = VisitStatus::Completed;
            Ok(())
        })?;

        // A deleted patient still gets their visit completed; fall back to
        // the bare identifier for the announcement.
        let patient_name = self
            .patients
            .get(visit.patient_id)
            .map(|p| p.name.to_string())
            .unwrap_or_else(|_| visit.patient_id.to_string());

        if let Err(e) = self
            .announcer
            .visit_completed(&patient_name, visit.doctor.as_str())
        {
            tracing::warn!(visit = %visit.id, error = %e, "announcer failed");
        }

        Ok(visit)
    }

    /// Removes a visit record entirely.
    pub fn delete_visit(&mut self, id: VisitId) -> StoreResult<()> {
        self.visits.delete(id)
    }

    /// Filters the visit snapshot, preserving check-in order.
    pub fn search_visits(&self, filter: &Filter) -> StoreResult<Vec<&Visit>> {
        search(self.visits.list(), filter)
    }

    // --- summary --------------------------------------------------------

    /// Dashboard counts relative to the given day.
    pub fn statistics(&self, today: NaiveDate) -> Statistics {
        let appointments_today = self
            .appointments
            .list()
            .iter()
            .filter(|a| a.scheduled_at.date() == today)
            .count();
        let pending_appointments = self
            .appointments
            .list()
            .iter()
            .filter(|a| {
                matches!(
                    a.status,
                    AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled
                )
            })
            .count();
        let todays_visits: Vec<_> = self
            .visits
            .list()
            .iter()
            .filter(|v| v.checked_in_at.date() == today)
            .collect();

        Statistics {
            total_patients: self.patients.len(),
            total_appointments: self.appointments.len(),
            total_visits: self.visits.len(),
            appointments_today,
            visits_today: todays_visits.len(),
            pending_appointments,
            completed_visits_today: todays_visits
                .iter()
                .filter(|v| v.status == VisitStatus::Completed)
                .count(),
        }
    }

    /// Rewrites all three backing files. Used before a backup so the copy
    /// set is always complete, even on a store that has never mutated.
    pub(crate) fn flush(&self) -> StoreResult<()> {
        self.patients.save()?;
        self.appointments.save()?;
        self.visits.save()
    }

    fn set_appointment_status(
        &mut self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        self.appointments.mutate(id, |a| {
            a.status = status;
            Ok(())
        })
    }

    fn check_slot(
        &self,
        doctor: &str,
        at: chrono::NaiveDateTime,
        exclude: Option<AppointmentId>,
    ) -> StoreResult<()> {
        let clash = self
            .appointments
            .list()
            .iter()
            .filter(|a| Some(a.id) != exclude)
            .find(|a| a.clashes_with(doctor, at));
        match clash {
            Some(held) => Err(StoreError::ScheduleConflict {
                doctor: held.doctor.to_string(),
                at: held.slot(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::AnnounceError;
    use crate::{appointment, patient, visit};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> ClinicStore {
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        ClinicStore::open(cfg).unwrap()
    }

    fn with_patient(store: &mut ClinicStore) -> PatientId {
        store
            .register_patient(patient::draft("Asha Rao", 34, "F", "9990001111"))
            .unwrap()
            .id
    }

    #[test]
    fn booking_requires_an_existing_patient() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let err = store
            .book_appointment(appointment::draft(
                clinic_types::EntityId::from_index(1),
                "Dr. Mehta",
                "2024-03-01T10:00:00",
            ))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "patient", .. }));
    }

    #[test]
    fn same_doctor_same_slot_is_a_conflict() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);

        store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        let err = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ScheduleConflict { .. }));

        // A different doctor, or a different slot, is fine.
        store
            .book_appointment(appointment::draft(pid, "Dr. Rao", "2024-03-01T10:00:00"))
            .unwrap();
        store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:30:00"))
            .unwrap();
    }

    #[test]
    fn cancel_and_complete_set_the_status_and_persist() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let (a1, a2) = {
            let mut store = ClinicStore::open(cfg.clone()).unwrap();
            let pid = with_patient(&mut store);
            let a1 = store
                .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
                .unwrap();
            let a2 = store
                .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T11:00:00"))
                .unwrap();
            let cancelled = store.cancel_appointment(a1.id).unwrap();
            assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
            let completed = store.complete_appointment(a2.id).unwrap();
            assert_eq!(completed.status, AppointmentStatus::Completed);
            (a1.id, a2.id)
        };
        let store = ClinicStore::open(cfg).unwrap();
        assert_eq!(
            store.appointments().get(a1).unwrap().status,
            AppointmentStatus::Cancelled
        );
        assert_eq!(
            store.appointments().get(a2).unwrap().status,
            AppointmentStatus::Completed
        );
    }

    #[test]
    fn cancelling_frees_the_slot() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);

        let a = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        store.cancel_appointment(a.id).unwrap();
        store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
    }

    #[test]
    fn reschedule_checks_the_new_slot_and_marks_status() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);

        let a = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        let b = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T11:00:00"))
            .unwrap();

        let err = store
            .reschedule_appointment(b.id, "2024-03-01T10:00:00".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::ScheduleConflict { .. }));

        let moved = store
            .reschedule_appointment(a.id, "2024-03-01T12:00:00".parse().unwrap())
            .unwrap();
        assert_eq!(moved.status, AppointmentStatus::Rescheduled);
        assert_eq!(moved.scheduled_at, "2024-03-01T12:00:00".parse().unwrap());
    }

    #[test]
    fn rescheduling_onto_your_own_slot_is_allowed() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);
        let a = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        store
            .reschedule_appointment(a.id, "2024-03-01T10:00:00".parse().unwrap())
            .unwrap();
    }

    #[test]
    fn check_in_validates_both_references() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);

        let mut d = visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00");
        d.appointment_id = Some(clinic_types::EntityId::from_index(7));
        let err = store.check_in(d).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound { kind: "appointment", .. }
        ));

        let a = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        let mut d = visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00");
        d.appointment_id = Some(a.id);
        let v = store.check_in(d).unwrap();
        assert_eq!(v.appointment_id, Some(a.id));
    }

    #[test]
    fn deleting_a_patient_does_not_cascade() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);
        store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        let v = store
            .check_in(visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00"))
            .unwrap();

        store.delete_patient(pid).unwrap();
        assert_eq!(store.appointments().len(), 1);
        assert_eq!(store.visits().len(), 1);
        assert_eq!(store.visits().get(v.id).unwrap().patient_id, pid);
    }

    #[test]
    fn patient_field_narrows_listings_to_one_history() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let asha = with_patient(&mut store);
        let vikram = store
            .register_patient(patient::draft("Vikram Shah", 41, "M", "9990002222"))
            .unwrap()
            .id;

        store
            .book_appointment(appointment::draft(asha, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        store
            .book_appointment(appointment::draft(vikram, "Dr. Mehta", "2024-03-01T11:00:00"))
            .unwrap();
        store
            .check_in(visit::draft(asha, "Dr. Mehta", "2024-03-01T10:05:00"))
            .unwrap();
        store
            .check_in(visit::draft(asha, "Dr. Rao", "2024-03-02T09:00:00"))
            .unwrap();
        store
            .check_in(visit::draft(vikram, "Dr. Mehta", "2024-03-01T11:05:00"))
            .unwrap();

        let filter = Filter::new().eq("patient", asha.to_string());
        let visits = store.search_visits(&filter).unwrap();
        assert_eq!(visits.len(), 2);
        assert!(visits.iter().all(|v| v.patient_id == asha));

        let appointments = store.search_appointments(&filter).unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].patient_id, asha);
    }

    struct CountingAnnouncer {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Announcer for CountingAnnouncer {
        fn visit_completed(&self, _p: &str, _d: &str) -> Result<(), AnnounceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("speaker unplugged".into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn completing_a_visit_fires_the_announcer_once() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let mut store = ClinicStore::open_with_announcer(
            cfg,
            Box::new(CountingAnnouncer { calls: calls.clone(), fail: false }),
        )
        .unwrap();

        let pid = with_patient(&mut store);
        let v = store
            .check_in(visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00"))
            .unwrap();
        let done = store.complete_visit(v.id).unwrap();
        assert_eq!(done.status, VisitStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Completing twice is a caller error and does not re-announce.
        let err = store.complete_visit(v.id).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn announcer_failure_never_rolls_back_the_completion() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let mut store = ClinicStore::open_with_announcer(
            cfg.clone(),
            Box::new(CountingAnnouncer { calls, fail: true }),
        )
        .unwrap();

        let pid = with_patient(&mut store);
        let v = store
            .check_in(visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00"))
            .unwrap();
        let done = store.complete_visit(v.id).unwrap();
        assert_eq!(done.status, VisitStatus::Completed);

        // The completed status is on disk despite the failed announcement.
        let reopened = ClinicStore::open(cfg).unwrap();
        assert_eq!(
            reopened.visits().get(v.id).unwrap().status,
            VisitStatus::Completed
        );
    }

    #[test]
    fn statistics_count_relative_to_the_given_day() {
        let temp = TempDir::new().unwrap();
        let mut store = open(&temp);
        let pid = with_patient(&mut store);

        store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
            .unwrap();
        let a2 = store
            .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-02T10:00:00"))
            .unwrap();
        store.complete_appointment(a2.id).unwrap();

        let v1 = store
            .check_in(visit::draft(pid, "Dr. Mehta", "2024-03-01T10:05:00"))
            .unwrap();
        store.complete_visit(v1.id).unwrap();
        store
            .check_in(visit::draft(pid, "Dr. Mehta", "2024-03-01T11:05:00"))
            .unwrap();

        let stats = store.statistics("2024-03-01".parse().unwrap());
        assert_eq!(stats.total_patients, 1);
        assert_eq!(stats.total_appointments, 2);
        assert_eq!(stats.total_visits, 2);
        assert_eq!(stats.appointments_today, 1);
        assert_eq!(stats.visits_today, 2);
        assert_eq!(stats.pending_appointments, 1);
        assert_eq!(stats.completed_visits_today, 1);
    }

    #[test]
    fn reopened_store_sees_every_completed_mutation() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(temp.path().join("data")).unwrap();
        let pid = {
            let mut store = ClinicStore::open(cfg.clone()).unwrap();
            let pid = with_patient(&mut store);
            store
                .book_appointment(appointment::draft(pid, "Dr. Mehta", "2024-03-01T10:00:00"))
                .unwrap();
            pid
        };
        let store = ClinicStore::open(cfg).unwrap();
        assert_eq!(store.patients().get(pid).unwrap().name.as_str(), "Asha Rao");
        assert_eq!(store.appointments().len(), 1);
    }
}
