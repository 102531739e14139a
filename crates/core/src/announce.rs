//! Announcer capability.
//!
//! The desktop shell announces a patient's name over text-to-speech when
//! their visit completes. The core only knows the seam: an [`Announcer`]
//! injected into the store, called once per completion with plain text. A
//! failing announcer is logged by the store and never rolls back or blocks
//! the visit update.

/// Boxed error type for announcer implementations.
pub type AnnounceError = Box<dyn std::error::Error + Send + Sync>;

/// Receives visit-completion notifications.
pub trait Announcer {
    /// Called once when a visit transitions to completed.
    ///
    /// # Errors
    ///
    /// Implementations may fail (audio device missing, external process
    /// gone); the store logs and discards the error.
    fn visit_completed(&self, patient_name: &str, doctor_name: &str) -> Result<(), AnnounceError>;
}

/// Announcer that does nothing. The default when no shell is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnnouncer;

impl Announcer for NullAnnouncer {
    fn visit_completed(&self, _patient_name: &str, _doctor_name: &str) -> Result<(), AnnounceError> {
        Ok(())
    }
}

/// Announcer that writes to the log instead of a speaker. Used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn visit_completed(&self, patient_name: &str, doctor_name: &str) -> Result<(), AnnounceError> {
        tracing::info!(patient = patient_name, doctor = doctor_name, "visit completed");
        Ok(())
    }
}
