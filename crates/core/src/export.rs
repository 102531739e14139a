//! Tabular export of record listings and report rows.
//!
//! A pure read-only projection: entities describe their columns through the
//! [`Tabular`] trait and an [`Exporter`] renders the rows. The bundled
//! [`CsvExporter`] writes comma-separated text with a header row and quotes
//! any field containing the delimiter, a quote or a newline. Nothing here
//! feeds back into the store.

use std::io::Write;

use crate::appointment::Appointment;
use crate::patient::Patient;
use crate::report::ReportRow;
use crate::visit::Visit;
use crate::StoreResult;

/// A record that can be projected to a fixed-order row of text fields.
pub trait Tabular {
    /// Column names, in the order rows are emitted.
    const COLUMNS: &'static [&'static str];

    /// The record rendered as one field per column.
    fn row(&self) -> Vec<String>;
}

/// Renders tabular data somewhere.
pub trait Exporter {
    /// Emits the header row.
    fn begin(&mut self, columns: &[&str]) -> StoreResult<()>;

    /// Emits one data row.
    fn row(&mut self, fields: &[String]) -> StoreResult<()>;
}

/// Writes every record of a listing through an exporter.
pub fn export_all<T: Tabular>(records: &[T], out: &mut dyn Exporter) -> StoreResult<()> {
    out.begin(T::COLUMNS)?;
    for record in records {
        out.row(&record.row())?;
    }
    Ok(())
}

/// CSV renderer over any writer.
pub struct CsvExporter<W: Write> {
    writer: W,
}

impl<W: Write> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> StoreResult<()> {
        let line = fields
            .iter()
            .map(|f| quote(f.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{line}")?;
        Ok(())
    }
}

impl<W: Write> Exporter for CsvExporter<W> {
    fn begin(&mut self, columns: &[&str]) -> StoreResult<()> {
        self.write_line(columns)
    }

    fn row(&mut self, fields: &[String]) -> StoreResult<()> {
        self.write_line(fields)
    }
}

fn quote(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

impl Tabular for Patient {
    const COLUMNS: &'static [&'static str] = &[
        "id", "name", "age", "gender", "phone", "address", "contact", "registered_at",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            self.age.to_string(),
            self.gender.to_string(),
            self.phone.to_string(),
            self.address.clone(),
            self.contact.clone(),
            self.registered_at.to_string(),
        ]
    }
}

impl Tabular for Appointment {
    const COLUMNS: &'static [&'static str] = &[
        "id", "patient_id", "doctor", "department", "scheduled_at", "status", "notes",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.patient_id.to_string(),
            self.doctor.to_string(),
            self.department.to_string(),
            self.scheduled_at.to_string(),
            self.status.to_string(),
            self.notes.clone(),
        ]
    }
}

impl Tabular for Visit {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "patient_id",
        "appointment_id",
        "doctor",
        "checked_in_at",
        "symptoms",
        "diagnosis",
        "prescription",
        "status",
        "follow_up",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.patient_id.to_string(),
            self.appointment_id.map(|a| a.to_string()).unwrap_or_default(),
            self.doctor.to_string(),
            self.checked_in_at.to_string(),
            self.symptoms.to_string(),
            self.diagnosis.clone(),
            self.prescription.clone(),
            self.status.to_string(),
            self.follow_up.map(|d| d.to_string()).unwrap_or_default(),
        ]
    }
}

impl Tabular for ReportRow {
    const COLUMNS: &'static [&'static str] = &["bucket", "group", "count"];

    fn row(&self) -> Vec<String> {
        vec![
            self.bucket.to_string(),
            self.group.clone().unwrap_or_default(),
            self.count.to_string(),
        ]
    }
}
