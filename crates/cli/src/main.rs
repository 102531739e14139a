//! Command-line surface over the clinic record core.
//!
//! This is the "forms" layer: it resolves the data directory once, opens a
//! [`ClinicStore`] and maps each subcommand onto a core operation. All
//! business rules (validation, slot clashes, referential checks) live in
//! `clinic-core`; this binary only parses input and prints results.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use clinic_core::{
    appointment_summary, backup, consultation_counts, export_all, restore, visit_volume,
    AppointmentDraft, ClinicStore, CoreConfig, CsvExporter, Filter, GroupBy, LogAnnouncer,
    PatientDraft, PatientPatch, Period, ReportRow, Tabular, VisitDraft, VisitPatch,
};
use clinic_types::{AppointmentId, PatientId, VisitId};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Offline clinic records: patients, appointments, OPD visits, reports")]
struct Cli {
    /// Data directory (falls back to CLINIC_DATA_DIR, then ./clinic_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patient registration and lookup
    Patient {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Appointment booking and lifecycle
    Appointment {
        #[command(subcommand)]
        command: AppointmentCommands,
    },
    /// Outpatient visit lifecycle
    Visit {
        #[command(subcommand)]
        command: VisitCommands,
    },
    /// Aggregate reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Overall counts for today
    Stats,
    /// Copy the backing files to a directory
    Backup { dir: PathBuf },
    /// Restore the backing files from a directory
    Restore { dir: PathBuf },
    /// Dump a collection as CSV
    Export {
        what: ExportTarget,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// Register a new patient
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        contact: String,
    },
    /// List all patients in registration order
    List,
    /// Search patients
    Search {
        /// Case-insensitive substring on the name
        #[arg(long)]
        name: Option<String>,
        /// Exact gender match
        #[arg(long)]
        gender: Option<String>,
        /// Case-insensitive substring on the phone number
        #[arg(long)]
        phone: Option<String>,
        /// Registered on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Registered on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Update fields of an existing patient
    Update {
        id: PatientId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Delete a patient (appointments and visits are kept)
    Remove { id: PatientId },
}

#[derive(Subcommand)]
enum AppointmentCommands {
    /// Book an appointment slot
    Book {
        patient: PatientId,
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        department: String,
        /// Slot, e.g. "2024-03-01 10:00"
        #[arg(long, value_parser = parse_datetime)]
        at: NaiveDateTime,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List appointments, optionally narrowed
    List {
        /// Only appointments for this patient
        #[arg(long)]
        patient: Option<PatientId>,
        #[arg(long)]
        doctor: Option<String>,
        /// Scheduled / Rescheduled / Cancelled / Completed
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Move an appointment to a new slot
    Reschedule {
        id: AppointmentId,
        #[arg(long, value_parser = parse_datetime)]
        at: NaiveDateTime,
    },
    /// Cancel an appointment, releasing its slot
    Cancel { id: AppointmentId },
    /// Mark an appointment completed
    Complete { id: AppointmentId },
}

#[derive(Subcommand)]
enum VisitCommands {
    /// Check a patient in
    Open {
        patient: PatientId,
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        symptoms: String,
        /// Appointment being honoured, if booked in advance
        #[arg(long)]
        appointment: Option<AppointmentId>,
    },
    /// Record clinical outcome on an open visit
    Record {
        id: VisitId,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        prescription: Option<String>,
        /// Follow-up date (YYYY-MM-DD)
        #[arg(long)]
        follow_up: Option<NaiveDate>,
    },
    /// Complete a visit (announces the patient)
    Complete { id: VisitId },
    /// List visits, optionally narrowed
    List {
        /// Only visits for this patient
        #[arg(long)]
        patient: Option<PatientId>,
        #[arg(long)]
        doctor: Option<String>,
        /// InProgress / Completed
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Visit traffic, every status
    Visits {
        #[command(flatten)]
        opts: ReportOpts,
    },
    /// Completed consultations only
    Consultations {
        #[command(flatten)]
        opts: ReportOpts,
    },
    /// Appointment summary (status / doctor / department breakdown)
    Appointments {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(clap::Args)]
struct ReportOpts {
    #[arg(long, value_enum, default_value_t = PeriodArg::Day)]
    period: PeriodArg,
    /// Group rows per doctor
    #[arg(long)]
    by_doctor: bool,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Day,
    Week,
    Month,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => Period::Day,
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportTarget {
    Patients,
    Appointments,
    Visits,
}

fn parse_datetime(input: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(input, f).ok())
        .ok_or_else(|| format!("invalid date-time: {input} (expected YYYY-MM-DD HH:MM)"))
}

fn range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    match (from, to) {
        (Some(start), Some(end)) => Some((start, end)),
        (Some(start), None) => Some((start, NaiveDate::MAX)),
        (None, Some(end)) => Some((NaiveDate::MIN, end)),
        (None, None) => None,
    }
}

fn data_dir(cli_arg: Option<PathBuf>) -> PathBuf {
    cli_arg
        .or_else(|| std::env::var_os("CLINIC_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./clinic_data"))
}

fn print_rows(rows: &[ReportRow]) {
    if rows.is_empty() {
        println!("No records in range.");
        return;
    }
    for row in rows {
        match &row.group {
            Some(group) => println!("{}  {:<24} {}", row.bucket, group, row.count),
            None => println!("{}  {}", row.bucket, row.count),
        }
    }
}

fn export_csv<T: Tabular>(records: &[T], out: Option<PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut exporter = CsvExporter::new(file);
            export_all(records, &mut exporter)?;
            exporter.into_inner().flush()?;
            println!("Wrote {} rows to {}", records.len(), path.display());
        }
        None => {
            let mut exporter = CsvExporter::new(std::io::stdout().lock());
            export_all(records, &mut exporter)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::new(data_dir(cli.data_dir))?;
    let now = Local::now().naive_local();

    match cli.command {
        Commands::Patient { command } => {
            let mut store = ClinicStore::open(cfg)?;
            match command {
                PatientCommands::Add { name, age, gender, phone, address, contact } => {
                    let patient = store.register_patient(PatientDraft {
                        name,
                        age,
                        gender,
                        phone,
                        address,
                        contact,
                        registered_at: now,
                    })?;
                    println!("Registered {} as {}", patient.name, patient.id);
                }
                PatientCommands::List => {
                    for p in store.patients().list() {
                        println!("{}  {:<24} {:>3}  {:<6} {}", p.id, p.name, p.age, p.gender, p.phone);
                    }
                }
                PatientCommands::Search { name, gender, phone, from, to } => {
                    let mut filter = Filter::new();
                    if let Some(name) = name {
                        filter = filter.contains("name", name);
                    }
                    if let Some(gender) = gender {
                        filter = filter.eq("gender", gender);
                    }
                    if let Some(phone) = phone {
                        filter = filter.contains("phone", phone);
                    }
                    if let Some((start, end)) = range(from, to) {
                        filter = filter.between("registered", start, end);
                    }
                    for p in store.search_patients(&filter)? {
                        println!("{}  {:<24} {:>3}  {:<6} {}", p.id, p.name, p.age, p.gender, p.phone);
                    }
                }
                PatientCommands::Update { id, name, age, gender, phone, address, contact } => {
                    let patient = store.update_patient(
                        id,
                        PatientPatch { name, age, gender, phone, address, contact },
                    )?;
                    println!("Updated {}", patient.id);
                }
                PatientCommands::Remove { id } => {
                    store.delete_patient(id)?;
                    println!("Deleted {id}");
                }
            }
        }

        Commands::Appointment { command } => {
            let mut store = ClinicStore::open(cfg)?;
            match command {
                AppointmentCommands::Book { patient, doctor, department, at, notes } => {
                    let appointment = store.book_appointment(AppointmentDraft {
                        patient_id: patient,
                        doctor,
                        department,
                        scheduled_at: at,
                        notes,
                        created_at: now,
                    })?;
                    println!(
                        "Booked {} with {} at {}",
                        appointment.id, appointment.doctor, appointment.scheduled_at
                    );
                }
                AppointmentCommands::List { patient, doctor, status, from, to } => {
                    let mut filter = Filter::new();
                    if let Some(patient) = patient {
                        filter = filter.eq("patient", patient.to_string());
                    }
                    if let Some(doctor) = doctor {
                        filter = filter.eq("doctor", doctor);
                    }
                    if let Some(status) = status {
                        filter = filter.eq("status", status);
                    }
                    if let Some((start, end)) = range(from, to) {
                        filter = filter.between("scheduled", start, end);
                    }
                    for a in store.search_appointments(&filter)? {
                        println!(
                            "{}  {}  {:<20} {:<18} {}  {}",
                            a.id, a.patient_id, a.doctor, a.department, a.scheduled_at, a.status
                        );
                    }
                }
                AppointmentCommands::Reschedule { id, at } => {
                    let appointment = store.reschedule_appointment(id, at)?;
                    println!("Rescheduled {} to {}", appointment.id, appointment.scheduled_at);
                }
                AppointmentCommands::Cancel { id } => {
                    store.cancel_appointment(id)?;
                    println!("Cancelled {id}");
                }
                AppointmentCommands::Complete { id } => {
                    store.complete_appointment(id)?;
                    println!("Completed {id}");
                }
            }
        }

        Commands::Visit { command } => {
            let mut store = ClinicStore::open_with_announcer(cfg, Box::new(LogAnnouncer))?;
            match command {
                VisitCommands::Open { patient, doctor, symptoms, appointment } => {
                    let visit = store.check_in(VisitDraft {
                        patient_id: patient,
                        appointment_id: appointment,
                        doctor,
                        checked_in_at: now,
                        symptoms,
                    })?;
                    println!("Opened visit {} for {}", visit.id, visit.patient_id);
                }
                VisitCommands::Record { id, diagnosis, prescription, follow_up } => {
                    let visit = store.record_outcome(
                        id,
                        VisitPatch {
                            diagnosis,
                            prescription,
                            follow_up: follow_up.map(Some),
                            ..Default::default()
                        },
                    )?;
                    println!("Recorded outcome on {}", visit.id);
                }
                VisitCommands::Complete { id } => {
                    let visit = store.complete_visit(id)?;
                    println!("Completed visit {} ({})", visit.id, visit.doctor);
                }
                VisitCommands::List { patient, doctor, status } => {
                    let mut filter = Filter::new();
                    if let Some(patient) = patient {
                        filter = filter.eq("patient", patient.to_string());
                    }
                    if let Some(doctor) = doctor {
                        filter = filter.eq("doctor", doctor);
                    }
                    if let Some(status) = status {
                        filter = filter.eq("status", status);
                    }
                    for v in store.search_visits(&filter)? {
                        println!(
                            "{}  {}  {:<20} {}  {}",
                            v.id, v.patient_id, v.doctor, v.checked_in_at, v.status
                        );
                    }
                }
            }
        }

        Commands::Report { command } => {
            let store = ClinicStore::open(cfg)?;
            match command {
                ReportCommands::Visits { opts } => {
                    let group = if opts.by_doctor { GroupBy::Doctor } else { GroupBy::None };
                    let rows = visit_volume(
                        store.visits().list(),
                        group,
                        opts.period.into(),
                        range(opts.from, opts.to),
                    );
                    print_rows(&rows);
                }
                ReportCommands::Consultations { opts } => {
                    let group = if opts.by_doctor { GroupBy::Doctor } else { GroupBy::None };
                    let rows = consultation_counts(
                        store.visits().list(),
                        group,
                        opts.period.into(),
                        range(opts.from, opts.to),
                    );
                    print_rows(&rows);
                }
                ReportCommands::Appointments { from, to } => {
                    let summary = appointment_summary(store.appointments().list(), range(from, to));
                    println!("Total appointments: {}", summary.total);
                    println!("Completion rate: {:.1}%", summary.completion_rate * 100.0);
                    println!("By status:");
                    for (status, count) in &summary.by_status {
                        println!("  {status:<14} {count}");
                    }
                    println!("By doctor:");
                    for (doctor, count) in &summary.by_doctor {
                        println!("  {doctor:<24} {count}");
                    }
                    println!("By department:");
                    for (department, count) in &summary.by_department {
                        println!("  {department:<24} {count}");
                    }
                }
            }
        }

        Commands::Stats => {
            let store = ClinicStore::open(cfg)?;
            let stats = store.statistics(now.date());
            println!("Patients:            {}", stats.total_patients);
            println!("Appointments:        {}", stats.total_appointments);
            println!("Visits:              {}", stats.total_visits);
            println!("Appointments today:  {}", stats.appointments_today);
            println!("Visits today:        {}", stats.visits_today);
            println!("Pending bookings:    {}", stats.pending_appointments);
            println!("Completed today:     {}", stats.completed_visits_today);
        }

        Commands::Backup { dir } => {
            let store = ClinicStore::open(cfg)?;
            backup(&store, &dir)?;
            println!("Backup written to {}", dir.display());
        }

        Commands::Restore { dir } => {
            let store = restore(&dir, cfg)?;
            println!(
                "Restored {} patients, {} appointments, {} visits",
                store.patients().len(),
                store.appointments().len(),
                store.visits().len()
            );
        }

        Commands::Export { what, out } => {
            let store = ClinicStore::open(cfg)?;
            match what {
                ExportTarget::Patients => export_csv(store.patients().list(), out)?,
                ExportTarget::Appointments => export_csv(store.appointments().list(), out)?,
                ExportTarget::Visits => export_csv(store.visits().list(), out)?,
            }
        }
    }

    Ok(())
}
