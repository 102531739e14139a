//! Report aggregation over collection snapshots.
//!
//! Reports are deterministic projections: each record contributes its
//! relevant timestamp (visit check-in, appointment slot) to a period bucket,
//! optionally grouped by doctor. Buckets with no records are omitted — the
//! renderer fills gaps if it wants a dense timeline. Output order is
//! ascending bucket date, then lexical group key.
//!
//! Doctor-wise consultation counts come from completed visits only;
//! appointment traffic is summarised separately by
//! [`appointment_summary`], which counts every status.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::appointment::{Appointment, AppointmentStatus};
use crate::visit::{Visit, VisitStatus};

/// Bucketing period for report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

/// Grouping dimension for report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// One row per bucket.
    None,
    /// One row per (bucket, doctor) pair.
    Doctor,
}

/// One aggregated report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Period-truncated bucket key (day itself, ISO week Monday, or first of
    /// month).
    pub bucket: NaiveDate,
    /// Group key; `None` under [`GroupBy::None`].
    pub group: Option<String>,
    pub count: u64,
}

/// Truncates a date to the start of its bucket.
pub fn bucket_start(date: NaiveDate, period: Period) -> NaiveDate {
    match period {
        Period::Day => date,
        // ISO week starts on Monday.
        Period::Week => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Period::Month => date.with_day(1).unwrap_or(date),
    }
}

/// Aggregates `(date, group key)` samples into sparse, ordered report rows.
///
/// Samples outside `range` (inclusive, when given) are skipped before
/// bucketing. The `BTreeMap` key order gives the required ordering for free:
/// ascending bucket date, then `None` before lexically ascending group keys.
pub fn aggregate<'a>(
    samples: impl IntoIterator<Item = (NaiveDate, Option<&'a str>)>,
    group_by: GroupBy,
    period: Period,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<ReportRow> {
    let mut buckets: BTreeMap<(NaiveDate, Option<String>), u64> = BTreeMap::new();

    for (date, group) in samples {
        if let Some((start, end)) = range {
            if date < start || date > end {
                continue;
            }
        }
        let group = match group_by {
            GroupBy::None => None,
            GroupBy::Doctor => group.map(str::to_owned),
        };
        *buckets.entry((bucket_start(date, period), group)).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((bucket, group), count)| ReportRow { bucket, group, count })
        .collect()
}

/// Visit traffic: every visit in range, regardless of status.
pub fn visit_volume(
    visits: &[Visit],
    group_by: GroupBy,
    period: Period,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<ReportRow> {
    aggregate(
        visits
            .iter()
            .map(|v| (v.checked_in_at.date(), Some(v.doctor.as_str()))),
        group_by,
        period,
        range,
    )
}

/// Consultation counts: completed visits only. Scheduled or cancelled
/// appointments never show up here.
pub fn consultation_counts(
    visits: &[Visit],
    group_by: GroupBy,
    period: Period,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<ReportRow> {
    aggregate(
        visits
            .iter()
            .filter(|v| v.status == VisitStatus::Completed)
            .map(|v| (v.checked_in_at.date(), Some(v.doctor.as_str()))),
        group_by,
        period,
        range,
    )
}

/// Appointment traffic by slot date, every status included.
pub fn appointment_volume(
    appointments: &[Appointment],
    group_by: GroupBy,
    period: Period,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<ReportRow> {
    aggregate(
        appointments
            .iter()
            .map(|a| (a.scheduled_at.date(), Some(a.doctor.as_str()))),
        group_by,
        period,
        range,
    )
}

/// Status/doctor/department breakdown of appointment traffic in a date
/// range.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentSummary {
    pub total: u64,
    /// Completed appointments as a fraction of the total, 0 when empty.
    pub completion_rate: f64,
    /// Counts per status, lexically ordered.
    pub by_status: Vec<(String, u64)>,
    /// Counts per doctor, lexically ordered.
    pub by_doctor: Vec<(String, u64)>,
    /// Counts per department, lexically ordered.
    pub by_department: Vec<(String, u64)>,
}

/// Summarises appointments whose slot date falls inside `range` (inclusive,
/// when given).
pub fn appointment_summary(
    appointments: &[Appointment],
    range: Option<(NaiveDate, NaiveDate)>,
) -> AppointmentSummary {
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_doctor: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_department: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0u64;
    let mut completed = 0u64;

    for a in appointments {
        let date = a.scheduled_at.date();
        if let Some((start, end)) = range {
            if date < start || date > end {
                continue;
            }
        }
        total += 1;
        if a.status == AppointmentStatus::Completed {
            completed += 1;
        }
        *by_status.entry(a.status.as_str().to_owned()).or_insert(0) += 1;
        *by_doctor.entry(a.doctor.as_str().to_owned()).or_insert(0) += 1;
        *by_department
            .entry(a.department.as_str().to_owned())
            .or_insert(0) += 1;
    }

    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    };

    AppointmentSummary {
        total,
        completion_rate,
        by_status: by_status.into_iter().collect(),
        by_doctor: by_doctor.into_iter().collect(),
        by_department: by_department.into_iter().collect(),
    }
}
