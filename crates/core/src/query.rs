//! Stateless filtering over a collection snapshot.
//!
//! A [`Filter`] is an ordered list of clauses combined with logical AND:
//! exact equality on enumerable fields (gender, status, doctor),
//! case-insensitive substring match on free-text fields, and inclusive date
//! ranges on date fields. Each entity exposes its fields by name through the
//! [`Queryable`] trait; naming a field the entity does not have, or applying
//! a clause kind the field cannot support, fails with
//! [`StoreError::InvalidFilter`] rather than matching nothing.
//!
//! Results preserve the input (insertion) order; the query engine never
//! sorts.

use std::borrow::Cow;

use chrono::NaiveDate;

use crate::{StoreError, StoreResult};

/// A single field value as seen by the query engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<'a> {
    /// Text-like field (names, statuses, identifiers, notes). Borrowed where
    /// the entity holds a string, owned where the value is rendered on the
    /// fly (identifiers).
    Text(Cow<'a, str>),
    /// Date-like field; timestamps are exposed at day precision.
    Date(NaiveDate),
    /// An optional field that is unset on this record. Matches nothing.
    Absent,
}

impl<'a> Field<'a> {
    /// Borrowing text field.
    pub fn text(value: &'a str) -> Self {
        Field::Text(Cow::Borrowed(value))
    }

    /// Owned text field, for values rendered from non-string types.
    pub fn owned(value: String) -> Self {
        Field::Text(Cow::Owned(value))
    }
}

/// Exposes an entity's fields to the query engine by name.
pub trait Queryable {
    /// Returns the named field, or `None` if the entity has no such field.
    fn field(&self, name: &str) -> Option<Field<'_>>;
}

#[derive(Debug, Clone)]
enum Clause {
    Eq { field: String, value: String },
    Contains { field: String, needle: String },
    Between { field: String, start: NaiveDate, end: NaiveDate },
}

impl Clause {
    fn field(&self) -> &str {
        match self {
            Clause::Eq { field, .. }
            | Clause::Contains { field, .. }
            | Clause::Between { field, .. } => field,
        }
    }
}

/// A composed predicate over one entity type.
///
/// Built with the `eq`/`contains`/`between` builder methods; an empty filter
/// matches every record.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Creates an empty filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact, case-sensitive equality clause on a text field.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a case-insensitive substring clause on a text field.
    #[must_use]
    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.clauses.push(Clause::Contains {
            field: field.into(),
            needle: needle.into(),
        });
        self
    }

    /// Adds an inclusive date-range clause on a date field.
    #[must_use]
    pub fn between(mut self, field: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.clauses.push(Clause::Between {
            field: field.into(),
            start,
            end,
        });
        self
    }

    /// Returns true when the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the filter against one record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidFilter` for an unknown field name or a
    /// clause kind the field does not support (for example a date range over
    /// a name).
    pub fn matches<T: Queryable>(&self, record: &T) -> StoreResult<bool> {
        for clause in &self.clauses {
            let field = record.field(clause.field()).ok_or_else(|| {
                StoreError::InvalidFilter(format!("unknown field: {}", clause.field()))
            })?;

            let hit = match (clause, field) {
                (_, Field::Absent) => false,
                (Clause::Eq { value, .. }, Field::Text(text)) => text.as_ref() == value,
                (Clause::Contains { needle, .. }, Field::Text(text)) => {
                    text.to_lowercase().contains(&needle.to_lowercase())
                }
                (Clause::Between { start, end, .. }, Field::Date(date)) => {
                    *start <= date && date <= *end
                }
                (Clause::Between { .. }, Field::Text(_)) => {
                    return Err(StoreError::InvalidFilter(format!(
                        "field {} does not hold a date",
                        clause.field()
                    )))
                }
                (Clause::Eq { .. } | Clause::Contains { .. }, Field::Date(_)) => {
                    return Err(StoreError::InvalidFilter(format!(
                        "field {} holds a date; use a date range",
                        clause.field()
                    )))
                }
            };

            if !hit {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Filters a snapshot, preserving insertion order.
///
/// # Errors
///
/// Fails with `StoreError::InvalidFilter` on the first record that exposes
/// the problem; since field names are static per entity type, this surfaces
/// immediately for any non-empty snapshot.
pub fn search<'a, T: Queryable>(records: &'a [T], filter: &Filter) -> StoreResult<Vec<&'a T>> {
    let mut out = Vec::new();
    for record in records {
        if filter.matches(record)? {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Row {
        name: &'static str,
        gender: &'static str,
        seen: NaiveDate,
        note: Option<&'static str>,
    }

    impl Queryable for Row {
        fn field(&self, name: &str) -> Option<Field<'_>> {
            match name {
                "name" => Some(Field::text(self.name)),
                "gender" => Some(Field::text(self.gender)),
                "seen" => Some(Field::Date(self.seen)),
                "note" => Some(self.note.map_or(Field::Absent, Field::text)),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        vec![
            Row { name: "Asha Rao", gender: "F", seen: d("2024-03-01"), note: Some("review bloods") },
            Row { name: "Vikram Shah", gender: "M", seen: d("2024-03-02"), note: None },
            Row { name: "Meena Rao", gender: "F", seen: d("2024-03-05"), note: Some("BP check") },
        ]
    }

    #[test]
    fn empty_filter_matches_everything_in_order() {
        let rows = rows();
        let hits = search(&rows, &Filter::new()).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].name, "Asha Rao");
        assert_eq!(hits[2].name, "Meena Rao");
    }

    #[test]
    fn eq_is_exact_and_preserves_order() {
        let rows = rows();
        let hits = search(&rows, &Filter::new().eq("gender", "F")).unwrap();
        assert_eq!(
            hits.iter().map(|r| r.name).collect::<Vec<_>>(),
            vec!["Asha Rao", "Meena Rao"]
        );
    }

    #[test]
    fn contains_is_case_insensitive() {
        let rows = rows();
        let hits = search(&rows, &Filter::new().contains("name", "rao")).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = search(&rows, &Filter::new().contains("name", "VIKRAM")).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn between_is_inclusive() {
        let rows = rows();
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let hits = search(
            &rows,
            &Filter::new().between("seen", d("2024-03-02"), d("2024-03-05")),
        )
        .unwrap();
        assert_eq!(
            hits.iter().map(|r| r.name).collect::<Vec<_>>(),
            vec!["Vikram Shah", "Meena Rao"]
        );
    }

    #[test]
    fn clauses_compose_with_and() {
        let rows = rows();
        let hits = search(
            &rows,
            &Filter::new().eq("gender", "F").contains("name", "meena"),
        )
        .unwrap();
        assert_eq!(hits.iter().map(|r| r.name).collect::<Vec<_>>(), vec!["Meena Rao"]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let rows = rows();
        let err = search(&rows, &Filter::new().eq("blood_type", "O")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(msg) if msg.contains("blood_type")));
    }

    #[test]
    fn clause_kind_must_suit_the_field() {
        let rows = rows();
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let err = search(
            &rows,
            &Filter::new().between("name", d("2024-01-01"), d("2024-12-31")),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));

        let err = search(&rows, &Filter::new().eq("seen", "2024-03-01")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }

    #[test]
    fn absent_optional_field_never_matches() {
        let rows = rows();
        let hits = search(&rows, &Filter::new().contains("note", "bp")).unwrap();
        assert_eq!(hits.iter().map(|r| r.name).collect::<Vec<_>>(), vec!["Meena Rao"]);
    }
}
