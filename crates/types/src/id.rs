//! Typed record identifiers.
//!
//! Every collection in the clinic store numbers its records from a monotonic
//! counter that is persisted alongside the records and never rewound, so an
//! identifier is stable for the life of the data set and is never reissued
//! after a deletion.
//!
//! ## Canonical form
//! - A single uppercase prefix letter naming the entity kind (`P`, `A`, `V`)
//! - Followed by the counter value, zero-padded to at least four digits
//! - Examples: `P0001`, `A0042`, `V12345`
//!
//! Externally supplied identifiers (CLI input, backing files) are validated
//! through [`FromStr`]; a wrong prefix or a non-numeric tail is rejected
//! rather than silently coerced.

use std::fmt;
use std::str::FromStr;

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The input did not match the canonical `<prefix><digits>` form
    #[error("invalid {kind} id: {input}")]
    Malformed {
        /// Entity kind the identifier was parsed as
        kind: &'static str,
        /// The rejected input
        input: String,
    },
}

/// Common interface over the typed identifier newtypes.
///
/// The store's generic collection uses this to mint identifiers from its
/// persisted counter without knowing which entity it is holding.
pub trait EntityId:
    Copy + Eq + Ord + std::hash::Hash + fmt::Display + fmt::Debug + FromStr<Err = IdError>
{
    /// Uppercase prefix letter in the canonical form.
    const PREFIX: char;
    /// Human-readable entity kind, used in error messages.
    const KIND: &'static str;

    /// Builds an identifier from a raw counter value.
    fn from_index(index: u32) -> Self;

    /// Returns the raw counter value.
    fn index(self) -> u32;
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl EntityId for $name {
            const PREFIX: char = $prefix;
            const KIND: &'static str = $kind;

            fn from_index(index: u32) -> Self {
                Self(index)
            }

            fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{:04}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let malformed = || IdError::Malformed {
                    kind: $kind,
                    input: s.to_owned(),
                };
                let rest = s.strip_prefix($prefix).ok_or_else(malformed)?;
                if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let index: u32 = rest.parse().map_err(|_| malformed())?;
                Ok(Self(index))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered patient (`P0001`, `P0002`, ...).
    PatientId,
    'P',
    "patient"
);

entity_id!(
    /// Identifier of a booked appointment (`A0001`, `A0002`, ...).
    AppointmentId,
    'A',
    "appointment"
);

entity_id!(
    /// Identifier of an outpatient visit (`V0001`, `V0002`, ...).
    VisitId,
    'V',
    "visit"
);
