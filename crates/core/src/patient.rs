//! Patient records.
//!
//! A patient is created from a [`PatientDraft`], which carries raw form
//! input; validation happens once at construction and the stored record then
//! only holds already-validated types. Updates go through [`PatientPatch`]
//! with every field optional, so a caller can change one field without
//! restating the rest.

use chrono::NaiveDateTime;
use clinic_types::{NonEmptyText, PatientId, PhoneNumber};
use serde::{Deserialize, Serialize};

use crate::collection::Entity;
use crate::query::{Field, Queryable};
use crate::{StoreError, StoreResult};

const MAX_AGE: u32 = 150;

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Stable identifier, assigned at registration and never reused.
    pub id: PatientId,
    pub name: NonEmptyText,
    pub age: u8,
    pub gender: NonEmptyText,
    pub phone: PhoneNumber,
    /// Postal address, free text. May be empty.
    #[serde(default)]
    pub address: String,
    /// Alternate contact or next of kin, free text. May be empty.
    #[serde(default)]
    pub contact: String,
    /// When the patient was registered.
    pub registered_at: NaiveDateTime,
}

/// Raw registration input, validated when the record is created.
#[derive(Debug, Clone)]
pub struct PatientDraft {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    pub address: String,
    pub contact: String,
    pub registered_at: NaiveDateTime,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

fn check_age(age: u32) -> StoreResult<u8> {
    if age == 0 || age > MAX_AGE {
        return Err(StoreError::Validation(format!(
            "age must be between 1 and {MAX_AGE}, got {age}"
        )));
    }
    Ok(age as u8)
}

impl Entity for Patient {
    type Id = PatientId;
    type Draft = PatientDraft;
    type Patch = PatientPatch;

    fn new(id: PatientId, draft: PatientDraft) -> StoreResult<Self> {
        let name = NonEmptyText::new(&draft.name)
            .map_err(|_| StoreError::Validation("patient name is required".into()))?;
        let gender = NonEmptyText::new(&draft.gender)
            .map_err(|_| StoreError::Validation("patient gender is required".into()))?;
        let phone = PhoneNumber::new(&draft.phone)
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let age = check_age(draft.age)?;

        Ok(Self {
            id,
            name,
            age,
            gender,
            phone,
            address: draft.address.trim().to_owned(),
            contact: draft.contact.trim().to_owned(),
            registered_at: draft.registered_at,
        })
    }

    fn id(&self) -> PatientId {
        self.id
    }

    fn apply(&mut self, patch: PatientPatch) -> StoreResult<()> {
        if let Some(name) = patch.name {
            self.name = NonEmptyText::new(&name)
                .map_err(|_| StoreError::Validation("patient name is required".into()))?;
        }
        if let Some(age) = patch.age {
            self.age = check_age(age)?;
        }
        if let Some(gender) = patch.gender {
            self.gender = NonEmptyText::new(&gender)
                .map_err(|_| StoreError::Validation("patient gender is required".into()))?;
        }
        if let Some(phone) = patch.phone {
            self.phone =
                PhoneNumber::new(&phone).map_err(|e| StoreError::Validation(e.to_string()))?;
        }
        if let Some(address) = patch.address {
            self.address = address.trim().to_owned();
        }
        if let Some(contact) = patch.contact {
            self.contact = contact.trim().to_owned();
        }
        Ok(())
    }
}

impl Queryable for Patient {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        match name {
            "name" => Some(Field::text(self.name.as_str())),
            "gender" => Some(Field::text(self.gender.as_str())),
            "phone" => Some(Field::text(self.phone.as_str())),
            "address" => Some(Field::text(&self.address)),
            "contact" => Some(Field::text(&self.contact)),
            "registered" => Some(Field::Date(self.registered_at.date())),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn draft(name: &str, age: u32, gender: &str, phone: &str) -> PatientDraft {
    PatientDraft {
        name: name.to_owned(),
        age,
        gender: gender.to_owned(),
        phone: phone.to_owned(),
        address: String::new(),
        contact: String::new(),
        registered_at: "2024-03-01T09:00:00".parse().unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_types::EntityId;

    #[test]
    fn new_validates_and_trims() {
        let mut d = draft("  Asha Rao ", 34, "F", "9990001111");
        d.address = "  12 Lake Road ".into();
        let p = Patient::new(PatientId::from_index(1), d).unwrap();
        assert_eq!(p.name.as_str(), "Asha Rao");
        assert_eq!(p.address, "12 Lake Road");
        assert_eq!(p.id.to_string(), "P0001");
    }

    #[test]
    fn new_rejects_bad_input() {
        let cases = [
            draft("", 34, "F", "9990001111"),
            draft("Asha Rao", 0, "F", "9990001111"),
            draft("Asha Rao", 200, "F", "9990001111"),
            draft("Asha Rao", 34, "", "9990001111"),
            draft("Asha Rao", 34, "F", "not a phone"),
        ];
        for d in cases {
            assert!(matches!(
                Patient::new(PatientId::from_index(1), d),
                Err(StoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn patch_leaves_unset_fields_alone() {
        let mut p =
            Patient::new(PatientId::from_index(1), draft("Asha Rao", 34, "F", "9990001111"))
                .unwrap();
        p.apply(PatientPatch {
            age: Some(35),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.age, 35);
        assert_eq!(p.name.as_str(), "Asha Rao");
    }

    #[test]
    fn patch_validates_changed_fields() {
        let mut p =
            Patient::new(PatientId::from_index(1), draft("Asha Rao", 34, "F", "9990001111"))
                .unwrap();
        let err = p
            .apply(PatientPatch {
                phone: Some("nope".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
