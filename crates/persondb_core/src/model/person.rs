//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical `Person` document and its insert-side draft.
//! - Enforce the required-name rule on construction, validation and decode.
//!
//! # Invariants
//! - `id` is assigned by the collection on insert and never changes.
//! - Every persisted person has a non-empty `name`.
//! - `favorite_foods` keeps insertion order.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier assigned by the backing collection.
pub type PersonId = Uuid;

/// Validation failures for person documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PersonValidationError {
    /// `name` is required and must not be empty.
    #[error("person validation failed: `name` is required")]
    MissingName,
    /// The nil UUID is reserved and never identifies a stored person.
    #[error("person validation failed: id must not be nil")]
    NilId,
}

/// Person document as stored in and returned by a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PersonWire")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Absent when never set or when a query projection excluded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    pub favorite_foods: Vec<String>,
}

/// Person draft without an identifier, used as insert input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "NewPersonWire")]
pub struct NewPerson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    /// Creates a draft with no age and no favorite foods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            favorite_foods: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the required-name rule.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(&self.name)
    }

    /// Binds this draft to a collection-assigned id.
    pub fn into_person(self, id: PersonId) -> Person {
        Person {
            id,
            name: self.name,
            age: self.age,
            favorite_foods: self.favorite_foods,
        }
    }
}

impl Person {
    /// Validates the document before it is written back.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.id.is_nil() {
            return Err(PersonValidationError::NilId);
        }
        validate_name(&self.name)
    }

    /// Appends one food to the end of the favorites list.
    pub fn push_favorite_food(&mut self, food: impl Into<String>) {
        self.favorite_foods.push(food.into());
    }

    /// Returns whether `food` appears anywhere in the favorites list.
    pub fn likes(&self, food: &str) -> bool {
        self.favorite_foods.iter().any(|item| item == food)
    }
}

/// Shared rule for every write path that carries a name.
pub fn validate_name(name: &str) -> Result<(), PersonValidationError> {
    if name.is_empty() {
        return Err(PersonValidationError::MissingName);
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonWire {
    id: PersonId,
    name: String,
    #[serde(default)]
    age: Option<i64>,
    #[serde(default)]
    favorite_foods: Vec<String>,
}

impl TryFrom<PersonWire> for Person {
    type Error = PersonValidationError;

    fn try_from(value: PersonWire) -> Result<Self, Self::Error> {
        let person = Person {
            id: value.id,
            name: value.name,
            age: value.age,
            favorite_foods: value.favorite_foods,
        };
        person.validate()?;
        Ok(person)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPersonWire {
    name: String,
    #[serde(default)]
    age: Option<i64>,
    #[serde(default)]
    favorite_foods: Vec<String>,
}

impl TryFrom<NewPersonWire> for NewPerson {
    type Error = PersonValidationError;

    fn try_from(value: NewPersonWire) -> Result<Self, Self::Error> {
        let draft = NewPerson {
            name: value.name,
            age: value.age,
            favorite_foods: value.favorite_foods,
        };
        draft.validate()?;
        Ok(draft)
    }
}
