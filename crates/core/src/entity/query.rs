//! Store-neutral predicates and bulk mutations.
//!
//! Filters are plain data rather than closures so that every backend can
//! evaluate them: the in-memory store walks them directly and the SQLite
//! store renders them into a `WHERE` clause.

use std::fmt;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::{Entity, ValidationError};

/// A single scalar value of an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uuid(Uuid),
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Null,
}

impl FieldValue {
    pub fn into_uuid(self, field: &str) -> Result<Uuid, ValidationError> {
        match self {
            FieldValue::Uuid(id) => Ok(id),
            FieldValue::Text(s) => Uuid::parse_str(&s).map_err(|_| mismatch(field, "uuid")),
            _ => Err(mismatch(field, "uuid")),
        }
    }

    pub fn into_text(self, field: &str) -> Result<String, ValidationError> {
        match self {
            FieldValue::Text(s) => Ok(s),
            _ => Err(mismatch(field, "text")),
        }
    }

    pub fn into_optional_text(self, field: &str) -> Result<Option<String>, ValidationError> {
        match self {
            FieldValue::Null => Ok(None),
            other => other.into_text(field).map(Some),
        }
    }

    pub fn into_integer(self, field: &str) -> Result<i64, ValidationError> {
        match self {
            FieldValue::Integer(n) => Ok(n),
            _ => Err(mismatch(field, "integer")),
        }
    }

    pub fn into_decimal(self, field: &str) -> Result<Decimal, ValidationError> {
        match self {
            FieldValue::Decimal(d) => Ok(d),
            FieldValue::Integer(n) => Ok(Decimal::from(n)),
            _ => Err(mismatch(field, "decimal")),
        }
    }
}

fn mismatch(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected,
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Uuid(id) => write!(f, "{id}"),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A predicate over entity fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { field: String, value: FieldValue },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Matches the entity with the given id.
    pub fn id(id: Uuid) -> Self {
        Filter::eq("id", id)
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// Fails with [`ValidationError::UnknownField`] when the filter names a
    /// field outside `known`.
    pub fn check_fields(&self, known: &[&str]) -> Result<(), ValidationError> {
        match self {
            Filter::Eq { field, .. } => {
                if known.contains(&field.as_str()) {
                    Ok(())
                } else {
                    Err(ValidationError::UnknownField(field.clone()))
                }
            }
            Filter::And(filters) | Filter::Or(filters) => {
                filters.iter().try_for_each(|f| f.check_fields(known))
            }
        }
    }

    /// Evaluates the filter against an entity.
    ///
    /// An empty `And` matches everything, an empty `Or` matches nothing.
    /// Unknown fields never match.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Filter::Eq { field, value } => entity.field(field).as_ref() == Some(value),
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entity)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq { field, value } => write!(f, "{field} == {value}"),
            Filter::And(filters) => write_joined(f, filters, " && "),
            Filter::Or(filters) => write_joined(f, filters, " || "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, filters: &[Filter], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{filter}")?;
    }
    write!(f, ")")
}

/// A list of field assignments applied to every row matched by a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    assignments: Vec<(String, FieldValue)>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    pub fn assignments(&self) -> &[(String, FieldValue)] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Rejects assignments to unknown fields or to `id`.
    pub fn check_fields(&self, known: &[&str]) -> Result<(), ValidationError> {
        for (field, _) in &self.assignments {
            if field == "id" {
                return Err(ValidationError::ReadOnly(field.clone()));
            }
            if !known.contains(&field.as_str()) {
                return Err(ValidationError::UnknownField(field.clone()));
            }
        }
        Ok(())
    }

    /// Applies every assignment to `entity` and re-validates it.
    pub fn apply<E: Entity>(&self, entity: &mut E) -> Result<(), ValidationError> {
        for (field, value) in &self.assignments {
            entity.set_field(field, value.clone())?;
        }
        entity.validate()
    }
}
