//! Target-schema shape consumed by mapping suggestion and validation.
//!
//! The catalogue of schemas per entity type is an external collaborator;
//! this module only defines the shape it must produce.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field Type
// ---------------------------------------------------------------------------

/// Primitive type of a target field, driving the per-field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Date,
    Email,
    /// Value must be one of the field's `allowed_values`.
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Email => "email",
            Self::Enum => "enum",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Target Field / Schema
// ---------------------------------------------------------------------------

/// One field of a target entity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetField {
    /// Canonical field name records are written under.
    pub name: String,

    /// Human-readable label for mapping UIs.
    pub label: String,

    pub field_type: FieldType,

    /// Required fields that end up missing or blank classify the row as
    /// Error.
    pub required: bool,

    /// Soft cap; longer values classify as Warning, not Error.
    pub max_length: Option<usize>,

    /// Allowed values for [`FieldType::Enum`] fields.
    pub allowed_values: Option<Vec<String>>,
}

impl TargetField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            max_length: None,
            allowed_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Target schema for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSchema {
    pub entity_type: String,
    pub fields: Vec<TargetField>,

    /// Field whose value identifies a record for the tenant-wide
    /// duplicate check, when the entity type has one.
    pub unique_field: Option<String>,
}

impl TargetSchema {
    pub fn new(entity_type: impl Into<String>, fields: Vec<TargetField>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields,
            unique_field: None,
        }
    }

    pub fn unique_by(mut self, field: impl Into<String>) -> Self {
        self.unique_field = Some(field.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &TargetField> {
        self.fields.iter().filter(|f| f.required)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
