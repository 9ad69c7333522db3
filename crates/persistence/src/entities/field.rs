//! Field entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::field::{Field, FieldType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for field_type that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "field_type", rename_all = "snake_case")]
pub enum FieldTypeDb {
    Text,
    Textarea,
    Email,
    Checkbox,
    CheckboxMultiple,
    Select,
    SelectMultiple,
    RadioMultiple,
    File,
    Date,
    DateTime,
    DateOfBirth,
    Hidden,
    Number,
    Url,
}

impl From<FieldTypeDb> for FieldType {
    fn from(db_type: FieldTypeDb) -> Self {
        match db_type {
            FieldTypeDb::Text => FieldType::Text,
            FieldTypeDb::Textarea => FieldType::Textarea,
            FieldTypeDb::Email => FieldType::Email,
            FieldTypeDb::Checkbox => FieldType::Checkbox,
            FieldTypeDb::CheckboxMultiple => FieldType::CheckboxMultiple,
            FieldTypeDb::Select => FieldType::Select,
            FieldTypeDb::SelectMultiple => FieldType::SelectMultiple,
            FieldTypeDb::RadioMultiple => FieldType::RadioMultiple,
            FieldTypeDb::File => FieldType::File,
            FieldTypeDb::Date => FieldType::Date,
            FieldTypeDb::DateTime => FieldType::DateTime,
            FieldTypeDb::DateOfBirth => FieldType::DateOfBirth,
            FieldTypeDb::Hidden => FieldType::Hidden,
            FieldTypeDb::Number => FieldType::Number,
            FieldTypeDb::Url => FieldType::Url,
        }
    }
}

impl From<FieldType> for FieldTypeDb {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => FieldTypeDb::Text,
            FieldType::Textarea => FieldTypeDb::Textarea,
            FieldType::Email => FieldTypeDb::Email,
            FieldType::Checkbox => FieldTypeDb::Checkbox,
            FieldType::CheckboxMultiple => FieldTypeDb::CheckboxMultiple,
            FieldType::Select => FieldTypeDb::Select,
            FieldType::SelectMultiple => FieldTypeDb::SelectMultiple,
            FieldType::RadioMultiple => FieldTypeDb::RadioMultiple,
            FieldType::File => FieldTypeDb::File,
            FieldType::Date => FieldTypeDb::Date,
            FieldType::DateTime => FieldTypeDb::DateTime,
            FieldType::DateOfBirth => FieldTypeDb::DateOfBirth,
            FieldType::Hidden => FieldTypeDb::Hidden,
            FieldType::Number => FieldTypeDb::Number,
            FieldType::Url => FieldTypeDb::Url,
        }
    }
}

/// Database row mapping for the fields table.
#[derive(Debug, Clone, FromRow)]
pub struct FieldEntity {
    pub id: Uuid,
    pub form_id: Uuid,
    pub label: String,
    pub slug: String,
    pub field_type: FieldTypeDb,
    pub sort_order: i32,
    pub required: bool,
    pub visible: bool,
    pub choices: String,
    pub default_value: String,
    pub placeholder_text: Option<String>,
    pub help_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FieldEntity> for Field {
    fn from(entity: FieldEntity) -> Self {
        Self {
            id: entity.id,
            form_id: entity.form_id,
            label: entity.label,
            slug: entity.slug,
            field_type: entity.field_type.into(),
            order: entity.sort_order,
            required: entity.required,
            visible: entity.visible,
            choices: entity.choices,
            default_value: entity.default_value,
            placeholder_text: entity.placeholder_text,
            help_text: entity.help_text,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
