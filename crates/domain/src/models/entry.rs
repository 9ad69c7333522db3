//! Form entry domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One submission of a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Entry {
    pub id: Uuid,
    pub form_id: Uuid,
    pub entry_time: DateTime<Utc>,
    pub fields: Vec<FieldEntry>,
}

impl Entry {
    /// Stored value for a field, if the entry has one.
    pub fn value_for(&self, field_id: Uuid) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field_id == field_id)
            .and_then(|f| f.value.as_deref())
    }
}

/// A single field value of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldEntry {
    pub field_id: Uuid,
    pub value: Option<String>,
}

/// Input for persisting a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub form_id: Uuid,
    pub entry_time: DateTime<Utc>,
    pub fields: Vec<FieldEntry>,
    /// Set when the form records who submitted it.
    pub user_id: Option<Uuid>,
}

/// A raw submitted value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    Many(Vec<String>),
}

/// Request payload for submitting an entry, keyed by field slug.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubmitEntryRequest {
    #[serde(default)]
    pub fields: HashMap<String, Option<SubmittedValue>>,
}

/// Response after a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SubmitEntryResponse {
    pub entry_id: Uuid,
    pub entry_time: DateTime<Utc>,
    pub message: String,
}

/// Response for the staff entry listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListEntriesResponse {
    pub data: Vec<Entry>,
    pub count: usize,
}
