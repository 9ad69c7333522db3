//! Entry entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::entry::{Entry, FieldEntry};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// Database row mapping for the form_entries table.
#[derive(Debug, Clone, FromRow)]
pub struct EntryEntity {
    pub id: Uuid,
    pub form_id: Uuid,
    pub entry_time: DateTime<Utc>,
}

/// Database row mapping for the field_entries table.
#[derive(Debug, Clone, FromRow)]
pub struct FieldEntryEntity {
    pub entry_id: Uuid,
    pub field_id: Uuid,
    pub value: Option<String>,
}

/// Groups field entry rows under their entries, keeping entry order.
pub fn assemble_entries(entries: Vec<EntryEntity>, field_entries: Vec<FieldEntryEntity>) -> Vec<Entry> {
    let mut by_entry: HashMap<Uuid, Vec<FieldEntry>> = HashMap::new();
    for row in field_entries {
        by_entry.entry(row.entry_id).or_default().push(FieldEntry {
            field_id: row.field_id,
            value: row.value,
        });
    }

    entries
        .into_iter()
        .map(|entry| Entry {
            fields: by_entry.remove(&entry.id).unwrap_or_default(),
            id: entry.id,
            form_id: entry.form_id,
            entry_time: entry.entry_time,
        })
        .collect()
}
