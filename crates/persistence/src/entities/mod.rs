//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod entry;
pub mod field;
pub mod form;
pub mod user;

pub use entry::{assemble_entries, EntryEntity, FieldEntryEntity};
pub use field::{FieldEntity, FieldTypeDb};
pub use form::{FormEntity, FormPolicyGroupEntity, FormSiteEntity, FormWithCountEntity};
pub use user::{GroupEntity, UserEntity};
