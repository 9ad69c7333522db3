//! Domain models for the forms builder.

pub mod entry;
pub mod field;
pub mod form;
pub mod principal;

pub use entry::{Entry, FieldEntry, NewEntry, SubmitEntryRequest, SubmittedValue};
pub use field::{ChoiceSyntax, Field, FieldDetail, FieldKind, FieldType};
pub use form::{Form, FormAction, PublishContext, StatusLevel, VisibilityPolicy};
pub use principal::Principal;
