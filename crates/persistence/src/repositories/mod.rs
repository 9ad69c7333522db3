//! Repository implementations for database operations.

pub mod entry;
pub mod field;
pub mod form;
pub mod user;

pub use entry::{CreateEntryError, EntryRepository, USER_ENTRY_UNIQUE_CONSTRAINT};
pub use field::FieldRepository;
pub use form::FormRepository;
pub use user::UserRepository;
