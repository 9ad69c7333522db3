//! Entry repository for database operations.

use domain::models::entry::{Entry, NewEntry};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{assemble_entries, EntryEntity, FieldEntryEntity};
use crate::metrics::QueryTimer;

/// Constraint enforcing one entry per (user, form).
pub const USER_ENTRY_UNIQUE_CONSTRAINT: &str = "user_entries_user_form_unique";

/// Error type for entry creation.
#[derive(Debug, Error)]
pub enum CreateEntryError {
    /// The user already has an entry for this form.
    #[error("User has already submitted this form")]
    AlreadySubmitted,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn is_user_entry_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.constraint())
        .is_some_and(|constraint| constraint == USER_ENTRY_UNIQUE_CONSTRAINT)
}

/// Repository for entry-related database operations.
#[derive(Clone)]
pub struct EntryRepository {
    pool: PgPool,
}

impl EntryRepository {
    /// Creates a new EntryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store an entry with its field values in one transaction.
    ///
    /// When `user_id` is set a user entry is recorded as well; a second
    /// entry by the same user for the same form yields
    /// [`CreateEntryError::AlreadySubmitted`] and nothing is stored.
    pub async fn create_entry(&self, new_entry: &NewEntry) -> Result<Entry, CreateEntryError> {
        let timer = QueryTimer::new("create_entry");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, EntryEntity>(
            r#"
            INSERT INTO form_entries (form_id, entry_time)
            VALUES ($1, $2)
            RETURNING id, form_id, entry_time
            "#,
        )
        .bind(new_entry.form_id)
        .bind(new_entry.entry_time)
        .fetch_one(&mut *tx)
        .await?;

        for field_entry in &new_entry.fields {
            sqlx::query(
                r#"
                INSERT INTO field_entries (entry_id, field_id, value)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(entity.id)
            .bind(field_entry.field_id)
            .bind(&field_entry.value)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(user_id) = new_entry.user_id {
            let recorded = sqlx::query(
                r#"
                INSERT INTO user_entries (user_id, form_id, entry_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(user_id)
            .bind(new_entry.form_id)
            .bind(entity.id)
            .execute(&mut *tx)
            .await;

            if let Err(e) = recorded {
                timer.record();
                if is_user_entry_violation(&e) {
                    tracing::debug!(
                        user_id = %user_id,
                        form_id = %new_entry.form_id,
                        "Duplicate user entry rejected"
                    );
                    return Err(CreateEntryError::AlreadySubmitted);
                }
                return Err(CreateEntryError::Database(e));
            }
        }

        tx.commit().await?;
        timer.record();

        Ok(Entry {
            id: entity.id,
            form_id: entity.form_id,
            entry_time: entity.entry_time,
            fields: new_entry.fields.clone(),
        })
    }

    /// List the entries of a form, oldest first.
    pub async fn list_for_form(&self, form_id: Uuid) -> Result<Vec<Entry>, sqlx::Error> {
        let timer = QueryTimer::new("list_form_entries");
        let entries = sqlx::query_as::<_, EntryEntity>(
            r#"
            SELECT id, form_id, entry_time
            FROM form_entries
            WHERE form_id = $1
            ORDER BY entry_time, id
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        let field_entries = sqlx::query_as::<_, FieldEntryEntity>(
            r#"
            SELECT fe.entry_id, fe.field_id, fe.value
            FROM field_entries fe
            JOIN form_entries e ON e.id = fe.entry_id
            WHERE e.form_id = $1
            ORDER BY fe.id
            "#,
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        Ok(assemble_entries(entries, field_entries))
    }

    /// Count the entries of a form.
    pub async fn count_for_form(&self, form_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_form_entries");
        let result = sqlx::query_scalar("SELECT COUNT(*) FROM form_entries WHERE form_id = $1")
            .bind(form_id)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Returns true if the user already has an entry for the form.
    pub async fn has_user_entry(&self, user_id: Uuid, form_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("has_user_entry");
        let result = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_entries WHERE user_id = $1 AND form_id = $2)",
        )
        .bind(user_id)
        .bind(form_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
