//! Field repository for database operations.
//!
//! Field order is kept contiguous and zero-based per form: inserts and
//! moves shift the neighbouring fields, deletes close the gap.

use domain::models::field::Field;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::form::unique_slug;
use crate::entities::{FieldEntity, FieldTypeDb};
use crate::metrics::QueryTimer;

const FIELD_COLUMNS: &str = r#"
    id, form_id, label, slug, field_type, sort_order, required, visible,
    choices, default_value, placeholder_text, help_text, created_at, updated_at
"#;

/// Repository for field-related database operations.
#[derive(Clone)]
pub struct FieldRepository {
    pool: PgPool,
}

impl FieldRepository {
    /// Creates a new FieldRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the fields of a form in display order.
    pub async fn list_for_form(&self, form_id: Uuid) -> Result<Vec<Field>, sqlx::Error> {
        let timer = QueryTimer::new("list_form_fields");
        let sql = format!(
            "SELECT {} FROM fields WHERE form_id = $1 ORDER BY sort_order",
            FIELD_COLUMNS
        );
        let result = sqlx::query_as::<_, FieldEntity>(&sql)
            .bind(form_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Field::from).collect())
    }

    /// Find a field of a form.
    pub async fn find(&self, form_id: Uuid, field_id: Uuid) -> Result<Option<Field>, sqlx::Error> {
        let timer = QueryTimer::new("find_field");
        let sql = format!(
            "SELECT {} FROM fields WHERE form_id = $1 AND id = $2",
            FIELD_COLUMNS
        );
        let result = sqlx::query_as::<_, FieldEntity>(&sql)
            .bind(form_id)
            .bind(field_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Field::from))
    }

    /// Insert a field.
    ///
    /// Without an explicit order the field is appended; an order inside the
    /// current range shifts the following fields down. Orders past the end
    /// are clamped to the field count.
    pub async fn create(&self, field: &Field, order: Option<i32>) -> Result<Field, sqlx::Error> {
        let timer = QueryTimer::new("create_field");
        let mut tx = self.pool.begin().await?;

        let count = lock_and_count(&mut tx, field.form_id).await?;
        let position = order.map_or(count, |o| o.clamp(0, count));

        if position < count {
            sqlx::query(
                r#"
                UPDATE fields
                SET sort_order = sort_order + 1
                WHERE form_id = $1 AND sort_order >= $2
                "#,
            )
            .bind(field.form_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            r#"
            INSERT INTO fields (
                id, form_id, label, slug, field_type, sort_order, required, visible,
                choices, default_value, placeholder_text, help_text
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            FIELD_COLUMNS
        );
        let entity = sqlx::query_as::<_, FieldEntity>(&sql)
            .bind(field.id)
            .bind(field.form_id)
            .bind(&field.label)
            .bind(&field.slug)
            .bind(FieldTypeDb::from(field.field_type))
            .bind(position)
            .bind(field.required)
            .bind(field.visible)
            .bind(&field.choices)
            .bind(&field.default_value)
            .bind(&field.placeholder_text)
            .bind(&field.help_text)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(entity.into())
    }

    /// Update a field, moving it to `new_order` when given.
    ///
    /// Returns `None` if the field does not exist.
    pub async fn update(
        &self,
        field: &Field,
        new_order: Option<i32>,
    ) -> Result<Option<Field>, sqlx::Error> {
        let timer = QueryTimer::new("update_field");
        let mut tx = self.pool.begin().await?;

        let count = lock_and_count(&mut tx, field.form_id).await?;
        let current: Option<i32> = sqlx::query_scalar(
            "SELECT sort_order FROM fields WHERE form_id = $1 AND id = $2",
        )
        .bind(field.form_id)
        .bind(field.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        let target = new_order.map_or(current, |o| o.clamp(0, (count - 1).max(0)));

        if target < current {
            sqlx::query(
                r#"
                UPDATE fields
                SET sort_order = sort_order + 1
                WHERE form_id = $1 AND sort_order >= $2 AND sort_order < $3
                "#,
            )
            .bind(field.form_id)
            .bind(target)
            .bind(current)
            .execute(&mut *tx)
            .await?;
        } else if target > current {
            sqlx::query(
                r#"
                UPDATE fields
                SET sort_order = sort_order - 1
                WHERE form_id = $1 AND sort_order > $2 AND sort_order <= $3
                "#,
            )
            .bind(field.form_id)
            .bind(current)
            .bind(target)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            r#"
            UPDATE fields
            SET label = $3,
                slug = $4,
                field_type = $5,
                sort_order = $6,
                required = $7,
                visible = $8,
                choices = $9,
                default_value = $10,
                placeholder_text = $11,
                help_text = $12,
                updated_at = NOW()
            WHERE form_id = $1 AND id = $2
            RETURNING {}
            "#,
            FIELD_COLUMNS
        );
        let entity = sqlx::query_as::<_, FieldEntity>(&sql)
            .bind(field.form_id)
            .bind(field.id)
            .bind(&field.label)
            .bind(&field.slug)
            .bind(FieldTypeDb::from(field.field_type))
            .bind(target)
            .bind(field.required)
            .bind(field.visible)
            .bind(&field.choices)
            .bind(&field.default_value)
            .bind(&field.placeholder_text)
            .bind(&field.help_text)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(entity.into()))
    }

    /// Delete a field and renumber the fields after it.
    ///
    /// Returns true if the field existed. Stored answers are kept.
    pub async fn delete(&self, form_id: Uuid, field_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_field");
        let mut tx = self.pool.begin().await?;

        lock_and_count(&mut tx, form_id).await?;
        let deleted: Option<i32> = sqlx::query_scalar(
            r#"
            DELETE FROM fields
            WHERE form_id = $1 AND id = $2
            RETURNING sort_order
            "#,
        )
        .bind(form_id)
        .bind(field_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(deleted_order) = deleted else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            UPDATE fields
            SET sort_order = sort_order - 1
            WHERE form_id = $1 AND sort_order > $2
            "#,
        )
        .bind(form_id)
        .bind(deleted_order)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Returns `base` or the first free `base_N` slug within the form.
    pub async fn generate_unique_slug(&self, form_id: Uuid, base: &str) -> Result<String, sqlx::Error> {
        let timer = QueryTimer::new("field_slugs_like");
        let result: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT slug FROM fields
            WHERE form_id = $1 AND (slug = $2 OR slug LIKE $2 || '%')
            "#,
        )
        .bind(form_id)
        .bind(base)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(unique_slug(base, '_', &result?.into_iter().collect()))
    }
}

/// Locks the form row so concurrent field edits of one form serialize, and
/// returns its field count.
async fn lock_and_count(
    tx: &mut Transaction<'_, Postgres>,
    form_id: Uuid,
) -> Result<i32, sqlx::Error> {
    sqlx::query("SELECT id FROM forms WHERE id = $1 FOR UPDATE")
        .bind(form_id)
        .fetch_optional(&mut **tx)
        .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fields WHERE form_id = $1")
        .bind(form_id)
        .fetch_one(&mut **tx)
        .await?;

    Ok(i32::try_from(count).unwrap_or(i32::MAX))
}
