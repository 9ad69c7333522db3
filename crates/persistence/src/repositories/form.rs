//! Form repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::form::{Form, FormAction};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::form::status_code;
use crate::entities::{FormEntity, FormPolicyGroupEntity, FormSiteEntity, FormWithCountEntity};
use crate::metrics::QueryTimer;

const FORM_COLUMNS: &str = r#"
    f.id, f.title, f.slug, f.intro, f.button_text, f.response,
    f.view_status, f.submit_status, f.responses_status,
    f.publish_date, f.expiry_date, f.anonymous_vote,
    f.send_email, f.email_from, f.email_copies, f.email_subject, f.email_message,
    f.created_at, f.updated_at
"#;

/// Repository for form-related database operations.
#[derive(Clone)]
pub struct FormRepository {
    pool: PgPool,
}

impl FormRepository {
    /// Creates a new FormRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a form with its policy groups and sites.
    pub async fn create(&self, form: &Form) -> Result<Form, sqlx::Error> {
        let timer = QueryTimer::new("create_form");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO forms (
                id, title, slug, intro, button_text, response,
                view_status, submit_status, responses_status,
                publish_date, expiry_date, anonymous_vote,
                send_email, email_from, email_copies, email_subject, email_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(form.id)
        .bind(&form.title)
        .bind(&form.slug)
        .bind(&form.intro)
        .bind(&form.button_text)
        .bind(&form.response)
        .bind(status_code(&form.view_policy))
        .bind(status_code(&form.submit_policy))
        .bind(status_code(&form.responses_policy))
        .bind(form.publish_date)
        .bind(form.expiry_date)
        .bind(form.anonymous_vote)
        .bind(form.email.send_email)
        .bind(&form.email.email_from)
        .bind(&form.email.email_copies)
        .bind(&form.email.email_subject)
        .bind(&form.email.email_message)
        .execute(&mut *tx)
        .await?;

        replace_relations(&mut tx, form).await?;
        tx.commit().await?;
        timer.record();

        self.find_by_id(form.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Find a form by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Form>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_by_id");
        let sql = format!("SELECT {} FROM forms f WHERE f.id = $1", FORM_COLUMNS);
        let result = sqlx::query_as::<_, FormEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();

        match result? {
            Some(entity) => Ok(self.assemble(vec![entity]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Find a form by slug, regardless of publishing state.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Form>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_by_slug");
        let sql = format!("SELECT {} FROM forms f WHERE f.slug = $1", FORM_COLUMNS);
        let result = sqlx::query_as::<_, FormEntity>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await;
        timer.record();

        match result? {
            Some(entity) => Ok(self.assemble(vec![entity]).await?.pop()),
            None => Ok(None),
        }
    }

    /// List forms in the published listing.
    ///
    /// Excludes drafts, forms outside their publish window and, when
    /// `site_id` is given, forms not attached to that site.
    pub async fn list_published(
        &self,
        now: DateTime<Utc>,
        site_id: Option<i32>,
    ) -> Result<Vec<Form>, sqlx::Error> {
        let timer = QueryTimer::new("list_published_forms");
        let sql = format!(
            r#"
            SELECT {}
            FROM forms f
            WHERE f.view_status <> 1
              AND (f.publish_date IS NULL OR f.publish_date <= $1)
              AND (f.expiry_date IS NULL OR f.expiry_date >= $1)
              AND ($2::INTEGER IS NULL OR EXISTS (
                    SELECT 1 FROM form_sites fs WHERE fs.form_id = f.id AND fs.site_id = $2
              ))
            ORDER BY f.created_at DESC
            "#,
            FORM_COLUMNS
        );
        let result = sqlx::query_as::<_, FormEntity>(&sql)
            .bind(now)
            .bind(site_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        self.assemble(result?).await
    }

    /// List every form, newest first.
    pub async fn list_all(&self) -> Result<Vec<Form>, sqlx::Error> {
        let timer = QueryTimer::new("list_all_forms");
        let sql = format!(
            "SELECT {} FROM forms f ORDER BY f.created_at DESC",
            FORM_COLUMNS
        );
        let result = sqlx::query_as::<_, FormEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        self.assemble(result?).await
    }

    /// List every form with its entry count.
    pub async fn list_all_with_counts(&self) -> Result<Vec<(Form, i64)>, sqlx::Error> {
        let timer = QueryTimer::new("list_forms_with_counts");
        let sql = format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM form_entries e WHERE e.form_id = f.id) AS total_entries
            FROM forms f
            ORDER BY f.created_at DESC
            "#,
            FORM_COLUMNS
        );
        let result = sqlx::query_as::<_, FormWithCountEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        let rows = result?;
        let counts: Vec<i64> = rows.iter().map(|r| r.total_entries).collect();
        let forms = self.assemble(rows.into_iter().map(|r| r.form).collect()).await?;
        Ok(forms.into_iter().zip(counts).collect())
    }

    /// Update a form and replace its policy groups and sites.
    ///
    /// The slug is never changed. Returns `None` if the form does not exist.
    pub async fn update(&self, form: &Form) -> Result<Option<Form>, sqlx::Error> {
        let timer = QueryTimer::new("update_form");
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE forms
            SET title = $2,
                intro = $3,
                button_text = $4,
                response = $5,
                view_status = $6,
                submit_status = $7,
                responses_status = $8,
                publish_date = $9,
                expiry_date = $10,
                anonymous_vote = $11,
                send_email = $12,
                email_from = $13,
                email_copies = $14,
                email_subject = $15,
                email_message = $16,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(form.id)
        .bind(&form.title)
        .bind(&form.intro)
        .bind(&form.button_text)
        .bind(&form.response)
        .bind(status_code(&form.view_policy))
        .bind(status_code(&form.submit_policy))
        .bind(status_code(&form.responses_policy))
        .bind(form.publish_date)
        .bind(form.expiry_date)
        .bind(form.anonymous_vote)
        .bind(form.email.send_email)
        .bind(&form.email.email_from)
        .bind(&form.email.email_copies)
        .bind(&form.email.email_subject)
        .bind(&form.email.email_message)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM form_policy_groups WHERE form_id = $1")
            .bind(form.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM form_sites WHERE form_id = $1")
            .bind(form.id)
            .execute(&mut *tx)
            .await?;
        replace_relations(&mut tx, form).await?;

        tx.commit().await?;
        timer.record();

        self.find_by_id(form.id).await
    }

    /// Delete a form with its fields and entries. Returns true if deleted.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_form");
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Returns `base` or the first free `base-N` slug (N >= 2).
    pub async fn generate_unique_slug(&self, base: &str) -> Result<String, sqlx::Error> {
        let timer = QueryTimer::new("form_slugs_like");
        let result: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
            r#"
            SELECT slug FROM forms WHERE slug = $1 OR slug LIKE $1 || '-%'
            "#,
        )
        .bind(base)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(unique_slug(base, '-', &result?.into_iter().collect()))
    }

    /// Loads policy groups and sites for the given rows.
    async fn assemble(&self, entities: Vec<FormEntity>) -> Result<Vec<Form>, sqlx::Error> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = entities.iter().map(|e| e.id).collect();

        let timer = QueryTimer::new("load_form_relations");
        let groups = sqlx::query_as::<_, FormPolicyGroupEntity>(
            r#"
            SELECT form_id, action, group_id
            FROM form_policy_groups
            WHERE form_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let sites = sqlx::query_as::<_, FormSiteEntity>(
            r#"
            SELECT form_id, site_id
            FROM form_sites
            WHERE form_id = ANY($1)
            ORDER BY site_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let mut sites_by_form: HashMap<Uuid, Vec<i32>> = HashMap::new();
        for site in sites {
            sites_by_form.entry(site.form_id).or_default().push(site.site_id);
        }

        Ok(entities
            .into_iter()
            .map(|entity| {
                let site_ids = sites_by_form.remove(&entity.id).unwrap_or_default();
                entity.into_domain(&groups, site_ids)
            })
            .collect())
    }
}

/// Inserts the policy group and site rows of a form.
async fn replace_relations(
    tx: &mut Transaction<'_, Postgres>,
    form: &Form,
) -> Result<(), sqlx::Error> {
    for action in FormAction::ALL {
        for group_id in &form.policy(action).groups {
            sqlx::query(
                r#"
                INSERT INTO form_policy_groups (form_id, action, group_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(form.id)
            .bind(action.as_str())
            .bind(group_id)
            .execute(&mut **tx)
            .await?;
        }
    }

    for site_id in &form.site_ids {
        sqlx::query(
            r#"
            INSERT INTO form_sites (form_id, site_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(form.id)
        .bind(site_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Picks `base`, or `base{sep}2`, `base{sep}3`, ... until one is not taken.
pub(crate) fn unique_slug(base: &str, separator: char, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}{}", base, separator, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
