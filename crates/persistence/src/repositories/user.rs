//! User repository for database operations.
//!
//! Users and groups are owned by the host identity system; this service
//! reads them to build principals. The write operations exist for
//! provisioning and tests.

use domain::models::principal::Principal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, UserEntity};
use crate::metrics::QueryTimer;

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an active user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, display_name, is_staff, is_active, created_at, updated_at
            FROM users
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Group IDs the user belongs to.
    pub async fn find_group_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_group_ids");
        let result = sqlx::query_scalar("SELECT group_id FROM user_groups WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Build the principal for an active user, or `None` if unknown or inactive.
    pub async fn find_principal(&self, user_id: Uuid) -> Result<Option<Principal>, sqlx::Error> {
        let Some(user) = self.find_by_id(user_id).await? else {
            return Ok(None);
        };
        let groups = self.find_group_ids(user.id).await?;
        Ok(Some(Principal::authenticated(user.id, user.is_staff, groups)))
    }

    /// Insert a user.
    pub async fn create(
        &self,
        email: &str,
        display_name: &str,
        is_staff: bool,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, display_name, is_staff)
            VALUES ($1, $2, $3)
            RETURNING id, email, display_name, is_staff, is_active, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(display_name)
        .bind(is_staff)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a group.
    pub async fn create_group(&self, name: &str) -> Result<GroupEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO groups (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Add a user to a group. Adding an existing member is a no-op.
    pub async fn add_to_group(&self, user_id: Uuid, group_id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("add_user_to_group");
        let result = sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
