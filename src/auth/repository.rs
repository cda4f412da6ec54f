// User persistence: the store trait and its PostgreSQL implementation
//
// Session records live inside the user document (a JSONB array column), and
// every session mutation is one UPDATE on that row, so concurrent login,
// logout and logout-all on the same user are serialized by the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{
    error::StoreError,
    models::{NewUser, ProfileUpdate, Role, SessionRecord, User},
};

/// Abstract user-record store consumed by the auth core
///
/// Session methods operate on token digests and must each be atomic with
/// respect to the owning user record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email (case-insensitive)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Insert a user; a taken email yields `StoreError::DuplicateEmail`
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Apply the `Some` fields of a profile update; `None` if the user does not exist
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Replace the password hash and drop every session in one update
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError>;

    /// Mark the user inactive and drop every session in one update
    async fn deactivate_user(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Append a session record; refused (false) for a missing or inactive user
    async fn push_session(&self, id: Uuid, record: SessionRecord) -> Result<bool, StoreError>;

    /// Remove the record with this digest; false if it was not present
    async fn pull_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError>;

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError>;

    /// Remove every record whose expiry is at or before `now`
    async fn prune_sessions(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn has_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError>;

    /// Replace `old_hash` with `record` only if `old_hash` is still present
    async fn swap_session(
        &self,
        id: Uuid,
        old_hash: &str,
        record: SessionRecord,
    ) -> Result<bool, StoreError>;
}

/// Column list shared by every user query
const USER_COLUMNS: &str = "id, email, password_hash, role, is_active, first_name, last_name, \
                            phone, bio, company_name, sessions, created_at, updated_at";

/// Sessions minus the entry with digest $2, original order kept
const SESSIONS_WITHOUT_TOKEN: &str = "COALESCE(( \
        SELECT jsonb_agg(s.value ORDER BY s.ordinality) \
        FROM jsonb_array_elements(sessions) WITH ORDINALITY AS s(value, ordinality) \
        WHERE s.value->>'token_hash' <> $2 \
    ), '[]'::jsonb)";

/// Matches rows whose sessions contain digest $2
const HAS_TOKEN: &str = "sessions @> jsonb_build_array(jsonb_build_object('token_hash', $2::text))";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: Role,
    is_active: bool,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    bio: Option<String>,
    company_name: Option<String>,
    sessions: Json<Vec<SessionRecord>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            is_active: row.is_active,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            bio: row.bio,
            company_name: row.company_name,
            sessions: row.sessions.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new PgUserStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
             (id, email, password_hash, role, first_name, last_name, phone, company_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(&new_user.company_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users \
             SET first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 phone = COALESCE($4, phone), \
                 bio = COALESCE($5, bio), \
                 company_name = COALESCE($6, company_name), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(&update.bio)
        .bind(&update.company_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, sessions = '[]'::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn deactivate_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, sessions = '[]'::jsonb, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn push_session(&self, id: Uuid, record: SessionRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET sessions = sessions || jsonb_build_array($2::jsonb) \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pull_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE users SET sessions = {} WHERE id = $1 AND {}",
            SESSIONS_WITHOUT_TOKEN, HAS_TOKEN
        ))
        .bind(id)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET sessions = '[]'::jsonb WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn prune_sessions(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET sessions = COALESCE(( \
                 SELECT jsonb_agg(s.value ORDER BY s.ordinality) \
                 FROM jsonb_array_elements(sessions) WITH ORDINALITY AS s(value, ordinality) \
                 WHERE (s.value->>'expires_at')::timestamptz > $2 \
             ), '[]'::jsonb) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn has_session(&self, id: Uuid, token_hash: &str) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND {})",
            HAS_TOKEN
        ))
        .bind(id)
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn swap_session(
        &self,
        id: Uuid,
        old_hash: &str,
        record: SessionRecord,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE users SET sessions = {} || jsonb_build_array($3::jsonb) \
             WHERE id = $1 AND is_active AND {}",
            SESSIONS_WITHOUT_TOKEN, HAS_TOKEN
        ))
        .bind(id)
        .bind(old_hash)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
