//! # User Repository
//!
//! Database operations for accounts. Email and username are each globally
//! unique; breaches surface as [`DbError::UniqueViolation`].

use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::query;
use bazaar_core::query::{Field, Filter, Page, Predicate, Sort};
use bazaar_core::validation::{validate_email, validate_password_hash, validate_username};
use bazaar_core::{NewUser, User, UserPatch};

/// Filterable columns of the `users` table.
pub const EMAIL: Field = Field::new("email");
pub const USERNAME: Field = Field::new("username");
pub const ROLE: Field = Field::new("role");

const SELECT_USER: &str =
    "SELECT id, email, username, password_hash, role, created_at, updated_at FROM users";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// The registration duplicate probe: matches any user holding the
    /// given email OR username.
    pub fn duplicate_probe(email: &str, username: &str) -> Filter {
        Filter::new().or_any([
            Predicate::eq(EMAIL, email),
            Predicate::eq(USERNAME, username),
        ])
    }

    /// Inserts a new user.
    ///
    /// Role defaults to customer. A duplicate email or username comes
    /// back as `DbError::UniqueViolation`.
    pub async fn create(&self, new_user: NewUser) -> DbResult<User> {
        validate_email(&new_user.email)?;
        validate_username(&new_user.username)?;
        validate_password_hash(&new_user.password_hash)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email.trim().to_string(),
            username: new_user.username.trim().to_string(),
            password_hash: new_user.password_hash,
            role: new_user.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, username = %user.username, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Returns the first user matching the filter, newest first.
    pub async fn find_first(&self, filter: &Filter) -> DbResult<Option<User>> {
        let mut qb = QueryBuilder::new(SELECT_USER);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, &Sort::created_desc(), "rowid");
        qb.push(" LIMIT 1");

        let user = qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists users matching the filter.
    pub async fn find_many(&self, filter: &Filter, page: &Page, sort: &Sort) -> DbResult<Vec<User>> {
        let mut qb = QueryBuilder::new(SELECT_USER);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, sort, "rowid");
        query::push_page(&mut qb, page);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(users)
    }

    /// Applies a partial update and returns the merged record.
    pub async fn update(&self, id: &str, patch: UserPatch) -> DbResult<User> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let mut user = current;
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        validate_email(&user.email)?;
        validate_username(&user.username)?;
        validate_password_hash(&user.password_hash)?;
        user.email = user.email.trim().to_string();
        user.username = user.username.trim().to_string();

        debug!(id = %user.id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?2, username = ?3, password_hash = ?4, role = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(user)
    }

    /// Deletes a user. Removing an absent row is not an error; cart lines
    /// cascade away with the account.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
