//! # Post Repository
//!
//! Database operations for posts. Reads expand the author into a
//! [`UserSummary`] — id, username, email only, never the password hash.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::query;
use bazaar_core::query::{Field, Filter, Page, Sort, SortDir};
use bazaar_core::validation::validate_title;
use bazaar_core::{NewPost, Post, PostPatch, PostWithAuthor, UserSummary};

/// Filterable columns of the joined post query (posts aliased `p`).
pub const PUBLISHED: Field = Field::new("p.published");
pub const AUTHOR_ID: Field = Field::new("p.author_id");
pub const TITLE: Field = Field::new("p.title");
pub const CONTENT: Field = Field::new("p.content");

/// Joined select feeding [`PostWithAuthorRow`].
const SELECT_POST: &str = "\
    SELECT p.id, p.title, p.content, p.published, p.author_id, p.created_at, p.updated_at, \
           u.username AS u_username, u.email AS u_email \
    FROM posts p \
    JOIN users u ON u.id = p.author_id";

#[derive(Debug, sqlx::FromRow)]
struct PostWithAuthorRow {
    id: String,
    title: String,
    content: Option<String>,
    published: bool,
    author_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    u_username: String,
    u_email: String,
}

impl From<PostWithAuthorRow> for PostWithAuthor {
    fn from(row: PostWithAuthorRow) -> Self {
        PostWithAuthor {
            author: UserSummary {
                id: row.author_id.clone(),
                username: row.u_username,
                email: row.u_email,
            },
            post: Post {
                id: row.id,
                title: row.title,
                content: row.content,
                published: row.published,
                author_id: row.author_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Repository for post database operations.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PostRepository { pool }
    }

    /// Inserts a new post and returns it with the author expanded.
    /// An unknown author id surfaces as a foreign-key violation.
    pub async fn create(&self, new_post: NewPost) -> DbResult<PostWithAuthor> {
        validate_title(&new_post.title)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, author_id = %new_post.author_id, "Inserting post");

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, published, author_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(new_post.title.trim())
        .bind(&new_post.content)
        .bind(new_post.published)
        .bind(&new_post.author_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Post", id))
    }

    /// Gets a post by id, author expanded.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<PostWithAuthor>> {
        let row = sqlx::query_as::<_, PostWithAuthorRow>(&format!("{SELECT_POST} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostWithAuthor::from))
    }

    /// Returns the first post matching the filter, newest first.
    pub async fn find_first(&self, filter: &Filter) -> DbResult<Option<PostWithAuthor>> {
        let mut qb = QueryBuilder::new(SELECT_POST);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, &Self::default_sort(), "p.rowid");
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<PostWithAuthorRow>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostWithAuthor::from))
    }

    /// Lists posts matching the filter, authors expanded, newest first.
    pub async fn find_many(
        &self,
        filter: &Filter,
        page: &Page,
        sort: &Sort,
    ) -> DbResult<Vec<PostWithAuthor>> {
        let mut qb = QueryBuilder::new(SELECT_POST);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, sort, "p.rowid");
        query::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<PostWithAuthorRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostWithAuthor::from).collect())
    }

    /// Applies a partial update and returns the merged record.
    pub async fn update(&self, id: &str, patch: PostPatch) -> DbResult<PostWithAuthor> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Post", id))?;

        let mut post = current.post;
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = Some(content);
        }
        if let Some(published) = patch.published {
            post.published = published;
        }
        post.updated_at = Utc::now();

        validate_title(&post.title)?;

        debug!(id = %post.id, "Updating post");

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = ?2, content = ?3, published = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.published)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Post", id));
        }

        Ok(PostWithAuthor {
            post,
            author: current.author,
        })
    }

    /// Deletes a post. Removing an absent row is not an error.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting post");

        sqlx::query("DELETE FROM posts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn default_sort() -> Sort {
        Sort::new(Field::new("p.created_at"), SortDir::Desc)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
