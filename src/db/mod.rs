use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, Pool, Postgres};
use thiserror::Error;

use crate::config::Config;
use crate::models::{
    article::{Article, ArticleChanges, NewArticle},
    category::Category,
};

#[cfg(test)]
pub mod memory;

// Alias for "Pool<Postgres>"
pub type DbPool = Pool<Postgres>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("category {0} does not exist")]
    MissingCategory(i32),
}

pub type StoreResult<T> = Result<T, StoreError>;

// Foreign key violations on `category_id` get their own variant
fn map_write_error(err: sqlx::Error, category_id: i32) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::MissingCategory(category_id)
        }
        _ => StoreError::Database(err),
    }
}

/// An article together with its category, when the join found one.
pub type ArticleWithCategory = (Article, Option<Category>);

/// Persistence seam used by the handlers.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn create_article(&self, new: NewArticle) -> StoreResult<Article>;

    /// Every article, in the storage's natural order.
    async fn list_articles(&self) -> StoreResult<Vec<ArticleWithCategory>>;

    async fn find_article(&self, id: i64) -> StoreResult<Option<Article>>;

    async fn find_article_with_category(&self, id: i64) -> StoreResult<Option<ArticleWithCategory>>;

    /// Returns the number of rows touched.
    async fn update_article(&self, id: i64, changes: ArticleChanges) -> StoreResult<u64>;

    async fn delete_article(&self, id: i64) -> StoreResult<u64>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
}

pub async fn init_db(config: &Config) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub struct PgArticleStore {
    pool: DbPool,
}

impl PgArticleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const ARTICLE_COLUMNS: &str =
    "id, title, preview, content, path, category_id, created_at, updated_at";

// Flat row for `articles LEFT JOIN categories`
#[derive(FromRow)]
struct ArticleCategoryRow {
    #[sqlx(flatten)]
    article: Article,
    category_ref: Option<i32>,
    category_name: Option<String>,
    category_path: Option<String>,
}

impl From<ArticleCategoryRow> for ArticleWithCategory {
    fn from(row: ArticleCategoryRow) -> Self {
        let category = match (row.category_ref, row.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                path: row.category_path,
            }),
            _ => None,
        };
        (row.article, category)
    }
}

const JOINED_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.preview, a.content, a.path, a.category_id,
        a.created_at, a.updated_at,
        c.id AS category_ref,
        c.name AS category_name,
        c.path AS category_path
    FROM articles a
    LEFT JOIN categories c ON c.id = a.category_id
"#;

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn create_article(&self, new: NewArticle) -> StoreResult<Article> {
        let sql = format!(
            "INSERT INTO articles (title, preview, content, category_id, path) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ARTICLE_COLUMNS}"
        );
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(&new.title)
            .bind(&new.preview)
            .bind(&new.content)
            .bind(new.category_id)
            .bind(&new.path)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, new.category_id))?;
        Ok(article)
    }

    async fn list_articles(&self) -> StoreResult<Vec<ArticleWithCategory>> {
        let rows = sqlx::query_as::<_, ArticleCategoryRow>(JOINED_SELECT)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_article(&self, id: i64) -> StoreResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn find_article_with_category(&self, id: i64) -> StoreResult<Option<ArticleWithCategory>> {
        let sql = format!("{JOINED_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ArticleCategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_article(&self, id: i64, changes: ArticleChanges) -> StoreResult<u64> {
        // COALESCE keeps the stored path when no new file came in
        let result = sqlx::query(
            r#"
            UPDATE articles SET
                title = $1,
                preview = $2,
                content = $3,
                category_id = $4,
                path = COALESCE($5, path),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.preview)
        .bind(&changes.content)
        .bind(changes.category_id)
        .bind(&changes.path)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, changes.category_id))?;
        Ok(result.rows_affected())
    }

    async fn delete_article(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, path FROM categories ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
