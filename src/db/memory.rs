//! In-memory `ArticleStore` backing the handler tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{ArticleStore, ArticleWithCategory, StoreError, StoreResult};
use crate::models::{
    article::{Article, ArticleChanges, NewArticle},
    category::Category,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    articles: BTreeMap<i64, Article>,
    categories: BTreeMap<i32, Category>,
}

#[derive(Default)]
pub struct MemoryArticleStore {
    tables: Mutex<Tables>,
}

impl MemoryArticleStore {
    pub fn with_categories(categories: Vec<Category>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().unwrap();
            for category in categories {
                tables.categories.insert(category.id, category);
            }
        }
        store
    }

    fn joined(tables: &Tables, article: &Article) -> ArticleWithCategory {
        let category = tables.categories.get(&article.category_id).cloned();
        (article.clone(), category)
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn create_article(&self, new: NewArticle) -> StoreResult<Article> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.categories.contains_key(&new.category_id) {
            return Err(StoreError::MissingCategory(new.category_id));
        }

        tables.next_id += 1;
        let now = Utc::now();
        let article = Article {
            id: tables.next_id,
            title: new.title,
            preview: new.preview,
            content: new.content,
            path: Some(new.path),
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn list_articles(&self) -> StoreResult<Vec<ArticleWithCategory>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .articles
            .values()
            .map(|a| Self::joined(&tables, a))
            .collect())
    }

    async fn find_article(&self, id: i64) -> StoreResult<Option<Article>> {
        Ok(self.tables.lock().unwrap().articles.get(&id).cloned())
    }

    async fn find_article_with_category(&self, id: i64) -> StoreResult<Option<ArticleWithCategory>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.articles.get(&id).map(|a| Self::joined(&tables, a)))
    }

    async fn update_article(&self, id: i64, changes: ArticleChanges) -> StoreResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.categories.contains_key(&changes.category_id) {
            return Err(StoreError::MissingCategory(changes.category_id));
        }

        let Some(article) = tables.articles.get_mut(&id) else {
            return Ok(0);
        };
        article.title = changes.title;
        article.preview = changes.preview;
        article.content = changes.content;
        article.category_id = changes.category_id;
        if changes.path.is_some() {
            article.path = changes.path;
        }
        article.updated_at = Utc::now();
        Ok(1)
    }

    async fn delete_article(&self, id: i64) -> StoreResult<u64> {
        let removed = self.tables.lock().unwrap().articles.remove(&id);
        Ok(u64::from(removed.is_some()))
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tables.lock().unwrap().categories.values().cloned().collect())
    }
}
