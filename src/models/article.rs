use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::models::category::{CategoryBrief, CategorySummary};

// 1. A full row of the `articles` table
#[derive(Debug, Clone, Deserialize, Serialize, FromRow, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub path: Option<String>,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public download address for an article's file. Computed on every read and
/// never persisted; the file itself is not checked for existence.
pub fn article_url(base_url: &str, path: &str) -> String {
    format!("{}/article-file/{}", base_url.trim_end_matches('/'), path)
}

// 2. Values inserted by `create`
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub preview: String,
    pub content: String,
    pub category_id: i32,
    pub path: String,
}

// 3. Values written by `update`. A `None` path keeps the stored one.
#[derive(Debug, Clone)]
pub struct ArticleChanges {
    pub title: String,
    pub preview: String,
    pub content: String,
    pub category_id: i32,
    pub path: Option<String>,
}

/// Form fields accepted by create and update, before validation.
///
/// Every field is optional at this stage so that all violations can be
/// reported at once instead of failing on the first one.
#[derive(Debug, Default, Clone, Validate)]
pub struct ArticleForm {
    #[validate(
        required(message = "title is a required field"),
        length(min = 1, message = "title is a required field")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "preview is a required field"),
        length(min = 1, message = "preview is a required field")
    )]
    pub preview: Option<String>,

    #[validate(
        required(message = "content is a required field"),
        length(min = 1, message = "content is a required field")
    )]
    pub content: Option<String>,

    #[validate(
        required(message = "category_id is a required field"),
        custom(function = "validate_number")
    )]
    pub category_id: Option<String>,
}

// Order in which violations are reported.
const FORM_FIELDS: [&str; 4] = ["title", "preview", "content", "category_id"];

/// Validated input shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleInput {
    pub title: String,
    pub preview: String,
    pub content: String,
    pub category_id: i32,
}

fn validate_number(value: &str) -> Result<(), ValidationError> {
    if value.trim().parse::<i32>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("number");
    err.message = Some(Cow::from("category_id must be a `number` type"));
    Err(err)
}

impl ArticleForm {
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        Self {
            title: fields.remove("title"),
            preview: fields.remove("preview"),
            content: fields.remove("content"),
            category_id: fields.remove("category_id"),
        }
    }

    /// Runs the schema and returns either the typed input or one message per
    /// invalid field.
    pub fn into_input(self) -> Result<ArticleInput, Vec<String>> {
        if let Err(errors) = self.validate() {
            let by_field = errors.field_errors();
            let messages = FORM_FIELDS
                .iter()
                .filter_map(|field| by_field.get(*field).and_then(|errs| errs.first()))
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .collect();
            return Err(messages);
        }

        match (self.title, self.preview, self.content, self.category_id) {
            (Some(title), Some(preview), Some(content), Some(category_id)) => Ok(ArticleInput {
                title,
                preview,
                content,
                category_id: category_id.trim().parse().map_err(|_| {
                    vec!["category_id must be a `number` type".to_string()]
                })?,
            }),
            _ => Err(vec!["invalid article form".to_string()]),
        }
    }
}

// --- Response views ---

#[derive(Debug, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub url: Option<String>,
}

impl ArticleView {
    pub fn new(article: Article, base_url: &str) -> Self {
        let url = article.path.as_deref().map(|p| article_url(base_url, p));
        Self { article, url }
    }
}

// Listing element: category joined with {id, name, url, path}
#[derive(Debug, Serialize)]
pub struct ArticleListItem {
    #[serde(flatten)]
    pub view: ArticleView,
    pub category: Option<CategorySummary>,
}

// Single fetch: category joined with {id, name}
#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub view: ArticleView,
    pub category: Option<CategoryBrief>,
}

/// Body returned by update: echoes the validated input, not the stored row.
#[derive(Debug, Serialize)]
pub struct ArticleUpdated {
    pub title: String,
    pub preview: String,
    pub category_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, preview: &str, content: &str, category_id: &str) -> ArticleForm {
        ArticleForm {
            title: Some(title.to_string()),
            preview: Some(preview.to_string()),
            content: Some(content.to_string()),
            category_id: Some(category_id.to_string()),
        }
    }

    #[test]
    fn test_article_url() {
        assert_eq!(
            article_url("https://example.com", "img.png"),
            "https://example.com/article-file/img.png"
        );
        assert_eq!(
            article_url("https://example.com/", "img.png"),
            "https://example.com/article-file/img.png"
        );
    }

    #[test]
    fn test_valid_form() {
        let input = form("A", "B", "C", "1").into_input().unwrap();
        assert_eq!(
            input,
            ArticleInput {
                title: "A".into(),
                preview: "B".into(),
                content: "C".into(),
                category_id: 1,
            }
        );
    }

    #[test]
    fn test_all_missing_fields_are_reported_in_order() {
        let errors = ArticleForm::default().into_input().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "title is a required field",
                "preview is a required field",
                "content is a required field",
                "category_id is a required field",
            ]
        );
    }

    #[test]
    fn test_empty_strings_and_bad_number() {
        let errors = form("", "B", "", "abc").into_input().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "title is a required field",
                "content is a required field",
                "category_id must be a `number` type",
            ]
        );
    }

    #[test]
    fn test_category_id_must_be_an_integer() {
        for value in ["1.5", "1e0", ""] {
            let errors = form("A", "B", "C", value).into_input().unwrap_err();
            assert_eq!(errors, vec!["category_id must be a `number` type"]);
        }
        assert_eq!(form("A", "B", "C", " 7 ").into_input().unwrap().category_id, 7);
    }

    #[test]
    fn test_from_fields_ignores_unknown_keys() {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), "A".to_string());
        fields.insert("extra".to_string(), "ignored".to_string());

        let form = ArticleForm::from_fields(fields);
        assert_eq!(form.title.as_deref(), Some("A"));
        assert!(form.preview.is_none());
    }

    #[test]
    fn test_view_without_path_has_no_url() {
        let now = Utc::now();
        let article = Article {
            id: 1,
            title: "A".into(),
            preview: "B".into(),
            content: "C".into(),
            path: None,
            category_id: 1,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(ArticleView::new(article, "https://example.com")).unwrap();
        assert!(json["url"].is_null());
        assert_eq!(json["title"], "A");
    }
}
