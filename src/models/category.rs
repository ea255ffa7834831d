use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Deserialize, Serialize, FromRow, PartialEq)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub path: Option<String>,
}

/// Public address of a category's image, never stored.
pub fn category_url(base_url: &str, path: &str) -> String {
    format!("{}/category-file/{}", base_url.trim_end_matches('/'), path)
}

// Shape joined into each element of the article listing.
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub url: Option<String>,
    pub path: Option<String>,
}

// Shape joined into a single-article fetch: no url/path.
#[derive(Debug, Serialize)]
pub struct CategoryBrief {
    pub id: i32,
    pub name: String,
}

impl CategorySummary {
    pub fn from_category(category: Category, base_url: &str) -> Self {
        let url = category.path.as_deref().map(|p| category_url(base_url, p));
        Self {
            id: category.id,
            name: category.name,
            url,
            path: category.path,
        }
    }
}

impl From<Category> for CategoryBrief {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}
