use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, Result},
    handlers::upload::{remove_upload, ArticleSubmission},
    models::{
        article::{ArticleChanges, ArticleDetail, ArticleListItem, ArticleUpdated, ArticleView, NewArticle},
        category::{CategoryBrief, CategorySummary},
    },
    routes::AppState,
};

// Ids that are not numbers cannot match a row, so they read as "not found".
fn parse_id(raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| AppError::ArticleNotFound)
}

// POST /articles (multipart: title, preview, content, category_id + file)
pub async fn create_article_handler(
    State(state): State<AppState>,
    submission: ArticleSubmission,
) -> Result<Json<ArticleView>> {
    let input = submission.form.into_input().map_err(AppError::Validation)?;

    let file = submission
        .file
        .ok_or_else(|| AppError::Validation(vec!["file is a required field".to_string()]))?;
    let upload_dir = &state.config.upload_dir;
    let path = file.save(upload_dir).await?;

    let created = state
        .store
        .create_article(NewArticle {
            title: input.title,
            preview: input.preview,
            content: input.content,
            category_id: input.category_id,
            path: path.clone(),
        })
        .await;

    // No row points at the file once the insert fails
    let article = match created {
        Ok(article) => article,
        Err(e) => {
            remove_upload(upload_dir, &path).await;
            return Err(e.into());
        }
    };

    tracing::debug!("Created article {}", article.id);
    Ok(Json(ArticleView::new(article, &state.config.app_url)))
}

// GET /articles
pub async fn list_articles_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleListItem>>> {
    let base_url = &state.config.app_url;
    let rows = state.store.list_articles().await?;

    let data = rows
        .into_iter()
        .map(|(article, category)| ArticleListItem {
            view: ArticleView::new(article, base_url),
            category: category.map(|c| CategorySummary::from_category(c, base_url)),
        })
        .collect();

    Ok(Json(data))
}

// GET /articles/:id
pub async fn get_article_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ArticleDetail>> {
    let id = parse_id(&id)?;

    let (article, category) = state
        .store
        .find_article_with_category(id)
        .await?
        .ok_or(AppError::ArticleNotFound)?;

    Ok(Json(ArticleDetail {
        view: ArticleView::new(article, &state.config.app_url),
        category: category.map(CategoryBrief::from),
    }))
}

// PUT /articles/:id (file optional)
pub async fn update_article_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    submission: ArticleSubmission,
) -> Result<Json<ArticleUpdated>> {
    // Validation runs before the existence check
    let input = submission.form.into_input().map_err(AppError::Validation)?;

    let id = parse_id(&id)?;
    let existing = state
        .store
        .find_article(id)
        .await?
        .ok_or(AppError::ArticleNotFound)?;

    let upload_dir = &state.config.upload_dir;
    let path = match submission.file {
        Some(file) => Some(file.save(upload_dir).await?),
        None => None,
    };

    let updated = state
        .store
        .update_article(
            id,
            ArticleChanges {
                title: input.title.clone(),
                preview: input.preview.clone(),
                content: input.content,
                category_id: input.category_id,
                path: path.clone(),
            },
        )
        .await;

    let outcome = match updated {
        Ok(0) => Err(AppError::ArticleNotFound),
        Ok(_) => Ok(()),
        Err(e) => Err(AppError::from(e)),
    };

    match (&path, &existing.path) {
        // The new file is orphaned if nothing was written
        (Some(new_path), _) if outcome.is_err() => remove_upload(upload_dir, new_path).await,
        // The replaced file is no longer referenced
        (Some(_), Some(old_path)) => remove_upload(upload_dir, old_path).await,
        _ => {}
    }
    outcome?;

    tracing::debug!("Updated article {}", id);

    // The reply echoes the submitted values, not the stored row
    Ok(Json(ArticleUpdated {
        title: input.title,
        preview: input.preview,
        category_id: input.category_id,
    }))
}

// DELETE /articles/:id
pub async fn delete_article_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = parse_id(&id)?;

    if state.store.find_article(id).await?.is_none() {
        return Err(AppError::ArticleNotFound);
    }

    state.store.delete_article(id).await?;
    tracing::debug!("Deleted article {}", id);

    Ok((StatusCode::OK, Json(json!({ "message": "Deleted successfully" }))))
}
