use axum::{extract::State, Json};

use crate::{error::Result, models::category::CategorySummary, routes::AppState};

// GET /categories
pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategorySummary>>> {
    let categories = state.store.list_categories().await?;

    let data = categories
        .into_iter()
        .map(|c| CategorySummary::from_category(c, &state.config.app_url))
        .collect();

    Ok(Json(data))
}
