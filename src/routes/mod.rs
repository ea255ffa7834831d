use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    db::ArticleStore,
    handlers::{article, category},
};

// Room for the text parts that travel next to the file
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub config: Arc<Config>,
}

pub fn create_routes(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let files = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route(
            "/articles",
            get(article::list_articles_handler).post(article::create_article_handler),
        )
        .route(
            "/articles/:id",
            get(article::get_article_handler)
                .put(article::update_article_handler)
                .delete(article::delete_article_handler),
        )
        .route("/categories", get(category::list_categories_handler))
        .nest_service("/article-file", files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
