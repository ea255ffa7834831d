use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

pub const ARTICLE_NOT_FOUND: &str = "articles not found, verify your articles Id is correct.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    // Answered with 401, as the public API always has
    #[error("articles not found, verify your articles Id is correct.")]
    ArticleNotFound,

    #[error("{0}")]
    InvalidUpload(String),

    #[error("{0}")]
    InvalidBody(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": errors }))).into_response()
            }
            AppError::ArticleNotFound => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": ARTICLE_NOT_FOUND })),
            )
                .into_response(),
            AppError::InvalidUpload(msg) | AppError::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": [msg] }))).into_response()
            }
            AppError::Store(_) | AppError::Io(_) => {
                tracing::error!("Unhandled error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
