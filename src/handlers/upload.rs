use std::collections::HashMap;
use std::path::Path;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use mime::Mime;
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use crate::{error::AppError, models::article::ArticleForm, routes::AppState};

// Name of the multipart part carrying the article's file
const FILE_FIELD: &str = "file";

/// A file part held in memory until the handler decides to keep it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    /// Accepted image type; it alone decides the stored extension.
    pub content_type: Mime,
    pub data: Bytes,
}

impl UploadedFile {
    /// Writes the file under a fresh unique name and returns that name.
    pub async fn save(&self, dir: &Path) -> std::io::Result<String> {
        fs::create_dir_all(dir).await?;

        let extension = image_extension(&self.content_type).unwrap_or("jpg");

        // e.g. 550e8400e29b41d4a716446655440000.png
        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        fs::write(dir.join(&filename), &self.data).await?;

        tracing::debug!("Stored upload {} as {}", self.original_name, filename);
        Ok(filename)
    }
}

/// Deletes a stored upload. Failures are logged, never returned.
pub async fn remove_upload(dir: &Path, filename: &str) {
    if let Err(e) = fs::remove_file(dir.join(filename)).await {
        tracing::warn!("Could not remove upload {}: {:?}", filename, e);
    }
}

/// Body of create and update: form fields plus an optional file.
///
/// Accepts `multipart/form-data` (text parts become fields, the `file` part is
/// buffered) or a JSON object. Any other body yields no fields, so validation
/// reports every field as missing.
#[derive(Debug, Default)]
pub struct ArticleSubmission {
    pub form: ArticleForm,
    pub file: Option<UploadedFile>,
}

#[async_trait]
impl FromRequest<AppState> for ArticleSubmission {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidBody(e.body_text()))?;
            return read_multipart(multipart, state.config.max_upload_bytes).await;
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidBody(e.body_text()))?;
            return Ok(Self {
                form: ArticleForm::from_fields(json_fields(body)?),
                file: None,
            });
        }

        Ok(Self::default())
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<ArticleSubmission, AppError> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidBody(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let original_name = field.file_name().unwrap_or("unknown.jpg").to_string();
            // Declared type first, then a guess from the file name
            let content_type = field
                .content_type()
                .and_then(|ct_str| ct_str.parse::<Mime>().ok())
                .or_else(|| mime_guess::from_path(&original_name).first())
                .filter(|ct| image_extension(ct).is_some())
                .ok_or_else(|| {
                    AppError::InvalidUpload(
                        "only images are allowed (jpg, png, webp, gif)".to_string(),
                    )
                })?;

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidBody(e.body_text()))?;

            if data.len() > max_bytes {
                return Err(AppError::InvalidUpload(format!(
                    "file exceeds the maximum size of {max_bytes} bytes"
                )));
            }

            file = Some(UploadedFile {
                original_name,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::InvalidBody(e.body_text()))?;
            fields.insert(name, value);
        }
    }

    Ok(ArticleSubmission {
        form: ArticleForm::from_fields(fields),
        file,
    })
}

// Extension for each accepted image type; `None` means the type is refused.
fn image_extension(ct: &Mime) -> Option<&'static str> {
    if ct.type_() != mime::IMAGE {
        return None;
    }
    match ct.subtype().as_str() {
        "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        _ => None,
    }
}

// Flattens a JSON object into string fields. Nulls count as missing.
fn json_fields(body: Value) -> Result<HashMap<String, String>, AppError> {
    let Value::Object(map) = body else {
        return Err(AppError::InvalidBody(
            "request body must be a JSON object".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_json_fields() {
        let fields = json_fields(json!({
            "title": "A",
            "category_id": 3,
            "preview": null,
            "tags": ["x"],
        }))
        .unwrap();

        assert_eq!(fields.get("title").map(String::as_str), Some("A"));
        assert_eq!(fields.get("category_id").map(String::as_str), Some("3"));
        assert!(!fields.contains_key("preview"));
        assert!(!fields.contains_key("tags"));
    }

    #[test]
    fn test_json_fields_rejects_non_objects() {
        assert!(matches!(
            json_fields(json!(["title"])),
            Err(AppError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(&mime::IMAGE_PNG), Some("png"));
        assert_eq!(image_extension(&mime::IMAGE_JPEG), Some("jpg"));
        assert_eq!(image_extension(&"image/webp".parse().unwrap()), Some("webp"));
        assert_eq!(image_extension(&mime::TEXT_PLAIN), None);
        assert_eq!(image_extension(&mime::TEXT_HTML), None);
        assert_eq!(image_extension(&"image/svg+xml".parse().unwrap()), None);
    }

    #[tokio::test]
    async fn test_save_uses_type_extension_and_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested");
        let file = UploadedFile {
            original_name: "evil.html".to_string(),
            content_type: mime::IMAGE_PNG,
            data: Bytes::from_static(b"png-bytes"),
        };

        let name = file.save(&dir).await.unwrap();

        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 32 + ".png".len());
        let stored = fs::read(dir.join(&name)).await.unwrap();
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn test_save_generates_distinct_names() {
        let temp_dir = TempDir::new().unwrap();
        let file = UploadedFile {
            original_name: "poster".to_string(),
            content_type: mime::IMAGE_JPEG,
            data: Bytes::from_static(b"x"),
        };

        let first = file.save(temp_dir.path()).await.unwrap();
        let second = file.save(temp_dir.path()).await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_remove_upload() {
        let temp_dir = TempDir::new().unwrap();
        let file = UploadedFile {
            original_name: "img.png".to_string(),
            content_type: mime::IMAGE_PNG,
            data: Bytes::from_static(b"x"),
        };
        let name = file.save(temp_dir.path()).await.unwrap();

        remove_upload(temp_dir.path(), &name).await;
        assert!(!temp_dir.path().join(&name).exists());

        // Already gone: only logged
        remove_upload(temp_dir.path(), &name).await;
    }
}
