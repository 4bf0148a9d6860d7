//! Resource endpoints.
//!
//! One module per resource. Shared here: pagination query parameters,
//! multipart form collection and image upload helpers.

pub mod cars;
pub mod categories;
pub mod drivers;
pub mod maintenances;
pub mod transactions;

use crate::images::ImageStore;
use axum::body::Bytes;
use axum::extract::Multipart;
use rentcar_core::pagination::PageRequest;
use rentcar_core::validation::Validator;
use rentcar_web::{AppError, WebResult};
use serde::Deserialize;
use std::collections::HashMap;

/// `?page=&per_page=` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// The clamped page request.
    #[must_use]
    pub fn page_request(self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file
    pub file_name: Option<String>,
    /// Declared content type
    pub content_type: String,
    /// Content
    pub bytes: Bytes,
}

/// A `multipart/form-data` body read into memory.
///
/// Text parts are kept by name (the last one wins); file parts are kept in
/// upload order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<Upload>>,
}

impl MultipartForm {
    /// Drain every part of the body.
    ///
    /// # Errors
    ///
    /// Returns 400 on a malformed body, 413 when a part exceeds the body limit.
    pub async fn read(mut multipart: Multipart) -> WebResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                form.files.entry(name).or_default().push(Upload {
                    file_name: Some(file_name),
                    content_type,
                    bytes,
                });
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// A text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The first file uploaded under `name`.
    #[must_use]
    pub fn first_file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name).and_then(|files| files.first())
    }
}

/// Store an upload and return its URL.
///
/// # Errors
///
/// 400 for a type other than JPEG, PNG or WebP or an empty file; 500 if
/// the write fails.
pub async fn store_upload(images: &dyn ImageStore, upload: &Upload) -> WebResult<String> {
    images
        .store(upload.file_name.as_deref(), &upload.content_type, &upload.bytes)
        .await
        .map_err(AppError::from)
}

/// Remove an image that is no longer referenced. Failures are logged only.
pub async fn discard_image(images: &dyn ImageStore, url: &str) {
    if let Err(error) = images.remove(url).await {
        tracing::warn!(url, %error, "Failed to remove image");
    }
}

/// A string field that must be present when `required`, and must not be
/// blank when given.
pub(crate) fn text_field<'a>(
    v: &mut Validator,
    required: bool,
    name: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    if required {
        v.required(name, value)
    } else {
        value.and_then(|s| v.required(name, Some(s)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults() {
        let request = PageQuery::default().page_request();
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), rentcar_core::pagination::DEFAULT_PER_PAGE);
    }

    #[test]
    fn optional_fields_may_be_absent_but_not_blank() {
        let mut v = Validator::new();
        assert_eq!(text_field(&mut v, false, "name", None), None);
        assert_eq!(text_field(&mut v, false, "name", Some(" Avanza ")), Some("Avanza"));
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        assert_eq!(text_field(&mut v, false, "name", Some("   ")), None);
        assert_eq!(text_field(&mut v, true, "color", None), None);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.field("name"), ["required field"]);
        assert_eq!(errors.field("color"), ["required field"]);
    }
}
