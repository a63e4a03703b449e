//! Multipart form parsing shared by API endpoints and pages.

use std::collections::HashMap;

use axum::extract::Multipart;
use club_common::{AppError, AppResult};
use club_core::Upload;

/// A fully read multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    /// Read every part of a multipart body.
    ///
    /// Parts with a file name become uploads; file inputs left empty by the
    /// browser are skipped.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(ToString::to_string) {
                let content_type = field.content_type().map(ToString::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files
                    .insert(name, Upload::new(file_name, content_type, data));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))?;
                form.fields.entry(name).or_default().push(value);
            }
        }

        Ok(form)
    }

    /// First value of a text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.first().map(String::as_str)
    }

    /// First value of a text field, owned.
    #[must_use]
    pub fn text_owned(&self, name: &str) -> Option<String> {
        self.text(name).map(ToString::to_string)
    }

    /// Take an uploaded file out of the form.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
