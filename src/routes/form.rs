use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::parse_flag;
use crate::error::{AppError, AppResult};
use crate::storage::Upload;

/// A multipart body split into text fields and file uploads. Empty file
/// inputs are dropped.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

fn rejected(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("malformed multipart body: {}", err))
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(rejected)? {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(rejected)?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name.clone(),
                        Upload {
                            field: name,
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(rejected)?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(form)
    }

    /// First value of a text field, or an empty string.
    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default()
    }

    /// First value of a text field unless blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        Some(self.text(name)).filter(|value| !value.trim().is_empty())
    }

    pub fn flag(&self, name: &str) -> bool {
        parse_flag(&self.text(name))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.text(name).trim().parse().ok()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
