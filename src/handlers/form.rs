use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

use crate::clients::UploadFile;
use crate::config::parse_flag;
use crate::error::ApiError;

/// Form fields from either a multipart body or a flat JSON object.
///
/// Multipart parts with a filename become files (empty ones are dropped);
/// everything else is read as text. JSON scalars are stringified.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadFile>>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// `true`/`1`/`yes` are true, anything else present is false.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.fields.get(name).map(|value| parse_flag(value))
    }

    pub fn file(&self, name: &str) -> Option<UploadFile> {
        self.files.get(name).and_then(|files| files.first().cloned())
    }

    pub fn files(&self, name: &str) -> Vec<UploadFile> {
        self.files.get(name).cloned().unwrap_or_default()
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let file = UploadFile {
                        filename,
                        content_type,
                        bytes: field.bytes().await?,
                    };
                    if file.is_empty() {
                        continue;
                    }
                    form.files.entry(name).or_default().push(file);
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    fn from_json(value: Value) -> Result<Self, ApiError> {
        let Value::Object(map) = value else {
            return Err(ApiError::bad_request("Request body must be a JSON object"));
        };

        let fields = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();

        Ok(FormData {
            fields,
            files: HashMap::new(),
        })
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            FormData::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            FormData::from_json(value)
        } else {
            Ok(FormData::default())
        }
    }
}
