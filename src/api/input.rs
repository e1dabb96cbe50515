use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};

use super::ApiError;
use crate::services::image::{ACCEPTED_MIME_TYPES, ImageUpload};

/// A request body given either as JSON or as `multipart/form-data`.
///
/// Multipart text fields become JSON strings; a non-empty `image` file part
/// is kept aside as an upload.
#[derive(Debug, Default)]
pub struct Input {
    pub fields: Map<String, Value>,
    pub image: Option<ImageUpload>,
}

impl Input {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut input = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::bad_request("Invalid multipart body"))?
        {
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };

            if name == "image" && field.file_name().is_some() {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;

                if bytes.is_empty() {
                    continue;
                }

                if !ACCEPTED_MIME_TYPES.contains(&content_type.as_str()) {
                    return Err(ApiError::field(
                        "image",
                        format!(
                            "image must be of type {}",
                            ACCEPTED_MIME_TYPES.join(", ")
                        ),
                    ));
                }

                input.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    filename,
                    content_type,
                });
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;
            input.fields.insert(name, Value::String(text));
        }

        Ok(input)
    }

    fn from_json(bytes: &[u8]) -> Result<Self, ApiError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Ok(Self {
                fields,
                image: None,
            }),
            _ => Err(ApiError::bad_request("Invalid json")),
        }
    }
}

impl<S: Send + Sync> FromRequest<S> for Input {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;
            return Self::from_multipart(multipart).await;
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::bad_request("Invalid request body"))?;
        Self::from_json(&bytes)
    }
}
