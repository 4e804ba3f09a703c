//! Multipart image upload against the admin API.

use std::future::Future;

use http::StatusCode;
use mime_sniffer::MimeTypeSniffer;
use propx_editor_core::upload::accept_uploaded_src;
use propx_editor_core::{ImageFile, ImageUpload, UploadError};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::client::{ApiClient, error_message};
use crate::error::UNEXPECTED_ERROR;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: Option<String>,
}

/// Read the URL out of an upload response.
///
/// Success needs a 2xx status, `success: true` and a string `data.url`.
pub fn interpret_upload_response(status: StatusCode, body: &[u8]) -> Result<String, UploadError> {
    if !status.is_success() {
        return Err(UploadError::Status {
            status: status.as_u16(),
            message: error_message(body).unwrap_or_else(|| UNEXPECTED_ERROR.to_owned()),
        });
    }
    let response: UploadResponse = serde_json::from_slice(body)
        .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
    if !response.success {
        return Err(UploadError::InvalidResponse(
            response
                .message
                .unwrap_or_else(|| "server reported failure".to_owned()),
        ));
    }
    let url = response
        .data
        .and_then(|d| d.url)
        .ok_or_else(|| UploadError::InvalidResponse("missing data.url".to_owned()))?;
    accept_uploaded_src(&url)
}

/// Content type for the multipart part: the declared one, else sniffed.
pub fn part_mime(file: &ImageFile) -> String {
    file.mime
        .as_ref()
        .map(|m| m.to_string())
        .or_else(|| file.bytes.sniff_mime_type().map(str::to_owned))
        .unwrap_or_else(|| "application/octet-stream".to_owned())
}

/// [`ImageUpload`] over HTTP: one `image` field, bearer authenticated.
#[derive(Debug, Clone)]
pub struct HttpImageUploader {
    client: ApiClient,
    endpoint: String,
}

impl HttpImageUploader {
    pub fn new(client: ApiClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, file: ImageFile) -> Result<String, UploadError> {
        let mime = part_mime(&file);
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.to_string())
            .mime_str(&mime)
            .map_err(|e| UploadError::Read(e.to_string()))?;
        let form = Form::new().part("image", part);

        tracing::debug!(endpoint = %self.endpoint, name = %file.name, %mime, "uploading image");
        let response = self
            .client
            .send(self.client.client.post(&self.endpoint).multipart(form))
            .await?;
        interpret_upload_response(response.status, &response.body)
    }
}

impl ImageUpload for HttpImageUploader {
    fn upload(&self, file: ImageFile) -> impl Future<Output = Result<String, UploadError>> {
        self.send(file)
    }
}
