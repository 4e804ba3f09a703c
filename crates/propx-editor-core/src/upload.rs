//! Image upload seam.
//!
//! The editor never talks HTTP itself; hosts hand it an [`ImageUpload`]
//! implementation (see `propx_common::upload::HttpImageUploader`).

use std::future::Future;

use bytes::Bytes;
use smol_str::SmolStr;

use crate::error::UploadError;

/// A picked image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: SmolStr,
    /// Declared content type, if the picker supplied one.
    pub mime: Option<SmolStr>,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<SmolStr>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<SmolStr>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Uploads an image and resolves to its public URL.
pub trait ImageUpload {
    fn upload(&self, file: ImageFile) -> impl Future<Output = Result<String, UploadError>>;
}

/// Accept an uploaded URL as an image source.
///
/// Inline `data:` payloads are refused; images must live on the server.
pub fn accept_uploaded_src(url: &str) -> Result<String, UploadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UploadError::InvalidResponse("empty image url".into()));
    }
    if url.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:")) {
        return Err(UploadError::Base64Rejected);
    }
    Ok(url.to_owned())
}
