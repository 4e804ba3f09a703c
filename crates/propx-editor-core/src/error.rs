//! Error types for editor operations.

use thiserror::Error;

/// Errors from the image upload path.
///
/// All of these are recovered inside the editor: the document is left as it
/// was, the upload control is re-enabled and the host gets one notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadError {
    /// Another upload is still in flight.
    #[error("an upload is already in progress")]
    Busy,

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("upload failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not carry a usable URL.
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),

    /// The returned source is an inline base64 payload.
    #[error("inline base64 images are not allowed")]
    Base64Rejected,

    /// The uploaded image could not be placed at the current selection.
    #[error("the image cannot be inserted here")]
    NotInsertable,

    /// The file could not be read.
    #[error("could not read image: {0}")]
    Read(String),
}

/// Validation errors from the image metadata form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageFormError {
    #[error("alt text is required")]
    MissingAlt,

    /// The image the form was opened for is no longer in the document.
    #[error("the image is no longer in the document")]
    ImageMissing,

    #[error("no image form is open")]
    NotOpen,
}
