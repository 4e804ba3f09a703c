//! propx-common: the pieces PropX hosts share around the editor.
//!
//! - `Session` - bearer credential with an unauthorized hook
//! - `ApiClient` - REST client with the API's error conventions
//! - `HttpImageUploader` - multipart [`propx_editor_core::ImageUpload`]
//! - legal document get/save
//! - `Config` with file-backed `Loader`/`Saver`

pub mod client;
pub mod config;
pub mod error;
pub mod legal;
pub mod session;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod upload;

pub use client::{ApiClient, RawResponse};
pub use config::{Config, FileStore, Loader, Saver, UploadSite};
pub use error::{ApiError, SerDeError};
pub use legal::LegalKind;
pub use session::Session;
pub use upload::{HttpImageUploader, interpret_upload_response};
