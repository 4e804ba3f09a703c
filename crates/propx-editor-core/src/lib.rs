//! propx-editor-core: rich-text content editor logic without framework dependencies.
//!
//! This crate provides:
//! - `Document` - structured block/inline model with an HTML codec
//! - `EditingSurface` trait plus the in-memory `DocumentSurface`
//! - `EditorCommand` - every editing operation, tables included
//! - Heading slug/outline engine with delayed id reconciliation
//! - `ContentEditor` - the adapter that emits HTML and headings to a host

pub mod actions;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod execute;
pub mod headings;
pub mod html;
pub mod image;
pub mod link;
pub mod model;
pub mod slug;
pub mod surface;
pub mod table;
pub mod toolbar;
pub mod types;
pub mod undo;
pub mod upload;

pub use actions::{ActiveQuery, CommandOutcome, EditorCommand};
pub use config::EditorOptions;
pub use debounce::Debouncer;
pub use editor::{ContentEditor, EditorHost, EditorOutput, Notice};
pub use error::{ImageFormError, UploadError};
pub use execute::{EditorState, execute_command};
pub use headings::{HeadingDescriptor, ensure_heading_ids, extract_headings};
pub use html::{from_html, normalize_html, to_html};
pub use image::{FormOrigin, ImageMetadata, ImageMetadataForm};
pub use link::{LinkForm, normalize_href};
pub use model::{Align, Block, BlockPath, Document, ImageAttrs, MarkKind};
pub use slug::{DuplicateIdPolicy, slugify};
pub use smol_str::SmolStr;
pub use surface::{DocumentSurface, EditingSurface};
pub use toolbar::{TableDimensions, ToolbarAction, ToolbarGroup, ToolbarItem, toolbar_state};
pub use types::{GridPos, ImageLocator, Selection, TableContext};
pub use undo::{History, UndoManager};
pub use upload::{ImageFile, ImageUpload};
