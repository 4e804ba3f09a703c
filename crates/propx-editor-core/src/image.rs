//! Image metadata and the metadata form state.

use serde::{Deserialize, Serialize};

use crate::error::ImageFormError;
use crate::model::ImageAttrs;
use crate::types::ImageLocator;

/// Editable image metadata. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub alt: String,
    pub title: String,
    pub caption: String,
}

impl ImageMetadata {
    pub fn new(alt: impl Into<String>) -> Self {
        Self {
            alt: alt.into(),
            ..Default::default()
        }
    }

    pub fn from_attrs(attrs: &ImageAttrs) -> Self {
        Self {
            alt: attrs.alt.clone().unwrap_or_default(),
            title: attrs.title.clone().unwrap_or_default(),
            caption: attrs.caption.clone().unwrap_or_default(),
        }
    }

    /// Write the metadata onto `attrs`, dropping empty fields.
    pub fn apply_to(&self, attrs: &mut ImageAttrs) {
        attrs.alt = non_empty(&self.alt);
        attrs.title = non_empty(&self.title);
        attrs.caption = non_empty(&self.caption);
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Why the metadata form was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOrigin {
    /// Right after an upload inserted the image.
    Upload,
    /// The user asked to edit the selected image.
    Edit,
}

/// Open metadata form bound to one image node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadataForm {
    pub target: ImageLocator,
    pub metadata: ImageMetadata,
    pub origin: FormOrigin,
}

impl ImageMetadataForm {
    /// Open the form pre-filled from the image's current attributes.
    pub fn open(target: ImageLocator, attrs: &ImageAttrs, origin: FormOrigin) -> Self {
        Self {
            target,
            metadata: ImageMetadata::from_attrs(attrs),
            origin,
        }
    }

    /// Alt text is required; title and caption are optional.
    pub fn validate(&self) -> Result<ImageMetadata, ImageFormError> {
        if self.metadata.alt.trim().is_empty() {
            return Err(ImageFormError::MissingAlt);
        }
        Ok(self.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockPath;

    #[test]
    fn test_form_prefills_from_node() {
        let attrs = ImageAttrs {
            src: "https://x.test/a.png".into(),
            alt: Some("Alt".into()),
            title: None,
            caption: Some("Cap".into()),
        };
        let form = ImageMetadataForm::open(
            ImageLocator::new(BlockPath::root(0), 0),
            &attrs,
            FormOrigin::Edit,
        );
        assert_eq!(form.metadata.alt, "Alt");
        assert_eq!(form.metadata.title, "");
        assert_eq!(form.metadata.caption, "Cap");
    }

    #[test]
    fn test_alt_required() {
        let mut form = ImageMetadataForm::open(
            ImageLocator::new(BlockPath::root(0), 0),
            &ImageAttrs::new("https://x.test/a.png"),
            FormOrigin::Upload,
        );
        form.metadata.alt = "   ".into();
        assert_eq!(form.validate(), Err(ImageFormError::MissingAlt));
        form.metadata.alt = "A cat".into();
        assert_eq!(form.validate().map(|m| m.alt), Ok("A cat".to_string()));
    }

    #[test]
    fn test_apply_drops_empty_fields() {
        let mut attrs = ImageAttrs::new("https://x.test/a.png");
        attrs.title = Some("old".into());
        ImageMetadata {
            alt: " Alt ".into(),
            title: "".into(),
            caption: "Cap".into(),
        }
        .apply_to(&mut attrs);
        assert_eq!(attrs.alt.as_deref(), Some("Alt"));
        assert_eq!(attrs.title, None);
        assert_eq!(attrs.caption.as_deref(), Some("Cap"));
    }
}
