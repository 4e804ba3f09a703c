//! The content editor adapter.
//!
//! `ContentEditor` sits between an [`EditingSurface`] and the host page. It
//! turns document changes into normalized HTML plus a heading outline, keeps
//! heading ids in step with their text, and runs the image upload, image
//! metadata and link workflows.

use std::fmt;

use smol_str::SmolStr;
use web_time::Instant;

use crate::actions::{CommandOutcome, EditorCommand};
use crate::config::EditorOptions;
use crate::debounce::Debouncer;
use crate::error::{ImageFormError, UploadError};
use crate::headings::{HeadingDescriptor, expected_ids, extract_headings};
use crate::image::{FormOrigin, ImageMetadataForm};
use crate::link::{LinkForm, SELECT_TEXT_FIRST};
use crate::model::ImageAttrs;
use crate::surface::{DocumentSurface, EditingSurface};
use crate::toolbar::{TableDimensions, ToolbarGroup, toolbar_state};
use crate::types::{ImageLocator, TableContext};
use crate::upload::{ImageFile, ImageUpload, accept_uploaded_src};

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UploadFailed(UploadError),
    SelectTextFirst,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UploadFailed(_) => f.write_str("Failed to upload image. Please try again."),
            Notice::SelectTextFirst => f.write_str(SELECT_TEXT_FIRST),
        }
    }
}

/// Callbacks from the editor to its host page.
pub trait EditorHost {
    /// Normalized HTML after a change.
    fn on_content_change(&mut self, html: &str);

    /// Heading outline matching the HTML just passed to `on_content_change`.
    fn on_headings_change(&mut self, headings: &[HeadingDescriptor]);

    /// Show a transient notice.
    fn notify(&mut self, notice: Notice) {
        tracing::info!(%notice, "editor notice");
    }
}

/// Serialized editor output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOutput {
    pub html: String,
    pub headings: Vec<HeadingDescriptor>,
}

/// Releases the upload slot when dropped, including when the upload future
/// is abandoned before it completes.
struct UploadSlotGuard<'a>(&'a mut bool);

impl Drop for UploadSlotGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Rich-text content editor adapter.
pub struct ContentEditor<S: EditingSurface, H: EditorHost> {
    surface: S,
    host: H,
    options: EditorOptions,
    ready: bool,
    reconcile: Debouncer,
    reconcile_runs: usize,
    upload_pending: bool,
    image_form: Option<ImageMetadataForm>,
    link_form: Option<LinkForm>,
}

impl<H: EditorHost> ContentEditor<DocumentSurface, H> {
    /// Seed an editor over the built-in document surface.
    pub fn from_html(initial_html: &str, host: H, options: EditorOptions) -> Self {
        let surface = DocumentSurface::from_html(initial_html, options.history_depth);
        Self::new(surface, host, options)
    }
}

impl<S: EditingSurface, H: EditorHost> ContentEditor<S, H> {
    pub fn new(surface: S, host: H, options: EditorOptions) -> Self {
        Self {
            reconcile: Debouncer::new(options.reconcile_delay()),
            surface,
            host,
            options,
            ready: false,
            reconcile_runs: 0,
            upload_pending: false,
            image_form: None,
            link_form: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// The surface finished initializing. Nothing is emitted for the seed.
    pub fn surface_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Stop emitting, drop any pending reconciliation and free the upload slot.
    pub fn unmount(&mut self) {
        self.ready = false;
        self.reconcile.cancel();
        self.upload_pending = false;
        self.image_form = None;
        self.link_form = None;
    }

    /// Current normalized HTML and heading outline.
    pub fn snapshot(&self) -> EditorOutput {
        let html = self.surface.html_with_heading_ids(self.options.duplicate_ids);
        let headings = extract_headings(&html);
        EditorOutput { html, headings }
    }

    fn emit(&mut self) {
        let output = self.snapshot();
        self.host.on_content_change(&output.html);
        self.host.on_headings_change(&output.headings);
    }

    /// Run a command now.
    pub fn apply(&mut self, command: EditorCommand) -> CommandOutcome {
        self.apply_at(command, Instant::now())
    }

    /// Run a command, timestamping any resulting change with `now`.
    pub fn apply_at(&mut self, command: EditorCommand, now: Instant) -> CommandOutcome {
        let outcome = self.surface.apply_command(&command);
        if outcome.changed_document() && self.ready {
            self.emit();
            self.reconcile.schedule(now);
        }
        outcome
    }

    pub fn can_apply(&self, command: &EditorCommand) -> bool {
        self.surface.can_apply(command)
    }

    /// When the pending heading-id pass is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.reconcile.deadline()
    }

    /// Drive the heading-id pass from the host's event loop.
    ///
    /// Returns true when a pass ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.reconcile.fire_if_due(now) {
            return false;
        }
        self.reconcile_heading_ids();
        true
    }

    /// How many heading-id passes have run.
    pub fn reconcile_runs(&self) -> usize {
        self.reconcile_runs
    }

    /// Point every heading's id at the slug of its current text.
    ///
    /// Headings without sluggable text keep what they have. Emits when any id
    /// changed, without scheduling another pass.
    fn reconcile_heading_ids(&mut self) {
        self.reconcile_runs += 1;
        let live = self.surface.live_headings();
        let expected = expected_ids(&live, self.options.duplicate_ids);

        let mut changed = false;
        for (index, (heading, id)) in live.iter().zip(expected).enumerate() {
            let Some(id) = id else {
                continue;
            };
            if heading.id == id {
                continue;
            }
            tracing::debug!(index, from = %heading.id, to = %id, "updating heading id");
            let outcome = self.surface.apply_command(&EditorCommand::SetHeadingId {
                heading: index,
                id: Some(id),
            });
            changed |= outcome.changed_document();
        }

        if changed && self.ready {
            self.emit();
        }
    }

    // === Tables ===

    pub fn is_inside_table(&self) -> bool {
        self.surface.is_inside_table()
    }

    pub fn table_context(&self) -> Option<TableContext> {
        self.surface.table_context()
    }

    /// Insert a table of the picked size, clamped to the configured bounds.
    pub fn insert_table(&mut self, dimensions: TableDimensions) -> CommandOutcome {
        self.apply(dimensions.clamped(&self.options).command())
    }

    pub fn toolbar(&self) -> Vec<ToolbarGroup> {
        toolbar_state(&self.surface, &self.options, self.upload_pending)
    }

    // === Image upload ===

    pub fn is_upload_pending(&self) -> bool {
        self.upload_pending
    }

    /// Claim the upload slot. Only one upload may be in flight.
    pub fn begin_upload(&mut self) -> Result<(), UploadError> {
        if self.upload_pending {
            return Err(UploadError::Busy);
        }
        self.upload_pending = true;
        Ok(())
    }

    /// Finish an upload started with [`ContentEditor::begin_upload`].
    ///
    /// On success the image is inserted at the cursor, selected, and the
    /// metadata form opens. On failure the document is untouched and the host
    /// gets exactly one notice. The upload slot is released either way.
    pub fn finish_upload(
        &mut self,
        result: Result<String, UploadError>,
    ) -> Result<ImageLocator, UploadError> {
        self.upload_pending = false;
        match self.insert_uploaded(result) {
            Ok(at) => Ok(at),
            Err(err) => {
                tracing::warn!(error = %err, "image upload failed");
                self.host.notify(Notice::UploadFailed(err.clone()));
                Err(err)
            }
        }
    }

    fn insert_uploaded(
        &mut self,
        result: Result<String, UploadError>,
    ) -> Result<ImageLocator, UploadError> {
        let src = accept_uploaded_src(&result?)?;
        let attrs = ImageAttrs::new(src);
        if !self.apply(EditorCommand::SetImage(attrs.clone())).changed_document() {
            return Err(UploadError::NotInsertable);
        }
        let at = self
            .surface
            .selected_image()
            .ok_or(UploadError::NotInsertable)?;
        self.image_form = Some(ImageMetadataForm::open(at.clone(), &attrs, FormOrigin::Upload));
        Ok(at)
    }

    /// Upload `file` through `uploader` and insert the result.
    pub async fn upload_image<U: ImageUpload>(
        &mut self,
        uploader: &U,
        file: ImageFile,
    ) -> Result<ImageLocator, UploadError> {
        self.begin_upload()?;
        tracing::debug!(name = %file.name, size = file.bytes.len(), "uploading image");
        let result = {
            let _slot = UploadSlotGuard(&mut self.upload_pending);
            uploader.upload(file).await
        };
        self.finish_upload(result)
    }

    // === Image metadata form ===

    /// Open the metadata form for the selected image, pre-filled from the node.
    pub fn open_image_form(&mut self) -> Option<&ImageMetadataForm> {
        let at = self.surface.selected_image()?;
        let attrs = self.surface.image_at(&at)?;
        self.image_form = Some(ImageMetadataForm::open(at, &attrs, FormOrigin::Edit));
        self.image_form.as_ref()
    }

    pub fn image_form(&self) -> Option<&ImageMetadataForm> {
        self.image_form.as_ref()
    }

    pub fn image_form_mut(&mut self) -> Option<&mut ImageMetadataForm> {
        self.image_form.as_mut()
    }

    /// Validate the form and patch the image node in place.
    ///
    /// A validation failure leaves the form open.
    pub fn submit_image_form(&mut self) -> Result<CommandOutcome, ImageFormError> {
        let form = self.image_form.as_ref().ok_or(ImageFormError::NotOpen)?;
        let metadata = form.validate()?;
        let at = form.target.clone();
        self.image_form = None;
        if self.surface.image_at(&at).is_none() {
            return Err(ImageFormError::ImageMissing);
        }
        Ok(self.apply(EditorCommand::UpdateImage { at, metadata }))
    }

    /// Close the form. The image stays with whatever metadata it has.
    pub fn cancel_image_form(&mut self) {
        self.image_form = None;
    }

    // === Link form ===

    /// Open the link form for the selected text.
    ///
    /// With nothing selected the host is told to select text first and the
    /// form stays closed.
    pub fn open_link_form(&mut self) -> Option<&mut LinkForm> {
        if self.surface.selected_text().trim().is_empty() {
            self.host.notify(Notice::SelectTextFirst);
            return None;
        }
        let current = self.surface.link_at_selection();
        self.link_form = Some(LinkForm::open(current.as_deref()));
        self.link_form.as_mut()
    }

    pub fn link_form(&self) -> Option<&LinkForm> {
        self.link_form.as_ref()
    }

    pub fn link_form_mut(&mut self) -> Option<&mut LinkForm> {
        self.link_form.as_mut()
    }

    /// Apply the form's href. An empty href just closes the form.
    pub fn submit_link_form(&mut self) -> CommandOutcome {
        let Some(form) = self.link_form.take() else {
            return CommandOutcome::Unchanged;
        };
        match form.submit() {
            Some(href) => self.apply(EditorCommand::SetLink { href }),
            None => CommandOutcome::Unchanged,
        }
    }

    pub fn cancel_link_form(&mut self) {
        self.link_form = None;
    }

    /// Remove the link under the cursor or selection.
    pub fn unset_link(&mut self) -> CommandOutcome {
        self.apply(EditorCommand::UnsetLink)
    }

    /// Current anchor id of the `index`-th heading, as stored in the surface.
    pub fn heading_id(&self, index: usize) -> Option<SmolStr> {
        self.surface
            .live_headings()
            .into_iter()
            .nth(index)
            .map(|heading| heading.id)
            .filter(|id| !id.is_empty())
    }
}
