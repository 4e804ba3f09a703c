//! Editing surface abstraction and the built-in document-backed surface.

use smol_str::{SmolStr, format_smolstr};

use crate::actions::{ActiveQuery, CommandOutcome, EditorCommand};
use crate::execute::{self, EditorState};
use crate::headings::{HeadingDescriptor, assign_missing_ids, ensure_heading_ids};
use crate::html::to_html;
use crate::model::{Document, ImageAttrs};
use crate::slug::DuplicateIdPolicy;
use crate::types::{ImageLocator, Selection, TableContext};
use crate::undo::{History, UndoManager};

/// An editing surface the content editor drives.
///
/// Every edit goes through [`EditingSurface::apply_command`]; a
/// [`CommandOutcome::DocumentChanged`] result is the surface's change signal.
pub trait EditingSurface {
    // === Required: Content ===

    /// Serialize the live document to HTML.
    fn get_html(&self) -> String;

    /// Heading outline of the live document, ids as currently stored.
    ///
    /// Headings without an id report an empty one.
    fn live_headings(&self) -> Vec<HeadingDescriptor>;

    // === Required: Commands ===

    /// Run a command and report what changed.
    fn apply_command(&mut self, command: &EditorCommand) -> CommandOutcome;

    /// Whether `command` would change anything right now.
    fn can_apply(&self, command: &EditorCommand) -> bool;

    /// Whether a format is active at the selection.
    fn is_active(&self, query: &ActiveQuery) -> bool;

    // === Required: Selection context ===

    fn selection(&self) -> Selection;

    /// Text covered by the selection.
    fn selected_text(&self) -> String;

    /// The image node the selection covers, if any.
    fn selected_image(&self) -> Option<ImageLocator>;

    /// Attributes of the image node at `at`.
    fn image_at(&self, at: &ImageLocator) -> Option<ImageAttrs>;

    /// Href of the link under the selection.
    fn link_at_selection(&self) -> Option<String>;

    /// Table position of the cursor, when inside a table.
    fn table_context(&self) -> Option<TableContext>;

    // === Provided ===

    /// HTML with an id on every heading that has text but no id yet.
    ///
    /// The default re-parses [`EditingSurface::get_html`]; surfaces that own
    /// a model should assign ids on it so the rest of the markup is untouched.
    fn html_with_heading_ids(&self, policy: DuplicateIdPolicy) -> String {
        ensure_heading_ids(&self.get_html(), policy).into_owned()
    }

    /// True when the selection spans at least one character.
    fn has_text_selection(&self) -> bool {
        match self.selection() {
            Selection::Text { anchor, head, .. } => anchor != head,
            Selection::Cells { .. } => false,
        }
    }

    fn is_inside_table(&self) -> bool {
        self.table_context().is_some()
    }
}

/// Surface over an in-memory [`Document`] with snapshot undo.
#[derive(Debug, Clone)]
pub struct DocumentSurface {
    state: EditorState,
    history: History<EditorState>,
}

impl Default for DocumentSurface {
    fn default() -> Self {
        Self::new(Document::default(), History::<EditorState>::default().max_steps())
    }
}

impl DocumentSurface {
    pub fn new(doc: Document, history_depth: usize) -> Self {
        Self {
            state: EditorState::new(doc),
            history: History::new(history_depth),
        }
    }

    /// Seed a surface from HTML. Seeding is not an undoable step.
    pub fn from_html(html: &str, history_depth: usize) -> Self {
        Self {
            state: EditorState::from_html(html),
            history: History::new(history_depth),
        }
    }

    pub fn document(&self) -> &Document {
        &self.state.doc
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    fn run(&mut self, command: &EditorCommand) -> CommandOutcome {
        match command {
            EditorCommand::Undo => {
                if self.undo() {
                    CommandOutcome::DocumentChanged
                } else {
                    CommandOutcome::Unchanged
                }
            }
            EditorCommand::Redo => {
                if self.redo() {
                    CommandOutcome::DocumentChanged
                } else {
                    CommandOutcome::Unchanged
                }
            }
            _ => {
                let before = command.is_recorded().then(|| self.state.clone());
                let outcome = execute::execute_command(&mut self.state, command);
                if let (Some(before), CommandOutcome::DocumentChanged) = (before, outcome) {
                    self.history.record(before);
                }
                outcome
            }
        }
    }
}

fn heading_tag(level: u8) -> SmolStr {
    format_smolstr!("h{level}")
}

impl EditingSurface for DocumentSurface {
    fn get_html(&self) -> String {
        to_html(&self.state.doc)
    }

    fn html_with_heading_ids(&self, policy: DuplicateIdPolicy) -> String {
        let mut doc = self.state.doc.clone();
        assign_missing_ids(&mut doc, policy);
        to_html(&doc)
    }

    fn live_headings(&self) -> Vec<HeadingDescriptor> {
        self.state
            .doc
            .headings()
            .into_iter()
            .map(|(_, heading)| HeadingDescriptor {
                id: heading.id.clone().unwrap_or_default(),
                text: heading.content.text_content().trim().to_owned(),
                level: heading.level,
                tag: heading_tag(heading.level),
            })
            .collect()
    }

    fn apply_command(&mut self, command: &EditorCommand) -> CommandOutcome {
        let outcome = self.run(command);
        tracing::debug!(?command, ?outcome, "applied editor command");
        outcome
    }

    fn can_apply(&self, command: &EditorCommand) -> bool {
        match command {
            EditorCommand::Undo => self.can_undo(),
            EditorCommand::Redo => self.can_redo(),
            _ => {
                let mut probe = self.state.clone();
                !execute::execute_command(&mut probe, command).is_noop()
            }
        }
    }

    fn is_active(&self, query: &ActiveQuery) -> bool {
        execute::is_active(&self.state, query)
    }

    fn selection(&self) -> Selection {
        self.state.selection.clone()
    }

    fn selected_text(&self) -> String {
        execute::selected_text(&self.state)
    }

    fn selected_image(&self) -> Option<ImageLocator> {
        execute::selected_image(&self.state)
    }

    fn image_at(&self, at: &ImageLocator) -> Option<ImageAttrs> {
        execute::image_at(&self.state.doc, at).cloned()
    }

    fn link_at_selection(&self) -> Option<String> {
        execute::link_at_selection(&self.state)
    }

    fn table_context(&self) -> Option<TableContext> {
        execute::table_context(&self.state)
    }
}

impl UndoManager for DocumentSurface {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        self.history.undo(&mut self.state)
    }

    fn redo(&mut self) -> bool {
        self.history.redo(&mut self.state)
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockPath;

    #[test]
    fn test_undo_restores_document_and_selection() {
        let mut surface = DocumentSurface::from_html("<p>abc</p>", 10);
        surface.apply_command(&EditorCommand::SetSelection(Selection::caret(
            BlockPath::root(0),
            3,
        )));
        surface.apply_command(&EditorCommand::InsertText("d".into()));
        assert_eq!(surface.get_html(), "<p>abcd</p>");

        assert_eq!(
            surface.apply_command(&EditorCommand::Undo),
            CommandOutcome::DocumentChanged
        );
        assert_eq!(surface.get_html(), "<p>abc</p>");
        assert_eq!(surface.selection(), Selection::caret(BlockPath::root(0), 3));

        surface.apply_command(&EditorCommand::Redo);
        assert_eq!(surface.get_html(), "<p>abcd</p>");
        assert_eq!(
            surface.apply_command(&EditorCommand::Redo),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_noops_and_selection_are_not_recorded() {
        let mut surface = DocumentSurface::from_html("<p>abc</p>", 10);
        surface.apply_command(&EditorCommand::DeleteTable);
        surface.apply_command(&EditorCommand::SetSelection(Selection::caret(
            BlockPath::root(0),
            1,
        )));
        assert!(!surface.can_undo());
        assert!(!surface.can_apply(&EditorCommand::Undo));
    }

    #[test]
    fn test_heading_id_updates_bypass_history() {
        let mut surface = DocumentSurface::from_html("<h2>Title</h2>", 10);
        surface.apply_command(&EditorCommand::SetHeadingId {
            heading: 0,
            id: Some("title".into()),
        });
        assert_eq!(surface.get_html(), r#"<h2 id="title">Title</h2>"#);
        assert!(!surface.can_undo());
    }

    #[test]
    fn test_can_apply_does_not_mutate() {
        let surface = DocumentSurface::from_html("<p>abc</p>", 10);
        assert!(surface.can_apply(&EditorCommand::ToggleHeading { level: 2 }));
        assert!(!surface.can_apply(&EditorCommand::AddRowAfter));
        assert_eq!(surface.get_html(), "<p>abc</p>");
    }

    #[test]
    fn test_heading_ids_assigned_without_reparsing() {
        let mut surface = DocumentSurface::from_html("<h2>Title</h2><p>Getting S</p>", 10);
        surface.apply_command(&EditorCommand::SetSelection(Selection::caret(
            BlockPath::root(1),
            9,
        )));
        surface.apply_command(&EditorCommand::InsertText(" ".into()));
        assert_eq!(surface.get_html(), "<h2>Title</h2><p>Getting S </p>");
        assert_eq!(
            surface.html_with_heading_ids(DuplicateIdPolicy::Suffix),
            r#"<h2 id="title">Title</h2><p>Getting S </p>"#
        );
        // The live model keeps its ids until reconciliation sets them.
        assert_eq!(surface.live_headings()[0].id, "");
    }

    #[test]
    fn test_live_headings_report_stored_ids() {
        let surface = DocumentSurface::from_html(r#"<h1 id="a">One</h1><h3> Two </h3>"#, 10);
        let live = surface.live_headings();
        assert_eq!(live.len(), 2);
        assert_eq!((live[0].id.as_str(), live[0].tag.as_str()), ("a", "h1"));
        assert_eq!((live[1].id.as_str(), live[1].text.as_str()), ("", "Two"));
    }
}
