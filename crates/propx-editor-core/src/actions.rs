//! Editor commands and active-state queries.
//!
//! `EditorCommand` is the single vocabulary every editing surface understands:
//! typing, formatting, block changes, images, tables and history all go through
//! it. `ActiveQuery` asks whether a format currently applies at the selection.

use smol_str::SmolStr;

use crate::image::ImageMetadata;
use crate::model::{Align, ImageAttrs, MarkKind};
use crate::types::{ImageLocator, Selection};

/// A semantic editing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    // === Text ===
    /// Insert text at the selection, replacing any selected text.
    InsertText(String),
    /// Backspace.
    DeleteBackward,
    /// Enter: split the current block.
    SplitBlock,
    /// Shift+Enter.
    InsertHardBreak,
    SetSelection(Selection),

    // === Marks ===
    ToggleMark(MarkKind),
    SetLink {
        href: String,
    },
    UnsetLink,

    // === Blocks ===
    SetParagraph,
    ToggleHeading {
        level: u8,
    },
    SetTextAlign(Align),
    ToggleBulletList,
    ToggleOrderedList,
    ToggleBlockquote,
    ToggleInfoBox,
    ToggleCodeBlock,
    SetHorizontalRule,

    // === Images ===
    /// Insert an image at the cursor and select it.
    SetImage(ImageAttrs),
    /// Patch alt/title/caption of an existing image in place.
    UpdateImage {
        at: ImageLocator,
        metadata: ImageMetadata,
    },

    // === Tables ===
    InsertTable {
        rows: usize,
        cols: usize,
        with_header_row: bool,
    },
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    DeleteTable,
    MergeCells,
    SplitCell,
    ToggleHeaderRow,
    ToggleHeaderColumn,
    ToggleHeaderCell,
    SetCellAlign(Align),

    // === History ===
    Undo,
    Redo,

    /// Set (or clear) the anchor id of the `heading`-th heading in document
    /// order. Used by id reconciliation; not recorded in history.
    SetHeadingId {
        heading: usize,
        id: Option<SmolStr>,
    },
}

impl EditorCommand {
    /// Commands that only make sense with the cursor inside a table.
    pub fn requires_table(&self) -> bool {
        matches!(
            self,
            EditorCommand::AddRowBefore
                | EditorCommand::AddRowAfter
                | EditorCommand::DeleteRow
                | EditorCommand::AddColumnBefore
                | EditorCommand::AddColumnAfter
                | EditorCommand::DeleteColumn
                | EditorCommand::DeleteTable
                | EditorCommand::MergeCells
                | EditorCommand::SplitCell
                | EditorCommand::ToggleHeaderRow
                | EditorCommand::ToggleHeaderColumn
                | EditorCommand::ToggleHeaderCell
                | EditorCommand::SetCellAlign(_)
        )
    }

    /// Whether a successful run of this command is an undoable step.
    pub fn is_recorded(&self) -> bool {
        !matches!(
            self,
            EditorCommand::SetSelection(_)
                | EditorCommand::Undo
                | EditorCommand::Redo
                | EditorCommand::SetHeadingId { .. }
        )
    }
}

/// Format state queries used for toolbar highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveQuery {
    Mark(MarkKind),
    Link,
    Paragraph,
    Heading(u8),
    BulletList,
    OrderedList,
    Blockquote,
    InfoBox,
    CodeBlock,
    TextAlign(Align),
    Table,
    Image,
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command did not apply in the current context.
    Unchanged,
    /// Only the selection or pending marks moved.
    SelectionChanged,
    /// The document itself changed.
    DocumentChanged,
}

impl CommandOutcome {
    pub fn changed_document(&self) -> bool {
        matches!(self, CommandOutcome::DocumentChanged)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, CommandOutcome::Unchanged)
    }
}
