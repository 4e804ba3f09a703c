//! Core editor types: selections and node locators.

use crate::model::BlockPath;

/// Position inside a table grid, in row/column units.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

impl GridPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Editor selection.
///
/// Text selections are confined to a single textual block. The anchor is where
/// the selection started, the head is where the cursor is now. Offsets count
/// characters, with images and hard breaks counting one unit each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Text {
        block: BlockPath,
        anchor: usize,
        head: usize,
    },
    /// A rectangular selection of table cells.
    Cells {
        table: BlockPath,
        anchor: GridPos,
        head: GridPos,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Self::caret(BlockPath::root(0), 0)
    }
}

impl Selection {
    /// A collapsed selection (cursor position).
    pub fn caret(block: BlockPath, offset: usize) -> Self {
        Selection::Text {
            block,
            anchor: offset,
            head: offset,
        }
    }

    pub fn text(block: BlockPath, anchor: usize, head: usize) -> Self {
        Selection::Text {
            block,
            anchor,
            head,
        }
    }

    pub fn cells(table: BlockPath, anchor: GridPos, head: GridPos) -> Self {
        Selection::Cells {
            table,
            anchor,
            head,
        }
    }

    /// Block the selection lives in. For cell selections this is the table.
    pub fn block(&self) -> &BlockPath {
        match self {
            Selection::Text { block, .. } => block,
            Selection::Cells { table, .. } => table,
        }
    }

    /// Ordered text bounds, if this is a text selection.
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        match self {
            Selection::Text { anchor, head, .. } => Some(*anchor.min(head)..*anchor.max(head)),
            Selection::Cells { .. } => None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Text { anchor, head, .. } => anchor == head,
            Selection::Cells { .. } => false,
        }
    }
}

/// Locates an inline image: the text block holding it and its offset there.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageLocator {
    pub block: BlockPath,
    pub offset: usize,
}

impl ImageLocator {
    pub fn new(block: BlockPath, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Where the cursor sits relative to a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableContext {
    /// Path of the table block.
    pub table: BlockPath,
    /// Grid position of the current cell (top-left corner for cell selections).
    pub cell: GridPos,
    pub rows: usize,
    pub cols: usize,
}
