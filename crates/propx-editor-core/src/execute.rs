//! Command execution against editor state.
//!
//! `execute_command` is the central dispatch point for all editing operations.
//! Each handler checks its preconditions and returns `false` when the command
//! does not apply; the dispatcher then restores the previous state and reports
//! [`CommandOutcome::Unchanged`]. Whether a handled command changed the
//! document or only the selection is decided by comparing before and after.

use std::ops::Range;

use crate::actions::{ActiveQuery, CommandOutcome, EditorCommand};
use crate::html::from_html;
use crate::image::ImageMetadata;
use crate::link::normalize_href;
use crate::model::{
    Align, Block, BlockPath, CodeBlock, Document, Heading, ImageAttrs, Inline, Link, List,
    ListItem, ListKind, MarkKind, Marks, Table, TextBlock, char_to_byte,
};
use crate::table::{self, CellRef, Rect, TableMap};
use crate::types::{GridPos, ImageLocator, Selection, TableContext};

/// Document plus selection and pending marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks to apply to the next inserted text, set by toggling a mark on a caret.
    pub stored_marks: Option<Marks>,
}

impl EditorState {
    /// Wrap a document, placing the caret at the start of its first text block.
    pub fn new(mut doc: Document) -> Self {
        doc.ensure_not_empty();
        if first_textual_in(&doc, &[], 0).is_none() {
            doc.blocks.push(Block::empty_paragraph());
        }
        let mut state = Self {
            doc,
            selection: Selection::default(),
            stored_marks: None,
        };
        state.selection = state.start_selection();
        state
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(from_html(html))
    }

    fn start_selection(&self) -> Selection {
        let block = first_textual_in(&self.doc, &[], 0).unwrap_or_else(|| BlockPath::root(0));
        Selection::caret(block, 0)
    }

    /// Clamp the selection to the document, falling back to the document start.
    pub fn fix_selection(&mut self) {
        let valid = match &mut self.selection {
            Selection::Text {
                block,
                anchor,
                head,
            } => match self.doc.block(block) {
                Some(b) if b.is_textual() => {
                    let len = b.content_len();
                    *anchor = (*anchor).min(len);
                    *head = (*head).min(len);
                    true
                }
                _ => false,
            },
            Selection::Cells {
                table,
                anchor,
                head,
            } => match self.doc.block(table) {
                Some(Block::Table(t)) => {
                    let map = TableMap::new(t);
                    let inside = |p: &GridPos| p.row < map.height && p.col < map.width;
                    inside(anchor) && inside(head)
                }
                _ => false,
            },
        };
        if !valid {
            self.selection = self.start_selection();
        }
    }

    fn text_target(&self) -> Option<(BlockPath, Range<usize>)> {
        match &self.selection {
            Selection::Text { block, .. } => Some((block.clone(), self.selection.range()?)),
            Selection::Cells { .. } => None,
        }
    }

    fn set_caret(&mut self, block: BlockPath, offset: usize) {
        self.selection = Selection::caret(block, offset);
    }

    /// The text block (paragraph or heading) holding the selection.
    pub fn current_text_block(&self) -> Option<&TextBlock> {
        match &self.selection {
            Selection::Text { block, .. } => self.doc.block(block)?.text_block(),
            Selection::Cells { .. } => None,
        }
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.doc.block(self.selection.block())
    }
}

/// Execute an editor command.
///
/// `Undo` and `Redo` are history operations and always report `Unchanged` here;
/// the owning surface handles them.
pub fn execute_command(state: &mut EditorState, command: &EditorCommand) -> CommandOutcome {
    state.fix_selection();
    let before = state.clone();

    let handled = match command {
        EditorCommand::InsertText(text) => execute_insert_text(state, text),
        EditorCommand::DeleteBackward => execute_delete_backward(state),
        EditorCommand::SplitBlock => execute_split_block(state),
        EditorCommand::InsertHardBreak => execute_hard_break(state),
        EditorCommand::SetSelection(selection) => execute_set_selection(state, selection),
        EditorCommand::ToggleMark(kind) => execute_toggle_mark(state, *kind),
        EditorCommand::SetLink { href } => execute_set_link(state, href),
        EditorCommand::UnsetLink => execute_unset_link(state),
        EditorCommand::SetParagraph => execute_set_paragraph(state),
        EditorCommand::ToggleHeading { level } => execute_toggle_heading(state, *level),
        EditorCommand::SetTextAlign(align) => execute_set_text_align(state, *align),
        EditorCommand::ToggleBulletList => execute_toggle_list(state, ListKind::Bullet),
        EditorCommand::ToggleOrderedList => execute_toggle_list(state, ListKind::Ordered),
        EditorCommand::ToggleBlockquote => execute_toggle_wrap(state, WrapKind::Blockquote),
        EditorCommand::ToggleInfoBox => execute_toggle_wrap(state, WrapKind::InfoBox),
        EditorCommand::ToggleCodeBlock => execute_toggle_code_block(state),
        EditorCommand::SetHorizontalRule => execute_horizontal_rule(state),
        EditorCommand::SetImage(attrs) => execute_set_image(state, attrs),
        EditorCommand::UpdateImage { at, metadata } => execute_update_image(state, at, metadata),
        EditorCommand::InsertTable {
            rows,
            cols,
            with_header_row,
        } => execute_insert_table(state, *rows, *cols, *with_header_row),
        EditorCommand::AddRowBefore => execute_add_row(state, true),
        EditorCommand::AddRowAfter => execute_add_row(state, false),
        EditorCommand::DeleteRow => execute_delete_rows(state),
        EditorCommand::AddColumnBefore => execute_add_column(state, true),
        EditorCommand::AddColumnAfter => execute_add_column(state, false),
        EditorCommand::DeleteColumn => execute_delete_columns(state),
        EditorCommand::DeleteTable => execute_delete_table(state),
        EditorCommand::MergeCells => execute_merge_cells(state),
        EditorCommand::SplitCell => execute_split_cell(state),
        EditorCommand::ToggleHeaderRow => execute_toggle_header(state, HeaderScope::Row),
        EditorCommand::ToggleHeaderColumn => execute_toggle_header(state, HeaderScope::Column),
        EditorCommand::ToggleHeaderCell => execute_toggle_header(state, HeaderScope::Cell),
        EditorCommand::SetCellAlign(align) => execute_set_cell_align(state, *align),
        EditorCommand::SetHeadingId { heading, id } => {
            execute_set_heading_id(state, *heading, id.as_deref())
        }
        EditorCommand::Undo | EditorCommand::Redo => false,
    };

    if !handled {
        *state = before;
        return CommandOutcome::Unchanged;
    }

    state.fix_selection();
    if state.doc != before.doc {
        CommandOutcome::DocumentChanged
    } else if state.selection != before.selection || state.stored_marks != before.stored_marks {
        CommandOutcome::SelectionChanged
    } else {
        CommandOutcome::Unchanged
    }
}

// === Path helpers ===

fn first_textual_in(doc: &Document, container: &[usize], from: usize) -> Option<BlockPath> {
    let blocks = doc.container(container)?;
    let base = BlockPath::from_slice(container);
    (from..blocks.len()).find_map(|i| doc.first_textual(&base.join(&[i])))
}

/// Nearest enclosing block matching `pred`, innermost first.
fn nearest_ancestor(
    doc: &Document,
    path: &[usize],
    pred: impl Fn(&Block) -> bool,
) -> Option<BlockPath> {
    doc.ancestors(path)
        .into_iter()
        .find(|ancestor| doc.block(ancestor).is_some_and(&pred))
}

fn is_empty_paragraph(block: &Block) -> bool {
    matches!(block, Block::Paragraph(p) if p.is_empty())
}

/// Insert `block` at the cursor block: replace it if it is an empty paragraph,
/// otherwise insert after it. A text block is kept after the new block.
fn insert_block_at_cursor(state: &mut EditorState, path: &BlockPath, block: Block) -> Option<BlockPath> {
    let idx = path.last()?;
    let replace = is_empty_paragraph(state.doc.block(path)?);
    let container = state.doc.container_mut(path.container())?;
    let new_idx = if replace {
        container[idx] = block;
        idx
    } else {
        container.insert(idx + 1, block);
        idx + 1
    };
    let needs_trailing = !container
        .get(new_idx + 1)
        .is_some_and(|next| matches!(next, Block::Paragraph(_) | Block::Heading(_)));
    if needs_trailing {
        container.insert(new_idx + 1, Block::empty_paragraph());
    }
    Some(path.with_last(new_idx))
}

// === Text editing ===

fn insertion_marks(text: &TextBlock, range: &Range<usize>) -> Marks {
    if range.is_empty() {
        return text.marks_at(range.start);
    }
    match text.inline_at(range.start) {
        Some((_, Inline::Text { marks, .. })) => marks.clone(),
        _ => Marks::default(),
    }
}

fn delete_code_range(code: &mut CodeBlock, range: Range<usize>) {
    let start = char_to_byte(&code.code, range.start);
    let end = char_to_byte(&code.code, range.end);
    code.code.replace_range(start..end, "");
}

fn insert_code_text(code: &mut CodeBlock, offset: usize, text: &str) {
    let at = char_to_byte(&code.code, offset);
    code.code.insert_str(at, text);
}

fn execute_insert_text(state: &mut EditorState, text: &str) -> bool {
    let Some((path, range)) = state.text_target() else {
        return false;
    };
    if text.is_empty() && range.is_empty() {
        return false;
    }
    let stored = state.stored_marks.take();
    let caret = match state.doc.block_mut(&path) {
        Some(Block::CodeBlock(code)) => {
            delete_code_range(code, range.clone());
            insert_code_text(code, range.start, text);
            range.start + text.chars().count()
        }
        Some(block) => {
            let Some(tb) = block.text_block_mut() else {
                return false;
            };
            let marks = stored.unwrap_or_else(|| insertion_marks(tb, &range));
            tb.delete_range(range.clone());
            let mut offset = range.start;
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    tb.insert_inline(offset, Inline::HardBreak);
                    offset += 1;
                }
                tb.insert_text(offset, line, marks.clone());
                offset += line.chars().count();
            }
            offset
        }
        None => return false,
    };
    state.set_caret(path, caret);
    true
}

fn delete_in_block(state: &mut EditorState, path: &BlockPath, range: Range<usize>) -> bool {
    match state.doc.block_mut(path) {
        Some(Block::CodeBlock(code)) => {
            delete_code_range(code, range);
            true
        }
        Some(block) => match block.text_block_mut() {
            Some(tb) => {
                tb.delete_range(range);
                true
            }
            None => false,
        },
        None => false,
    }
}

fn execute_delete_backward(state: &mut EditorState) -> bool {
    let Some((path, range)) = state.text_target() else {
        return false;
    };
    if !range.is_empty() {
        let start = range.start;
        if !delete_in_block(state, &path, range) {
            return false;
        }
        state.set_caret(path, start);
        return true;
    }
    if range.start > 0 {
        let start = range.start - 1;
        if !delete_in_block(state, &path, start..range.start) {
            return false;
        }
        state.set_caret(path, start);
        return true;
    }
    join_backward(state, &path)
}

/// Backspace at the start of a block.
fn join_backward(state: &mut EditorState, path: &BlockPath) -> bool {
    let Some(block) = state.doc.block(path) else {
        return false;
    };

    // Non-paragraph text blocks first turn into paragraphs.
    match block {
        Block::Heading(heading) => {
            let content = heading.content.clone();
            if let Some(slot) = state.doc.block_mut(path) {
                *slot = Block::Paragraph(content);
            }
            return true;
        }
        Block::CodeBlock(code) => {
            let content = TextBlock::from_code_text(&code.code);
            if let Some(slot) = state.doc.block_mut(path) {
                *slot = Block::Paragraph(content);
            }
            return true;
        }
        Block::Paragraph(_) => {}
        _ => return false,
    }

    let Some(idx) = path.last() else {
        return false;
    };

    if idx > 0 {
        let prev_path = path.with_last(idx - 1);
        return join_into_previous(state, path, &prev_path);
    }

    // First block of its container: lift it out of the wrapper.
    let Some(parent) = state.doc.ancestors(path).into_iter().next() else {
        return false;
    };
    match state.doc.block(&parent) {
        Some(Block::Blockquote(_)) | Some(Block::InfoBox(_)) => {
            let Some(new_path) = lift_out(&mut state.doc, &parent, idx) else {
                return false;
            };
            state.set_caret(new_path, 0);
            true
        }
        Some(Block::List(_)) => {
            let item = path[parent.len()];
            if item == 0 {
                let Some(first) = lift_list_item(&mut state.doc, &parent, 0) else {
                    return false;
                };
                state.set_caret(first, 0);
                true
            } else {
                merge_list_item_backward(state, &parent, item)
            }
        }
        _ => false,
    }
}

fn join_into_previous(state: &mut EditorState, path: &BlockPath, prev_path: &BlockPath) -> bool {
    let Some(prev) = state.doc.block(prev_path) else {
        return false;
    };
    match prev {
        Block::HorizontalRule => {
            let Some(container) = state.doc.container_mut(path.container()) else {
                return false;
            };
            if let Some(idx) = prev_path.last() {
                container.remove(idx);
            }
            state.set_caret(prev_path.clone(), 0);
            true
        }
        Block::CodeBlock(code) => {
            let join_at = code.code.chars().count();
            let Some(Block::Paragraph(current)) = remove_block(&mut state.doc, path) else {
                return false;
            };
            if let Some(Block::CodeBlock(code)) = state.doc.block_mut(prev_path) {
                code.code.push_str(&current.to_code_text());
            }
            state.set_caret(prev_path.clone(), join_at);
            true
        }
        Block::Paragraph(_) | Block::Heading(_) => append_paragraph_into(state, path, prev_path),
        Block::List(_) | Block::Blockquote(_) | Block::InfoBox(_) => {
            let Some(target) = last_text_block_in(&state.doc, prev_path) else {
                return false;
            };
            append_paragraph_into(state, path, &target)
        }
        _ => false,
    }
}

/// Move the paragraph at `path` onto the end of the text block at `target`.
fn append_paragraph_into(state: &mut EditorState, path: &BlockPath, target: &BlockPath) -> bool {
    let Some(join_at) = state.doc.block(target).and_then(Block::text_block).map(TextBlock::len) else {
        return false;
    };
    let Some(Block::Paragraph(current)) = remove_block(&mut state.doc, path) else {
        return false;
    };
    let Some(tb) = state.doc.block_mut(target).and_then(Block::text_block_mut) else {
        return false;
    };
    tb.append(current);
    state.set_caret(target.clone(), join_at);
    true
}

fn last_text_block_in(doc: &Document, path: &BlockPath) -> Option<BlockPath> {
    let candidate = match doc.block(path)? {
        Block::Paragraph(_) | Block::Heading(_) => return Some(path.clone()),
        Block::Blockquote(children) | Block::InfoBox(children) => {
            path.join(&[children.len().checked_sub(1)?])
        }
        Block::List(list) => {
            let item = list.items.len().checked_sub(1)?;
            let child = list.items[item].blocks.len().checked_sub(1)?;
            path.join(&[item, child])
        }
        _ => return None,
    };
    last_text_block_in(doc, &candidate)
}

fn remove_block(doc: &mut Document, path: &BlockPath) -> Option<Block> {
    let idx = path.last()?;
    let container = doc.container_mut(path.container())?;
    if idx < container.len() {
        Some(container.remove(idx))
    } else {
        None
    }
}

fn merge_list_item_backward(state: &mut EditorState, list_path: &BlockPath, item: usize) -> bool {
    let Some(Block::List(list)) = state.doc.block_mut(list_path) else {
        return false;
    };
    if item == 0 || item >= list.items.len() {
        return false;
    }
    let moved = list.items.remove(item);
    let prev = &mut list.items[item - 1];
    let mut blocks = moved.blocks.into_iter();

    let mut caret = None;
    if let Some(first) = blocks.next() {
        let last_idx = prev.blocks.len().saturating_sub(1);
        let joins = matches!(prev.blocks.last(), Some(Block::Paragraph(_)));
        match first {
            Block::Paragraph(text) if joins => {
                if let Some(Block::Paragraph(target)) = prev.blocks.last_mut() {
                    caret = Some((last_idx, target.len()));
                    target.append(text);
                }
            }
            other => {
                caret = Some((prev.blocks.len(), 0));
                prev.blocks.push(other);
            }
        }
    }
    prev.blocks.extend(blocks);

    if let Some((child, offset)) = caret {
        state.set_caret(list_path.join(&[item - 1, child]), offset);
    }
    true
}

/// Lift child `child` of the blockquote/info box at `wrapper` out of it,
/// splitting the wrapper around it. Returns the lifted block's new path.
fn lift_out(doc: &mut Document, wrapper: &BlockPath, child: usize) -> Option<BlockPath> {
    let w_idx = wrapper.last()?;
    let container = doc.container_mut(wrapper.container())?;
    let old = container.get(w_idx)?.clone();
    let (make, mut children): (fn(Vec<Block>) -> Block, Vec<Block>) = match old {
        Block::Blockquote(children) => (Block::Blockquote, children),
        Block::InfoBox(children) => (Block::InfoBox, children),
        _ => return None,
    };
    if child >= children.len() {
        return None;
    }
    let after: Vec<Block> = children.split_off(child + 1);
    let lifted = children.pop()?;
    let before = children;

    let mut replacement = Vec::new();
    let offset = if before.is_empty() {
        0
    } else {
        replacement.push(make(before));
        1
    };
    replacement.push(lifted);
    if !after.is_empty() {
        replacement.push(make(after));
    }
    container.splice(w_idx..=w_idx, replacement);
    Some(wrapper.with_last(w_idx + offset))
}

/// Lift list item `item` out of the list at `list_path`, splitting the list
/// around it. Returns the path of the item's first block.
fn lift_list_item(doc: &mut Document, list_path: &BlockPath, item: usize) -> Option<BlockPath> {
    let l_idx = list_path.last()?;
    let container = doc.container_mut(list_path.container())?;
    let Some(Block::List(list)) = container.get(l_idx).cloned() else {
        return None;
    };
    if item >= list.items.len() {
        return None;
    }
    let mut items = list.items;
    let after: Vec<ListItem> = items.split_off(item + 1);
    let lifted = items.pop()?;
    let before = items;

    let mut replacement = Vec::new();
    let offset = if before.is_empty() {
        0
    } else {
        replacement.push(Block::List(List {
            kind: list.kind,
            start: list.start,
            items: before,
        }));
        1
    };
    replacement.extend(lifted.blocks);
    if !after.is_empty() {
        replacement.push(Block::List(List {
            kind: list.kind,
            start: list.start + item as u32 + 1,
            items: after,
        }));
    }
    container.splice(l_idx..=l_idx, replacement);
    Some(list_path.with_last(l_idx + offset))
}

fn execute_split_block(state: &mut EditorState) -> bool {
    let Some((path, range)) = state.text_target() else {
        return false;
    };
    if !range.is_empty() && !delete_in_block(state, &path, range.clone()) {
        return false;
    }
    let offset = range.start;

    if let Some(Block::CodeBlock(code)) = state.doc.block_mut(&path) {
        insert_code_text(code, offset, "\n");
        state.set_caret(path, offset + 1);
        return true;
    }

    // Inside a list item: split the item, or leave the list from an empty one.
    if let Some(list_path) = state.doc.ancestors(&path).into_iter().next() {
        if matches!(state.doc.block(&list_path), Some(Block::List(_)))
            && path.len() == list_path.len() + 2
        {
            return split_list_item(state, &list_path, &path, offset);
        }
    }

    let Some(idx) = path.last() else {
        return false;
    };
    let Some(tail) = split_text_block(state.doc.block_mut(&path), offset) else {
        return false;
    };
    let Some(container) = state.doc.container_mut(path.container()) else {
        return false;
    };
    container.insert(idx + 1, tail);
    state.set_caret(path.with_last(idx + 1), 0);
    true
}

/// Split a paragraph or heading at `offset`, returning the new trailing block.
///
/// Splitting a heading at its end yields an empty paragraph; in the middle the
/// tail stays a heading of the same level without an id.
fn split_text_block(block: Option<&mut Block>, offset: usize) -> Option<Block> {
    match block? {
        Block::Paragraph(tb) => Some(Block::Paragraph(tb.split_off(offset))),
        Block::Heading(heading) => {
            let at_end = offset >= heading.content.len();
            let tail = heading.content.split_off(offset);
            if at_end {
                Some(Block::empty_paragraph())
            } else {
                Some(Block::Heading(Heading {
                    level: heading.level,
                    id: None,
                    content: tail,
                }))
            }
        }
        _ => None,
    }
}

fn split_list_item(
    state: &mut EditorState,
    list_path: &BlockPath,
    path: &BlockPath,
    offset: usize,
) -> bool {
    let item = path[list_path.len()];
    let child = path[list_path.len() + 1];

    let lone_empty = match state.doc.block(list_path) {
        Some(Block::List(list)) => list.items.get(item).is_some_and(|it| {
            it.blocks.len() == 1 && it.blocks.first().is_some_and(is_empty_paragraph)
        }),
        _ => false,
    };
    if lone_empty {
        let Some(first) = lift_list_item(&mut state.doc, list_path, item) else {
            return false;
        };
        state.set_caret(first, 0);
        return true;
    }

    let Some(tail) = split_text_block(state.doc.block_mut(path), offset) else {
        return false;
    };
    let Some(Block::List(list)) = state.doc.block_mut(list_path) else {
        return false;
    };
    let Some(current) = list.items.get_mut(item) else {
        return false;
    };
    let mut blocks = vec![tail];
    blocks.extend(current.blocks.drain(child + 1..));
    list.items.insert(item + 1, ListItem { blocks });
    state.set_caret(list_path.join(&[item + 1, 0]), 0);
    true
}

fn execute_hard_break(state: &mut EditorState) -> bool {
    let Some((path, range)) = state.text_target() else {
        return false;
    };
    match state.doc.block_mut(&path) {
        Some(Block::CodeBlock(code)) => {
            delete_code_range(code, range.clone());
            insert_code_text(code, range.start, "\n");
        }
        Some(block) => {
            let Some(tb) = block.text_block_mut() else {
                return false;
            };
            tb.delete_range(range.clone());
            tb.insert_inline(range.start, Inline::HardBreak);
        }
        None => return false,
    }
    state.set_caret(path, range.start + 1);
    true
}

fn execute_set_selection(state: &mut EditorState, selection: &Selection) -> bool {
    let valid = match selection {
        Selection::Text { block, .. } => state.doc.block(block).is_some_and(Block::is_textual),
        Selection::Cells {
            table,
            anchor,
            head,
        } => match state.doc.block(table) {
            Some(Block::Table(t)) => {
                let map = TableMap::new(t);
                [anchor, head]
                    .iter()
                    .all(|p| p.row < map.height && p.col < map.width)
            }
            _ => false,
        },
    };
    if !valid {
        return false;
    }
    if state.selection != *selection {
        state.stored_marks = None;
    }
    state.selection = selection.clone();
    true
}

// === Marks and links ===

/// Text block under a text selection, excluding code blocks.
fn text_block_target(state: &mut EditorState) -> Option<(BlockPath, Range<usize>, &mut TextBlock)> {
    let (path, range) = state.text_target()?;
    let tb = state.doc.block_mut(&path)?.text_block_mut()?;
    Some((path, range, tb))
}

fn execute_toggle_mark(state: &mut EditorState, kind: MarkKind) -> bool {
    let Some((path, range)) = state.text_target() else {
        return false;
    };
    let Some(tb) = state.doc.block(&path).and_then(Block::text_block) else {
        return false;
    };

    if range.is_empty() {
        let mut marks = state
            .stored_marks
            .clone()
            .unwrap_or_else(|| tb.marks_at(range.start));
        marks.set(kind, !marks.has(kind));
        state.stored_marks = Some(marks);
        return true;
    }

    let all = {
        let mut runs = tb.runs_in(range.clone()).peekable();
        if runs.peek().is_none() {
            return false;
        }
        runs.all(|m| m.has(kind))
    };
    let Some((_, _, tb)) = text_block_target(state) else {
        return false;
    };
    tb.update_marks(range, |m| m.set(kind, !all));
    true
}

/// Range of the link around `offset`, joining adjacent runs with the same href.
pub fn link_range_at(tb: &TextBlock, offset: usize) -> Option<(Range<usize>, Link)> {
    let mut spans = Vec::with_capacity(tb.inlines.len());
    let mut pos = 0;
    for inline in &tb.inlines {
        let len = inline.len();
        spans.push((pos..pos + len, inline.marks().and_then(|m| m.link.clone())));
        pos += len;
    }

    let hit = spans.iter().position(|(range, link)| {
        link.is_some() && (range.contains(&offset) || (offset > 0 && range.end == offset))
    })?;
    let link = spans[hit].1.clone()?;

    let mut start = hit;
    while start > 0 && spans[start - 1].1.as_ref() == Some(&link) {
        start -= 1;
    }
    let mut end = hit;
    while end + 1 < spans.len() && spans[end + 1].1.as_ref() == Some(&link) {
        end += 1;
    }
    Some((spans[start].0.start..spans[end].0.end, link))
}

fn execute_set_link(state: &mut EditorState, href: &str) -> bool {
    let Some(href) = normalize_href(href) else {
        return false;
    };
    let Some((_, range, tb)) = text_block_target(state) else {
        return false;
    };
    let range = if range.is_empty() {
        match link_range_at(tb, range.start) {
            Some((range, _)) => range,
            None => return false,
        }
    } else {
        range
    };
    let link = Link { href: href.into() };
    tb.update_marks(range, |m| m.link = Some(link.clone()));
    true
}

fn execute_unset_link(state: &mut EditorState) -> bool {
    let Some((_, range, tb)) = text_block_target(state) else {
        return false;
    };
    let range = if range.is_empty() {
        match link_range_at(tb, range.start) {
            Some((range, _)) => range,
            None => return false,
        }
    } else {
        if !tb.runs_in(range.clone()).any(|m| m.link.is_some()) {
            return false;
        }
        range
    };
    tb.update_marks(range, |m| m.link = None);
    true
}

// === Block types ===

fn execute_set_paragraph(state: &mut EditorState) -> bool {
    let path = state.selection.block().clone();
    let Some(block) = state.doc.block_mut(&path) else {
        return false;
    };
    let paragraph = match block {
        Block::Heading(heading) => Block::Paragraph(std::mem::take(&mut heading.content)),
        Block::CodeBlock(code) => Block::Paragraph(TextBlock::from_code_text(&code.code)),
        _ => return false,
    };
    *block = paragraph;
    true
}

fn execute_toggle_heading(state: &mut EditorState, level: u8) -> bool {
    if !(1..=6).contains(&level) {
        return false;
    }
    let path = state.selection.block().clone();
    let Some(block) = state.doc.block_mut(&path) else {
        return false;
    };
    let replacement = match block {
        Block::Paragraph(tb) => Block::Heading(Heading {
            level,
            id: None,
            content: std::mem::take(tb),
        }),
        Block::Heading(heading) if heading.level == level => {
            Block::Paragraph(std::mem::take(&mut heading.content))
        }
        Block::Heading(heading) => Block::Heading(Heading {
            level,
            id: None,
            content: std::mem::take(&mut heading.content),
        }),
        Block::CodeBlock(code) => Block::Heading(Heading {
            level,
            id: None,
            content: TextBlock::from_code_text(&code.code),
        }),
        _ => return false,
    };
    *block = replacement;
    true
}

fn execute_set_text_align(state: &mut EditorState, align: Align) -> bool {
    let Some((_, _, tb)) = text_block_target(state) else {
        return false;
    };
    tb.align = (align != Align::Left).then_some(align);
    true
}

fn execute_toggle_list(state: &mut EditorState, kind: ListKind) -> bool {
    let Selection::Text { block: path, .. } = state.selection.clone() else {
        return false;
    };

    if let Some(list_path) = nearest_ancestor(&state.doc, &path, |b| matches!(b, Block::List(_))) {
        let Some(Block::List(list)) = state.doc.block_mut(&list_path) else {
            return false;
        };
        if list.kind != kind {
            list.kind = kind;
            return true;
        }
        let item = path[list_path.len()];
        let child = path[list_path.len() + 1];
        let Some(first) = lift_list_item(&mut state.doc, &list_path, item) else {
            return false;
        };
        let Some(first_idx) = first.last() else {
            return false;
        };
        let new_path = first
            .with_last(first_idx + child)
            .join(&path[list_path.len() + 2..]);
        remap_text_selection(state, new_path);
        return true;
    }

    let Some(slot) = state.doc.block_mut(&path) else {
        return false;
    };
    let block = std::mem::replace(slot, Block::HorizontalRule);
    *slot = Block::List(List {
        kind,
        start: 1,
        items: vec![ListItem {
            blocks: vec![block],
        }],
    });
    remap_text_selection(state, path.join(&[0, 0]));
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapKind {
    Blockquote,
    InfoBox,
}

impl WrapKind {
    fn matches(&self, block: &Block) -> bool {
        match self {
            WrapKind::Blockquote => matches!(block, Block::Blockquote(_)),
            WrapKind::InfoBox => matches!(block, Block::InfoBox(_)),
        }
    }

    fn wrap(&self, blocks: Vec<Block>) -> Block {
        match self {
            WrapKind::Blockquote => Block::Blockquote(blocks),
            WrapKind::InfoBox => Block::InfoBox(blocks),
        }
    }
}

fn execute_toggle_wrap(state: &mut EditorState, kind: WrapKind) -> bool {
    let Selection::Text { block: path, .. } = state.selection.clone() else {
        return false;
    };

    if let Some(wrapper) = nearest_ancestor(&state.doc, &path, |b| kind.matches(b)) {
        let child = path[wrapper.len()];
        let Some(lifted) = lift_out(&mut state.doc, &wrapper, child) else {
            return false;
        };
        remap_text_selection(state, lifted.join(&path[wrapper.len() + 1..]));
        return true;
    }

    let Some(slot) = state.doc.block_mut(&path) else {
        return false;
    };
    let block = std::mem::replace(slot, Block::HorizontalRule);
    *slot = kind.wrap(vec![block]);
    remap_text_selection(state, path.join(&[0]));
    true
}

/// Move a text selection to a new block path, keeping its offsets.
fn remap_text_selection(state: &mut EditorState, block: BlockPath) {
    if let Selection::Text { anchor, head, .. } = state.selection {
        state.selection = Selection::text(block, anchor, head);
    }
}

fn execute_toggle_code_block(state: &mut EditorState) -> bool {
    let path = state.selection.block().clone();
    let Some(block) = state.doc.block_mut(&path) else {
        return false;
    };
    let replacement = match block {
        Block::CodeBlock(code) => Block::Paragraph(TextBlock::from_code_text(&code.code)),
        Block::Paragraph(tb) => Block::CodeBlock(CodeBlock {
            language: None,
            code: tb.to_code_text(),
        }),
        Block::Heading(heading) => Block::CodeBlock(CodeBlock {
            language: None,
            code: heading.content.to_code_text(),
        }),
        _ => return false,
    };
    *block = replacement;
    true
}

fn execute_horizontal_rule(state: &mut EditorState) -> bool {
    let Some((path, _)) = state.text_target() else {
        return false;
    };
    let Some(rule) = insert_block_at_cursor(state, &path, Block::HorizontalRule) else {
        return false;
    };
    let Some(idx) = rule.last() else {
        return false;
    };
    state.set_caret(rule.with_last(idx + 1), 0);
    true
}

// === Images ===

/// The image at `at`, if one starts exactly there.
pub fn image_at<'a>(doc: &'a Document, at: &ImageLocator) -> Option<&'a ImageAttrs> {
    let tb = doc.block(&at.block)?.text_block()?;
    match tb.inline_at(at.offset)? {
        (start, Inline::Image(image)) if start == at.offset => Some(image),
        _ => None,
    }
}

fn image_at_mut<'a>(doc: &'a mut Document, at: &ImageLocator) -> Option<&'a mut ImageAttrs> {
    let tb = doc.block_mut(&at.block)?.text_block_mut()?;
    let mut pos = 0;
    for inline in tb.inlines.iter_mut() {
        let len = inline.len();
        if pos == at.offset {
            return match inline {
                Inline::Image(image) => Some(image),
                _ => None,
            };
        }
        if pos > at.offset {
            break;
        }
        pos += len;
    }
    None
}

fn execute_set_image(state: &mut EditorState, attrs: &ImageAttrs) -> bool {
    if attrs.src.trim().is_empty() || attrs.is_embedded_data() {
        return false;
    }
    let Some((path, range, tb)) = text_block_target(state) else {
        return false;
    };
    tb.delete_range(range.clone());
    tb.insert_inline(range.start, Inline::Image(attrs.clone()));
    state.selection = Selection::text(path, range.start, range.start + 1);
    true
}

fn execute_update_image(state: &mut EditorState, at: &ImageLocator, metadata: &ImageMetadata) -> bool {
    let Some(image) = image_at_mut(&mut state.doc, at) else {
        return false;
    };
    metadata.apply_to(image);
    true
}

/// The image covered by the selection, if the selection is exactly one image.
pub fn selected_image(state: &EditorState) -> Option<ImageLocator> {
    let Selection::Text { block, .. } = &state.selection else {
        return None;
    };
    let range = state.selection.range()?;
    if range.len() != 1 {
        return None;
    }
    let at = ImageLocator::new(block.clone(), range.start);
    image_at(&state.doc, &at).map(|_| at)
}

// === Tables ===

/// Table under the selection and the rect of selected cells.
struct TableTarget {
    path: BlockPath,
    rect: Rect,
    map: TableMap,
    /// Rest of the text selection path below the cell, if any.
    inner: Option<Vec<usize>>,
}

fn table_target(state: &EditorState) -> Option<TableTarget> {
    match &state.selection {
        Selection::Text { block, .. } => {
            let path = nearest_ancestor(&state.doc, block, |b| matches!(b, Block::Table(_)))?;
            let Some(Block::Table(table)) = state.doc.block(&path) else {
                return None;
            };
            let map = TableMap::new(table);
            let cell = CellRef {
                row: *block.get(path.len())?,
                index: *block.get(path.len() + 1)?,
            };
            let rect = map.rect(cell);
            Some(TableTarget {
                inner: Some(block[path.len() + 2..].to_vec()),
                path,
                rect,
                map,
            })
        }
        Selection::Cells {
            table,
            anchor,
            head,
        } => {
            let Some(Block::Table(t)) = state.doc.block(table) else {
                return None;
            };
            let map = TableMap::new(t);
            let rect = map.expand(Rect::spanning(
                (anchor.row, anchor.col),
                (head.row, head.col),
            ));
            Some(TableTarget {
                path: table.clone(),
                rect,
                map,
                inner: None,
            })
        }
    }
}

fn table_mut<'a>(doc: &'a mut Document, path: &BlockPath) -> Option<&'a mut Table> {
    match doc.block_mut(path)? {
        Block::Table(table) => Some(table),
        _ => None,
    }
}

/// Put the selection back into the cell whose top-left corner is now at `pos`.
fn relocate(state: &mut EditorState, target: &TableTarget, pos: GridPos, keep_inner: bool) {
    let Some(Block::Table(table)) = state.doc.block(&target.path) else {
        return;
    };
    let map = TableMap::new(table);
    let row = pos.row.min(map.height.saturating_sub(1));
    let col = pos.col.min(map.width.saturating_sub(1));
    let Some(cell) = map.cell_at(row, col) else {
        return;
    };
    let cell_path = target.path.join(&[cell.row, cell.index]);

    if keep_inner {
        if let (Selection::Text { anchor, head, .. }, Some(inner)) =
            (&state.selection, &target.inner)
        {
            let block = BlockPath(cell_path.0.iter().chain(inner).copied().collect());
            if state.doc.block(&block).is_some_and(Block::is_textual) {
                state.selection = Selection::text(block, *anchor, *head);
                return;
            }
        }
    }

    let first = state
        .doc
        .container(&cell_path)
        .map(|blocks| blocks.len())
        .and_then(|len| (0..len).find_map(|i| state.doc.first_textual(&cell_path.join(&[i]))));
    if let Some(block) = first {
        state.set_caret(block, 0);
    }
}

fn shift_cells_selection(state: &mut EditorState, rows: usize, cols: usize) {
    if let Selection::Cells { anchor, head, .. } = &mut state.selection {
        for p in [anchor, head] {
            p.row += rows;
            p.col += cols;
        }
    }
}

fn execute_add_row(state: &mut EditorState, before: bool) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    let at = if before {
        target.rect.top
    } else {
        target.rect.bottom
    };
    table::add_row(table, at);
    let shift = usize::from(before);
    if target.inner.is_some() {
        let pos = GridPos::new(target.rect.top + shift, target.rect.left);
        relocate(state, &target, pos, true);
    } else {
        shift_cells_selection(state, shift, 0);
    }
    true
}

fn execute_add_column(state: &mut EditorState, before: bool) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    let at = if before {
        target.rect.left
    } else {
        target.rect.right
    };
    table::add_column(table, at);
    let shift = usize::from(before);
    if target.inner.is_some() {
        let pos = GridPos::new(target.rect.top, target.rect.left + shift);
        relocate(state, &target, pos, true);
    } else {
        shift_cells_selection(state, 0, shift);
    }
    true
}

fn execute_delete_rows(state: &mut EditorState) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    if target.rect.top == 0 && target.rect.bottom >= target.map.height {
        return delete_table_at(state, &target.path);
    }
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    for row in (target.rect.top..target.rect.bottom).rev() {
        table::remove_row(table, row);
    }
    let pos = GridPos::new(target.rect.top, target.rect.left);
    relocate(state, &target, pos, false);
    true
}

fn execute_delete_columns(state: &mut EditorState) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    if target.rect.left == 0 && target.rect.right >= target.map.width {
        return delete_table_at(state, &target.path);
    }
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    for col in (target.rect.left..target.rect.right).rev() {
        table::remove_column(table, col);
    }
    let pos = GridPos::new(target.rect.top, target.rect.left);
    relocate(state, &target, pos, false);
    true
}

fn execute_delete_table(state: &mut EditorState) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    delete_table_at(state, &target.path)
}

fn delete_table_at(state: &mut EditorState, path: &BlockPath) -> bool {
    let Some(idx) = path.last() else {
        return false;
    };
    let Some(container) = state.doc.container_mut(path.container()) else {
        return false;
    };
    container.remove(idx);
    if container.is_empty() {
        container.push(Block::empty_paragraph());
    }
    let len = container.len();

    let caret = first_textual_in(&state.doc, path.container(), idx.min(len - 1));
    let caret = match caret {
        Some(caret) => caret,
        None => {
            let Some(container) = state.doc.container_mut(path.container()) else {
                return false;
            };
            let at = idx.min(container.len());
            container.insert(at, Block::empty_paragraph());
            path.with_last(at)
        }
    };
    state.set_caret(caret, 0);
    true
}

fn execute_merge_cells(state: &mut EditorState) -> bool {
    if !matches!(state.selection, Selection::Cells { .. }) {
        return false;
    }
    let Some(target) = table_target(state) else {
        return false;
    };
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    if !table::merge_cells(table, target.rect) {
        return false;
    }
    relocate(
        state,
        &target,
        GridPos::new(target.rect.top, target.rect.left),
        false,
    );
    true
}

fn execute_split_cell(state: &mut EditorState) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    let Some(cell) = target.map.cell_at(target.rect.top, target.rect.left) else {
        return false;
    };
    if target.map.rect(cell) != target.rect {
        return false;
    }
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    if !table::split_cell(table, cell) {
        return false;
    }
    let keep = target.inner.is_some();
    relocate(
        state,
        &target,
        GridPos::new(target.rect.top, target.rect.left),
        keep,
    );
    true
}

#[derive(Debug, Clone, Copy)]
enum HeaderScope {
    Row,
    Column,
    Cell,
}

fn execute_toggle_header(state: &mut EditorState, scope: HeaderScope) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    let rect = match scope {
        HeaderScope::Row => Rect::new(target.rect.top, 0, target.rect.bottom, target.map.width),
        HeaderScope::Column => Rect::new(0, target.rect.left, target.map.height, target.rect.right),
        HeaderScope::Cell => target.rect,
    };
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    let on = !table::all_headers(table, rect);
    table::set_header(table, rect, on);
    true
}

fn execute_set_cell_align(state: &mut EditorState, align: Align) -> bool {
    let Some(target) = table_target(state) else {
        return false;
    };
    let Some(table) = table_mut(&mut state.doc, &target.path) else {
        return false;
    };
    table::set_align(table, target.rect, align);
    true
}

fn execute_insert_table(state: &mut EditorState, rows: usize, cols: usize, with_header_row: bool) -> bool {
    let Some((path, _)) = state.text_target() else {
        return false;
    };
    if nearest_ancestor(&state.doc, &path, |b| matches!(b, Block::Table(_))).is_some() {
        return false;
    }
    let table = Table::new(rows.max(1), cols.max(1), with_header_row);
    let Some(table_path) = insert_block_at_cursor(state, &path, Block::Table(table)) else {
        return false;
    };
    state.set_caret(table_path.join(&[0, 0, 0]), 0);
    true
}

/// Where the cursor sits in a table, if anywhere.
pub fn table_context(state: &EditorState) -> Option<TableContext> {
    let target = table_target(state)?;
    Some(TableContext {
        cell: GridPos::new(target.rect.top, target.rect.left),
        rows: target.map.height,
        cols: target.map.width,
        table: target.path,
    })
}

// === Headings ===

fn execute_set_heading_id(state: &mut EditorState, heading: usize, id: Option<&str>) -> bool {
    let mut headings = state.doc.headings_mut();
    let Some(target) = headings.get_mut(heading) else {
        return false;
    };
    target.id = id.filter(|id| !id.is_empty()).map(Into::into);
    true
}

// === Queries ===

/// Text covered by the selection. Hard breaks read as spaces.
pub fn selected_text(state: &EditorState) -> String {
    let Some((tb, range)) = state.current_text_block().zip(state.selection.range()) else {
        return match (state.current_block(), state.selection.range()) {
            (Some(Block::CodeBlock(code)), Some(range)) => {
                code.code.chars().skip(range.start).take(range.len()).collect()
            }
            _ => String::new(),
        };
    };
    let mut out = String::new();
    let mut pos = 0;
    for inline in &tb.inlines {
        match inline {
            Inline::Text { text, .. } => {
                for ch in text.chars() {
                    if range.contains(&pos) {
                        out.push(ch);
                    }
                    pos += 1;
                }
            }
            Inline::HardBreak => {
                if range.contains(&pos) {
                    out.push(' ');
                }
                pos += 1;
            }
            Inline::Image(_) => pos += 1,
        }
    }
    out
}

/// The href of the link at the selection, if any.
pub fn link_at_selection(state: &EditorState) -> Option<String> {
    let tb = state.current_text_block()?;
    let range = state.selection.range()?;
    if range.is_empty() {
        return link_range_at(tb, range.start).map(|(_, link)| link.href.to_string());
    }
    tb.runs_in(range)
        .find_map(|m| m.link.as_ref())
        .map(|link| link.href.to_string())
}

fn marks_at_selection(state: &EditorState) -> Option<Vec<Marks>> {
    let tb = state.current_text_block()?;
    let range = state.selection.range()?;
    if range.is_empty() {
        let marks = state
            .stored_marks
            .clone()
            .unwrap_or_else(|| tb.marks_at(range.start));
        return Some(vec![marks]);
    }
    Some(tb.runs_in(range).cloned().collect())
}

/// Whether a format applies at the selection.
pub fn is_active(state: &EditorState, query: &ActiveQuery) -> bool {
    let path = state.selection.block();
    let block = state.current_block();
    match query {
        ActiveQuery::Mark(kind) => marks_at_selection(state)
            .is_some_and(|runs| !runs.is_empty() && runs.iter().all(|m| m.has(*kind))),
        ActiveQuery::Link => link_at_selection(state).is_some(),
        ActiveQuery::Paragraph => matches!(block, Some(Block::Paragraph(_))),
        ActiveQuery::Heading(level) => {
            matches!(block, Some(Block::Heading(h)) if h.level == *level)
        }
        ActiveQuery::BulletList | ActiveQuery::OrderedList => {
            let want = if *query == ActiveQuery::BulletList {
                ListKind::Bullet
            } else {
                ListKind::Ordered
            };
            nearest_ancestor(&state.doc, path, |b| matches!(b, Block::List(_)))
                .and_then(|list| match state.doc.block(&list) {
                    Some(Block::List(list)) => Some(list.kind == want),
                    _ => None,
                })
                .unwrap_or(false)
        }
        ActiveQuery::Blockquote => {
            nearest_ancestor(&state.doc, path, |b| matches!(b, Block::Blockquote(_))).is_some()
        }
        ActiveQuery::InfoBox => {
            nearest_ancestor(&state.doc, path, |b| matches!(b, Block::InfoBox(_))).is_some()
        }
        ActiveQuery::CodeBlock => matches!(block, Some(Block::CodeBlock(_))),
        ActiveQuery::TextAlign(align) => match block.and_then(Block::text_block) {
            Some(tb) => tb.align.unwrap_or(Align::Left) == *align,
            None => false,
        },
        ActiveQuery::Table => table_target(state).is_some(),
        ActiveQuery::Image => selected_image(state).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::to_html;

    fn state(html: &str) -> EditorState {
        EditorState::from_html(html)
    }

    fn select(state: &mut EditorState, path: &[usize], anchor: usize, head: usize) {
        let selection = Selection::text(BlockPath::from_slice(path), anchor, head);
        execute_command(state, &EditorCommand::SetSelection(selection.clone()));
        assert_eq!(state.selection, selection, "selection {path:?} rejected");
    }

    fn run(state: &mut EditorState, command: EditorCommand) -> CommandOutcome {
        execute_command(state, &command)
    }

    #[test]
    fn test_insert_text_and_outcome() {
        let mut s = state("<p>hello</p>");
        select(&mut s, &[0], 5, 5);
        assert_eq!(
            run(&mut s, EditorCommand::InsertText(" world".into())),
            CommandOutcome::DocumentChanged
        );
        assert_eq!(to_html(&s.doc), "<p>hello world</p>");
        assert_eq!(s.selection, Selection::caret(BlockPath::root(0), 11));
    }

    #[test]
    fn test_insert_replaces_selection_with_marks_of_start() {
        let mut s = state("<p><strong>bold</strong> plain</p>");
        select(&mut s, &[0], 0, 4);
        run(&mut s, EditorCommand::InsertText("B".into()));
        assert_eq!(to_html(&s.doc), "<p><strong>B</strong> plain</p>");
    }

    #[test]
    fn test_stored_marks_apply_to_next_insert() {
        let mut s = state("<p>ab</p>");
        select(&mut s, &[0], 2, 2);
        assert_eq!(
            run(&mut s, EditorCommand::ToggleMark(MarkKind::Bold)),
            CommandOutcome::SelectionChanged
        );
        assert!(is_active(&s, &ActiveQuery::Mark(MarkKind::Bold)));
        run(&mut s, EditorCommand::InsertText("c".into()));
        assert_eq!(to_html(&s.doc), "<p>ab<strong>c</strong></p>");
        assert_eq!(s.stored_marks, None);
    }

    #[test]
    fn test_toggle_mark_on_range() {
        let mut s = state("<p>one two</p>");
        select(&mut s, &[0], 0, 3);
        run(&mut s, EditorCommand::ToggleMark(MarkKind::Italic));
        assert_eq!(to_html(&s.doc), "<p><em>one</em> two</p>");
        assert!(is_active(&s, &ActiveQuery::Mark(MarkKind::Italic)));
        run(&mut s, EditorCommand::ToggleMark(MarkKind::Italic));
        assert_eq!(to_html(&s.doc), "<p>one two</p>");
    }

    #[test]
    fn test_split_and_join_paragraphs() {
        let mut s = state("<p>helloworld</p>");
        select(&mut s, &[0], 5, 5);
        run(&mut s, EditorCommand::SplitBlock);
        assert_eq!(to_html(&s.doc), "<p>hello</p><p>world</p>");
        assert_eq!(s.selection, Selection::caret(BlockPath::root(1), 0));
        run(&mut s, EditorCommand::DeleteBackward);
        assert_eq!(to_html(&s.doc), "<p>helloworld</p>");
        assert_eq!(s.selection, Selection::caret(BlockPath::root(0), 5));
    }

    #[test]
    fn test_enter_at_heading_end_creates_paragraph() {
        let mut s = state("<h2 id=\"t\">Title</h2>");
        select(&mut s, &[0], 5, 5);
        run(&mut s, EditorCommand::SplitBlock);
        run(&mut s, EditorCommand::InsertText("body".into()));
        assert_eq!(to_html(&s.doc), "<h2 id=\"t\">Title</h2><p>body</p>");
    }

    #[test]
    fn test_backspace_at_heading_start_makes_paragraph() {
        let mut s = state("<h1>Title</h1>");
        select(&mut s, &[0], 0, 0);
        run(&mut s, EditorCommand::DeleteBackward);
        assert_eq!(to_html(&s.doc), "<p>Title</p>");
    }

    #[test]
    fn test_backspace_at_document_start_is_noop() {
        let mut s = state("<p>x</p>");
        select(&mut s, &[0], 0, 0);
        assert_eq!(run(&mut s, EditorCommand::DeleteBackward), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_list_enter_and_exit() {
        let mut s = state("<p>item</p>");
        run(&mut s, EditorCommand::ToggleBulletList);
        assert_eq!(to_html(&s.doc), "<ul><li><p>item</p></li></ul>");
        assert_eq!(s.selection.block(), &BlockPath(vec![0, 0, 0]));

        select(&mut s, &[0, 0, 0], 4, 4);
        run(&mut s, EditorCommand::SplitBlock);
        assert_eq!(to_html(&s.doc), "<ul><li><p>item</p></li><li><p></p></li></ul>");
        run(&mut s, EditorCommand::SplitBlock);
        assert_eq!(to_html(&s.doc), "<ul><li><p>item</p></li></ul><p></p>");
        assert_eq!(s.selection, Selection::caret(BlockPath::root(1), 0));
    }

    #[test]
    fn test_toggle_list_kind_and_unwrap() {
        let mut s = state("<ul><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ul>");
        select(&mut s, &[0, 1, 0], 0, 0);
        run(&mut s, EditorCommand::ToggleOrderedList);
        assert_eq!(
            to_html(&s.doc),
            "<ol><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ol>"
        );
        run(&mut s, EditorCommand::ToggleOrderedList);
        insta::assert_snapshot!(to_html(&s.doc), @r#"<ol><li><p>a</p></li></ol><p>b</p><ol start="3"><li><p>c</p></li></ol>"#);
        assert_eq!(s.selection.block(), &BlockPath::root(1));
    }

    #[test]
    fn test_blockquote_and_info_box_toggle() {
        let mut s = state("<p>quote</p>");
        run(&mut s, EditorCommand::ToggleBlockquote);
        assert_eq!(to_html(&s.doc), "<blockquote><p>quote</p></blockquote>");
        assert!(is_active(&s, &ActiveQuery::Blockquote));
        run(&mut s, EditorCommand::ToggleBlockquote);
        assert_eq!(to_html(&s.doc), "<p>quote</p>");

        run(&mut s, EditorCommand::ToggleInfoBox);
        assert_eq!(
            to_html(&s.doc),
            "<div data-type=\"info-box\" class=\"info-box\"><p>quote</p></div>"
        );
    }

    #[test]
    fn test_heading_toggle_resets_id() {
        let mut s = state("<h2 id=\"old\">Text</h2>");
        run(&mut s, EditorCommand::ToggleHeading { level: 3 });
        assert_eq!(to_html(&s.doc), "<h3>Text</h3>");
        run(&mut s, EditorCommand::ToggleHeading { level: 3 });
        assert_eq!(to_html(&s.doc), "<p>Text</p>");
        assert_eq!(
            run(&mut s, EditorCommand::ToggleHeading { level: 7 }),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_code_block_round_trip() {
        let mut s = state("<p>let x = 1;</p>");
        run(&mut s, EditorCommand::ToggleCodeBlock);
        assert_eq!(to_html(&s.doc), "<pre><code>let x = 1;</code></pre>");
        select(&mut s, &[0], 10, 10);
        run(&mut s, EditorCommand::SplitBlock);
        run(&mut s, EditorCommand::InsertText("y".into()));
        assert_eq!(to_html(&s.doc), "<pre><code>let x = 1;\ny</code></pre>");
        run(&mut s, EditorCommand::ToggleCodeBlock);
        assert_eq!(to_html(&s.doc), "<p>let x = 1;<br>y</p>");
    }

    #[test]
    fn test_text_align() {
        let mut s = state("<p>x</p>");
        run(&mut s, EditorCommand::SetTextAlign(Align::Center));
        assert_eq!(to_html(&s.doc), "<p style=\"text-align: center\">x</p>");
        assert!(is_active(&s, &ActiveQuery::TextAlign(Align::Center)));
        run(&mut s, EditorCommand::SetTextAlign(Align::Left));
        assert_eq!(to_html(&s.doc), "<p>x</p>");
        assert_eq!(
            run(&mut s, EditorCommand::SetTextAlign(Align::Left)),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_links() {
        let mut s = state("<p>visit site now</p>");
        select(&mut s, &[0], 6, 10);
        run(&mut s, EditorCommand::SetLink { href: "example.com".into() });
        insta::assert_snapshot!(to_html(&s.doc), @r#"<p>visit <a href="https://example.com" class="custom-link" rel="noopener noreferrer">site</a> now</p>"#);

        select(&mut s, &[0], 8, 8);
        assert_eq!(link_at_selection(&s).as_deref(), Some("https://example.com"));
        run(&mut s, EditorCommand::UnsetLink);
        assert_eq!(to_html(&s.doc), "<p>visit site now</p>");
        assert_eq!(run(&mut s, EditorCommand::UnsetLink), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_set_link_empty_href_is_noop() {
        let mut s = state("<p>text</p>");
        select(&mut s, &[0], 0, 4);
        assert_eq!(
            run(&mut s, EditorCommand::SetLink { href: "  ".into() }),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_set_image_selects_it() {
        let mut s = state("<p>ab</p>");
        select(&mut s, &[0], 1, 1);
        run(&mut s, EditorCommand::SetImage(ImageAttrs::new("https://cdn.test/i.png")));
        assert_eq!(
            to_html(&s.doc),
            "<p>a<img src=\"https://cdn.test/i.png\" class=\"help-center-image\">b</p>"
        );
        let at = selected_image(&s).expect("image selected");
        assert_eq!(at, ImageLocator::new(BlockPath::root(0), 1));

        let metadata = ImageMetadata {
            alt: "Alt".into(),
            title: "".into(),
            caption: "Cap".into(),
        };
        run(&mut s, EditorCommand::UpdateImage { at, metadata });
        assert_eq!(
            to_html(&s.doc),
            "<p>a<img src=\"https://cdn.test/i.png\" alt=\"Alt\" content=\"Cap\" class=\"help-center-image\">b</p>"
        );
    }

    #[test]
    fn test_base64_image_rejected() {
        let mut s = state("<p></p>");
        let outcome = run(
            &mut s,
            EditorCommand::SetImage(ImageAttrs::new("data:image/png;base64,AAAA")),
        );
        assert_eq!(outcome, CommandOutcome::Unchanged);
        assert_eq!(to_html(&s.doc), "<p></p>");
    }

    #[test]
    fn test_horizontal_rule_replaces_empty_paragraph() {
        let mut s = state("<p></p>");
        run(&mut s, EditorCommand::SetHorizontalRule);
        assert_eq!(to_html(&s.doc), "<hr><p></p>");
        assert_eq!(s.selection, Selection::caret(BlockPath::root(1), 0));
    }

    #[test]
    fn test_insert_table_and_delete_column() {
        let mut s = state("<p></p>");
        run(
            &mut s,
            EditorCommand::InsertTable {
                rows: 3,
                cols: 3,
                with_header_row: false,
            },
        );
        assert!(is_active(&s, &ActiveQuery::Table));
        let ctx = table_context(&s).expect("inside table");
        assert_eq!((ctx.rows, ctx.cols), (3, 3));

        run(&mut s, EditorCommand::DeleteColumn);
        let ctx = table_context(&s).expect("still inside table");
        assert_eq!((ctx.rows, ctx.cols), (3, 2));
        let Some(Block::Table(table)) = s.doc.blocks.first() else {
            panic!("table expected");
        };
        assert!(table.rows.iter().all(|row| row.cells.len() == 2));
    }

    #[test]
    fn test_table_commands_outside_table_are_noops() {
        let mut s = state("<p>plain</p>");
        for command in [
            EditorCommand::AddRowAfter,
            EditorCommand::DeleteRow,
            EditorCommand::AddColumnBefore,
            EditorCommand::DeleteTable,
            EditorCommand::MergeCells,
            EditorCommand::SplitCell,
            EditorCommand::ToggleHeaderRow,
            EditorCommand::SetCellAlign(Align::Center),
        ] {
            assert_eq!(run(&mut s, command.clone()), CommandOutcome::Unchanged, "{command:?}");
        }
    }

    #[test]
    fn test_add_row_keeps_cursor_in_cell() {
        let mut s = state("<table><tr><td><p>a</p></td></tr><tr><td><p>b</p></td></tr></table>");
        select(&mut s, &[0, 1, 0, 0], 1, 1);
        run(&mut s, EditorCommand::AddRowBefore);
        let ctx = table_context(&s).expect("inside table");
        assert_eq!(ctx.rows, 3);
        assert_eq!(ctx.cell, GridPos::new(2, 0));
        assert_eq!(s.selection, Selection::caret(BlockPath(vec![0, 2, 0, 0]), 1));
    }

    #[test]
    fn test_delete_last_row_deletes_table() {
        let mut s = state("<table><tr><td><p>only</p></td></tr></table><p>after</p>");
        select(&mut s, &[0, 0, 0, 0], 0, 0);
        run(&mut s, EditorCommand::DeleteRow);
        assert_eq!(to_html(&s.doc), "<p>after</p>");
        assert_eq!(table_context(&s), None);
    }

    #[test]
    fn test_merge_requires_cell_selection() {
        let mut s = state("<table><tr><td><p>a</p></td><td><p>b</p></td></tr></table>");
        select(&mut s, &[0, 0, 0, 0], 0, 0);
        assert_eq!(run(&mut s, EditorCommand::MergeCells), CommandOutcome::Unchanged);

        let cells = Selection::cells(BlockPath::root(0), GridPos::new(0, 0), GridPos::new(0, 1));
        run(&mut s, EditorCommand::SetSelection(cells));
        run(&mut s, EditorCommand::MergeCells);
        assert_eq!(
            to_html(&s.doc),
            "<table><tbody><tr><td colspan=\"2\"><p>a</p><p>b</p></td></tr></tbody></table>"
        );
        run(&mut s, EditorCommand::SplitCell);
        let ctx = table_context(&s).expect("inside table");
        assert_eq!((ctx.rows, ctx.cols), (1, 2));
    }

    #[test]
    fn test_toggle_header_row() {
        let mut s = state("<table><tr><td><p>a</p></td><td><p>b</p></td></tr></table>");
        select(&mut s, &[0, 0, 0, 0], 0, 0);
        run(&mut s, EditorCommand::ToggleHeaderRow);
        assert_eq!(
            to_html(&s.doc),
            "<table><tbody><tr><th><p>a</p></th><th><p>b</p></th></tr></tbody></table>"
        );
        run(&mut s, EditorCommand::ToggleHeaderRow);
        assert!(!to_html(&s.doc).contains("<th>"));
    }

    #[test]
    fn test_set_heading_id() {
        let mut s = state("<h1>A</h1><h2>B</h2>");
        run(
            &mut s,
            EditorCommand::SetHeadingId {
                heading: 1,
                id: Some("b".into()),
            },
        );
        assert_eq!(to_html(&s.doc), "<h1>A</h1><h2 id=\"b\">B</h2>");
        assert_eq!(
            run(
                &mut s,
                EditorCommand::SetHeadingId {
                    heading: 5,
                    id: None
                }
            ),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_selected_text_spans_breaks() {
        let mut s = state("<p>one<br>two</p>");
        select(&mut s, &[0], 1, 6);
        assert_eq!(selected_text(&s), "ne tw");
    }

    #[test]
    fn test_failed_command_restores_state() {
        let mut s = state("<p>abc</p>");
        select(&mut s, &[0], 1, 2);
        let before = s.clone();
        assert_eq!(run(&mut s, EditorCommand::MergeCells), CommandOutcome::Unchanged);
        assert_eq!(s, before);
    }
}
