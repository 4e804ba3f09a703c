//! Structured document model.
//!
//! The document is a tree of blocks. Text lives in text blocks (paragraphs and
//! headings) as a run of inline nodes; code blocks hold raw text. Containers
//! (blockquotes, info boxes, list items, table cells) hold further blocks.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Horizontal text alignment for paragraphs, headings and table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" => Some(Align::Right),
            "justify" => Some(Align::Justify),
            _ => None,
        }
    }
}

/// Togglable inline formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

/// A hyperlink mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: SmolStr,
}

/// The set of marks applied to a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub link: Option<Link>,
}

impl Marks {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Underline => self.underline,
            MarkKind::Strike => self.strike,
            MarkKind::Code => self.code,
        }
    }

    pub fn set(&mut self, kind: MarkKind, on: bool) {
        match kind {
            MarkKind::Bold => self.bold = on,
            MarkKind::Italic => self.italic = on,
            MarkKind::Underline => self.underline = on,
            MarkKind::Strike => self.strike = on,
            MarkKind::Code => self.code = on,
        }
    }
}

/// Attributes of an inline image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    pub alt: Option<String>,
    pub title: Option<String>,
    /// Caption, serialized as the `content` attribute.
    pub caption: Option<String>,
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }

    /// Inline base64 images are not allowed; sources must be uploaded URLs.
    pub fn is_embedded_data(&self) -> bool {
        self.src.trim_start().to_ascii_lowercase().starts_with("data:")
    }
}

/// Inline content of a text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, marks: Marks },
    HardBreak,
    Image(ImageAttrs),
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    /// Length in position units. Text counts chars, everything else counts one.
    pub fn len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::HardBreak | Inline::Image(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn marks(&self) -> Option<&Marks> {
        match self {
            Inline::Text { marks, .. } => Some(marks),
            _ => None,
        }
    }
}

/// A block holding inline content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub align: Option<Align>,
    pub inlines: Vec<Inline>,
}

impl TextBlock {
    pub fn new(inlines: Vec<Inline>) -> Self {
        let mut block = Self {
            align: None,
            inlines,
        };
        block.normalize();
        block
    }

    pub fn plain(text: &str) -> Self {
        if text.is_empty() {
            Self::default()
        } else {
            Self::new(vec![Inline::text(text)])
        }
    }

    pub fn len(&self) -> usize {
        self.inlines.iter().map(Inline::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated text of the text runs (images and breaks contribute nothing).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for inline in &self.inlines {
            if let Inline::Text { text, .. } = inline {
                out.push_str(text);
            }
        }
        out
    }

    /// Merge adjacent runs with identical marks and drop empty runs.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.inlines.len());
        for inline in self.inlines.drain(..) {
            if let Inline::Text { text, marks } = &inline {
                if text.is_empty() {
                    continue;
                }
                if let Some(Inline::Text {
                    text: prev_text,
                    marks: prev_marks,
                }) = merged.last_mut()
                {
                    if prev_marks == marks {
                        prev_text.push_str(text);
                        continue;
                    }
                }
            }
            merged.push(inline);
        }
        self.inlines = merged;
    }

    /// Ensure an inline boundary exists at `offset`, returning the index of the
    /// first inline starting at or after it.
    pub fn split_inlines_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.inlines.len() {
            if pos >= offset {
                return i;
            }
            let len = self.inlines[i].len();
            if offset < pos + len {
                let tail = match &mut self.inlines[i] {
                    Inline::Text { text, marks } => {
                        let at = char_to_byte(text, offset - pos);
                        Some(Inline::Text {
                            text: text.split_off(at),
                            marks: marks.clone(),
                        })
                    }
                    _ => None,
                };
                if let Some(tail) = tail {
                    self.inlines.insert(i + 1, tail);
                }
                return i + 1;
            }
            pos += len;
        }
        self.inlines.len()
    }

    /// Indices of the inlines fully covering `range` after splitting at its ends.
    pub fn isolate(&mut self, range: Range<usize>) -> Range<usize> {
        let start = self.split_inlines_at(range.start);
        let end = self.split_inlines_at(range.end.max(range.start));
        start..end
    }

    pub fn insert_inline(&mut self, offset: usize, inline: Inline) {
        let idx = self.split_inlines_at(offset.min(self.len()));
        self.inlines.insert(idx, inline);
        self.normalize();
    }

    pub fn insert_text(&mut self, offset: usize, text: &str, marks: Marks) {
        if text.is_empty() {
            return;
        }
        self.insert_inline(
            offset,
            Inline::Text {
                text: text.to_owned(),
                marks,
            },
        );
    }

    pub fn delete_range(&mut self, range: Range<usize>) {
        let len = self.len();
        let range = range.start.min(len)..range.end.min(len);
        if range.is_empty() {
            return;
        }
        let idx = self.isolate(range);
        self.inlines.drain(idx);
        self.normalize();
    }

    /// Split off everything from `offset` onward into a new block with the same alignment.
    pub fn split_off(&mut self, offset: usize) -> TextBlock {
        let idx = self.split_inlines_at(offset.min(self.len()));
        let tail = self.inlines.split_off(idx);
        let mut block = TextBlock {
            align: self.align,
            inlines: tail,
        };
        self.normalize();
        block.normalize();
        block
    }

    pub fn append(&mut self, other: TextBlock) {
        self.inlines.extend(other.inlines);
        self.normalize();
    }

    /// The inline occupying the unit at `offset`, with its start position.
    pub fn inline_at(&self, offset: usize) -> Option<(usize, &Inline)> {
        let mut pos = 0;
        for inline in &self.inlines {
            let len = inline.len();
            if offset < pos + len {
                return Some((pos, inline));
            }
            pos += len;
        }
        None
    }

    /// Marks a caret at `offset` would inherit (from the character before it).
    pub fn marks_at(&self, offset: usize) -> Marks {
        let probe = if offset == 0 { 0 } else { offset - 1 };
        match self.inline_at(probe) {
            Some((_, Inline::Text { marks, .. })) => marks.clone(),
            _ => Marks::default(),
        }
    }

    /// Text runs overlapping `range`.
    pub fn runs_in(&self, range: Range<usize>) -> impl Iterator<Item = &Marks> + '_ {
        let mut pos = 0;
        self.inlines.iter().filter_map(move |inline| {
            let start = pos;
            pos += inline.len();
            if start < range.end && pos > range.start {
                inline.marks()
            } else {
                None
            }
        })
    }

    /// Apply `f` to the marks of every text run inside `range`.
    pub fn update_marks(&mut self, range: Range<usize>, mut f: impl FnMut(&mut Marks)) {
        let idx = self.isolate(range);
        for inline in &mut self.inlines[idx] {
            if let Inline::Text { marks, .. } = inline {
                f(marks);
            }
        }
        self.normalize();
    }

    /// Text with hard breaks rendered as newlines, used when converting to code.
    pub fn to_code_text(&self) -> String {
        let mut out = String::new();
        for inline in &self.inlines {
            match inline {
                Inline::Text { text, .. } => out.push_str(text),
                Inline::HardBreak => out.push('\n'),
                Inline::Image(_) => {}
            }
        }
        out
    }

    /// Inverse of [`TextBlock::to_code_text`].
    pub fn from_code_text(code: &str) -> TextBlock {
        let mut inlines = Vec::new();
        for (i, line) in code.split('\n').enumerate() {
            if i > 0 {
                inlines.push(Inline::HardBreak);
            }
            if !line.is_empty() {
                inlines.push(Inline::text(line));
            }
        }
        TextBlock::new(inlines)
    }
}

/// A heading block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub id: Option<SmolStr>,
    pub content: TextBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<SmolStr>,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    pub start: u32,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub header: bool,
    pub colspan: usize,
    pub rowspan: usize,
    pub align: Option<Align>,
    pub blocks: Vec<Block>,
}

impl TableCell {
    pub fn empty(header: bool) -> Self {
        Self {
            header,
            colspan: 1,
            rowspan: 1,
            align: None,
            blocks: vec![Block::empty_paragraph()],
        }
    }

    /// True when the cell holds nothing but empty paragraphs.
    pub fn is_blank(&self) -> bool {
        self.blocks
            .iter()
            .all(|b| matches!(b, Block::Paragraph(p) if p.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    /// A `rows` x `cols` table of empty cells, optionally with a header row.
    pub fn new(rows: usize, cols: usize, with_header_row: bool) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows: (0..rows)
                .map(|r| TableRow {
                    cells: (0..cols)
                        .map(|_| TableCell::empty(with_header_row && r == 0))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(TextBlock),
    Heading(Heading),
    List(List),
    Blockquote(Vec<Block>),
    InfoBox(Vec<Block>),
    CodeBlock(CodeBlock),
    HorizontalRule,
    Table(Table),
}

impl Block {
    pub fn empty_paragraph() -> Self {
        Block::Paragraph(TextBlock::default())
    }

    pub fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(text) => Some(text),
            Block::Heading(heading) => Some(&heading.content),
            _ => None,
        }
    }

    pub fn text_block_mut(&mut self) -> Option<&mut TextBlock> {
        match self {
            Block::Paragraph(text) => Some(text),
            Block::Heading(heading) => Some(&mut heading.content),
            _ => None,
        }
    }

    /// Whether a caret can live directly inside this block.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Block::Paragraph(_) | Block::Heading(_) | Block::CodeBlock(_)
        )
    }

    /// Length of the caret space of a textual block.
    pub fn content_len(&self) -> usize {
        match self {
            Block::Paragraph(text) => text.len(),
            Block::Heading(heading) => heading.content.len(),
            Block::CodeBlock(code) => code.code.chars().count(),
            _ => 0,
        }
    }
}

/// Address of a block in the tree.
///
/// Each container level consumes indices: blockquotes and info boxes one
/// (child), lists two (item, child), tables three (row, cell, child).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockPath(pub Vec<usize>);

impl BlockPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn from_slice(path: &[usize]) -> Self {
        Self(path.to_vec())
    }

    pub fn join(&self, tail: &[usize]) -> Self {
        let mut path = self.0.clone();
        path.extend_from_slice(tail);
        Self(path)
    }

    /// Index of the block within its container.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the containing `Vec<Block>` (everything but the last index).
    pub fn container(&self) -> &[usize] {
        match self.0.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn with_last(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        if let Some(last) = path.last_mut() {
            *last = index;
        }
        Self(path)
    }
}

impl std::ops::Deref for BlockPath {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

/// The whole editable document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut doc = Self { blocks };
        doc.ensure_not_empty();
        doc
    }

    /// An empty document still holds one empty paragraph for the caret.
    pub fn ensure_not_empty(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::empty_paragraph());
        }
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        let (last, container) = path.split_last()?;
        self.container(container)?.get(*last)
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (last, container) = path.split_last()?;
        self.container_mut(container)?.get_mut(*last)
    }

    pub fn container(&self, path: &[usize]) -> Option<&Vec<Block>> {
        container_of(&self.blocks, path)
    }

    pub fn container_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Block>> {
        container_of_mut(&mut self.blocks, path)
    }

    /// Prefix lengths of `path` at which a block (not a list item or cell) is addressed.
    pub fn block_boundaries(&self, path: &[usize]) -> Vec<usize> {
        let mut out = Vec::new();
        boundaries(&self.blocks, path, 0, &mut out);
        out
    }

    /// Paths of the blocks enclosing `path`, innermost first, excluding `path` itself.
    pub fn ancestors(&self, path: &[usize]) -> Vec<BlockPath> {
        let mut lens = self.block_boundaries(path);
        if lens.last() == Some(&path.len()) {
            lens.pop();
        }
        lens.into_iter()
            .rev()
            .map(|len| BlockPath::from_slice(&path[..len]))
            .collect()
    }

    /// Path of the first textual block at or below `path`.
    pub fn first_textual(&self, path: &[usize]) -> Option<BlockPath> {
        let block = self.block(path)?;
        if block.is_textual() {
            return Some(BlockPath::from_slice(path));
        }
        let base = BlockPath::from_slice(path);
        match block {
            Block::Blockquote(children) | Block::InfoBox(children) => (0..children.len())
                .find_map(|i| self.first_textual(&base.join(&[i]))),
            Block::List(list) => list.items.iter().enumerate().find_map(|(item, it)| {
                (0..it.blocks.len()).find_map(|i| self.first_textual(&base.join(&[item, i])))
            }),
            Block::Table(table) => table.rows.iter().enumerate().find_map(|(r, row)| {
                row.cells.iter().enumerate().find_map(|(c, cell)| {
                    (0..cell.blocks.len()).find_map(|i| self.first_textual(&base.join(&[r, c, i])))
                })
            }),
            _ => None,
        }
    }

    /// Every heading in document order, with its path.
    pub fn headings(&self) -> Vec<(BlockPath, &Heading)> {
        let mut out = Vec::new();
        collect_headings(&self.blocks, &mut Vec::new(), &mut out);
        out
    }

    pub fn headings_mut(&mut self) -> Vec<&mut Heading> {
        let mut out = Vec::new();
        collect_headings_mut(&mut self.blocks, &mut out);
        out
    }
}

fn container_of<'a>(blocks: &'a Vec<Block>, path: &[usize]) -> Option<&'a Vec<Block>> {
    let Some((&first, rest)) = path.split_first() else {
        return Some(blocks);
    };
    match blocks.get(first)? {
        Block::Blockquote(children) | Block::InfoBox(children) => container_of(children, rest),
        Block::List(list) => {
            let (&item, rest) = rest.split_first()?;
            container_of(&list.items.get(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            container_of(&table.rows.get(row)?.cells.get(cell)?.blocks, rest)
        }
        _ => None,
    }
}

fn container_of_mut<'a>(blocks: &'a mut Vec<Block>, path: &[usize]) -> Option<&'a mut Vec<Block>> {
    let Some((&first, rest)) = path.split_first() else {
        return Some(blocks);
    };
    match blocks.get_mut(first)? {
        Block::Blockquote(children) | Block::InfoBox(children) => container_of_mut(children, rest),
        Block::List(list) => {
            let (&item, rest) = rest.split_first()?;
            container_of_mut(&mut list.items.get_mut(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            container_of_mut(
                &mut table.rows.get_mut(row)?.cells.get_mut(cell)?.blocks,
                rest,
            )
        }
        _ => None,
    }
}

fn boundaries(blocks: &[Block], path: &[usize], base: usize, out: &mut Vec<usize>) {
    let Some((&first, rest)) = path.split_first() else {
        return;
    };
    let Some(block) = blocks.get(first) else {
        return;
    };
    out.push(base + 1);
    match block {
        Block::Blockquote(children) | Block::InfoBox(children) => {
            boundaries(children, rest, base + 1, out)
        }
        Block::List(list) => {
            if let Some((&item, rest)) = rest.split_first() {
                if let Some(item) = list.items.get(item) {
                    boundaries(&item.blocks, rest, base + 2, out);
                }
            }
        }
        Block::Table(table) => {
            if let [row, cell, rest @ ..] = rest {
                if let Some(cell) = table.rows.get(*row).and_then(|r| r.cells.get(*cell)) {
                    boundaries(&cell.blocks, rest, base + 3, out);
                }
            }
        }
        _ => {}
    }
}

fn collect_headings<'a>(
    blocks: &'a [Block],
    prefix: &mut Vec<usize>,
    out: &mut Vec<(BlockPath, &'a Heading)>,
) {
    for (i, block) in blocks.iter().enumerate() {
        prefix.push(i);
        match block {
            Block::Heading(heading) => out.push((BlockPath(prefix.clone()), heading)),
            Block::Blockquote(children) | Block::InfoBox(children) => {
                collect_headings(children, prefix, out)
            }
            Block::List(list) => {
                for (item_idx, item) in list.items.iter().enumerate() {
                    prefix.push(item_idx);
                    collect_headings(&item.blocks, prefix, out);
                    prefix.pop();
                }
            }
            Block::Table(table) => {
                for (r, row) in table.rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        prefix.push(r);
                        prefix.push(c);
                        collect_headings(&cell.blocks, prefix, out);
                        prefix.pop();
                        prefix.pop();
                    }
                }
            }
            _ => {}
        }
        prefix.pop();
    }
}

fn collect_headings_mut<'a>(blocks: &'a mut [Block], out: &mut Vec<&'a mut Heading>) {
    for block in blocks.iter_mut() {
        match block {
            Block::Heading(heading) => out.push(heading),
            Block::Blockquote(children) | Block::InfoBox(children) => {
                collect_headings_mut(children, out)
            }
            Block::List(list) => {
                for item in list.items.iter_mut() {
                    collect_headings_mut(&mut item.blocks, out);
                }
            }
            Block::Table(table) => {
                for row in table.rows.iter_mut() {
                    for cell in row.cells.iter_mut() {
                        collect_headings_mut(&mut cell.blocks, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Convert a char offset into a byte offset, clamped to the string length.
pub fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Marks {
        Marks {
            bold: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_block_insert_and_normalize() {
        let mut block = TextBlock::plain("hello");
        block.insert_text(5, " world", Marks::default());
        assert_eq!(block.inlines.len(), 1);
        assert_eq!(block.text_content(), "hello world");

        block.insert_text(0, ">", bold());
        assert_eq!(block.inlines.len(), 2);
        assert_eq!(block.len(), 12);
    }

    #[test]
    fn test_text_block_split_multibyte() {
        let mut block = TextBlock::plain("héllo wörld");
        let idx = block.split_inlines_at(7);
        assert_eq!(idx, 1);
        assert_eq!(block.inlines[0], Inline::text("héllo w"));
        assert_eq!(block.inlines[1], Inline::text("örld"));
    }

    #[test]
    fn test_text_block_delete_across_runs() {
        let mut block = TextBlock::new(vec![
            Inline::text("ab"),
            Inline::Text {
                text: "cd".into(),
                marks: bold(),
            },
            Inline::HardBreak,
            Inline::text("ef"),
        ]);
        assert_eq!(block.len(), 7);
        block.delete_range(1..6);
        assert_eq!(block.text_content(), "af");
        assert_eq!(block.inlines.len(), 1);
    }

    #[test]
    fn test_update_marks_partial() {
        let mut block = TextBlock::plain("hello world");
        block.update_marks(0..5, |m| m.bold = true);
        assert_eq!(block.inlines.len(), 2);
        assert!(block.runs_in(0..5).all(|m| m.bold));
        assert!(block.runs_in(6..11).all(|m| !m.bold));
        assert!(block.marks_at(5).bold);
        assert!(!block.marks_at(7).bold);
    }

    #[test]
    fn test_code_text_round_trip() {
        let block = TextBlock::from_code_text("fn main() {\n}\n");
        assert_eq!(block.to_code_text(), "fn main() {\n}\n");
    }

    #[test]
    fn test_paths_and_ancestors() {
        let doc = Document::new(vec![
            Block::Paragraph(TextBlock::plain("intro")),
            Block::List(List {
                kind: ListKind::Bullet,
                start: 1,
                items: vec![ListItem {
                    blocks: vec![Block::Blockquote(vec![Block::Paragraph(
                        TextBlock::plain("nested"),
                    )])],
                }],
            }),
            Block::Table(Table::new(2, 2, true)),
        ]);

        let nested = [1, 0, 0, 0];
        assert_eq!(
            doc.block(&nested).and_then(Block::text_block).map(|t| t.text_content()),
            Some("nested".to_string())
        );
        assert_eq!(doc.block_boundaries(&nested), vec![1, 3, 4]);
        assert_eq!(
            doc.ancestors(&nested),
            vec![BlockPath(vec![1, 0, 0]), BlockPath(vec![1])]
        );

        let cell = [2, 1, 1, 0];
        assert!(matches!(doc.block(&cell), Some(Block::Paragraph(_))));
        assert_eq!(doc.ancestors(&cell), vec![BlockPath(vec![2])]);
        assert_eq!(doc.first_textual(&[2]), Some(BlockPath(vec![2, 0, 0, 0])));

        // A list item alone is not a block.
        assert!(doc.block(&[1, 0]).is_none());
    }

    #[test]
    fn test_headings_in_document_order() {
        let doc = Document::new(vec![
            Block::Heading(Heading {
                level: 1,
                id: None,
                content: TextBlock::plain("One"),
            }),
            Block::Blockquote(vec![Block::Heading(Heading {
                level: 2,
                id: Some("two".into()),
                content: TextBlock::plain("Two"),
            })]),
        ]);
        let headings = doc.headings();
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].0, BlockPath(vec![0]));
        assert_eq!(headings[1].0, BlockPath(vec![1, 0]));
        assert_eq!(headings[1].1.id.as_deref(), Some("two"));
    }
}
