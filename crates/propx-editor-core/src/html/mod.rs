//! HTML codec: parse editor HTML into a [`Document`] and serialize it back.
//!
//! Parsing goes through html5ever's HTML5 tree builder, so any HTML
//! (including malformed input) is accepted. Unknown elements are transparent:
//! their content is kept, the element itself is dropped.

mod writer;

pub use writer::{HtmlWriter, IMAGE_CLASS, INFO_BOX_CLASS, LINK_CLASS, escape_attr, escape_text, to_html};

use std::cell::RefCell;

use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use smol_str::SmolStr;

use crate::model::{
    Align, Block, CodeBlock, Document, Heading, ImageAttrs, Inline, Link, List, ListItem,
    ListKind, Marks, Table, TableCell, TableRow, TextBlock,
};

/// Parse an HTML fragment into a document.
pub fn from_html(html: &str) -> Document {
    let dom = parse_dom(html);
    let blocks = match find_element(&dom.document, "body") {
        Some(body) => parse_blocks(&body),
        None => Vec::new(),
    };
    Document::new(blocks)
}

/// Parse and re-serialize, producing the canonical form of `html`.
pub fn normalize_html(html: &str) -> String {
    to_html(&from_html(html))
}

pub(crate) fn parse_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

pub(crate) fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if let NodeData::Element { ref name, .. } = child.data {
            if name.local.as_ref() == tag {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn get_attr(attrs: &RefCell<Vec<Attribute>>, name: &str) -> Option<String> {
    attrs
        .borrow()
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

/// Concatenated text of every descendant text node.
pub(crate) fn text_content(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => text_content(child, out),
            _ => {}
        }
    }
}

fn element_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

fn element_attrs(node: &Handle) -> Option<&RefCell<Vec<Attribute>>> {
    match node.data {
        NodeData::Element { ref attrs, .. } => Some(attrs),
        _ => None,
    }
}

fn attr_of(node: &Handle, name: &str) -> Option<String> {
    element_attrs(node).and_then(|attrs| get_attr(attrs, name))
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "blockquote"
            | "div"
            | "pre"
            | "hr"
            | "table"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "aside"
            | "figure"
            | "figcaption"
    )
}

/// `text-align` from an inline style declaration.
pub(crate) fn parse_align(style: &str) -> Option<Align> {
    style.split(';').find_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        if prop.trim().eq_ignore_ascii_case("text-align") {
            Align::parse(value)
        } else {
            None
        }
    })
}

fn align_of(node: &Handle) -> Option<Align> {
    attr_of(node, "style").and_then(|style| parse_align(&style))
}

fn parse_blocks(node: &Handle) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending = InlineCollector::default();

    for child in node.children.borrow().iter() {
        match element_name(child) {
            Some(tag) if is_block_tag(tag) => {
                if let Some(paragraph) = pending.take_block() {
                    blocks.push(Block::Paragraph(paragraph));
                }
                parse_block_element(child, tag, &mut blocks);
            }
            _ => pending.collect(child, &Marks::default()),
        }
    }
    if let Some(paragraph) = pending.take_block() {
        blocks.push(Block::Paragraph(paragraph));
    }
    blocks
}

fn non_empty(mut blocks: Vec<Block>) -> Vec<Block> {
    if blocks.is_empty() {
        blocks.push(Block::empty_paragraph());
    }
    blocks
}

fn parse_block_element(node: &Handle, tag: &str, blocks: &mut Vec<Block>) {
    match tag {
        "p" => {
            let mut text = InlineCollector::collect_children(node);
            text.align = align_of(node);
            blocks.push(Block::Paragraph(text));
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<u8>().unwrap_or(1);
            let mut content = InlineCollector::collect_children(node);
            content.align = align_of(node);
            let id = attr_of(node, "id")
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty())
                .map(SmolStr::from);
            blocks.push(Block::Heading(Heading { level, id, content }));
        }
        "ul" | "ol" => {
            if let Some(list) = parse_list(node, tag) {
                blocks.push(Block::List(list));
            }
        }
        // A stray list item outside a list becomes a single-item bullet list.
        "li" => blocks.push(Block::List(List {
            kind: ListKind::Bullet,
            start: 1,
            items: vec![ListItem {
                blocks: non_empty(parse_blocks(node)),
            }],
        })),
        "blockquote" => blocks.push(Block::Blockquote(non_empty(parse_blocks(node)))),
        "div" if attr_of(node, "data-type").as_deref() == Some("info-box") => {
            blocks.push(Block::InfoBox(non_empty(parse_blocks(node))))
        }
        "pre" => blocks.push(Block::CodeBlock(parse_code_block(node))),
        "hr" => blocks.push(Block::HorizontalRule),
        "table" => {
            if let Some(table) = parse_table(node) {
                blocks.push(Block::Table(table));
            }
        }
        _ => blocks.extend(parse_blocks(node)),
    }
}

fn parse_list(node: &Handle, tag: &str) -> Option<List> {
    let kind = if tag == "ol" {
        ListKind::Ordered
    } else {
        ListKind::Bullet
    };
    let start = attr_of(node, "start")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(1);

    let mut items = Vec::new();
    for child in node.children.borrow().iter() {
        match element_name(child) {
            Some("li") => items.push(ListItem {
                blocks: non_empty(parse_blocks(child)),
            }),
            Some(_) => {
                let mut blocks = Vec::new();
                parse_element_as_blocks(child, &mut blocks);
                if !blocks.is_empty() {
                    items.push(ListItem { blocks });
                }
            }
            None => {}
        }
    }

    if items.is_empty() {
        None
    } else {
        Some(List { kind, start, items })
    }
}

fn parse_element_as_blocks(node: &Handle, blocks: &mut Vec<Block>) {
    match element_name(node) {
        Some(tag) if is_block_tag(tag) => parse_block_element(node, tag, blocks),
        Some(_) => {
            let mut collector = InlineCollector::default();
            collector.collect(node, &Marks::default());
            if let Some(paragraph) = collector.take_block() {
                blocks.push(Block::Paragraph(paragraph));
            }
        }
        None => {}
    }
}

fn parse_code_block(node: &Handle) -> CodeBlock {
    let code_el = node
        .children
        .borrow()
        .iter()
        .find(|child| element_name(child) == Some("code"))
        .cloned();
    let language = code_el
        .as_ref()
        .and_then(|code| attr_of(code, "class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-").map(SmolStr::from))
        });
    let mut code = String::new();
    text_content(code_el.as_ref().unwrap_or(node), &mut code);
    CodeBlock { language, code }
}

fn parse_table(node: &Handle) -> Option<Table> {
    let mut rows = Vec::new();
    collect_rows(node, &mut rows);
    if rows.is_empty() {
        return None;
    }
    let mut table = Table { rows };
    crate::table::normalize_table(&mut table);
    if table.rows.iter().all(|row| row.cells.is_empty()) {
        return None;
    }
    Some(table)
}

fn collect_rows(node: &Handle, rows: &mut Vec<TableRow>) {
    for child in node.children.borrow().iter() {
        match element_name(child) {
            Some("thead") | Some("tbody") | Some("tfoot") => collect_rows(child, rows),
            Some("tr") => {
                let cells: Vec<TableCell> = child
                    .children
                    .borrow()
                    .iter()
                    .filter_map(|cell| match element_name(cell) {
                        Some(tag @ ("td" | "th")) => Some(parse_cell(cell, tag == "th")),
                        _ => None,
                    })
                    .collect();
                rows.push(TableRow { cells });
            }
            _ => {}
        }
    }
}

/// Upper bounds for `colspan`/`rowspan`, the same ones browsers apply.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

fn parse_span(node: &Handle, name: &str, max: usize) -> usize {
    let Some(value) = attr_of(node, name) else {
        return 1;
    };
    let value = value.trim();
    match value.parse::<usize>() {
        Ok(n) => n.clamp(1, max),
        // Too many digits for usize.
        Err(_) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => max,
        Err(_) => 1,
    }
}

fn parse_cell(node: &Handle, header: bool) -> TableCell {
    TableCell {
        header,
        colspan: parse_span(node, "colspan", MAX_COLSPAN),
        rowspan: parse_span(node, "rowspan", MAX_ROWSPAN),
        align: align_of(node),
        blocks: non_empty(parse_blocks(node)),
    }
}

/// Collects inline content with HTML whitespace collapsing.
#[derive(Default)]
struct InlineCollector {
    inlines: Vec<Inline>,
    last_was_space: bool,
    has_content: bool,
}

impl InlineCollector {
    fn collect_children(node: &Handle) -> TextBlock {
        let mut collector = Self::default();
        for child in node.children.borrow().iter() {
            collector.collect(child, &Marks::default());
        }
        collector.finish()
    }

    fn collect(&mut self, node: &Handle, marks: &Marks) {
        match node.data {
            NodeData::Text { ref contents } => self.push_text(&contents.borrow(), marks),
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag = name.local.as_ref();
                match tag {
                    "br" => {
                        self.inlines.push(Inline::HardBreak);
                        self.last_was_space = true;
                        self.has_content = true;
                    }
                    "img" => self.push_image(attrs),
                    "script" | "style" | "template" => {}
                    _ => {
                        let marks = apply_tag_marks(tag, attrs, marks);
                        for child in node.children.borrow().iter() {
                            self.collect(child, &marks);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, raw: &str, marks: &Marks) {
        let mut text = String::with_capacity(raw.len());
        for c in raw.chars() {
            if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c') {
                if !self.last_was_space && (self.has_content || !text.is_empty()) {
                    text.push(' ');
                }
                self.last_was_space = true;
            } else {
                text.push(c);
                self.last_was_space = false;
            }
        }
        if !text.is_empty() {
            self.has_content = true;
            self.inlines.push(Inline::Text {
                text,
                marks: marks.clone(),
            });
        }
    }

    fn push_image(&mut self, attrs: &RefCell<Vec<Attribute>>) {
        let Some(src) = get_attr(attrs, "src").filter(|s| !s.trim().is_empty()) else {
            return;
        };
        let image = ImageAttrs {
            src,
            alt: get_attr(attrs, "alt"),
            title: get_attr(attrs, "title"),
            caption: get_attr(attrs, "content"),
        };
        if image.is_embedded_data() {
            tracing::warn!("dropping inline base64 image");
            return;
        }
        self.inlines.push(Inline::Image(image));
        self.last_was_space = false;
        self.has_content = true;
    }

    /// Trim trailing collapsible space and produce the block.
    fn finish(mut self) -> TextBlock {
        while let Some(Inline::Text { text, .. }) = self.inlines.last_mut() {
            let trimmed = text.trim_end_matches(' ').len();
            text.truncate(trimmed);
            if text.is_empty() {
                self.inlines.pop();
            } else {
                break;
            }
        }
        TextBlock::new(self.inlines)
    }

    /// Flush loose inline content into a paragraph if any visible content was seen.
    fn take_block(&mut self) -> Option<TextBlock> {
        let collector = std::mem::take(self);
        if !collector.has_content {
            return None;
        }
        let block = collector.finish();
        if block.is_empty() { None } else { Some(block) }
    }
}

fn apply_tag_marks(tag: &str, attrs: &RefCell<Vec<Attribute>>, marks: &Marks) -> Marks {
    let mut marks = marks.clone();
    match tag {
        "strong" | "b" => marks.bold = true,
        "em" | "i" => marks.italic = true,
        "u" => marks.underline = true,
        "s" | "strike" | "del" => marks.strike = true,
        "code" => marks.code = true,
        "a" => {
            if let Some(href) = get_attr(attrs, "href").filter(|h| !h.trim().is_empty()) {
                marks.link = Some(Link {
                    href: SmolStr::from(href.trim()),
                });
            }
        }
        _ => {}
    }
    marks
}
