//! Canonical HTML serialization of a [`Document`].
//!
//! The output is stable: parsing it back and serializing again yields the same
//! string. Left alignment is the default and is never written out.

use std::fmt::{self, Write as FmtWrite};

use crate::model::{
    Align, Block, CodeBlock, Document, Heading, ImageAttrs, Inline, List, ListKind, Marks, Table,
    TableCell, TextBlock,
};

/// Class added to every link.
pub const LINK_CLASS: &str = "custom-link";
/// Class added to every image.
pub const IMAGE_CLASS: &str = "help-center-image";
/// Class added to info boxes alongside `data-type="info-box"`.
pub const INFO_BOX_CLASS: &str = "info-box";

/// Serialize a document to its canonical HTML string.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = HtmlWriter::new(&mut out).write_blocks(&doc.blocks);
    out
}

/// Escape text content.
pub fn escape_text(s: &str, out: &mut impl FmtWrite) -> fmt::Result {
    for c in s.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '\u{a0}' => out.write_str("&nbsp;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(s: &str, out: &mut impl FmtWrite) -> fmt::Result {
    for c in s.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '"' => out.write_str("&quot;")?,
            '\u{a0}' => out.write_str("&nbsp;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

/// Streaming block/inline writer.
pub struct HtmlWriter<'w, W: FmtWrite> {
    out: &'w mut W,
}

impl<'w, W: FmtWrite> HtmlWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out }
    }

    pub fn write_blocks(&mut self, blocks: &[Block]) -> fmt::Result {
        for block in blocks {
            self.write_block(block)?;
        }
        Ok(())
    }

    fn write_block(&mut self, block: &Block) -> fmt::Result {
        match block {
            Block::Paragraph(text) => {
                self.out.write_str("<p")?;
                self.write_align(text.align)?;
                self.out.write_char('>')?;
                self.write_inlines(text)?;
                self.out.write_str("</p>")
            }
            Block::Heading(heading) => self.write_heading(heading),
            Block::List(list) => self.write_list(list),
            Block::Blockquote(children) => {
                self.out.write_str("<blockquote>")?;
                self.write_blocks(children)?;
                self.out.write_str("</blockquote>")
            }
            Block::InfoBox(children) => {
                write!(
                    self.out,
                    "<div data-type=\"info-box\" class=\"{INFO_BOX_CLASS}\">"
                )?;
                self.write_blocks(children)?;
                self.out.write_str("</div>")
            }
            Block::CodeBlock(code) => self.write_code_block(code),
            Block::HorizontalRule => self.out.write_str("<hr>"),
            Block::Table(table) => self.write_table(table),
        }
    }

    fn write_align(&mut self, align: Option<Align>) -> fmt::Result {
        match align {
            None | Some(Align::Left) => Ok(()),
            Some(align) => write!(self.out, " style=\"text-align: {}\"", align.as_str()),
        }
    }

    fn write_heading(&mut self, heading: &Heading) -> fmt::Result {
        let level = heading.level.clamp(1, 6);
        write!(self.out, "<h{level}")?;
        if let Some(id) = heading.id.as_deref().filter(|id| !id.is_empty()) {
            self.out.write_str(" id=\"")?;
            escape_attr(id, self.out)?;
            self.out.write_char('"')?;
        }
        self.write_align(heading.content.align)?;
        self.out.write_char('>')?;
        self.write_inlines(&heading.content)?;
        write!(self.out, "</h{level}>")
    }

    fn write_list(&mut self, list: &List) -> fmt::Result {
        let tag = match list.kind {
            ListKind::Bullet => "ul",
            ListKind::Ordered => "ol",
        };
        write!(self.out, "<{tag}")?;
        if list.kind == ListKind::Ordered && list.start != 1 {
            write!(self.out, " start=\"{}\"", list.start)?;
        }
        self.out.write_char('>')?;
        for item in &list.items {
            self.out.write_str("<li>")?;
            self.write_blocks(&item.blocks)?;
            self.out.write_str("</li>")?;
        }
        write!(self.out, "</{tag}>")
    }

    fn write_code_block(&mut self, code: &CodeBlock) -> fmt::Result {
        self.out.write_str("<pre><code")?;
        if let Some(lang) = code.language.as_deref().filter(|l| !l.is_empty()) {
            self.out.write_str(" class=\"language-")?;
            escape_attr(lang, self.out)?;
            self.out.write_char('"')?;
        }
        self.out.write_char('>')?;
        escape_text(&code.code, self.out)?;
        self.out.write_str("</code></pre>")
    }

    fn write_table(&mut self, table: &Table) -> fmt::Result {
        self.out.write_str("<table><tbody>")?;
        for row in &table.rows {
            self.out.write_str("<tr>")?;
            for cell in &row.cells {
                self.write_cell(cell)?;
            }
            self.out.write_str("</tr>")?;
        }
        self.out.write_str("</tbody></table>")
    }

    fn write_cell(&mut self, cell: &TableCell) -> fmt::Result {
        let tag = if cell.header { "th" } else { "td" };
        write!(self.out, "<{tag}")?;
        if cell.colspan > 1 {
            write!(self.out, " colspan=\"{}\"", cell.colspan)?;
        }
        if cell.rowspan > 1 {
            write!(self.out, " rowspan=\"{}\"", cell.rowspan)?;
        }
        self.write_align(cell.align)?;
        self.out.write_char('>')?;
        self.write_blocks(&cell.blocks)?;
        write!(self.out, "</{tag}>")
    }

    fn write_inlines(&mut self, block: &TextBlock) -> fmt::Result {
        for inline in &block.inlines {
            match inline {
                Inline::Text { text, marks } => self.write_text_run(text, marks)?,
                Inline::HardBreak => self.out.write_str("<br>")?,
                Inline::Image(image) => self.write_image(image)?,
            }
        }
        Ok(())
    }

    /// Marks nest in a fixed order: link, bold, italic, underline, strike, code.
    fn write_text_run(&mut self, text: &str, marks: &Marks) -> fmt::Result {
        if let Some(link) = &marks.link {
            self.out.write_str("<a href=\"")?;
            escape_attr(&link.href, self.out)?;
            write!(
                self.out,
                "\" class=\"{LINK_CLASS}\" rel=\"noopener noreferrer\">"
            )?;
        }
        let tags = [
            (marks.bold, "strong"),
            (marks.italic, "em"),
            (marks.underline, "u"),
            (marks.strike, "s"),
            (marks.code, "code"),
        ];
        for (on, tag) in tags {
            if on {
                write!(self.out, "<{tag}>")?;
            }
        }
        escape_text(text, self.out)?;
        for (on, tag) in tags.iter().rev() {
            if *on {
                write!(self.out, "</{tag}>")?;
            }
        }
        if marks.link.is_some() {
            self.out.write_str("</a>")?;
        }
        Ok(())
    }

    fn write_image(&mut self, image: &ImageAttrs) -> fmt::Result {
        self.out.write_str("<img src=\"")?;
        escape_attr(&image.src, self.out)?;
        self.out.write_char('"')?;
        let optional = [
            ("alt", &image.alt),
            ("title", &image.title),
            ("content", &image.caption),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                write!(self.out, " {name}=\"")?;
                escape_attr(value, self.out)?;
                self.out.write_char('"')?;
            }
        }
        write!(self.out, " class=\"{IMAGE_CLASS}\">")
    }
}
