//! Toolbar model: which buttons exist, which are lit and which are usable.

use crate::actions::{ActiveQuery, EditorCommand};
use crate::config::EditorOptions;
use crate::model::{Align, MarkKind};
use crate::surface::EditingSurface;

/// What pressing a toolbar item does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    /// Run an editor command directly.
    Command(EditorCommand),
    /// Open the link form.
    OpenLinkForm,
    /// Open the host's file picker and upload an image.
    UploadImage,
    /// Open the metadata form for the selected image.
    EditImage,
    /// Ask the host for table dimensions, then insert.
    InsertTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarItem {
    pub id: &'static str,
    pub title: &'static str,
    pub action: ToolbarAction,
    pub active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarGroup {
    pub name: &'static str,
    pub items: Vec<ToolbarItem>,
}

/// Rows and columns picked for a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDimensions {
    pub rows: usize,
    pub cols: usize,
    pub with_header_row: bool,
}

impl Default for TableDimensions {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            with_header_row: true,
        }
    }
}

impl TableDimensions {
    /// Clamp into `1..=max` on both axes.
    pub fn clamped(self, options: &EditorOptions) -> Self {
        Self {
            rows: self.rows.clamp(1, options.max_table_rows.max(1)),
            cols: self.cols.clamp(1, options.max_table_cols.max(1)),
            with_header_row: self.with_header_row,
        }
    }

    pub fn command(self) -> EditorCommand {
        EditorCommand::InsertTable {
            rows: self.rows,
            cols: self.cols,
            with_header_row: self.with_header_row,
        }
    }
}

fn command_item<S: EditingSurface + ?Sized>(
    surface: &S,
    id: &'static str,
    title: &'static str,
    command: EditorCommand,
    query: Option<ActiveQuery>,
) -> ToolbarItem {
    ToolbarItem {
        id,
        title,
        active: query.is_some_and(|q| surface.is_active(&q)),
        enabled: surface.can_apply(&command),
        action: ToolbarAction::Command(command),
    }
}

fn heading_item<S: EditingSurface + ?Sized>(surface: &S, level: u8) -> Option<ToolbarItem> {
    let (id, title) = match level {
        1 => ("heading-1", "Heading 1"),
        2 => ("heading-2", "Heading 2"),
        3 => ("heading-3", "Heading 3"),
        4 => ("heading-4", "Heading 4"),
        5 => ("heading-5", "Heading 5"),
        6 => ("heading-6", "Heading 6"),
        _ => return None,
    };
    Some(command_item(
        surface,
        id,
        title,
        EditorCommand::ToggleHeading { level },
        Some(ActiveQuery::Heading(level)),
    ))
}

/// Build the toolbar for the current selection.
///
/// Table editing items only appear inside a table, the unlink item only while
/// a link is active and the image edit item only while an image is selected.
pub fn toolbar_state<S: EditingSurface + ?Sized>(
    surface: &S,
    options: &EditorOptions,
    upload_pending: bool,
) -> Vec<ToolbarGroup> {
    let mut groups = Vec::new();

    groups.push(ToolbarGroup {
        name: "history",
        items: vec![
            command_item(surface, "undo", "Undo", EditorCommand::Undo, None),
            command_item(surface, "redo", "Redo", EditorCommand::Redo, None),
        ],
    });

    let mut blocks = vec![command_item(
        surface,
        "paragraph",
        "Paragraph",
        EditorCommand::SetParagraph,
        Some(ActiveQuery::Paragraph),
    )];
    blocks.extend(
        options
            .heading_levels
            .iter()
            .filter_map(|level| heading_item(surface, *level)),
    );
    groups.push(ToolbarGroup {
        name: "headings",
        items: blocks,
    });

    let marks = [
        (MarkKind::Bold, "bold", "Bold"),
        (MarkKind::Italic, "italic", "Italic"),
        (MarkKind::Underline, "underline", "Underline"),
        (MarkKind::Strike, "strike", "Strikethrough"),
        (MarkKind::Code, "code", "Inline code"),
    ];
    groups.push(ToolbarGroup {
        name: "marks",
        items: marks
            .into_iter()
            .map(|(kind, id, title)| {
                command_item(
                    surface,
                    id,
                    title,
                    EditorCommand::ToggleMark(kind),
                    Some(ActiveQuery::Mark(kind)),
                )
            })
            .collect(),
    });

    groups.push(ToolbarGroup {
        name: "lists",
        items: vec![
            command_item(
                surface,
                "bullet-list",
                "Bullet list",
                EditorCommand::ToggleBulletList,
                Some(ActiveQuery::BulletList),
            ),
            command_item(
                surface,
                "ordered-list",
                "Numbered list",
                EditorCommand::ToggleOrderedList,
                Some(ActiveQuery::OrderedList),
            ),
        ],
    });

    groups.push(ToolbarGroup {
        name: "blocks",
        items: vec![
            command_item(
                surface,
                "blockquote",
                "Quote",
                EditorCommand::ToggleBlockquote,
                Some(ActiveQuery::Blockquote),
            ),
            command_item(
                surface,
                "info-box",
                "Info box",
                EditorCommand::ToggleInfoBox,
                Some(ActiveQuery::InfoBox),
            ),
            command_item(
                surface,
                "code-block",
                "Code block",
                EditorCommand::ToggleCodeBlock,
                Some(ActiveQuery::CodeBlock),
            ),
            command_item(
                surface,
                "horizontal-rule",
                "Divider",
                EditorCommand::SetHorizontalRule,
                None,
            ),
        ],
    });

    let aligns = [
        (Align::Left, "align-left", "Align left"),
        (Align::Center, "align-center", "Align center"),
        (Align::Right, "align-right", "Align right"),
        (Align::Justify, "align-justify", "Justify"),
    ];
    groups.push(ToolbarGroup {
        name: "align",
        items: aligns
            .into_iter()
            .map(|(align, id, title)| {
                command_item(
                    surface,
                    id,
                    title,
                    EditorCommand::SetTextAlign(align),
                    Some(ActiveQuery::TextAlign(align)),
                )
            })
            .collect(),
    });

    let link_active = surface.is_active(&ActiveQuery::Link);
    let in_table = surface.is_inside_table();
    let mut insert = vec![ToolbarItem {
        id: "link",
        title: "Link",
        action: ToolbarAction::OpenLinkForm,
        active: link_active,
        enabled: true,
    }];
    if link_active {
        insert.push(command_item(
            surface,
            "unlink",
            "Remove link",
            EditorCommand::UnsetLink,
            None,
        ));
    }
    insert.push(ToolbarItem {
        id: "image",
        title: if upload_pending { "Uploading..." } else { "Image" },
        action: ToolbarAction::UploadImage,
        active: false,
        enabled: !upload_pending,
    });
    if surface.selected_image().is_some() {
        insert.push(ToolbarItem {
            id: "image-details",
            title: "Image details",
            action: ToolbarAction::EditImage,
            active: true,
            enabled: true,
        });
    }
    insert.push(ToolbarItem {
        id: "table",
        title: "Table",
        action: ToolbarAction::InsertTable,
        active: in_table,
        enabled: !in_table,
    });
    groups.push(ToolbarGroup {
        name: "insert",
        items: insert,
    });

    if in_table {
        let table_items = [
            ("add-row-before", "Add row before", EditorCommand::AddRowBefore),
            ("add-row-after", "Add row after", EditorCommand::AddRowAfter),
            ("delete-row", "Delete row", EditorCommand::DeleteRow),
            ("add-column-before", "Add column before", EditorCommand::AddColumnBefore),
            ("add-column-after", "Add column after", EditorCommand::AddColumnAfter),
            ("delete-column", "Delete column", EditorCommand::DeleteColumn),
            ("merge-cells", "Merge cells", EditorCommand::MergeCells),
            ("split-cell", "Split cell", EditorCommand::SplitCell),
            ("toggle-header-row", "Header row", EditorCommand::ToggleHeaderRow),
            ("toggle-header-column", "Header column", EditorCommand::ToggleHeaderColumn),
            ("toggle-header-cell", "Header cell", EditorCommand::ToggleHeaderCell),
            ("cell-align-left", "Cell left", EditorCommand::SetCellAlign(Align::Left)),
            ("cell-align-center", "Cell center", EditorCommand::SetCellAlign(Align::Center)),
            ("cell-align-right", "Cell right", EditorCommand::SetCellAlign(Align::Right)),
            ("delete-table", "Delete table", EditorCommand::DeleteTable),
        ];
        groups.push(ToolbarGroup {
            name: "table",
            items: table_items
                .into_iter()
                .map(|(id, title, command)| command_item(surface, id, title, command, None))
                .collect(),
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockPath;
    use crate::surface::DocumentSurface;
    use crate::types::Selection;

    fn item<'a>(groups: &'a [ToolbarGroup], id: &str) -> Option<&'a ToolbarItem> {
        groups.iter().flat_map(|g| g.items.iter()).find(|i| i.id == id)
    }

    #[test]
    fn test_table_group_only_inside_table() {
        let options = EditorOptions::default();
        let mut surface = DocumentSurface::from_html("<p>x</p>", 10);
        let groups = toolbar_state(&surface, &options, false);
        assert!(groups.iter().all(|g| g.name != "table"));

        surface.apply_command(&TableDimensions::default().command());
        let groups = toolbar_state(&surface, &options, false);
        let table = groups.iter().find(|g| g.name == "table").expect("table group");
        assert!(table.items.iter().any(|i| i.id == "delete-column" && i.enabled));
        assert!(!item(&groups, "table").expect("table item").enabled);
    }

    #[test]
    fn test_active_flags_and_unlink_visibility() {
        let options = EditorOptions::default();
        let mut surface = DocumentSurface::from_html(
            r#"<h2>Title</h2><p><a href="https://a.test">link</a></p>"#,
            10,
        );
        let groups = toolbar_state(&surface, &options, false);
        assert!(item(&groups, "heading-2").expect("h2").active);
        assert!(item(&groups, "unlink").is_none());

        surface.apply_command(&crate::actions::EditorCommand::SetSelection(Selection::caret(
            BlockPath::root(1),
            2,
        )));
        let groups = toolbar_state(&surface, &options, false);
        assert!(item(&groups, "link").expect("link").active);
        assert!(item(&groups, "unlink").expect("unlink").enabled);
    }

    #[test]
    fn test_upload_item_disabled_while_pending() {
        let surface = DocumentSurface::from_html("<p></p>", 10);
        let groups = toolbar_state(&surface, &EditorOptions::default(), true);
        let image = item(&groups, "image").expect("image item");
        assert!(!image.enabled);
        assert_eq!(image.title, "Uploading...");
    }

    #[test]
    fn test_dimensions_clamped() {
        let options = EditorOptions::default();
        let dims = TableDimensions {
            rows: 0,
            cols: 42,
            with_header_row: false,
        }
        .clamped(&options);
        assert_eq!((dims.rows, dims.cols), (1, 10));
    }
}
