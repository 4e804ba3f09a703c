//! Table geometry and structural table edits.
//!
//! Cells may span several rows and columns, so edits work on a [`TableMap`]:
//! a grid that records which cell covers every row/column slot. Row and column
//! operations follow the usual rules for spanning cells: inserting inside a
//! span widens the span, deleting through a span narrows it.

use std::collections::HashSet;

use crate::model::{Align, Block, Table, TableCell};

/// A cell addressed by its row in the table and its index within that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: usize,
    pub index: usize,
}

/// A rectangle of grid slots. `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Rect {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Smallest rect containing both grid positions.
    pub fn spanning(a: (usize, usize), b: (usize, usize)) -> Self {
        Self {
            top: a.0.min(b.0),
            left: a.1.min(b.1),
            bottom: a.0.max(b.0) + 1,
            right: a.1.max(b.1) + 1,
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.top >= self.top
            && other.left >= self.left
            && other.bottom <= self.bottom
            && other.right <= self.right
    }

    fn union(&self, other: &Rect) -> Rect {
        Rect {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }
}

/// Grid layout of a table.
#[derive(Debug, Clone)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    grid: Vec<Option<CellRef>>,
    rects: Vec<Vec<Rect>>,
}

impl TableMap {
    pub fn new(table: &Table) -> Self {
        let height = table.rows.len();
        let mut rows: Vec<Vec<Option<CellRef>>> = vec![Vec::new(); height];
        let mut rects = Vec::with_capacity(height);

        for (r, row) in table.rows.iter().enumerate() {
            let mut col = 0;
            let mut row_rects = Vec::with_capacity(row.cells.len());
            for (index, cell) in row.cells.iter().enumerate() {
                while rows[r].get(col).copied().flatten().is_some() {
                    col += 1;
                }
                let bottom = (r + cell.rowspan.max(1)).min(height);
                let right = col + cell.colspan.max(1);
                let cell_ref = CellRef { row: r, index };
                for slot_row in rows.iter_mut().take(bottom).skip(r) {
                    if slot_row.len() < right {
                        slot_row.resize(right, None);
                    }
                    for slot in &mut slot_row[col..right] {
                        // Overlapping spans keep the first owner.
                        if slot.is_none() {
                            *slot = Some(cell_ref);
                        }
                    }
                }
                row_rects.push(Rect::new(r, col, bottom, right));
                col = right;
            }
            rects.push(row_rects);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Vec::with_capacity(width * height);
        for mut row in rows {
            row.resize(width, None);
            grid.extend(row);
        }

        Self {
            width,
            height,
            grid,
            rects,
        }
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<CellRef> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.grid[row * self.width + col]
    }

    pub fn rect(&self, cell: CellRef) -> Rect {
        self.rects
            .get(cell.row)
            .and_then(|row| row.get(cell.index))
            .copied()
            .unwrap_or_default()
    }

    /// Distinct cells touching `rect`, in row-major order of first appearance.
    pub fn cells_in_rect(&self, rect: Rect) -> Vec<CellRef> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in rect.top..rect.bottom.min(self.height) {
            for col in rect.left..rect.right.min(self.width) {
                if let Some(cell) = self.cell_at(row, col) {
                    if seen.insert(cell) {
                        out.push(cell);
                    }
                }
            }
        }
        out
    }

    /// Grow `rect` until no cell crosses its boundary.
    pub fn expand(&self, rect: Rect) -> Rect {
        let mut current = rect;
        loop {
            let grown = self
                .cells_in_rect(current)
                .into_iter()
                .fold(current, |acc, cell| acc.union(&self.rect(cell)));
            if grown == current {
                return current;
            }
            current = grown;
        }
    }

    /// Index in `row` at which a cell starting at `col` would be inserted.
    fn insert_index(&self, row: usize, col: usize) -> usize {
        self.rects
            .get(row)
            .map(|rects| rects.iter().filter(|r| r.left < col).count())
            .unwrap_or(0)
    }

    fn row_is_header(&self, table: &Table, row: usize) -> bool {
        (0..self.width).all(|col| {
            self.cell_at(row, col)
                .is_some_and(|cell| cell_ref(table, cell).is_some_and(|c| c.header))
        })
    }

    fn column_is_header(&self, table: &Table, col: usize) -> bool {
        (0..self.height).all(|row| {
            self.cell_at(row, col)
                .is_some_and(|cell| cell_ref(table, cell).is_some_and(|c| c.header))
        })
    }
}

fn cell_ref(table: &Table, cell: CellRef) -> Option<&TableCell> {
    table.rows.get(cell.row)?.cells.get(cell.index)
}

fn cell_mut(table: &mut Table, cell: CellRef) -> Option<&mut TableCell> {
    table.rows.get_mut(cell.row)?.cells.get_mut(cell.index)
}

fn remove_cells(table: &mut Table, mut cells: Vec<CellRef>) {
    cells.sort_unstable_by(|a, b| b.cmp(a));
    for cell in cells {
        if let Some(row) = table.rows.get_mut(cell.row) {
            if cell.index < row.cells.len() {
                row.cells.remove(cell.index);
            }
        }
    }
}

/// Repair spans and fill holes so every grid slot is covered by exactly one cell.
pub fn normalize_table(table: &mut Table) {
    let height = table.rows.len();
    for (r, row) in table.rows.iter_mut().enumerate() {
        for cell in &mut row.cells {
            cell.colspan = cell.colspan.max(1);
            cell.rowspan = cell.rowspan.clamp(1, height - r);
            if cell.blocks.is_empty() {
                cell.blocks.push(Block::empty_paragraph());
            }
        }
    }

    // Shrink spans that collide with cells placed earlier.
    let map = TableMap::new(table);
    for (r, row) in table.rows.iter_mut().enumerate() {
        for (index, cell) in row.cells.iter_mut().enumerate() {
            let me = Some(CellRef { row: r, index });
            let rect = map.rect(CellRef { row: r, index });
            let cols = (rect.left..rect.right)
                .take_while(|col| map.cell_at(r, *col) == me)
                .count();
            let rows = (rect.top..rect.bottom)
                .take_while(|row| map.cell_at(*row, rect.left) == me)
                .count();
            cell.colspan = cols.max(1);
            cell.rowspan = rows.max(1);
        }
    }

    let map = TableMap::new(table);
    for (r, row) in table.rows.iter_mut().enumerate() {
        let holes = (0..map.width)
            .filter(|col| map.cell_at(r, *col).is_none())
            .count();
        for _ in 0..holes {
            row.cells.push(TableCell::empty(false));
        }
    }
}

/// Insert an empty row so that it becomes row `row`.
pub fn add_row(table: &mut Table, row: usize) {
    let map = TableMap::new(table);
    let row = row.min(map.height);

    let mut ref_row: Option<isize> = Some(if row > 0 { -1 } else { 0 });
    let probe = (row as isize + ref_row.unwrap_or(0)) as usize;
    if map.row_is_header(table, probe) {
        ref_row = if row == 0 || row == map.height {
            None
        } else {
            Some(0)
        };
    }

    let mut cells = Vec::new();
    let mut col = 0;
    while col < map.width {
        let here = map.cell_at(row, col);
        let above = if row > 0 { map.cell_at(row - 1, col) } else { None };
        if row > 0 && row < map.height && here.is_some() && here == above {
            // A cell spanning across the insertion point grows instead.
            let Some(spanning) = here else { break };
            let rect = map.rect(spanning);
            if let Some(cell) = cell_mut(table, spanning) {
                cell.rowspan += 1;
            }
            col = rect.right;
        } else {
            let header = ref_row
                .and_then(|d| map.cell_at((row as isize + d) as usize, col))
                .and_then(|cell| cell_ref(table, cell))
                .is_some_and(|cell| cell.header);
            cells.push(TableCell::empty(header));
            col += 1;
        }
    }

    table.rows.insert(row, crate::model::TableRow { cells });
}

/// Delete row `row`, shortening or moving cells that span through it.
pub fn remove_row(table: &mut Table, row: usize) {
    let map = TableMap::new(table);
    if row >= map.height {
        return;
    }

    let mut seen = HashSet::new();
    let mut moved: Vec<(usize, TableCell)> = Vec::new();
    for col in 0..map.width {
        let Some(cell) = map.cell_at(row, col) else {
            continue;
        };
        if !seen.insert(cell) {
            continue;
        }
        let rect = map.rect(cell);
        if rect.top < row {
            if let Some(c) = cell_mut(table, cell) {
                c.rowspan -= 1;
            }
        } else if rect.bottom > row + 1 {
            if let Some(c) = cell_ref(table, cell) {
                let mut copy = c.clone();
                copy.rowspan -= 1;
                moved.push((rect.left, copy));
            }
        }
    }

    table.rows.remove(row);

    if !moved.is_empty() {
        if let Some(below) = table.rows.get_mut(row) {
            let existing = std::mem::take(&mut below.cells);
            let mut placed: Vec<(usize, TableCell)> = existing
                .into_iter()
                .enumerate()
                .map(|(index, cell)| (map.rect(CellRef { row: row + 1, index }).left, cell))
                .collect();
            placed.extend(moved);
            placed.sort_by_key(|(left, _)| *left);
            below.cells = placed.into_iter().map(|(_, cell)| cell).collect();
        }
    }
}

/// Insert an empty column so that it becomes column `col`.
pub fn add_column(table: &mut Table, col: usize) {
    let map = TableMap::new(table);
    let col = col.min(map.width);

    let mut ref_col: Option<isize> = Some(if col > 0 { -1 } else { 0 });
    let probe = (col as isize + ref_col.unwrap_or(0)) as usize;
    if map.column_is_header(table, probe) {
        ref_col = if col == 0 || col == map.width {
            None
        } else {
            Some(0)
        };
    }

    let mut inserts = Vec::new();
    let mut row = 0;
    while row < map.height {
        let here = map.cell_at(row, col);
        let left = if col > 0 { map.cell_at(row, col - 1) } else { None };
        if col > 0 && col < map.width && here.is_some() && here == left {
            let Some(spanning) = here else { break };
            let rect = map.rect(spanning);
            if let Some(cell) = cell_mut(table, spanning) {
                cell.colspan += 1;
            }
            row = rect.bottom;
        } else {
            let header = ref_col
                .and_then(|d| map.cell_at(row, (col as isize + d) as usize))
                .and_then(|cell| cell_ref(table, cell))
                .is_some_and(|cell| cell.header);
            inserts.push((row, map.insert_index(row, col), TableCell::empty(header)));
            row += 1;
        }
    }

    for (row, index, cell) in inserts {
        if let Some(r) = table.rows.get_mut(row) {
            let index = index.min(r.cells.len());
            r.cells.insert(index, cell);
        }
    }
}

/// Delete column `col`, narrowing cells that span through it.
pub fn remove_column(table: &mut Table, col: usize) {
    let map = TableMap::new(table);
    if col >= map.width {
        return;
    }

    let mut seen = HashSet::new();
    let mut removals = Vec::new();
    for row in 0..map.height {
        let Some(cell) = map.cell_at(row, col) else {
            continue;
        };
        if !seen.insert(cell) {
            continue;
        }
        if let Some(c) = cell_mut(table, cell) {
            if c.colspan > 1 {
                c.colspan -= 1;
            } else {
                removals.push(cell);
            }
        }
    }
    remove_cells(table, removals);
}

/// Merge every cell in `rect` into its top-left cell.
///
/// Fails when the rect holds fewer than two cells or a cell sticks out of it.
pub fn merge_cells(table: &mut Table, rect: Rect) -> bool {
    let map = TableMap::new(table);
    let cells = map.cells_in_rect(rect);
    if cells.len() < 2 || cells.iter().any(|c| !rect.contains(&map.rect(*c))) {
        return false;
    }
    let Some(&target) = cells.first() else {
        return false;
    };

    let mut content = Vec::new();
    for cell in &cells {
        if let Some(c) = cell_ref(table, *cell) {
            if !c.is_blank() {
                content.extend(c.blocks.iter().cloned());
            }
        }
    }
    if content.is_empty() {
        content.push(Block::empty_paragraph());
    }

    if let Some(c) = cell_mut(table, target) {
        c.colspan = rect.right - rect.left;
        c.rowspan = rect.bottom - rect.top;
        c.blocks = content;
    }
    remove_cells(table, cells[1..].to_vec());
    true
}

/// Split a spanning cell back into single cells. The original keeps its content.
pub fn split_cell(table: &mut Table, cell: CellRef) -> bool {
    let map = TableMap::new(table);
    let rect = map.rect(cell);
    let Some(original) = cell_mut(table, cell) else {
        return false;
    };
    if original.colspan <= 1 && original.rowspan <= 1 {
        return false;
    }
    original.colspan = 1;
    original.rowspan = 1;
    let header = original.header;
    let width = rect.right - rect.left;

    for row in rect.top..rect.bottom {
        let (index, count) = if row == rect.top {
            (cell.index + 1, width - 1)
        } else {
            (map.insert_index(row, rect.left), width)
        };
        if let Some(r) = table.rows.get_mut(row) {
            let index = index.min(r.cells.len());
            for _ in 0..count {
                r.cells.insert(index, TableCell::empty(header));
            }
        }
    }
    true
}

/// Whether every cell in `rect` is a header cell.
pub fn all_headers(table: &Table, rect: Rect) -> bool {
    let map = TableMap::new(table);
    let cells = map.cells_in_rect(rect);
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| cell_ref(table, *c).is_some_and(|cell| cell.header))
}

pub fn set_header(table: &mut Table, rect: Rect, header: bool) {
    let map = TableMap::new(table);
    for cell in map.cells_in_rect(rect) {
        if let Some(c) = cell_mut(table, cell) {
            c.header = header;
        }
    }
}

pub fn set_align(table: &mut Table, rect: Rect, align: Align) {
    let map = TableMap::new(table);
    for cell in map.cells_in_rect(rect) {
        if let Some(c) = cell_mut(table, cell) {
            c.align = Some(align);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{from_html, to_html};
    use crate::model::{Document, TextBlock};

    fn grid_shape(table: &Table) -> Vec<usize> {
        table.rows.iter().map(|r| r.cells.len()).collect()
    }

    fn table_from(html: &str) -> Table {
        match from_html(html).blocks.into_iter().next() {
            Some(Block::Table(table)) => table,
            other => panic!("expected table, got {other:?}"),
        }
    }

    fn render(table: &Table) -> String {
        to_html(&Document::new(vec![Block::Table(table.clone())]))
    }

    #[test]
    fn test_map_with_spans() {
        let table = table_from(
            "<table><tr><td rowspan=\"2\">a</td><td>b</td></tr><tr><td>c</td></tr></table>",
        );
        let map = TableMap::new(&table);
        assert_eq!((map.width, map.height), (2, 2));
        assert_eq!(map.cell_at(1, 0), Some(CellRef { row: 0, index: 0 }));
        assert_eq!(map.cell_at(1, 1), Some(CellRef { row: 1, index: 0 }));
        assert_eq!(map.rect(CellRef { row: 1, index: 0 }), Rect::new(1, 1, 2, 2));
    }

    #[test]
    fn test_delete_column_in_three_by_three() {
        let mut table = Table::new(3, 3, false);
        remove_column(&mut table, 1);
        assert_eq!(grid_shape(&table), vec![2, 2, 2]);
        let map = TableMap::new(&table);
        assert_eq!((map.width, map.height), (2, 3));
    }

    #[test]
    fn test_add_row_copies_header_only_next_to_header_row() {
        let mut table = Table::new(2, 2, true);
        add_row(&mut table, 1);
        assert!(table.rows[1].cells.iter().all(|c| !c.header));
        add_row(&mut table, 0);
        assert!(table.rows[0].cells.iter().all(|c| !c.header));
        assert!(table.rows[1].cells.iter().all(|c| c.header));
    }

    #[test]
    fn test_add_row_inside_rowspan_extends_it() {
        let mut table = table_from(
            "<table><tr><td rowspan=\"2\">a</td><td>b</td></tr><tr><td>c</td></tr></table>",
        );
        add_row(&mut table, 1);
        assert_eq!(table.rows[0].cells[0].rowspan, 3);
        assert_eq!(grid_shape(&table), vec![2, 1, 1]);
    }

    #[test]
    fn test_add_column_inside_colspan_extends_it() {
        let mut table = table_from(
            "<table><tr><td colspan=\"2\">wide</td></tr><tr><td>a</td><td>b</td></tr></table>",
        );
        add_column(&mut table, 1);
        assert_eq!(table.rows[0].cells[0].colspan, 3);
        assert_eq!(grid_shape(&table), vec![1, 3]);
        let map = TableMap::new(&table);
        assert_eq!(map.width, 3);
    }

    #[test]
    fn test_add_column_at_end_and_start() {
        let mut table = Table::new(2, 2, true);
        add_column(&mut table, 2);
        assert_eq!(grid_shape(&table), vec![3, 3]);
        assert!(table.rows[0].cells[2].header);
        assert!(!table.rows[1].cells[2].header);
        add_column(&mut table, 0);
        assert_eq!(grid_shape(&table), vec![4, 4]);
    }

    #[test]
    fn test_remove_row_moves_spanning_cell_down() {
        let mut table = table_from(
            "<table><tr><td rowspan=\"2\">a</td><td>b</td></tr><tr><td>c</td></tr></table>",
        );
        remove_row(&mut table, 0);
        insta::assert_snapshot!(render(&table), @"<table><tbody><tr><td><p>a</p></td><td><p>c</p></td></tr></tbody></table>");
    }

    #[test]
    fn test_remove_row_shrinks_span_from_above() {
        let mut table = table_from(
            "<table><tr><td rowspan=\"3\">a</td><td>b</td></tr><tr><td>c</td></tr><tr><td>d</td></tr></table>",
        );
        remove_row(&mut table, 1);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        assert_eq!(grid_shape(&table), vec![2, 1]);
    }

    #[test]
    fn test_merge_and_split() {
        let mut table = Table::new(2, 2, false);
        if let Some(Block::Paragraph(p)) = table.rows[1].cells[1].blocks.first_mut() {
            *p = TextBlock::plain("keep");
        }
        assert!(merge_cells(&mut table, Rect::new(0, 0, 2, 2)));
        assert_eq!(grid_shape(&table), vec![1, 0]);
        assert_eq!(table.rows[0].cells[0].colspan, 2);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        insta::assert_snapshot!(render(&table), @r#"<table><tbody><tr><td colspan="2" rowspan="2"><p>keep</p></td></tr><tr></tr></tbody></table>"#);

        assert!(split_cell(&mut table, CellRef { row: 0, index: 0 }));
        assert_eq!(grid_shape(&table), vec![2, 2]);
        let map = TableMap::new(&table);
        assert_eq!((map.width, map.height), (2, 2));
    }

    #[test]
    fn test_merge_rejects_partial_overlap() {
        let mut table = table_from(
            "<table><tr><td colspan=\"2\">a</td></tr><tr><td>b</td><td>c</td></tr></table>",
        );
        assert!(!merge_cells(&mut table, Rect::new(0, 0, 2, 1)));
        let map = TableMap::new(&table);
        assert_eq!(map.expand(Rect::new(0, 0, 2, 1)), Rect::new(0, 0, 2, 2));
    }

    #[test]
    fn test_split_single_cell_is_noop() {
        let mut table = Table::new(1, 1, false);
        assert!(!split_cell(&mut table, CellRef { row: 0, index: 0 }));
    }

    #[test]
    fn test_header_toggles() {
        let mut table = Table::new(2, 2, false);
        let first_row = Rect::new(0, 0, 1, 2);
        assert!(!all_headers(&table, first_row));
        set_header(&mut table, first_row, true);
        assert!(all_headers(&table, first_row));
        assert!(!all_headers(&table, Rect::new(0, 0, 2, 1)));
    }

    #[test]
    fn test_normalize_fixes_overlapping_spans() {
        let mut table = Table::new(2, 2, false);
        table.rows[0].cells[0].rowspan = 5;
        table.rows[0].cells[1].colspan = 0;
        normalize_table(&mut table);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        assert_eq!(table.rows[0].cells[1].colspan, 1);
        let map = TableMap::new(&table);
        assert_eq!(map.width, 3);
        assert!((0..map.height).all(|r| (0..map.width).all(|c| map.cell_at(r, c).is_some())));
    }
}
