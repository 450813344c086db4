//! Table grid resolution: column count, column widths, merges and row heights

use crate::Result;
use crate::constants::*;
use crate::error::LayoutError;
use crate::model::{Table, TableCell, VerticalMerge};
use crate::sink::Rect;
use crate::style::Padding;
use std::ops::Range;
use tracing::{debug, trace, warn};

/// Character-count width estimate used when a table has no explicit grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthHeuristic {
    pub char_to_pt: f32,
    pub min_width: f32,
    pub max_width: f32,
}

impl WidthHeuristic {
    /// Tables placed directly in a section or band
    pub fn top_level() -> Self {
        Self {
            char_to_pt: TABLE_CHAR_TO_PT,
            min_width: TABLE_MIN_COLUMN_WIDTH,
            max_width: TABLE_MAX_COLUMN_WIDTH,
        }
    }

    /// Tables placed inside another table's cell
    pub fn nested() -> Self {
        Self {
            char_to_pt: NESTED_TABLE_CHAR_TO_PT,
            min_width: NESTED_TABLE_MIN_COLUMN_WIDTH,
            max_width: TABLE_MAX_COLUMN_WIDTH,
        }
    }

    fn estimate(&self, chars: f32) -> f32 {
        (chars * self.char_to_pt).clamp(self.min_width, self.max_width)
    }
}

/// Occupancy of one grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSlot {
    /// Top-left position of a cell; `cell_index` indexes the row's cells
    Origin {
        cell_index: usize,
        row_span: usize,
        col_span: usize,
    },
    /// Position drawn by the origin at the given coordinate
    Covered { origin_row: usize, origin_col: usize },
    /// Position no cell of the row reaches
    Vacant,
}

/// Resolved geometry of a table, relative to its top-left corner
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
    slots: Vec<Vec<GridSlot>>,
}

/// An origin cell with its grid coordinate and extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub cell_index: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl TableGrid {
    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    pub fn width(&self) -> f32 {
        self.column_widths.iter().sum()
    }

    pub fn height(&self) -> f32 {
        self.row_heights.iter().sum()
    }

    pub fn slot(&self, row: usize, col: usize) -> Result<GridSlot> {
        self.slots
            .get(row)
            .and_then(|slots| slots.get(col))
            .copied()
            .ok_or(LayoutError::CellNotFound { row, column: col })
    }

    pub fn column_x(&self, col: usize) -> f32 {
        self.column_widths.iter().take(col).sum()
    }

    pub fn row_y(&self, row: usize) -> f32 {
        self.row_heights.iter().take(row).sum()
    }

    fn span_rect(&self, row: usize, col: usize, row_span: usize, col_span: usize) -> Rect {
        let width = self.column_widths.iter().skip(col).take(col_span).sum();
        let height = self.row_heights.iter().skip(row).take(row_span).sum();
        Rect::new(self.column_x(col), self.row_y(row), width, height)
    }

    /// Rect of the region owning a coordinate; covered positions resolve to
    /// their origin's full region
    pub fn cell_rect(&self, row: usize, col: usize) -> Result<Rect> {
        match self.slot(row, col)? {
            GridSlot::Origin {
                row_span, col_span, ..
            } => Ok(self.span_rect(row, col, row_span, col_span)),
            GridSlot::Covered {
                origin_row,
                origin_col,
            } => self.cell_rect(origin_row, origin_col),
            GridSlot::Vacant => Ok(self.span_rect(row, col, 1, 1)),
        }
    }

    /// Origin cells in row-major order
    pub fn origins(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.slots.iter().enumerate().flat_map(|(row, slots)| {
            slots.iter().enumerate().filter_map(move |(col, slot)| match *slot {
                GridSlot::Origin {
                    cell_index,
                    row_span,
                    col_span,
                } => Some(GridCell {
                    row,
                    col,
                    cell_index,
                    row_span,
                    col_span,
                }),
                _ => None,
            })
        })
    }

    /// Contiguous row ranges joined by vertical merges; a range must not be
    /// split across pages
    pub fn row_groups(&self) -> Vec<Range<usize>> {
        let mut reach: Vec<usize> = (0..self.row_count()).map(|r| r + 1).collect();
        for cell in self.origins() {
            reach[cell.row] = reach[cell.row].max(cell.row + cell.row_span);
        }

        let mut groups = Vec::new();
        let mut start = 0;
        let mut end = 0;
        for (row, &row_reach) in reach.iter().enumerate() {
            if row >= end && row > start {
                groups.push(start..end);
                start = row;
            }
            end = end.max(row_reach).min(self.row_count());
        }
        if start < self.row_count() {
            groups.push(start..end.max(start + 1));
        }
        groups
    }
}

/// Resolve column widths of a table.
///
/// An explicit grid is used as declared (padded with the heuristic minimum
/// when short) and may exceed `available_width`. Derived widths always sum
/// to `available_width`.
pub fn resolve_column_widths(
    table: &Table,
    available_width: f32,
    heuristic: &WidthHeuristic,
) -> Result<Vec<f32>> {
    let count = table.column_count();
    if count == 0 {
        return Err(LayoutError::ZeroColumns {
            context: format!("table with {} rows", table.rows.len()),
        });
    }

    if let Some(grid) = &table.column_grid {
        let mut widths: Vec<f32> = grid.iter().take(count).copied().collect();
        widths.resize(count, heuristic.min_width);
        trace!("Using declared column grid {:?}", widths);
        return Ok(widths);
    }

    let mut lengths = vec![0.0f32; count];
    for row in &table.rows {
        let mut col = 0;
        for cell in &row.cells {
            let span = cell.grid_span.max(1);
            let share = cell.char_count() as f32 / span as f32;
            for length in lengths.iter_mut().skip(col).take(span) {
                *length = length.max(share);
            }
            col += span;
        }
    }

    let mut widths: Vec<f32> = lengths.iter().map(|&l| heuristic.estimate(l)).collect();
    let total: f32 = widths.iter().sum();
    let total_length: f32 = lengths.iter().sum();

    if total < available_width {
        let surplus = available_width - total;
        for (width, length) in widths.iter_mut().zip(&lengths) {
            *width += if total_length > 0.0 {
                surplus * length / total_length
            } else {
                surplus / count as f32
            };
        }
    } else if total > available_width && total > 0.0 {
        let factor = available_width / total;
        widths.iter_mut().for_each(|w| *w *= factor);
    }

    trace!("Derived column widths {:?} from lengths {:?}", widths, lengths);
    Ok(widths)
}

/// Build the occupancy map from grid spans and vertical merge markers
pub fn resolve_merges(table: &Table, column_count: usize) -> Vec<Vec<GridSlot>> {
    let mut slots = vec![vec![GridSlot::Vacant; column_count]; table.rows.len()];
    // origin coordinate of the merge region open in each start column
    let mut open: Vec<Option<(usize, usize)>> = vec![None; column_count];

    for (row_index, row) in table.rows.iter().enumerate() {
        let mut reached = vec![false; column_count];
        let mut col = 0;

        for (cell_index, cell) in row.cells.iter().enumerate() {
            if col >= column_count {
                break;
            }
            let span = cell.grid_span.max(1).min(column_count - col);
            for flag in reached.iter_mut().skip(col).take(span) {
                *flag = true;
            }

            let continued = match (cell.v_merge, open[col]) {
                (VerticalMerge::Continue, Some(origin)) => Some(origin),
                (VerticalMerge::Continue, None) => {
                    warn!(
                        row = row_index,
                        column = col,
                        "Continued merge without a restart, treating the cell as its own origin"
                    );
                    None
                }
                _ => None,
            };

            match continued {
                Some((origin_row, origin_col)) => {
                    if let GridSlot::Origin { row_span, .. } = &mut slots[origin_row][origin_col] {
                        *row_span += 1;
                    }
                    for slot in slots[row_index].iter_mut().skip(col).take(span) {
                        *slot = GridSlot::Covered {
                            origin_row,
                            origin_col,
                        };
                    }
                }
                None => {
                    slots[row_index][col] = GridSlot::Origin {
                        cell_index,
                        row_span: 1,
                        col_span: span,
                    };
                    for slot in slots[row_index].iter_mut().skip(col + 1).take(span - 1) {
                        *slot = GridSlot::Covered {
                            origin_row: row_index,
                            origin_col: col,
                        };
                    }
                    open[col] = match cell.v_merge {
                        VerticalMerge::None => None,
                        VerticalMerge::Restart | VerticalMerge::Continue => Some((row_index, col)),
                    };
                }
            }
            for region in open.iter_mut().skip(col + 1).take(span - 1) {
                *region = None;
            }
            col += span;
        }

        for (region, reached) in open.iter_mut().zip(&reached) {
            if !reached {
                *region = None;
            }
        }
    }
    slots
}

/// Resolve row heights from cell content.
///
/// `measure(cell, content_width)` returns the height of a cell's content
/// laid out at the given width, without padding.
pub fn resolve_row_heights<F>(
    table: &Table,
    column_widths: &[f32],
    slots: &[Vec<GridSlot>],
    padding: &Padding,
    mut measure: F,
) -> Result<Vec<f32>>
where
    F: FnMut(&TableCell, f32) -> Result<f32>,
{
    let span_width = |col: usize, span: usize| -> f32 {
        column_widths.iter().skip(col).take(span).sum::<f32>()
    };

    let mut heights: Vec<f32> = table
        .rows
        .iter()
        .map(|row| row.height.unwrap_or(0.0))
        .collect();
    let mut spanning = Vec::new();

    for (row_index, row_slots) in slots.iter().enumerate() {
        for (col, slot) in row_slots.iter().enumerate() {
            let GridSlot::Origin {
                cell_index,
                row_span,
                col_span,
            } = *slot
            else {
                continue;
            };
            let cell = &table.rows[row_index].cells[cell_index];
            let content_width = (span_width(col, col_span) - padding.horizontal()).max(0.0);
            if row_span > 1 {
                spanning.push((row_index, cell, content_width, row_span));
                continue;
            }
            let needed = measure(cell, content_width)? + padding.vertical();
            heights[row_index] = heights[row_index].max(needed);
        }
    }

    for (row_index, cell, content_width, row_span) in spanning {
        let end = (row_index + row_span).min(heights.len());
        let needed = measure(cell, content_width)? + padding.vertical();
        let available: f32 = heights[row_index..end].iter().sum();
        if needed > available + LAYOUT_EPSILON {
            let extra = (needed - available) / (end - row_index) as f32;
            trace!(
                row = row_index,
                rows = end - row_index,
                extra,
                "Expanding rows under a merged cell"
            );
            heights[row_index..end].iter_mut().for_each(|h| *h += extra);
        }
    }

    Ok(heights)
}

/// Resolve the complete grid of a table
pub fn resolve_grid<F>(
    table: &Table,
    available_width: f32,
    heuristic: &WidthHeuristic,
    padding: &Padding,
    measure: F,
) -> Result<TableGrid>
where
    F: FnMut(&TableCell, f32) -> Result<f32>,
{
    let column_widths = resolve_column_widths(table, available_width, heuristic)?;
    let slots = resolve_merges(table, column_widths.len());
    let row_heights = resolve_row_heights(table, &column_widths, &slots, padding, measure)?;

    let grid = TableGrid {
        column_widths,
        row_heights,
        slots,
    };
    debug!(
        "Resolved table grid {}x{} ({:.1}x{:.1}pt)",
        grid.row_count(),
        grid.column_count(),
        grid.width(),
        grid.height()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableRow;

    fn row(cells: Vec<TableCell>) -> TableRow {
        TableRow::new(cells)
    }

    fn line_measure(cell: &TableCell, _width: f32) -> Result<f32> {
        Ok(if cell.char_count() > 0 { 14.4 } else { 0.0 })
    }

    #[test]
    fn test_column_count_is_max_span_sum() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("a").with_span(3)]))
            .with_row(row(vec![TableCell::text("b"), TableCell::text("c")]))
            .with_row(row(vec![
                TableCell::text("d").with_span(2),
                TableCell::text("e").with_span(2),
            ]));
        assert_eq!(table.column_count(), 4);
        let widths = resolve_column_widths(&table, 500.0, &WidthHeuristic::top_level()).unwrap();
        assert_eq!(widths.len(), 4);
    }

    #[test]
    fn test_zero_columns_is_an_error() {
        let table = Table::new().with_row(row(Vec::new()));
        let err = resolve_column_widths(&table, 500.0, &WidthHeuristic::top_level());
        assert!(matches!(err, Err(LayoutError::ZeroColumns { .. })));
    }

    #[test]
    fn test_derived_widths_fill_available_width() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("Name"), TableCell::text("A much longer description")]))
            .with_row(row(vec![TableCell::text("x"), TableCell::text("y")]));
        let widths = resolve_column_widths(&table, 500.0, &WidthHeuristic::top_level()).unwrap();
        let sum: f32 = widths.iter().sum();
        assert!((sum - 500.0).abs() < LAYOUT_EPSILON);
        assert!(widths[1] > widths[0]);
    }

    #[test]
    fn test_empty_table_widths_split_evenly() {
        let table = Table::new().with_row(row(vec![TableCell::empty(), TableCell::empty()]));
        let widths = resolve_column_widths(&table, 300.0, &WidthHeuristic::top_level()).unwrap();
        assert_eq!(widths, vec![150.0, 150.0]);
    }

    #[test]
    fn test_wide_content_scales_down() {
        let long = "x".repeat(100);
        let table = Table::new().with_row(row(vec![
            TableCell::text(long.clone()),
            TableCell::text(long.clone()),
            TableCell::text(long),
        ]));
        let widths = resolve_column_widths(&table, 400.0, &WidthHeuristic::top_level()).unwrap();
        let sum: f32 = widths.iter().sum();
        assert!((sum - 400.0).abs() < LAYOUT_EPSILON);
        assert!(widths.iter().all(|w| (w - 400.0 / 3.0).abs() < LAYOUT_EPSILON));
    }

    #[test]
    fn test_nested_heuristic_minimum() {
        let table = Table::new().with_row(row(vec![TableCell::text("a"), TableCell::text("b")]));
        let widths = resolve_column_widths(&table, 60.0, &WidthHeuristic::nested()).unwrap();
        // two 42pt minimums scaled into 60pt
        assert!((widths[0] - 30.0).abs() < LAYOUT_EPSILON);
    }

    #[test]
    fn test_explicit_grid_is_kept() {
        let table = Table::new()
            .with_column_grid(vec![400.0, 300.0])
            .with_row(row(vec![
                TableCell::text("a"),
                TableCell::text("b"),
                TableCell::text("c"),
            ]));
        let widths = resolve_column_widths(&table, 500.0, &WidthHeuristic::top_level()).unwrap();
        assert_eq!(widths, vec![400.0, 300.0, TABLE_MIN_COLUMN_WIDTH]);
    }

    #[test]
    fn test_span_scenario() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("A").with_span(2)]))
            .with_row(row(vec![TableCell::text("A"), TableCell::text("B")]));
        let grid = resolve_grid(
            &table,
            400.0,
            &WidthHeuristic::top_level(),
            &Padding::default(),
            line_measure,
        )
        .unwrap();

        assert_eq!(
            grid.slot(0, 0).unwrap(),
            GridSlot::Origin {
                cell_index: 0,
                row_span: 1,
                col_span: 2
            }
        );
        assert_eq!(
            grid.slot(0, 1).unwrap(),
            GridSlot::Covered {
                origin_row: 0,
                origin_col: 0
            }
        );
        assert!(matches!(grid.slot(1, 0).unwrap(), GridSlot::Origin { cell_index: 0, .. }));
        assert!(matches!(grid.slot(1, 1).unwrap(), GridSlot::Origin { cell_index: 1, .. }));
        assert_eq!(grid.cell_rect(0, 1).unwrap().width, 400.0);
    }

    #[test]
    fn test_three_row_merge_expands_rows() {
        let table = Table::new()
            .with_row(row(vec![
                TableCell::text("tall").with_merge(VerticalMerge::Restart),
                TableCell::text("r1"),
            ]))
            .with_row(row(vec![
                TableCell::empty().with_merge(VerticalMerge::Continue),
                TableCell::text("r2"),
            ]))
            .with_row(row(vec![
                TableCell::empty().with_merge(VerticalMerge::Continue),
                TableCell::text("r3"),
            ]));
        let padding = Padding::uniform(0.0);
        let grid = resolve_grid(
            &table,
            400.0,
            &WidthHeuristic::top_level(),
            &padding,
            |cell, _| Ok(if cell.v_merge == VerticalMerge::Restart { 90.0 } else { line_measure(cell, 0.0)? }),
        )
        .unwrap();

        assert!(matches!(grid.slot(0, 0).unwrap(), GridSlot::Origin { row_span: 3, .. }));
        assert!(matches!(grid.slot(1, 0).unwrap(), GridSlot::Covered { origin_row: 0, origin_col: 0 }));
        assert!(matches!(grid.slot(2, 0).unwrap(), GridSlot::Covered { origin_row: 0, origin_col: 0 }));
        // 90pt over three rows of 14.4pt each
        for height in &grid.row_heights {
            assert!((height - 30.0).abs() < 0.001, "{height}");
        }
        assert_eq!(grid.cell_rect(2, 0).unwrap().height, grid.height());
        assert_eq!(grid.row_groups(), vec![0..3]);
    }

    #[test]
    fn test_one_origin_per_region() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("a").with_merge(VerticalMerge::Restart)]))
            .with_row(row(vec![TableCell::empty().with_merge(VerticalMerge::Continue)]))
            .with_row(row(vec![TableCell::text("b")]))
            .with_row(row(vec![TableCell::text("c").with_merge(VerticalMerge::Restart)]))
            .with_row(row(vec![TableCell::empty().with_merge(VerticalMerge::Continue)]));
        let slots = resolve_merges(&table, 1);
        let origins: Vec<_> = slots
            .iter()
            .map(|r| r[0])
            .filter(|s| matches!(s, GridSlot::Origin { .. }))
            .collect();
        assert_eq!(origins.len(), 3);
        assert!(matches!(slots[0][0], GridSlot::Origin { row_span: 2, .. }));
        assert!(matches!(slots[2][0], GridSlot::Origin { row_span: 1, .. }));
        assert!(matches!(slots[3][0], GridSlot::Origin { row_span: 2, .. }));
    }

    #[test]
    fn test_continue_without_restart_is_own_origin() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("x"), TableCell::text("orphan").with_merge(VerticalMerge::Continue)]));
        let slots = resolve_merges(&table, 2);
        assert_eq!(
            slots[0][1],
            GridSlot::Origin {
                cell_index: 1,
                row_span: 1,
                col_span: 1
            }
        );
    }

    #[test]
    fn test_short_row_closes_region() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("a"), TableCell::text("b").with_merge(VerticalMerge::Restart)]))
            .with_row(row(vec![TableCell::text("c")]))
            .with_row(row(vec![TableCell::text("d"), TableCell::empty().with_merge(VerticalMerge::Continue)]));
        let slots = resolve_merges(&table, 2);
        assert_eq!(slots[1][1], GridSlot::Vacant);
        assert!(matches!(slots[0][1], GridSlot::Origin { row_span: 1, .. }));
        assert!(matches!(slots[2][1], GridSlot::Origin { row_span: 1, .. }));
    }

    #[test]
    fn test_row_height_respects_minimum_and_padding() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("a")]).with_height(40.0))
            .with_row(row(vec![TableCell::text("b")]));
        let padding = Padding::symmetric(2.0, 3.0);
        let grid = resolve_grid(&table, 100.0, &WidthHeuristic::top_level(), &padding, |_, width| {
            assert!((width - 94.0).abs() < 0.001);
            Ok(10.0)
        })
        .unwrap();
        assert_eq!(grid.row_heights, vec![40.0, 14.0]);
    }

    #[test]
    fn test_lookup_outside_grid_fails() {
        let table = Table::new().with_row(row(vec![TableCell::text("a")]));
        let grid = resolve_grid(
            &table,
            100.0,
            &WidthHeuristic::top_level(),
            &Padding::default(),
            line_measure,
        )
        .unwrap();
        assert!(matches!(
            grid.slot(4, 0),
            Err(LayoutError::CellNotFound { row: 4, column: 0 })
        ));
        assert!(grid.cell_rect(0, 9).is_err());
    }

    #[test]
    fn test_row_groups_without_merges() {
        let table = Table::new()
            .with_row(row(vec![TableCell::text("a")]))
            .with_row(row(vec![TableCell::text("b")]));
        let slots = resolve_merges(&table, 1);
        let grid = TableGrid {
            column_widths: vec![10.0],
            row_heights: vec![1.0, 1.0],
            slots,
        };
        assert_eq!(grid.row_groups(), vec![0..1, 1..2]);
    }
}
