//! Abstract spreadsheet tree consumed by the sheet writer

use crate::constants::*;
use crate::model::{Orientation, PageSize};
use crate::style::{CellBorders, Color, TextStyle, VerticalAlignment};
use std::collections::HashMap;
use tracing::warn;

/// A workbook of sheets
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub width: f32,
    pub hidden: bool,
}

impl ColumnSpec {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Print settings of a sheet; margins and distances are in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintSetup {
    pub paper: PageSize,
    pub orientation: Orientation,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
    pub header: f32,
    pub footer: f32,
}

impl Default for PrintSetup {
    fn default() -> Self {
        // Excel's "Normal" margins
        Self {
            paper: PageSize::A4,
            orientation: Orientation::Portrait,
            top: 0.75,
            right: 0.7,
            bottom: 0.75,
            left: 0.7,
            header: 0.3,
            footer: 0.3,
        }
    }
}

/// Left, center and right sections of a sheet header or footer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFooterText {
    pub left: Option<String>,
    pub center: Option<String>,
    pub right: Option<String>,
}

impl HeaderFooterText {
    pub fn is_empty(&self) -> bool {
        [&self.left, &self.center, &self.right]
            .iter()
            .all(|part| part.as_deref().is_none_or(str::is_empty))
    }
}

/// Inclusive rectangular cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl CellRange {
    pub fn new(first_row: usize, last_row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            first_row: first_row.min(last_row),
            last_row: first_row.max(last_row),
            first_col: first_col.min(last_col),
            last_col: first_col.max(last_col),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn is_origin(&self, row: usize, col: usize) -> bool {
        row == self.first_row && col == self.first_col
    }

    pub fn column_span(&self) -> usize {
        self.last_col - self.first_col + 1
    }
}

/// A worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub default_column_width: f32,
    /// Rows by index; `None` rows take the default height
    pub rows: Vec<Option<SheetRow>>,
    pub default_row_height: f32,
    pub merged: Vec<CellRange>,
    pub print: PrintSetup,
    pub header: HeaderFooterText,
    pub footer: HeaderFooterText,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            default_column_width: DEFAULT_COLUMN_WIDTH,
            rows: Vec::new(),
            default_row_height: DEFAULT_ROW_HEIGHT,
            merged: Vec::new(),
            print: PrintSetup::default(),
            header: HeaderFooterText::default(),
            footer: HeaderFooterText::default(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_row(mut self, row: SheetRow) -> Self {
        self.rows.push(Some(row));
        self
    }

    pub fn with_missing_row(mut self) -> Self {
        self.rows.push(None);
        self
    }

    pub fn with_merge(mut self, range: CellRange) -> Self {
        self.merged.push(range);
        self
    }

    pub fn with_print(mut self, print: PrintSetup) -> Self {
        self.print = print;
        self
    }

    /// Width of a column; hidden columns are zero wide
    pub fn column_width(&self, col: usize) -> f32 {
        match self.columns.get(col) {
            Some(spec) if spec.hidden => 0.0,
            Some(spec) => spec.width,
            None => self.default_column_width,
        }
    }

    /// Max cell count over all rows
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .map(|row| row.cells.len())
            .max()
            .unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&SheetCell> {
        self.rows
            .get(row)?
            .as_ref()?
            .cells
            .get(col)?
            .as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct SheetRow {
    pub height: f32,
    pub hidden: bool,
    pub cells: Vec<Option<SheetCell>>,
}

impl SheetRow {
    pub fn new(height: f32, cells: Vec<Option<SheetCell>>) -> Self {
        Self {
            height,
            hidden: false,
            cells,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn cell(&self, col: usize) -> Option<&SheetCell> {
        self.cells.get(col)?.as_ref()
    }
}

/// Cached value of a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Text(String),
    /// Numeric value with its formatted display text
    Number { value: f64, display: String },
    Bool(bool),
    Error(String),
}

impl CellValue {
    pub fn display_text(&self) -> &str {
        match self {
            Self::Blank => "",
            Self::Text(text) | Self::Error(text) => text,
            Self::Number { display, .. } => display,
            Self::Bool(true) => "TRUE",
            Self::Bool(false) => "FALSE",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number { .. })
    }
}

/// Horizontal alignment of a sheet cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    /// Text left, numbers right
    #[default]
    General,
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub borders: CellBorders,
    pub fill: Option<Color>,
    pub font: TextStyle,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            horizontal: HorizontalAlignment::General,
            vertical: VerticalAlignment::Bottom,
            wrap_text: false,
            borders: CellBorders::none(),
            fill: None,
            font: TextStyle::new("Calibri", 11.0),
        }
    }
}

/// Font applied to a character range of a cell's text
#[derive(Debug, Clone, PartialEq)]
pub struct RichRun {
    /// Start offset in chars
    pub start: usize,
    /// Length in chars
    pub len: usize,
    pub font: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetCell {
    pub value: CellValue,
    pub format: CellFormat,
    pub rich_runs: Vec<RichRun>,
}

impl SheetCell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            format: CellFormat::default(),
            rich_runs: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(CellValue::Text(text.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::new(CellValue::Number {
            value,
            display: value.to_string(),
        })
    }

    pub fn with_format(mut self, format: CellFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_rich_runs(mut self, runs: Vec<RichRun>) -> Self {
        self.rich_runs = runs;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.display_text().is_empty()
    }

    /// Split the display text into (text, font) pieces following the rich runs.
    ///
    /// Text not covered by a run uses the cell font. Runs that overlap or
    /// reach past the text are clipped and logged.
    pub fn styled_pieces(&self) -> Vec<(String, TextStyle)> {
        let chars: Vec<char> = self.value.display_text().chars().collect();
        if self.rich_runs.is_empty() {
            return vec![(chars.iter().collect(), self.format.font.clone())];
        }

        let mut runs: Vec<&RichRun> = self.rich_runs.iter().collect();
        runs.sort_by_key(|run| run.start);

        let mut pieces = Vec::new();
        let mut pos = 0;
        for run in runs {
            let start = run.start.max(pos).min(chars.len());
            let end = (run.start + run.len).min(chars.len());
            if run.start + run.len > chars.len() || run.start < pos {
                warn!(
                    start = run.start,
                    len = run.len,
                    text_len = chars.len(),
                    "Rich text run out of range, clipping"
                );
            }
            if start > pos {
                pieces.push((chars[pos..start].iter().collect(), self.format.font.clone()));
            }
            if end > start {
                pieces.push((chars[start..end].iter().collect(), run.font.clone()));
                pos = end;
            }
        }
        if pos < chars.len() {
            pieces.push((chars[pos..].iter().collect(), self.format.font.clone()));
        }
        pieces
    }
}

/// A merged range with its sheet and a stable index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergedRegion {
    pub sheet_id: usize,
    pub range: CellRange,
    pub index: usize,
}

/// Coordinate index over every merged region of a workbook
#[derive(Debug, Clone, Default)]
pub struct MergedCells {
    regions: Vec<MergedRegion>,
    by_cell: HashMap<(usize, usize, usize), usize>,
}

impl MergedCells {
    pub fn from_workbook(workbook: &Workbook) -> Self {
        let mut merged = Self::default();
        for (sheet_id, sheet) in workbook.sheets.iter().enumerate() {
            merged.add_sheet(sheet_id, sheet);
        }
        merged
    }

    fn add_sheet(&mut self, sheet_id: usize, sheet: &Sheet) {
        for range in &sheet.merged {
            let region = MergedRegion {
                sheet_id,
                range: *range,
                index: self.regions.len(),
            };
            for row in range.first_row..=range.last_row {
                for col in range.first_col..=range.last_col {
                    if let Some(existing) = self.by_cell.insert((sheet_id, row, col), region.index)
                    {
                        warn!(
                            sheet_id,
                            row,
                            col,
                            existing,
                            "Overlapping merged regions, keeping the later one"
                        );
                    }
                }
            }
            self.regions.push(region);
        }
    }

    pub fn region(&self, sheet_id: usize, row: usize, col: usize) -> Option<&MergedRegion> {
        self.by_cell
            .get(&(sheet_id, row, col))
            .and_then(|&index| self.regions.get(index))
    }

    pub fn is_merged(&self, sheet_id: usize, row: usize, col: usize) -> bool {
        self.by_cell.contains_key(&(sheet_id, row, col))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
