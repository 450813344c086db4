//! Abstract word-processing document tree consumed by the layout engine

use crate::constants::*;
use crate::style::{
    BorderSide, CellBorders, CharacterFormat, Color, ParagraphFormat, StyleSheet,
    VerticalAlignment,
};
use std::sync::Arc;

/// Paper sizes understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// Portrait (width, height) in points
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            Self::A4 => (A4_WIDTH, A4_HEIGHT),
            Self::A3 => (A3_WIDTH, A3_HEIGHT),
            Self::Letter => (LETTER_WIDTH, LETTER_HEIGHT),
            Self::Legal => (LETTER_WIDTH, LEGAL_HEIGHT),
            Self::Custom { width, height } => (width, height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Compare with a tolerance so twip rounding does not force new sections
    pub fn approx_eq(&self, other: &Margins) -> bool {
        (self.top - other.top).abs() < LAYOUT_EPSILON
            && (self.right - other.right).abs() < LAYOUT_EPSILON
            && (self.bottom - other.bottom).abs() < LAYOUT_EPSILON
            && (self.left - other.left).abs() < LAYOUT_EPSILON
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(
            DEFAULT_MARGIN_TOP,
            DEFAULT_MARGIN_RIGHT,
            DEFAULT_MARGIN_BOTTOM,
            DEFAULT_MARGIN_LEFT,
        )
    }
}

/// Page geometry shared by all pages of a section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub size: PageSize,
    pub orientation: Orientation,
    pub margins: Margins,
    /// Distance from the top edge to the header band
    pub header_distance: f32,
    /// Distance from the bottom edge to the footer band
    pub footer_distance: f32,
}

impl PageSetup {
    /// Physical (width, height) after applying orientation
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (w, h) = self.size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn usable_width(&self) -> f32 {
        self.page_dimensions().0 - self.margins.left - self.margins.right
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            header_distance: DEFAULT_HEADER_FOOTER_DISTANCE,
            footer_distance: DEFAULT_HEADER_FOOTER_DISTANCE,
        }
    }
}

/// A word-processing document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub styles: StyleSheet,
    pub page_setup: PageSetup,
    pub headers_footers: HeadersFooters,
    pub bookmarks: Vec<Bookmark>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }

    pub fn with_styles(mut self, styles: StyleSheet) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_page_setup(mut self, page_setup: PageSetup) -> Self {
        self.page_setup = page_setup;
        self
    }

    pub fn with_bookmark(mut self, bookmark: Bookmark) -> Self {
        self.bookmarks.push(bookmark);
        self
    }

    /// Whether laying out the body needs results of a completed pass
    /// (total page count or heading page numbers)
    pub fn needs_second_pass(&self) -> bool {
        blocks_need_second_pass(&self.blocks)
    }
}

fn blocks_need_second_pass(blocks: &[Block]) -> bool {
    blocks.iter().any(|block| match block {
        Block::TableOfContents(_) => true,
        Block::Paragraph(p) => p
            .runs
            .iter()
            .any(|run| matches!(run, Run::Field(f) if f.kind == FieldKind::PageCount)),
        Block::Table(t) => t
            .rows
            .iter()
            .flat_map(|row| &row.cells)
            .any(|cell| blocks_need_second_pass(&cell.blocks)),
        Block::PageBreak => false,
    })
}

/// Content block of a document body, cell or header/footer band
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    PageBreak,
    TableOfContents(TableOfContents),
}

impl From<Paragraph> for Block {
    fn from(paragraph: Paragraph) -> Self {
        Self::Paragraph(paragraph)
    }
}

impl From<Table> for Block {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// A paragraph of runs
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Named style, resolved through the document's style sheet
    pub style: Option<String>,
    pub format: ParagraphFormat,
    /// Formatting of the paragraph mark, inherited by every run
    pub character: CharacterFormat,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A paragraph holding one unformatted text run
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_run(Run::text(text))
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_format(mut self, format: ParagraphFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_character(mut self, character: CharacterFormat) -> Self {
        self.character = character;
        self
    }

    /// Concatenated text of the text runs
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| match run {
                Run::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Character count used by table width estimation
    pub fn char_count(&self) -> usize {
        self.runs
            .iter()
            .map(|run| match run {
                Run::Text(t) => t.text.chars().count(),
                _ => 0,
            })
            .sum()
    }
}

/// Inline content of a paragraph
#[derive(Debug, Clone)]
pub enum Run {
    Text(TextRun),
    Image(ImageRun),
    Field(FieldRun),
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            format: CharacterFormat::default(),
        })
    }

    pub fn styled(text: impl Into<String>, format: CharacterFormat) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            format,
        })
    }

    pub fn field(kind: FieldKind) -> Self {
        Self::Field(FieldRun {
            kind,
            format: CharacterFormat::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub format: CharacterFormat,
}

/// Inline image with an optional declared display size in points
#[derive(Debug, Clone)]
pub struct ImageRun {
    pub data: Arc<[u8]>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl ImageRun {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Number of the page the field lands on
    PageNumber,
    /// Total number of pages
    PageCount,
    /// Number string of the named bookmark
    Reference(String),
}

#[derive(Debug, Clone)]
pub struct FieldRun {
    pub kind: FieldKind,
    pub format: CharacterFormat,
}

/// Vertical merge marker of a table cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalMerge {
    #[default]
    None,
    Restart,
    Continue,
}

/// A table of rows; cells may span grid columns and merge vertically
#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Vec<TableRow>,
    /// Explicit column widths in points
    pub column_grid: Option<Vec<f32>>,
    /// Border drawn on every cell side unless the cell overrides it
    pub border: BorderSide,
    /// Leading rows repeated at the top of continuation pages
    pub header_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, row: TableRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_column_grid(mut self, widths: Vec<f32>) -> Self {
        self.column_grid = Some(widths);
        self
    }

    pub fn with_border(mut self, border: BorderSide) -> Self {
        self.border = border;
        self
    }

    pub fn with_header_rows(mut self, rows: usize) -> Self {
        self.header_rows = rows;
        self
    }

    /// Max over rows of the summed grid spans
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(TableRow::span_sum).max().unwrap_or(0)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            column_grid: None,
            border: BorderSide::thin(),
            header_rows: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Minimum row height in points
    pub height: Option<f32>,
}

impl TableRow {
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            height: None,
        }
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn span_sum(&self) -> usize {
        self.cells.iter().map(|c| c.grid_span.max(1)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct TableCell {
    pub blocks: Vec<Block>,
    pub grid_span: usize,
    pub v_merge: VerticalMerge,
    pub shading: Option<Color>,
    /// Replaces the table border on this cell
    pub borders: Option<CellBorders>,
    /// Defaults to middle
    pub vertical_alignment: Option<VerticalAlignment>,
}

impl TableCell {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            grid_span: 1,
            v_merge: VerticalMerge::None,
            shading: None,
            borders: None,
            vertical_alignment: None,
        }
    }

    /// A cell holding a single text paragraph
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Paragraph::text(text).into()])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_span(mut self, span: usize) -> Self {
        self.grid_span = span.max(1);
        self
    }

    pub fn with_merge(mut self, merge: VerticalMerge) -> Self {
        self.v_merge = merge;
        self
    }

    pub fn with_shading(mut self, color: Color) -> Self {
        self.shading = Some(color);
        self
    }

    pub fn with_borders(mut self, borders: CellBorders) -> Self {
        self.borders = Some(borders);
        self
    }

    pub fn with_vertical_alignment(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical_alignment = Some(alignment);
        self
    }

    /// Character count of the cell's direct paragraphs
    pub fn char_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Paragraph(p) => p.char_count(),
                _ => 0,
            })
            .sum()
    }
}

/// A heading target listed by a table of contents.
///
/// The two consumption flags are independent: one heading occurrence may
/// claim a bookmark for its page geometry while a later occurrence with the
/// same title claims it for numbering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bookmark {
    pub name: String,
    pub title: String,
    /// Hierarchical number such as "2.1"
    pub number: String,
    pub level: u8,
    pub orientation: Option<Orientation>,
    pub margins: Option<Margins>,
    pub order: usize,
    pub used_for_page_settings: bool,
    pub used_for_paragraph: bool,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, title: impl Into<String>, order: usize) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            order,
            ..Default::default()
        }
    }

    pub fn with_number(mut self, number: impl Into<String>, level: u8) -> Self {
        self.number = number.into();
        self.level = level;
        self
    }

    pub fn with_geometry(mut self, orientation: Orientation, margins: Option<Margins>) -> Self {
        self.orientation = Some(orientation);
        self.margins = margins;
        self
    }
}

/// A table of contents listing bookmarks up to a level
#[derive(Debug, Clone, PartialEq)]
pub struct TableOfContents {
    pub max_level: u8,
    /// Indentation per level in points
    pub indent: f32,
}

impl Default for TableOfContents {
    fn default() -> Self {
        Self {
            max_level: 3,
            indent: 12.0,
        }
    }
}

/// Header and footer bands of a document
#[derive(Debug, Clone, Default)]
pub struct HeadersFooters {
    pub default_header: Vec<Block>,
    pub default_footer: Vec<Block>,
    /// Used on the first page of the first section when present
    pub first_page_header: Option<Vec<Block>>,
    pub first_page_footer: Option<Vec<Block>>,
}

impl HeadersFooters {
    pub fn header_for(&self, first_page: bool) -> &[Block] {
        match (&self.first_page_header, first_page) {
            (Some(blocks), true) => blocks,
            _ => &self.default_header,
        }
    }

    pub fn footer_for(&self, first_page: bool) -> &[Block] {
        match (&self.first_page_footer, first_page) {
            (Some(blocks), true) => blocks,
            _ => &self.default_footer,
        }
    }
}
