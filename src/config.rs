//! Conversion options

use crate::Result;
use crate::constants::*;
use crate::error::LayoutError;
use crate::layout::WidthHeuristic;
use crate::style::{Padding, TextStyle};

/// Options shared by document and workbook conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Padding between a table cell's edge and its content
    pub cell_padding: Padding,
    /// Column width estimate for tables in a section or band
    pub table_widths: WidthHeuristic,
    /// Column width estimate for tables inside cells
    pub nested_table_widths: WidthHeuristic,
    /// Display width of images without a declared size
    pub default_image_width: f32,
    /// Style of sheet header and footer text
    pub header_footer_style: TextStyle,
    /// Padding around sheet cell text before print scaling
    pub sheet_text_padding: f32,
    /// Repeat a table's header rows on continuation pages
    pub repeat_table_headers: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            cell_padding: Padding::default(),
            table_widths: WidthHeuristic::top_level(),
            nested_table_widths: WidthHeuristic::nested(),
            default_image_width: DEFAULT_IMAGE_WIDTH,
            header_footer_style: TextStyle::new(DEFAULT_FONT_FAMILY, HEADER_FOOTER_FONT_SIZE),
            sheet_text_padding: SHEET_TEXT_PADDING,
            repeat_table_headers: true,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell_padding(mut self, padding: Padding) -> Self {
        self.cell_padding = padding;
        self
    }

    pub fn with_table_widths(mut self, heuristic: WidthHeuristic) -> Self {
        self.table_widths = heuristic;
        self
    }

    pub fn with_nested_table_widths(mut self, heuristic: WidthHeuristic) -> Self {
        self.nested_table_widths = heuristic;
        self
    }

    pub fn with_default_image_width(mut self, width: f32) -> Self {
        self.default_image_width = width;
        self
    }

    pub fn with_header_footer_style(mut self, style: TextStyle) -> Self {
        self.header_footer_style = style;
        self
    }

    pub fn with_sheet_text_padding(mut self, padding: f32) -> Self {
        self.sheet_text_padding = padding;
        self
    }

    pub fn with_repeat_table_headers(mut self, repeat: bool) -> Self {
        self.repeat_table_headers = repeat;
        self
    }

    /// Reject values no layout can honour
    pub fn validate(&self) -> Result<()> {
        let p = &self.cell_padding;
        if [p.top, p.right, p.bottom, p.left].iter().any(|v| *v < 0.0) {
            return Err(LayoutError::Config("cell padding must not be negative".to_string()));
        }
        for (name, h) in [
            ("table", &self.table_widths),
            ("nested table", &self.nested_table_widths),
        ] {
            if h.char_to_pt <= 0.0 || h.min_width <= 0.0 || h.min_width > h.max_width {
                return Err(LayoutError::Config(format!(
                    "{name} width heuristic {h:?} is not usable"
                )));
            }
        }
        if self.default_image_width <= 0.0 {
            return Err(LayoutError::Config(format!(
                "default image width {} must be positive",
                self.default_image_width
            )));
        }
        if self.header_footer_style.size <= 0.0 {
            return Err(LayoutError::Config("header font size must be positive".to_string()));
        }
        if self.sheet_text_padding < 0.0 {
            return Err(LayoutError::Config("sheet text padding must not be negative".to_string()));
        }
        Ok(())
    }
}
