//! Constants for page geometry, sizing heuristics and common defaults

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Points per centimetre
pub const POINTS_PER_CM: f32 = POINTS_PER_INCH / 2.54;

/// Standard A4 page width in points
pub const A4_WIDTH: f32 = 595.28;

/// Standard A4 page height in points
pub const A4_HEIGHT: f32 = 841.89;

/// A3 page width in points
pub const A3_WIDTH: f32 = 841.89;

/// A3 page height in points
pub const A3_HEIGHT: f32 = 1190.55;

/// US Letter page width in points
pub const LETTER_WIDTH: f32 = 612.0;

/// US Letter page height in points
pub const LETTER_HEIGHT: f32 = 792.0;

/// US Legal page height in points (same width as Letter)
pub const LEGAL_HEIGHT: f32 = 1008.0;

/// Default top margin of a document section (1.75cm)
pub const DEFAULT_MARGIN_TOP: f32 = 1.75 * POINTS_PER_CM;

/// Default bottom margin of a document section (2cm)
pub const DEFAULT_MARGIN_BOTTOM: f32 = 2.0 * POINTS_PER_CM;

/// Default left margin of a document section (2cm)
pub const DEFAULT_MARGIN_LEFT: f32 = 2.0 * POINTS_PER_CM;

/// Default right margin of a document section (1cm)
pub const DEFAULT_MARGIN_RIGHT: f32 = 1.0 * POINTS_PER_CM;

/// Distance from the page edge to a header or footer band (1.25cm)
pub const DEFAULT_HEADER_FOOTER_DISTANCE: f32 = 1.25 * POINTS_PER_CM;

/// Default font family when nothing else matches
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Default font size in points
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Space after a paragraph in the default Normal style
pub const DEFAULT_SPACE_AFTER: f32 = 8.0;

/// Default character width ratio for text estimation
/// (average character width as a fraction of font size)
pub const DEFAULT_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Ascent as a fraction of font size for estimated metrics
pub const DEFAULT_ASCENT_RATIO: f32 = 0.8;

/// Descent as a fraction of font size for estimated metrics
pub const DEFAULT_DESCENT_RATIO: f32 = 0.2;

/// Leading as a fraction of font size for estimated metrics
pub const DEFAULT_LEADING_RATIO: f32 = 0.2;

/// Width added to bold glyphs by the estimating measurer
pub const BOLD_WIDTH_FACTOR: f32 = 1.05;

/// Distance of the underline below the baseline as a fraction of font size
pub const UNDERLINE_OFFSET_RATIO: f32 = 0.1;

/// Underline stroke width as a fraction of font size
pub const UNDERLINE_WIDTH_RATIO: f32 = 0.05;

/// Points per character when estimating top-level table column widths
pub const TABLE_CHAR_TO_PT: f32 = 7.5;

/// Minimum derived width of a top-level table column
pub const TABLE_MIN_COLUMN_WIDTH: f32 = 71.0;

/// Maximum derived width of a table column
pub const TABLE_MAX_COLUMN_WIDTH: f32 = 226.0;

/// Points per character when estimating nested table column widths
pub const NESTED_TABLE_CHAR_TO_PT: f32 = 6.0;

/// Minimum derived width of a nested table column
pub const NESTED_TABLE_MIN_COLUMN_WIDTH: f32 = 42.0;

/// Horizontal cell padding (1.2mm)
pub const DEFAULT_CELL_PADDING_H: f32 = 1.2 * POINTS_PER_CM / 10.0;

/// Vertical cell padding
pub const DEFAULT_CELL_PADDING_V: f32 = 1.0;

/// Border widths by style
pub const BORDER_WIDTH_THIN: f32 = 0.25;
pub const BORDER_WIDTH_MEDIUM: f32 = 0.5;
pub const BORDER_WIDTH_THICK: f32 = 0.75;

/// Width used for border styles without an explicit weight
pub const DEFAULT_BORDER_WIDTH: f32 = 0.25;

/// Padding between a sheet cell's edge and its text, before scaling
pub const SHEET_TEXT_PADDING: f32 = 1.0;

/// Font size of sheet header and footer text
pub const HEADER_FOOTER_FONT_SIZE: f32 = 9.0;

/// Display width of images without a declared size (5cm)
pub const DEFAULT_IMAGE_WIDTH: f32 = 5.0 * POINTS_PER_CM;

/// Sheet row height used for rows without a record
pub const DEFAULT_ROW_HEIGHT: f32 = 15.0;

/// Sheet column width used for columns without a record
pub const DEFAULT_COLUMN_WIDTH: f32 = 64.0;

/// Tolerance for floating point layout comparisons
pub const LAYOUT_EPSILON: f32 = 0.01;

/// Convert twentieths of a point to points
pub fn twips_to_pt(twips: f32) -> f32 {
    twips / 20.0
}

/// Convert centimetres to points
pub fn cm_to_pt(cm: f32) -> f32 {
    cm * POINTS_PER_CM
}
