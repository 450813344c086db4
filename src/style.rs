//! Formatting attributes for text, paragraphs, borders and the named-style cascade

use crate::constants::*;
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// RGB color representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values should be 0.0-1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Create a color from 8-bit channels
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse a six digit hex color such as `"FF0000"` or `"#1F3864"`.
    ///
    /// Returns `None` for anything else, including Word's `"auto"`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// White color
    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Gray color
    pub fn gray(level: f32) -> Self {
        let l = level.clamp(0.0, 1.0);
        Self::rgb(l, l, l)
    }

    /// Light gray
    pub fn light_gray() -> Self {
        Self::gray(0.8)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Horizontal alignment of paragraph lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical alignment of content inside a fixed-height container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Dash pattern of a stroked line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Weight of one border side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
}

impl BorderStyle {
    /// Stroke width in points; `None` has no width
    pub fn width(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Thin => BORDER_WIDTH_THIN,
            Self::Medium => BORDER_WIDTH_MEDIUM,
            Self::Thick => BORDER_WIDTH_THICK,
            Self::Dashed | Self::Dotted => DEFAULT_BORDER_WIDTH,
        }
    }

    pub fn dash(self) -> DashStyle {
        match self {
            Self::Dashed => DashStyle::Dashed,
            Self::Dotted => DashStyle::Dotted,
            _ => DashStyle::Solid,
        }
    }

    pub fn is_visible(self) -> bool {
        self != Self::None
    }
}

/// One side of a cell border
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Color,
}

impl BorderSide {
    pub fn new(style: BorderStyle, color: Color) -> Self {
        Self { style, color }
    }

    /// A transparent side
    pub fn none() -> Self {
        Self::default()
    }

    pub fn thin() -> Self {
        Self::new(BorderStyle::Thin, Color::black())
    }
}

/// Per-side border set of a cell
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellBorders {
    pub top: BorderSide,
    pub right: BorderSide,
    pub bottom: BorderSide,
    pub left: BorderSide,
}

impl CellBorders {
    /// All four sides transparent
    pub fn none() -> Self {
        Self::default()
    }

    /// The same side on all four edges
    pub fn uniform(side: BorderSide) -> Self {
        Self {
            top: side,
            right: side,
            bottom: side,
            left: side,
        }
    }

    pub fn has_visible_side(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .any(|side| side.style.is_visible())
    }
}

/// Padding for cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    /// Create uniform padding
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Create padding with vertical and horizontal values
    pub fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            bottom: vertical,
            left: horizontal,
            right: horizontal,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::symmetric(DEFAULT_CELL_PADDING_V, DEFAULT_CELL_PADDING_H)
    }
}

/// Line spacing rule of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LineSpacing {
    /// Natural line height of the fonts on the line
    #[default]
    Single,
    /// Natural height times a factor
    Multiple(f32),
    /// Natural height, but never less than the given points
    AtLeast(f32),
    /// Exactly the given points regardless of content
    Exactly(f32),
}

impl LineSpacing {
    /// Apply the rule to a line's natural height
    pub fn apply(self, natural: f32) -> f32 {
        match self {
            Self::Single => natural,
            Self::Multiple(factor) => natural * factor,
            Self::AtLeast(min) => natural.max(min),
            Self::Exactly(height) => height,
        }
    }
}

/// Fully resolved character formatting of a text fragment
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Color,
}

impl TextStyle {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            color: Color::black(),
        }
    }
}

/// Character formatting overrides; unset attributes inherit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterFormat {
    pub family: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Color>,
}

impl CharacterFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = Some(underline);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Overwrite each attribute of `style` that this layer sets
    pub fn apply_to(&self, style: &mut TextStyle) {
        if let Some(family) = &self.family {
            style.family.clone_from(family);
        }
        if let Some(size) = self.size {
            style.size = size;
        }
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underline) = self.underline {
            style.underline = underline;
        }
        if let Some(color) = self.color {
            style.color = color;
        }
    }
}

/// Fully resolved paragraph formatting
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParagraphFormat {
    pub alignment: Alignment,
    pub left_indent: f32,
    pub right_indent: f32,
    /// Signed; negative values hang the first line into the left indent
    pub first_line_indent: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub line_spacing: LineSpacing,
    pub page_break_before: bool,
}

impl Default for ResolvedParagraphFormat {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
            space_before: 0.0,
            space_after: DEFAULT_SPACE_AFTER,
            line_spacing: LineSpacing::Single,
            page_break_before: false,
        }
    }
}

/// Paragraph formatting overrides; unset attributes inherit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub left_indent: Option<f32>,
    pub right_indent: Option<f32>,
    pub first_line_indent: Option<f32>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    pub line_spacing: Option<LineSpacing>,
    pub page_break_before: Option<bool>,
}

impl ParagraphFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_indents(mut self, left: f32, right: f32, first_line: f32) -> Self {
        self.left_indent = Some(left);
        self.right_indent = Some(right);
        self.first_line_indent = Some(first_line);
        self
    }

    pub fn with_spacing(mut self, before: f32, after: f32) -> Self {
        self.space_before = Some(before);
        self.space_after = Some(after);
        self
    }

    pub fn with_line_spacing(mut self, spacing: LineSpacing) -> Self {
        self.line_spacing = Some(spacing);
        self
    }

    pub fn with_page_break_before(mut self) -> Self {
        self.page_break_before = Some(true);
        self
    }

    /// Overwrite each attribute of `format` that this layer sets
    pub fn apply_to(&self, format: &mut ResolvedParagraphFormat) {
        if let Some(alignment) = self.alignment {
            format.alignment = alignment;
        }
        if let Some(v) = self.left_indent {
            format.left_indent = v;
        }
        if let Some(v) = self.right_indent {
            format.right_indent = v;
        }
        if let Some(v) = self.first_line_indent {
            format.first_line_indent = v;
        }
        if let Some(v) = self.space_before {
            format.space_before = v;
        }
        if let Some(v) = self.space_after {
            format.space_after = v;
        }
        if let Some(v) = self.line_spacing {
            format.line_spacing = v;
        }
        if let Some(v) = self.page_break_before {
            format.page_break_before = v;
        }
    }
}

/// A named style, optionally based on another named style
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedStyle {
    pub name: String,
    pub based_on: Option<String>,
    pub paragraph: ParagraphFormat,
    pub character: CharacterFormat,
}

impl NamedStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn based_on(mut self, parent: impl Into<String>) -> Self {
        self.based_on = Some(parent.into());
        self
    }

    pub fn with_paragraph(mut self, paragraph: ParagraphFormat) -> Self {
        self.paragraph = paragraph;
        self
    }

    pub fn with_character(mut self, character: CharacterFormat) -> Self {
        self.character = character;
        self
    }

    /// Heading styles are named "Heading 1", "heading2" and so on
    pub fn is_heading(&self) -> bool {
        self.name.to_lowercase().starts_with("heading")
    }
}

/// Name of the style applied to paragraphs that do not name one
pub const NORMAL_STYLE: &str = "Normal";

/// Document defaults plus the named styles of a document
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    pub default_paragraph: ResolvedParagraphFormat,
    pub default_text: TextStyle,
    styles: HashMap<String, NamedStyle>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: NamedStyle) -> Self {
        self.add_style(style);
        self
    }

    pub fn add_style(&mut self, style: NamedStyle) {
        self.styles.insert(style.name.clone(), style);
    }

    pub fn get(&self, name: &str) -> Option<&NamedStyle> {
        self.styles.get(name)
    }

    /// Walk the based-on chain of `name` and return it base-first.
    ///
    /// A paragraph without a style uses the Normal style when one exists.
    /// Unknown parents end the chain; a cycle is broken at the first
    /// repeated style and logged.
    pub fn chain(&self, name: Option<&str>) -> Vec<&NamedStyle> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = name.or(Some(NORMAL_STYLE));

        while let Some(current) = next {
            if !visited.insert(current) {
                warn!(style = current, "Cyclic based-on chain, ignoring the rest");
                break;
            }
            let Some(style) = self.styles.get(current) else {
                if name.is_some() && chain.is_empty() {
                    trace!(style = current, "Style not defined");
                }
                break;
            };
            chain.push(style);
            next = style.based_on.as_deref();
        }

        chain.reverse();
        chain
    }

    /// Cascade document default, style chain and the local override
    pub fn resolve_paragraph(
        &self,
        name: Option<&str>,
        local: &ParagraphFormat,
    ) -> ResolvedParagraphFormat {
        let mut format = self.default_paragraph.clone();
        for style in self.chain(name) {
            style.paragraph.apply_to(&mut format);
        }
        local.apply_to(&mut format);
        format
    }

    /// Cascade document default, style chain and each override layer in order
    pub fn resolve_text(&self, name: Option<&str>, layers: &[&CharacterFormat]) -> TextStyle {
        let mut style = self.default_text.clone();
        for named in self.chain(name) {
            named.character.apply_to(&mut style);
        }
        for layer in layers {
            layer.apply_to(&mut style);
        }
        style
    }

    /// Whether any style in the chain is a heading style
    pub fn is_heading(&self, name: Option<&str>) -> bool {
        name.is_some() && self.chain(name).iter().any(|s| s.is_heading())
    }
}
