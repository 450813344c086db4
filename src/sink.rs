//! Drawing primitives and the page sink they are emitted to
//!
//! Coordinates are absolute page points with the origin at the top-left
//! corner and y growing downwards. Sinks that target a bottom-up surface
//! (such as PDF) flip them.

use crate::Result;
use crate::error::LayoutError;
use crate::resources::ImageHandle;
use crate::style::{Color, DashStyle, TextStyle};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink each side by the given amount
    pub fn inset(&self, top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self::new(
            self.x + left,
            self.y + top,
            self.width - left - right,
            self.height - top - bottom,
        )
    }

    /// True when the rect covers no area
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Text already broken and aligned; `x`/`y` is the top-left of its box
#[derive(Debug, Clone, PartialEq)]
pub struct TextCommand {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Absolute y of the baseline
    pub baseline: f32,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCommand {
    pub from: Point,
    pub to: Point,
    pub width: f32,
    pub color: Color,
    pub dash: DashStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCommand {
    pub rect: Rect,
    pub image: ImageHandle,
}

/// One primitive drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text(TextCommand),
    Line(LineCommand),
    FillRect { rect: Rect, color: Color },
    Image(ImageCommand),
}

impl DrawCommand {
    /// Move the command by an offset
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Self::Text(text) => {
                text.x += dx;
                text.y += dy;
                text.baseline += dy;
            }
            Self::Line(line) => {
                line.from = Point::new(line.from.x + dx, line.from.y + dy);
                line.to = Point::new(line.to.x + dx, line.to.y + dy);
            }
            Self::FillRect { rect, .. } => *rect = rect.translate(dx, dy),
            Self::Image(image) => image.rect = image.rect.translate(dx, dy),
        }
    }

    pub fn translated(mut self, dx: f32, dy: f32) -> Self {
        self.translate(dx, dy);
        self
    }
}

/// A fixed-size output page and its drawing operations in paint order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageContent {
    pub width: f32,
    pub height: f32,
    pub commands: Vec<DrawCommand>,
}

impl PageContent {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Text commands in paint order
    pub fn texts(&self) -> impl Iterator<Item = &TextCommand> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineCommand> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Line(line) => Some(line),
            _ => None,
        })
    }

    /// Concatenated text of the page with a space between commands
    pub fn plain_text(&self) -> String {
        self.texts()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Abstract page surface receiving drawing operations
pub trait PageSink {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<()>;

    fn draw(&mut self, command: &DrawCommand) -> Result<()>;

    fn end_page(&mut self) -> Result<()>;
}

/// Sink keeping every page in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub pages: Vec<PageContent>,
    open: Option<PageContent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageSink for RecordingSink {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<()> {
        if self.open.is_some() {
            return Err(LayoutError::SinkError("page begun twice".to_string()));
        }
        self.open = Some(PageContent::new(width, height));
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        let page = self
            .open
            .as_mut()
            .ok_or_else(|| LayoutError::SinkError("draw outside a page".to_string()))?;
        page.commands.push(command.clone());
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        let page = self
            .open
            .take()
            .ok_or_else(|| LayoutError::SinkError("no page to end".to_string()))?;
        self.pages.push(page);
        Ok(())
    }
}

/// Replay laid out pages into a sink
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn emit(pages: &[PageContent], sink: &mut dyn PageSink) -> Result<()> {
    for page in pages {
        sink.begin_page(page.width, page.height)?;
        for command in &page.commands {
            sink.draw(command)?;
        }
        sink.end_page()?;
    }
    debug!("Emitted {} pages", pages.len());
    Ok(())
}
