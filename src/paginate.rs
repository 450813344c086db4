//! Page pagination for flowing documents and banded sheets
//!
//! [`FlowPaginator`] stacks blocks top to bottom and opens a page whenever
//! the next block does not fit. [`BandPaginator`] cuts a continuous sheet
//! into page-high bands without cutting through reserved regions.

use crate::Result;
use crate::constants::LAYOUT_EPSILON;
use crate::error::LayoutError;
use crate::model::PageSetup;
use crate::sink::Rect;
use tracing::{debug, trace, warn};

/// Physical page size and the content area inside the margins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub width: f32,
    pub height: f32,
    pub content: Rect,
}

impl PageFrame {
    pub fn new(width: f32, height: f32, content: Rect) -> Result<Self> {
        if width <= 0.0 || height <= 0.0 || content.is_degenerate() {
            return Err(LayoutError::InvalidGeometry(format!(
                "page {width}x{height} with content area {}x{}",
                content.width, content.height
            )));
        }
        Ok(Self {
            width,
            height,
            content,
        })
    }

    /// Frame of a section's page setup
    pub fn from_setup(setup: &PageSetup) -> Result<Self> {
        let (width, height) = setup.page_dimensions();
        let m = setup.margins;
        Self::new(
            width,
            height,
            Rect::new(m.left, m.top, width - m.left - m.right, height - m.top - m.bottom),
        )
    }

    pub fn usable_height(&self) -> f32 {
        self.content.height
    }

    /// Same page with the content area's top and bottom moved
    pub fn with_vertical_bounds(&self, top: f32, bottom: f32) -> Result<Self> {
        Self::new(
            self.width,
            self.height,
            Rect::new(self.content.x, top, self.content.width, bottom - top),
        )
    }
}

/// Where a block was put
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_index: usize,
    /// Top of the block in page coordinates
    pub y: f32,
    pub frame: PageFrame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CursorState {
    NoOpenSection,
    Positioned { page_index: usize, cursor_y: f32 },
}

/// Paginator for content flowing through sections of pages.
///
/// Sections and page breaks are lazy: they only take effect when the next
/// block is placed, so consecutive requests collapse and a request without
/// following content produces no page. Callers do not place zero-height
/// blocks.
#[derive(Debug, Clone)]
pub struct FlowPaginator {
    state: CursorState,
    frame: Option<PageFrame>,
    pending_frame: Option<PageFrame>,
    break_pending: bool,
    pages: Vec<PageFrame>,
}

impl Default for FlowPaginator {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowPaginator {
    pub fn new() -> Self {
        Self {
            state: CursorState::NoOpenSection,
            frame: None,
            pending_frame: None,
            break_pending: false,
            pages: Vec::new(),
        }
    }

    /// Request a new section; its first page opens at the next placement
    pub fn start_section(&mut self, frame: PageFrame) {
        trace!("Section requested {}x{}", frame.width, frame.height);
        self.pending_frame = Some(frame);
    }

    /// Request a page break; a no-op before the first content
    pub fn page_break(&mut self) {
        if matches!(self.state, CursorState::Positioned { .. }) {
            self.break_pending = true;
        }
    }

    /// Frame new pages will use
    pub fn current_frame(&self) -> Option<&PageFrame> {
        self.pending_frame.as_ref().or(self.frame.as_ref())
    }

    /// Index of the page the cursor is on
    pub fn current_page(&self) -> Option<usize> {
        match self.state {
            CursorState::Positioned { page_index, .. } => Some(page_index),
            CursorState::NoOpenSection => None,
        }
    }

    /// Space left on the current page, or `None` when the next placement
    /// opens a page
    pub fn remaining(&self) -> Option<f32> {
        match self.state {
            CursorState::Positioned { cursor_y, .. }
                if self.pending_frame.is_none() && !self.break_pending =>
            {
                self.frame.map(|f| f.content.bottom() - cursor_y)
            }
            _ => None,
        }
    }

    /// True when the cursor sits at the top of a page's content area
    pub fn at_page_top(&self) -> bool {
        match (self.state, self.frame) {
            (CursorState::Positioned { cursor_y, .. }, Some(frame)) => {
                (cursor_y - frame.content.y).abs() <= LAYOUT_EPSILON
            }
            _ => true,
        }
    }

    fn open_page(&mut self) -> Result<()> {
        if let Some(frame) = self.pending_frame.take() {
            self.frame = Some(frame);
        }
        let frame = self.frame.ok_or_else(|| {
            LayoutError::InvalidGeometry("content placed before any section".to_string())
        })?;
        self.pages.push(frame);
        self.break_pending = false;
        self.state = CursorState::Positioned {
            page_index: self.pages.len() - 1,
            cursor_y: frame.content.y,
        };
        debug!(page = self.pages.len(), "Opened page");
        Ok(())
    }

    /// Make room for a block of `height`, opening a page first when needed
    pub fn ensure_space(&mut self, height: f32) -> Result<Placement> {
        let must_open = match self.state {
            CursorState::NoOpenSection => true,
            CursorState::Positioned { .. } if self.pending_frame.is_some() || self.break_pending => {
                true
            }
            CursorState::Positioned { cursor_y, .. } => {
                let frame = self.frame.as_ref().map(|f| f.content);
                frame.is_some_and(|content| {
                    cursor_y + height > content.bottom() + LAYOUT_EPSILON
                        && cursor_y > content.y + LAYOUT_EPSILON
                })
            }
        };
        if must_open {
            self.open_page()?;
        }

        let (page_index, cursor_y) = match self.state {
            CursorState::Positioned {
                page_index,
                cursor_y,
            } => (page_index, cursor_y),
            CursorState::NoOpenSection => {
                return Err(LayoutError::InvalidGeometry("no open page".to_string()));
            }
        };
        let frame = self.pages[page_index];
        if height > frame.usable_height() + LAYOUT_EPSILON {
            warn!(
                height,
                usable = frame.usable_height(),
                page = page_index + 1,
                "Block taller than a page, letting it overflow"
            );
        }
        Ok(Placement {
            page_index,
            y: cursor_y,
            frame,
        })
    }

    /// Move the cursor down
    pub fn advance(&mut self, height: f32) {
        if let CursorState::Positioned { cursor_y, .. } = &mut self.state {
            *cursor_y += height;
        }
    }

    /// Place a block that must not be split
    pub fn place(&mut self, height: f32) -> Result<Placement> {
        let placement = self.ensure_space(height)?;
        self.advance(height);
        Ok(placement)
    }

    pub fn pages(&self) -> &[PageFrame] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Paginator cutting a continuous sheet into bands of one page each
#[derive(Debug, Clone)]
pub struct BandPaginator {
    content_top: f32,
    usable_height: f32,
    offsets: Vec<f32>,
}

impl BandPaginator {
    /// `content_top` is where a band's first row lands on the page
    pub fn new(content_top: f32, usable_height: f32) -> Result<Self> {
        if usable_height <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "usable page height {usable_height}"
            )));
        }
        Ok(Self {
            content_top,
            usable_height,
            offsets: vec![0.0],
        })
    }

    fn current_offset(&self) -> f32 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Keep `area` on one page, starting a band at its top if it would cross
    /// the bottom of the current one. Returns the band index.
    pub fn reserve(&mut self, area: Rect) -> usize {
        let offset = self.current_offset();
        if area.y - offset + area.height > self.usable_height + LAYOUT_EPSILON
            && area.y > offset + LAYOUT_EPSILON
        {
            trace!(y = area.y, height = area.height, "Starting band");
            self.offsets.push(area.y);
        }
        if area.height > self.usable_height + LAYOUT_EPSILON {
            warn!(
                height = area.height,
                usable = self.usable_height,
                "Region taller than a page, letting it overflow"
            );
        }
        self.offsets.len() - 1
    }

    /// Band containing sheet position `y`
    pub fn locate(&self, y: f32) -> usize {
        self.offsets
            .iter()
            .rposition(|&offset| offset <= y + LAYOUT_EPSILON)
            .unwrap_or(0)
    }

    /// Band index and page position of a sheet rect
    pub fn to_page(&self, rect: Rect) -> (usize, Rect) {
        let band = self.locate(rect.y);
        let offset = self.offsets[band];
        (band, rect.translate(0.0, self.content_top - offset))
    }

    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }
}
