//! A page layout engine rendering office documents to PDF with lopdf
//!
//! Word-processing documents ([`Document`]) and spreadsheets ([`Workbook`])
//! arrive as already parsed trees. The engine breaks text into lines, sizes
//! table grids, paginates the result and emits primitive drawing commands
//! that a [`PageSink`] turns into output; [`PdfSink`] writes them with lopdf.
//!
//! ```
//! use lopdf_office::{ConvertOptions, Document, HeuristicMeasurer, Paragraph, PdfSink};
//!
//! let doc = Document::new().with_block(Paragraph::text("Hello world"));
//! let conversion =
//!     lopdf_office::render_document(&doc, &ConvertOptions::default(), &HeuristicMeasurer::default())?;
//!
//! let mut sink = PdfSink::new();
//! conversion.emit(&mut sink)?;
//! let bytes = sink.to_bytes()?;
//! assert!(bytes.starts_with(b"%PDF"));
//! # Ok::<(), lopdf_office::LayoutError>(())
//! ```

use tracing::debug;

pub mod batch;
pub mod borders;
pub mod config;
pub mod constants;
pub mod docx;
pub mod drawing;
#[cfg(feature = "ttf-parser")]
mod embed;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod paginate;
pub mod resources;
pub mod sheet;
pub mod sink;
pub mod style;
pub mod text;
pub mod xlsx;

pub use batch::{BatchReport, Converter, DocumentLoader, InputKind};
pub use config::ConvertOptions;
pub use drawing::PdfSink;
pub use error::{LayoutError, Result};
#[cfg(feature = "ttf-parser")]
pub use font::TtfMeasurer;
pub use font::{FontHandle, FontRegistry, FontResolver, HeuristicMeasurer, TextMeasurer, TextMetrics};
pub use model::{
    Block, Bookmark, Document, FieldKind, HeadersFooters, ImageRun, Margins, Orientation,
    PageSetup, PageSize, Paragraph, Run, Table, TableCell, TableOfContents, TableRow,
    VerticalMerge,
};
pub use resources::ResourceScope;
pub use sheet::{
    CellFormat, CellRange, CellValue, ColumnSpec, HorizontalAlignment, PrintSetup, Sheet,
    SheetCell, SheetRow, Workbook,
};
pub use sink::{DrawCommand, PageContent, PageSink, RecordingSink, emit};
pub use style::{
    Alignment, BorderSide, BorderStyle, CellBorders, CharacterFormat, Color, LineSpacing,
    NamedStyle, ParagraphFormat, StyleSheet, TextStyle, VerticalAlignment,
};

/// Laid out pages together with the images they reference.
///
/// Dropping the conversion releases every image registered for it.
#[derive(Debug)]
pub struct Conversion {
    pub pages: Vec<PageContent>,
    pub resources: ResourceScope,
}

impl Conversion {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Replay the pages into a sink
    pub fn emit(&self, sink: &mut dyn PageSink) -> Result<()> {
        sink::emit(&self.pages, sink)
    }
}

/// Lay out a word-processing document
pub fn render_document(
    document: &Document,
    options: &ConvertOptions,
    measurer: &dyn TextMeasurer,
) -> Result<Conversion> {
    let mut resources = ResourceScope::new();
    let pages = docx::compose_document(document, options, measurer, &mut resources)?;
    debug!(images = resources.len(), "Document rendered to {} pages", pages.len());
    Ok(Conversion { pages, resources })
}

/// Lay out every sheet of a workbook
pub fn render_workbook(
    workbook: &Workbook,
    options: &ConvertOptions,
    measurer: &dyn TextMeasurer,
) -> Result<Conversion> {
    let pages = xlsx::compose_workbook(workbook, options, measurer)?;
    debug!("Workbook rendered to {} pages", pages.len());
    Ok(Conversion {
        pages,
        resources: ResourceScope::new(),
    })
}
