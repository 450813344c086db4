//! File level driver converting documents and workbooks to PDF files.
//!
//! Parsing the office containers is left to a [`DocumentLoader`]; the driver
//! picks the layout by file extension, renders and writes `<stem>.pdf`.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument};

use crate::config::ConvertOptions;
use crate::drawing::PdfSink;
use crate::error::{LayoutError, Result};
use crate::font::{FontRegistry, HeuristicMeasurer, TextMeasurer};
use crate::model::Document;
use crate::sheet::Workbook;
use crate::{Conversion, render_document, render_workbook};

/// Kind of input, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Document,
    Workbook,
}

impl InputKind {
    /// `.docx` and `.xlsx`, case-insensitive
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("docx") => Ok(Self::Document),
            Some("xlsx") => Ok(Self::Workbook),
            _ => Err(LayoutError::UnsupportedInput(path.to_path_buf())),
        }
    }
}

/// Produces parsed trees from input files
pub trait DocumentLoader {
    fn load_document(&self, path: &Path) -> Result<Document>;

    fn load_workbook(&self, path: &Path) -> Result<Workbook>;
}

/// Outcome of converting a directory
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// 0 when every file converted, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() { 0 } else { 1 }
    }
}

pub struct Converter<L> {
    loader: L,
    options: ConvertOptions,
    measurer: Box<dyn TextMeasurer>,
    fonts: FontRegistry,
}

impl<L: DocumentLoader> Converter<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            options: ConvertOptions::default(),
            measurer: Box::new(HeuristicMeasurer::default()),
            fonts: FontRegistry::standard(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    /// Fonts used when writing the PDF
    pub fn with_fonts(mut self, fonts: FontRegistry) -> Self {
        self.fonts = fonts;
        self
    }

    /// Load and lay out one input without writing it
    pub fn render(&self, kind: InputKind, input: &Path) -> Result<Conversion> {
        match kind {
            InputKind::Document => {
                let doc = self.loader.load_document(input)?;
                render_document(&doc, &self.options, self.measurer.as_ref())
            }
            InputKind::Workbook => {
                let workbook = self.loader.load_workbook(input)?;
                render_workbook(&workbook, &self.options, self.measurer.as_ref())
            }
        }
    }

    /// Convert one file, returning the number of pages written
    #[instrument(skip(self), fields(input = %input.display()))]
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<usize> {
        if !input.is_file() {
            return Err(LayoutError::MissingInput(input.to_path_buf()));
        }
        let kind = InputKind::from_path(input)?;
        let conversion = self.render(kind, input)?;

        let mut sink = PdfSink::with_resolver(self.fonts.clone());
        conversion.emit(&mut sink)?;
        sink.save(output)?;

        info!(
            pages = conversion.page_count(),
            "Wrote {}",
            output.display()
        );
        Ok(conversion.page_count())
    }

    /// Convert every supported file of a directory next to its input.
    ///
    /// A failing file is logged and recorded; the others still convert.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn convert_directory(&self, dir: &Path) -> Result<BatchReport> {
        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && InputKind::from_path(&path).is_ok() {
                inputs.push(path);
            }
        }
        inputs.sort();
        debug!("Found {} convertible files", inputs.len());

        let mut report = BatchReport::default();
        for input in inputs {
            let output = input.with_extension("pdf");
            match self.convert_file(&input, &output) {
                Ok(_) => report.converted.push(output),
                Err(e) => {
                    error!(error = %e, "Conversion of {} failed", input.display());
                    report.failed.push((input, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paragraph;
    use crate::sheet::{Sheet, SheetCell, SheetRow};

    struct FakeLoader;

    impl FakeLoader {
        fn check(path: &Path) -> Result<()> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.contains("broken") {
                return Err(LayoutError::Load {
                    path: path.to_path_buf(),
                    message: "not a zip archive".to_string(),
                });
            }
            Ok(())
        }
    }

    impl DocumentLoader for FakeLoader {
        fn load_document(&self, path: &Path) -> Result<Document> {
            Self::check(path)?;
            Ok(Document::new().with_block(Paragraph::text("Quarterly report")))
        }

        fn load_workbook(&self, path: &Path) -> Result<Workbook> {
            Self::check(path)?;
            Ok(Workbook::new().with_sheet(Sheet::new("Totals").with_row(SheetRow::new(
                15.0,
                vec![Some(SheetCell::text("Total")), Some(SheetCell::number(42.0))],
            ))))
        }
    }

    #[test]
    fn test_input_kind_by_extension() {
        assert_eq!(
            InputKind::from_path(Path::new("a/report.DOCX")).unwrap(),
            InputKind::Document
        );
        assert_eq!(
            InputKind::from_path(Path::new("budget.xlsx")).unwrap(),
            InputKind::Workbook
        );
        assert!(matches!(
            InputKind::from_path(Path::new("notes.txt")),
            Err(LayoutError::UnsupportedInput(_))
        ));
        assert!(InputKind::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_missing_input_checked_first() {
        let converter = Converter::new(FakeLoader);
        let result = converter.convert_file(Path::new("/nonexistent/x.txt"), Path::new("x.pdf"));
        assert!(matches!(result, Err(LayoutError::MissingInput(_))));
    }

    #[test]
    fn test_convert_file_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.docx");
        std::fs::write(&input, b"placeholder").unwrap();
        let output = dir.path().join("report.pdf");

        let pages = Converter::new(FakeLoader).convert_file(&input, &output).unwrap();
        assert_eq!(pages, 1);

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), 1);
    }

    #[test]
    fn test_directory_continues_after_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        for name in ["a.docx", "b_broken.docx", "c.xlsx", "notes.txt"] {
            std::fs::write(dir.join(name), b"placeholder").unwrap();
        }

        let report = Converter::new(FakeLoader).convert_directory(dir).unwrap();
        assert_eq!(report.converted, vec![dir.join("a.pdf"), dir.join("c.pdf")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, dir.join("b_broken.docx"));
        assert!(report.failed[0].1.contains("not a zip archive"));
        assert_eq!(report.exit_code(), 1);
        assert!(!dir.join("notes.pdf").exists());
    }

    #[test]
    fn test_empty_report_succeeds() {
        assert_eq!(BatchReport::default().exit_code(), 0);
    }
}
