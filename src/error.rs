//! Error types for the lopdf-office library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LayoutError
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that abort the conversion of a single document.
///
/// Malformed content and unreadable resources are recovered locally and only
/// logged; the variants here cover failures about the overall geometry and
/// the I/O around a conversion.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Error from the underlying lopdf library
    #[error("PDF operation failed: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A grid coordinate does not exist in the resolved table or sheet
    #[error("No cell at row {row}, column {column}")]
    CellNotFound { row: usize, column: usize },

    /// A table or sheet resolved to zero columns
    #[error("Zero columns resolved for {context}")]
    ZeroColumns { context: String },

    /// Page or sheet geometry that cannot be laid out
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// A page sink was driven out of order
    #[error("Drawing sink error: {0}")]
    SinkError(String),

    /// Invalid conversion options
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Font could not be loaded: {0}")]
    FontError(String),

    #[error("Image could not be decoded: {0}")]
    ImageError(String),

    /// Input path with an extension other than .docx or .xlsx
    #[error("Unsupported input file: {}", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The document loader failed to produce a tree
    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_not_found_names_coordinate() {
        let err = LayoutError::CellNotFound { row: 3, column: 7 };
        assert_eq!(err.to_string(), "No cell at row 3, column 7");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(LayoutError::Io(_))));
    }
}
