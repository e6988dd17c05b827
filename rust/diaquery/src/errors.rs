use std::fmt::Display;
use std::path::PathBuf;

use crate::readers::binary::BinaryDecodeError;

#[derive(Debug)]
pub enum DiaqueryError {
    DataReadingError(DataReadingError),
    DataProcessingError(DataProcessingError),
    Other(String),
}

impl Display for DiaqueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataReadingError(e) => write!(f, "{}", e),
            Self::DataProcessingError(e) => write!(f, "{}", e),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DiaqueryError {}

impl DiaqueryError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Other(msg.to_string())
    }
}

#[derive(Debug)]
pub enum DataReadingError {
    UnsupportedFormat {
        path: PathBuf,
        extension: Option<String>,
    },
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    Xml(quick_xml::Error),
    MzML(mzdata::io::MzMLParserError),
    BinaryDecode(BinaryDecodeError),
    MissingField {
        field: &'static str,
        context: String,
    },
    WindowFile {
        line: usize,
        msg: String,
    },
}

impl Display for DataReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat { path, extension } => write!(
                f,
                "Unsupported raw file format ({}) for {}: only .mzML and .mzXML are supported",
                extension.as_deref().unwrap_or("no extension"),
                path.display()
            ),
            Self::Io { source, path } => match path {
                Some(path) => write!(f, "Error reading {}: {}", path.display(), source),
                None => write!(f, "Error reading data: {}", source),
            },
            Self::Xml(e) => write!(f, "XML parsing error: {}", e),
            Self::MzML(e) => write!(f, "mzML parsing error: {}", e),
            Self::BinaryDecode(e) => write!(f, "Binary array decoding error: {}", e),
            Self::MissingField { field, context } => {
                write!(f, "Missing required field '{}' in {}", field, context)
            }
            Self::WindowFile { line, msg } => {
                write!(f, "Invalid isolation window file at line {}: {}", line, msg)
            }
        }
    }
}

impl std::error::Error for DataReadingError {}

impl From<std::io::Error> for DataReadingError {
    fn from(e: std::io::Error) -> Self {
        DataReadingError::Io {
            source: e,
            path: None,
        }
    }
}

impl From<quick_xml::Error> for DataReadingError {
    fn from(e: quick_xml::Error) -> Self {
        DataReadingError::Xml(e)
    }
}

impl From<mzdata::io::MzMLParserError> for DataReadingError {
    fn from(e: mzdata::io::MzMLParserError) -> Self {
        DataReadingError::MzML(e)
    }
}

impl From<BinaryDecodeError> for DataReadingError {
    fn from(e: BinaryDecodeError) -> Self {
        DataReadingError::BinaryDecode(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProcessingError {
    /// The precursor m/z is not covered by any isolation window.
    OutOfRange {
        precursor_mz: f64,
    },
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: &'static str,
    },
    ExpectedNonEmptyData {
        context: &'static str,
    },
    InvalidRange {
        start: f64,
        end: f64,
    },
}

impl Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { precursor_mz } => write!(
                f,
                "Precursor m/z {} is not covered by any isolation window",
                precursor_mz
            ),
            Self::ExpectedSlicesSameLength {
                expected,
                other,
                context,
            } => write!(
                f,
                "Expected slices of the same length in {} (got {} and {})",
                context, expected, other
            ),
            Self::ExpectedNonEmptyData { context } => {
                write!(f, "Expected non-empty data in {}", context)
            }
            Self::InvalidRange { start, end } => {
                write!(f, "Invalid range: start {} is not below end {}", start, end)
            }
        }
    }
}

impl std::error::Error for DataProcessingError {}

impl From<DataProcessingError> for DiaqueryError {
    fn from(e: DataProcessingError) -> Self {
        DiaqueryError::DataProcessingError(e)
    }
}

impl<T: Into<DataReadingError>> From<T> for DiaqueryError {
    fn from(e: T) -> Self {
        DiaqueryError::DataReadingError(e.into())
    }
}

pub type Result<T> = std::result::Result<T, DiaqueryError>;
