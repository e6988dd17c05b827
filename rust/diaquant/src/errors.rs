use std::path::PathBuf;

use diaquery::{
    DataProcessingError as DQDataProcessingError,
    DiaqueryError,
};

#[derive(Debug)]
pub enum DataProcessingError {
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    ExpectedNonEmptyData {
        context: Option<String>,
    },
    InvalidParameter {
        name: &'static str,
        msg: String,
    },
    DiaqueryDataProcessingError {
        error: DQDataProcessingError,
        context: String,
    },
}

impl DataProcessingError {
    pub fn append_to_context(mut self, context: &str) -> Self {
        match &mut self {
            DataProcessingError::ExpectedSlicesSameLength {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::ExpectedNonEmptyData {
                context: owned_context,
            } => match owned_context {
                Some(x) => x.push_str(context),
                None => *owned_context = Some(context.to_string()),
            },
            DataProcessingError::InvalidParameter { msg, .. } => {
                msg.push_str(context);
            }
            DataProcessingError::DiaqueryDataProcessingError {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
        }
        self
    }

    /// The precursor m/z this error refers to, if it is a window mismatch.
    pub fn out_of_range_mz(&self) -> Option<f64> {
        match self {
            DataProcessingError::DiaqueryDataProcessingError {
                error: DQDataProcessingError::OutOfRange { precursor_mz },
                ..
            } => Some(*precursor_mz),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedSlicesSameLength {
                expected,
                other,
                context,
            } => write!(
                f,
                "Expected slices of the same length ({} vs {}) {}",
                expected, other, context
            ),
            Self::ExpectedNonEmptyData { context } => match context {
                Some(c) => write!(f, "Expected non-empty data {}", c),
                None => write!(f, "Expected non-empty data"),
            },
            Self::InvalidParameter { name, msg } => {
                write!(f, "Invalid parameter '{}': {}", name, msg)
            }
            Self::DiaqueryDataProcessingError { error, context } => {
                if context.is_empty() {
                    write!(f, "{}", error)
                } else {
                    write!(f, "{} ({})", error, context)
                }
            }
        }
    }
}

impl std::error::Error for DataProcessingError {}

impl From<DQDataProcessingError> for DataProcessingError {
    fn from(x: DQDataProcessingError) -> Self {
        Self::DiaqueryDataProcessingError {
            error: x,
            context: "".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum LibraryReadingError {
    UnsupportedFormat {
        path: PathBuf,
    },
    SchemaError {
        missing: Vec<String>,
    },
    Csv {
        source: csv::Error,
        context: &'static str,
    },
    Io {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
    RowParse {
        row: usize,
        column: String,
        value: String,
    },
}

impl std::fmt::Display for LibraryReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat { path } => write!(
                f,
                "Invalid spectral library format: {}. Only .tsv and .csv formats are supported.",
                path.display()
            ),
            Self::SchemaError { missing } => write!(
                f,
                "Cannot find column(s) '{}' in the spectral library.",
                missing.join(";")
            ),
            Self::Csv { source, context } => write!(f, "{}: {}", context, source),
            Self::Io {
                source,
                context,
                path,
            } => write!(f, "{} ({}): {}", context, path.display(), source),
            Self::RowParse { row, column, value } => write!(
                f,
                "Could not parse value '{}' in column '{}' at library row {}",
                value, column, row
            ),
        }
    }
}

impl std::error::Error for LibraryReadingError {}

#[derive(Debug)]
pub enum DiaquantError {
    Diaquery(DiaqueryError),
    DataProcessingError(DataProcessingError),
    LibraryReadingError(LibraryReadingError),
}

impl std::fmt::Display for DiaquantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Diaquery(e) => write!(f, "{}", e),
            Self::DataProcessingError(e) => write!(f, "{}", e),
            Self::LibraryReadingError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DiaquantError {}

pub type Result<T> = std::result::Result<T, DiaquantError>;

impl DiaquantError {
    /// See [`DataProcessingError::out_of_range_mz`].
    pub fn out_of_range_mz(&self) -> Option<f64> {
        match self {
            Self::DataProcessingError(e) => e.out_of_range_mz(),
            Self::Diaquery(DiaqueryError::DataProcessingError(
                DQDataProcessingError::OutOfRange { precursor_mz },
            )) => Some(*precursor_mz),
            _ => None,
        }
    }
}

impl From<DiaqueryError> for DiaquantError {
    fn from(x: DiaqueryError) -> Self {
        Self::Diaquery(x)
    }
}

impl From<DataProcessingError> for DiaquantError {
    fn from(x: DataProcessingError) -> Self {
        Self::DataProcessingError(x)
    }
}

impl From<LibraryReadingError> for DiaquantError {
    fn from(x: LibraryReadingError) -> Self {
        Self::LibraryReadingError(x)
    }
}

impl From<DQDataProcessingError> for DiaquantError {
    fn from(x: DQDataProcessingError) -> Self {
        Self::DataProcessingError(DataProcessingError::DiaqueryDataProcessingError {
            error: x,
            context: "".to_string(),
        })
    }
}
