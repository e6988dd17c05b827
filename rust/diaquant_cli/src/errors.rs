use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error interpreting the config: {msg}")]
    Config { msg: String },

    #[error("Error parsing config: {msg}")]
    ParseError { msg: String },

    #[error("Error accessing {}: {msg}", path.as_deref().unwrap_or("<unknown path>"))]
    Io { msg: String, path: Option<String> },

    #[error("Error reading raw data: {0}")]
    DataReading(#[from] diaquery::DiaqueryError),

    #[error("Error reading spectral library: {0}")]
    Library(#[from] diaquant::errors::LibraryReadingError),

    #[error("Error processing data: {0}")]
    Processing(#[from] diaquant::errors::DiaquantError),

    #[error("Error writing output: {0}")]
    Output(#[from] csv::Error),

    #[error("{n_failed} precursor(s) could not be quantified, first: {first}")]
    FailedPrecursors { n_failed: usize, first: String },
}
