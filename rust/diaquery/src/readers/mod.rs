pub mod binary;
mod mzml;
mod mzxml;
mod xml;

use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::errors::DataReadingError;
use crate::models::spectrum::ScanRecord;

pub use mzml::MzMLScanReader;
pub use mzxml::MzXMLScanReader;

/// Raw acquisition formats that can be streamed into scan records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RawFormat {
    MzML,
    MzXML,
}

impl RawFormat {
    /// Detects the format from the file extension (case-insensitive).
    ///
    /// ```
    /// use diaquery::readers::RawFormat;
    ///
    /// assert_eq!(RawFormat::from_path("run.mzML").unwrap(), RawFormat::MzML);
    /// assert_eq!(RawFormat::from_path("RUN.MZXML").unwrap(), RawFormat::MzXML);
    /// assert!(RawFormat::from_path("run.raw").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataReadingError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        match extension.as_deref() {
            Some("mzml") => Ok(RawFormat::MzML),
            Some("mzxml") => Ok(RawFormat::MzXML),
            _ => Err(DataReadingError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

impl std::fmt::Display for RawFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawFormat::MzML => write!(f, "mzML"),
            RawFormat::MzXML => write!(f, "mzXML"),
        }
    }
}

type ScanIter = Box<dyn Iterator<Item = Result<ScanRecord, DataReadingError>> + Send>;

/// Ordered stream of scans from a raw file.
///
/// The parsing strategy is chosen once, when the reader is created.
pub struct RawScanReader {
    inner: ScanIter,
    format: RawFormat,
}

impl RawScanReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataReadingError> {
        let path = path.as_ref();
        let format = RawFormat::from_path(path)?;
        let file = File::open(path).map_err(|e| DataReadingError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        info!("Reading {} scans from {}", format, path.display());
        Ok(Self::new(BufReader::new(file), format))
    }

    pub fn new<R: BufRead + Send + 'static>(reader: R, format: RawFormat) -> Self {
        let inner: ScanIter = match format {
            RawFormat::MzML => Box::new(MzMLScanReader::new(reader)),
            RawFormat::MzXML => Box::new(MzXMLScanReader::new(reader)),
        };
        Self { inner, format }
    }

    pub fn format(&self) -> RawFormat {
        self.format
    }
}

impl Iterator for RawScanReader {
    type Item = Result<ScanRecord, DataReadingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
