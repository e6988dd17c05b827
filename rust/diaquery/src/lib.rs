#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::models::{
    BuildStats,
    Chromatogram,
    ChromatogramBuilder,
    DiaChromatograms,
    IsolationWindow,
    Ms2Chromatogram,
    MzTolerance,
    ScanRecord,
    Spectrum,
    SpectrumFilter,
    WindowTable,
};
pub use crate::readers::{
    RawFormat,
    RawScanReader,
};

// Declare modules
pub mod errors;
pub mod models;
pub mod readers;
pub mod utils;
pub use crate::utils::TupleRange;

// Re-export errors
pub use crate::errors::{
    DataProcessingError,
    DataReadingError,
    DiaqueryError,
};
