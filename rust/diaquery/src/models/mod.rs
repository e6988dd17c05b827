pub mod chromatogram;
pub mod spectrum;
pub mod tolerance;
pub mod windows;
pub mod xic;

pub use chromatogram::{
    BuildStats,
    Chromatogram,
    ChromatogramBuilder,
    DiaChromatograms,
    Ms2Chromatogram,
};
pub use spectrum::{
    ScanRecord,
    Spectrum,
    SpectrumFilter,
};
pub use tolerance::MzTolerance;
pub use windows::{
    IsolationWindow,
    WindowTable,
};
pub use xic::{
    extract_xic,
    extract_xics,
};
