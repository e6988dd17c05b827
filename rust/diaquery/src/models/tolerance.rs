use crate::errors::DataProcessingError;
use crate::utils::TupleRange;
use serde::{
    Deserialize,
    Serialize,
};

/// m/z tolerance used when extracting ion chromatograms.
///
/// Convention: the value is the FULL width of the extraction window, so a
/// tolerance of `Absolute(0.02)` around 500.0 extracts `[499.99, 500.01]`.
/// Ppm tolerances are converted to daltons at the target m/z before halving.
///
/// Example:
/// ```
/// use diaquery::models::tolerance::MzTolerance;
///
/// let tol: MzTolerance = serde_json::from_str(r#"{"ppm": 20.0}"#).unwrap();
/// let range = tol.extraction_range(500.0).unwrap();
/// assert!((range.start() - 499.995).abs() < 1e-9);
/// assert!((range.end() - 500.005).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MzTolerance {
    #[serde(rename = "da")]
    Absolute(f64),
    #[serde(rename = "ppm")]
    Ppm(f64),
}

impl Default for MzTolerance {
    fn default() -> Self {
        MzTolerance::Ppm(20.0)
    }
}

impl MzTolerance {
    /// Full window width in daltons at the given m/z.
    pub fn width_da(&self, mz: f64) -> f64 {
        match self {
            MzTolerance::Absolute(width) => *width,
            MzTolerance::Ppm(ppm) => mz * ppm * 1e-6,
        }
    }

    /// Closed `[mz - width/2, mz + width/2]` range to extract.
    pub fn extraction_range(&self, mz: f64) -> Result<TupleRange<f64>, DataProcessingError> {
        let half = self.width_da(mz) / 2.0;
        TupleRange::try_new(mz - half, mz + half).map_err(|_| DataProcessingError::InvalidRange {
            start: mz - half,
            end: mz + half,
        })
    }
}
