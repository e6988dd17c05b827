use crate::errors::DataProcessingError;
use serde::Serialize;
use tracing::warn;

/// A single scan as it comes out of a raw file reader.
///
/// Retention time is always in seconds here, the readers take care of
/// normalizing whatever unit the file uses.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub ms_level: u8,
    pub retention_time: f32,
    /// Only present for MS2 scans.
    pub precursor_mz: Option<f64>,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f32>,
}

/// A filtered (m/z ascending, positive intensity) spectrum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

/// Trims spectra to a `[mz_min, mz_max)` window and drops non-positive intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumFilter {
    mz_min: f64,
    mz_max: f64,
}

impl SpectrumFilter {
    pub fn try_new(mz_min: f64, mz_max: f64) -> Result<Self, DataProcessingError> {
        if !(mz_min < mz_max) {
            return Err(DataProcessingError::InvalidRange {
                start: mz_min,
                end: mz_max,
            });
        }
        Ok(Self { mz_min, mz_max })
    }

    pub fn mz_min(&self) -> f64 {
        self.mz_min
    }

    pub fn mz_max(&self) -> f64 {
        self.mz_max
    }

    /// Filter a pair of aligned m/z and intensity arrays.
    ///
    /// ```
    /// use diaquery::models::spectrum::SpectrumFilter;
    ///
    /// let filter = SpectrumFilter::try_new(100.0, 300.0).unwrap();
    /// let out = filter
    ///     .filter(&[50.0, 100.0, 150.0, 200.0, 300.0], &[1.0, 2.0, 0.0, 4.0, 5.0])
    ///     .unwrap();
    /// assert_eq!(out.mz, vec![100.0, 200.0]);
    /// assert_eq!(out.intensity, vec![2.0, 4.0]);
    /// ```
    pub fn filter(&self, mz: &[f64], intensity: &[f32]) -> Result<Spectrum, DataProcessingError> {
        if mz.len() != intensity.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: mz.len(),
                other: intensity.len(),
                context: "SpectrumFilter::filter",
            });
        }

        let (mut out_mz, mut out_int): (Vec<f64>, Vec<f32>) = mz
            .iter()
            .zip(intensity.iter())
            .filter(|(_, &inten)| inten > 0.0)
            .filter(|(&mz, _)| mz >= self.mz_min && mz < self.mz_max)
            .map(|(&mz, &inten)| (mz, inten))
            .unzip();

        if !out_mz.windows(2).all(|w| w[0] <= w[1]) {
            warn!("Found a spectrum with unsorted m/z values, sorting it");
            let mut pairs: Vec<(f64, f32)> = out_mz.into_iter().zip(out_int).collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            (out_mz, out_int) = pairs.into_iter().unzip();
        }

        Ok(Spectrum {
            mz: out_mz,
            intensity: out_int,
        })
    }

    pub fn filter_scan(&self, scan: &ScanRecord) -> Result<Spectrum, DataProcessingError> {
        self.filter(&scan.mz_array, &scan.intensity_array)
    }
}
