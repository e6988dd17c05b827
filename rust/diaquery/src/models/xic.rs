//! Extracted ion chromatograms.

use super::spectrum::Spectrum;
use super::tolerance::MzTolerance;
use crate::errors::DataProcessingError;
use crate::utils::inclusive_range_indices;

/// Sums, for every cycle, the intensities whose m/z falls within the
/// tolerance window around `target_mz` (both edges inclusive).
///
/// The output always has one value per spectrum, cycles without signal
/// in range are 0. A spectrum whose m/z and intensity arrays differ in
/// length is an error.
///
/// ```
/// use diaquery::models::spectrum::Spectrum;
/// use diaquery::models::tolerance::MzTolerance;
/// use diaquery::models::xic::extract_xic;
///
/// let spectra = vec![Spectrum {
///     mz: vec![499.99, 500.0, 500.02],
///     intensity: vec![5.0, 7.0, 3.0],
/// }];
/// let xic = extract_xic(&spectra, 500.0, MzTolerance::Ppm(20.0)).unwrap();
/// assert_eq!(xic, vec![7.0]);
/// ```
pub fn extract_xic(
    spectra: &[Spectrum],
    target_mz: f64,
    tolerance: MzTolerance,
) -> Result<Vec<f32>, DataProcessingError> {
    let range = tolerance.extraction_range(target_mz)?;
    spectra
        .iter()
        .map(|spec| {
            if spec.mz.len() != spec.intensity.len() {
                return Err(DataProcessingError::ExpectedSlicesSameLength {
                    expected: spec.mz.len(),
                    other: spec.intensity.len(),
                    context: "extract_xic",
                });
            }
            let idx = inclusive_range_indices(&spec.mz, range);
            Ok(spec.intensity[idx].iter().sum::<f32>())
        })
        .collect()
}

/// Extracts one trace per target, in the same order as the targets.
pub fn extract_xics(
    spectra: &[Spectrum],
    target_mzs: &[f64],
    tolerance: MzTolerance,
) -> Result<Vec<Vec<f32>>, DataProcessingError> {
    target_mzs
        .iter()
        .map(|&mz| extract_xic(spectra, mz, tolerance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectra() -> Vec<Spectrum> {
        vec![
            Spectrum {
                mz: vec![100.0, 200.0, 200.25, 300.0],
                intensity: vec![1.0, 2.0, 4.0, 8.0],
            },
            Spectrum::default(),
            Spectrum {
                mz: vec![199.75, 200.2501],
                intensity: vec![16.0, 32.0],
            },
        ]
    }

    #[test]
    fn test_absolute_window_edges_are_inclusive() {
        let xic = extract_xic(&spectra(), 200.0, MzTolerance::Absolute(0.5)).unwrap();
        assert_eq!(xic, vec![6.0, 0.0, 16.0]);
    }

    #[test]
    fn test_trace_length_matches_cycles() {
        for tol in [MzTolerance::Absolute(10.0), MzTolerance::Ppm(1.0)] {
            let xic = extract_xic(&spectra(), 1000.0, tol).unwrap();
            assert_eq!(xic, vec![0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_multiple_targets() {
        let xics = extract_xics(&spectra(), &[100.0, 300.0], MzTolerance::Absolute(0.1)).unwrap();
        assert_eq!(xics, vec![vec![1.0, 0.0, 0.0], vec![8.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_mismatched_arrays_are_an_error() {
        let spectra = vec![Spectrum {
            mz: vec![199.9, 200.0, 200.1],
            intensity: vec![1.0],
        }];
        let res = extract_xic(&spectra, 200.0, MzTolerance::Absolute(0.5));
        assert!(matches!(
            res,
            Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: 3,
                other: 1,
                ..
            })
        ));
    }
}
