use crate::errors::DataProcessingError;

/// Trapezoidal area of `trace` sampled at retention times `rt_list`.
///
/// A single point (or empty) trace has zero area.
///
/// ```
/// use diaquant::scoring::area::trapezoid_area;
///
/// let area = trapezoid_area(&[0.0, 10.0, 0.0], &[0.0, 1.0, 3.0]).unwrap();
/// assert_eq!(area, 15.0);
/// ```
pub fn trapezoid_area(trace: &[f32], rt_list: &[f32]) -> Result<f64, DataProcessingError> {
    if trace.len() != rt_list.len() {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: rt_list.len(),
            other: trace.len(),
            context: "trapezoid_area".to_string(),
        });
    }
    if trace.len() < 2 {
        return Ok(0.0);
    }
    let doubled: f64 = trace
        .windows(2)
        .zip(rt_list.windows(2))
        .map(|(y, x)| (y[0] as f64 + y[1] as f64) * (x[1] as f64 - x[0] as f64))
        .sum();
    Ok(doubled / 2.0)
}
