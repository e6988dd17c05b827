use crate::errors::DataProcessingError;

/// Calculates the cosine similarity between two vectors of the same size.
///
/// Returns `None` when either vector has zero magnitude.
///
/// # Example
///
/// ```
/// use diaquant::utils::correlation::cosine_similarity;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.0];
/// let result = cosine_similarity(&a, &b).unwrap().unwrap();
/// assert!((result - 1.0).abs() < 1e-12);
/// ```
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<Option<f64>, DataProcessingError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: a.len(),
            other: b.len(),
            context: "cosine_similarity".to_string(),
        });
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let magnitude_a: f64 = a.iter().map(|&x| x * x).sum::<f64>().sqrt();
    let magnitude_b: f64 = b.iter().map(|&x| x * x).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(None);
    }

    // Rounding can push |x| slightly over 1
    Ok(Some((dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0)))
}
