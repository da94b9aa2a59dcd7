use crate::BfError;

/// Floating point type used throughout the analysis
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, BfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(BfError::NonFinite { what, value: v })
    }
}

/// Population mean and standard deviation (ddof = 0).
///
/// Returns `None` for an empty slice.
pub fn mean_std(values: &[Real]) -> Option<(Real, Real)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as Real;
    let mean = values.iter().sum::<Real>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<Real>() / n;
    Some((mean, var.sqrt()))
}
