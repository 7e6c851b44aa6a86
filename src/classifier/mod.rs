pub mod adapter;
pub mod artifact;
pub mod forest;
pub mod linear;

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{BanknoteError, Result};

/// Width of a feature row: variance, skewness, kurtosis, entropy.
pub const FEATURE_COUNT: usize = 4;

/// Label the training pipeline used for counterfeit notes.
pub const FAKE_LABEL: i64 = 1;

/// A pre-trained binary classifier over feature rows.
///
/// Implementations are immutable once built; the adapter shares a single
/// instance across every classification call.
pub trait BanknoteModel: Send + Sync {
    /// Discrete class label for each row.
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<i64>>;

    /// Probability distribution over classes for each row, one column per class.
    fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    fn name(&self) -> &str;
}

pub(crate) fn check_row_width(rows: &ArrayView2<'_, f64>) -> Result<()> {
    if rows.ncols() != FEATURE_COUNT {
        return Err(BanknoteError::InvalidParameter(format!(
            "expected {} features per row, got {}",
            FEATURE_COUNT,
            rows.ncols()
        )));
    }
    Ok(())
}

/// Index of the largest entry; ties resolve to the first.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
