use std::{collections::BTreeMap, path::Path};

use image::DynamicImage;
use statrs::statistics::Statistics;

use crate::{FeatureVector, analysis::gradient::GradientMap, error::Result};

/// Below this standard deviation the standardized moments are reported as 0.0.
pub const MIN_STD_DEV: f64 = 1e-12;

pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract<P: AsRef<Path>>(path: P) -> Result<FeatureVector> {
        let gradient = GradientMap::from_path(path)?;
        Ok(Self::from_gradient(&gradient))
    }

    pub fn extract_from_image(image: &DynamicImage) -> Result<FeatureVector> {
        let gradient = GradientMap::from_image(image)?;
        Ok(Self::from_gradient(&gradient))
    }

    pub fn from_gradient(gradient: &GradientMap) -> FeatureVector {
        let values = gradient.as_array();

        let mean = values.iter().mean();
        let variance = values.iter().population_variance();
        let (skewness, kurtosis) = standardized_moments(values.iter().copied(), mean, variance);
        let entropy = shannon_entropy(values.iter().copied());

        FeatureVector {
            variance,
            skewness,
            kurtosis,
            entropy,
        }
    }
}

/// Third standardized moment and excess kurtosis around `mean`.
///
/// Returns `(0.0, 0.0)` for degenerate (zero-spread) inputs.
pub fn standardized_moments<I>(values: I, mean: f64, variance: f64) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let std_dev = variance.sqrt();
    if !std_dev.is_finite() || std_dev < MIN_STD_DEV {
        return (0.0, 0.0);
    }

    let mut sum_cubed = 0.0;
    let mut sum_fourth = 0.0;
    let mut count = 0usize;

    for value in values {
        let z = (value - mean) / std_dev;
        let z2 = z * z;
        sum_cubed += z2 * z;
        sum_fourth += z2 * z2;
        count += 1;
    }

    if count == 0 {
        return (0.0, 0.0);
    }

    let n = count as f64;
    (sum_cubed / n, sum_fourth / n - 3.0)
}

/// Base-2 Shannon entropy with one bin per distinct value.
///
/// Bins are summed in ascending key order, so the result is bit-identical
/// across calls.
pub fn shannon_entropy<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    let mut total = 0usize;

    for value in values {
        // -0.0 and 0.0 share a bin.
        let key = if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() };
        *counts.entry(key).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return 0.0;
    }

    let n = total as f64;
    let entropy = counts
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum::<f64>();

    // A single bin yields -0.0.
    entropy.max(0.0)
}
