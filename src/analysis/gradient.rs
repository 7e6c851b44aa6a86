use std::path::Path;

use image::DynamicImage;
use ndarray::Array2;

use crate::{error::Result, image_utils::preprocess};

/// Per-sample Sobel gradient magnitude of a preprocessed image.
///
/// Both the feature vector and the display rendering derive from this map,
/// so callers that need both should compute it once.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap {
    magnitude: Array2<f64>,
}

impl GradientMap {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path)?;
        Self::from_image(&image)
    }

    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let intensity = preprocess(image)?;
        Ok(Self::from_intensity(&intensity))
    }

    /// Sobel response on an already preprocessed intensity grid. Borders are
    /// handled by reflect-101 (`gfedcb|abcdefgh|gfedcba`).
    ///
    /// The x kernel is `[[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]` and the y kernel
    /// its transpose. Each response is summed as differences of equally
    /// weighted sample pairs, so a flat neighbourhood gives exactly 0.0.
    pub fn from_intensity(intensity: &Array2<f64>) -> Self {
        let (height, width) = intensity.dim();

        let magnitude = Array2::from_shape_fn((height, width), |(y, x)| {
            let rows = [
                reflect_101(y as isize - 1, height),
                y,
                reflect_101(y as isize + 1, height),
            ];
            let cols = [
                reflect_101(x as isize - 1, width),
                x,
                reflect_101(x as isize + 1, width),
            ];
            let p = |r: usize, c: usize| intensity[[rows[r], cols[c]]];

            let gx = (p(0, 2) - p(0, 0)) + 2.0 * (p(1, 2) - p(1, 0)) + (p(2, 2) - p(2, 0));
            let gy = (p(2, 0) - p(0, 0)) + 2.0 * (p(2, 1) - p(0, 1)) + (p(2, 2) - p(0, 2));

            gx.hypot(gy)
        });

        Self { magnitude }
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.magnitude
    }

    pub fn dim(&self) -> (usize, usize) {
        self.magnitude.dim()
    }

    pub fn max(&self) -> f64 {
        self.magnitude.iter().cloned().fold(0.0f64, f64::max)
    }

    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }
}

fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }

    let last = len as isize - 1;
    let reflected = if index < 0 {
        -index
    } else if index > last {
        2 * last - index
    } else {
        index
    };

    reflected as usize
}
