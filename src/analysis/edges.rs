use std::path::Path;

use image::GrayImage;

use crate::{
    EdgeImage,
    analysis::gradient::GradientMap,
    error::{BanknoteError, Result},
    image_utils::{TARGET_SIZE, array_to_gray},
};

pub struct EdgeRenderer;

impl EdgeRenderer {
    pub fn render_edges<P: AsRef<Path>>(path: P) -> Result<EdgeImage> {
        let gradient = GradientMap::from_path(path)?;
        Self::render_gradient(&gradient)
    }

    /// Linear rescale of the magnitudes to 0..=255, peak mapped to 255.
    pub fn render_gradient(gradient: &GradientMap) -> Result<EdgeImage> {
        let max_magnitude = gradient.max();

        if max_magnitude <= 0.0 || !max_magnitude.is_finite() {
            return Err(BanknoteError::EmptyGradient);
        }

        let scaled = gradient
            .as_array()
            .mapv(|m| (m * 255.0 / max_magnitude).round().clamp(0.0, 255.0) as u8);

        Ok(EdgeImage {
            image: array_to_gray(&scaled),
            max_magnitude,
        })
    }

    /// All-black frame at the working resolution, used in place of a
    /// rendering when the gradient is empty.
    pub fn blank() -> EdgeImage {
        EdgeImage {
            image: GrayImage::new(TARGET_SIZE as u32, TARGET_SIZE as u32),
            max_magnitude: 0.0,
        }
    }
}
