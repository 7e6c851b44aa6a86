use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel, Primitive, Rgb};
use ndarray::Array2;

use crate::error::{BanknoteError, Result};

/// Side length of the working grid. Shared with model training; changing it
/// invalidates every trained model.
pub const TARGET_SIZE: usize = 400;

/// BT.709 luma weights, applied to channel values scaled to [0, 1].
pub const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

pub fn rgb_to_gray<S>(image: &ImageBuffer<Rgb<S>, Vec<S>>, max_value: f64) -> Array2<f64>
where
    S: Primitive + Into<f64>,
    Rgb<S>: Pixel<Subpixel = S>,
{
    let (width, height) = image.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        let channels = pixel.channels();
        let r: f64 = channels[0].into();
        let g: f64 = channels[1].into();
        let b: f64 = channels[2].into();
        arr[[y as usize, x as usize]] =
            (LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b) / max_value;
    }

    arr
}

pub fn gray_to_array<S>(image: &ImageBuffer<Luma<S>, Vec<S>>, max_value: f64) -> Array2<f64>
where
    S: Primitive + Into<f64>,
    Luma<S>: Pixel<Subpixel = S>,
{
    let (width, height) = image.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        let value: f64 = pixel.channels()[0].into();
        arr[[y as usize, x as usize]] = value / max_value;
    }

    arr
}

pub fn array_to_gray(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut image = GrayImage::new(width as u32, height as u32);

    for ((y, x), &value) in arr.indexed_iter() {
        image.put_pixel(x as u32, y as u32, Luma([value]));
    }

    image
}

/// Reduces a decoded image to a single intensity channel in [0, 1].
///
/// Colour images go through [`rgb_to_gray`]; alpha is dropped. Grayscale
/// images are only rescaled by their bit depth.
pub fn to_intensity(image: &DynamicImage) -> Result<Array2<f64>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BanknoteError::UnsupportedFormat(format!(
            "image has no samples ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let intensity = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_) => {
            gray_to_array(&image.to_luma8(), u8::MAX as f64)
        }
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            gray_to_array(&image.to_luma16(), u16::MAX as f64)
        }
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            rgb_to_gray(&image.to_rgb8(), u8::MAX as f64)
        }
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => {
            rgb_to_gray(&image.to_rgb16(), u16::MAX as f64)
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            rgb_to_gray(&image.to_rgb32f(), 1.0)
        }
        other => {
            return Err(BanknoteError::UnsupportedFormat(format!(
                "cannot reduce {:?} to a single intensity channel",
                other.color()
            )));
        }
    };

    Ok(intensity)
}

/// Bilinear resampling with pixel-centre alignment, edge samples clamped.
///
/// Source coordinates follow `src = (dst + 0.5) * in / out - 0.5`, the
/// convention the training pipeline resized with. An input without samples
/// resamples to all zeros.
pub(crate) fn resize_bilinear(
    src: &Array2<f64>,
    out_height: usize,
    out_width: usize,
) -> Array2<f64> {
    let (in_height, in_width) = src.dim();

    if in_height == out_height && in_width == out_width {
        return src.clone();
    }
    if in_height == 0 || in_width == 0 {
        return Array2::zeros((out_height, out_width));
    }

    let xs = sample_positions(in_width, out_width);
    let ys = sample_positions(in_height, out_height);

    Array2::from_shape_fn((out_height, out_width), |(y, x)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];

        let top = lerp(src[[y0, x0]], src[[y0, x1]], fx);
        let bottom = lerp(src[[y1, x0]], src[[y1, x1]], fx);

        lerp(top, bottom, fy)
    })
}

// Equal endpoints come back bit-exact.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn sample_positions(input: usize, output: usize) -> Vec<(usize, usize, f64)> {
    let scale = input as f64 / output as f64;
    let last = input - 1;

    (0..output)
        .map(|dst| {
            let pos = (dst as f64 + 0.5) * scale - 0.5;
            let base = pos.floor();

            if base < 0.0 {
                (0, 1.min(last), 0.0)
            } else if base as usize >= last {
                (last, last, 0.0)
            } else {
                let i = base as usize;
                (i, i + 1, pos - base)
            }
        })
        .collect()
}

/// Grayscale conversion followed by resampling to the working grid.
pub fn preprocess(image: &DynamicImage) -> Result<Array2<f64>> {
    let intensity = to_intensity(image)?;
    Ok(resize_bilinear(&intensity, TARGET_SIZE, TARGET_SIZE))
}
