//! Tensor preparation shared by the ONNX adapters.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Gear classifier input edge length.
pub const GEAR_INPUT_SIZE: u32 = 128;
/// Per-channel mean the gear classifier was trained with (RGB).
pub const GEAR_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation the gear classifier was trained with (RGB).
pub const GEAR_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// Fill value for the detector's letterbox padding.
pub const LETTERBOX_FILL: u8 = 114;

/// Resize to `width`x`height` and lay the pixels out as a 1x3xHxW tensor.
///
/// Each channel value is scaled to [0, 1], then normalized as
/// `(v - mean[c]) / std[c]`. Frames are already RGB, which is the channel
/// order both models expect.
pub fn to_nchw(
    image: &RgbImage,
    width: u32,
    height: u32,
    mean: [f32; 3],
    std: [f32; 3],
) -> Vec<f32> {
    let resized;
    let source = if image.width() == width && image.height() == height {
        image
    } else {
        resized = imageops::resize(image, width, height, FilterType::Triangle);
        &resized
    };

    let plane = (width as usize) * (height as usize);
    let mut out = vec![0.0f32; plane * 3];
    for (x, y, pixel) in source.enumerate_pixels() {
        let offset = (y as usize) * (width as usize) + x as usize;
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            out[channel * plane + offset] = (value - mean[channel]) / std[channel];
        }
    }
    out
}

/// Gear classifier input: 128x128, ImageNet-normalized.
pub fn gear_tensor(image: &RgbImage) -> Vec<f32> {
    to_nchw(image, GEAR_INPUT_SIZE, GEAR_INPUT_SIZE, GEAR_MEAN, GEAR_STD)
}

/// Fit `image` into a `size`x`size` square without distortion, centred on
/// a gray background.
pub fn letterbox(image: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == size && h == size {
        return image.clone();
    }
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    if w == 0 || h == 0 || size == 0 {
        return canvas;
    }
    let scale = (size as f64 / w as f64).min(size as f64 / h as f64);
    let new_w = ((w as f64 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f64 * scale).round() as u32).clamp(1, size);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let left = (size - new_w) / 2;
    let top = (size - new_h) / 2;
    imageops::replace(&mut canvas, &resized, left as i64, top as i64);
    canvas
}

/// Person detector input: letterboxed square, scaled to [0, 1] without
/// normalization.
pub fn detector_tensor(image: &RgbImage, size: u32) -> Vec<f32> {
    to_nchw(&letterbox(image, size), size, size, [0.0; 3], [1.0; 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_tensor_has_planar_layout() {
        let plane = 128 * 128;
        let small = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        assert_eq!(gear_tensor(&small).len(), plane * 3);

        let image = RgbImage::from_pixel(128, 128, Rgb([255, 0, 128]));
        let tensor = gear_tensor(&image);
        assert_eq!(tensor.len(), plane * 3);

        let expected = |v: f32, c: usize| (v / 255.0 - GEAR_MEAN[c]) / GEAR_STD[c];
        let close = |a: f32, b: f32| (a - b).abs() < 1e-4;
        assert!(close(tensor[0], expected(255.0, 0)));
        assert!(close(tensor[plane], expected(0.0, 1)));
        assert!(close(tensor[2 * plane + 500], expected(128.0, 2)));
    }

    #[test]
    fn detector_tensor_is_unit_scaled() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 51, 0]));
        let tensor = detector_tensor(&image, 4);
        assert_eq!(tensor.len(), 48);
        assert!((tensor[0] - 1.0).abs() < 1e-6);
        assert!((tensor[16] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[32], 0.0);
    }

    #[test]
    fn wide_frames_are_padded_not_stretched() {
        let wide = RgbImage::from_pixel(8, 4, Rgb([255, 51, 0]));
        let boxed = letterbox(&wide, 8);
        assert_eq!(boxed.dimensions(), (8, 8));
        for x in 0..8 {
            assert_eq!(boxed.get_pixel(x, 0), &Rgb([LETTERBOX_FILL; 3]));
            assert_eq!(boxed.get_pixel(x, 1), &Rgb([LETTERBOX_FILL; 3]));
            assert_eq!(boxed.get_pixel(x, 2), &Rgb([255, 51, 0]));
            assert_eq!(boxed.get_pixel(x, 5), &Rgb([255, 51, 0]));
            assert_eq!(boxed.get_pixel(x, 6), &Rgb([LETTERBOX_FILL; 3]));
        }

        let tensor = detector_tensor(&wide, 8);
        let fill = LETTERBOX_FILL as f32 / 255.0;
        assert!((tensor[0] - fill).abs() < 1e-6);
        assert!((tensor[2 * 8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tall_frames_are_padded_left_and_right() {
        let tall = RgbImage::from_pixel(4, 8, Rgb([0, 0, 0]));
        let boxed = letterbox(&tall, 4);
        assert_eq!(boxed.dimensions(), (4, 4));
        assert_eq!(boxed.get_pixel(0, 2), &Rgb([LETTERBOX_FILL; 3]));
        assert_eq!(boxed.get_pixel(1, 2), &Rgb([0, 0, 0]));
        assert_eq!(boxed.get_pixel(2, 2), &Rgb([0, 0, 0]));
        assert_eq!(boxed.get_pixel(3, 2), &Rgb([LETTERBOX_FILL; 3]));
    }
}
