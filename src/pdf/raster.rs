//! Conversion of library pixmaps into host images

use image::{RgbaImage, imageops};
use rayon::prelude::*;

use super::engine::RawPixmap;
use super::error::EngineError;

/// Above this many pixels rows are converted in parallel
const PARALLEL_PIXEL_THRESHOLD: usize = 200_000;

/// Convert an interleaved RGB or RGBA pixmap into an unpremultiplied RGBA image.
///
/// RGB input gets an opaque alpha channel.
pub fn pixmap_to_rgba(pixmap: &RawPixmap) -> Result<RgbaImage, EngineError> {
    let n = usize::from(pixmap.n);
    if n != 3 && n != 4 {
        return Err(EngineError::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width as usize;
    let height = pixmap.height as usize;
    let stride = pixmap.stride;
    let row_bytes = width * n;
    if row_bytes > stride || pixmap.samples.len() < stride.saturating_mul(height) {
        return Err(EngineError::generic("Pixmap buffer size mismatch"));
    }

    let mut out = vec![0u8; width * height * 4];
    if width == 0 || height == 0 {
        return image_from_raw(pixmap.width, pixmap.height, out);
    }

    let convert_row = |(y, dst): (usize, &mut [u8])| {
        let row = &pixmap.samples[y * stride..y * stride + row_bytes];
        for (src, px) in row.chunks_exact(n).zip(dst.chunks_exact_mut(4)) {
            px[0] = src[0];
            px[1] = src[1];
            px[2] = src[2];
            px[3] = if n == 4 { src[3] } else { 0xff };
        }
    };

    if width * height >= PARALLEL_PIXEL_THRESHOLD {
        out.par_chunks_mut(width * 4).enumerate().for_each(convert_row);
    } else {
        out.chunks_mut(width * 4).enumerate().for_each(convert_row);
    }

    image_from_raw(pixmap.width, pixmap.height, out)
}

fn image_from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage, EngineError> {
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| EngineError::generic("Pixel buffer does not match image size"))
}

/// Copy `image` into a `width` x `height` canvas, cropping or padding with
/// opaque white.
///
/// The library sizes its output from the page bounds times the transform,
/// which can be a pixel off the requested size after rounding.
#[must_use]
pub fn fit_to_size(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.width() == width && image.height() == height {
        return image;
    }
    let mut canvas = RgbaImage::from_pixel(width, height, image::Rgba([0xff, 0xff, 0xff, 0xff]));
    imageops::replace(&mut canvas, &image, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixmap(width: u32, height: u32, n: u8, stride: usize, fill: &[u8]) -> RawPixmap {
        let mut samples = Vec::with_capacity(stride * height as usize);
        for _ in 0..height {
            let mut row: Vec<u8> = fill.iter().copied().cycle().take(width as usize * usize::from(n)).collect();
            row.resize(stride, 0xee);
            samples.extend(row);
        }
        RawPixmap {
            width,
            height,
            n,
            stride,
            samples,
        }
    }

    #[test]
    fn rgba_bytes_are_copied_in_order() {
        let image = pixmap_to_rgba(&pixmap(2, 2, 4, 8, &[10, 20, 30, 40])).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [10, 20, 30, 40]);
    }

    #[test]
    fn rgb_gets_opaque_alpha_and_stride_padding_is_skipped() {
        let image = pixmap_to_rgba(&pixmap(3, 2, 3, 12, &[1, 2, 3])).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        for px in image.pixels() {
            assert_eq!(px.0, [1, 2, 3, 0xff]);
        }
    }

    #[test]
    fn large_pixmaps_convert_in_parallel_identically() {
        let image = pixmap_to_rgba(&pixmap(500, 500, 3, 1500, &[9, 8, 7])).unwrap();
        assert_eq!(image.get_pixel(499, 499).0, [9, 8, 7, 0xff]);
        assert_eq!(image.get_pixel(0, 0).0, [9, 8, 7, 0xff]);
    }

    #[test]
    fn unsupported_channel_count_is_rejected() {
        assert!(pixmap_to_rgba(&pixmap(2, 2, 1, 2, &[0])).is_err());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut raw = pixmap(4, 4, 4, 16, &[0, 0, 0, 0]);
        raw.samples.truncate(20);
        assert!(pixmap_to_rgba(&raw).is_err());
    }

    #[test]
    fn fit_to_size_pads_with_white() {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        let fitted = fit_to_size(image, 3, 1);
        assert_eq!(fitted.dimensions(), (3, 1));
        assert_eq!(fitted.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(fitted.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn fit_to_size_copies_translucent_pixels_unblended() {
        let mut image = RgbaImage::from_pixel(4, 3, image::Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 1, image::Rgba([10, 20, 30, 0]));
        image.put_pixel(3, 2, image::Rgba([1, 2, 3, 4]));

        let fitted = fit_to_size(image, 2, 5);
        assert_eq!(fitted.dimensions(), (2, 5));
        assert_eq!(fitted.get_pixel(1, 1).0, [10, 20, 30, 0]);
        assert_eq!(fitted.get_pixel(0, 2).0, [0, 0, 0, 255]);
        assert_eq!(fitted.get_pixel(1, 4).0, [255, 255, 255, 255]);
    }
}
