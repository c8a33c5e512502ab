use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::gaussian_blur_f32;

/// Gaussian sigma for the unsharp mask variant.
const SHARPEN_SIGMA: f32 = 3.0;
/// Gaussian weighting of the local neighbourhood for thresholding (31 px window).
const ADAPTIVE_SIGMA: f32 = 5.0;
/// A pixel stays white unless it is this much darker than its neighbourhood.
const ADAPTIVE_OFFSET: i32 = 8;

/// Enhancement variants of a crop, in the order they are tried by the reader.
///
/// Lighting is evened out with histogram equalization first; every variant
/// derives from the equalized grayscale.
pub fn generate_variants(img: &DynamicImage) -> Vec<(&'static str, DynamicImage)> {
    let gray = equalize_histogram(&img.to_luma8());
    let stretched = contrast_stretch(&gray);
    let sharp = image::imageops::unsharpen(&gray, SHARPEN_SIGMA, 0);
    let thresholded = adaptive_threshold(&gray);

    vec![
        ("orig", DynamicImage::ImageLuma8(gray)),
        ("stretch", DynamicImage::ImageLuma8(stretched)),
        ("sharp", DynamicImage::ImageLuma8(sharp)),
        ("thr", DynamicImage::ImageLuma8(thresholded)),
    ]
}

/// Linear stretch of the intensity range to 0..=255.
fn contrast_stretch(gray: &GrayImage) -> GrayImage {
    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px <= min_px {
        // Uniform image.
        return gray.clone();
    }

    let range = (max_px - min_px) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([((p - min_px) as u32 * 255 / range) as u8])
    })
}

/// Binarize against a Gaussian-weighted local mean, so uneven lighting
/// across a tag does not swallow the text.
fn adaptive_threshold(gray: &GrayImage) -> GrayImage {
    let local = gaussian_blur_f32(gray, ADAPTIVE_SIGMA);

    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0] as i32;
        let t = local.get_pixel(x, y)[0] as i32 - ADAPTIVE_OFFSET;
        Luma([if p > t { 255 } else { 0 }])
    })
}
