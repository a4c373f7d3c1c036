// Subject segmentation module
// Classical threshold pipeline: the photos come from a fixed station where
// the fish is darker than an even, light background.

use std::path::Path;

use anyhow::{bail, Context, Result};
use opencv::{
    core::{self, Mat, Point, Size, BORDER_DEFAULT},
    imgcodecs, imgproc,
    prelude::*,
};

/// Gaussian kernel size applied before thresholding
const BLUR_KERNEL: i32 = 9;
/// Diameter of the elliptical structuring element for the opening pass
const OPEN_KERNEL: i32 = 5;
const OPEN_ITERATIONS: i32 = 2;

/// Read an image file into a BGR Mat, failing explicitly on unreadable files
pub fn load_image(path: &Path) -> Result<Mat> {
    let path_str = path
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))?;
    let img = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)?;
    if img.empty() {
        bail!("could not read image {} (corrupt file or unsupported format)", path.display());
    }
    Ok(img)
}

/// Segment the subject out of a color photograph.
///
/// Grayscale -> 9x9 Gaussian blur -> Otsu threshold with inverted polarity
/// -> morphological opening to drop speckle noise. Returns the binary mask
/// with the subject as foreground.
///
/// A mask with zero foreground pixels is reported as an explicit error
/// rather than flowing downstream as a zero-area measurement.
pub fn segment(img: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    imgproc::cvt_color(
        img,
        &mut gray,
        imgproc::COLOR_BGR2GRAY,
        0,
    )?;

    let mut blurred = Mat::default();
    imgproc::gaussian_blur(
        &gray,
        &mut blurred,
        Size::new(BLUR_KERNEL, BLUR_KERNEL),
        0.0,
        0.0,
        BORDER_DEFAULT,
    )?;

    // Inverted polarity: the darker subject becomes foreground
    let mut thresh = Mat::default();
    imgproc::threshold(
        &blurred,
        &mut thresh,
        0.0,
        255.0,
        imgproc::THRESH_BINARY_INV + imgproc::THRESH_OTSU,
    )?;

    let kernel = imgproc::get_structuring_element(
        imgproc::MORPH_ELLIPSE,
        Size::new(OPEN_KERNEL, OPEN_KERNEL),
        Point::new(-1, -1),
    )?;
    let mut mask = Mat::default();
    imgproc::morphology_ex(
        &thresh,
        &mut mask,
        imgproc::MORPH_OPEN,
        &kernel,
        Point::new(-1, -1),
        OPEN_ITERATIONS,
        core::BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    if core::count_non_zero(&mask)? == 0 {
        bail!("no subject detected (segmentation produced an empty mask)");
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Scalar;

    fn white_canvas(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(
            height,
            width,
            core::CV_8UC3,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_dark_subject_becomes_foreground() {
        let mut img = white_canvas(400, 300);
        imgproc::ellipse(
            &mut img,
            Point::new(200, 150),
            Size::new(50, 25),
            0.0,
            0.0,
            360.0,
            Scalar::all(0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let mask = segment(&img).unwrap();
        let foreground = core::count_non_zero(&mask).unwrap();

        // Roughly the ellipse area (pi * 50 * 25), give or take the blurred
        // edge and the opening pass
        assert!(
            foreground > 3300 && foreground < 4500,
            "foreground pixel count = {}",
            foreground
        );
    }

    #[test]
    fn test_blank_image_is_rejected() {
        let img = white_canvas(400, 300);
        let err = segment(&img).unwrap_err();
        assert!(err.to_string().contains("no subject detected"), "got: {}", err);
    }

    #[test]
    fn test_load_image_missing_file() {
        let err = load_image(Path::new("/nonexistent/fish.jpg")).unwrap_err();
        assert!(err.to_string().contains("could not read image"), "got: {}", err);
    }
}
