// Overlay rendering module
// Composites the hull fill and box outline over the photo and places the
// measurement labels, either with smart clamped placement or at the legacy
// fixed positions.

use anyhow::Result;
use fishmetry_common::{LabelMode, Measurement};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Vector},
    imgproc,
    prelude::*,
};

use crate::shape::SubjectShape;

/// Blend weight of the hull fill over the base photo
const HULL_ALPHA: f64 = 0.4;
/// Hull fill color (BGR cyan)
const HULL_COLOR: (f64, f64, f64) = (255.0, 255.0, 0.0);
/// Box outline color (BGR red)
const BOX_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const BOX_THICKNESS: i32 = 2;

/// Vertical step between label lines
const LINE_STEP: i32 = 25;
/// Minimum distance labels keep from the image edges
const EDGE_MARGIN: i32 = 10;
const FONT_SCALE: f64 = 0.5;
const FONT_THICKNESS: i32 = 1;
/// Padding of the opaque backing rectangle around each label
const LABEL_PADDING: i32 = 4;

/// Render the full annotated overlay: hull fill, box outline, metric labels
pub fn render_overlay(
    base: &Mat,
    shape: &SubjectShape,
    measurement: &Measurement,
    mode: LabelMode,
) -> Result<Mat> {
    let mut out = render_shape(base, shape)?;

    match mode {
        LabelMode::Smart => {
            let lines = [
                format!(
                    "Fish: {:.1} cm2 | Box: {:.1} cm2",
                    measurement.hull_area_cm2, measurement.box_area_cm2
                ),
                format!(
                    "Dim (cm): {:.1} x {:.1} cm",
                    measurement.box_length_cm, measurement.box_width_cm
                ),
                format!(
                    "Dim (px): {:.0} x {:.0} px",
                    measurement.box_length_px, measurement.box_width_px
                ),
            ];
            draw_smart_labels(&mut out, shape, &lines)?;
        }
        LabelMode::Fixed => {
            let lines = [
                format!("AREA: {:.2} cm2", measurement.hull_area_cm2),
                format!(
                    "DIM: {:.1} x {:.1} cm",
                    measurement.box_length_cm, measurement.box_width_cm
                ),
            ];
            draw_fixed_labels(&mut out, &lines)?;
        }
    }

    Ok(out)
}

/// Draw the hull fill (alpha-blended) and the box outline, no labels.
/// The calibration helper uses this directly for its proof image.
pub fn render_shape(base: &Mat, shape: &SubjectShape) -> Result<Mat> {
    let mut tinted = base.try_clone()?;

    let mut hulls: Vector<Vector<Point>> = Vector::new();
    hulls.push(shape.hull.clone());
    imgproc::draw_contours(
        &mut tinted,
        &hulls,
        0,
        Scalar::new(HULL_COLOR.0, HULL_COLOR.1, HULL_COLOR.2, 0.0),
        -1,
        imgproc::LINE_8,
        &Mat::default(),
        i32::MAX,
        Point::new(0, 0),
    )?;

    let mut out = Mat::default();
    core::add_weighted(&tinted, HULL_ALPHA, base, 1.0 - HULL_ALPHA, 0.0, &mut out, -1)?;

    let mut box_points: Vector<Point> = Vector::new();
    for corner in &shape.corners {
        box_points.push(Point::new(corner.x.round() as i32, corner.y.round() as i32));
    }
    let mut boxes: Vector<Vector<Point>> = Vector::new();
    boxes.push(box_points);
    imgproc::draw_contours(
        &mut out,
        &boxes,
        0,
        Scalar::new(BOX_COLOR.0, BOX_COLOR.1, BOX_COLOR.2, 0.0),
        BOX_THICKNESS,
        imgproc::LINE_8,
        &Mat::default(),
        i32::MAX,
        Point::new(0, 0),
    )?;

    Ok(out)
}

/// Place the label block near the box: horizontally centered on the box and
/// clamped to the image edges, above the box when there is room for the
/// whole block, otherwise flipped below it.
fn draw_smart_labels(img: &mut Mat, shape: &SubjectShape, lines: &[String]) -> Result<()> {
    let img_width = img.cols();

    let center_x =
        (shape.corners.iter().map(|p| p.x).sum::<f32>() / shape.corners.len() as f32) as i32;
    let min_y = shape
        .corners
        .iter()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min) as i32;
    let max_y = shape
        .corners
        .iter()
        .map(|p| p.y)
        .fold(f32::NEG_INFINITY, f32::max) as i32;

    // Flip below the box when the block does not fit above it
    let block_height = lines.len() as i32 * LINE_STEP;
    let (start_y, step) = if min_y < block_height + EDGE_MARGIN {
        (max_y + 20, LINE_STEP)
    } else {
        (min_y - 10, -LINE_STEP)
    };

    // Growing upward, the lines are drawn in reverse so the first line ends
    // up on top and the last stays closest to the shape
    let ordered: Vec<&String> = if step > 0 {
        lines.iter().collect()
    } else {
        lines.iter().rev().collect()
    };

    let mut y = start_y;
    for text in ordered {
        let mut baseline = 0;
        let size = imgproc::get_text_size(
            text,
            imgproc::FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            FONT_THICKNESS,
            &mut baseline,
        )?;

        // Center on the box, then clamp to the edge margins
        let mut x = center_x - size.width / 2;
        if x < EDGE_MARGIN {
            x = EDGE_MARGIN;
        } else if x + size.width > img_width - EDGE_MARGIN {
            x = img_width - size.width - EDGE_MARGIN;
        }

        // Opaque backing keeps the text readable over busy image content
        let backing = Rect::new(
            x - LABEL_PADDING,
            y - size.height - LABEL_PADDING,
            size.width + 2 * LABEL_PADDING,
            size.height + baseline + 2 * LABEL_PADDING,
        );
        imgproc::rectangle(img, backing, Scalar::all(0.0), -1, imgproc::LINE_8, 0)?;

        imgproc::put_text(
            img,
            text,
            Point::new(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
            FONT_THICKNESS,
            imgproc::LINE_AA,
            false,
        )?;

        y += step;
    }

    Ok(())
}

/// Legacy label block at hard-coded top-left positions
pub fn draw_fixed_labels(img: &mut Mat, lines: &[String]) -> Result<()> {
    let mut y = 50;
    for text in lines {
        imgproc::put_text(
            img,
            text,
            Point::new(20, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            imgproc::LINE_AA,
            false,
        )?;
        y += 50;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::segment;
    use crate::shape::extract_shape;
    use fishmetry_common::CalibrationFactor;
    use opencv::core::{Size, Vec3b};

    /// White canvas with one filled black ellipse, segmented and extracted
    fn scene(center: Point) -> (Mat, SubjectShape) {
        let mut img = Mat::new_rows_cols_with_default(
            300,
            400,
            core::CV_8UC3,
            Scalar::new(255.0, 255.0, 255.0, 0.0),
        )
        .unwrap();
        imgproc::ellipse(
            &mut img,
            center,
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
        let shape = extract_shape(&mask).unwrap();
        (img, shape)
    }

    fn measurement_for(shape: &SubjectShape) -> Measurement {
        let factor = CalibrationFactor::new(10.0).unwrap();
        let (a, b) = shape.side_lengths();
        Measurement::from_pixels(shape.hull_area_px, a, b, factor)
    }

    /// Rows where the labeled render differs from the label-free one.
    /// The difference is exactly the label backing and glyph pixels.
    fn label_rows(labeled: &Mat, plain: &Mat) -> Vec<i32> {
        let mut rows = Vec::new();
        for y in 0..labeled.rows() {
            for x in 0..labeled.cols() {
                let a = labeled.at_2d::<Vec3b>(y, x).unwrap();
                let b = plain.at_2d::<Vec3b>(y, x).unwrap();
                if a != b {
                    rows.push(y);
                    break;
                }
            }
        }
        rows
    }

    #[test]
    fn test_labels_sit_above_when_space_allows() {
        let (img, shape) = scene(Point::new(200, 150));
        let m = measurement_for(&shape);

        let plain = render_shape(&img, &shape).unwrap();
        let out = render_overlay(&img, &shape, &m, LabelMode::Smart).unwrap();

        let min_y = shape
            .corners
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min) as i32;
        let rows = label_rows(&out, &plain);
        assert!(!rows.is_empty(), "expected label pixels");
        assert!(
            rows.iter().all(|&y| y < min_y),
            "labels must sit above the box top {}, lowest label row {:?}",
            min_y,
            rows.last()
        );
    }

    #[test]
    fn test_labels_flip_below_when_near_top_edge() {
        // Box top lands inside the margin, no room for the block above
        let (img, shape) = scene(Point::new(200, 40));
        let m = measurement_for(&shape);

        let plain = render_shape(&img, &shape).unwrap();
        let out = render_overlay(&img, &shape, &m, LabelMode::Smart).unwrap();

        let max_y = shape
            .corners
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max) as i32;
        let rows = label_rows(&out, &plain);
        assert!(!rows.is_empty(), "expected label pixels");
        assert!(
            rows.iter().all(|&y| y > max_y),
            "labels must sit below the box bottom {}, highest label row {:?}",
            max_y,
            rows.first()
        );
    }

    #[test]
    fn test_labels_clamp_to_left_edge() {
        // Subject near the left edge pulls the centered labels past the
        // margin; clamping must keep the backing inside it
        let (img, shape) = scene(Point::new(60, 150));
        let m = measurement_for(&shape);

        let plain = render_shape(&img, &shape).unwrap();
        let out = render_overlay(&img, &shape, &m, LabelMode::Smart).unwrap();

        for y in 0..out.rows() {
            for x in 0..(EDGE_MARGIN - LABEL_PADDING) {
                let a = out.at_2d::<Vec3b>(y, x).unwrap();
                let b = plain.at_2d::<Vec3b>(y, x).unwrap();
                assert_eq!(a, b, "label pixels leaked into the margin at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_fixed_mode_renders() {
        let (img, shape) = scene(Point::new(200, 150));
        let m = measurement_for(&shape);

        let out = render_overlay(&img, &shape, &m, LabelMode::Fixed).unwrap();
        assert_eq!(out.size().unwrap(), img.size().unwrap());
    }
}
