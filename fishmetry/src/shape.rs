// Shape extraction module
// Largest external contour -> convex hull -> minimum-area rotated rectangle

use anyhow::{bail, Result};
use opencv::{
    core::{Mat, Point, Point2f, RotatedRect, Vector},
    imgproc::{self, CHAIN_APPROX_SIMPLE, RETR_EXTERNAL},
};

/// Geometry extracted from a binary mask
#[derive(Debug)]
pub struct SubjectShape {
    /// Convex hull of the largest foreground region. Concavities (fins,
    /// tail notch) are absorbed into the hull.
    pub hull: Vector<Point>,
    /// Hull area in px^2
    pub hull_area_px: f64,
    /// Minimum-area rotated rectangle fitted around the hull
    pub rect: RotatedRect,
    /// The rectangle's four corner points
    pub corners: [Point2f; 4],
}

impl SubjectShape {
    /// Raw rectangle side lengths in px, in whatever order the fit
    /// returned them
    pub fn side_lengths(&self) -> (f64, f64) {
        (self.rect.size.width as f64, self.rect.size.height as f64)
    }
}

/// Extract the subject geometry from a binary mask.
///
/// The subject is taken to be the largest connected foreground region;
/// smaller blobs are residual noise the opening pass did not remove.
pub fn extract_shape(mask: &Mat) -> Result<SubjectShape> {
    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        mask,
        &mut contours,
        RETR_EXTERNAL,
        CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    if contours.is_empty() {
        bail!("zero contours found in mask");
    }

    let mut best_contour = contours.get(0)?;
    let mut best_area = imgproc::contour_area(&best_contour, false)?;
    for contour in contours.iter().skip(1) {
        let area = imgproc::contour_area(&contour, false)?;
        if area > best_area {
            best_area = area;
            best_contour = contour;
        }
    }

    let mut hull = Vector::<Point>::new();
    imgproc::convex_hull(&best_contour, &mut hull, false, true)?;

    let hull_area_px = imgproc::contour_area(&hull, false)?;
    let rect = imgproc::min_area_rect(&hull)?;

    // RotatedRect::points fills the vertices directly into a fixed array
    let mut corners = [Point2f::new(0.0, 0.0); 4];
    rect.points(&mut corners)?;

    Ok(SubjectShape {
        hull,
        hull_area_px,
        rect,
        corners,
    })
}
