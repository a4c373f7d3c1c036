use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibration factor in pixels per centimeter.
///
/// Only positive finite values are representable; construction goes through
/// the validating `new`/`parse` so downstream conversions never divide by
/// zero or propagate NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    /// Returns None unless `px_per_cm` is a positive finite number
    pub fn new(px_per_cm: f64) -> Option<Self> {
        if px_per_cm.is_finite() && px_per_cm > 0.0 {
            Some(Self(px_per_cm))
        } else {
            None
        }
    }

    /// Parse operator input. Accepts either `.` or `,` as the decimal
    /// separator (regional keyboards produce both).
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().replace(',', ".");
        normalized.parse::<f64>().ok().and_then(Self::new)
    }

    pub fn px_per_cm(&self) -> f64 {
        self.0
    }

    /// Convert a linear pixel measurement to centimeters
    pub fn to_cm(&self, px: f64) -> f64 {
        px / self.0
    }

    /// Convert a pixel area to square centimeters
    pub fn to_cm2(&self, px2: f64) -> f64 {
        px2 / (self.0 * self.0)
    }
}

impl fmt::Display for CalibrationFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-image measurement record with named, typed fields.
///
/// Length is always the longer rectangle side and width the shorter,
/// regardless of which axis the fit returned them on. Values carry full
/// precision; rounding is applied only when formatting output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub hull_area_px: f64,
    pub hull_area_cm2: f64,
    pub box_length_px: f64,
    pub box_width_px: f64,
    pub box_area_px: f64,
    pub box_area_cm2: f64,
    pub box_length_cm: f64,
    pub box_width_cm: f64,
}

impl Measurement {
    /// Build a measurement from raw pixel geometry. `side_a_px` and
    /// `side_b_px` are the rectangle sides in whatever order the fitting
    /// routine produced them.
    pub fn from_pixels(
        hull_area_px: f64,
        side_a_px: f64,
        side_b_px: f64,
        factor: CalibrationFactor,
    ) -> Self {
        let box_length_px = side_a_px.max(side_b_px);
        let box_width_px = side_a_px.min(side_b_px);
        let box_area_px = box_length_px * box_width_px;

        Self {
            hull_area_px,
            hull_area_cm2: factor.to_cm2(hull_area_px),
            box_length_px,
            box_width_px,
            box_area_px,
            box_area_cm2: factor.to_cm2(box_area_px),
            box_length_cm: factor.to_cm(box_length_px),
            box_width_cm: factor.to_cm(box_width_px),
        }
    }
}

/// Outcome of processing one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowStatus {
    /// Measured and both artifacts written
    Ok,
    /// Processing failed; numeric fields are zeroed
    Failed { reason: String },
    /// Measurement succeeded but an output image could not be persisted;
    /// the measured numbers are kept
    WriteFailed { reason: String },
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Ok => write!(f, "OK"),
            RowStatus::Failed { reason } => write!(f, "ERROR: {}", reason),
            RowStatus::WriteFailed { reason } => write!(f, "WRITE_ERROR: {}", reason),
        }
    }
}

/// One line of the batch report. Created per processed file, appended to
/// the report, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub file: String,
    pub status: RowStatus,
    pub measurement: Option<Measurement>,
    pub factor_px_cm: f64,
}

impl ReportRow {
    pub fn success(file: &str, measurement: Measurement, factor: CalibrationFactor) -> Self {
        Self {
            file: file.to_string(),
            status: RowStatus::Ok,
            measurement: Some(measurement),
            factor_px_cm: factor.px_per_cm(),
        }
    }

    pub fn failed(file: &str, reason: String, factor: CalibrationFactor) -> Self {
        Self {
            file: file.to_string(),
            status: RowStatus::Failed { reason },
            measurement: None,
            factor_px_cm: factor.px_per_cm(),
        }
    }

    pub fn write_failed(
        file: &str,
        reason: String,
        measurement: Measurement,
        factor: CalibrationFactor,
    ) -> Self {
        Self {
            file: file.to_string(),
            status: RowStatus::WriteFailed { reason },
            measurement: Some(measurement),
            factor_px_cm: factor.px_per_cm(),
        }
    }
}

/// Label placement strategy for overlay images
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LabelMode {
    /// Centered under the box, clamped to the image edges, flipped below
    /// the box when there is no room above it
    Smart,
    /// Legacy block at fixed top-left positions
    Fixed,
}

/// Batch runner configuration. Passed in explicitly so tests can inject
/// their own extension sets and filename conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Recognized image extensions, matched case-insensitively
    pub extensions: Vec<String>,
    /// Filename prefix for the annotated overlay artifact
    pub overlay_prefix: String,
    /// Filename prefix for the binary mask artifact
    pub mask_prefix: String,
    /// Name of the CSV report written into the output directory
    pub report_name: String,
    pub label_mode: LabelMode,
}

impl BatchOptions {
    /// Case-insensitive extension match against the configured set
    pub fn matches_extension(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extensions: [".jpg", ".jpeg", ".png", ".bmp", ".tif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overlay_prefix: "RESULT_".to_string(),
            mask_prefix: "BIN_".to_string(),
            report_name: "measurements.csv".to_string(),
            label_mode: LabelMode::Smart,
        }
    }
}
