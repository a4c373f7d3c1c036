// Report export module
// Streams one CSV row per processed file with a fixed column set

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fishmetry_common::ReportRow;

/// Fixed report header. Linear dimensions in cm carry two decimals, pixel
/// areas are written as whole numbers.
pub const REPORT_HEADER: [&str; 11] = [
    "file",
    "status",
    "box_length_cm",
    "box_width_cm",
    "box_area_cm2",
    "hull_area_cm2",
    "box_length_px",
    "box_width_px",
    "box_area_px",
    "hull_area_px",
    "factor_px_cm",
];

/// Append-only CSV writer for the batch report. Rows are flushed as they
/// are written so a partially completed batch still leaves a usable file.
pub struct ReportWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl ReportWriter {
    /// Create the report file and write the header. Failure here is fatal
    /// for the batch; nothing has been processed yet.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("could not create report file {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(REPORT_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, row: &ReportRow) -> Result<()> {
        let (length_cm, width_cm, box_cm2, hull_cm2, length_px, width_px, box_px, hull_px) =
            match &row.measurement {
                Some(m) => (
                    format!("{:.2}", m.box_length_cm),
                    format!("{:.2}", m.box_width_cm),
                    format!("{:.2}", m.box_area_cm2),
                    format!("{:.2}", m.hull_area_cm2),
                    format!("{:.2}", m.box_length_px),
                    format!("{:.2}", m.box_width_px),
                    format!("{:.0}", m.box_area_px),
                    format!("{:.0}", m.hull_area_px),
                ),
                None => (
                    "0.00".to_string(),
                    "0.00".to_string(),
                    "0.00".to_string(),
                    "0.00".to_string(),
                    "0.00".to_string(),
                    "0.00".to_string(),
                    "0".to_string(),
                    "0".to_string(),
                ),
            };

        let record = [
            row.file.clone(),
            row.status.to_string(),
            length_cm,
            width_cm,
            box_cm2,
            hull_cm2,
            length_px,
            width_px,
            box_px,
            hull_px,
            row.factor_px_cm.to_string(),
        ];
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fishmetry_common::{CalibrationFactor, Measurement};

    #[test]
    fn test_header_and_success_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurements.csv");

        let factor = CalibrationFactor::new(10.0).unwrap();
        let m = Measurement::from_pixels(3927.0, 100.0, 50.0, factor);

        let mut writer = ReportWriter::create(&path).unwrap();
        writer.append(&ReportRow::success("fish.jpg", m, factor)).unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file,status,box_length_cm,box_width_cm,box_area_cm2,hull_area_cm2,\
             box_length_px,box_width_px,box_area_px,hull_area_px,factor_px_cm"
        );
        assert_eq!(
            lines.next().unwrap(),
            "fish.jpg,OK,10.00,5.00,50.00,39.27,100.00,50.00,5000,3927,10"
        );
    }

    #[test]
    fn test_failed_row_zeroes_numeric_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurements.csv");

        let factor = CalibrationFactor::new(75.87).unwrap();
        let mut writer = ReportWriter::create(&path).unwrap();
        writer
            .append(&ReportRow::failed("blank.jpg", "zero contours found in mask".to_string(), factor))
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "blank.jpg,ERROR: zero contours found in mask,0.00,0.00,0.00,0.00,0.00,0.00,0,0,75.87"
        );
    }

    #[test]
    fn test_write_failed_row_keeps_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurements.csv");

        let factor = CalibrationFactor::new(10.0).unwrap();
        let m = Measurement::from_pixels(3927.0, 100.0, 50.0, factor);

        let mut writer = ReportWriter::create(&path).unwrap();
        writer
            .append(&ReportRow::write_failed(
                "fish.jpg",
                "image encoder refused the path".to_string(),
                m,
                factor,
            ))
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert!(row.starts_with("fish.jpg,WRITE_ERROR: image encoder refused the path,10.00,5.00,"));
    }

    #[test]
    fn test_diagnostic_with_comma_stays_one_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measurements.csv");

        let factor = CalibrationFactor::new(10.0).unwrap();
        let mut writer = ReportWriter::create(&path).unwrap();
        writer
            .append(&ReportRow::failed("x.jpg", "bad header, truncated file".to_string(), factor))
            .unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        // The status field is quoted, so the column count stays fixed
        assert!(row.contains("\"ERROR: bad header, truncated file\""));
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), REPORT_HEADER.len());
    }
}
