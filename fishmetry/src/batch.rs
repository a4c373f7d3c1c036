// Batch runner module
// Walks the input directory, runs the measurement pipeline per image, and
// accumulates the CSV report plus the two debug artifacts per success.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fishmetry_common::{BatchOptions, CalibrationFactor, LabelMode, Measurement, ReportRow};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;

use crate::report::ReportWriter;
use crate::{overlay, segmentation, shape};

/// Everything the pipeline produced for one image
pub struct ProcessedImage {
    pub measurement: Measurement,
    pub overlay: Mat,
    pub mask: Mat,
}

/// Tally of one batch run
#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub write_failed: usize,
    pub report_path: PathBuf,
}

/// Run the full pipeline on one file: load, segment, extract, measure,
/// render. Any stage error surfaces as the per-file diagnostic.
pub fn process_image(
    path: &Path,
    factor: CalibrationFactor,
    labels: LabelMode,
) -> Result<ProcessedImage> {
    let img = segmentation::load_image(path)?;
    let mask = segmentation::segment(&img)?;
    let subject = shape::extract_shape(&mask)?;

    let (side_a, side_b) = subject.side_lengths();
    let measurement = Measurement::from_pixels(subject.hull_area_px, side_a, side_b, factor);

    let rendered = overlay::render_overlay(&img, &subject, &measurement, labels)?;

    Ok(ProcessedImage {
        measurement,
        overlay: rendered,
        mask,
    })
}

/// Process every recognized image in `input_dir`, writing artifacts and the
/// report into `output_dir`.
///
/// Per-file errors are recorded in the report and the batch continues; the
/// only fatal error after validation is a report file that cannot be
/// created.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    factor: CalibrationFactor,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    // A file path is accepted as shorthand for its directory
    let input_dir = if input_dir.is_file() {
        println!("Input is a file, using its parent directory.");
        match input_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    } else {
        input_dir
    };

    if !input_dir.is_dir() {
        bail!("input directory does not exist: {}", input_dir.display());
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("could not create output directory {}", output_dir.display()))?;

    // Sorted order keeps runs deterministic
    let mut all_names: Vec<String> = fs::read_dir(input_dir)
        .with_context(|| format!("could not list {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    all_names.sort();

    let images: Vec<String> = all_names
        .iter()
        .filter(|name| options.matches_extension(name))
        .cloned()
        .collect();

    let report_path = output_dir.join(&options.report_name);
    let mut report = ReportWriter::create(&report_path)?;

    if images.is_empty() {
        println!("No images matched the recognized extensions in {}", input_dir.display());
        if !all_names.is_empty() {
            println!("Directory contains, for example:");
            for name in all_names.iter().take(5) {
                println!("  - {}", name);
            }
        }
        return Ok(BatchSummary {
            total: 0,
            succeeded: 0,
            failed: 0,
            write_failed: 0,
            report_path,
        });
    }

    println!("Processing {} image(s)...", images.len());

    let mut succeeded = 0;
    let mut failed = 0;
    let mut write_failed = 0;

    for (i, name) in images.iter().enumerate() {
        println!("\n--- Image {}/{}: {} ---", i + 1, images.len(), name);

        let path = input_dir.join(name);
        match process_image(&path, factor, options.label_mode) {
            Ok(processed) => {
                let overlay_path = output_dir.join(format!("{}{}", options.overlay_prefix, name));
                let mask_path = output_dir.join(format!("{}{}", options.mask_prefix, name));

                match write_artifacts(&overlay_path, &processed.overlay, &mask_path, &processed.mask) {
                    Ok(()) => {
                        println!("  Fish area: {:.1} cm2", processed.measurement.hull_area_cm2);
                        report.append(&ReportRow::success(name, processed.measurement, factor))?;
                        succeeded += 1;
                    }
                    Err(e) => {
                        println!("  Artifact write failed: {:#}", e);
                        report.append(&ReportRow::write_failed(
                            name,
                            format!("{:#}", e),
                            processed.measurement,
                            factor,
                        ))?;
                        write_failed += 1;
                    }
                }
            }
            Err(e) => {
                println!("  Failed: {:#}", e);
                report.append(&ReportRow::failed(name, format!("{:#}", e), factor))?;
                failed += 1;
            }
        }
    }

    println!();
    println!(
        "Batch complete: {} ok, {} failed, {} measured but not saved",
        succeeded, failed, write_failed
    );
    println!("Report written to: {}", report_path.display());

    Ok(BatchSummary {
        total: images.len(),
        succeeded,
        failed,
        write_failed,
        report_path,
    })
}

/// Persist the overlay and mask artifacts, checking the encoder result of
/// each write
fn write_artifacts(
    overlay_path: &Path,
    overlay: &Mat,
    mask_path: &Path,
    mask: &Mat,
) -> Result<()> {
    write_image(overlay_path, overlay)?;
    write_image(mask_path, mask)?;
    Ok(())
}

fn write_image(path: &Path, img: &Mat) -> Result<()> {
    let path_str = path
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))?;
    let written = imgcodecs::imwrite(path_str, img, &Vector::new())
        .with_context(|| format!("could not write {}", path.display()))?;
    if !written {
        bail!("image encoder refused {}", path.display());
    }
    Ok(())
}
