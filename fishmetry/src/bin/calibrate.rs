use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fishmetry_common::{CalibrationFactor, Measurement};
use opencv::core::Vector;
use opencv::imgcodecs;

use fishmetry::{overlay, segmentation, shape};

/// Derive the px/cm calibration factor from one reference photograph of a
/// subject with a known real-world length
#[derive(Parser, Debug)]
#[command(name = "calibrate")]
#[command(about = "Derive the calibration factor from a reference fish of known length", long_about = None)]
struct Args {
    /// Reference image containing a single subject
    #[arg(short, long)]
    image: String,

    /// Known real-world length of the subject in centimeters
    #[arg(short, long)]
    length: f64,

    /// Path for the annotated proof image
    #[arg(short, long, default_value = "calibration_proof.jpg")]
    output: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.length.is_finite() || args.length <= 0.0 {
        bail!("known length must be a positive number of centimeters, got {}", args.length);
    }

    println!("Fishmetry - Calibration Helper");
    println!("==============================");
    println!("Reference: {}", args.image);
    println!("Known length: {} cm", args.length);
    println!();

    let img = segmentation::load_image(Path::new(&args.image))?;
    let mask = segmentation::segment(&img)?;
    let subject = shape::extract_shape(&mask)?;

    let (side_a, side_b) = subject.side_lengths();
    let length_px = side_a.max(side_b);

    // Reverse derivation: if the subject spans length_px pixels over the
    // known length, one centimeter spans length_px / length pixels
    let factor = CalibrationFactor::new(length_px / args.length)
        .context("derived factor is not positive")?;

    let measurement = Measurement::from_pixels(subject.hull_area_px, side_a, side_b, factor);

    println!("--- Factor derivation ---");
    println!("Detected length: {:.2} px", length_px);
    println!("{:.2} px / {} cm = {:.4} px/cm", length_px, args.length, factor.px_per_cm());
    println!();
    println!("--- Check measurements ---");
    println!(
        "Width: {:.0} px -> {:.2} cm",
        measurement.box_width_px, measurement.box_width_cm
    );
    println!(
        "Area:  {:.0} px2 -> {:.2} cm2",
        measurement.hull_area_px, measurement.hull_area_cm2
    );

    let mut proof = overlay::render_shape(&img, &subject)?;
    overlay::draw_fixed_labels(
        &mut proof,
        &[
            format!("FACTOR: {:.2} px/cm", factor.px_per_cm()),
            format!("AREA: {:.2} cm2", measurement.hull_area_cm2),
        ],
    )?;

    if !imgcodecs::imwrite(&args.output, &proof, &Vector::new())? {
        bail!("could not write proof image to {}", args.output);
    }
    println!();
    println!("Proof image saved to: {}", args.output);

    Ok(())
}
