pub mod types;

pub use types::{
    BatchOptions, CalibrationFactor, LabelMode, Measurement, ReportRow, RowStatus,
};
