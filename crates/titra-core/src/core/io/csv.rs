use crate::core::analysis::AnalysisResult;
use crate::core::models::reading::Reading;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Serialize)]
struct SummaryRow {
    quantity: &'static str,
    value: f64,
    samples: Option<usize>,
}

/// Writes the reading table as `volume_ml,ph` rows, in recording order.
pub fn write_readings<W: Write>(readings: &[Reading], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for reading in readings {
        wtr.serialize(reading)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes the analysis summary as `quantity,value,samples` rows.
///
/// `samples` is empty for the isoelectric point and `0` for a pKa that fell back to its
/// literature value.
pub fn write_summary<W: Write>(result: &AnalysisResult, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.serialize(SummaryRow {
        quantity: "pka1",
        value: result.pka1,
        samples: Some(result.pka1_samples),
    })?;
    wtr.serialize(SummaryRow {
        quantity: "pka2",
        value: result.pka2,
        samples: Some(result.pka2_samples),
    })?;
    wtr.serialize(SummaryRow {
        quantity: "isoelectric_point",
        value: result.isoelectric_point,
        samples: None,
    })?;
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn create(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|e| ExportError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

pub fn write_readings_to_path(readings: &[Reading], path: &Path) -> Result<(), ExportError> {
    write_readings(readings, create(path)?)
}

pub fn write_summary_to_path(result: &AnalysisResult, path: &Path) -> Result<(), ExportError> {
    write_summary(result, create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_readings_emits_header_and_rows_in_order() {
        let readings = vec![Reading::new(0.0, 2.41), Reading::new(0.5, 2.44)];
        let mut buffer = Vec::new();
        write_readings(&readings, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["volume_ml,ph", "0.0,2.41", "0.5,2.44"]);
    }

    #[test]
    fn write_summary_marks_isoelectric_point_without_sample_count() {
        let result = AnalysisResult {
            pka1: 2.5,
            pka2: 9.6,
            isoelectric_point: 6.05,
            pka1_samples: 3,
            pka2_samples: 0,
        };
        let mut buffer = Vec::new();
        write_summary(&result, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "quantity,value,samples",
                "pka1,2.5,3",
                "pka2,9.6,0",
                "isoelectric_point,6.05,"
            ]
        );
    }

    #[test]
    fn write_readings_to_path_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        write_readings_to_path(&[Reading::new(1.0, 2.5)], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("volume_ml,ph"));
        assert!(content.contains("1.0,2.5"));
    }

    #[test]
    fn write_to_missing_directory_reports_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("readings.csv");
        let result = write_readings_to_path(&[], &path);
        assert!(matches!(result, Err(ExportError::Io { .. })));
    }
}
