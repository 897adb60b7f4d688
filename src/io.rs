//! Delimited-text interchange for sample and projection matrices.
//!
//! One sample per line, comma separated, no header. Writers emit exactly six
//! fractional digits; readers accept any float syntax Rust's parser does.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use ndarray::{Array2, ArrayView2};

use crate::centering::sample_matrix_from_rows;
use crate::error::{PcaError, Result};

/// Field delimiter of the interchange format.
pub const DELIMITER: char = ',';
/// Fractional digits written for every value.
pub const WRITE_PRECISION: usize = 6;

/// Parses delimited text into a matrix. Blank lines are skipped.
///
/// # Errors
/// `Parse` for a non-numeric token, `InvalidShape` for ragged rows or no rows.
pub fn parse_matrix(text: &str) -> Result<Array2<f64>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row = trimmed
            .split(DELIMITER)
            .enumerate()
            .map(|(col_idx, token)| {
                let token = token.trim();
                token.parse::<f64>().map_err(|_| PcaError::Parse {
                    line: line_idx + 1,
                    column: col_idx + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    sample_matrix_from_rows(&rows)
}

/// Formats a matrix in the interchange format.
pub fn format_matrix(matrix: ArrayView2<f64>) -> String {
    let mut out = String::with_capacity(matrix.len() * (WRITE_PRECISION + 4));
    for row in matrix.rows() {
        let line: Vec<String> = row
            .iter()
            .map(|v| format!("{:.*}", WRITE_PRECISION, v))
            .collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Reads a sample matrix from `path`.
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PcaError::io(path, e))?;
    let matrix = parse_matrix(&text)?;
    info!(
        "Loaded {} rows x {} columns from {:?}.",
        matrix.nrows(),
        matrix.ncols(),
        path
    );
    Ok(matrix)
}

/// Writes `matrix` to `path`, replacing any existing file.
pub fn save_matrix<P: AsRef<Path>>(path: P, matrix: ArrayView2<f64>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PcaError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(format_matrix(matrix).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| PcaError::io(path, e))?;
    info!(
        "Wrote {} rows x {} columns to {:?}.",
        matrix.nrows(),
        matrix.ncols(),
        path
    );
    Ok(())
}

/// Parses one integer class label per line. Values written as floats with
/// no fractional part (`2.0`) are accepted.
pub fn parse_labels(text: &str) -> Result<Vec<i64>> {
    let mut labels = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let parse_error = || PcaError::Parse {
            line: line_idx + 1,
            column: 1,
            token: token.to_string(),
        };
        let label = match token.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                let v = token.parse::<f64>().map_err(|_| parse_error())?;
                if v.fract() != 0.0 || !v.is_finite() {
                    return Err(parse_error());
                }
                v as i64
            }
        };
        labels.push(label);
    }
    Ok(labels)
}

/// Reads class labels from `path`.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<i64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PcaError::io(path, e))?;
    parse_labels(&text)
}
