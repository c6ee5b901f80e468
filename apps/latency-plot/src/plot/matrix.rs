use super::lttb::Point;
use std::fmt::Write as _;

pub const TIME_LABEL: &str = "Seconds";

const MISSING_TOKEN: &str = "NaN";

/// Estimated encoded bytes per matrix cell, used to size the output buffer.
const ENCODED_CELL_ESTIMATE: usize = 12;

/// Reduced series laid out on one shared time axis.
///
/// Column 0 holds the time in seconds; every row carries exactly one series
/// value and marks every other series column as missing (`NaN`).
#[derive(Debug, Clone, Default)]
pub struct AlignedMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl AlignedMatrix {
    /// Rows are emitted series by series, then point by point. They are not
    /// merged by time; the chart treats each column as an independent sparse
    /// series.
    pub fn align(reduced: &[Vec<Point>]) -> Self {
        let columns = 1 + reduced.len();
        let mut rows = Vec::with_capacity(reduced.iter().map(Vec::len).sum());

        for (index, points) in reduced.iter().enumerate() {
            for point in points {
                let mut row = vec![f64::NAN; columns];
                row[0] = point.x;
                row[index + 1] = point.y;
                rows.push(row);
            }
        }

        Self { rows, columns }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a nested array literal with bare `NaN` for missing values.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * self.columns * ENCODED_CELL_ESTIMATE + 4);
        out.push_str("[\n");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            out.push_str("  [");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                push_number(&mut out, *value);
            }
            out.push(']');
        }
        out.push_str("\n]");
        out
    }

    /// Parse text produced by [`AlignedMatrix::encode`].
    pub fn decode(text: &str) -> Result<Self, MatrixParseError> {
        let body = text
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| MatrixParseError::new("missing outer brackets"))?;

        let mut rows = Vec::new();
        let mut rest = body.trim();
        while !rest.is_empty() {
            let row_body = rest
                .strip_prefix('[')
                .ok_or_else(|| MatrixParseError::new(format!("expected '[' at {rest:.16}")))?;
            let end = row_body
                .find(']')
                .ok_or_else(|| MatrixParseError::new("unterminated row"))?;
            let row = row_body[..end]
                .split(',')
                .map(parse_number)
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(row);

            rest = row_body[end + 1..].trim_start();
            if let Some(next) = rest.strip_prefix(',') {
                rest = next.trim_start();
            }
        }

        let columns = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = rows.iter().find(|row| row.len() != columns) {
            return Err(MatrixParseError::new(format!(
                "row has {} columns, expected {}",
                row.len(),
                columns
            )));
        }

        Ok(Self { rows, columns })
    }
}

fn push_number(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str(MISSING_TOKEN);
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        // Display for f64 is the shortest representation that round-trips.
        let _ = write!(out, "{value}");
    }
}

fn parse_number(token: &str) -> Result<f64, MatrixParseError> {
    match token.trim() {
        MISSING_TOKEN => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|_| MatrixParseError::new(format!("invalid number {other:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed matrix literal: {0}")]
pub struct MatrixParseError(String);

impl MatrixParseError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Everything the chart needs from the pipeline: the aligned matrix and one
/// label per matrix column.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub matrix: AlignedMatrix,
    pub labels: Vec<String>,
}
