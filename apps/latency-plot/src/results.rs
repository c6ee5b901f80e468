//! Load-test result records and the JSON-lines / CSV decoders that read them.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::borrow::Cow;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::time::Duration;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const CSV_MIN_COLUMNS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub target: String,
    pub seq: u64,
    pub code: u16,
    pub timestamp: DateTime<Utc>,
    pub latency: Duration,
    pub bytes_out: u64,
    pub bytes_in: u64,
    pub error: String,
}

impl Measurement {
    pub fn new(target: impl Into<String>, timestamp: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            target: target.into(),
            seq: 0,
            code: 0,
            timestamp,
            latency,
            bytes_out: 0,
            bytes_in: 0,
            error: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read results: {0}")]
    Io(#[from] io::Error),
    #[error("record {record}: invalid JSON result: {source}")]
    Json {
        record: usize,
        #[source]
        source: simd_json::Error,
    },
    #[error("record {record}: invalid CSV result: {source}")]
    Csv {
        record: usize,
        #[source]
        source: csv::Error,
    },
    #[error("record {record}: expected at least {expected} columns, found {found}")]
    Columns {
        record: usize,
        expected: usize,
        found: usize,
    },
    #[error("record {record}: invalid {field} {value:?}")]
    Field {
        record: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
struct BorrowedResult<'a> {
    #[serde(default, borrow)]
    attack: Option<Cow<'a, str>>,
    #[serde(default)]
    seq: u64,
    #[serde(default)]
    code: u16,
    #[serde(borrow)]
    timestamp: Cow<'a, str>,
    latency: u64,
    #[serde(default)]
    bytes_out: u64,
    #[serde(default)]
    bytes_in: u64,
    #[serde(default, borrow)]
    error: Option<Cow<'a, str>>,
}

/// Decode every result from `reader`, detecting the format from the first
/// non-blank byte: `{` means JSON lines, anything else CSV.
pub fn read_measurements<R: BufRead>(mut reader: R) -> Result<Vec<Measurement>, DecodeError> {
    let format = loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(Vec::new());
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(idx) => {
                let format = if buf[idx] == b'{' {
                    Format::Json
                } else {
                    Format::Csv
                };
                reader.consume(idx);
                break format;
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    };

    tracing::debug!(?format, "decoding results");
    match format {
        Format::Json => read_json(reader),
        Format::Csv => read_csv(reader),
    }
}

fn read_json<R: BufRead>(reader: R) -> Result<Vec<Measurement>, DecodeError> {
    let mut measurements = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let record = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut bytes = line.into_bytes();
        let parsed: BorrowedResult = simd_json::serde::from_slice(&mut bytes)
            .map_err(|source| DecodeError::Json { record, source })?;
        let timestamp = DateTime::parse_from_rfc3339(&parsed.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| DecodeError::Field {
                record,
                field: "timestamp",
                value: parsed.timestamp.to_string(),
            })?;

        measurements.push(Measurement {
            target: parsed.attack.map(Cow::into_owned).unwrap_or_default(),
            seq: parsed.seq,
            code: parsed.code,
            timestamp,
            latency: Duration::from_nanos(parsed.latency),
            bytes_out: parsed.bytes_out,
            bytes_in: parsed.bytes_in,
            error: parsed.error.map(Cow::into_owned).unwrap_or_default(),
        });
    }
    Ok(measurements)
}

/// Columns: unix-nanos timestamp, code, latency ns, bytes out, bytes in,
/// error, body, attack, seq. Anything past seq is ignored.
fn read_csv<R: BufRead>(reader: R) -> Result<Vec<Measurement>, DecodeError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut measurements = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let record = idx + 1;
        let row = row.map_err(|source| DecodeError::Csv { record, source })?;
        if row.len() == 1 && row[0].trim().is_empty() {
            continue;
        }
        if row.len() < CSV_MIN_COLUMNS {
            return Err(DecodeError::Columns {
                record,
                expected: CSV_MIN_COLUMNS,
                found: row.len(),
            });
        }

        let nanos: i64 = parse_field(&row[0], record, "timestamp")?;
        let timestamp = Utc
            .timestamp_opt(
                nanos.div_euclid(NANOS_PER_SEC),
                nanos.rem_euclid(NANOS_PER_SEC) as u32,
            )
            .single()
            .ok_or_else(|| DecodeError::Field {
                record,
                field: "timestamp",
                value: row[0].to_string(),
            })?;
        let seq = match row.get(8).map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => parse_field(raw, record, "seq")?,
            None => 0,
        };

        measurements.push(Measurement {
            target: row.get(7).unwrap_or_default().to_string(),
            seq,
            code: parse_field(&row[1], record, "code")?,
            timestamp,
            latency: Duration::from_nanos(parse_field(&row[2], record, "latency")?),
            bytes_out: parse_field(&row[3], record, "bytes_out")?,
            bytes_in: parse_field(&row[4], record, "bytes_in")?,
            error: row[5].to_string(),
        });
    }
    Ok(measurements)
}

fn parse_field<T: FromStr>(raw: &str, record: usize, field: &'static str) -> Result<T, DecodeError> {
    raw.trim().parse::<T>().map_err(|_| DecodeError::Field {
        record,
        field,
        value: raw.to_string(),
    })
}

/// Merge several result streams into one, ordered by timestamp. Results with
/// equal timestamps keep their input order.
pub fn merge_by_timestamp(batches: Vec<Vec<Measurement>>) -> Vec<Measurement> {
    let mut merged: Vec<Measurement> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|measurement| measurement.timestamp);
    merged
}
