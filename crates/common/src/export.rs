//! Session export.
//!
//! A finalized session is turned into rows carrying two time axes: a
//! reconstructed one derived only from the sample's position (`i / rate`) and
//! the raw acquisition timestamps. Downstream fixed-rate analysis reads the
//! first; the second is kept to audit how far the real timer strayed.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::MotionSample;

const BYTE_ORDER_MARK: &str = "\u{feff}";
const DATE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// Subject and condition labels that name an exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub subject_id: String,
    pub condition: String,
}

impl SessionMetadata {
    pub fn new(subject_id: &str, condition: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            condition: condition.to_string(),
        }
    }

    /// Both labels end up in a file name, so they must be non-empty and free
    /// of path separators and control characters.
    pub fn validate(&self) -> Result<(), ExportError> {
        for (field, value) in [("subject_id", &self.subject_id), ("condition", &self.condition)] {
            if value.trim().is_empty() {
                return Err(ExportError::InvalidMetadata(format!("{field} is empty")));
            }
            if value.contains(['/', '\\']) || value.chars().any(char::is_control) || value == ".." {
                return Err(ExportError::InvalidMetadata(format!(
                    "{field} {value:?} is not usable in a file name"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self::new("001", "A")
    }
}

/// `ID_{subject}_COND_{condition}_{YYYYMMDD}_{HHMMSS}.csv`
pub fn export_file_name<Tz: TimeZone>(metadata: &SessionMetadata, exported_at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "ID_{}_COND_{}_{}.csv",
        metadata.subject_id,
        metadata.condition,
        exported_at.format("%Y%m%d_%H%M%S")
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub index: usize,
    /// Reconstructed time, `index / nominal_rate_hz`.
    pub time_s: f64,
    pub sample: MotionSample,
    pub date_time: String,
    /// Wall-clock gap to the first sample.
    pub raw_elapsed_s: f64,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "time[s]")]
    time: String,
    #[serde(rename = "ax[m/s^2]")]
    ax: String,
    #[serde(rename = "ay[m/s^2]")]
    ay: String,
    #[serde(rename = "az[m/s^2]")]
    az: String,
    #[serde(rename = "DateTime")]
    date_time: &'a str,
    #[serde(rename = "Raw_Elapsed[s]")]
    raw_elapsed: String,
    #[serde(rename = "Raw_Unix_ms")]
    raw_unix_ms: u64,
}

impl<'a> From<&'a ExportRow> for CsvRow<'a> {
    fn from(row: &'a ExportRow) -> Self {
        Self {
            time: format!("{:.3}", row.time_s),
            ax: format!("{:.6}", row.sample.x),
            ay: format!("{:.6}", row.sample.y),
            az: format!("{:.6}", row.sample.z),
            date_time: &row.date_time,
            raw_elapsed: format!("{:.4}", row.raw_elapsed_s),
            raw_unix_ms: row.sample.timestamp,
        }
    }
}

/// Read-only export view over a finalized session. Always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    nominal_rate_hz: f64,
    rows: Vec<ExportRow>,
}

impl ExportRecord {
    /// Builds the record with calendar times in the local time zone.
    pub fn from_session(samples: &[MotionSample], nominal_rate_hz: f64) -> Result<Self, ExportError> {
        Self::from_session_in(samples, nominal_rate_hz, &Local)
    }

    pub fn from_session_in<Tz: TimeZone>(
        samples: &[MotionSample],
        nominal_rate_hz: f64,
        tz: &Tz,
    ) -> Result<Self, ExportError>
    where
        Tz::Offset: Display,
    {
        let first = samples.first().ok_or(ExportError::EmptySession)?;
        if !nominal_rate_hz.is_finite() || nominal_rate_hz <= 0.0 {
            return Err(ExportError::InvalidRate(nominal_rate_hz));
        }

        let rows = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| -> Result<ExportRow, ExportError> {
                Ok(ExportRow {
                    index,
                    time_s: index as f64 / nominal_rate_hz,
                    sample: *sample,
                    date_time: format_timestamp(sample.timestamp, tz)?,
                    raw_elapsed_s: (sample.timestamp as i64 - first.timestamp as i64) as f64 / 1000.0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nominal_rate_hz, rows })
    }

    pub fn nominal_rate_hz(&self) -> f64 {
        self.nominal_rate_hz
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the BOM, the header row and one `\n`-terminated row per sample.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        writer.write_all(BYTE_ORDER_MARK.as_bytes())?;
        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        for row in &self.rows {
            wtr.serialize(CsvRow::from(row))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ExportError> {
        let mut bytes = Vec::new();
        self.write_csv(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Writes the record into `dir` under the conventional file name stamped
    /// with `exported_at`, creating `dir` if needed.
    pub fn save_to_csv<Tz: TimeZone>(
        &self,
        dir: &Path,
        metadata: &SessionMetadata,
        exported_at: &DateTime<Tz>,
    ) -> Result<PathBuf, ExportError>
    where
        Tz::Offset: Display,
    {
        metadata.validate()?;
        fs::create_dir_all(dir)?;
        let path = dir.join(export_file_name(metadata, exported_at));
        let file = File::create(&path)?;
        self.write_csv(BufWriter::new(file))?;
        Ok(path)
    }
}

fn format_timestamp<Tz: TimeZone>(timestamp_ms: u64, tz: &Tz) -> Result<String, ExportError>
where
    Tz::Offset: Display,
{
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| tz.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format(DATE_TIME_FORMAT).to_string())
        .ok_or(ExportError::TimestampOutOfRange(timestamp_ms))
}
