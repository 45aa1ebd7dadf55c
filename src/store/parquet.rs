//! Local Parquet materialization of daily rate records.
//!
//! Layout: `{data_root}/{BASE}/{YYYY-MM-DD}.parquet`, one row per file with a
//! `date` column followed by one `Float64` column per currency code.

use crate::core::{PipelineError, RateRecord};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path of the file holding `base` rates for `date`.
pub fn local_path(data_root: &Path, base: &str, date: NaiveDate) -> PathBuf {
    data_root
        .join(base)
        .join(format!("{}.parquet", date.format("%Y-%m-%d")))
}

/// Whether `base` can name a currency directory: ASCII letters and digits
/// only, so it is always a single path component under `data_root`.
pub fn is_currency_code(base: &str) -> bool {
    !base.is_empty() && base.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Object key for a materialized file: its path relative to `data_root`,
/// `/` separated.
pub fn remote_key(data_root: &Path, local: &Path) -> Result<String, PipelineError> {
    let relative = local
        .strip_prefix(data_root)
        .map_err(|_| PipelineError::Precondition {
            path: local.to_path_buf(),
            reason: format!("not under data root {}", data_root.display()),
        })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Writes `record` as a single-row Snappy-compressed Parquet file, replacing
/// any previous file for the same base and date.
///
/// The base must be a currency code and the `{data_root}/{base}` directory
/// must already exist.
pub fn write_rates(data_root: &Path, record: &RateRecord) -> Result<PathBuf, PipelineError> {
    if !is_currency_code(&record.base) {
        return Err(PipelineError::Precondition {
            path: data_root.to_path_buf(),
            reason: format!("invalid base currency {:?}", record.base),
        });
    }

    let base_dir = data_root.join(&record.base);
    if !base_dir.is_dir() {
        return Err(PipelineError::Precondition {
            path: base_dir,
            reason: format!("no directory for base {}", record.base),
        });
    }

    let path = local_path(data_root, &record.base, record.date);
    let codec_err = |e: PolarsError| PipelineError::Codec {
        path: path.clone(),
        message: e.to_string(),
    };

    let mut df = rates_to_dataframe(record).map_err(codec_err)?;

    let file = fs::File::create(&path).map_err(|source| PipelineError::Filesystem {
        path: path.clone(),
        source,
    })?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)
        .map_err(codec_err)?;

    debug!(path = %path.display(), columns = df.width(), "Wrote rates parquet");
    Ok(path)
}

/// Reads back a file produced by [`write_rates`]. The base currency is taken
/// from the parent directory name.
pub fn read_rates(path: &Path) -> Result<RateRecord, PipelineError> {
    let codec_err = |message: String| PipelineError::Codec {
        path: path.to_path_buf(),
        message,
    };

    let file = fs::File::open(path).map_err(|source| PipelineError::Filesystem {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| codec_err(format!("read: {e}")))?;

    if df.height() != 1 {
        return Err(codec_err(format!("expected 1 row, found {}", df.height())));
    }

    let days = df
        .column("date")
        .and_then(|c| c.date())
        .map_err(|e| codec_err(format!("date column: {e}")))?
        .get(0)
        .ok_or_else(|| codec_err("null date".to_string()))?;
    let date = epoch() + chrono::Duration::days(i64::from(days));

    let mut rates = BTreeMap::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == "date" {
            continue;
        }
        let value = column
            .f64()
            .map_err(|e| codec_err(format!("{name} column: {e}")))?
            .get(0)
            .ok_or_else(|| codec_err(format!("null rate for {name}")))?;
        rates.insert(name.to_string(), value);
    }

    let base = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(RateRecord { date, base, rates })
}

/// Parquet `Date` values count days from here.
fn epoch() -> NaiveDate {
    // 1970-01-01
    NaiveDate::default()
}

fn rates_to_dataframe(record: &RateRecord) -> PolarsResult<DataFrame> {
    let days = (record.date - epoch()).num_days() as i32;

    let mut columns = Vec::with_capacity(record.rates.len() + 1);
    columns.push(Column::new("date".into(), vec![days]).cast(&DataType::Date)?);
    for (code, rate) in &record.rates {
        columns.push(Column::new(code.as_str().into(), vec![*rate]));
    }

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(date: NaiveDate, rates: &[(&str, f64)]) -> RateRecord {
        RateRecord {
            date,
            base: "USD".to_string(),
            rates: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
        }
    }

    fn july_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn dir_is_empty(path: &Path) -> bool {
        fs::read_dir(path).unwrap().next().is_none()
    }

    fn data_root_with_base() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("USD")).unwrap();
        dir
    }

    #[test]
    fn test_local_path_layout() {
        let path = local_path(Path::new("/data"), "USD", july_first());
        assert_eq!(path, PathBuf::from("/data/USD/2024-07-01.parquet"));
    }

    #[test]
    fn test_remote_key_is_relative_to_data_root() {
        let root = Path::new("/data");
        for (base, date) in [
            ("USD", july_first()),
            ("EUR", NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
        ] {
            let local = local_path(root, base, date);
            let key = remote_key(root, &local).unwrap();
            assert_eq!(key, format!("{base}/{}.parquet", date.format("%Y-%m-%d")));
        }
    }

    #[test]
    fn test_remote_key_outside_data_root() {
        let err = remote_key(Path::new("/data"), Path::new("/tmp/USD/x.parquet")).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { .. }));
    }

    #[test]
    fn test_write_and_read_rates() {
        let root = data_root_with_base();
        let input = record(july_first(), &[("EUR", 0.92), ("GBP", 0.79)]);

        let path = write_rates(root.path(), &input).unwrap();

        assert_eq!(path, root.path().join("USD").join("2024-07-01.parquet"));
        let output = read_rates(&path).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_rewrite_keeps_only_latest_values() {
        let root = data_root_with_base();

        write_rates(root.path(), &record(july_first(), &[("EUR", 0.92)])).unwrap();
        let path = write_rates(root.path(), &record(july_first(), &[("EUR", 0.95)])).unwrap();

        let entries = fs::read_dir(root.path().join("USD")).unwrap().count();
        assert_eq!(entries, 1);
        let output = read_rates(&path).unwrap();
        assert_eq!(output.rates.len(), 1);
        assert_eq!(output.rates["EUR"], 0.95);
    }

    #[test]
    fn test_base_must_be_a_single_directory_name() {
        let root = data_root_with_base();
        let data = root.path().join("data");
        fs::create_dir_all(data.join("USD")).unwrap();

        for base in [".", "..", "../escape", "USD/..", ""] {
            let mut input = record(july_first(), &[("EUR", 0.92)]);
            input.base = base.to_string();

            let err = write_rates(&data, &input).unwrap_err();

            assert!(matches!(err, PipelineError::Precondition { .. }), "{base}: {err}");
            assert!(err.to_string().contains("invalid base currency"), "{err}");
        }
        assert_eq!(fs::read_dir(&data).unwrap().count(), 1);
        assert!(dir_is_empty(&data.join("USD")));
        assert!(!root.path().join("escape").exists());
    }

    #[test]
    fn test_is_currency_code() {
        assert!(is_currency_code("USD"));
        assert!(is_currency_code("BTC"));
        assert!(!is_currency_code(""));
        assert!(!is_currency_code("."));
        assert!(!is_currency_code("../x"));
        assert!(!is_currency_code("US D"));
    }

    #[test]
    fn test_missing_base_directory_writes_nothing() {
        let root = TempDir::new().unwrap();

        let err = write_rates(root.path(), &record(july_first(), &[("EUR", 0.92)])).unwrap_err();

        assert!(matches!(err, PipelineError::Precondition { .. }));
        assert!(err.to_string().contains("no directory for base USD"));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
