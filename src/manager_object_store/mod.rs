pub mod errors;

use std::env;
use std::ffi::OsString;
use std::sync::Arc;
use arrow_array::{ArrayRef, BooleanArray, Float64Array, RecordBatch, StringArray, TimestampSecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::DateTime;
use chrono_tz::Tz;
use log::info;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutPayload};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use url::Url;
use crate::config::ObjectStoreParameters;
use crate::manager_object_store::errors::ObjectStoreError;
use crate::models::forecast_record::{ForecastRecord, COLUMNS};

/// Columnar sink writing one Parquet file per run into a date partitioned object store layout
///
/// Layout: `<prefix>/date=<YYYY-MM-DD>/<file_prefix>_<HHMMSS>.parquet`
pub struct ObjectStoreSink {
    url: String,
    store: Box<dyn ObjectStore>,
    prefix: Path,
    file_prefix: String,
}

impl ObjectStoreSink {
    /// Returns a new ObjectStoreSink for the configured base url.
    ///
    /// Credentials are never part of the configuration, they are picked up from the
    /// provider variables of the environment (AWS_*, AZURE_*, GOOGLE_*) or from instance metadata.
    ///
    /// # Arguments
    ///
    /// * 'config' - base url and file name prefix
    pub fn new(config: &ObjectStoreParameters) -> Result<ObjectStoreSink, ObjectStoreError> {
        let url = Url::parse(&config.url).map_err(|e| ObjectStoreError::Url(config.url.clone(), e))?;
        let (store, prefix) = object_store::parse_url_opts(&url, store_options(env::vars_os()))?;

        Ok(ObjectStoreSink {
            url: config.url.clone(),
            store,
            prefix,
            file_prefix: config.file_prefix.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Writes all records as one Parquet file, returns the path written or None if there
    /// was nothing to write. An existing file at the run's path is never replaced, the write
    /// fails instead.
    ///
    /// # Arguments
    ///
    /// * 'records' - records of the run
    /// * 'run_time' - the run's retrieval timestamp, decides partition and file name
    pub fn write(&self, records: &[ForecastRecord], run_time: DateTime<Tz>) -> Result<Option<Path>, ObjectStoreError> {
        if records.is_empty() {
            info!("no records, nothing written to {}", self.url);
            return Ok(None);
        }

        let batch = to_record_batch(records, run_time.timezone())?;
        let bytes = to_parquet(&batch)?;
        let size = bytes.len();
        let path = partition_path(&self.prefix, &self.file_prefix, run_time);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(self.store.put_opts(&path, PutPayload::from(bytes), PutMode::Create.into()))?;

        info!("wrote {} rows ({} bytes) to {}", records.len(), size, path);
        Ok(Some(path))
    }
}

/// Store options from environment variables, keeping only cloud provider settings
///
/// Keys are lower cased as `parse_url_opts` expects. Variables that aren't valid
/// UTF-8 are skipped.
///
/// # Arguments
///
/// * 'vars' - environment variables, typically `env::vars_os()`
fn store_options(vars: impl Iterator<Item = (OsString, OsString)>) -> Vec<(String, String)> {
    vars.filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .filter(|(k, _)| ["AWS_", "AZURE_", "GOOGLE_"].iter().any(|p| k.starts_with(p)))
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect()
}

/// Path of the file for a run
///
/// # Arguments
///
/// * 'prefix' - base path within the store
/// * 'file_prefix' - file name prefix
/// * 'run_time' - the run's retrieval timestamp
pub fn partition_path(prefix: &Path, file_prefix: &str, run_time: DateTime<Tz>) -> Path {
    prefix
        .child(format!("date={}", run_time.format("%Y-%m-%d")))
        .child(format!("{}_{}.parquet", file_prefix, run_time.format("%H%M%S")))
}

/// Converts records to one Arrow record batch with a column per record field
///
/// # Arguments
///
/// * 'records' - the records to convert
/// * 'tz' - time zone tagged on the retrieval timestamp column
fn to_record_batch(records: &[ForecastRecord], tz: Tz) -> Result<RecordBatch, ObjectStoreError> {
    let tz_name = tz.name();

    let schema = Arc::new(Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Utf8, false),
        Field::new(COLUMNS[1], DataType::Timestamp(TimeUnit::Second, Some(tz_name.into())), false),
        Field::new(COLUMNS[2], DataType::Utf8, false),
        Field::new(COLUMNS[3], DataType::Utf8, false),
        Field::new(COLUMNS[4], DataType::Boolean, false),
        Field::new(COLUMNS[5], DataType::Float64, false),
        Field::new(COLUMNS[6], DataType::Utf8, false),
        Field::new(COLUMNS[7], DataType::Utf8, false),
        Field::new(COLUMNS[8], DataType::Float64, true),
        Field::new(COLUMNS[9], DataType::Utf8, false),
        Field::new(COLUMNS[10], DataType::Utf8, false),
        Field::new(COLUMNS[11], DataType::Utf8, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.name.as_str()))),
        Arc::new(TimestampSecondArray::from_iter_values(records.iter().map(|r| r.retrieved_at.timestamp()))
            .with_timezone(tz_name)),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.start_time.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.end_time.as_str()))),
        Arc::new(BooleanArray::from(records.iter().map(|r| r.is_daytime).collect::<Vec<bool>>())),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.temperature))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.temperature_unit.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.temperature_trend.as_str()))),
        Arc::new(Float64Array::from(records.iter().map(|r| r.probability_of_precipitation).collect::<Vec<Option<f64>>>())),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.wind_speed.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.wind_direction.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.short_forecast.as_str()))),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Encodes a record batch as an in-memory Parquet file
///
/// # Arguments
///
/// * 'batch' - the batch to encode
fn to_parquet(batch: &RecordBatch) -> Result<Vec<u8>, ObjectStoreError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer: Vec<u8> = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    Ok(buffer)
}
