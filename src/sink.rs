use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;
use crate::config::{SinkKind, SinkParameters};
use crate::manager_object_store::ObjectStoreSink;
use crate::manager_object_store::errors::ObjectStoreError;
use crate::manager_sqlite::SqliteSink;
use crate::manager_sqlite::errors::SqliteError;
use crate::models::forecast_record::ForecastRecord;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sqlite sink error")]
    Sqlite(#[from] SqliteError),
    #[error("object store sink error")]
    ObjectStore(#[from] ObjectStoreError),
    #[error("sink {0} is not configured")]
    NotConfigured(&'static str),
}

/// Destination for the records of a run.
///
/// Persisting is append only, earlier runs are never touched.
pub trait Sink {
    /// Short description of the destination, used in logs
    fn describe(&self) -> String;

    /// Persists all records of a run and returns how many were written
    ///
    /// # Arguments
    ///
    /// * 'records' - the records to persist, may be empty
    /// * 'run_time' - the run's retrieval timestamp
    fn persist(&self, records: &[ForecastRecord], run_time: DateTime<Tz>) -> Result<usize, SinkError>;
}

impl Sink for SqliteSink {
    fn describe(&self) -> String {
        format!("sqlite {} table {}", self.db_path(), self.table())
    }

    fn persist(&self, records: &[ForecastRecord], _run_time: DateTime<Tz>) -> Result<usize, SinkError> {
        Ok(self.append(records)?)
    }
}

impl Sink for ObjectStoreSink {
    fn describe(&self) -> String {
        format!("object store {}", self.url())
    }

    fn persist(&self, records: &[ForecastRecord], run_time: DateTime<Tz>) -> Result<usize, SinkError> {
        Ok(self.write(records, run_time)?.map_or(0, |_| records.len()))
    }
}

/// Builds the sink selected in the configuration
///
/// # Arguments
///
/// * 'config' - the sink section of the configuration
pub fn build_sink(config: &SinkParameters) -> Result<Box<dyn Sink>, SinkError> {
    match config.kind {
        SinkKind::Sqlite => {
            let params = config.sqlite.as_ref().ok_or(SinkError::NotConfigured("sqlite"))?;
            Ok(Box::new(SqliteSink::new(params)?))
        },
        SinkKind::ObjectStore => {
            let params = config.object_store.as_ref().ok_or(SinkError::NotConfigured("object_store"))?;
            Ok(Box::new(ObjectStoreSink::new(params)?))
        },
    }
}
