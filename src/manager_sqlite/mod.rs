pub mod errors;

use log::info;
use rusqlite::{params, Connection};
use crate::config::SqliteParameters;
use crate::manager_sqlite::errors::SqliteError;
use crate::models::forecast_record::{ForecastRecord, COLUMNS};

/// Column types, same order as COLUMNS
const COLUMN_TYPES: [&str; 12] = [
    "TEXT", "TEXT", "TEXT", "TEXT", "INTEGER", "REAL", "TEXT", "TEXT", "REAL", "TEXT", "TEXT", "TEXT",
];

/// Relational sink appending forecast records to a table in an SQLite database
pub struct SqliteSink {
    db_path: String,
    table: String,
}

impl SqliteSink {
    /// Returns a new SqliteSink, the database itself is not touched until records are appended
    ///
    /// # Arguments
    ///
    /// * 'config' - database path and table name
    pub fn new(config: &SqliteParameters) -> Result<SqliteSink, SqliteError> {
        if !is_identifier(&config.table) {
            return Err(SqliteError::InvalidTable(config.table.clone()));
        }

        Ok(SqliteSink { db_path: config.db_path.clone(), table: config.table.clone() })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Appends records to the forecast table, creating database and table if needed.
    ///
    /// All inserts go in one transaction, existing rows are never updated or removed.
    /// An empty slice still makes sure the table exists.
    ///
    /// # Arguments
    ///
    /// * 'records' - records to append
    pub fn append(&self, records: &[ForecastRecord]) -> Result<usize, SqliteError> {
        let mut conn = Connection::open(&self.db_path)?;
        conn.execute(&self.create_table_sql(), [])?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&self.insert_sql())?;
            for r in records {
                stmt.execute(params![
                    r.name,
                    r.retrieved_text(),
                    r.start_time,
                    r.end_time,
                    r.is_daytime,
                    r.temperature,
                    r.temperature_unit,
                    r.temperature_trend,
                    r.probability_of_precipitation,
                    r.wind_speed,
                    r.wind_direction,
                    r.short_forecast,
                ])?;
            }
        }
        tx.commit()?;

        info!("appended {} rows to {} in {}", records.len(), self.table, self.db_path);
        Ok(records.len())
    }

    fn create_table_sql(&self) -> String {
        let columns = COLUMNS.iter()
            .zip(COLUMN_TYPES.iter())
            .map(|(c, t)| format!("\"{}\" {}", c, t))
            .collect::<Vec<String>>()
            .join(", ");

        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", self.table, columns)
    }

    fn insert_sql(&self) -> String {
        let columns = COLUMNS.iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<String>>()
            .join(", ");
        let placeholders = (1..=COLUMNS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<String>>()
            .join(", ");

        format!("INSERT INTO \"{}\" ({}) VALUES ({})", self.table, columns, placeholders)
    }
}

/// Table names can't be bound as parameters, so only plain identifiers are let through
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}
