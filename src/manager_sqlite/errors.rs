use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("invalid table name {0:?}")]
    InvalidTable(String),
    #[error("database error")]
    Database(#[from] rusqlite::Error),
}
