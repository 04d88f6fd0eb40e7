use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("invalid object store url {0}")]
    Url(String, #[source] url::ParseError),
    #[error("unable to build record batch")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("unable to encode parquet")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("object store error")]
    Store(#[from] object_store::Error),
    #[error("unable to start io runtime")]
    Runtime(#[from] std::io::Error),
}
