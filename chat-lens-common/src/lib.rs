pub mod config;
pub use config::{ColumnsConfig, Config};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("table is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ChatLensError>;
