use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chat_lens_common::{ChatLensError, Result};

/// How a column participates in filtering: numeric columns get range semantics,
/// everything else gets equality/membership semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

pub fn column_kind(dtype: &DataType) -> ColumnKind {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnKind::Numeric,
        _ => ColumnKind::Categorical,
    }
}

/// Verify that every named column exists in the batch schema, reporting all
/// missing names at once rather than the first one hit.
pub fn require_columns(batch: &RecordBatch, names: &[&str]) -> Result<()> {
    let schema = batch.schema();
    let missing: Vec<String> = names
        .iter()
        .filter(|n| schema.index_of(n).is_err())
        .map(|n| n.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChatLensError::MissingColumns(missing))
    }
}
