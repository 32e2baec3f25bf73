use bytes::Bytes;
use chat_lens_common::{ChatLensError, Result};
use memmap2::Mmap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub row_count: i64,
    pub columns: Vec<String>,
}

/// Load a parquet file into a single in-memory record batch. The batch is the
/// table every other function in this crate operates on.
pub fn load_table(path: &Path) -> Result<RecordBatch> {
    let file = std::fs::File::open(path)?;
    // memory-map the file for zero-copy access
    let mmap: Mmap = unsafe { Mmap::map(&file)? };
    let bytes = Bytes::copy_from_slice(&mmap);
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(bytes).map_err(ChatLensError::Parquet)?;
    let schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(8192)
        .build()
        .map_err(ChatLensError::Parquet)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Footer-only summary of a parquet file, cheap enough to show before loading.
pub fn table_info(path: &Path) -> Result<TableInfo> {
    let file = std::fs::File::open(path)?;
    let file_size = file.metadata()?.len();
    let mmap: Mmap = unsafe { Mmap::map(&file)? };
    let bytes = Bytes::copy_from_slice(&mmap);
    let reader = SerializedFileReader::new(bytes).map_err(ChatLensError::Parquet)?;
    let meta = reader.metadata();
    let schema = meta.file_metadata().schema_descr();
    let columns = (0..schema.num_columns())
        .map(|i| schema.column(i).name().to_owned())
        .collect();
    let row_count: i64 = (0..meta.num_row_groups())
        .map(|i| meta.row_group(i).num_rows())
        .sum();
    Ok(TableInfo {
        path: path.to_path_buf(),
        file_size,
        row_count,
        columns,
    })
}
