use arrow::array::{Array, BooleanArray, Float32Array, Float64Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use chat_lens_common::{ChatLensError, Result};
use log::info;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::filter::{apply_filters, FilterSet, UnknownColumns};

/// All conversation ids whose rows survive the filters, sorted; `None` when
/// nothing matches. Filters naming unknown columns are silently skipped.
pub fn filter_conversations(
    batch: &RecordBatch,
    filters: &FilterSet,
    group_col: &str,
) -> Result<Option<Vec<String>>> {
    filtered_conversation_ids(batch, filters, group_col)
}

/// One conversation id drawn uniformly from the distinct matching set.
pub fn random_conversation<R: Rng + ?Sized>(
    batch: &RecordBatch,
    filters: &FilterSet,
    group_col: &str,
    rng: &mut R,
) -> Result<Option<String>> {
    let ids = match filtered_conversation_ids(batch, filters, group_col)? {
        Some(ids) => ids,
        None => return Ok(None),
    };
    Ok(ids.choose(rng).cloned())
}

fn filtered_conversation_ids(
    batch: &RecordBatch,
    filters: &FilterSet,
    group_col: &str,
) -> Result<Option<Vec<String>>> {
    let subset = apply_filters(batch, filters, UnknownColumns::Ignore)?;
    if subset.num_rows() == 0 {
        return Ok(None);
    }
    info!("{} rows match filters", subset.num_rows());
    Ok(Some(distinct_group_keys(&subset, group_col)?))
}

/// Distinct non-null values of the group-key column, sorted for reproducibility.
pub(crate) fn distinct_group_keys(batch: &RecordBatch, group_col: &str) -> Result<Vec<String>> {
    let idx = batch
        .schema()
        .index_of(group_col)
        .map_err(|_| ChatLensError::MissingColumns(vec![group_col.to_owned()]))?;
    let array = batch.column(idx);
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in 0..array.len() {
        if let Some(key) = render_value(array.as_ref(), row) {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    keys.sort();
    Ok(keys)
}

/// Render one cell to a display string; `None` for nulls.
pub(crate) fn render_value(array: &dyn Array, row: usize) -> Option<String> {
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return Some(a.value(row).to_owned());
    }
    if let Some(a) = array.as_any().downcast_ref::<LargeStringArray>() {
        return Some(a.value(row).to_owned());
    }
    if let Some(a) = array.as_any().downcast_ref::<BooleanArray>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        return Some(a.value(row).to_string());
    }
    if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        return Some(a.value(row).to_string());
    }
    crate::filter::integer_value_at(array, row).map(|v| v.to_string())
}
