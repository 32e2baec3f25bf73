use arrow::array::BooleanBuilder;
use arrow::record_batch::RecordBatch;
use chat_lens_common::{ColumnsConfig, Config, Result};
use log::info;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::filter::{apply_filters, integer_value_at, string_value_at, FilterSet, UnknownColumns};
use crate::sample::{distinct_group_keys, render_value};
use crate::schema::require_columns;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Match only at the beginning of the message instead of anywhere in it.
    pub from_start: bool,
    pub text_col: String,
    pub group_col: String,
    pub turn_col: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_columns(&ColumnsConfig::default())
    }
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self::from_columns(&config.columns)
    }

    pub fn from_columns(columns: &ColumnsConfig) -> Self {
        Self {
            case_sensitive: true,
            from_start: false,
            text_col: columns.message.clone(),
            group_col: columns.conv_id.clone(),
            turn_col: columns.turn_num.clone(),
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn from_start(mut self) -> Self {
        self.from_start = true;
        self
    }
}

/// One random conversation containing a match, with the turn indices of the
/// matching rows in row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub conv_id: String,
    pub turn_nums: Vec<i64>,
}

/// All conversation ids with at least one message matching `query` (and the
/// extra filters), sorted; `None` when nothing matches.
pub fn search_conversations(
    batch: &RecordBatch,
    query: &str,
    options: &SearchOptions,
    filters: &FilterSet,
) -> Result<Option<Vec<String>>> {
    let matched = matched_subset(batch, query, options, filters)?;
    if matched.num_rows() == 0 {
        return Ok(None);
    }
    let ids = distinct_group_keys(&matched, &options.group_col)?;
    info!(
        "found {} matching messages in {} conversations",
        matched.num_rows(),
        ids.len()
    );
    Ok(Some(ids))
}

/// One conversation drawn uniformly from the matching set, with its matched
/// turn indices.
pub fn random_search_match<R: Rng + ?Sized>(
    batch: &RecordBatch,
    query: &str,
    options: &SearchOptions,
    filters: &FilterSet,
    rng: &mut R,
) -> Result<Option<SearchMatch>> {
    let matched = matched_subset(batch, query, options, filters)?;
    if matched.num_rows() == 0 {
        return Ok(None);
    }
    let ids = distinct_group_keys(&matched, &options.group_col)?;
    info!(
        "found {} matching messages in {} conversations",
        matched.num_rows(),
        ids.len()
    );
    let conv_id = match ids.choose(rng) {
        Some(id) => id.clone(),
        None => return Ok(None),
    };
    let group_idx = matched.schema().index_of(&options.group_col)?;
    let turn_idx = matched.schema().index_of(&options.turn_col)?;
    let group_array = matched.column(group_idx).clone();
    let turn_array = matched.column(turn_idx).clone();
    let mut turn_nums = Vec::new();
    for row in 0..matched.num_rows() {
        if render_value(group_array.as_ref(), row).as_deref() == Some(conv_id.as_str()) {
            if let Some(turn) = integer_value_at(turn_array.as_ref(), row) {
                turn_nums.push(turn);
            }
        }
    }
    Ok(Some(SearchMatch { conv_id, turn_nums }))
}

/// Text-match stage followed by the shared predicate filter (unknown filter
/// columns warn and are skipped).
fn matched_subset(
    batch: &RecordBatch,
    query: &str,
    options: &SearchOptions,
    filters: &FilterSet,
) -> Result<RecordBatch> {
    require_columns(
        batch,
        &[&options.text_col, &options.group_col, &options.turn_col],
    )?;
    let mask = text_match_mask(batch, query, options)?;
    let matched = arrow::compute::filter_record_batch(batch, &mask)?;
    apply_filters(&matched, filters, UnknownColumns::Warn)
}

fn text_match_mask(
    batch: &RecordBatch,
    query: &str,
    options: &SearchOptions,
) -> Result<arrow::array::BooleanArray> {
    let idx = batch.schema().index_of(&options.text_col)?;
    let array = batch.column(idx);
    let n = batch.num_rows();
    let mut builder = BooleanBuilder::with_capacity(n);
    // the query is a literal, never a pattern
    let needle = if options.case_sensitive {
        query.to_owned()
    } else {
        query.to_lowercase()
    };
    for row in 0..n {
        // both Utf8 and LargeUtf8 cells; nulls and non-string columns never match
        let matched = match string_value_at(array.as_ref(), row) {
            None => false,
            Some(cell) => {
                if options.case_sensitive {
                    if options.from_start {
                        cell.starts_with(&needle)
                    } else {
                        cell.contains(&needle)
                    }
                } else {
                    let folded = cell.to_lowercase();
                    if options.from_start {
                        folded.starts_with(&needle)
                    } else {
                        folded.contains(&needle)
                    }
                }
            }
        };
        builder.append_value(matched);
    }
    Ok(builder.finish())
}
