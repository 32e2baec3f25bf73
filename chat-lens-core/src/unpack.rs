use arrow::array::{Array, ArrayRef, Int64Builder, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chat_lens_common::{ChatLensError, Result};
use serde_json::Value;
use std::sync::Arc;

use crate::schema::require_columns;

/// Explode a column of JSON-encoded turn lists (one conversation per row, each
/// cell an array of turn objects) into a flat batch with one row per turn.
///
/// Columns are the union of keys seen across all turns; a key whose values are
/// all integers becomes `Int64`, anything else becomes `Utf8`. A turn missing a
/// key gets a null. Null cells and cells that are not JSON arrays are dropped.
pub fn unpack_conversations(batch: &RecordBatch, conv_col: &str) -> Result<RecordBatch> {
    require_columns(batch, &[conv_col])?;
    let idx = batch.schema().index_of(conv_col)?;
    let array = batch.column(idx);
    let Some(strings) = array.as_any().downcast_ref::<StringArray>() else {
        return Err(ChatLensError::Other(format!(
            "column '{conv_col}' is not a string column"
        )));
    };

    let mut turns: Vec<serde_json::Map<String, Value>> = Vec::new();
    for row in 0..strings.len() {
        if strings.is_null(row) {
            continue;
        }
        let parsed: Value = serde_json::from_str(strings.value(row))?;
        let Value::Array(items) = parsed else { continue };
        for item in items {
            if let Value::Object(map) = item {
                turns.push(map);
            }
        }
    }
    if turns.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    // union of keys, first-seen order
    let mut keys: Vec<String> = Vec::new();
    for turn in &turns {
        for key in turn.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.clone());
            }
        }
    }

    let mut fields = Vec::with_capacity(keys.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(keys.len());
    for key in &keys {
        let all_integers = turns
            .iter()
            .filter_map(|t| t.get(key))
            .all(|v| v.as_i64().is_some());
        if all_integers {
            let mut builder = Int64Builder::with_capacity(turns.len());
            for turn in &turns {
                match turn.get(key).and_then(Value::as_i64) {
                    Some(v) => builder.append_value(v),
                    None => builder.append_null(),
                }
            }
            fields.push(Field::new(key, DataType::Int64, true));
            arrays.push(Arc::new(builder.finish()));
        } else {
            let mut builder = StringBuilder::new();
            for turn in &turns {
                match turn.get(key) {
                    Some(Value::String(s)) => builder.append_value(s),
                    Some(Value::Null) | None => builder.append_null(),
                    Some(other) => builder.append_value(other.to_string()),
                }
            }
            fields.push(Field::new(key, DataType::Utf8, true));
            arrays.push(Arc::new(builder.finish()));
        }
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

#[cfg(test)]
mod tests_unpack {
    use super::*;

    fn conv_batch(cells: Vec<Option<&str>>) -> RecordBatch {
        let array = StringArray::from(cells);
        RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new(
                "conversation",
                DataType::Utf8,
                true,
            )])),
            vec![Arc::new(array)],
        )
        .unwrap()
    }

    #[test]
    fn explodes_to_one_row_per_turn() {
        let batch = conv_batch(vec![
            Some(r#"[{"role":"user","message":"hi","turn_num":0},{"role":"assistant","message":"hello","turn_num":1}]"#),
            Some(r#"[{"role":"user","message":"bye","turn_num":0}]"#),
        ]);
        let flat = unpack_conversations(&batch, "conversation").unwrap();
        assert_eq!(flat.num_rows(), 3);
        let schema = flat.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["message", "role", "turn_num"]);
        assert_eq!(schema.field(2).data_type(), &DataType::Int64);
    }

    #[test]
    fn null_cells_are_dropped() {
        let batch = conv_batch(vec![None, Some(r#"[{"role":"user"}]"#)]);
        let flat = unpack_conversations(&batch, "conversation").unwrap();
        assert_eq!(flat.num_rows(), 1);
    }

    #[test]
    fn missing_keys_become_nulls() {
        let batch = conv_batch(vec![Some(r#"[{"role":"user","score":3},{"role":"assistant"}]"#)]);
        let flat = unpack_conversations(&batch, "conversation").unwrap();
        let idx = flat.schema().index_of("score").unwrap();
        assert!(flat.column(idx).is_null(1));
    }

    #[test]
    fn unknown_column_errors() {
        let batch = conv_batch(vec![Some("[]")]);
        let err = unpack_conversations(&batch, "nope").unwrap_err();
        assert!(matches!(err, ChatLensError::MissingColumns(cols) if cols == vec!["nope"]));
    }
}
