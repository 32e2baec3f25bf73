use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, LargeStringArray, StringArray, UInt16Array, UInt32Array,
    UInt64Array, UInt8Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chat_lens_common::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- filter DSL ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl FilterValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Int(v) => Some(*v as f64),
            FilterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Int(v) => Some(*v),
            FilterValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}
impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v as i64)
    }
}
impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}
impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_owned())
    }
}
impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}
impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

/// One column constraint. Interpretation depends on the column kind:
/// on numeric columns `OneOf` encodes range bounds (`[]` no constraint,
/// `[lo]` lower bound only, `[lo, hi]` inclusive range, extras ignored);
/// on categorical columns it is set membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterSpec {
    Value(FilterValue),
    OneOf(Vec<FilterValue>),
    Range {
        lo: Option<FilterValue>,
        hi: Option<FilterValue>,
    },
}

impl FilterSpec {
    pub fn at_least(v: impl Into<FilterValue>) -> Self {
        FilterSpec::Range {
            lo: Some(v.into()),
            hi: None,
        }
    }

    pub fn at_most(v: impl Into<FilterValue>) -> Self {
        FilterSpec::Range {
            lo: None,
            hi: Some(v.into()),
        }
    }

    pub fn between(lo: impl Into<FilterValue>, hi: impl Into<FilterValue>) -> Self {
        FilterSpec::Range {
            lo: Some(lo.into()),
            hi: Some(hi.into()),
        }
    }
}

impl From<i64> for FilterSpec {
    fn from(v: i64) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl From<i32> for FilterSpec {
    fn from(v: i32) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl From<f64> for FilterSpec {
    fn from(v: f64) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl From<&str> for FilterSpec {
    fn from(v: &str) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl From<String> for FilterSpec {
    fn from(v: String) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl From<bool> for FilterSpec {
    fn from(v: bool) -> Self {
        FilterSpec::Value(v.into())
    }
}
impl<V: Into<FilterValue>> From<Vec<V>> for FilterSpec {
    fn from(vs: Vec<V>) -> Self {
        FilterSpec::OneOf(vs.into_iter().map(Into::into).collect())
    }
}
impl<A: Into<FilterValue>, B: Into<FilterValue>> From<(A, B)> for FilterSpec {
    fn from((lo, hi): (A, B)) -> Self {
        FilterSpec::between(lo, hi)
    }
}

/// Conjunction of per-column constraints; empty set matches every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet(BTreeMap<String, FilterSpec>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, spec: impl Into<FilterSpec>) -> Self {
        self.insert(column, spec);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, spec: impl Into<FilterSpec>) {
        self.0.insert(column.into(), spec.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterSpec)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What to do with a filter naming a column the table does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownColumns {
    Ignore,
    Warn,
}

// --- evaluation ---

/// Keep the rows satisfying every entry of `filters`. Row order is preserved
/// and the input batch is never mutated.
pub fn apply_filters(
    batch: &RecordBatch,
    filters: &FilterSet,
    unknown: UnknownColumns,
) -> Result<RecordBatch> {
    if filters.is_empty() {
        return Ok(batch.clone());
    }
    let n = batch.num_rows();
    let mut mask = BooleanArray::from(vec![true; n]);
    for (column, spec) in filters.iter() {
        let idx = match batch.schema().index_of(column) {
            Ok(i) => i,
            Err(_) => {
                if unknown == UnknownColumns::Warn {
                    warn!("column '{column}' not found in table; filter ignored");
                }
                continue;
            }
        };
        let array = batch.column(idx);
        let col_mask = match crate::schema::column_kind(array.data_type()) {
            crate::schema::ColumnKind::Numeric => numeric_mask(array, spec, n),
            crate::schema::ColumnKind::Categorical => categorical_mask(array, spec, n),
        };
        mask = arrow::compute::and(&mask, &col_mask)?;
    }
    Ok(arrow::compute::filter_record_batch(batch, &mask)?)
}

/// Normalize a spec into inclusive `(lo, hi)` bounds for a numeric column.
fn numeric_bounds(spec: &FilterSpec) -> (Option<FilterValue>, Option<FilterValue>) {
    match spec {
        FilterSpec::Value(v) => (Some(v.clone()), Some(v.clone())),
        FilterSpec::OneOf(vs) => match vs.as_slice() {
            [] => (None, None),
            [lo] => (Some(lo.clone()), None),
            [lo, hi, ..] => (Some(lo.clone()), Some(hi.clone())),
        },
        FilterSpec::Range { lo, hi } => (lo.clone(), hi.clone()),
    }
}

fn numeric_mask(array: &ArrayRef, spec: &FilterSpec, n: usize) -> BooleanArray {
    let (lo, hi) = numeric_bounds(spec);
    let mut builder = BooleanBuilder::with_capacity(n);
    match (&lo, &hi) {
        // equal bounds take the exact-match path; integer columns compare in i64
        (Some(l), Some(h)) if l == h => {
            if is_integer_type(array.data_type()) {
                match l.as_i64() {
                    Some(target) => {
                        for i in 0..n {
                            builder.append_value(integer_value_at(array.as_ref(), i) == Some(target));
                        }
                    }
                    None => {
                        for _ in 0..n {
                            builder.append_value(false);
                        }
                    }
                }
            } else {
                match l.as_f64() {
                    Some(target) => {
                        for i in 0..n {
                            builder.append_value(numeric_value_at(array.as_ref(), i) == Some(target));
                        }
                    }
                    None => {
                        for _ in 0..n {
                            builder.append_value(false);
                        }
                    }
                }
            }
        }
        _ => {
            // a present bound that is not numeric can never hold
            let lo_f = lo.as_ref().map(FilterValue::as_f64);
            let hi_f = hi.as_ref().map(FilterValue::as_f64);
            if lo_f == Some(None) || hi_f == Some(None) {
                for _ in 0..n {
                    builder.append_value(false);
                }
            } else {
                let lo_f = lo_f.flatten();
                let hi_f = hi_f.flatten();
                for i in 0..n {
                    let keep = match numeric_value_at(array.as_ref(), i) {
                        Some(v) => {
                            lo_f.map_or(true, |l| v >= l) && hi_f.map_or(true, |h| v <= h)
                        }
                        None => false, // nulls never match
                    };
                    builder.append_value(keep);
                }
            }
        }
    }
    builder.finish()
}

fn categorical_mask(array: &ArrayRef, spec: &FilterSpec, n: usize) -> BooleanArray {
    let mut builder = BooleanBuilder::with_capacity(n);
    match spec {
        FilterSpec::Value(v) => {
            for i in 0..n {
                builder.append_value(categorical_eq(array.as_ref(), i, v));
            }
        }
        FilterSpec::OneOf(vs) => {
            for i in 0..n {
                builder.append_value(vs.iter().any(|v| categorical_eq(array.as_ref(), i, v)));
            }
        }
        // a range over a non-numeric column can never hold
        FilterSpec::Range { .. } => {
            for _ in 0..n {
                builder.append_value(false);
            }
        }
    }
    builder.finish()
}

fn categorical_eq(array: &dyn Array, row: usize, value: &FilterValue) -> bool {
    if array.is_null(row) {
        return false;
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return matches!(value, FilterValue::Str(s) if a.value(row) == s.as_str());
    }
    if let Some(a) = array.as_any().downcast_ref::<LargeStringArray>() {
        return matches!(value, FilterValue::Str(s) if a.value(row) == s.as_str());
    }
    if let Some(a) = array.as_any().downcast_ref::<BooleanArray>() {
        return matches!(value, FilterValue::Bool(b) if a.value(row) == *b);
    }
    false
}

fn is_integer_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

pub(crate) fn string_value_at(array: &dyn Array, row: usize) -> Option<&str> {
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        return Some(a.value(row));
    }
    if let Some(a) = array.as_any().downcast_ref::<LargeStringArray>() {
        return Some(a.value(row));
    }
    None
}

pub(crate) fn integer_value_at(array: &dyn Array, row: usize) -> Option<i64> {
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<Int8Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<Int16Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<Int32Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        return Some(a.value(row));
    }
    if let Some(a) = array.as_any().downcast_ref::<UInt8Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<UInt16Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<UInt32Array>() {
        return Some(a.value(row) as i64);
    }
    if let Some(a) = array.as_any().downcast_ref::<UInt64Array>() {
        return i64::try_from(a.value(row)).ok();
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        let v = a.value(row);
        if v.fract() == 0.0 {
            return Some(v as i64);
        }
    }
    if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        let v = a.value(row);
        if v.fract() == 0.0 {
            return Some(v as i64);
        }
    }
    None
}

pub(crate) fn numeric_value_at(array: &dyn Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        return None;
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        return Some(a.value(row));
    }
    if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        return Some(a.value(row) as f64);
    }
    integer_value_at(array, row).map(|v| v as f64)
}

#[cfg(test)]
mod tests_bounds {
    use super::*;

    fn b(spec: FilterSpec) -> (Option<f64>, Option<f64>) {
        let (lo, hi) = numeric_bounds(&spec);
        (
            lo.as_ref().and_then(FilterValue::as_f64),
            hi.as_ref().and_then(FilterValue::as_f64),
        )
    }

    #[test] fn scalar_is_both_bounds() { assert_eq!(b(5i64.into()), (Some(5.0), Some(5.0))); }
    #[test] fn empty_seq_is_unbounded() { assert_eq!(b(Vec::<i64>::new().into()), (None, None)); }
    #[test] fn one_elem_is_lower_only() { assert_eq!(b(vec![2i64].into()), (Some(2.0), None)); }
    #[test] fn two_elems_are_range() { assert_eq!(b(vec![2i64, 10].into()), (Some(2.0), Some(10.0))); }
    #[test] fn extra_elems_ignored() { assert_eq!(b(vec![2i64, 10, 99].into()), (Some(2.0), Some(10.0))); }
    #[test] fn tuple_is_range() { assert_eq!(b((2i64, 10i64).into()), (Some(2.0), Some(10.0))); }
    #[test] fn open_upper() { assert_eq!(b(FilterSpec::at_least(2)), (Some(2.0), None)); }
    #[test] fn open_lower() { assert_eq!(b(FilterSpec::at_most(10)), (None, Some(10.0))); }
}
