//! Step Executor
//!
//! Applies one validated [`Step`] to a [`Table`]. The table is consumed; on
//! error it is dropped, so a failing step never leaks a half-applied table.

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

use super::steps::{
    Condition, DropColumns, ExplodeColumn, FilterRows, Keep, RemoveDuplicates, RenameColumns,
    ReorderColumns, Step,
};
use crate::error::{StepError, StepResult};
use crate::models::StepType;
use crate::table::Table;

/// Parse `step_type` + `config` and apply the step.
pub fn apply_step(table: Table, step_type: &str, config: &Value) -> StepResult<Table> {
    let step = Step::parse(step_type, config)?;
    apply(table, &step)
}

/// Apply a validated step. An empty result is a success.
pub fn apply(table: Table, step: &Step) -> StepResult<Table> {
    match step {
        Step::RenameColumns(cfg) => rename_columns(table, cfg),
        Step::DropColumns(cfg) => Ok(drop_columns(table, cfg)),
        Step::ReorderColumns(cfg) => Ok(reorder_columns(table, cfg)),
        Step::FilterRows(cfg) => Ok(filter_rows(table, cfg)),
        Step::RemoveDuplicates(cfg) => remove_duplicates(table, cfg),
        Step::ExplodeColumn(cfg) => Ok(explode_column(table, cfg)),
        Step::AddColumns(_) => Err(StepError::Unsupported {
            step_type: StepType::AddColumns.to_string(),
            reason: "formula evaluation is disabled until a sandboxed expression language is defined"
                .to_string(),
        }),
    }
}

fn rename_columns(table: Table, cfg: &RenameColumns) -> StepResult<Table> {
    let (columns, rows) = table.into_parts();

    let renamed: Vec<String> = columns
        .into_iter()
        .map(|c| cfg.mapping.get(&c).cloned().unwrap_or(c))
        .collect();

    if let Some(dup) = first_duplicate(&renamed) {
        return Err(StepError::validation(
            StepType::RenameColumns,
            format!("renaming produces duplicate column '{}'", dup),
        ));
    }

    Ok(Table::from_parts(renamed, rows))
}

fn first_duplicate(columns: &[String]) -> Option<String> {
    let mut seen = HashSet::new();
    columns.iter().find(|c| !seen.insert(c.as_str())).cloned()
}

fn drop_columns(table: Table, cfg: &DropColumns) -> Table {
    let dropped: HashSet<&str> = cfg.columns.iter().map(String::as_str).collect();
    let keep: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| !dropped.contains(c.as_str()))
        .map(|(i, _)| i)
        .collect();
    project(table, &keep)
}

fn reorder_columns(table: Table, cfg: &ReorderColumns) -> Table {
    let mut order: Vec<usize> = Vec::with_capacity(table.width());
    for name in &cfg.order {
        if let Some(i) = table.column_index(name) {
            if !order.contains(&i) {
                order.push(i);
            }
        }
    }
    for i in 0..table.width() {
        if !order.contains(&i) {
            order.push(i);
        }
    }
    project(table, &order)
}

/// Keep the columns at `indices`, in that order.
fn project(table: Table, indices: &[usize]) -> Table {
    let (columns, rows) = table.into_parts();
    let columns = indices.iter().map(|&i| columns[i].clone()).collect();
    let rows = rows
        .into_iter()
        .map(|mut row| indices.iter().map(|&i| std::mem::take(&mut row[i])).collect())
        .collect();
    Table::from_parts(columns, rows)
}

fn filter_rows(table: Table, cfg: &FilterRows) -> Table {
    let idx = table.column_index(&cfg.column);
    let (columns, rows) = table.into_parts();

    let rows = match idx {
        Some(i) => rows
            .into_iter()
            .filter(|row| matches(&row[i], cfg))
            .collect(),
        None => Vec::new(),
    };
    Table::from_parts(columns, rows)
}

/// Compare a cell against the filter value. Null cells and mismatched types never match.
fn matches(cell: &Value, cfg: &FilterRows) -> bool {
    let ordering = match (cell, &cfg.value) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            return match cfg.condition {
                Condition::Eq => cell == &cfg.value,
                Condition::Ne => cell != &cfg.value,
                _ => false,
            };
        }
        _ => None,
    };

    ordering.is_some_and(|o| cfg.condition.holds(o))
}

/// Integers compare exactly; anything involving a float compares as f64.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    // One side is above i64::MAX, the other negative.
    if a.is_u64() && b.is_i64() {
        return Some(Ordering::Greater);
    }
    if a.is_i64() && b.is_u64() {
        return Some(Ordering::Less);
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn remove_duplicates(table: Table, cfg: &RemoveDuplicates) -> StepResult<Table> {
    let key_columns: Vec<usize> = match &cfg.subset {
        Some(subset) => subset
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| {
                    StepError::validation(
                        StepType::RemoveDuplicates,
                        format!("subset column '{}' does not exist", name),
                    )
                })
            })
            .collect::<Result<_, _>>()?,
        None => (0..table.width()).collect(),
    };

    let keys: Vec<String> = table
        .rows()
        .iter()
        .map(|row| {
            let mut key = String::new();
            for &i in &key_columns {
                write_key(&row[i], &mut key);
                key.push('\u{1f}');
            }
            key
        })
        .collect();

    let mut seen = HashSet::new();
    let mut kept = vec![false; keys.len()];
    match cfg.keep {
        Keep::First => {
            for (i, key) in keys.iter().enumerate() {
                kept[i] = seen.insert(key.as_str());
            }
        }
        Keep::Last => {
            for (i, key) in keys.iter().enumerate().rev() {
                kept[i] = seen.insert(key.as_str());
            }
        }
    }

    let (columns, rows) = table.into_parts();
    let rows = rows
        .into_iter()
        .zip(kept)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();
    Ok(Table::from_parts(columns, rows))
}

/// Append a key for `value` that is equal for equal values: whole floats
/// read as integers and object entries are sorted by name.
fn write_key(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    out.push_str(&(f as i64).to_string());
                } else {
                    out.push_str(&f.to_string());
                }
            }
        }
        Value::Array(items) => {
            out.push('[');
            for item in items {
                write_key(item, out);
                out.push(',');
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (name, item) in entries {
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_key(item, out);
                out.push(',');
            }
            out.push('}');
        }
        other => out.push_str(&other.to_string()),
    }
}

fn explode_column(table: Table, cfg: &ExplodeColumn) -> Table {
    let Some(idx) = table.column_index(&cfg.column) else {
        return table;
    };
    let (columns, rows) = table.into_parts();

    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        match row[idx].take() {
            Value::Array(items) => {
                for item in items {
                    let mut expanded = row.clone();
                    expanded[idx] = item;
                    out.push(expanded);
                }
            }
            other => {
                row[idx] = other;
                out.push(row);
            }
        }
    }
    Table::from_parts(columns, out)
}
