use std::collections::BTreeMap;

use indexmap::IndexMap;

use super::{FileOperator, OperatorState};
use crate::{Row, Value};

impl FileOperator {
    /// Append a row at the next free index. A superset or subset of the
    /// existing columns is accepted silently; the CSV commit realigns such
    /// rows against the header.
    pub fn insert(&mut self, row: Row) {
        let index = self.next_index;
        self.next_index += 1;
        self.rows.insert(index, row);
        self.mark_dirty();
    }

    pub fn insert_many(&mut self, rows: impl IntoIterator<Item = Row>) {
        let start = self.next_index;
        let mut count = 0;
        for (offset, row) in rows.into_iter().enumerate() {
            self.rows.insert(start + offset as u64, row);
            count += 1;
        }
        self.next_index = start + count;
        if count > 0 {
            self.mark_dirty();
        }
    }

    /// Apply `patch` to every row whose `column` equals `value`. Matching is
    /// exact equality, no type coercion. Zero matches is a silent no-op.
    pub fn update(&mut self, column: &str, value: &Value, patch: &Row) {
        let mut touched = false;
        for row in self.rows.values_mut() {
            if row.get(column) == Some(value) {
                for (k, v) in patch {
                    row.insert(k.clone(), v.clone());
                }
                touched = true;
            }
        }
        if touched {
            self.mark_dirty();
        }
    }

    /// Conjunctive form: every condition pair must match (logical AND).
    pub fn update_where(&mut self, conditions: &Row, patch: &Row) {
        let mut touched = false;
        for row in self.rows.values_mut() {
            if matches_all(row, conditions) {
                for (k, v) in patch {
                    row.insert(k.clone(), v.clone());
                }
                touched = true;
            }
        }
        if touched {
            self.mark_dirty();
        }
    }

    /// Set `name` to `default` on every existing row, including rows that
    /// were inserted before the call.
    pub fn add_column(&mut self, name: &str, default: Value) {
        for row in self.rows.values_mut() {
            row.insert(name.to_string(), default.clone());
        }
        self.mark_dirty();
    }

    /// Remove every row whose `column` equals `value`. Remaining indices are
    /// not compacted.
    pub fn delete(&mut self, column: &str, value: &Value) {
        let before = self.rows.len();
        self.rows
            .retain(|_, row| row.get(column) != Some(value));
        if self.rows.len() != before {
            self.mark_dirty();
        }
    }

    /// Conjunctive delete.
    pub fn delete_where(&mut self, conditions: &Row) {
        let before = self.rows.len();
        self.rows.retain(|_, row| !matches_all(row, conditions));
        if self.rows.len() != before {
            self.mark_dirty();
        }
    }

    pub fn rows(&self) -> &BTreeMap<u64, Row> {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    /// Column name to type name, derived from the first row only. Empty for
    /// an empty store.
    pub fn column_types(&self) -> IndexMap<String, String> {
        match self.rows.values().next() {
            Some(first) => first
                .iter()
                .map(|(k, v)| (k.clone(), v.kind().type_name().to_string()))
                .collect(),
            None => IndexMap::new(),
        }
    }

    fn mark_dirty(&mut self) {
        self.state = OperatorState::Dirty;
        self.refresh_columns();
    }
}

fn matches_all(row: &Row, conditions: &Row) -> bool {
    conditions
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}
