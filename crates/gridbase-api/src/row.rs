//! Row and cell snapshot types.
//!
//! Rows live in their own CRDT sub-documents; these structs are plain
//! decoded snapshots used by the query engines, which are pure functions
//! over them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::field::{FieldType, SelectOption};

/// Composite key addressing one row sub-document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub database_id: String,
    pub row_id: String,
}

impl RowKey {
    pub fn new(database_id: impl Into<String>, row_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            row_id: row_id.into(),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database_id, self.row_id)
    }
}

/// Raw cell payload. Relation and FileMedia cells store an id array (a CRDT
/// list in the document); everything else stores a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellData {
    Empty,
    Text(String),
    Ids(Vec<String>),
}

impl CellData {
    pub fn as_text(&self) -> &str {
        match self {
            CellData::Text(s) => s,
            _ => "",
        }
    }

    pub fn as_ids(&self) -> &[String] {
        match self {
            CellData::Ids(ids) => ids,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellData::Empty => true,
            CellData::Text(s) => s.is_empty(),
            CellData::Ids(ids) => ids.is_empty(),
        }
    }
}

/// The per-row, per-field stored value.
///
/// `source_field_type` is the type the cell was written as before the last
/// field-type switch; it is preserved so legacy payloads can still be
/// decoded on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub data: CellData,
    pub field_type: FieldType,
    #[serde(default)]
    pub source_field_type: Option<FieldType>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub end_timestamp: Option<i64>,
    #[serde(default)]
    pub is_range: bool,
    #[serde(default)]
    pub include_time: bool,
    #[serde(default)]
    pub reminder_id: Option<String>,
}

impl Cell {
    pub fn new(data: CellData, field_type: FieldType) -> Self {
        Self {
            data,
            field_type,
            source_field_type: None,
            created_at: 0,
            last_modified: 0,
            end_timestamp: None,
            is_range: false,
            include_time: false,
            reminder_id: None,
        }
    }

    pub fn text(data: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(CellData::Text(data.into()), field_type)
    }
}

/// Checklist cell payload, stored as JSON in the cell data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistCellData {
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub selected_option_ids: Vec<String>,
}

impl ChecklistCellData {
    /// Completion ratio in `[0.0, 1.0]`; `None` when there are no items.
    pub fn percentage(&self) -> Option<f64> {
        if self.options.is_empty() {
            return None;
        }
        let selected = self
            .options
            .iter()
            .filter(|option| self.selected_option_ids.contains(&option.id))
            .count();
        Some(selected as f64 / self.options.len() as f64)
    }
}

/// Row metadata kept next to the cells in the row sub-document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub is_document_empty: bool,
}

/// Decoded snapshot of one row sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub cells: HashMap<String, Cell>,
    #[serde(default)]
    pub meta: RowMeta,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_modified: i64,
}

impl Row {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: HashMap::new(),
            meta: RowMeta::default(),
            created_at: 0,
            last_modified: 0,
        }
    }

    pub fn cell(&self, field_id: &str) -> Option<&Cell> {
        self.cells.get(field_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checklist_percentage() {
        let data = ChecklistCellData {
            options: vec![
                SelectOption {
                    id: "a".into(),
                    name: "one".into(),
                    color: String::new(),
                },
                SelectOption {
                    id: "b".into(),
                    name: "two".into(),
                    color: String::new(),
                },
            ],
            selected_option_ids: vec!["a".into()],
        };
        assert_eq!(data.percentage(), Some(0.5));

        let empty = ChecklistCellData::default();
        assert_eq!(empty.percentage(), None);
    }

    #[test]
    fn test_cell_data_emptiness() {
        assert!(CellData::Empty.is_empty());
        assert!(CellData::Text(String::new()).is_empty());
        assert!(!CellData::Text("x".into()).is_empty());
        assert!(CellData::Ids(vec![]).is_empty());
    }
}
