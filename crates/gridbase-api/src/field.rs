//! Field (column) definitions shared by every view of a database.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field type discriminants as stored in the CRDT.
///
/// The numbers are part of the persisted format; never renumber existing
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    RichText = 0,
    Number = 1,
    DateTime = 2,
    SingleSelect = 3,
    MultiSelect = 4,
    Checkbox = 5,
    Url = 6,
    Checklist = 7,
    LastEditedTime = 8,
    CreatedTime = 9,
    Relation = 10,
    Rollup = 11,
    Person = 12,
    FileMedia = 13,
}

impl FieldType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(FieldType::RichText),
            1 => Some(FieldType::Number),
            2 => Some(FieldType::DateTime),
            3 => Some(FieldType::SingleSelect),
            4 => Some(FieldType::MultiSelect),
            5 => Some(FieldType::Checkbox),
            6 => Some(FieldType::Url),
            7 => Some(FieldType::Checklist),
            8 => Some(FieldType::LastEditedTime),
            9 => Some(FieldType::CreatedTime),
            10 => Some(FieldType::Relation),
            11 => Some(FieldType::Rollup),
            12 => Some(FieldType::Person),
            13 => Some(FieldType::FileMedia),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// SingleSelect or MultiSelect.
    pub fn is_select(self) -> bool {
        matches!(self, FieldType::SingleSelect | FieldType::MultiSelect)
    }

    /// Field types compared with temporal semantics.
    pub fn is_date_like(self) -> bool {
        matches!(
            self,
            FieldType::DateTime | FieldType::CreatedTime | FieldType::LastEditedTime
        )
    }

    /// Field types whose value is derived from row metadata rather than a
    /// stored cell. These cannot be pre-filled when creating a row.
    pub fn is_derived_time(self) -> bool {
        matches!(self, FieldType::CreatedTime | FieldType::LastEditedTime)
    }

    /// Field types filtered with plain text semantics.
    pub fn is_text_like(self) -> bool {
        matches!(self, FieldType::RichText | FieldType::Url | FieldType::Rollup)
    }

    /// Field types whose cell data is a CRDT array of ids.
    pub fn stores_id_array(self) -> bool {
        matches!(self, FieldType::Relation | FieldType::FileMedia)
    }
}

impl From<FieldType> for i64 {
    fn from(value: FieldType) -> i64 {
        value as i64
    }
}

/// One option of a Select (or checklist) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// Type option payload for SingleSelect/MultiSelect fields, stored as JSON
/// under the field's `type_option` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectTypeOption {
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub disable_color: bool,
}

/// A typed column definition.
///
/// `type_options` is keyed by field-type number and may carry stale entries
/// for types the field previously was; they are kept on purpose so a type
/// switch is lossless and can be reversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub type_options: HashMap<i64, serde_json::Value>,
}

impl Field {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            icon: None,
            is_primary: false,
            last_modified: 0,
            type_options: HashMap::new(),
        }
    }

    /// Type option payload for the given type, if one was ever written.
    pub fn type_option(&self, field_type: FieldType) -> Option<&serde_json::Value> {
        self.type_options.get(&field_type.as_i64())
    }

    /// Decode the select type option for the field's current type. Returns
    /// an empty option list when the payload is absent or malformed.
    pub fn select_type_option(&self) -> SelectTypeOption {
        self.type_option(self.field_type)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}
