//! Filter, sort, group and calculation entities stored per view.

use serde::{Deserialize, Serialize};

use crate::conditions::{CalculationType, FilterKind, SortCondition};

/// One node of a view's filter predicate tree.
///
/// Leaf (`Data`) nodes carry a field reference plus a condition/content
/// pair; `And`/`Or` nodes combine their `children` and ignore the
/// field-level payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub field_id: String,
    pub kind: FilterKind,
    /// Condition discriminant, decoded against the target field's type at
    /// evaluation time.
    pub condition: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<Filter>,
}

impl Filter {
    pub fn data(
        id: impl Into<String>,
        field_id: impl Into<String>,
        condition: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            field_id: field_id.into(),
            kind: FilterKind::Data,
            condition,
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>, kind: FilterKind, children: Vec<Filter>) -> Self {
        Self {
            id: id.into(),
            field_id: String::new(),
            kind,
            condition: 0,
            content: String::new(),
            children,
        }
    }

    /// Whether this node or any descendant references the given field.
    pub fn references_field(&self, field_id: &str) -> bool {
        self.field_id == field_id
            || self
                .children
                .iter()
                .any(|child| child.references_field(field_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub id: String,
    pub field_id: String,
    pub condition: SortCondition,
}

/// One derived board column inside a group setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupColumn {
    pub id: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Group-by configuration of a Board view. At most one group setting exists
/// per view; its columns mirror the grouped field's value space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSetting {
    pub id: String,
    pub field_id: String,
    #[serde(default)]
    pub columns: Vec<GroupColumn>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: String,
    pub field_id: String,
    pub calculation_type: CalculationType,
    #[serde(default)]
    pub value: String,
}

/// Stored content of a date filter. Malformed payloads are replaced with a
/// safe default at evaluation time instead of failing the pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateFilterContent {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_references_field_through_children() {
        let tree = Filter::group(
            "g",
            FilterKind::Or,
            vec![
                Filter::data("a", "field-1", 0, ""),
                Filter::group(
                    "inner",
                    FilterKind::And,
                    vec![Filter::data("b", "field-2", 0, "")],
                ),
            ],
        );
        assert!(tree.references_field("field-2"));
        assert!(!tree.references_field("field-3"));
    }
}
