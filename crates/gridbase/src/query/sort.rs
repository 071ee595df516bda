//! View-local sort ordering.
//!
//! Multi-sort is stable: rows equal under every sort entry keep their
//! relative view order, so re-sorting an already sorted list is a no-op.

use std::cmp::Ordering;
use std::collections::HashMap;

use gridbase_api::{Cell, Field, FieldType, Row, Sort, SortCondition};

use crate::codec;
use crate::query::numeric;

/// Sort rows in place by the view's sort list, first entry most
/// significant.
pub fn sort_rows(rows: &mut [Row], sorts: &[Sort], fields: &HashMap<String, Field>) {
    if sorts.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, sorts, fields));
}

pub fn compare_rows(
    a: &Row,
    b: &Row,
    sorts: &[Sort],
    fields: &HashMap<String, Field>,
) -> Ordering {
    for sort in sorts {
        // A sort on a deleted field contributes nothing.
        let Some(field) = fields.get(&sort.field_id) else {
            continue;
        };
        let ordering = compare_cells(a, b, field);
        let ordering = match sort.condition {
            SortCondition::Ascending => ordering,
            SortCondition::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_cells(a: &Row, b: &Row, field: &Field) -> Ordering {
    let cell_a = a.cell(&field.id);
    let cell_b = b.cell(&field.id);

    match field.field_type {
        FieldType::Number => compare_numbers(cell_a, cell_b),
        FieldType::Checkbox => {
            let checked = |c: Option<&Cell>| c.map(|c| codec::is_checked(c.data.as_text()));
            checked(cell_a)
                .unwrap_or(false)
                .cmp(&checked(cell_b).unwrap_or(false))
        }
        FieldType::SingleSelect | FieldType::MultiSelect => {
            compare_selects(cell_a, cell_b, field)
        }
        FieldType::Checklist => {
            let pct = |c: Option<&Cell>| c.and_then(codec::checklist_percentage);
            pct(cell_a)
                .partial_cmp(&pct(cell_b))
                .unwrap_or(Ordering::Equal)
        }
        FieldType::DateTime => {
            let start = |c: Option<&Cell>| c.and_then(|c| codec::date_cell_value(c).start);
            compare_options(start(cell_a), start(cell_b))
        }
        FieldType::CreatedTime => a.created_at.cmp(&b.created_at),
        FieldType::LastEditedTime => a.last_modified.cmp(&b.last_modified),
        t if t.stores_id_array() => {
            let joined = |c: Option<&Cell>| c.map(|c| c.data.as_ids().join(",")).unwrap_or_default();
            joined(cell_a).cmp(&joined(cell_b))
        }
        FieldType::Person => {
            let joined = |c: Option<&Cell>| c.map(|c| codec::person_ids(c).join(",")).unwrap_or_default();
            joined(cell_a).cmp(&joined(cell_b))
        }
        // RichText, Url and Rollup compare as plain text.
        _ => compare_text(cell_a, cell_b),
    }
}

fn compare_text(a: Option<&Cell>, b: Option<&Cell>) -> Ordering {
    let text = |c: Option<&Cell>| c.map(|c| c.data.as_text().to_lowercase()).unwrap_or_default();
    text(a).cmp(&text(b))
}

/// Numeric cells order by value; non-numeric cells sort after numeric
/// ones, among themselves by text.
fn compare_numbers(a: Option<&Cell>, b: Option<&Cell>) -> Ordering {
    let parsed = |c: Option<&Cell>| {
        c.and_then(codec::number_text)
            .and_then(numeric::Decimal::parse)
    };
    match (parsed(a), parsed(b)) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_text(a, b),
    }
}

/// Select cells order by the first selected option's position in the
/// field's option list; empty cells sort last.
fn compare_selects(a: Option<&Cell>, b: Option<&Cell>, field: &Field) -> Ordering {
    let options = codec::select_options(field);
    let rank = |cell: Option<&Cell>| {
        cell.and_then(|cell| {
            codec::select_ids_from_cell(cell, field)
                .first()
                .and_then(|id| options.iter().position(|option| &option.id == id))
        })
    };
    compare_options(rank(a), rank(b))
}

/// `None` (empty) sorts after `Some` in ascending order.
fn compare_options<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_api::{SelectOption, SelectTypeOption};

    fn row_with_text(id: &str, field_id: &str, value: &str, field_type: FieldType) -> Row {
        let mut row = Row::new(id);
        row.cells
            .insert(field_id.to_string(), Cell::text(value, field_type));
        row
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_numeric_sort_is_by_value_not_text() {
        let field = Field::new("n", "Amount", FieldType::Number);
        let fields = HashMap::from([("n".to_string(), field)]);
        let mut rows = vec![
            row_with_text("r1", "n", "10", FieldType::Number),
            row_with_text("r2", "n", "9", FieldType::Number),
            row_with_text("r3", "n", "oops", FieldType::Number),
        ];
        let sorts = vec![Sort {
            id: "s".into(),
            field_id: "n".into(),
            condition: SortCondition::Ascending,
        }];

        sort_rows(&mut rows, &sorts, &fields);
        assert_eq!(ids(&rows), ["r2", "r1", "r3"]);
    }

    #[test]
    fn test_descending_text_sort() {
        let field = Field::new("t", "Title", FieldType::RichText);
        let fields = HashMap::from([("t".to_string(), field)]);
        let mut rows = vec![
            row_with_text("r1", "t", "apple", FieldType::RichText),
            row_with_text("r2", "t", "Banana", FieldType::RichText),
        ];
        let sorts = vec![Sort {
            id: "s".into(),
            field_id: "t".into(),
            condition: SortCondition::Descending,
        }];

        sort_rows(&mut rows, &sorts, &fields);
        assert_eq!(ids(&rows), ["r2", "r1"]);
    }

    #[test]
    fn test_multi_sort_is_stable() {
        let checkbox = Field::new("c", "Done", FieldType::Checkbox);
        let text = Field::new("t", "Title", FieldType::RichText);
        let fields = HashMap::from([
            ("c".to_string(), checkbox),
            ("t".to_string(), text),
        ]);
        let mut rows = vec![
            {
                let mut r = row_with_text("r1", "c", "Yes", FieldType::Checkbox);
                r.cells
                    .insert("t".into(), Cell::text("b", FieldType::RichText));
                r
            },
            {
                let mut r = row_with_text("r2", "c", "No", FieldType::Checkbox);
                r.cells
                    .insert("t".into(), Cell::text("a", FieldType::RichText));
                r
            },
            {
                let mut r = row_with_text("r3", "c", "Yes", FieldType::Checkbox);
                r.cells
                    .insert("t".into(), Cell::text("a", FieldType::RichText));
                r
            },
        ];
        let sorts = vec![
            Sort {
                id: "s1".into(),
                field_id: "t".into(),
                condition: SortCondition::Ascending,
            },
            Sort {
                id: "s2".into(),
                field_id: "c".into(),
                condition: SortCondition::Ascending,
            },
        ];

        sort_rows(&mut rows, &sorts, &fields);
        // Title first, then checkbox (unchecked before checked).
        assert_eq!(ids(&rows), ["r2", "r3", "r1"]);
    }

    #[test]
    fn test_relation_sort_orders_by_joined_ids() {
        use gridbase_api::CellData;

        let field = Field::new("rel", "Links", FieldType::Relation);
        let fields = HashMap::from([("rel".to_string(), field)]);
        let mut linked = Row::new("r1");
        linked.cells.insert(
            "rel".into(),
            Cell::new(
                CellData::Ids(vec!["rowB".into(), "rowC".into()]),
                FieldType::Relation,
            ),
        );
        let mut earlier = Row::new("r2");
        earlier.cells.insert(
            "rel".into(),
            Cell::new(CellData::Ids(vec!["rowA".into()]), FieldType::Relation),
        );
        let mut rows = vec![linked, earlier, Row::new("r3")];
        let sorts = vec![Sort {
            id: "s".into(),
            field_id: "rel".into(),
            condition: SortCondition::Ascending,
        }];

        sort_rows(&mut rows, &sorts, &fields);
        assert_eq!(ids(&rows), ["r3", "r2", "r1"]);
    }

    #[test]
    fn test_select_sort_follows_option_order() {
        let mut field = Field::new("s", "Status", FieldType::SingleSelect);
        field.type_options.insert(
            FieldType::SingleSelect.as_i64(),
            serde_json::to_value(SelectTypeOption {
                options: vec![
                    SelectOption {
                        id: "o-todo".into(),
                        name: "Todo".into(),
                        color: String::new(),
                    },
                    SelectOption {
                        id: "o-done".into(),
                        name: "Done".into(),
                        color: String::new(),
                    },
                ],
                disable_color: false,
            })
            .unwrap(),
        );
        let fields = HashMap::from([("s".to_string(), field)]);
        let mut rows = vec![
            row_with_text("r1", "s", "o-done", FieldType::SingleSelect),
            row_with_text("r2", "s", "o-todo", FieldType::SingleSelect),
            Row::new("r3"),
        ];
        let sorts = vec![Sort {
            id: "s".into(),
            field_id: "s".into(),
            condition: SortCondition::Ascending,
        }];

        sort_rows(&mut rows, &sorts, &fields);
        assert_eq!(ids(&rows), ["r2", "r1", "r3"]);
    }
}
