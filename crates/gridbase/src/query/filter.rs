//! Filter predicate evaluation.
//!
//! A pure pass over decoded row snapshots. Every evaluation is
//! side-effect-free and re-runnable on each document mutation; running the
//! engine twice on unchanged inputs yields identical row sets.
//!
//! Leniency rules, applied uniformly: a dangling field reference is
//! vacuously true (a stale filter never hides rows), an undecodable
//! condition discriminant is vacuously true, and non-numeric operands fail
//! closed on numeric comparisons.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use gridbase_api::{
    Cell, CheckboxCondition, ChecklistCondition, DateCondition, DateFilterContent, Field,
    FieldType, Filter, FilterKind, NumberCondition, PersonCondition, RelationCondition, Row,
    SelectCondition, TextCondition,
};

use crate::codec;
use crate::query::numeric;

/// Evaluate the view's root filters against every row and keep the rows
/// that pass. Root-level siblings are a conjunction regardless of nesting.
pub fn filter_rows(rows: &[Row], filters: &[Filter], fields: &HashMap<String, Field>) -> Vec<Row> {
    rows.iter()
        .filter(|row| row_passes(row, filters, fields))
        .cloned()
        .collect()
}

pub fn row_passes(row: &Row, filters: &[Filter], fields: &HashMap<String, Field>) -> bool {
    filters.iter().all(|filter| evaluate(filter, row, fields))
}

/// Evaluate one node of the predicate tree.
pub fn evaluate(filter: &Filter, row: &Row, fields: &HashMap<String, Field>) -> bool {
    match filter.kind {
        FilterKind::And => filter
            .children
            .iter()
            .all(|child| evaluate(child, row, fields)),
        FilterKind::Or => {
            filter.children.is_empty()
                || filter
                    .children
                    .iter()
                    .any(|child| evaluate(child, row, fields))
        }
        FilterKind::Data => evaluate_leaf(filter, row, fields),
    }
}

fn evaluate_leaf(filter: &Filter, row: &Row, fields: &HashMap<String, Field>) -> bool {
    // A filter referencing a deleted field never hides a row.
    let Some(field) = fields.get(&filter.field_id) else {
        return true;
    };
    let cell = row.cell(&field.id);

    match field.field_type {
        FieldType::RichText | FieldType::Url | FieldType::Rollup => {
            evaluate_text(filter, cell)
        }
        FieldType::Number => evaluate_number(filter, cell),
        FieldType::Checkbox => evaluate_checkbox(filter, cell),
        FieldType::SingleSelect | FieldType::MultiSelect => evaluate_select(filter, cell, field),
        FieldType::Checklist => evaluate_checklist(filter, cell),
        FieldType::DateTime | FieldType::CreatedTime | FieldType::LastEditedTime => {
            evaluate_date(filter, cell, field.field_type, row)
        }
        FieldType::Relation | FieldType::FileMedia => {
            evaluate_relation(filter, cell.map(codec::linked_ids).unwrap_or_default())
        }
        FieldType::Person => {
            evaluate_person(filter, cell.map(codec::person_ids).unwrap_or_default())
        }
    }
}

fn evaluate_text(filter: &Filter, cell: Option<&Cell>) -> bool {
    let raw = cell
        .map(|c| c.data.as_text().to_lowercase())
        .unwrap_or_default();
    let content = filter.content.to_lowercase();

    match TextCondition::from_i64(filter.condition) {
        Some(TextCondition::Is) => raw == content,
        Some(TextCondition::IsNot) => raw != content,
        Some(TextCondition::Contains) => raw.contains(&content),
        Some(TextCondition::DoesNotContain) => !raw.contains(&content),
        Some(TextCondition::StartsWith) => raw.starts_with(&content),
        Some(TextCondition::EndsWith) => raw.ends_with(&content),
        Some(TextCondition::IsEmpty) => raw.is_empty(),
        Some(TextCondition::IsNotEmpty) => !raw.is_empty(),
        None => true,
    }
}

fn evaluate_number(filter: &Filter, cell: Option<&Cell>) -> bool {
    let raw = cell.and_then(codec::number_text);

    match NumberCondition::from_i64(filter.condition) {
        Some(NumberCondition::IsEmpty) => raw.is_none(),
        Some(NumberCondition::IsNotEmpty) => raw.is_some(),
        Some(condition) => {
            // Non-numeric operands satisfy only the emptiness conditions.
            let Some(ordering) = raw.and_then(|raw| numeric::compare(raw, &filter.content))
            else {
                return false;
            };
            match condition {
                NumberCondition::Equal => ordering.is_eq(),
                NumberCondition::NotEqual => ordering.is_ne(),
                NumberCondition::GreaterThan => ordering.is_gt(),
                NumberCondition::LessThan => ordering.is_lt(),
                NumberCondition::GreaterThanOrEqualTo => ordering.is_ge(),
                NumberCondition::LessThanOrEqualTo => ordering.is_le(),
                // Handled above.
                NumberCondition::IsEmpty | NumberCondition::IsNotEmpty => false,
            }
        }
        None => true,
    }
}

fn evaluate_checkbox(filter: &Filter, cell: Option<&Cell>) -> bool {
    let checked = cell.map(|c| codec::is_checked(c.data.as_text())).unwrap_or(false);
    match CheckboxCondition::from_i64(filter.condition) {
        Some(CheckboxCondition::IsChecked) => checked,
        Some(CheckboxCondition::IsUnChecked) => !checked,
        None => true,
    }
}

fn evaluate_select(filter: &Filter, cell: Option<&Cell>, field: &Field) -> bool {
    let cell_ids = cell
        .map(|c| codec::select_ids_from_cell(c, field))
        .unwrap_or_default();
    let filter_ids = id_list(&filter.content);

    match SelectCondition::from_i64(filter.condition) {
        // An empty filter set constrains nothing; vacuous pass.
        Some(SelectCondition::OptionIs | SelectCondition::OptionContains) => {
            filter_ids.is_empty() || intersects(&cell_ids, &filter_ids)
        }
        Some(SelectCondition::OptionIsNot | SelectCondition::OptionDoesNotContain) => {
            filter_ids.is_empty() || !intersects(&cell_ids, &filter_ids)
        }
        Some(SelectCondition::OptionIsEmpty) => cell_ids.is_empty(),
        Some(SelectCondition::OptionIsNotEmpty) => !cell_ids.is_empty(),
        None => true,
    }
}

fn evaluate_checklist(filter: &Filter, cell: Option<&Cell>) -> bool {
    let percentage = cell.and_then(codec::checklist_percentage);
    match ChecklistCondition::from_i64(filter.condition) {
        Some(ChecklistCondition::IsComplete) => percentage == Some(1.0),
        Some(ChecklistCondition::IsIncomplete) => percentage != Some(1.0),
        None => true,
    }
}

fn evaluate_date(filter: &Filter, cell: Option<&Cell>, field_type: FieldType, row: &Row) -> bool {
    // Derived time fields read row metadata (milliseconds), stored date
    // cells carry epoch seconds.
    let value = match field_type {
        FieldType::CreatedTime => codec::DateCellValue {
            start: Some(row.created_at / 1000),
            ..Default::default()
        },
        FieldType::LastEditedTime => codec::DateCellValue {
            start: Some(row.last_modified / 1000),
            ..Default::default()
        },
        _ => cell.map(codec::date_cell_value).unwrap_or_default(),
    };
    let start_day = value.start.and_then(day_of);
    let end_day = value.end.or(value.start).and_then(day_of);

    let content: DateFilterContent =
        serde_json::from_str(&filter.content).unwrap_or_default();
    // Malformed or missing reference falls back to today.
    let reference = content
        .timestamp
        .and_then(day_of)
        .unwrap_or_else(|| Utc::now().date_naive());

    match DateCondition::from_i64(filter.condition) {
        Some(DateCondition::DateStartsOn) => start_day == Some(reference),
        Some(DateCondition::DateStartsBefore) => matches!(start_day, Some(d) if d < reference),
        Some(DateCondition::DateStartsAfter) => matches!(start_day, Some(d) if d > reference),
        Some(DateCondition::DateStartsOnOrBefore) => {
            matches!(start_day, Some(d) if d <= reference)
        }
        Some(DateCondition::DateStartsOnOrAfter) => {
            matches!(start_day, Some(d) if d >= reference)
        }
        Some(DateCondition::DateStartsBetween) => within(start_day, &content),
        Some(DateCondition::DateStartIsEmpty) => start_day.is_none(),
        Some(DateCondition::DateStartIsNotEmpty) => start_day.is_some(),
        Some(DateCondition::DateEndsOn) => end_day == Some(reference),
        Some(DateCondition::DateEndsBefore) => matches!(end_day, Some(d) if d < reference),
        Some(DateCondition::DateEndsAfter) => matches!(end_day, Some(d) if d > reference),
        Some(DateCondition::DateEndsOnOrBefore) => matches!(end_day, Some(d) if d <= reference),
        Some(DateCondition::DateEndsOnOrAfter) => matches!(end_day, Some(d) if d >= reference),
        Some(DateCondition::DateEndsBetween) => within(end_day, &content),
        None => true,
    }
}

/// Day inside the range carried by the filter content. A missing bound
/// leaves that side of the range open, so a half-configured filter still
/// constrains only the side it names.
fn within(day: Option<NaiveDate>, content: &DateFilterContent) -> bool {
    let Some(day) = day else {
        return false;
    };
    let start = content.start.and_then(day_of);
    let end = content.end.and_then(day_of);
    start.map_or(true, |s| s <= day) && end.map_or(true, |e| day <= e)
}

fn day_of(timestamp_secs: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp_secs, 0).map(|dt| dt.date_naive())
}

fn evaluate_relation(filter: &Filter, cell_ids: Vec<String>) -> bool {
    let filter_ids = id_list(&filter.content);
    // Legacy documents stored text emptiness discriminants on relation
    // filters.
    let condition = RelationCondition::from_i64(filter.condition).or(match filter.condition {
        6 => Some(RelationCondition::IsEmpty),
        7 => Some(RelationCondition::IsNotEmpty),
        _ => None,
    });

    match condition {
        Some(RelationCondition::Contains) => {
            filter_ids.is_empty() || intersects(&cell_ids, &filter_ids)
        }
        Some(RelationCondition::DoesNotContain) => {
            filter_ids.is_empty() || !intersects(&cell_ids, &filter_ids)
        }
        Some(RelationCondition::IsEmpty) => cell_ids.is_empty(),
        Some(RelationCondition::IsNotEmpty) => !cell_ids.is_empty(),
        None => true,
    }
}

fn evaluate_person(filter: &Filter, cell_ids: Vec<String>) -> bool {
    let filter_ids = id_list(&filter.content);
    // Same legacy discriminant mapping as relation filters.
    let condition = PersonCondition::from_i64(filter.condition).or(match filter.condition {
        6 => Some(PersonCondition::IsEmpty),
        7 => Some(PersonCondition::IsNotEmpty),
        _ => None,
    });

    match condition {
        Some(PersonCondition::Contains) => {
            filter_ids.is_empty() || intersects(&cell_ids, &filter_ids)
        }
        Some(PersonCondition::DoesNotContain) => {
            filter_ids.is_empty() || !intersects(&cell_ids, &filter_ids)
        }
        Some(PersonCondition::IsEmpty) => cell_ids.is_empty(),
        Some(PersonCondition::IsNotEmpty) => !cell_ids.is_empty(),
        None => true,
    }
}

/// Parse filter content as an id list: a JSON string array, or a
/// comma-joined list.
fn id_list(content: &str) -> Vec<String> {
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }
    if content.starts_with('[') {
        if let Ok(ids) = serde_json::from_str::<Vec<String>>(content) {
            return ids;
        }
    }
    content
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|id| b.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_api::{CellData, SelectOption, SelectTypeOption};

    fn fields_with(field: Field) -> HashMap<String, Field> {
        HashMap::from([(field.id.clone(), field)])
    }

    fn row_with_cell(row_id: &str, field_id: &str, cell: Cell) -> Row {
        let mut row = Row::new(row_id);
        row.cells.insert(field_id.to_string(), cell);
        row
    }

    fn status_field() -> Field {
        let mut field = Field::new("status", "Status", FieldType::SingleSelect);
        field.type_options.insert(
            FieldType::SingleSelect.as_i64(),
            serde_json::to_value(SelectTypeOption {
                options: vec![
                    SelectOption {
                        id: "done".into(),
                        name: "Done".into(),
                        color: String::new(),
                    },
                    SelectOption {
                        id: "todo".into(),
                        name: "Todo".into(),
                        color: String::new(),
                    },
                ],
                disable_color: false,
            })
            .unwrap(),
        );
        field
    }

    #[test]
    fn test_select_filter_keeps_matching_rows() {
        let fields = fields_with(status_field());
        let rows = vec![
            row_with_cell("r1", "status", Cell::text("done", FieldType::SingleSelect)),
            row_with_cell("r2", "status", Cell::text("todo", FieldType::SingleSelect)),
        ];
        let filters = vec![Filter::data(
            "f",
            "status",
            SelectCondition::OptionIs.as_i64(),
            "done",
        )];

        let passed = filter_rows(&rows, &filters, &fields);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].id, "r1");
    }

    #[test]
    fn test_filter_evaluation_is_idempotent() {
        let fields = fields_with(status_field());
        let rows = vec![
            row_with_cell("r1", "status", Cell::text("done", FieldType::SingleSelect)),
            row_with_cell("r2", "status", Cell::text("todo", FieldType::SingleSelect)),
        ];
        let filters = vec![Filter::data(
            "f",
            "status",
            SelectCondition::OptionIs.as_i64(),
            "done",
        )];

        let first = filter_rows(&rows, &filters, &fields);
        let second = filter_rows(&first, &filters, &fields);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dangling_field_reference_is_vacuously_true() {
        let fields = HashMap::new();
        let row = Row::new("r1");
        let filter = Filter::data("f", "ghost", TextCondition::Is.as_i64(), "x");
        assert!(evaluate(&filter, &row, &fields));
    }

    #[test]
    fn test_same_day_date_equality() {
        let field = Field::new("due", "Due", FieldType::DateTime);
        let fields = fields_with(field);
        // 2024-03-05 08:00 vs 2024-03-05 21:30 UTC.
        let row = row_with_cell("r1", "due", Cell::text("1709625600", FieldType::DateTime));
        let content = serde_json::json!({ "timestamp": 1_709_674_200i64 }).to_string();
        let filter = Filter::data("f", "due", DateCondition::DateStartsOn.as_i64(), content);
        assert!(evaluate(&filter, &row, &fields));

        // Next calendar day fails.
        let next_day = serde_json::json!({ "timestamp": 1_709_712_000i64 }).to_string();
        let filter = Filter::data("f", "due", DateCondition::DateStartsOn.as_i64(), next_day);
        assert!(!evaluate(&filter, &row, &fields));
    }

    #[test]
    fn test_number_comparison_fails_closed_on_garbage() {
        let field = Field::new("n", "Amount", FieldType::Number);
        let fields = fields_with(field);
        let row = row_with_cell("r1", "n", Cell::text("not a number", FieldType::Number));

        let gt = Filter::data("f", "n", NumberCondition::GreaterThan.as_i64(), "5");
        assert!(!evaluate(&gt, &row, &fields));

        let not_empty = Filter::data("f", "n", NumberCondition::IsNotEmpty.as_i64(), "");
        assert!(evaluate(&not_empty, &row, &fields));
    }

    #[test]
    fn test_vacuous_truth_for_empty_combinators() {
        let fields = HashMap::new();
        let row = Row::new("r1");
        assert!(evaluate(
            &Filter::group("and", FilterKind::And, vec![]),
            &row,
            &fields
        ));
        assert!(evaluate(
            &Filter::group("or", FilterKind::Or, vec![]),
            &row,
            &fields
        ));
    }

    #[test]
    fn test_nested_or_short_circuits_per_child() {
        let fields = fields_with(Field::new("t", "Title", FieldType::RichText));
        let row = row_with_cell("r1", "t", Cell::text("Hello World", FieldType::RichText));
        let tree = Filter::group(
            "or",
            FilterKind::Or,
            vec![
                Filter::data("a", "t", TextCondition::Is.as_i64(), "nope"),
                Filter::data("b", "t", TextCondition::Contains.as_i64(), "world"),
            ],
        );
        assert!(evaluate(&tree, &row, &fields));
    }

    #[test]
    fn test_legacy_relation_emptiness_conditions_normalize() {
        let fields = fields_with(Field::new("rel", "Links", FieldType::Relation));
        let row = row_with_cell(
            "r1",
            "rel",
            Cell::new(CellData::Ids(vec!["rowA".into()]), FieldType::Relation),
        );
        // Discriminant 7 is the legacy text IsNotEmpty.
        let filter = Filter::data("f", "rel", 7, "");
        assert!(evaluate(&filter, &row, &fields));

        let empty_filter = Filter::data("f", "rel", 6, "");
        assert!(!evaluate(&empty_filter, &row, &fields));
    }

    #[test]
    fn test_relation_contains_with_empty_filter_set_passes() {
        let fields = fields_with(Field::new("rel", "Links", FieldType::Relation));
        let row = Row::new("r1");
        let filter = Filter::data("f", "rel", RelationCondition::Contains.as_i64(), "");
        assert!(evaluate(&filter, &row, &fields));
    }

    #[test]
    fn test_person_filter_matches_member_ids() {
        let fields = fields_with(Field::new("owner", "Owner", FieldType::Person));
        let row = row_with_cell("r1", "owner", Cell::text(r#"["u1","u2"]"#, FieldType::Person));

        let contains = Filter::data("f", "owner", PersonCondition::Contains.as_i64(), "u2");
        assert!(evaluate(&contains, &row, &fields));

        let excludes = Filter::data("f", "owner", PersonCondition::DoesNotContain.as_i64(), "u2");
        assert!(!evaluate(&excludes, &row, &fields));

        // Legacy text emptiness discriminant on a person filter.
        let not_empty = Filter::data("f", "owner", 7, "");
        assert!(evaluate(&not_empty, &row, &fields));
    }

    #[test]
    fn test_half_bounded_date_range_is_open_ended() {
        let fields = fields_with(Field::new("due", "Due", FieldType::DateTime));
        // 2024-03-05.
        let row = row_with_cell("r1", "due", Cell::text("1709625600", FieldType::DateTime));
        let between = DateCondition::DateStartsBetween.as_i64();

        // Only a lower bound: 2024-03-01.
        let from = serde_json::json!({ "start": 1_709_251_200i64 }).to_string();
        assert!(evaluate(&Filter::data("f", "due", between, from), &row, &fields));

        // Only an upper bound: 2024-03-03 excludes the row.
        let until = serde_json::json!({ "end": 1_709_424_000i64 }).to_string();
        assert!(!evaluate(&Filter::data("f", "due", between, until), &row, &fields));

        // An upper bound past the row's day keeps it: 2024-03-06.
        let later = serde_json::json!({ "end": 1_709_683_200i64 }).to_string();
        assert!(evaluate(&Filter::data("f", "due", between, later), &row, &fields));

        // No bounds constrain nothing.
        let open = serde_json::json!({}).to_string();
        assert!(evaluate(&Filter::data("f", "due", between, open), &row, &fields));
    }

    #[test]
    fn test_missing_cell_counts_as_empty_text() {
        let fields = fields_with(Field::new("t", "Title", FieldType::RichText));
        let row = Row::new("r1");
        let filter = Filter::data("f", "t", TextCondition::IsEmpty.as_i64(), "");
        assert!(evaluate(&filter, &row, &fields));
    }
}
