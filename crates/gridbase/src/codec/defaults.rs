//! Default cell seeding for row creation.
//!
//! A row created from a filtered view should satisfy that view's filters,
//! so each applicable root filter contributes a seeded cell value. Derived
//! time fields and the calendar-bound date field cannot be pre-set; a
//! filter on one of those flags the row for the detail view instead.

use gridbase_api::{
    Cell, CellData, CheckboxCondition, DateCondition, DateFilterContent, Field, FieldType, Filter,
    FilterKind, NumberCondition, SelectCondition, TextCondition,
};

/// What one filter contributes to a freshly created row.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    /// Pre-fill the cell with this value.
    Cell(Cell),
    /// The value cannot be pre-set; open the row's detail view instead.
    OpenDetail,
    /// Nothing to seed; the empty cell already satisfies the filter, or
    /// no deterministic satisfying value exists.
    Skip,
}

/// Derive the seed for one field from one root filter of the originating
/// view. `now` is in epoch seconds and used for cell timestamps.
pub fn seed_cell_from_filter(
    filter: &Filter,
    field: &Field,
    now: i64,
    calendar_field_id: Option<&str>,
) -> SeedOutcome {
    if filter.kind != FilterKind::Data || filter.field_id != field.id {
        return SeedOutcome::Skip;
    }
    if field.field_type.is_derived_time() || calendar_field_id == Some(field.id.as_str()) {
        return SeedOutcome::OpenDetail;
    }

    match field.field_type {
        t if t.is_text_like() => seed_text(filter, field, now),
        FieldType::Number => seed_number(filter, field, now),
        FieldType::Checkbox => seed_checkbox(filter, field, now),
        t if t.is_select() => seed_select(filter, field, now),
        FieldType::DateTime => seed_date(filter, field, now),
        // No deterministic pre-fill exists for the rest.
        _ => SeedOutcome::Skip,
    }
}

fn seeded(field: &Field, data: CellData, now: i64) -> SeedOutcome {
    let mut cell = Cell::new(data, field.field_type);
    cell.created_at = now * 1000;
    cell.last_modified = now * 1000;
    SeedOutcome::Cell(cell)
}

fn seed_text(filter: &Filter, field: &Field, now: i64) -> SeedOutcome {
    match TextCondition::from_i64(filter.condition) {
        Some(
            TextCondition::Is
            | TextCondition::Contains
            | TextCondition::StartsWith
            | TextCondition::EndsWith,
        ) if !filter.content.is_empty() => {
            seeded(field, CellData::Text(filter.content.clone()), now)
        }
        _ => SeedOutcome::Skip,
    }
}

fn seed_number(filter: &Filter, field: &Field, now: i64) -> SeedOutcome {
    match NumberCondition::from_i64(filter.condition) {
        Some(
            NumberCondition::Equal
            | NumberCondition::GreaterThanOrEqualTo
            | NumberCondition::LessThanOrEqualTo,
        ) if !filter.content.is_empty() => {
            seeded(field, CellData::Text(filter.content.clone()), now)
        }
        _ => SeedOutcome::Skip,
    }
}

fn seed_checkbox(filter: &Filter, field: &Field, now: i64) -> SeedOutcome {
    match CheckboxCondition::from_i64(filter.condition) {
        Some(CheckboxCondition::IsChecked) => seeded(field, CellData::Text("Yes".into()), now),
        Some(CheckboxCondition::IsUnChecked) => seeded(field, CellData::Text("No".into()), now),
        None => SeedOutcome::Skip,
    }
}

fn seed_select(filter: &Filter, field: &Field, now: i64) -> SeedOutcome {
    match SelectCondition::from_i64(filter.condition) {
        Some(SelectCondition::OptionIs | SelectCondition::OptionContains) => {
            let first = filter
                .content
                .split(',')
                .map(str::trim)
                .find(|token| !token.is_empty());
            match first {
                Some(option_id) => seeded(field, CellData::Text(option_id.to_string()), now),
                None => SeedOutcome::Skip,
            }
        }
        _ => SeedOutcome::Skip,
    }
}

fn seed_date(filter: &Filter, field: &Field, now: i64) -> SeedOutcome {
    let content: DateFilterContent =
        serde_json::from_str(&filter.content).unwrap_or_default();
    match DateCondition::from_i64(filter.condition) {
        Some(
            DateCondition::DateStartsOn
            | DateCondition::DateStartsOnOrBefore
            | DateCondition::DateStartsOnOrAfter,
        ) => {
            let timestamp = content.timestamp.unwrap_or(now);
            seeded(field, CellData::Text(timestamp.to_string()), now)
        }
        Some(DateCondition::DateStartsBetween) => match content.start {
            Some(start) => seeded(field, CellData::Text(start.to_string()), now),
            None => SeedOutcome::Skip,
        },
        Some(DateCondition::DateStartIsEmpty) => SeedOutcome::Skip,
        // End-anchored and open-ended conditions need the detail view.
        Some(_) => SeedOutcome::OpenDetail,
        None => SeedOutcome::Skip,
    }
}
