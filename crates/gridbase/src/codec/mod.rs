//! Field-type codec: raw cell payloads to canonical in-memory values.
//!
//! Cell `data` is type-dependent: a plain string for most types, a JSON
//! blob for checklist and person cells, an id array for relation and
//! file-media cells. The decoders here are lenient by contract; legacy
//! and malformed payloads decode to safe defaults instead of failing the
//! evaluation pass.

mod defaults;

pub use defaults::{seed_cell_from_filter, SeedOutcome};

use gridbase_api::{
    Cell, CellData, ChecklistCellData, Field, FieldType, SelectOption, SelectTypeOption,
};

/// Checkbox truthiness. Everything else, including the empty cell, is
/// unchecked.
pub fn is_checked(raw: &str) -> bool {
    matches!(raw.trim(), "Yes" | "yes" | "true" | "1")
}

/// Timestamps decoded from one date-like cell. `start` is the cell's
/// primary payload in epoch seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateCellValue {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub include_time: bool,
    pub is_range: bool,
}

/// Decode a date-like cell. CreatedTime and LastEditedTime cells are
/// derived from row metadata upstream and arrive here as plain timestamps
/// too.
pub fn date_cell_value(cell: &Cell) -> DateCellValue {
    let start = cell.data.as_text().trim().parse::<i64>().ok();
    DateCellValue {
        start,
        end: cell.end_timestamp,
        include_time: cell.include_time,
        is_range: cell.is_range,
    }
}

/// Select options reachable from the field, regardless of which select
/// kind the field currently is. A field freshly switched away from a
/// select type still resolves its stale option list.
pub fn select_options(field: &Field) -> Vec<SelectOption> {
    let mut candidates = vec![field.field_type];
    for select_kind in [FieldType::SingleSelect, FieldType::MultiSelect] {
        if !candidates.contains(&select_kind) {
            candidates.push(select_kind);
        }
    }
    for field_type in candidates {
        if let Some(payload) = field.type_option(field_type) {
            if let Ok(type_option) =
                serde_json::from_value::<SelectTypeOption>(payload.clone())
            {
                if !type_option.options.is_empty() {
                    return type_option.options;
                }
            }
        }
    }
    Vec::new()
}

/// Resolve the option ids selected in a select cell.
///
/// The stored payload is normally a comma-joined id list, but legacy
/// documents stored option names, and cells written while the field was a
/// checklist carry the checklist JSON shape. All three decode.
pub fn select_ids_from_cell(cell: &Cell, field: &Field) -> Vec<String> {
    let raw = cell.data.as_text().trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let options = select_options(field);

    // Checklist-shaped legacy payload.
    if raw.starts_with('{') {
        if let Ok(checklist) = serde_json::from_str::<ChecklistCellData>(raw) {
            return checklist
                .selected_option_ids
                .iter()
                .filter_map(|id| resolve_option_token(id, &options))
                .collect();
        }
    }

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| resolve_option_token(token, &options))
        .collect()
}

fn resolve_option_token(token: &str, options: &[SelectOption]) -> Option<String> {
    if options.is_empty() {
        // No option list to validate against; trust the stored token.
        return Some(token.to_string());
    }
    if options.iter().any(|option| option.id == token) {
        return Some(token.to_string());
    }
    // Legacy name-based storage.
    options
        .iter()
        .find(|option| option.name.eq_ignore_ascii_case(token))
        .map(|option| option.id.clone())
}

/// Checklist completion ratio; `None` for empty or malformed payloads.
pub fn checklist_percentage(cell: &Cell) -> Option<f64> {
    let raw = cell.data.as_text();
    if raw.is_empty() {
        return None;
    }
    serde_json::from_str::<ChecklistCellData>(raw)
        .ok()
        .and_then(|data| data.percentage())
}

/// Row ids referenced by a relation (or file-media) cell. The canonical
/// storage is an id array; legacy cells stored a comma-joined string.
pub fn linked_ids(cell: &Cell) -> Vec<String> {
    match &cell.data {
        CellData::Ids(ids) => ids.clone(),
        CellData::Text(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
        CellData::Empty => Vec::new(),
    }
}

/// User ids in a person cell, stored as a JSON array of either plain id
/// strings or `{ "id": … }` objects.
pub fn person_ids(cell: &Cell) -> Vec<String> {
    let raw = cell.data.as_text();
    if raw.is_empty() {
        return Vec::new();
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .or_else(|| entry.get("id")?.as_str().map(str::to_string))
        })
        .collect()
}

/// The raw decimal string of a number cell, or `None` for an empty cell.
/// Validation against numeric syntax happens in the comparator.
pub fn number_text(cell: &Cell) -> Option<&str> {
    let raw = cell.data.as_text().trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Deep clone of a cell for row and field duplication.
///
/// Id arrays become new arrays with equal elements, never a shared
/// reference; mutating the clone must not affect the source.
pub fn clone_cell(cell: &Cell) -> Cell {
    let data = match &cell.data {
        CellData::Ids(ids) => CellData::Ids(ids.iter().cloned().collect()),
        other => other.clone(),
    };
    Cell { data, ..cell.clone() }
}

/// Build a select option list from distinct existing cell values, for a
/// type switch into a select kind from a non-select type.
pub fn synthesize_select_options<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> Vec<SelectOption> {
    let mut seen = std::collections::HashSet::new();
    let mut options = Vec::new();
    for value in values {
        for token in value.split(',').map(str::trim) {
            if token.is_empty() || !seen.insert(token.to_string()) {
                continue;
            }
            options.push(SelectOption {
                id: crate::operations::new_id(),
                name: token.to_string(),
                color: String::new(),
            });
        }
    }
    options
}
