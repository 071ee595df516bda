//! View map schema: one Loro map per view under the `views` container.
//!
//! Field order and row order live here and nowhere else; both are plain
//! lists of id strings. Filters are maps with nested `children` lists,
//! sorts/groups/calculations are flat maps in lists.

use anyhow::Result;
use std::collections::HashMap;

use gridbase_api::{
    BoardLayoutSetting, CalendarLayoutSetting, Calculation, CalculationType, FieldSetting,
    FieldVisibility, Filter, FilterKind, GroupColumn, GroupSetting, LayoutSettings, Sort,
    SortCondition, View, ViewLayout, DEFAULT_FIELD_WIDTH,
};

use super::ext::{ListExt, MapExt};

const ID: &str = "id";
const NAME: &str = "name";
const LAYOUT: &str = "layout";
pub const FIELD_ORDERS: &str = "field_orders";
pub const ROW_ORDERS: &str = "row_orders";
const FILTERS: &str = "filters";
const SORTS: &str = "sorts";
const GROUPS: &str = "groups";
const CALCULATIONS: &str = "calculations";
const FIELD_SETTINGS: &str = "field_settings";
const LAYOUT_SETTINGS: &str = "layout_settings";

const FIELD_ID: &str = "field_id";
const FILTER_TYPE: &str = "filter_type";
const CONDITION: &str = "condition";
const CONTENT: &str = "content";
const CHILDREN: &str = "children";
const COLUMNS: &str = "columns";
const VISIBLE: &str = "visible";
const TYPE: &str = "type";
const VALUE: &str = "value";
const VISIBILITY: &str = "visibility";
const WIDTH: &str = "width";
const WRAP: &str = "wrap";
const BOARD: &str = "board";
const CALENDAR: &str = "calendar";
const HIDE_UNGROUPED: &str = "hide_ungrouped_column";
const COLLAPSED_GROUPS: &str = "collapsed_group_ids";
const FIRST_DAY_OF_WEEK: &str = "first_day_of_week";
const SHOW_WEEKENDS: &str = "show_weekends";
const SHOW_WEEK_NUMBERS: &str = "show_week_numbers";

/// Write a full view, creating its container and initializing every list.
pub fn write_view(views_map: &loro::LoroMap, view: &View) -> Result<loro::LoroMap> {
    let view_map = views_map.insert_container(&view.id, loro::LoroMap::new())?;
    view_map.insert(NAME, loro::LoroValue::from(view.name.as_str()))?;
    view_map.insert(LAYOUT, loro::LoroValue::from(view.layout.as_i64()))?;

    let field_orders = view_map.get_or_create_list(FIELD_ORDERS)?;
    for field_id in &view.field_orders {
        field_orders.push(loro::LoroValue::from(field_id.as_str()))?;
    }
    let row_orders = view_map.get_or_create_list(ROW_ORDERS)?;
    for row_id in &view.row_orders {
        row_orders.push(loro::LoroValue::from(row_id.as_str()))?;
    }

    let filters = view_map.get_or_create_list(FILTERS)?;
    for filter in &view.filters {
        append_filter(&filters, filter)?;
    }
    let sorts = view_map.get_or_create_list(SORTS)?;
    for sort in &view.sorts {
        append_sort(&sorts, sort)?;
    }
    let groups = view_map.get_or_create_list(GROUPS)?;
    for group in &view.groups {
        append_group(&groups, group)?;
    }
    let calculations = view_map.get_or_create_list(CALCULATIONS)?;
    for calculation in &view.calculations {
        append_calculation(&calculations, calculation)?;
    }

    for (field_id, setting) in &view.field_settings {
        write_field_setting(&view_map, field_id, setting)?;
    }
    write_layout_settings(&view_map, &view.layout_settings)?;

    Ok(view_map)
}

pub fn read_view(view_id: &str, view_map: &loro::LoroMap) -> View {
    let layout = view_map
        .get_i64(LAYOUT)
        .and_then(ViewLayout::from_i64)
        .unwrap_or(ViewLayout::Grid);

    let mut field_settings = HashMap::new();
    if let Some(settings_map) = view_map.child_map(FIELD_SETTINGS) {
        settings_map.for_each(|k, v| {
            if let loro::ValueOrContainer::Container(loro::Container::Map(setting_map)) = v {
                field_settings.insert(k.to_string(), read_field_setting(&setting_map));
            }
        });
    }

    View {
        id: view_id.to_string(),
        name: view_map.get_string(NAME).unwrap_or_default(),
        layout,
        field_orders: view_map
            .child_list(FIELD_ORDERS)
            .map(|l| l.collect_strings())
            .unwrap_or_default(),
        row_orders: view_map
            .child_list(ROW_ORDERS)
            .map(|l| l.collect_strings())
            .unwrap_or_default(),
        filters: view_map
            .child_list(FILTERS)
            .map(|l| l.child_maps().iter().map(read_filter).collect())
            .unwrap_or_default(),
        sorts: view_map
            .child_list(SORTS)
            .map(|l| l.child_maps().iter().map(read_sort).collect())
            .unwrap_or_default(),
        groups: view_map
            .child_list(GROUPS)
            .map(|l| l.child_maps().iter().map(read_group).collect())
            .unwrap_or_default(),
        calculations: view_map
            .child_list(CALCULATIONS)
            .map(|l| l.child_maps().iter().map(read_calculation).collect())
            .unwrap_or_default(),
        field_settings,
        layout_settings: read_layout_settings(view_map),
    }
}

pub fn set_name(view_map: &loro::LoroMap, name: &str) -> Result<()> {
    view_map.insert(NAME, loro::LoroValue::from(name))?;
    Ok(())
}

pub fn set_layout(view_map: &loro::LoroMap, layout: ViewLayout) -> Result<()> {
    view_map.insert(LAYOUT, loro::LoroValue::from(layout.as_i64()))?;
    Ok(())
}

/// Strict accessor: a view whose row order list was never initialized is
/// malformed, and operations against it fail (the all-views dispatcher
/// isolates that failure per view).
pub fn row_orders(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map
        .child_list(ROW_ORDERS)
        .ok_or_else(|| anyhow::anyhow!("View has no row_orders list"))
}

pub fn field_orders(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map
        .child_list(FIELD_ORDERS)
        .ok_or_else(|| anyhow::anyhow!("View has no field_orders list"))
}

pub fn filters_list(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map.get_or_create_list(FILTERS)
}

pub fn sorts_list(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map.get_or_create_list(SORTS)
}

pub fn groups_list(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map.get_or_create_list(GROUPS)
}

pub fn calculations_list(view_map: &loro::LoroMap) -> Result<loro::LoroList> {
    view_map.get_or_create_list(CALCULATIONS)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

pub fn append_filter(list: &loro::LoroList, filter: &Filter) -> Result<()> {
    write_filter_at(list, list.len(), filter)
}

fn write_filter_at(list: &loro::LoroList, index: usize, filter: &Filter) -> Result<()> {
    let filter_map = list.insert_container(index, loro::LoroMap::new())?;
    filter_map.insert(ID, loro::LoroValue::from(filter.id.as_str()))?;
    filter_map.insert(FIELD_ID, loro::LoroValue::from(filter.field_id.as_str()))?;
    filter_map.insert(FILTER_TYPE, loro::LoroValue::from(filter.kind.as_i64()))?;
    filter_map.insert(CONDITION, loro::LoroValue::from(filter.condition))?;
    filter_map.insert(CONTENT, loro::LoroValue::from(filter.content.as_str()))?;
    if !filter.children.is_empty() {
        let children = filter_map.get_or_create_list(CHILDREN)?;
        for child in &filter.children {
            append_filter(&children, child)?;
        }
    }
    Ok(())
}

pub fn read_filter(filter_map: &loro::LoroMap) -> Filter {
    Filter {
        id: filter_map.get_string(ID).unwrap_or_default(),
        field_id: filter_map.get_string(FIELD_ID).unwrap_or_default(),
        kind: filter_map
            .get_i64(FILTER_TYPE)
            .and_then(FilterKind::from_i64)
            .unwrap_or(FilterKind::Data),
        condition: filter_map.get_i64(CONDITION).unwrap_or(0),
        content: filter_map.get_string(CONTENT).unwrap_or_default(),
        children: filter_map
            .child_list(CHILDREN)
            .map(|l| l.child_maps().iter().map(read_filter).collect())
            .unwrap_or_default(),
    }
}

pub fn filter_kind(filter_map: &loro::LoroMap) -> FilterKind {
    filter_map
        .get_i64(FILTER_TYPE)
        .and_then(FilterKind::from_i64)
        .unwrap_or(FilterKind::Data)
}

/// Depth-first search for a filter node by id, descending into And/Or
/// children.
pub fn find_filter(list: &loro::LoroList, filter_id: &str) -> Option<loro::LoroMap> {
    for filter_map in list.child_maps() {
        if filter_map.get_string(ID).as_deref() == Some(filter_id) {
            return Some(filter_map);
        }
        if let Some(children) = filter_map.child_list(CHILDREN) {
            if let Some(found) = find_filter(&children, filter_id) {
                return Some(found);
            }
        }
    }
    None
}

/// Remove a filter node by id anywhere in the tree. Returns whether a node
/// was removed.
pub fn remove_filter(list: &loro::LoroList, filter_id: &str) -> Result<bool> {
    if let Some((index, _)) = list.find_map_by_id(filter_id) {
        list.delete(index, 1)?;
        return Ok(true);
    }
    for filter_map in list.child_maps() {
        if let Some(children) = filter_map.child_list(CHILDREN) {
            if remove_filter(&children, filter_id)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Remove every filter node (including nested ones) referencing the given
/// field. Returns the number of removed nodes.
pub fn remove_filters_for_field(list: &loro::LoroList, field_id: &str) -> Result<usize> {
    let mut removed = 0;
    loop {
        let target = list.find_index(|v| match v {
            loro::ValueOrContainer::Container(loro::Container::Map(m)) => {
                Some(m.get_string(FIELD_ID).as_deref() == Some(field_id))
            }
            _ => None,
        });
        match target {
            Some(index) => {
                list.delete(index, 1)?;
                removed += 1;
            }
            None => break,
        }
    }
    for filter_map in list.child_maps() {
        if let Some(children) = filter_map.child_list(CHILDREN) {
            removed += remove_filters_for_field(&children, field_id)?;
        }
    }
    Ok(removed)
}

/// Remove an option id from the content of every leaf filter on the given
/// field, descending into children. Returns the number of filters whose
/// content changed.
pub fn scrub_filter_option(
    list: &loro::LoroList,
    field_id: &str,
    option_id: &str,
) -> Result<usize> {
    let mut changed = 0;
    for filter_map in list.child_maps() {
        if filter_map.get_string(FIELD_ID).as_deref() == Some(field_id) {
            let content = filter_map.get_string(CONTENT).unwrap_or_default();
            let kept: Vec<&str> = content
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty() && *token != option_id)
                .collect();
            let scrubbed = kept.join(",");
            if scrubbed != content {
                filter_map.insert(CONTENT, loro::LoroValue::from(scrubbed.as_str()))?;
                changed += 1;
            }
        }
        if let Some(children) = filter_map.child_list(CHILDREN) {
            changed += scrub_filter_option(&children, field_id, option_id)?;
        }
    }
    Ok(changed)
}

pub fn set_filter_condition(
    filter_map: &loro::LoroMap,
    condition: i64,
    content: &str,
) -> Result<()> {
    filter_map.insert(CONDITION, loro::LoroValue::from(condition))?;
    filter_map.insert(CONTENT, loro::LoroValue::from(content))?;
    Ok(())
}

pub fn filter_children(filter_map: &loro::LoroMap) -> Result<loro::LoroList> {
    filter_map.get_or_create_list(CHILDREN)
}

// ---------------------------------------------------------------------------
// Sorts
// ---------------------------------------------------------------------------

pub fn append_sort(list: &loro::LoroList, sort: &Sort) -> Result<()> {
    let sort_map = list.insert_container(list.len(), loro::LoroMap::new())?;
    sort_map.insert(ID, loro::LoroValue::from(sort.id.as_str()))?;
    sort_map.insert(FIELD_ID, loro::LoroValue::from(sort.field_id.as_str()))?;
    sort_map.insert(CONDITION, loro::LoroValue::from(sort.condition.as_i64()))?;
    Ok(())
}

pub fn set_sort_condition(sort_map: &loro::LoroMap, condition: SortCondition) -> Result<()> {
    sort_map.insert(CONDITION, loro::LoroValue::from(condition.as_i64()))?;
    Ok(())
}

pub fn read_sort(sort_map: &loro::LoroMap) -> Sort {
    Sort {
        id: sort_map.get_string(ID).unwrap_or_default(),
        field_id: sort_map.get_string(FIELD_ID).unwrap_or_default(),
        condition: sort_map
            .get_i64(CONDITION)
            .and_then(SortCondition::from_i64)
            .unwrap_or(SortCondition::Ascending),
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub fn append_group(list: &loro::LoroList, group: &GroupSetting) -> Result<()> {
    let group_map = list.insert_container(list.len(), loro::LoroMap::new())?;
    group_map.insert(ID, loro::LoroValue::from(group.id.as_str()))?;
    group_map.insert(FIELD_ID, loro::LoroValue::from(group.field_id.as_str()))?;
    group_map.insert(CONTENT, loro::LoroValue::from(group.content.as_str()))?;
    let columns = group_map.get_or_create_list(COLUMNS)?;
    for column in &group.columns {
        append_group_column(&columns, column)?;
    }
    Ok(())
}

pub fn append_group_column(columns: &loro::LoroList, column: &GroupColumn) -> Result<()> {
    insert_group_column(columns, columns.len(), column)
}

pub fn insert_group_column(
    columns: &loro::LoroList,
    index: usize,
    column: &GroupColumn,
) -> Result<()> {
    let column_map = columns.insert_container(index, loro::LoroMap::new())?;
    column_map.insert(ID, loro::LoroValue::from(column.id.as_str()))?;
    column_map.insert(VISIBLE, loro::LoroValue::from(column.visible))?;
    Ok(())
}

pub fn set_group_column_visibility(column_map: &loro::LoroMap, visible: bool) -> Result<()> {
    column_map.insert(VISIBLE, loro::LoroValue::from(visible))?;
    Ok(())
}

/// The group setting grouping by the given field, if any.
pub fn group_for_field(list: &loro::LoroList, field_id: &str) -> Option<loro::LoroMap> {
    list.child_maps()
        .into_iter()
        .find(|m| m.get_string(FIELD_ID).as_deref() == Some(field_id))
}

pub fn read_group(group_map: &loro::LoroMap) -> GroupSetting {
    GroupSetting {
        id: group_map.get_string(ID).unwrap_or_default(),
        field_id: group_map.get_string(FIELD_ID).unwrap_or_default(),
        content: group_map.get_string(CONTENT).unwrap_or_default(),
        columns: group_map
            .child_list(COLUMNS)
            .map(|l| {
                l.child_maps()
                    .iter()
                    .map(|m| GroupColumn {
                        id: m.get_string(ID).unwrap_or_default(),
                        visible: m.get_bool(VISIBLE).unwrap_or(true),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

pub fn group_columns(group_map: &loro::LoroMap) -> Result<loro::LoroList> {
    group_map.get_or_create_list(COLUMNS)
}

// ---------------------------------------------------------------------------
// Calculations
// ---------------------------------------------------------------------------

pub fn append_calculation(list: &loro::LoroList, calculation: &Calculation) -> Result<()> {
    let calc_map = list.insert_container(list.len(), loro::LoroMap::new())?;
    calc_map.insert(ID, loro::LoroValue::from(calculation.id.as_str()))?;
    calc_map.insert(FIELD_ID, loro::LoroValue::from(calculation.field_id.as_str()))?;
    calc_map.insert(
        TYPE,
        loro::LoroValue::from(calculation.calculation_type.as_i64()),
    )?;
    calc_map.insert(VALUE, loro::LoroValue::from(calculation.value.as_str()))?;
    Ok(())
}

pub fn read_calculation(calc_map: &loro::LoroMap) -> Calculation {
    Calculation {
        id: calc_map.get_string(ID).unwrap_or_default(),
        field_id: calc_map.get_string(FIELD_ID).unwrap_or_default(),
        calculation_type: calc_map
            .get_i64(TYPE)
            .and_then(CalculationType::from_i64)
            .unwrap_or(CalculationType::Count),
        value: calc_map.get_string(VALUE).unwrap_or_default(),
    }
}

pub fn set_calculation_value(calc_map: &loro::LoroMap, value: &str) -> Result<()> {
    calc_map.insert(VALUE, loro::LoroValue::from(value))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Field settings & layout settings
// ---------------------------------------------------------------------------

pub fn write_field_setting(
    view_map: &loro::LoroMap,
    field_id: &str,
    setting: &FieldSetting,
) -> Result<()> {
    let settings_map = view_map.get_or_create_map(FIELD_SETTINGS)?;
    let setting_map = settings_map.get_or_create_map(field_id)?;
    setting_map.insert(
        VISIBILITY,
        loro::LoroValue::from(setting.visibility.as_i64()),
    )?;
    setting_map.insert(WIDTH, loro::LoroValue::from(setting.width))?;
    setting_map.insert(WRAP, loro::LoroValue::from(setting.wrap))?;
    Ok(())
}

fn read_field_setting(setting_map: &loro::LoroMap) -> FieldSetting {
    FieldSetting {
        visibility: setting_map
            .get_i64(VISIBILITY)
            .and_then(FieldVisibility::from_i64)
            .unwrap_or(FieldVisibility::AlwaysShown),
        width: setting_map.get_i64(WIDTH).unwrap_or(DEFAULT_FIELD_WIDTH),
        wrap: setting_map.get_bool(WRAP).unwrap_or(false),
    }
}

pub fn field_setting_map(view_map: &loro::LoroMap, field_id: &str) -> Result<loro::LoroMap> {
    let settings_map = view_map.get_or_create_map(FIELD_SETTINGS)?;
    settings_map.get_or_create_map(field_id)
}

pub fn remove_field_setting(view_map: &loro::LoroMap, field_id: &str) -> Result<()> {
    if let Some(settings_map) = view_map.child_map(FIELD_SETTINGS) {
        if settings_map.get(field_id).is_some() {
            settings_map.delete(field_id)?;
        }
    }
    Ok(())
}

pub fn set_width(view_map: &loro::LoroMap, field_id: &str, width: i64) -> Result<()> {
    let setting_map = field_setting_map(view_map, field_id)?;
    setting_map.insert(WIDTH, loro::LoroValue::from(width))?;
    Ok(())
}

pub fn set_visibility(
    view_map: &loro::LoroMap,
    field_id: &str,
    visibility: FieldVisibility,
) -> Result<()> {
    let setting_map = field_setting_map(view_map, field_id)?;
    setting_map.insert(VISIBILITY, loro::LoroValue::from(visibility.as_i64()))?;
    Ok(())
}

pub fn write_layout_settings(view_map: &loro::LoroMap, settings: &LayoutSettings) -> Result<()> {
    let settings_map = view_map.get_or_create_map(LAYOUT_SETTINGS)?;
    if let Some(board) = &settings.board {
        let board_map = settings_map.get_or_create_map(BOARD)?;
        board_map.insert(
            HIDE_UNGROUPED,
            loro::LoroValue::from(board.hide_ungrouped_column),
        )?;
        let collapsed = board_map.get_or_create_list(COLLAPSED_GROUPS)?;
        if collapsed.len() > 0 {
            collapsed.delete(0, collapsed.len())?;
        }
        for group_id in &board.collapsed_group_ids {
            collapsed.push(loro::LoroValue::from(group_id.as_str()))?;
        }
    }
    if let Some(calendar) = &settings.calendar {
        write_calendar_setting(view_map, calendar)?;
    }
    Ok(())
}

pub fn write_calendar_setting(
    view_map: &loro::LoroMap,
    calendar: &CalendarLayoutSetting,
) -> Result<()> {
    let settings_map = view_map.get_or_create_map(LAYOUT_SETTINGS)?;
    let calendar_map = settings_map.get_or_create_map(CALENDAR)?;
    calendar_map.insert(FIELD_ID, loro::LoroValue::from(calendar.field_id.as_str()))?;
    calendar_map.insert(
        FIRST_DAY_OF_WEEK,
        loro::LoroValue::from(calendar.first_day_of_week),
    )?;
    calendar_map.insert(SHOW_WEEKENDS, loro::LoroValue::from(calendar.show_weekends))?;
    calendar_map.insert(
        SHOW_WEEK_NUMBERS,
        loro::LoroValue::from(calendar.show_week_numbers),
    )?;
    Ok(())
}

pub fn write_board_setting(view_map: &loro::LoroMap, board: &BoardLayoutSetting) -> Result<()> {
    write_layout_settings(
        view_map,
        &LayoutSettings {
            board: Some(board.clone()),
            calendar: None,
        },
    )
}

fn read_layout_settings(view_map: &loro::LoroMap) -> LayoutSettings {
    let Some(settings_map) = view_map.child_map(LAYOUT_SETTINGS) else {
        return LayoutSettings::default();
    };

    let board = settings_map.child_map(BOARD).map(|board_map| {
        BoardLayoutSetting {
            hide_ungrouped_column: board_map.get_bool(HIDE_UNGROUPED).unwrap_or(false),
            collapsed_group_ids: board_map
                .child_list(COLLAPSED_GROUPS)
                .map(|l| l.collect_strings())
                .unwrap_or_default(),
        }
    });

    let calendar = settings_map.child_map(CALENDAR).map(|calendar_map| {
        CalendarLayoutSetting {
            field_id: calendar_map.get_string(FIELD_ID).unwrap_or_default(),
            first_day_of_week: calendar_map.get_i64(FIRST_DAY_OF_WEEK).unwrap_or(0),
            show_weekends: calendar_map.get_bool(SHOW_WEEKENDS).unwrap_or(true),
            show_week_numbers: calendar_map.get_bool(SHOW_WEEK_NUMBERS).unwrap_or(false),
        }
    });

    LayoutSettings { board, calendar }
}
