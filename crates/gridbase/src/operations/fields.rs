//! Field (column) operations.
//!
//! Field order is per-view, so structural edits here pair a one-time write
//! against the `fields` container with an all-views fan-out over the order
//! lists.

use anyhow::Result;
use tracing::info;

use gridbase_api::{
    DatabaseError, DatabaseResult, Field, FieldType, GroupColumn, SelectOption, SelectTypeOption,
};

use crate::codec;
use crate::context::DatabaseContext;
use crate::dispatch::{apply_to_all_views, execute_operations, into_database_error};
use crate::model::ext::{ListExt, MapExt};
use crate::model::{self, database, field, reorder, row, view};

/// Add a field to the database and to every view's field order.
pub async fn create_field(
    ctx: &DatabaseContext,
    name: &str,
    field_type: FieldType,
) -> DatabaseResult<String> {
    let field_id = super::new_id();
    let mut new_field = Field::new(&field_id, name, field_type);
    new_field.last_modified = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            field::write_field(&database::fields_map(d), &new_field)?;
            apply_to_all_views(d, "field:create", |d, view_id| {
                let view_map = database::view_map(d, view_id)?;
                view::field_orders(&view_map)?
                    .push(loro::LoroValue::from(field_id.as_str()))?;
                Ok(())
            });
            Ok(())
        })],
        "field:create",
    )
    .await?;

    info!(field_id = %field_id, ?field_type, "field created");
    Ok(field_id)
}

/// Duplicate a field definition and its cell values. The copy lands right
/// after the source in every view's field order.
pub async fn duplicate_field(ctx: &DatabaseContext, field_id: &str) -> DatabaseResult<String> {
    let source = ctx.get_field(field_id).await?;
    let new_field_id = super::new_id();
    let mut copy = Field::new(&new_field_id, format!("{} (copy)", source.name), source.field_type);
    copy.icon = source.icon.clone();
    copy.type_options = source.type_options.clone();
    copy.last_modified = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            field::write_field(&database::fields_map(d), &copy)?;
            apply_to_all_views(d, "field:duplicate", |d, view_id| {
                let view_map = database::view_map(d, view_id)?;
                let orders = view::field_orders(&view_map)?;
                let index = orders
                    .index_of_str(field_id)
                    .map(|i| i + 1)
                    .unwrap_or_else(|| orders.len());
                orders.insert(index, loro::LoroValue::from(new_field_id.as_str()))?;
                Ok(())
            });
            Ok(())
        })],
        "field:duplicate",
    )
    .await?;

    // Cell values live in the row sub-documents and are cloned one row at
    // a time; rows are independent resources.
    for row_id in ctx.all_row_ids().await? {
        let row_doc = ctx.row_doc(&row_id).await?;
        row_doc
            .with_transaction("field:duplicate:cell", |d| {
                if let Some(cell_map) = row::cell_map(d, field_id) {
                    let cell = codec::clone_cell(&row::read_cell(&cell_map));
                    row::write_cell(&row::cells_map(d), &new_field_id, &cell)?;
                }
                Ok(())
            })
            .await
            .map_err(into_database_error)?;
    }

    Ok(new_field_id)
}

/// Delete a field and scrub every per-view structure referencing it.
pub async fn delete_field(ctx: &DatabaseContext, field_id: &str) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            database::field_map(d, field_id)?;
            database::fields_map(d).delete(field_id)?;
            apply_to_all_views(d, "field:delete", |d, view_id| {
                let view_map = database::view_map(d, view_id)?;
                view::field_orders(&view_map)?.remove_str(field_id)?;
                view::remove_field_setting(&view_map, field_id)?;
                view::remove_filters_for_field(&view::filters_list(&view_map)?, field_id)?;
                remove_entries_for_field(&view::sorts_list(&view_map)?, field_id)?;
                remove_entries_for_field(&view::groups_list(&view_map)?, field_id)?;
                remove_entries_for_field(&view::calculations_list(&view_map)?, field_id)?;
                Ok(())
            });
            Ok(())
        })],
        "field:delete",
    )
    .await
}

pub async fn rename_field(ctx: &DatabaseContext, field_id: &str, name: &str) -> DatabaseResult<()> {
    let now = model::now_millis();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            field::set_name(&field_map, name, now)
        })],
        "field:rename",
    )
    .await
}

pub async fn set_field_icon(
    ctx: &DatabaseContext,
    field_id: &str,
    icon: &str,
) -> DatabaseResult<()> {
    let now = model::now_millis();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            field::set_icon(&field_map, icon, now)
        })],
        "field:set_icon",
    )
    .await
}

/// Change a field's type without destroying cell data.
///
/// The previous type's option payload stays under its own key, and every
/// cell records the type it was written as in `source_field_type` before
/// the overwrite, so the switch can be reversed losslessly.
pub async fn switch_field_type(
    ctx: &DatabaseContext,
    field_id: &str,
    new_type: FieldType,
) -> DatabaseResult<()> {
    let source = ctx.get_field(field_id).await?;
    if source.field_type == new_type {
        return Ok(());
    }

    let migrated_option = migrated_select_option(ctx, &source, new_type).await?;
    let now = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            if let Some(payload) = &migrated_option {
                field::set_type_option(&field_map, new_type, payload)?;
            }
            field::set_field_type(&field_map, new_type, now)
        })],
        "field:switch_type",
    )
    .await?;

    for row_id in ctx.all_row_ids().await? {
        let row_doc = ctx.row_doc(&row_id).await?;
        row_doc
            .with_transaction("field:switch_type:cell", |d| {
                let Some(cell_map) = row::cell_map(d, field_id) else {
                    return Ok(());
                };
                let mut cell = row::read_cell(&cell_map);
                cell.source_field_type = Some(cell.field_type);
                cell.field_type = new_type;
                row::write_cell_into(&cell_map, &cell)
            })
            .await
            .map_err(into_database_error)?;
    }

    info!(field_id = %field_id, from = ?source.field_type, to = ?new_type, "field type switched");
    Ok(())
}

/// Option payload for a switch into a select kind; `None` when nothing
/// needs writing.
async fn migrated_select_option(
    ctx: &DatabaseContext,
    source: &Field,
    new_type: FieldType,
) -> DatabaseResult<Option<serde_json::Value>> {
    if !new_type.is_select() {
        return Ok(None);
    }
    if source.field_type.is_select() {
        // Between select kinds the option list carries over verbatim.
        return Ok(source.type_option(source.field_type).cloned());
    }
    if source.type_option(new_type).is_some() {
        // A stale payload from an earlier stint as this type wins.
        return Ok(None);
    }

    // Synthesize options from the distinct values already in the rows.
    let mut values = Vec::new();
    for row_id in ctx.all_row_ids().await? {
        let row_doc = ctx.row_doc(&row_id).await?;
        let text = row_doc
            .with_read(|d| {
                Ok(row::cell_map(d, &source.id)
                    .map(|m| row::read_cell(&m).data.as_text().to_string()))
            })
            .await
            .map_err(into_database_error)?;
        if let Some(text) = text {
            values.push(text);
        }
    }
    let options = codec::synthesize_select_options(values.iter().map(String::as_str));
    let payload = serde_json::to_value(SelectTypeOption {
        options,
        disable_color: false,
    })
    .map_err(DatabaseError::internal)?;
    Ok(Some(payload))
}

/// Add an option to a select field, mirroring it into the group columns of
/// any view grouped by that field. Returns the existing id when an option
/// with the same name is already present.
pub async fn add_select_option(
    ctx: &DatabaseContext,
    field_id: &str,
    name: &str,
) -> DatabaseResult<String> {
    let source = ctx.get_field(field_id).await?;
    if !source.field_type.is_select() {
        return Err(DatabaseError::invalid(format!(
            "Field {field_id} is not a select field"
        )));
    }
    let mut type_option = source.select_type_option();
    if let Some(existing) = type_option.options.iter().find(|o| o.name == name) {
        return Ok(existing.id.clone());
    }

    let option_id = super::new_id();
    type_option.options.push(SelectOption {
        id: option_id.clone(),
        name: name.to_string(),
        color: String::new(),
    });
    let payload = serde_json::to_value(&type_option).map_err(DatabaseError::internal)?;
    let field_type = source.field_type;
    let now = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            field::set_type_option(&field_map, field_type, &payload)?;
            field::touch(&field_map, now)?;
            apply_to_all_views(d, "field:add_option", |d, view_id| {
                let view_map = database::view_map(d, view_id)?;
                let groups = view::groups_list(&view_map)?;
                if let Some(group_map) = view::group_for_field(&groups, field_id) {
                    let columns = view::group_columns(&group_map)?;
                    // New columns land before the ungrouped column, which
                    // reuses the field id.
                    let index = columns
                        .find_map_by_id(field_id)
                        .map(|(i, _)| i)
                        .unwrap_or_else(|| columns.len());
                    view::insert_group_column(
                        &columns,
                        index,
                        &GroupColumn {
                            id: option_id.clone(),
                            visible: true,
                        },
                    )?;
                }
                Ok(())
            });
            Ok(())
        })],
        "field:add_option",
    )
    .await?;

    Ok(option_id)
}

/// Move an option so it sits immediately before `before_option_id`; append
/// when the target is absent.
pub async fn reorder_select_option(
    ctx: &DatabaseContext,
    field_id: &str,
    option_id: &str,
    before_option_id: Option<&str>,
) -> DatabaseResult<()> {
    let source = ctx.get_field(field_id).await?;
    let mut type_option = source.select_type_option();

    let from = type_option
        .options
        .iter()
        .position(|o| o.id == option_id)
        .ok_or_else(|| DatabaseError::OptionNotFound {
            id: option_id.to_string(),
        })?;
    let to = before_option_id
        .and_then(|b| type_option.options.iter().position(|o| o.id == b))
        .unwrap_or(type_option.options.len());

    let moved = type_option.options.remove(from);
    type_option
        .options
        .insert(reorder::adjusted_insert_index(from, to), moved);

    let payload = serde_json::to_value(&type_option).map_err(DatabaseError::internal)?;
    let field_type = source.field_type;
    let now = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            field::set_type_option(&field_map, field_type, &payload)?;
            field::touch(&field_map, now)
        })],
        "field:reorder_option",
    )
    .await
}

/// Delete a select option. Mirrors the removal into group columns and
/// scrubs filter contents referencing the option id.
pub async fn delete_select_option(
    ctx: &DatabaseContext,
    field_id: &str,
    option_id: &str,
) -> DatabaseResult<()> {
    let source = ctx.get_field(field_id).await?;
    let mut type_option = source.select_type_option();
    let before = type_option.options.len();
    type_option.options.retain(|o| o.id != option_id);
    if type_option.options.len() == before {
        return Err(DatabaseError::OptionNotFound {
            id: option_id.to_string(),
        });
    }

    let payload = serde_json::to_value(&type_option).map_err(DatabaseError::internal)?;
    let field_type = source.field_type;
    let now = model::now_millis();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let field_map = database::field_map(d, field_id)?;
            field::set_type_option(&field_map, field_type, &payload)?;
            field::touch(&field_map, now)?;
            apply_to_all_views(d, "field:delete_option", |d, view_id| {
                let view_map = database::view_map(d, view_id)?;
                let groups = view::groups_list(&view_map)?;
                if let Some(group_map) = view::group_for_field(&groups, field_id) {
                    let columns = view::group_columns(&group_map)?;
                    if let Some((index, _)) = columns.find_map_by_id(option_id) {
                        columns.delete(index, 1)?;
                    }
                }
                view::scrub_filter_option(&view::filters_list(&view_map)?, field_id, option_id)?;
                Ok(())
            });
            Ok(())
        })],
        "field:delete_option",
    )
    .await
}

/// Remove every flat entry whose `field_id` matches, across a sorts,
/// groups or calculations list.
fn remove_entries_for_field(list: &loro::LoroList, field_id: &str) -> Result<()> {
    loop {
        let target = list.find_index(|v| match v {
            loro::ValueOrContainer::Container(loro::Container::Map(m)) => {
                Some(m.get_string("field_id").as_deref() == Some(field_id))
            }
            _ => None,
        });
        match target {
            Some(index) => list.delete(index, 1)?,
            None => return Ok(()),
        }
    }
}
