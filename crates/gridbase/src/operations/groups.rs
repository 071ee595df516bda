//! Group-by operations for board views.

use gridbase_api::{DatabaseError, DatabaseResult, GroupColumn, GroupSetting};

use crate::context::DatabaseContext;
use crate::dispatch::execute_operations;
use crate::model::ext::ListExt;
use crate::model::{database, reorder, view};
use crate::query::group;

/// Group the view by a field.
///
/// At most one group-by exists per view: any previous group is replaced,
/// and filters referencing the newly grouped field are removed so the
/// board shows the field's full value space.
pub async fn set_group_by(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
) -> DatabaseResult<String> {
    let field = ctx.get_field(field_id).await?;
    let origin = ctx.get_view(view_id).await?;
    // Touch the filter list only when something actually references the
    // grouped field, including nested predicate nodes.
    let scrub_filters = origin
        .filters
        .iter()
        .any(|filter| filter.references_field(field_id));
    let rows = ctx.rows_for_view(view_id).await?;
    let columns: Vec<GroupColumn> = group::generate_groups(&field, &rows)
        .into_iter()
        .map(|bucket| GroupColumn {
            id: bucket.id,
            visible: true,
        })
        .collect();
    let setting = GroupSetting {
        id: super::new_id(),
        field_id: field_id.to_string(),
        columns,
        content: String::new(),
    };
    let group_id = setting.id.clone();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let groups = view::groups_list(&view_map)?;
            if groups.len() > 0 {
                groups.delete(0, groups.len())?;
            }
            view::append_group(&groups, &setting)?;
            if scrub_filters {
                view::remove_filters_for_field(&view::filters_list(&view_map)?, field_id)?;
            }
            Ok(())
        })],
        "group:set",
    )
    .await?;
    Ok(group_id)
}

/// Remove the view's group-by entirely.
pub async fn clear_group_by(ctx: &DatabaseContext, view_id: &str) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let groups = view::groups_list(&view_map)?;
            if groups.len() > 0 {
                groups.delete(0, groups.len())?;
            }
            Ok(())
        })],
        "group:clear",
    )
    .await
}

/// Move a board column before another one; append when the target is
/// absent.
pub async fn move_group_column(
    ctx: &DatabaseContext,
    view_id: &str,
    column_id: &str,
    before_column_id: Option<&str>,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let groups = view::groups_list(&view_map)?;
            let Some(group_map) = groups.map_at(0) else {
                anyhow::bail!(DatabaseError::GroupNotFound {
                    id: view_id.to_string(),
                });
            };
            let columns = view::group_columns(&group_map)?;
            if !reorder::move_flat_map_entry(&columns, column_id, before_column_id)? {
                anyhow::bail!(DatabaseError::GroupNotFound {
                    id: column_id.to_string(),
                });
            }
            Ok(())
        })],
        "group:move_column",
    )
    .await
}

pub async fn set_column_visibility(
    ctx: &DatabaseContext,
    view_id: &str,
    column_id: &str,
    visible: bool,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let groups = view::groups_list(&view_map)?;
            let Some(group_map) = groups.map_at(0) else {
                anyhow::bail!(DatabaseError::GroupNotFound {
                    id: view_id.to_string(),
                });
            };
            let columns = view::group_columns(&group_map)?;
            let (_, column_map) = columns.find_map_by_id(column_id).ok_or_else(|| {
                anyhow::anyhow!(DatabaseError::GroupNotFound {
                    id: column_id.to_string(),
                })
            })?;
            view::set_group_column_visibility(&column_map, visible)
        })],
        "group:set_column_visibility",
    )
    .await
}

/// Hide or show the ungrouped column of a board.
pub async fn set_hide_ungrouped(
    ctx: &DatabaseContext,
    view_id: &str,
    hide: bool,
) -> DatabaseResult<()> {
    let mut board = ctx
        .get_view(view_id)
        .await?
        .layout_settings
        .board
        .unwrap_or_default();
    board.hide_ungrouped_column = hide;

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::write_board_setting(&view_map, &board)
        })],
        "group:hide_ungrouped",
    )
    .await
}
