//! Sort operations on one view.

use gridbase_api::{DatabaseError, DatabaseResult, Sort, SortCondition};

use crate::context::DatabaseContext;
use crate::dispatch::execute_operations;
use crate::model::ext::ListExt;
use crate::model::{database, reorder, view};

/// Add a sort on a field, or update the existing one; a field is sorted
/// at most once per view. Returns the sort id.
pub async fn add_sort(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    condition: SortCondition,
) -> DatabaseResult<String> {
    ctx.get_field(field_id).await?;

    let existing = ctx
        .get_view(view_id)
        .await?
        .sorts
        .into_iter()
        .find(|sort| sort.field_id == field_id);
    if let Some(existing) = existing {
        update_sort(ctx, view_id, &existing.id, condition).await?;
        return Ok(existing.id);
    }

    let sort = Sort {
        id: super::new_id(),
        field_id: field_id.to_string(),
        condition,
    };
    let sort_id = sort.id.clone();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::append_sort(&view::sorts_list(&view_map)?, &sort)
        })],
        "sort:add",
    )
    .await?;
    Ok(sort_id)
}

pub async fn update_sort(
    ctx: &DatabaseContext,
    view_id: &str,
    sort_id: &str,
    condition: SortCondition,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let sorts = view::sorts_list(&view_map)?;
            let (_, sort_map) = sorts.find_map_by_id(sort_id).ok_or_else(|| {
                anyhow::anyhow!(DatabaseError::SortNotFound {
                    id: sort_id.to_string(),
                })
            })?;
            view::set_sort_condition(&sort_map, condition)
        })],
        "sort:update",
    )
    .await
}

pub async fn delete_sort(
    ctx: &DatabaseContext,
    view_id: &str,
    sort_id: &str,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let sorts = view::sorts_list(&view_map)?;
            match sorts.find_map_by_id(sort_id) {
                Some((index, _)) => {
                    sorts.delete(index, 1)?;
                    Ok(())
                }
                None => anyhow::bail!(DatabaseError::SortNotFound {
                    id: sort_id.to_string(),
                }),
            }
        })],
        "sort:delete",
    )
    .await
}

/// Change a sort's significance: move it immediately before another entry,
/// or to the end.
pub async fn move_sort(
    ctx: &DatabaseContext,
    view_id: &str,
    sort_id: &str,
    before_sort_id: Option<&str>,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let sorts = view::sorts_list(&view_map)?;
            if !reorder::move_flat_map_entry(&sorts, sort_id, before_sort_id)? {
                anyhow::bail!(DatabaseError::SortNotFound {
                    id: sort_id.to_string(),
                });
            }
            Ok(())
        })],
        "sort:move",
    )
    .await
}
