//! Filter operations on one view's predicate tree.

use tracing::warn;

use gridbase_api::{DatabaseError, DatabaseResult, Filter, FilterKind};

use crate::context::DatabaseContext;
use crate::dispatch::execute_operations;
use crate::model::{database, view};

/// Add a leaf filter at the root of the view's tree.
///
/// An empty field id is reachable from normal UI debouncing and is a
/// logged no-op, not an error.
pub async fn add_filter(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    condition: i64,
    content: &str,
) -> DatabaseResult<Option<String>> {
    if field_id.is_empty() {
        warn!(view_id, "add filter called with empty field id, skipping");
        return Ok(None);
    }
    ctx.get_field(field_id).await?;

    let filter = Filter::data(super::new_id(), field_id, condition, content);
    let filter_id = filter.id.clone();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::append_filter(&view::filters_list(&view_map)?, &filter)
        })],
        "filter:add",
    )
    .await?;
    Ok(Some(filter_id))
}

/// Add an empty And/Or combinator at the root.
pub async fn add_filter_group(
    ctx: &DatabaseContext,
    view_id: &str,
    kind: FilterKind,
) -> DatabaseResult<String> {
    if kind == FilterKind::Data {
        return Err(DatabaseError::invalid("A filter group must be And or Or"));
    }
    let group = Filter::group(super::new_id(), kind, Vec::new());
    let group_id = group.id.clone();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::append_filter(&view::filters_list(&view_map)?, &group)
        })],
        "filter:add_group",
    )
    .await?;
    Ok(group_id)
}

/// Add a leaf filter as a child of an And/Or node.
pub async fn add_child_filter(
    ctx: &DatabaseContext,
    view_id: &str,
    parent_filter_id: &str,
    field_id: &str,
    condition: i64,
    content: &str,
) -> DatabaseResult<String> {
    ctx.get_field(field_id).await?;
    let filter = Filter::data(super::new_id(), field_id, condition, content);
    let filter_id = filter.id.clone();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let filters = view::filters_list(&view_map)?;
            let parent = view::find_filter(&filters, parent_filter_id).ok_or_else(|| {
                anyhow::anyhow!(DatabaseError::FilterNotFound {
                    id: parent_filter_id.to_string(),
                })
            })?;
            if view::filter_kind(&parent) == FilterKind::Data {
                anyhow::bail!(DatabaseError::invalid(
                    "Cannot add a child to a leaf filter"
                ));
            }
            view::append_filter(&view::filter_children(&parent)?, &filter)
        })],
        "filter:add_child",
    )
    .await?;
    Ok(filter_id)
}

/// Update a filter's condition and content, wherever it sits in the tree.
pub async fn update_filter(
    ctx: &DatabaseContext,
    view_id: &str,
    filter_id: &str,
    condition: i64,
    content: &str,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let filters = view::filters_list(&view_map)?;
            let filter_map = view::find_filter(&filters, filter_id).ok_or_else(|| {
                anyhow::anyhow!(DatabaseError::FilterNotFound {
                    id: filter_id.to_string(),
                })
            })?;
            view::set_filter_condition(&filter_map, condition, content)
        })],
        "filter:update",
    )
    .await
}

pub async fn delete_filter(
    ctx: &DatabaseContext,
    view_id: &str,
    filter_id: &str,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let filters = view::filters_list(&view_map)?;
            if !view::remove_filter(&filters, filter_id)? {
                anyhow::bail!(DatabaseError::FilterNotFound {
                    id: filter_id.to_string(),
                });
            }
            Ok(())
        })],
        "filter:delete",
    )
    .await
}
