//! View lifecycle and per-view presentation operations.

use tracing::info;

use gridbase_api::{
    BoardLayoutSetting, CalendarLayoutSetting, DatabaseError, DatabaseResult, FieldSetting,
    FieldType, FieldVisibility, GroupColumn, GroupSetting, View, ViewLayout, DEFAULT_FIELD_WIDTH,
};

use crate::context::DatabaseContext;
use crate::dispatch::execute_operations;
use crate::model::ext::ListExt;
use crate::model::{database, reorder, view};
use crate::ports::{PagePayload, ViewMeta};
use crate::query::group;

/// Create a sibling view over the same fields and rows. Field and row
/// orders are copied from an existing view so the new view starts with the
/// full dataset.
pub async fn create_view(
    ctx: &DatabaseContext,
    name: &str,
    layout: ViewLayout,
) -> DatabaseResult<String> {
    let view_id = super::new_id();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let mut field_orders = None;
            let mut row_orders = None;
            for existing in database::list_view_ids(d) {
                let Ok(view_map) = database::view_map(d, &existing) else {
                    continue;
                };
                if field_orders.is_none() {
                    if let Ok(list) = view::field_orders(&view_map) {
                        field_orders = Some(list.collect_strings());
                    }
                }
                if row_orders.is_none() {
                    if let Ok(list) = view::row_orders(&view_map) {
                        row_orders = Some(list.collect_strings());
                    }
                }
                if field_orders.is_some() && row_orders.is_some() {
                    break;
                }
            }

            let mut new_view = View::new(&view_id, name, layout);
            new_view.field_orders =
                field_orders.unwrap_or_else(|| database::list_field_ids(d));
            new_view.row_orders = row_orders.unwrap_or_default();
            view::write_view(&database::views_map(d), &new_view)?;
            Ok(())
        })],
        "view:create",
    )
    .await?;

    if layout != ViewLayout::Grid {
        update_layout(ctx, &view_id, layout).await?;
    }

    info!(view_id = %view_id, ?layout, "view created");
    Ok(view_id)
}

/// Rename a view. The persistence side is updated first; a failure there
/// leaves the document untouched.
pub async fn rename_view(ctx: &DatabaseContext, view_id: &str, name: &str) -> DatabaseResult<()> {
    ctx.get_view(view_id).await?;
    ctx.page_backend()
        .update_page(
            view_id,
            PagePayload {
                name: Some(name.to_string()),
                icon: None,
            },
        )
        .await?;

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::set_name(&view_map, name)
        })],
        "view:rename",
    )
    .await
}

/// Delete a view. Rows referenced only by this view become orphans.
pub async fn delete_view(ctx: &DatabaseContext, view_id: &str) -> DatabaseResult<()> {
    ctx.get_view(view_id).await?;
    ctx.page_backend().delete_page(view_id).await?;

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            database::view_map(d, view_id)?;
            database::views_map(d).delete(view_id)?;
            Ok(())
        })],
        "view:delete",
    )
    .await
}

/// Best-effort view metadata from the persistence side; a missing entry is
/// simply `None`.
pub async fn load_view_meta(ctx: &DatabaseContext, view_id: &str) -> Option<ViewMeta> {
    ctx.page_backend().load_view_meta(view_id).await
}

/// Switch a view's layout.
///
/// Board synthesizes hide-when-empty field settings and, when the view has
/// no group yet, a group over the first select or checkbox field in field
/// order. Calendar binds the first date field, creating one when the
/// database has none.
pub async fn update_layout(
    ctx: &DatabaseContext,
    view_id: &str,
    layout: ViewLayout,
) -> DatabaseResult<()> {
    match layout {
        ViewLayout::Grid => set_layout_only(ctx, view_id, layout).await,
        ViewLayout::Board => update_to_board(ctx, view_id).await,
        ViewLayout::Calendar => update_to_calendar(ctx, view_id).await,
    }
}

async fn set_layout_only(
    ctx: &DatabaseContext,
    view_id: &str,
    layout: ViewLayout,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::set_layout(&view_map, layout)
        })],
        "view:layout",
    )
    .await
}

async fn update_to_board(ctx: &DatabaseContext, view_id: &str) -> DatabaseResult<()> {
    let origin = ctx.get_view(view_id).await?;
    let fields = ctx.fields().await?;

    let group_setting = if origin.groups.is_empty() {
        let group_field = origin
            .field_orders
            .iter()
            .filter_map(|id| fields.get(id))
            .find(|f| f.field_type.is_select() || f.field_type == FieldType::Checkbox);
        match group_field {
            Some(field) => {
                let rows = ctx.rows_for_view(view_id).await?;
                let columns = group::generate_groups(field, &rows)
                    .into_iter()
                    .map(|bucket| GroupColumn {
                        id: bucket.id,
                        visible: true,
                    })
                    .collect();
                Some(GroupSetting {
                    id: super::new_id(),
                    field_id: field.id.clone(),
                    columns,
                    content: String::new(),
                })
            }
            None => None,
        }
    } else {
        None
    };

    let scrub_group_filters = group_setting.as_ref().is_some_and(|setting| {
        origin
            .filters
            .iter()
            .any(|filter| filter.references_field(&setting.field_id))
    });
    let field_ids = origin.field_orders.clone();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::set_layout(&view_map, ViewLayout::Board)?;
            for field_id in &field_ids {
                view::write_field_setting(
                    &view_map,
                    field_id,
                    &FieldSetting {
                        visibility: FieldVisibility::HideWhenEmpty,
                        width: DEFAULT_FIELD_WIDTH,
                        wrap: false,
                    },
                )?;
            }
            if let Some(setting) = &group_setting {
                let groups = view::groups_list(&view_map)?;
                if groups.len() > 0 {
                    groups.delete(0, groups.len())?;
                }
                view::append_group(&groups, setting)?;
                if scrub_group_filters {
                    view::remove_filters_for_field(
                        &view::filters_list(&view_map)?,
                        &setting.field_id,
                    )?;
                }
            }
            view::write_board_setting(&view_map, &BoardLayoutSetting::default())?;
            Ok(())
        })],
        "view:layout:board",
    )
    .await
}

async fn update_to_calendar(ctx: &DatabaseContext, view_id: &str) -> DatabaseResult<()> {
    let origin = ctx.get_view(view_id).await?;
    let fields = ctx.fields().await?;

    let date_field_id = origin
        .field_orders
        .iter()
        .filter_map(|id| fields.get(id))
        .find(|f| f.field_type == FieldType::DateTime)
        .map(|f| f.id.clone());
    let date_field_id = match date_field_id {
        Some(id) => id,
        // A full all-views field addition, same as creating one by hand.
        None => super::fields::create_field(ctx, "Date", FieldType::DateTime).await?,
    };

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            view::set_layout(&view_map, ViewLayout::Calendar)?;
            view::write_calendar_setting(&view_map, &CalendarLayoutSetting::new(&date_field_id))
        })],
        "view:layout:calendar",
    )
    .await
}

pub async fn resize_field(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    width: i64,
) -> DatabaseResult<()> {
    if width <= 0 {
        return Err(DatabaseError::invalid(format!(
            "Field width must be positive, got {width}"
        )));
    }
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            database::field_map(d, field_id)?;
            let view_map = database::view_map(d, view_id)?;
            view::set_width(&view_map, field_id, width)
        })],
        "view:resize_field",
    )
    .await
}

pub async fn set_field_visibility(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    visibility: FieldVisibility,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            database::field_map(d, field_id)?;
            let view_map = database::view_map(d, view_id)?;
            view::set_visibility(&view_map, field_id, visibility)
        })],
        "view:set_visibility",
    )
    .await
}

/// Reorder a column within one view. Other views keep their own order.
pub async fn move_field(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    before_field_id: Option<&str>,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let orders = view::field_orders(&view_map)?;
            if !reorder::move_string_entry(&orders, field_id, before_field_id)? {
                anyhow::bail!(DatabaseError::FieldNotFound {
                    id: field_id.to_string(),
                });
            }
            Ok(())
        })],
        "view:move_field",
    )
    .await
}

pub async fn move_row(
    ctx: &DatabaseContext,
    view_id: &str,
    row_id: &str,
    before_row_id: Option<&str>,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let orders = view::row_orders(&view_map)?;
            if !reorder::move_string_entry(&orders, row_id, before_row_id)? {
                anyhow::bail!(DatabaseError::RowNotFound {
                    id: row_id.to_string(),
                });
            }
            Ok(())
        })],
        "view:move_row",
    )
    .await
}
