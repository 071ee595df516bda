//! Row lifecycle: create, duplicate, delete.
//!
//! A row lives in its own sub-document and is referenced by id from every
//! view's row order. Deletion removes references only; the sub-document
//! stays behind as an orphan until garbage collection, which is outside
//! this engine.

use tracing::{debug, info};

use gridbase_api::{Cell, CellData, DatabaseResult, FilterKind, RowMeta};

use crate::codec::{self, SeedOutcome};
use crate::context::DatabaseContext;
use crate::dispatch::execute_with_all_views;
use crate::model::ext::ListExt;
use crate::model::{self, database, row, view};

/// Result of a row creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRow {
    pub row_id: String,
    /// True when some filtered value could not be pre-filled and the
    /// caller should open the row's detail view.
    pub open_detail: bool,
}

/// Create a row from the given view.
///
/// Cells are seeded from the view's root filters so the new row satisfies
/// the view it was created in. The id is inserted into every view's row
/// order: before `before_row_id` in the originating view when given,
/// appended everywhere else.
pub async fn create_row(
    ctx: &DatabaseContext,
    view_id: &str,
    before_row_id: Option<&str>,
) -> DatabaseResult<CreatedRow> {
    let origin = ctx.get_view(view_id).await?;
    let fields = ctx.fields().await?;
    let calendar_field_id = origin
        .layout_settings
        .calendar
        .as_ref()
        .map(|c| c.field_id.clone());

    let now_secs = model::now_seconds();
    let mut seeded_cells = Vec::new();
    let mut open_detail = false;
    for filter in origin.filters.iter().filter(|f| f.kind == FilterKind::Data) {
        let Some(field) = fields.get(&filter.field_id) else {
            continue;
        };
        match codec::seed_cell_from_filter(filter, field, now_secs, calendar_field_id.as_deref()) {
            SeedOutcome::Cell(cell) => seeded_cells.push((field.id.clone(), cell)),
            SeedOutcome::OpenDetail => open_detail = true,
            SeedOutcome::Skip => {}
        }
    }

    let row_id = super::new_id();
    let row_doc = ctx.row_doc(&row_id).await?;
    let now = model::now_millis();
    row_doc
        .with_transaction("row:create", |d| {
            row::init_row(d, &row_id, now)?;
            let cells = row::cells_map(d);
            for (field_id, cell) in &seeded_cells {
                row::write_cell(&cells, field_id, cell)?;
            }
            Ok(())
        })
        .await
        .map_err(crate::dispatch::into_database_error)?;

    execute_with_all_views(ctx.doc(), "row:create", |d, current_view_id| {
        let view_map = database::view_map(d, current_view_id)?;
        let orders = view::row_orders(&view_map)?;
        let index = if current_view_id == view_id {
            before_row_id
                .and_then(|before| orders.index_of_str(before))
                .unwrap_or_else(|| orders.len())
        } else {
            orders.len()
        };
        orders.insert(index, loro::LoroValue::from(row_id.as_str()))?;
        Ok(())
    })
    .await?;

    if open_detail {
        debug!(row_id = %row_id, "row needs detail view for unseedable filter");
        ctx.page_backend().navigate_to_row(&row_id);
    }

    info!(row_id = %row_id, view_id, "row created");
    Ok(CreatedRow { row_id, open_detail })
}

/// Duplicate a row into a fresh sub-document. The copy is inserted
/// immediately after the source in every view; views not containing the
/// source append.
pub async fn duplicate_row(ctx: &DatabaseContext, source_row_id: &str) -> DatabaseResult<String> {
    let source = ctx.get_row(source_row_id).await?;

    let new_row_id = super::new_id();
    let new_doc = ctx.row_doc(&new_row_id).await?;
    let now = model::now_millis();
    new_doc
        .with_transaction("row:duplicate", |d| {
            row::init_row(d, &new_row_id, now)?;
            row::write_meta(
                d,
                &RowMeta {
                    icon: source.meta.icon.clone(),
                    cover: source.meta.cover.clone(),
                    is_document_empty: source.meta.is_document_empty,
                },
            )?;
            let cells = row::cells_map(d);
            for (field_id, cell) in &source.cells {
                row::write_cell(&cells, field_id, &codec::clone_cell(cell))?;
            }
            Ok(())
        })
        .await
        .map_err(crate::dispatch::into_database_error)?;

    execute_with_all_views(ctx.doc(), "row:duplicate", |d, view_id| {
        let view_map = database::view_map(d, view_id)?;
        let orders = view::row_orders(&view_map)?;
        let index = orders
            .index_of_str(source_row_id)
            .map(|i| i + 1)
            .unwrap_or_else(|| orders.len());
        orders.insert(index, loro::LoroValue::from(new_row_id.as_str()))?;
        Ok(())
    })
    .await?;

    Ok(new_row_id)
}

/// Write a cell value into a row's sub-document, stamping it with the
/// field's current type.
pub async fn update_cell(
    ctx: &DatabaseContext,
    row_id: &str,
    field_id: &str,
    data: CellData,
) -> DatabaseResult<()> {
    let field = ctx.get_field(field_id).await?;
    let row_doc = ctx.row_doc(row_id).await?;
    let now = model::now_millis();

    row_doc
        .with_transaction("cell:update", |d| {
            let mut cell = row::cell_map(d, field_id)
                .map(|m| row::read_cell(&m))
                .unwrap_or_else(|| Cell::new(CellData::Empty, field.field_type));
            if cell.created_at == 0 {
                cell.created_at = now;
            }
            cell.data = data;
            cell.field_type = field.field_type;
            cell.last_modified = now;
            row::write_cell(&row::cells_map(d), field_id, &cell)?;
            row::touch(d, now)
        })
        .await
        .map_err(crate::dispatch::into_database_error)
}

/// Remove a row's reference from every view. The sub-document is not
/// touched.
pub async fn delete_row(ctx: &DatabaseContext, row_id: &str) -> DatabaseResult<()> {
    delete_rows(ctx, &[row_id.to_string()]).await
}

pub async fn delete_rows(ctx: &DatabaseContext, row_ids: &[String]) -> DatabaseResult<()> {
    execute_with_all_views(ctx.doc(), "row:delete", |d, view_id| {
        let view_map = database::view_map(d, view_id)?;
        let orders = view::row_orders(&view_map)?;
        for row_id in row_ids {
            orders.remove_str(row_id)?;
        }
        Ok(())
    })
    .await?;
    Ok(())
}
