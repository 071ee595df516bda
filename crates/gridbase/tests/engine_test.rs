use anyhow::Result;
use std::sync::Arc;

use gridbase::api::{
    CellData, DatabaseError, FieldType, FieldVisibility, SelectCondition, SortCondition,
    TextCondition, ViewLayout,
};
use gridbase::operations::{calculations, fields, filters, groups, rows, sorts, views};
use gridbase::query::filter::filter_rows;
use gridbase::{CollabDoc, DatabaseContext, MemoryPageBackend, MemoryRowStore, PageBackend};

async fn setup() -> Result<(Arc<MemoryPageBackend>, DatabaseContext)> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = Arc::new(MemoryPageBackend::new());
    let ctx = DatabaseContext::create(
        "db-1",
        Arc::new(CollabDoc::new("db-1")),
        Arc::new(MemoryRowStore::new()),
        backend.clone() as Arc<dyn PageBackend>,
    )
    .await?;
    Ok((backend, ctx))
}

/// A select field named Status with Done/Todo options. Returns
/// (field_id, done_option_id, todo_option_id).
async fn add_status_field(ctx: &DatabaseContext) -> Result<(String, String, String)> {
    let field_id = fields::create_field(ctx, "Status", FieldType::SingleSelect).await?;
    let done = fields::add_select_option(ctx, &field_id, "Done").await?;
    let todo = fields::add_select_option(ctx, &field_id, "Todo").await?;
    Ok((field_id, done, todo))
}

#[tokio::test]
async fn test_row_creation_updates_every_view() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let second = views::create_view(&ctx, "Second", ViewLayout::Grid).await?;

    let created = rows::create_row(&ctx, &grid, None).await?;

    for view_id in [&grid, &second] {
        let view = ctx.get_view(view_id).await?;
        assert_eq!(view.row_orders, [created.row_id.clone()]);
    }

    rows::delete_row(&ctx, &created.row_id).await?;
    for view_id in [&grid, &second] {
        assert!(ctx.get_view(view_id).await?.row_orders.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_row_creation_keeps_every_row() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;

    let created =
        futures::future::try_join_all((0..8).map(|_| rows::create_row(&ctx, &grid, None))).await?;

    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.row_orders.len(), 8);
    for row in &created {
        assert!(view.row_orders.contains(&row.row_id));
    }
    Ok(())
}

#[tokio::test]
async fn test_broken_view_does_not_block_siblings() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let second = views::create_view(&ctx, "Second", ViewLayout::Grid).await?;

    // A view written without order lists, as a partially initialized
    // replica would leave behind.
    ctx.doc()
        .with_transaction("test:inject_broken_view", |d| {
            let views_map = d.get_map("views");
            let broken = views_map.insert_container("v-broken", loro::LoroMap::new())?;
            broken.insert("name", loro::LoroValue::from("Broken"))?;
            Ok(())
        })
        .await?;

    let created = rows::create_row(&ctx, &grid, None).await?;

    for view_id in [&grid, &second] {
        assert_eq!(ctx.get_view(view_id).await?.row_orders, [created.row_id.clone()]);
    }
    assert!(ctx.get_view("v-broken").await?.row_orders.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_filter_keeps_only_matching_rows() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, done, todo) = add_status_field(&ctx).await?;

    let done_row = rows::create_row(&ctx, &grid, None).await?.row_id;
    let todo_row = rows::create_row(&ctx, &grid, None).await?.row_id;
    rows::update_cell(&ctx, &done_row, &status, CellData::Text(done.clone())).await?;
    rows::update_cell(&ctx, &todo_row, &status, CellData::Text(todo)).await?;

    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;

    let view = ctx.get_view(&grid).await?;
    let all_rows = ctx.rows_for_view(&grid).await?;
    let fields = ctx.fields().await?;
    let visible = filter_rows(&all_rows, &view.filters, &fields);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, done_row);

    // Re-running on unchanged inputs yields the identical set.
    assert_eq!(filter_rows(&visible, &view.filters, &fields), visible);
    Ok(())
}

#[tokio::test]
async fn test_created_row_is_seeded_from_view_filters() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, done, _) = add_status_field(&ctx).await?;
    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;

    let created = rows::create_row(&ctx, &grid, None).await?;
    assert!(!created.open_detail);

    let row = ctx.get_row(&created.row_id).await?;
    let cell = row.cell(&status).expect("seeded cell");
    assert_eq!(cell.data, CellData::Text(done));
    Ok(())
}

#[tokio::test]
async fn test_unseedable_filter_navigates_to_row() -> Result<()> {
    let (backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let created_field = fields::create_field(&ctx, "Created", FieldType::CreatedTime).await?;
    filters::add_filter(&ctx, &grid, &created_field, 0, "").await?;

    let created = rows::create_row(&ctx, &grid, None).await?;
    assert!(created.open_detail);
    assert_eq!(
        backend.navigated.lock().unwrap().as_slice(),
        [created.row_id]
    );
    Ok(())
}

#[tokio::test]
async fn test_type_switch_is_lossless() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let text_field = fields::create_field(&ctx, "Notes", FieldType::RichText).await?;
    let row_id = rows::create_row(&ctx, &grid, None).await?.row_id;
    rows::update_cell(&ctx, &row_id, &text_field, CellData::Text("hello".into())).await?;

    fields::switch_field_type(&ctx, &text_field, FieldType::SingleSelect).await?;
    let mid = ctx.get_row(&row_id).await?;
    let mid_cell = mid.cell(&text_field).unwrap();
    assert_eq!(mid_cell.field_type, FieldType::SingleSelect);
    assert_eq!(mid_cell.source_field_type, Some(FieldType::RichText));
    // Options were synthesized from the existing value.
    let field = ctx.get_field(&text_field).await?;
    assert_eq!(field.select_type_option().options[0].name, "hello");

    fields::switch_field_type(&ctx, &text_field, FieldType::RichText).await?;
    let back = ctx.get_row(&row_id).await?;
    assert_eq!(back.cell(&text_field).unwrap().data, CellData::Text("hello".into()));
    Ok(())
}

#[tokio::test]
async fn test_group_by_is_exclusive_and_scrubs_filters() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, done, _) = add_status_field(&ctx).await?;
    let checkbox = fields::create_field(&ctx, "Done?", FieldType::Checkbox).await?;

    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;

    groups::set_group_by(&ctx, &grid, &status).await?;
    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].field_id, status);
    // Grouping by a field removes filters on it.
    assert!(view.filters.is_empty());
    // One column per option plus the ungrouped column.
    let column_ids: Vec<_> = view.groups[0].columns.iter().map(|c| c.id.clone()).collect();
    assert_eq!(column_ids.len(), 3);
    assert_eq!(column_ids.last().unwrap(), &status);

    // A filter on an unrelated field survives a group change.
    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;
    groups::set_group_by(&ctx, &grid, &checkbox).await?;
    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].field_id, checkbox);
    assert_eq!(view.filters.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_select_option_lifecycle_mirrors_into_groups_and_filters() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, done, todo) = add_status_field(&ctx).await?;
    groups::set_group_by(&ctx, &grid, &status).await?;

    let blocked = fields::add_select_option(&ctx, &status, "Blocked").await?;
    let view = ctx.get_view(&grid).await?;
    let column_ids: Vec<_> = view.groups[0].columns.iter().map(|c| c.id.clone()).collect();
    // The new column lands before the ungrouped column.
    assert_eq!(column_ids, [done.clone(), todo, blocked.clone(), status.clone()]);

    filters::add_filter(
        &ctx,
        &grid,
        &status,
        SelectCondition::OptionIs.as_i64(),
        &format!("{done},{blocked}"),
    )
    .await?;
    fields::delete_select_option(&ctx, &status, &blocked).await?;

    let view = ctx.get_view(&grid).await?;
    assert!(view.groups[0].columns.iter().all(|c| c.id != blocked));
    assert_eq!(view.filters[0].content, done);
    Ok(())
}

#[tokio::test]
async fn test_duplicated_relation_cell_gets_a_fresh_array() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let relation = fields::create_field(&ctx, "Links", FieldType::Relation).await?;
    let source = rows::create_row(&ctx, &grid, None).await?.row_id;
    rows::update_cell(
        &ctx,
        &source,
        &relation,
        CellData::Ids(vec!["rowA".into(), "rowB".into()]),
    )
    .await?;

    let copy = rows::duplicate_row(&ctx, &source).await?;
    let view = ctx.get_view(&grid).await?;
    // The duplicate sits immediately after the source.
    assert_eq!(view.row_orders, [source.clone(), copy.clone()]);

    // Mutating the duplicate's array leaves the original untouched.
    rows::update_cell(
        &ctx,
        &copy,
        &relation,
        CellData::Ids(vec!["rowA".into(), "rowB".into(), "rowC".into()]),
    )
    .await?;
    let original = ctx.get_row(&source).await?;
    assert_eq!(
        original.cell(&relation).unwrap().data,
        CellData::Ids(vec!["rowA".into(), "rowB".into()])
    );
    Ok(())
}

#[tokio::test]
async fn test_sort_lifecycle() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let amount = fields::create_field(&ctx, "Amount", FieldType::Number).await?;
    let title = fields::create_field(&ctx, "Title", FieldType::RichText).await?;

    let amount_sort = sorts::add_sort(&ctx, &grid, &amount, SortCondition::Ascending).await?;
    let title_sort = sorts::add_sort(&ctx, &grid, &title, SortCondition::Descending).await?;
    // Adding a second sort on the same field updates in place.
    let again = sorts::add_sort(&ctx, &grid, &amount, SortCondition::Descending).await?;
    assert_eq!(again, amount_sort);
    assert_eq!(ctx.get_view(&grid).await?.sorts.len(), 2);

    sorts::move_sort(&ctx, &grid, &title_sort, Some(&amount_sort)).await?;
    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.sorts[0].id, title_sort);
    assert_eq!(view.sorts[1].condition, SortCondition::Descending);

    sorts::delete_sort(&ctx, &grid, &title_sort).await?;
    assert_eq!(ctx.get_view(&grid).await?.sorts.len(), 1);

    let missing = sorts::delete_sort(&ctx, &grid, "nope").await;
    assert_eq!(missing, Err(DatabaseError::SortNotFound { id: "nope".into() }));
    Ok(())
}

#[tokio::test]
async fn test_calculations_suppress_redundant_writes() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let amount = fields::create_field(&ctx, "Amount", FieldType::Number).await?;
    let r1 = rows::create_row(&ctx, &grid, None).await?.row_id;
    let r2 = rows::create_row(&ctx, &grid, None).await?.row_id;
    rows::update_cell(&ctx, &r1, &amount, CellData::Text("2".into())).await?;
    rows::update_cell(&ctx, &r2, &amount, CellData::Text("3".into())).await?;

    calculations::set_calculation(&ctx, &grid, &amount, gridbase::api::CalculationType::Sum)
        .await?;
    assert_eq!(ctx.get_view(&grid).await?.calculations[0].value, "5");

    // Nothing changed, so a recompute writes nothing.
    ctx.doc().take_pending_updates();
    assert_eq!(calculations::update_calculations(&ctx, &grid).await?, 0);
    assert!(ctx.doc().take_pending_updates().is_empty());

    rows::update_cell(&ctx, &r2, &amount, CellData::Text("8".into())).await?;
    assert_eq!(calculations::update_calculations(&ctx, &grid).await?, 1);
    assert_eq!(ctx.get_view(&grid).await?.calculations[0].value, "10");
    Ok(())
}

#[tokio::test]
async fn test_view_rename_and_delete_hit_the_page_backend_first() -> Result<()> {
    let (backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;

    views::rename_view(&ctx, &grid, "Tasks").await?;
    assert_eq!(ctx.get_view(&grid).await?.name, "Tasks");
    {
        let updated = backend.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, grid);
        assert_eq!(updated[0].1.name.as_deref(), Some("Tasks"));
    }

    let second = views::create_view(&ctx, "Second", ViewLayout::Grid).await?;
    views::delete_view(&ctx, &second).await?;
    assert_eq!(backend.deleted.lock().unwrap().as_slice(), [second.clone()]);
    assert_eq!(
        ctx.get_view(&second).await,
        Err(DatabaseError::ViewNotFound { id: second })
    );
    Ok(())
}

#[tokio::test]
async fn test_board_layout_synthesizes_group_and_field_settings() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, _, _) = add_status_field(&ctx).await?;

    views::update_layout(&ctx, &grid, ViewLayout::Board).await?;
    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.layout, ViewLayout::Board);
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].field_id, status);
    assert!(view
        .field_settings
        .values()
        .all(|s| s.visibility == FieldVisibility::HideWhenEmpty));
    Ok(())
}

#[tokio::test]
async fn test_calendar_layout_creates_a_date_field_when_missing() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let second = views::create_view(&ctx, "Second", ViewLayout::Grid).await?;

    views::update_layout(&ctx, &grid, ViewLayout::Calendar).await?;
    let view = ctx.get_view(&grid).await?;
    assert_eq!(view.layout, ViewLayout::Calendar);
    let calendar = view.layout_settings.calendar.expect("calendar setting");
    let date_field = ctx.get_field(&calendar.field_id).await?;
    assert_eq!(date_field.field_type, FieldType::DateTime);

    // The created field reached every view's field order.
    for view_id in [&grid, &second] {
        assert!(ctx
            .get_view(view_id)
            .await?
            .field_orders
            .contains(&calendar.field_id));
    }
    Ok(())
}

#[tokio::test]
async fn test_field_delete_scrubs_every_view_structure() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let (status, done, _) = add_status_field(&ctx).await?;

    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;
    sorts::add_sort(&ctx, &grid, &status, SortCondition::Ascending).await?;
    groups::set_group_by(&ctx, &grid, &status).await?;
    // set_group_by removed the filter; add another to verify the scrub.
    filters::add_filter(&ctx, &grid, &status, SelectCondition::OptionIs.as_i64(), &done)
        .await?;

    fields::delete_field(&ctx, &status).await?;

    let view = ctx.get_view(&grid).await?;
    assert!(!view.field_orders.contains(&status));
    assert!(view.filters.is_empty());
    assert!(view.sorts.is_empty());
    assert!(view.groups.is_empty());
    assert_eq!(
        ctx.get_field(&status).await,
        Err(DatabaseError::FieldNotFound { id: status })
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_field_id_filter_is_a_logged_noop() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    let added = filters::add_filter(&ctx, &grid, "", TextCondition::Is.as_i64(), "x").await?;
    assert_eq!(added, None);
    assert!(ctx.get_view(&grid).await?.filters.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_replicas_converge_through_pending_updates() -> Result<()> {
    let (_backend, ctx) = setup().await?;
    let grid = ctx.any_view_id().await?;
    fields::create_field(&ctx, "Amount", FieldType::Number).await?;

    let replica = CollabDoc::new("db-1");
    for update in ctx.doc().take_pending_updates() {
        replica.apply_update(&update).await?;
    }

    let field_count = replica
        .with_read(|d| {
            let mut count = 0;
            d.get_map("fields").for_each(|_, _| count += 1);
            Ok(count)
        })
        .await?;
    // Primary field plus the added one.
    assert_eq!(field_count, 2);

    let view_name = replica
        .with_read(|d| {
            Ok(match d.get_map("views").get(&grid) {
                Some(loro::ValueOrContainer::Container(loro::Container::Map(m))) => {
                    match m.get("name") {
                        Some(loro::ValueOrContainer::Value(v)) => {
                            v.as_string().map(|s| s.to_string())
                        }
                        _ => None,
                    }
                }
                _ => None,
            })
        })
        .await?;
    assert_eq!(view_name.as_deref(), Some("Grid"));
    Ok(())
}
