//! Column calculation operations.

use tracing::debug;

use gridbase_api::{Calculation, CalculationType, DatabaseError, DatabaseResult};

use crate::context::DatabaseContext;
use crate::dispatch::execute_operations;
use crate::model::ext::ListExt;
use crate::model::{database, view};
use crate::query::calculation;

/// Set (or replace) the aggregate shown for a field, computing its value
/// immediately. A field carries at most one calculation per view.
pub async fn set_calculation(
    ctx: &DatabaseContext,
    view_id: &str,
    field_id: &str,
    calculation_type: CalculationType,
) -> DatabaseResult<String> {
    let field = ctx.get_field(field_id).await?;
    let rows = ctx.rows_for_view(view_id).await?;
    let value = calculation::calculate(calculation_type, &field, &rows);

    let existing = ctx
        .get_view(view_id)
        .await?
        .calculations
        .into_iter()
        .find(|calc| calc.field_id == field_id);

    let calc = Calculation {
        id: existing
            .map(|c| c.id)
            .unwrap_or_else(super::new_id),
        field_id: field_id.to_string(),
        calculation_type,
        value,
    };
    let calc_id = calc.id.clone();

    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let calculations = view::calculations_list(&view_map)?;
            if let Some((index, _)) = calculations.find_map_by_id(&calc.id) {
                calculations.delete(index, 1)?;
            }
            view::append_calculation(&calculations, &calc)
        })],
        "calculation:set",
    )
    .await?;
    Ok(calc_id)
}

pub async fn remove_calculation(
    ctx: &DatabaseContext,
    view_id: &str,
    calculation_id: &str,
) -> DatabaseResult<()> {
    execute_operations(
        ctx.doc(),
        vec![Box::new(move |d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let calculations = view::calculations_list(&view_map)?;
            match calculations.find_map_by_id(calculation_id) {
                Some((index, _)) => {
                    calculations.delete(index, 1)?;
                    Ok(())
                }
                None => anyhow::bail!(DatabaseError::CalculationNotFound {
                    id: calculation_id.to_string(),
                }),
            }
        })],
        "calculation:remove",
    )
    .await
}

/// Recompute every calculation of a view against the current rows.
///
/// Only values that actually changed are written back, so a recompute on
/// unchanged data produces no CRDT churn and no update for the transport.
/// Returns the number of rewritten values.
pub async fn update_calculations(ctx: &DatabaseContext, view_id: &str) -> DatabaseResult<usize> {
    let origin = ctx.get_view(view_id).await?;
    if origin.calculations.is_empty() {
        return Ok(0);
    }
    let fields = ctx.fields().await?;
    let rows = ctx.rows_for_view(view_id).await?;

    let mut changed: Vec<(String, String)> = Vec::new();
    for calc in &origin.calculations {
        let Some(field) = fields.get(&calc.field_id) else {
            continue;
        };
        let value = calculation::calculate(calc.calculation_type, field, &rows);
        if value != calc.value {
            changed.push((calc.id.clone(), value));
        }
    }
    if changed.is_empty() {
        debug!(view_id, "calculations unchanged, skipping write");
        return Ok(0);
    }

    let count = changed.len();
    execute_operations(
        ctx.doc(),
        vec![Box::new(|d: &loro::LoroDoc| {
            let view_map = database::view_map(d, view_id)?;
            let calculations = view::calculations_list(&view_map)?;
            for (calc_id, value) in &changed {
                if let Some((_, calc_map)) = calculations.find_map_by_id(calc_id) {
                    view::set_calculation_value(&calc_map, value)?;
                }
            }
            Ok(())
        })],
        "calculation:update",
    )
    .await?;
    Ok(count)
}
