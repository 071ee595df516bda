//! Transaction dispatcher.
//!
//! All structural mutation of the database document goes through the two
//! entry points here. `execute_operations` commits a batch of mutations as
//! one named change set and aborts whole on the first failure.
//! `execute_with_all_views` fans one edit out to every view of the
//! database with per-view fault isolation: a malformed view must not block
//! its siblings from receiving the edit.

use anyhow::Result;
use tracing::{debug, warn};

use gridbase_api::{DatabaseError, DatabaseResult};

use crate::model::database;
use crate::sync::CollabDoc;

/// One mutation step against the locked document.
pub type Mutation<'a> = Box<dyn FnOnce(&loro::LoroDoc) -> Result<()> + Send + 'a>;

/// Map a closure error back to the typed taxonomy. Errors raised as
/// `DatabaseError` pass through; anything else becomes `Internal`.
pub(crate) fn into_database_error(err: anyhow::Error) -> DatabaseError {
    match err.downcast::<DatabaseError>() {
        Ok(typed) => typed,
        Err(other) => DatabaseError::internal(other),
    }
}

/// Run `ops` in order against the shared document and commit them as one
/// atomic, labeled change set.
///
/// The first failing operation aborts the whole call: the document is
/// reverted and no update is produced for other replicas.
pub async fn execute_operations(
    doc: &CollabDoc,
    ops: Vec<Mutation<'_>>,
    label: &str,
) -> DatabaseResult<()> {
    doc.with_transaction(label, |d| {
        for op in ops {
            op(d)?;
        }
        Ok(())
    })
    .await
    .map_err(into_database_error)
}

/// Outcome of an all-views fan-out. `skipped` records views whose edit
/// failed and was ignored, with the failure message.
#[derive(Debug, Default, Clone)]
pub struct ViewFanOut {
    pub applied: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

/// Apply the same structural edit to every view of the database in one
/// transaction.
///
/// Field and row orders are per-view, so edits like "add a field" or
/// "delete a row" must touch every view's order list. Per-view failures
/// (typically a view whose order lists were never initialized) are
/// collected and ignored so the remaining views still receive the edit.
pub async fn execute_with_all_views<F>(
    doc: &CollabDoc,
    label: &str,
    per_view: F,
) -> DatabaseResult<ViewFanOut>
where
    F: Fn(&loro::LoroDoc, &str) -> Result<()> + Send,
{
    doc.with_transaction(label, |d| Ok(apply_to_all_views(d, label, per_view)))
        .await
        .map_err(into_database_error)
}

/// The fan-out core, callable from inside an already open transaction when
/// an operation pairs a one-time write (e.g. the field definition) with a
/// per-view edit.
pub fn apply_to_all_views<F>(d: &loro::LoroDoc, label: &str, per_view: F) -> ViewFanOut
where
    F: Fn(&loro::LoroDoc, &str) -> Result<()>,
{
    let mut fan_out = ViewFanOut::default();
    for view_id in database::list_view_ids(d) {
        match per_view(d, &view_id) {
            Ok(()) => fan_out.applied.push(view_id),
            Err(err) => {
                // Missing structures are the expected skip case; a typed
                // error of any other kind is still skipped, but louder.
                let unexpected = err
                    .downcast_ref::<DatabaseError>()
                    .is_some_and(|e| !e.is_not_found());
                if unexpected {
                    warn!(view_id = %view_id, label, error = %err, "skipping view in fan-out");
                } else {
                    debug!(view_id = %view_id, label, error = %err, "skipping view in fan-out");
                }
                fan_out.skipped.push((view_id, err.to_string()));
            }
        }
    }
    fan_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ext::{ListExt, MapExt};
    use crate::model::view;
    use gridbase_api::{View, ViewLayout};

    async fn doc_with_views(view_ids: &[&str]) -> CollabDoc {
        let doc = CollabDoc::new("db-test");
        doc.with_transaction("setup", |d| {
            database::init_database(d, "db-test")?;
            for view_id in view_ids {
                view::write_view(
                    &database::views_map(d),
                    &View::new(*view_id, "View", ViewLayout::Grid),
                )?;
            }
            Ok(())
        })
        .await
        .unwrap();
        doc
    }

    #[tokio::test]
    async fn test_execute_operations_is_atomic() {
        let doc = doc_with_views(&["v1"]).await;
        let result = execute_operations(
            &doc,
            vec![
                Box::new(|d| {
                    let view_map = database::view_map(d, "v1")?;
                    view::row_orders(&view_map)?.push(loro::LoroValue::from("row-1"))?;
                    Ok(())
                }),
                Box::new(|_| {
                    Err(anyhow::anyhow!(DatabaseError::RowNotFound {
                        id: "missing".into()
                    }))
                }),
            ],
            "test:doomed",
        )
        .await;

        assert_eq!(
            result,
            Err(DatabaseError::RowNotFound {
                id: "missing".into()
            })
        );

        // The first mutation was rolled back with the failed transaction.
        let row_count = doc
            .with_read(|d| {
                let view_map = database::view_map(d, "v1")?;
                Ok(view::row_orders(&view_map)?.len())
            })
            .await
            .unwrap();
        assert_eq!(row_count, 0);
    }

    #[tokio::test]
    async fn test_fan_out_isolates_broken_view() {
        let doc = doc_with_views(&["v1", "v2"]).await;
        // A third view written without order lists, as a partially
        // initialized replica would produce.
        doc.with_transaction("setup:broken", |d| {
            let broken = database::views_map(d).get_or_create_map("v-broken")?;
            broken.insert("name", loro::LoroValue::from("Broken"))?;
            Ok(())
        })
        .await
        .unwrap();

        let fan_out = execute_with_all_views(&doc, "test:add_row", |d, view_id| {
            let view_map = database::view_map(d, view_id)?;
            view::row_orders(&view_map)?.push(loro::LoroValue::from("row-1"))?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(fan_out.applied.len(), 2);
        assert_eq!(fan_out.skipped.len(), 1);
        assert_eq!(fan_out.skipped[0].0, "v-broken");

        // Healthy views still received the edit.
        doc.with_read(|d| {
            for view_id in ["v1", "v2"] {
                let view_map = database::view_map(d, view_id)?;
                assert_eq!(view::row_orders(&view_map)?.collect_strings(), ["row-1"]);
            }
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fan_out_skips_typed_not_found_errors() {
        let doc = doc_with_views(&["v1", "v2"]).await;
        let fan_out = execute_with_all_views(&doc, "test:partial", |d, view_id| {
            if view_id == "v2" {
                anyhow::bail!(DatabaseError::FieldNotFound { id: "ghost".into() });
            }
            let view_map = database::view_map(d, view_id)?;
            view::row_orders(&view_map)?.push(loro::LoroValue::from("row-1"))?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(fan_out.applied, ["v1"]);
        assert_eq!(fan_out.skipped.len(), 1);
        assert_eq!(fan_out.skipped[0].0, "v2");
        assert!(fan_out.skipped[0].1.contains("Field not found"));
    }
}
