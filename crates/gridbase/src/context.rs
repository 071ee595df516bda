//! Database session context.
//!
//! `DatabaseContext` threads the shared database document and the external
//! ports through every operation explicitly. There is no ambient global
//! state; whoever owns the workspace session constructs one context per
//! open database and passes it down.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use gridbase_api::{
    DatabaseError, DatabaseResult, Field, FieldType, Row, RowKey, View, ViewLayout,
};

use crate::dispatch::into_database_error;
use crate::model::ext::ListExt;
use crate::model::{self, database, field, row, view};
use crate::ports::{PageBackend, RowStore};
use crate::sync::CollabDoc;

pub struct DatabaseContext {
    database_id: String,
    doc: Arc<CollabDoc>,
    row_store: Arc<dyn RowStore>,
    page_backend: Arc<dyn PageBackend>,
    /// Row sub-documents already opened this session, keyed by row id.
    row_docs: Mutex<HashMap<String, Arc<CollabDoc>>>,
}

impl DatabaseContext {
    /// Open a context over an existing database document.
    pub fn open(
        database_id: impl Into<String>,
        doc: Arc<CollabDoc>,
        row_store: Arc<dyn RowStore>,
        page_backend: Arc<dyn PageBackend>,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            doc,
            row_store,
            page_backend,
            row_docs: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize a fresh database with one primary text field and one grid
    /// view, then open a context over it.
    pub async fn create(
        database_id: impl Into<String>,
        doc: Arc<CollabDoc>,
        row_store: Arc<dyn RowStore>,
        page_backend: Arc<dyn PageBackend>,
    ) -> DatabaseResult<Self> {
        let database_id = database_id.into();
        let field_id = crate::operations::new_id();
        let view_id = crate::operations::new_id();
        let now = model::now_millis();

        doc.with_transaction("database:create", |d| {
            database::init_database(d, &database_id)?;

            let mut primary = Field::new(&field_id, "Name", FieldType::RichText);
            primary.is_primary = true;
            primary.last_modified = now;
            field::write_field(&database::fields_map(d), &primary)?;

            let mut grid = View::new(&view_id, "Grid", ViewLayout::Grid);
            grid.field_orders.push(field_id.clone());
            view::write_view(&database::views_map(d), &grid)?;
            Ok(())
        })
        .await
        .map_err(into_database_error)?;

        info!(database_id = %database_id, view_id = %view_id, "database created");
        Ok(Self::open(database_id, doc, row_store, page_backend))
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn doc(&self) -> &CollabDoc {
        &self.doc
    }

    pub fn page_backend(&self) -> &dyn PageBackend {
        self.page_backend.as_ref()
    }

    /// Open (or create) the sub-document for one row, going through the
    /// session cache first.
    pub async fn row_doc(&self, row_id: &str) -> DatabaseResult<Arc<CollabDoc>> {
        let mut cache = self.row_docs.lock().await;
        if let Some(doc) = cache.get(row_id) {
            return Ok(doc.clone());
        }
        let key = RowKey::new(&self.database_id, row_id);
        let doc = self.row_store.open_or_create(&key).await?;
        cache.insert(row_id.to_string(), doc.clone());
        Ok(doc)
    }

    /// Decoded snapshot of one row.
    pub async fn get_row(&self, row_id: &str) -> DatabaseResult<Row> {
        let doc = self.row_doc(row_id).await?;
        doc.with_read(|d| Ok(row::read_row(row_id, d)))
            .await
            .map_err(into_database_error)
    }

    /// Snapshots of a view's rows, in the view's row order.
    pub async fn rows_for_view(&self, view_id: &str) -> DatabaseResult<Vec<Row>> {
        let row_ids = self
            .doc
            .with_read(|d| {
                let view_map = database::view_map(d, view_id)?;
                Ok(view::row_orders(&view_map)?.collect_strings())
            })
            .await
            .map_err(into_database_error)?;

        let mut rows = Vec::with_capacity(row_ids.len());
        for row_id in &row_ids {
            rows.push(self.get_row(row_id).await?);
        }
        Ok(rows)
    }

    pub async fn get_view(&self, view_id: &str) -> DatabaseResult<View> {
        self.doc
            .with_read(|d| {
                let view_map = database::view_map(d, view_id)?;
                Ok(view::read_view(view_id, &view_map))
            })
            .await
            .map_err(into_database_error)
    }

    pub async fn get_field(&self, field_id: &str) -> DatabaseResult<Field> {
        self.doc
            .with_read(|d| {
                let field_map = database::field_map(d, field_id)?;
                Ok(field::read_field(field_id, &field_map))
            })
            .await
            .map_err(into_database_error)
    }

    /// Every field definition, keyed by field id.
    pub async fn fields(&self) -> DatabaseResult<HashMap<String, Field>> {
        self.doc
            .with_read(|d| Ok(database::read_fields(d)))
            .await
            .map_err(into_database_error)
    }

    /// Row ids referenced by any view, in order of first appearance.
    /// Orphaned row documents are not reachable from here.
    pub async fn all_row_ids(&self) -> DatabaseResult<Vec<String>> {
        self.doc
            .with_read(|d| {
                let mut seen = std::collections::HashSet::new();
                let mut ids = Vec::new();
                for view_id in database::list_view_ids(d) {
                    let Ok(view_map) = database::view_map(d, &view_id) else {
                        continue;
                    };
                    let Ok(orders) = view::row_orders(&view_map) else {
                        continue;
                    };
                    for row_id in orders.collect_strings() {
                        if seen.insert(row_id.clone()) {
                            ids.push(row_id);
                        }
                    }
                }
                Ok(ids)
            })
            .await
            .map_err(into_database_error)
    }

    pub async fn view_ids(&self) -> DatabaseResult<Vec<String>> {
        self.doc
            .with_read(|d| Ok(database::list_view_ids(d)))
            .await
            .map_err(into_database_error)
    }

    /// The first view id, used as a fallback originating view.
    pub async fn any_view_id(&self) -> DatabaseResult<String> {
        self.view_ids()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::invalid("Database has no views"))
    }
}
