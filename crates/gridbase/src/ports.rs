//! Ports consumed from external collaborators.
//!
//! The engine does not own persistence or navigation; it talks to them
//! through these traits. In-memory implementations back the test suites
//! and double as reference behavior.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use gridbase_api::{DatabaseResult, RowKey, ViewLayout};

use crate::sync::CollabDoc;

/// Loader for row sub-documents, addressed by `(database id, row id)`.
///
/// `open_or_create` is I/O-bound; the calling operation awaits it before
/// proceeding, but rows are independent resources so other work may
/// continue.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn open_or_create(&self, key: &RowKey) -> DatabaseResult<Arc<CollabDoc>>;
}

/// Best-effort view metadata as known by the persistence side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMeta {
    pub view_id: String,
    pub name: String,
    pub layout: ViewLayout,
}

/// Payload for a persistence-side page update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePayload {
    pub name: Option<String>,
    pub icon: Option<String>,
}

/// Persistence-side view lifecycle plus the row-navigation UI hook.
///
/// `update_page`/`delete_page` are invoked before the local CRDT edit for
/// rename/delete. `load_view_meta` is best effort; failures are treated as
/// "not found". `navigate_to_row` fires when a newly created row needs its
/// detail view opened because a filtered value could not be pre-filled.
#[async_trait]
pub trait PageBackend: Send + Sync {
    async fn load_view_meta(&self, view_id: &str) -> Option<ViewMeta>;
    async fn update_page(&self, view_id: &str, payload: PagePayload) -> DatabaseResult<()>;
    async fn delete_page(&self, view_id: &str) -> DatabaseResult<()>;
    fn navigate_to_row(&self, row_id: &str);
}

/// In-memory row store keyed by the composite row key.
#[derive(Default)]
pub struct MemoryRowStore {
    docs: Mutex<HashMap<String, Arc<CollabDoc>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.docs.lock().unwrap().contains_key(&key.to_string())
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn open_or_create(&self, key: &RowKey) -> DatabaseResult<Arc<CollabDoc>> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(key = %key, "creating row document");
                Arc::new(CollabDoc::new(key.to_string()))
            })
            .clone();
        Ok(doc)
    }
}

/// In-memory page backend that records calls for inspection in tests.
#[derive(Default)]
pub struct MemoryPageBackend {
    metas: Mutex<HashMap<String, ViewMeta>>,
    pub updated: Mutex<Vec<(String, PagePayload)>>,
    pub deleted: Mutex<Vec<String>>,
    pub navigated: Mutex<Vec<String>>,
}

impl MemoryPageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_view_meta(&self, meta: ViewMeta) {
        self.metas
            .lock()
            .unwrap()
            .insert(meta.view_id.clone(), meta);
    }
}

#[async_trait]
impl PageBackend for MemoryPageBackend {
    async fn load_view_meta(&self, view_id: &str) -> Option<ViewMeta> {
        self.metas.lock().unwrap().get(view_id).cloned()
    }

    async fn update_page(&self, view_id: &str, payload: PagePayload) -> DatabaseResult<()> {
        self.updated
            .lock()
            .unwrap()
            .push((view_id.to_string(), payload));
        Ok(())
    }

    async fn delete_page(&self, view_id: &str) -> DatabaseResult<()> {
        self.deleted.lock().unwrap().push(view_id.to_string());
        Ok(())
    }

    fn navigate_to_row(&self, row_id: &str) {
        self.navigated.lock().unwrap().push(row_id.to_string());
    }
}
