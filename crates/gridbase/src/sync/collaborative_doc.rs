//! Shared mergeable document wrapper.
//!
//! `CollabDoc` wraps one Loro document (the database document, or one row
//! sub-document) and exposes the two transport primitives the engine
//! relies on: `apply_update` for remote changes and `take_pending_updates`
//! for locally produced change sets. The transport that ships updates
//! between replicas lives outside this crate.

use anyhow::Result;
use loro::{LoroDoc, VersionVector};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct CollabDoc {
    doc: Arc<RwLock<LoroDoc>>,
    doc_id: String,
    /// Change sets committed locally and not yet collected by the transport.
    pending_updates: Mutex<Vec<Vec<u8>>>,
    /// Oplog version up to which updates have already been exported.
    exported_vv: Mutex<VersionVector>,
}

impl CollabDoc {
    pub fn new(doc_id: impl Into<String>) -> Self {
        let doc = LoroDoc::new();
        // Loro represents a replica by a numeric peer id; a random one is
        // sufficient since the transport layer owns identity.
        let _ = doc.set_peer_id(rand::random::<u64>());

        Self {
            doc: Arc::new(RwLock::new(doc)),
            doc_id: doc_id.into(),
            pending_updates: Mutex::new(Vec::new()),
            exported_vv: Mutex::new(VersionVector::new()),
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Execute a read-only operation on the document.
    pub async fn with_read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&LoroDoc) -> Result<R>,
    {
        let doc = self.doc.read().await;
        f(&doc)
    }

    /// Execute a named, atomic transaction.
    ///
    /// Guarantees:
    /// - mutations from `f` commit together as one labeled change set
    /// - on error the document is reverted to its pre-transaction state,
    ///   and no update is queued for the transport
    /// - the label is attached as the commit message for observability
    ///   and undo tracking
    pub async fn with_transaction<F, R>(&self, label: &str, f: F) -> Result<R>
    where
        F: FnOnce(&LoroDoc) -> Result<R>,
    {
        let doc = self.doc.write().await;
        let before = doc.state_frontiers();

        match f(&doc) {
            Ok(result) => {
                doc.set_next_commit_message(label);
                doc.commit();

                let mut exported_vv = self.exported_vv.lock().unwrap();
                let update = doc.export(loro::ExportMode::updates_owned(exported_vv.clone()))?;
                *exported_vv = doc.oplog_vv();
                drop(exported_vv);

                if !update.is_empty() {
                    debug!(
                        doc_id = %self.doc_id,
                        label,
                        bytes = update.len(),
                        "transaction committed"
                    );
                    self.pending_updates.lock().unwrap().push(update);
                }
                Ok(result)
            }
            Err(err) => {
                // Seal whatever the closure wrote, then roll it back so the
                // document state matches the pre-transaction frontier.
                doc.commit();
                if let Err(revert_err) = doc.revert_to(&before) {
                    warn!(
                        doc_id = %self.doc_id,
                        label,
                        error = %revert_err,
                        "failed to revert aborted transaction"
                    );
                }
                Err(err)
            }
        }
    }

    /// Apply an update produced by a remote replica.
    pub async fn apply_update(&self, update: &[u8]) -> Result<()> {
        let doc = self.doc.write().await;
        doc.import(update)?;
        debug!(doc_id = %self.doc_id, bytes = update.len(), "applied remote update");
        Ok(())
    }

    pub async fn export_snapshot(&self) -> Result<Vec<u8>> {
        let doc = self.doc.read().await;
        Ok(doc.export(loro::ExportMode::Snapshot)?)
    }

    /// Drain the change sets committed since the last call. The transport
    /// layer ships these to other replicas.
    pub fn take_pending_updates(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_updates.lock().unwrap())
    }
}
