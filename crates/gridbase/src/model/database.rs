//! Database document schema: top-level containers and entry lookup.

use anyhow::Result;
use std::collections::HashMap;

use gridbase_api::{DatabaseError, Field};

use super::ext::MapExt;
use super::field;

// Container names (our "schema")
pub const DATABASE_META: &str = "database";
pub const FIELDS: &str = "fields";
pub const VIEWS: &str = "views";

const ID: &str = "id";

/// Initialize the top-level containers of a fresh database document.
pub fn init_database(doc: &loro::LoroDoc, database_id: &str) -> Result<()> {
    let meta = doc.get_map(DATABASE_META);
    meta.insert(ID, loro::LoroValue::from(database_id))?;
    doc.get_map(FIELDS);
    doc.get_map(VIEWS);
    Ok(())
}

pub fn database_id(doc: &loro::LoroDoc) -> Option<String> {
    doc.get_map(DATABASE_META).get_string(ID)
}

pub fn fields_map(doc: &loro::LoroDoc) -> loro::LoroMap {
    doc.get_map(FIELDS)
}

pub fn views_map(doc: &loro::LoroDoc) -> loro::LoroMap {
    doc.get_map(VIEWS)
}

/// Field container lookup; a dangling reference raises the typed NotFound
/// before anything is written.
pub fn field_map(doc: &loro::LoroDoc, field_id: &str) -> Result<loro::LoroMap> {
    fields_map(doc).child_map(field_id).ok_or_else(|| {
        anyhow::anyhow!(DatabaseError::FieldNotFound {
            id: field_id.to_string(),
        })
    })
}

pub fn view_map(doc: &loro::LoroDoc, view_id: &str) -> Result<loro::LoroMap> {
    views_map(doc).child_map(view_id).ok_or_else(|| {
        anyhow::anyhow!(DatabaseError::ViewNotFound {
            id: view_id.to_string(),
        })
    })
}

pub fn list_view_ids(doc: &loro::LoroDoc) -> Vec<String> {
    let mut ids = Vec::new();
    views_map(doc).for_each(|k, _| ids.push(k.to_string()));
    ids
}

pub fn list_field_ids(doc: &loro::LoroDoc) -> Vec<String> {
    let mut ids = Vec::new();
    fields_map(doc).for_each(|k, _| ids.push(k.to_string()));
    ids
}

/// Decode every field definition, keyed by field id.
pub fn read_fields(doc: &loro::LoroDoc) -> HashMap<String, Field> {
    let mut fields = HashMap::new();
    fields_map(doc).for_each(|k, v| {
        if let loro::ValueOrContainer::Container(loro::Container::Map(field_map)) = v {
            fields.insert(k.to_string(), field::read_field(k.as_ref(), &field_map));
        }
    });
    fields
}
