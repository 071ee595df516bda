//! Row sub-document schema.
//!
//! Each row is its own CRDT document with two top-level containers: `cells`
//! (field-id → cell map) and `meta`. Relation and FileMedia cell data is a
//! list container of ids; every other type stores a string.

use anyhow::Result;
use std::collections::HashMap;

use gridbase_api::{Cell, CellData, FieldType, Row, RowMeta};

use super::ext::{ListExt, MapExt};

pub const CELLS: &str = "cells";
pub const META: &str = "meta";

const ID: &str = "id";
const CREATED_AT: &str = "created_at";
const LAST_MODIFIED: &str = "last_modified";

const DATA: &str = "data";
const FIELD_TYPE: &str = "field_type";
const SOURCE_FIELD_TYPE: &str = "source_field_type";
const END_TIMESTAMP: &str = "end_timestamp";
const IS_RANGE: &str = "is_range";
const INCLUDE_TIME: &str = "include_time";
const REMINDER_ID: &str = "reminder_id";

const ICON: &str = "icon";
const COVER: &str = "cover";
const IS_DOCUMENT_EMPTY: &str = "is_document_empty";

/// Initialize a fresh row document.
pub fn init_row(doc: &loro::LoroDoc, row_id: &str, now: i64) -> Result<()> {
    let meta = doc.get_map(META);
    meta.insert(ID, loro::LoroValue::from(row_id))?;
    meta.insert(CREATED_AT, loro::LoroValue::from(now))?;
    meta.insert(LAST_MODIFIED, loro::LoroValue::from(now))?;
    doc.get_map(CELLS);
    Ok(())
}

pub fn cells_map(doc: &loro::LoroDoc) -> loro::LoroMap {
    doc.get_map(CELLS)
}

pub fn meta_map(doc: &loro::LoroDoc) -> loro::LoroMap {
    doc.get_map(META)
}

pub fn touch(doc: &loro::LoroDoc, now: i64) -> Result<()> {
    meta_map(doc).insert(LAST_MODIFIED, loro::LoroValue::from(now))?;
    Ok(())
}

pub fn write_meta(doc: &loro::LoroDoc, meta: &RowMeta) -> Result<()> {
    let meta_map = meta_map(doc);
    if let Some(icon) = &meta.icon {
        meta_map.insert(ICON, loro::LoroValue::from(icon.as_str()))?;
    }
    if let Some(cover) = &meta.cover {
        meta_map.insert(COVER, loro::LoroValue::from(cover.as_str()))?;
    }
    meta_map.insert(
        IS_DOCUMENT_EMPTY,
        loro::LoroValue::from(meta.is_document_empty),
    )?;
    Ok(())
}

/// Write one cell, replacing any previous value. List data gets a fresh
/// container with element-wise copies, never a shared reference.
pub fn write_cell(cells_map: &loro::LoroMap, field_id: &str, cell: &Cell) -> Result<()> {
    let cell_map = cells_map.get_or_create_map(field_id)?;
    write_cell_into(&cell_map, cell)
}

/// Write a cell into an already-resolved cell container.
pub fn write_cell_into(cell_map: &loro::LoroMap, cell: &Cell) -> Result<()> {
    match &cell.data {
        CellData::Ids(ids) => {
            let list = cell_map.insert_container(DATA, loro::LoroList::new())?;
            for id in ids {
                list.push(loro::LoroValue::from(id.as_str()))?;
            }
        }
        CellData::Text(text) => {
            cell_map.insert(DATA, loro::LoroValue::from(text.as_str()))?;
        }
        CellData::Empty => {
            cell_map.insert(DATA, loro::LoroValue::from(""))?;
        }
    }
    cell_map.insert(
        FIELD_TYPE,
        loro::LoroValue::from(cell.field_type.as_i64()),
    )?;
    match cell.source_field_type {
        Some(source) => {
            cell_map.insert(SOURCE_FIELD_TYPE, loro::LoroValue::from(source.as_i64()))?
        }
        None => cell_map.insert(SOURCE_FIELD_TYPE, loro::LoroValue::Null)?,
    };
    cell_map.insert(CREATED_AT, loro::LoroValue::from(cell.created_at))?;
    cell_map.insert(LAST_MODIFIED, loro::LoroValue::from(cell.last_modified))?;
    match cell.end_timestamp {
        Some(end) => cell_map.insert(END_TIMESTAMP, loro::LoroValue::from(end))?,
        None => cell_map.insert(END_TIMESTAMP, loro::LoroValue::Null)?,
    };
    cell_map.insert(IS_RANGE, loro::LoroValue::from(cell.is_range))?;
    cell_map.insert(INCLUDE_TIME, loro::LoroValue::from(cell.include_time))?;
    if let Some(reminder_id) = &cell.reminder_id {
        cell_map.insert(REMINDER_ID, loro::LoroValue::from(reminder_id.as_str()))?;
    }
    Ok(())
}

pub fn read_cell(cell_map: &loro::LoroMap) -> Cell {
    let data = match cell_map.get(DATA) {
        Some(loro::ValueOrContainer::Container(loro::Container::List(list))) => {
            CellData::Ids(list.collect_strings())
        }
        Some(loro::ValueOrContainer::Value(val)) => match val.as_string() {
            Some(s) if !s.is_empty() => CellData::Text(s.to_string()),
            _ => CellData::Empty,
        },
        _ => CellData::Empty,
    };

    Cell {
        data,
        field_type: cell_map
            .get_i64(FIELD_TYPE)
            .and_then(FieldType::from_i64)
            .unwrap_or(FieldType::RichText),
        source_field_type: cell_map
            .get_i64(SOURCE_FIELD_TYPE)
            .and_then(FieldType::from_i64),
        created_at: cell_map.get_i64(CREATED_AT).unwrap_or(0),
        last_modified: cell_map.get_i64(LAST_MODIFIED).unwrap_or(0),
        end_timestamp: cell_map.get_i64(END_TIMESTAMP),
        is_range: cell_map.get_bool(IS_RANGE).unwrap_or(false),
        include_time: cell_map.get_bool(INCLUDE_TIME).unwrap_or(false),
        reminder_id: cell_map.get_string(REMINDER_ID),
    }
}

pub fn cell_map(doc: &loro::LoroDoc, field_id: &str) -> Option<loro::LoroMap> {
    cells_map(doc).child_map(field_id)
}

/// Decode a full row snapshot.
pub fn read_row(row_id: &str, doc: &loro::LoroDoc) -> Row {
    let mut cells = HashMap::new();
    cells_map(doc).for_each(|k, v| {
        if let loro::ValueOrContainer::Container(loro::Container::Map(cell_map)) = v {
            cells.insert(k.to_string(), read_cell(&cell_map));
        }
    });

    let meta_map = meta_map(doc);
    Row {
        id: row_id.to_string(),
        cells,
        meta: RowMeta {
            icon: meta_map.get_string(ICON),
            cover: meta_map.get_string(COVER),
            is_document_empty: meta_map.get_bool(IS_DOCUMENT_EMPTY).unwrap_or(false),
        },
        created_at: meta_map.get_i64(CREATED_AT).unwrap_or(0),
        last_modified: meta_map.get_i64(LAST_MODIFIED).unwrap_or(0),
    }
}
