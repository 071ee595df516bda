//! Field map schema: one Loro map per field under the `fields` container.

use anyhow::Result;
use std::collections::HashMap;

use gridbase_api::{Field, FieldType};

use super::ext::MapExt;

const NAME: &str = "name";
const TYPE: &str = "type";
const ICON: &str = "icon";
const IS_PRIMARY: &str = "is_primary";
const LAST_MODIFIED: &str = "last_modified";
// Map keyed by stringified field-type number; values are JSON strings.
// Entries for previous types are never removed, which is what makes a
// type switch lossless.
const TYPE_OPTION: &str = "type_option";

/// Write a full field definition, creating the container.
pub fn write_field(fields_map: &loro::LoroMap, field: &Field) -> Result<loro::LoroMap> {
    let field_map = fields_map.insert_container(&field.id, loro::LoroMap::new())?;
    field_map.insert(NAME, loro::LoroValue::from(field.name.as_str()))?;
    field_map.insert(TYPE, loro::LoroValue::from(field.field_type.as_i64()))?;
    field_map.insert(IS_PRIMARY, loro::LoroValue::from(field.is_primary))?;
    field_map.insert(LAST_MODIFIED, loro::LoroValue::from(field.last_modified))?;
    if let Some(icon) = &field.icon {
        field_map.insert(ICON, loro::LoroValue::from(icon.as_str()))?;
    }
    if !field.type_options.is_empty() {
        let options_map = field_map.get_or_create_map(TYPE_OPTION)?;
        for (type_key, payload) in &field.type_options {
            options_map.insert(
                &type_key.to_string(),
                loro::LoroValue::from(payload.to_string().as_str()),
            )?;
        }
    }
    Ok(field_map)
}

pub fn read_field(field_id: &str, field_map: &loro::LoroMap) -> Field {
    let field_type = field_map
        .get_i64(TYPE)
        .and_then(FieldType::from_i64)
        .unwrap_or(FieldType::RichText);

    let mut type_options: HashMap<i64, serde_json::Value> = HashMap::new();
    if let Some(options_map) = field_map.child_map(TYPE_OPTION) {
        options_map.for_each(|k, v| {
            if let loro::ValueOrContainer::Value(val) = v {
                if let (Ok(type_key), Some(raw)) = (k.parse::<i64>(), val.as_string()) {
                    if let Ok(payload) = serde_json::from_str(raw.as_ref()) {
                        type_options.insert(type_key, payload);
                    }
                }
            }
        });
    }

    Field {
        id: field_id.to_string(),
        name: field_map.get_string(NAME).unwrap_or_default(),
        field_type,
        icon: field_map.get_string(ICON),
        is_primary: field_map.get_bool(IS_PRIMARY).unwrap_or(false),
        last_modified: field_map.get_i64(LAST_MODIFIED).unwrap_or(0),
        type_options,
    }
}

pub fn set_name(field_map: &loro::LoroMap, name: &str, now: i64) -> Result<()> {
    field_map.insert(NAME, loro::LoroValue::from(name))?;
    touch(field_map, now)
}

pub fn set_icon(field_map: &loro::LoroMap, icon: &str, now: i64) -> Result<()> {
    field_map.insert(ICON, loro::LoroValue::from(icon))?;
    touch(field_map, now)
}

/// Overwrite the current type. The previous type's entry in `type_option`
/// stays where it is.
pub fn set_field_type(field_map: &loro::LoroMap, field_type: FieldType, now: i64) -> Result<()> {
    field_map.insert(TYPE, loro::LoroValue::from(field_type.as_i64()))?;
    touch(field_map, now)
}

/// Write the type option payload for one field type.
pub fn set_type_option(
    field_map: &loro::LoroMap,
    field_type: FieldType,
    payload: &serde_json::Value,
) -> Result<()> {
    let options_map = field_map.get_or_create_map(TYPE_OPTION)?;
    options_map.insert(
        &field_type.as_i64().to_string(),
        loro::LoroValue::from(payload.to_string().as_str()),
    )?;
    Ok(())
}

pub fn touch(field_map: &loro::LoroMap, now: i64) -> Result<()> {
    field_map.insert(LAST_MODIFIED, loro::LoroValue::from(now))?;
    Ok(())
}
