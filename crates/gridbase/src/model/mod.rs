//! Typed document model over the Loro container hierarchy.
//!
//! The CRDT stores dynamically typed maps and lists; this module is the
//! only place that knows the container schema. Everything above it works
//! with the plain snapshot types from `gridbase-api`.

pub mod database;
pub mod ext;
pub mod field;
pub mod reorder;
pub mod row;
pub mod view;

/// Milliseconds since the Unix epoch. The unit for `created_at` and
/// `last_modified` metadata everywhere in the document.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Seconds since the Unix epoch. The unit for DateTime cell payloads.
pub fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}
