//! Operation surface exposed to the application layer.
//!
//! Each operation validates its references, then mutates the shared
//! document through the dispatcher. State changes are observed reactively
//! through the document; return values carry identifiers only.

pub mod calculations;
pub mod fields;
pub mod filters;
pub mod groups;
pub mod rows;
pub mod sorts;
pub mod views;

/// Allocate an entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
