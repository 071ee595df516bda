pub mod codec;
pub mod context;
pub mod dispatch;
pub mod model;
pub mod operations;
pub mod ports;
pub mod query;
pub mod sync;

pub use context::DatabaseContext;
pub use dispatch::{execute_operations, execute_with_all_views, ViewFanOut};
pub use operations::rows::CreatedRow;
pub use ports::{MemoryPageBackend, MemoryRowStore, PageBackend, PagePayload, RowStore, ViewMeta};
pub use query::group::GroupBucket;
pub use sync::CollabDoc;

pub use gridbase_api as api;
