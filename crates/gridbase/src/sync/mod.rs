pub mod collaborative_doc;

pub use collaborative_doc::CollabDoc;
