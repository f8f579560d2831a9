//! Database layer
//!
//! Store boundary, filter language and the MongoDB and in-memory backends.

pub mod batch;
pub mod filter;
pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use batch::{insert_batched, insert_entities, DEFAULT_BATCH_SIZE};
pub use filter::Filter;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{
    AntiJoin, DocumentStore, FindQuery, ForeignKey, GroupCount, GroupRow, IndexSpec, SortOrder,
};
