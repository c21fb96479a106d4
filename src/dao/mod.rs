//! Persistence layer: the blob store abstraction, its backends, and the
//! serialized entity types with their fail-soft decoders.

pub mod file_store;
pub mod memory;
pub mod models;
pub mod storage;
pub mod store;
