//! Vector-store collaborator for product search: a LanceDB table and an
//! in-memory equivalent, both behind `shopsearch_core::traits::VectorStore`.

pub mod memory;
pub mod predicate;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use memory::MemoryStore;
pub use search::LanceProductStore;
