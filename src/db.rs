pub mod connection;
pub mod schema;
pub mod models;
pub mod queries;
pub mod snapshot_store;
pub mod db_manager;
pub mod memory_store;

pub use db_manager::DbManager;
pub use memory_store::MemorySnapshotStore;
pub use snapshot_store::SnapshotStore;
