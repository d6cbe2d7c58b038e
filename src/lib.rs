// TodoStore - to-do list persisted to local key/value storage with JSON import/export

pub mod config;
pub mod file_kv;
pub mod filter;
pub mod kv;
pub mod normalize;
pub mod snapshot;
pub mod sqlite_kv;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use file_kv::FileKv;
pub use filter::Filter;
pub use kv::{KeyValueStore, MemoryKv};
pub use snapshot::{ImportPolicy, ImportReport, Snapshot, export_file_name};
pub use sqlite_kv::SqliteKv;
pub use store::{Counts, DEFAULT_STORAGE_KEY, StoreEvent, TodoStore, Toggled};
pub use task::{NewTask, Task, TaskEdit};
