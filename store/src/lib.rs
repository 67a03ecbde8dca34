pub mod estimate;
pub mod kv;
pub mod models;
pub mod tasks;

mod file_store;
pub use file_store::FileStore;

pub use estimate::{estimate_minutes, DEFAULT_ESTIMATE_MINUTES};
pub use kv::{KvStore, MemoryStore, StoreError};
pub use models::{Filter, Priority, SortKey, Task};
pub use tasks::{filter_tasks, sort_tasks, stats, TaskStats, TaskStore};
