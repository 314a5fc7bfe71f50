pub mod error;
pub mod kv;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::SessionStore;
