//! Persistence layer: key-value backends and session message storage.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod session;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::InMemoryStore;
pub use session::SessionStorage;
pub use traits::KeyValueStore;
