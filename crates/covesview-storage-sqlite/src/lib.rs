pub mod identity_cache;
pub mod mapping;
pub mod record_store;
pub mod session_store;
pub mod store;

pub use store::SqliteStore;
