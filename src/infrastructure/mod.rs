pub mod http;
pub mod session_store;

pub use http::build_client;
pub use session_store::{FileStore, KeyValueStore, MemoryStore, SessionStore};
