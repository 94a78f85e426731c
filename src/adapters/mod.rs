// Adapters layer: concrete implementations of the domain ports (HTTP API, draft storage).

pub mod http;
pub mod storage;

pub use http::HttpIntakeApi;
pub use storage::{FileDraftStore, MemoryDraftStore};
