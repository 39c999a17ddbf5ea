use crate::BackendError;

pub mod store;

/// The opaque key-value driver collaborator (`GET`/`SET`/`DEL`/`KEYS`).
/// Values are opaque text blobs to the backend; this layer stores JSON.
pub trait KvBackend {
    fn get(&mut self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError>;
    /// Returns whether the key existed.
    fn del(&mut self, key: &str) -> Result<bool, BackendError>;
    fn keys(&mut self, pattern: &str) -> Result<Vec<String>, BackendError>;
}

/// JSON-mapping store over a key-value backend. Holds no client-side cache;
/// every call round-trips to the backend.
#[derive(Debug)]
pub struct KvStore<B: KvBackend> {
    backend: B,
}
