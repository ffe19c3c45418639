//! Common entity contract.

/// Anything persisted by a repository: identified by an immutable string id.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}
