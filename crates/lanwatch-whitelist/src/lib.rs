//! lanwatch-whitelist: the single source of truth for device trust.
//!
//! The whitelist is a set of canonical hardware ids persisted as one JSON
//! array. Every mutation rewrites the whole file before it is acknowledged,
//! and mutations are serialized so concurrent callers never lose an update.

pub mod store;
pub mod whitelist;

pub use store::{JsonFileStore, StoreError, WhitelistStore};
pub use whitelist::{ChangeListener, Whitelist};

pub type Result<T> = std::result::Result<T, StoreError>;
