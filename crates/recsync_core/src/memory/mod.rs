//! In-memory store adapters.

mod local;
mod predicate;
mod remote;

pub use local::MemoryLocalStore;
pub use remote::MemoryRemoteStore;
