//! Storage area contracts for Stratum.
//!
//! Every layer in Stratum -- prefixed views, the chunked store, typed
//! accessors -- speaks the same flat key-value [`Area`] contract, so the
//! layers stack in any order over a physical backend.
//!
//! # Contracts
//!
//! - [`Area`] -- `set` / `get` / `delete` over string keys and JSON values
//! - [`Lock`] -- exclusive access to a named resource, see [`run_exclusive`]
//!
//! # Reference Implementations
//!
//! - [`MemArea`] -- `HashMap`-based area with fault injection for tests
//! - [`NamedLock`] -- in-process FIFO lock per resource name

pub mod error;
pub mod lock;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use lock::NamedLock;
pub use memory::{AreaFaults, MemArea};
pub use traits::{run_exclusive, Area, Entries, Lock, LockGuard};
