//! Storage contracts for the alert classification & publishing service.
//!
//! This crate specifies *what* persistence looks like (`ConfigStore`,
//! `DlqStore`, `LockManager`) without choosing a concrete backend — the
//! persistent store is an external collaborator. In-memory reference
//! implementations are provided so the daemon can run standalone and so
//! the contracts have something to test against.

mod error;
mod fakes;
mod storage_traits;

pub use error::StorageError;
pub use fakes::{MemoryConfigStore, MemoryDlqStore, MemoryLockManager};
pub use storage_traits::{ConfigStore, DlqStore, Lock, LockManager, StorageResult};

pub type Result<T> = std::result::Result<T, StorageError>;
