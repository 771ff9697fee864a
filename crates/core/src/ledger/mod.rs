//! Per-group running ledger.
//!
//! This module implements:
//! - Transaction types and the error taxonomy
//! - The repository seam and its in-memory implementation
//! - The ledger engine (record, correlation attach, clear, retention)
//! - Undo and rollback by correlation id

pub mod engine;
pub mod error;
pub mod lock;
pub mod memory;
pub mod repository;
pub mod rollback;
pub mod types;

#[cfg(test)]
mod engine_props;
#[cfg(test)]
mod engine_tests;

pub use engine::{LedgerEngine, LedgerSettings};
pub use error::LedgerError;
pub use lock::GroupLocks;
pub use memory::MemoryRepository;
pub use repository::LedgerRepository;
pub use types::{
    ClearSummary, DEFAULT_COUNTRY, Direction, KindTally, NewTransaction, Operator, Transaction,
    TransactionKind,
};
