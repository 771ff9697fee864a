//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the [`ledger::LedgerRepository`] trait.
//!
//! # Modules
//!
//! - `conversion` - Raw amount to settlement conversion
//! - `rates` - Group default and per-country fee/exchange rates
//! - `ledger` - Per-group transaction ledger, undo, and rollback
//! - `query` - Read views and statistics
//! - `admin` - Owner, admins, and private chat users
//! - `command` - Chat text to command parsing
//! - `dispatch` - Command execution and reply rendering

pub mod admin;
pub mod command;
pub mod conversion;
pub mod dispatch;
pub mod ledger;
pub mod query;
pub mod rates;

#[cfg(test)]
mod conversion_props;
