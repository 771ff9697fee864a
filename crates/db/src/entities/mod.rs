//! `SeaORM` entities for the ledger tables.

pub mod admins;
pub mod group_country_rates;
pub mod groups;
pub mod private_chat_users;
pub mod transactions;
