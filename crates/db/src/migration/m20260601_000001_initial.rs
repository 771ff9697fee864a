//! Initial database migration.
//!
//! Creates the group, rate, transaction, admin, and private chat tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: GROUPS & RATES
        // ============================================================
        db.execute_unprepared(GROUPS_SQL).await?;
        db.execute_unprepared(GROUP_COUNTRY_RATES_SQL).await?;

        // ============================================================
        // PART 2: TRANSACTIONS
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 3: ADMINS & PRIVATE CHATS
        // ============================================================
        db.execute_unprepared(ADMINS_SQL).await?;
        db.execute_unprepared(PRIVATE_CHAT_USERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const GROUPS_SQL: &str = r"
CREATE TABLE groups (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    in_rate NUMERIC NOT NULL DEFAULT 0 CHECK (in_rate >= 0),
    in_fx NUMERIC NOT NULL DEFAULT 0 CHECK (in_fx >= 0),
    out_rate NUMERIC NOT NULL DEFAULT 0 CHECK (out_rate >= 0),
    out_fx NUMERIC NOT NULL DEFAULT 0 CHECK (out_fx >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const GROUP_COUNTRY_RATES_SQL: &str = r"
CREATE TABLE group_country_rates (
    group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    country TEXT NOT NULL,
    in_rate NUMERIC CHECK (in_rate >= 0),
    in_fx NUMERIC CHECK (in_fx >= 0),
    out_rate NUMERIC CHECK (out_rate >= 0),
    out_fx NUMERIC CHECK (out_fx >= 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (group_id, country)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK (kind IN ('deposit', 'withdrawal', 'disbursement')),
    amount NUMERIC NOT NULL CHECK (amount > 0),
    rate NUMERIC NOT NULL,
    fx NUMERIC NOT NULL,
    settlement NUMERIC(28, 2) NOT NULL,
    country TEXT NOT NULL,
    local_time VARCHAR(5) NOT NULL,
    correlation_id BIGINT,
    operator_id BIGINT NOT NULL,
    operator_name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_txn_group_created ON transactions(group_id, created_at);
CREATE INDEX idx_txn_group_kind ON transactions(group_id, kind, id DESC);
CREATE UNIQUE INDEX idx_txn_group_correlation
    ON transactions(group_id, correlation_id)
    WHERE correlation_id IS NOT NULL;
";

const ADMINS_SQL: &str = r"
CREATE TABLE admins (
    user_id BIGINT PRIMARY KEY,
    username TEXT,
    display_name TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PRIVATE_CHAT_USERS_SQL: &str = r"
CREATE TABLE private_chat_users (
    user_id BIGINT PRIMARY KEY,
    username TEXT,
    display_name TEXT,
    last_message_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS private_chat_users;
DROP TABLE IF EXISTS admins;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS group_country_rates;
DROP TABLE IF EXISTS groups;
";
