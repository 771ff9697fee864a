//! Chat command model.
//!
//! Free-form chat text is turned into a [`Command`] by [`CommandParser`];
//! nothing past this module ever looks at raw text.

mod parser;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::types::{Direction, TransactionKind};

pub use parser::CommandParser;

/// Which half of a rate pair a command sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateField {
    /// Fee rate in percent (`费率`).
    Fee,
    /// Exchange rate (`汇率`).
    ExchangeRate,
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `+1000`, `+2万`, `+1000 / 日本`
    Deposit {
        /// Raw amount, units applied.
        amount: Decimal,
        /// Country suffix.
        country: Option<String>,
    },
    /// `-1000`, `-1千 / 日本`
    Withdrawal {
        /// Raw amount, units applied.
        amount: Decimal,
        /// Country suffix.
        country: Option<String>,
    },
    /// `下发35.04`
    Disbursement {
        /// Settlement amount handed over; may be negative as typed.
        amount: Decimal,
    },
    /// `设置入金费率 10`, `设置出金汇率 137 / 日本`
    SetRate {
        /// Deposit or withdrawal side.
        direction: Direction,
        /// Fee or exchange rate.
        field: RateField,
        /// New value; may be negative as typed.
        value: Decimal,
        /// Country override target, if any.
        country: Option<String>,
    },
    /// `重置默认值`
    ResetRates,
    /// `当前点位`: group defaults and country overrides.
    CurrentRates,
    /// `删除国家设置 日本`
    ClearCountryRate {
        /// Country label.
        country: String,
    },
    /// `撤销入金` / `撤销出金` / `撤销下发`; targets the replied-to
    /// confirmation when there is one, otherwise the newest of the kind.
    Undo {
        /// Kind to undo.
        kind: TransactionKind,
    },
    /// `清除数据` and its variants: clears today's records.
    ClearData,
    /// `+0` (latest five per section) or `更多记录` (everything).
    Query {
        /// Full listing instead of the compact one.
        full: bool,
    },
    /// `设置管理员`, in reply to the user to promote.
    AddAdmin,
    /// `删除管理员`, in reply to the admin to demote.
    RemoveAdmin,
    /// `显示管理员`
    ListAdmins,
    /// `广播 <text>`, owner only, private chat only.
    Broadcast {
        /// Message to fan out.
        text: String,
    },
    /// `/start`, `/help`, `帮助`
    Help,
    /// A recognised command whose number cannot be represented.
    Invalid {
        /// What was wrong, for the reply.
        reason: String,
    },
}

impl Command {
    /// True for commands that change the ledger, rates, or admin set.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::Query { .. }
                | Self::CurrentRates
                | Self::ListAdmins
                | Self::Help
                | Self::Invalid { .. }
        )
    }
}
