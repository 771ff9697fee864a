//! Chat message rendering.
//!
//! Everything the bot says back in a chat is produced here, so wording and
//! layout stay in one place.

use std::fmt::Write as _;

use tally_shared::types::{format_amount, format_usdt, to_superscript};

use crate::admin::Admin;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{ClearSummary, Transaction, TransactionKind};
use crate::query::QueryResult;
use crate::rates::{Group, GroupRateConfig};

/// Rows shown per section in the compact summary.
pub const COMPACT_ROWS: usize = 5;

const RULE: &str = "━━━━━━━━━━━━━━";

/// Stands in for the bill when it cannot be computed after a record.
pub const SUMMARY_UNAVAILABLE: &str = "⚠️ 账单汇总暂时无法生成，请稍后发送「+0」查看";

/// One transaction line: `HH:MM raw  ʳᵃᵗᵉ/ fx = settlement`, or
/// `HH:MM settlement` for disbursements.
#[must_use]
pub fn transaction_line(tx: &Transaction) -> String {
    match tx.kind {
        TransactionKind::Disbursement => format!("{} {:.2}", tx.timestamp, tx.settlement),
        TransactionKind::Deposit | TransactionKind::Withdrawal => format!(
            "{} {}  {}/ {} = {:.2}",
            tx.timestamp,
            format_amount(tx.amount),
            to_superscript(format_amount(tx.rate)),
            format_amount(tx.fx),
            tx.settlement
        ),
    }
}

/// Today's bill: the three sections, then the rate and balance footer.
///
/// The compact form lists the newest [`COMPACT_ROWS`] per section and ends
/// with a hint pointing at the full form.
#[must_use]
pub fn summary(bot_name: &str, result: &QueryResult, group: &Group, full: bool) -> String {
    let limit = if full { usize::MAX } else { COMPACT_ROWS };
    let title = if full { "完整账单" } else { "账单汇总" };
    let stats = &result.statistics;

    let mut out = format!("【{bot_name} {title}】\n\n");
    for (kind, heading, count) in [
        (TransactionKind::Deposit, "已入账", stats.deposits.count),
        (TransactionKind::Withdrawal, "已出账", stats.withdrawals.count),
        (TransactionKind::Disbursement, "已下发", stats.disbursements.count),
    ] {
        if kind == TransactionKind::Disbursement && count == 0 {
            continue;
        }
        let _ = writeln!(out, "{heading} ({count}笔)");
        for tx in result
            .records
            .iter()
            .filter(|t| t.kind == kind)
            .take(limit)
        {
            let _ = writeln!(out, "{}", transaction_line(tx));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "⚙️ 当前费率：入 {}% ⇄ 出 {}%",
        format_amount(group.in_rate),
        format_amount(group.out_rate)
    );
    let _ = writeln!(
        out,
        "💱 固定汇率：入 {} ⇄ 出 {}",
        format_amount(group.in_fx),
        format_amount(group.out_fx)
    );
    let _ = writeln!(out, "📊 应下发：{}", format_usdt(stats.due));
    let _ = writeln!(out, "📤 已下发：{}", format_usdt(stats.disbursements.settlement));
    let marker = if stats.pending_to_disburse.is_zero() {
        "✅"
    } else {
        "❗"
    };
    let _ = writeln!(
        out,
        "{marker} 未下发：{}",
        format_usdt(stats.pending_to_disburse)
    );
    out.push_str(RULE);
    if !full {
        out.push_str("\n📚 **查看更多记录**：发送「更多记录」");
    }
    out
}

/// Confirmation for a fresh record, followed by the compact summary.
///
/// This is the message whose id becomes the record's correlation id.
#[must_use]
pub fn recorded(tx: &Transaction, summary: &str) -> String {
    let country = if tx.country == crate::ledger::types::DEFAULT_COUNTRY {
        String::new()
    } else {
        format!(" / {}", tx.country)
    };
    format!(
        "✅ 已记录{}{country}\n{}\n\n{summary}",
        tx.kind.label(),
        transaction_line(tx)
    )
}

/// Confirmation for an undo or rollback.
#[must_use]
pub fn undone(tx: &Transaction) -> String {
    format!("↩️ 已撤销{}：{}", tx.kind.label(), transaction_line(tx))
}

/// Confirmation for a bulk clear.
#[must_use]
pub fn cleared(summary: &ClearSummary) -> String {
    if summary.count == 0 {
        return "🧹 今日没有需要清除的记录".to_string();
    }
    format!(
        "🧹 已清除今日数据 {} 笔\n入金 {} 笔 / 出金 {} 笔 / 下发 {} 笔\n合计：{}",
        summary.count,
        summary.deposits.count,
        summary.withdrawals.count,
        summary.disbursements.count,
        format_usdt(summary.total_settlement)
    )
}

/// Group defaults plus every country override (`当前点位`).
#[must_use]
pub fn current_rates(config: &GroupRateConfig) -> String {
    let group = &config.group;
    let mut out = format!(
        "⚙️ 当前点位\n入金：费率 {}% / 汇率 {}\n出金：费率 {}% / 汇率 {}",
        format_amount(group.in_rate),
        format_amount(group.in_fx),
        format_amount(group.out_rate),
        format_amount(group.out_fx)
    );
    let field = |v: Option<rust_decimal::Decimal>| {
        v.map_or_else(|| "默认".to_string(), format_amount)
    };
    for ov in &config.countries {
        let _ = write!(
            out,
            "\n\n🌍 {}\n入金：费率 {} / 汇率 {}\n出金：费率 {} / 汇率 {}",
            ov.country,
            field(ov.in_rate),
            field(ov.in_fx),
            field(ov.out_rate),
            field(ov.out_fx)
        );
    }
    out
}

/// The owner and admin list (`显示管理员`).
#[must_use]
pub fn admins(admins: &[Admin]) -> String {
    if admins.is_empty() {
        return "👥 暂无管理员".to_string();
    }
    let mut out = String::from("👥 管理员列表");
    for admin in admins {
        let _ = write!(out, "\n• {}", admin.user_id);
        let name = admin
            .username
            .as_deref()
            .map(|u| format!("@{u}"))
            .or_else(|| admin.display_name.clone());
        if let Some(name) = name {
            let _ = write!(out, " {name}");
        }
        if admin.is_owner {
            out.push_str(" （所有者）");
        }
    }
    out
}

/// Help text; admins see the full command set.
#[must_use]
pub fn help(private: bool, authorized: bool) -> &'static str {
    match (private, authorized) {
        (true, false) => {
            "👋 你好！欢迎使用财务记账机器人\n\n\
             第1步：把机器人拉进群\n\
             第2步：在群里发一条消息\n\
             第3步：让现有管理员回复你的消息并发送「设置管理员」\n\
             然后就可以使用 +10000 / -10000 / 下发 等功能了。"
        }
        _ => {
            "🤖 你好，我是财务记账机器人。\n\n\
             📊 记账操作：\n\
             \u{20}\u{20}入金：+10000 或 +10000 / 日本\n\
             \u{20}\u{20}出金：-10000 或 -10000 / 日本\n\
             \u{20}\u{20}+1千 / +2万 也可以\n\
             \u{20}\u{20}查看账单：+0 或 更多记录\n\n\
             💰 USDT下发：下发35.04\n\
             🔄 撤销：撤销入金 / 撤销出金 / 撤销下发（回复确认消息可撤销指定记录）\n\
             🧹 清空：清除数据 / 清空数据 / 清空账单\n\n\
             ⚙️ 快速设置：\n\
             \u{20}\u{20}重置默认值 / 当前点位\n\
             \u{20}\u{20}设置入金费率 10   设置入金汇率 153\n\
             \u{20}\u{20}设置出金费率 2    设置出金汇率 137\n\
             \u{20}\u{20}设置入金汇率 5 / 日本   删除国家设置 日本\n\n\
             👥 管理员管理：设置管理员 / 删除管理员 / 显示管理员"
        }
    }
}

/// Chat wording for a failed command.
#[must_use]
pub fn error(err: &LedgerError) -> String {
    match err {
        LedgerError::Permission(_) => "⛔ 你不是管理员，无权执行此操作".to_string(),
        LedgerError::OwnerOnly => "⛔ 仅机器人所有者可执行此操作".to_string(),
        LedgerError::OwnerImmutable => "⛔ 不能删除机器人所有者".to_string(),
        LedgerError::AdminNotFound(_) => "该用户不是管理员".to_string(),
        LedgerError::UnconfiguredRate { direction, country } => {
            let side = if *direction == "deposit" { "入金" } else { "出金" };
            format!("⚠️ {country} 尚未设置{side}费率和汇率，请先使用「设置{side}汇率」")
        }
        LedgerError::Configuration(msg) => format!("⚠️ 汇率配置无效：{msg}"),
        LedgerError::Validation(msg) => format!("❌ 输入无效：{msg}"),
        LedgerError::NegativeRate(_) => "❌ 费率和汇率不能为负数".to_string(),
        LedgerError::CorrelationNotFound { .. } | LedgerError::TransactionNotFound(_) => {
            "没有找到可撤销的记录（可能已被撤销）".to_string()
        }
        LedgerError::NothingToUndo(label) => format!("今日没有可撤销的{label}记录"),
        LedgerError::CountryNotFound(country) => format!("未找到国家设置：{country}"),
        LedgerError::CorrelationConflict(_) => "⚠️ 该记录已绑定确认消息".to_string(),
        LedgerError::Storage(_) | LedgerError::Internal(_) => {
            "⚠️ 系统繁忙，请稍后再试".to_string()
        }
    }
}
