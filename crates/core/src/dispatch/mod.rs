//! Chat command dispatch.
//!
//! [`CommandDispatcher`] takes one inbound chat message, runs the command it
//! carries against the engine, and produces the text to send back. Sending
//! is left to the caller; after a record's confirmation has been delivered
//! the caller attaches the delivered message id with
//! [`LedgerEngine::attach_correlation`].

pub mod render;

use serde::{Deserialize, Serialize};
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};
use tracing::{debug, error, info, warn};

use crate::admin::ChatUser;
use crate::command::{Command, CommandParser, RateField};
use crate::ledger::engine::LedgerEngine;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{DEFAULT_COUNTRY, Operator, TransactionKind};
use crate::rates::RatePatch;

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// Group or supergroup; has a ledger.
    Group,
    /// One-to-one chat with the bot.
    Private,
}

/// The message an inbound message replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    /// Id of the replied-to message.
    pub message_id: MessageId,
    /// Author of the replied-to message.
    pub from: Option<ChatUser>,
}

/// One chat message as delivered by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat id; the group id for group chats.
    pub chat_id: GroupId,
    /// Group title, if any.
    #[serde(default)]
    pub chat_title: Option<String>,
    /// Group or private.
    pub chat_kind: ChatKind,
    /// Author.
    pub sender: ChatUser,
    /// Message text or caption.
    pub text: String,
    /// Replied-to message, if any.
    #[serde(default)]
    pub reply_to: Option<ReplyTarget>,
}

/// A message to fan out to private chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Broadcast {
    /// Text to send.
    pub text: String,
    /// Private chat users to send it to.
    pub recipients: Vec<UserId>,
}

/// What to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Reply text for the originating chat.
    pub text: String,
    /// Record awaiting its confirmation message id.
    pub pending_transaction: Option<TransactionId>,
    /// Fan-out requested by `广播`.
    pub broadcast: Option<Broadcast>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pending_transaction: None,
            broadcast: None,
        }
    }
}

/// The acting user of a chat message.
fn operator_of(user: &ChatUser) -> Operator {
    let name = user
        .display_name
        .clone()
        .or_else(|| user.username.clone())
        .unwrap_or_else(|| user.id.to_string());
    Operator::new(user.id, name)
}

/// Parses and executes chat commands.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    engine: LedgerEngine,
    parser: CommandParser,
    bot_name: String,
}

impl CommandDispatcher {
    /// Creates a dispatcher over an engine.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the command patterns fail to compile.
    pub fn new(engine: LedgerEngine, bot_name: impl Into<String>) -> Result<Self, LedgerError> {
        let parser = CommandParser::new().map_err(|e| LedgerError::Internal(e.to_string()))?;
        Ok(Self {
            engine,
            parser,
            bot_name: bot_name.into(),
        })
    }

    /// The engine commands run against.
    #[must_use]
    pub const fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Handles one message. Returns `None` for ordinary chatter.
    ///
    /// Command failures are rendered into the reply rather than returned.
    pub async fn handle(&self, message: &InboundMessage) -> Option<Reply> {
        if message.chat_kind == ChatKind::Private {
            if let Err(e) = self
                .engine
                .admins()
                .touch_private_user(message.sender.clone())
                .await
            {
                warn!(user_id = %message.sender.id, error = %e, "failed to remember private user");
            }
        }

        let command = self.parser.parse(&message.text)?;
        debug!(chat_id = %message.chat_id, user_id = %message.sender.id, ?command, "command parsed");

        let result = match message.chat_kind {
            ChatKind::Group => self.execute_group(message, command).await,
            ChatKind::Private => self.execute_private(message, command).await,
        };
        Some(result.unwrap_or_else(|e| {
            if e.is_retryable() {
                error!(chat_id = %message.chat_id, error = %e, "command failed");
            } else {
                info!(chat_id = %message.chat_id, code = e.error_code(), "command rejected");
            }
            Reply::text(render::error(&e))
        }))
    }

    async fn execute_private(
        &self,
        message: &InboundMessage,
        command: Command,
    ) -> Result<Reply, LedgerError> {
        let admins = self.engine.admins();
        let operator = operator_of(&message.sender);
        match command {
            Command::Help => {
                let authorized = admins.is_authorized(operator.id).await?;
                Ok(Reply::text(render::help(true, authorized)))
            }
            Command::ListAdmins => Ok(Reply::text(render::admins(&admins.list().await?))),
            Command::Broadcast { text } => {
                admins.require_owner(&operator)?;
                let recipients = admins.broadcast_recipients(operator.id).await?;
                info!(
                    target: "audit",
                    operator_id = %operator.id,
                    recipients = recipients.len(),
                    "broadcast requested"
                );
                Ok(Reply {
                    text: format!("📢 广播已发送给 {} 位用户", recipients.len()),
                    pending_transaction: None,
                    broadcast: Some(Broadcast { text, recipients }),
                })
            }
            Command::Invalid { reason } => Err(LedgerError::validation(reason)),
            _ => Ok(Reply::text("请在群组中使用记账命令")),
        }
    }

    async fn execute_group(
        &self,
        message: &InboundMessage,
        command: Command,
    ) -> Result<Reply, LedgerError> {
        let group_id = message.chat_id;
        let operator = operator_of(&message.sender);
        let admins = self.engine.admins();
        let rates = self.engine.rates();

        if command.is_mutating() && !matches!(command, Command::Broadcast { .. }) {
            admins.require_authorized(&operator).await?;
        }
        rates
            .ensure_group(group_id, message.chat_title.as_deref().unwrap_or_default())
            .await?;

        match command {
            Command::Deposit { amount, country } => {
                self.record(group_id, TransactionKind::Deposit, amount, country, &operator)
                    .await
            }
            Command::Withdrawal { amount, country } => {
                self.record(group_id, TransactionKind::Withdrawal, amount, country, &operator)
                    .await
            }
            Command::Disbursement { amount } => {
                self.record(group_id, TransactionKind::Disbursement, amount, None, &operator)
                    .await
            }
            Command::SetRate {
                direction,
                field,
                value,
                country,
            } => {
                let patch = match field {
                    RateField::Fee => RatePatch::fee(value),
                    RateField::ExchangeRate => RatePatch::fx(value),
                };
                match country.as_deref().filter(|c| *c != DEFAULT_COUNTRY) {
                    Some(country) => {
                        rates
                            .set_country_rate(group_id, country, direction, patch)
                            .await?;
                    }
                    None => {
                        rates.set_rate(group_id, direction, patch).await?;
                    }
                }
                let config = rates.config(group_id).await?;
                Ok(Reply::text(format!(
                    "✅ 设置成功\n\n{}",
                    render::current_rates(&config)
                )))
            }
            Command::ResetRates => {
                rates.reset_defaults(group_id).await?;
                Ok(Reply::text("✅ 已重置为默认值，请重新设置费率和汇率"))
            }
            Command::CurrentRates => Ok(Reply::text(render::current_rates(
                &rates.config(group_id).await?,
            ))),
            Command::ClearCountryRate { country } => {
                rates.clear_country_rate(group_id, &country).await?;
                Ok(Reply::text(format!("✅ 已删除国家设置：{country}")))
            }
            Command::Undo { kind } => {
                let tx = match &message.reply_to {
                    Some(target) => {
                        self.engine
                            .rollback(group_id, target.message_id, &operator)
                            .await?
                    }
                    None => self.engine.undo_latest(group_id, kind, &operator).await?,
                };
                Ok(Reply::text(render::undone(&tx)))
            }
            Command::ClearData => {
                let today = self.engine.today();
                let (from, to) = self.engine.day_range(today, today);
                let summary = self
                    .engine
                    .clear_range(group_id, from, to, &operator)
                    .await?;
                Ok(Reply::text(render::cleared(&summary)))
            }
            Command::Query { full } => Ok(Reply::text(self.summary(group_id, full).await?)),
            Command::AddAdmin => {
                let Some(user) = message.reply_to.as_ref().and_then(|t| t.from.clone()) else {
                    return Ok(Reply::text("请回复要设置为管理员的用户消息"));
                };
                let user_id = user.id;
                let added = admins.add_admin(&operator, user).await?;
                Ok(Reply::text(if added {
                    format!("✅ 已将 {user_id} 设置为管理员")
                } else {
                    format!("{user_id} 已经是管理员")
                }))
            }
            Command::RemoveAdmin => {
                let Some(user) = message.reply_to.as_ref().and_then(|t| t.from.as_ref()) else {
                    return Ok(Reply::text("请回复要删除的管理员消息"));
                };
                admins.remove_admin(&operator, user.id).await?;
                Ok(Reply::text(format!("✅ 已删除管理员 {}", user.id)))
            }
            Command::ListAdmins => Ok(Reply::text(render::admins(&admins.list().await?))),
            Command::Broadcast { .. } => Ok(Reply::text("请私聊机器人使用广播")),
            Command::Help => {
                let authorized = admins.is_authorized(operator.id).await?;
                Ok(Reply::text(render::help(false, authorized)))
            }
            Command::Invalid { reason } => Err(LedgerError::validation(reason)),
        }
    }

    async fn record(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
        amount: rust_decimal::Decimal,
        country: Option<String>,
        operator: &Operator,
    ) -> Result<Reply, LedgerError> {
        let tx = self
            .engine
            .record(group_id, kind, amount, country.as_deref(), operator)
            .await?;
        // The record is stored; a failing summary must not hide its confirmation.
        let summary = match self.summary(group_id, false).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(group_id = %group_id, transaction_id = %tx.id, error = %e, "summary unavailable");
                render::SUMMARY_UNAVAILABLE.to_string()
            }
        };
        Ok(Reply {
            text: render::recorded(&tx, &summary),
            pending_transaction: Some(tx.id),
            broadcast: None,
        })
    }

    async fn summary(&self, group_id: GroupId, full: bool) -> Result<String, LedgerError> {
        let result = self.engine.query_today(group_id).await?;
        let group = self.engine.rates().config(group_id).await?.group;
        Ok(render::summary(&self.bot_name, &result, &group, full))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::engine::LedgerSettings;
    use crate::ledger::memory::MemoryRepository;
    use crate::ledger::repository::LedgerRepository;
    use crate::ledger::types::NewTransaction;

    const GROUP: GroupId = GroupId(-100_200);
    const OWNER: UserId = UserId(1);

    fn dispatcher() -> CommandDispatcher {
        dispatcher_over(Arc::new(MemoryRepository::new()))
    }

    fn dispatcher_over(repo: Arc<MemoryRepository>) -> CommandDispatcher {
        let engine = LedgerEngine::new(
            repo,
            LedgerSettings {
                owner_id: Some(OWNER),
                ..LedgerSettings::default()
            },
        );
        CommandDispatcher::new(engine, "记账").unwrap()
    }

    fn user(id: i64) -> ChatUser {
        ChatUser {
            id: UserId(id),
            username: Some(format!("user{id}")),
            display_name: None,
        }
    }

    fn group_message(from: i64, text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: GROUP,
            chat_title: Some("结算群".to_string()),
            chat_kind: ChatKind::Group,
            sender: user(from),
            text: text.to_string(),
            reply_to: None,
        }
    }

    fn replying(mut message: InboundMessage, message_id: i64, from: Option<i64>) -> InboundMessage {
        message.reply_to = Some(ReplyTarget {
            message_id: MessageId(message_id),
            from: from.map(user),
        });
        message
    }

    async fn send(d: &CommandDispatcher, message: InboundMessage) -> Reply {
        d.handle(&message).await.unwrap()
    }

    async fn configure(d: &CommandDispatcher) {
        for text in ["设置入金费率 10", "设置入金汇率 153", "设置出金费率 2", "设置出金汇率 137"] {
            let reply = send(d, group_message(1, text)).await;
            assert!(reply.text.starts_with("✅ 设置成功"), "{}", reply.text);
        }
    }

    #[tokio::test]
    async fn test_chatter_gets_no_reply() {
        let d = dispatcher();
        assert!(d.handle(&group_message(1, "早上好")).await.is_none());
    }

    #[tokio::test]
    async fn test_record_and_undo_by_reply() {
        let d = dispatcher();
        configure(&d).await;

        let reply = send(&d, group_message(1, "+1000")).await;
        assert!(reply.text.starts_with("✅ 已记录入金\n"));
        assert!(reply.text.contains("1000  ¹⁰/ 153 = 5.88"));
        assert!(reply.text.contains("❗ 未下发：5.88 USDT"));
        let tx_id = reply.pending_transaction.unwrap();

        d.engine()
            .attach_correlation(tx_id, MessageId(77))
            .await
            .unwrap();

        let reply = send(&d, replying(group_message(1, "撤销入金"), 77, None)).await;
        assert!(reply.text.starts_with("↩️ 已撤销入金"));

        let reply = send(&d, group_message(1, "+0")).await;
        assert!(reply.text.contains("已入账 (0笔)"));
        assert!(reply.text.contains("✅ 未下发：0.00 USDT"));

        // The same confirmation cannot be undone twice.
        let reply = send(&d, replying(group_message(1, "撤销入金"), 77, None)).await;
        assert!(reply.text.contains("没有找到可撤销的记录"));
    }

    #[tokio::test]
    async fn test_undo_without_reply_takes_latest_of_kind() {
        let d = dispatcher();
        configure(&d).await;
        send(&d, group_message(1, "-10000")).await;
        send(&d, group_message(1, "+1000")).await;

        let reply = send(&d, group_message(1, "撤销出金")).await;
        assert!(reply.text.contains("74.45"), "{}", reply.text);
        let reply = send(&d, group_message(1, "撤销出金")).await;
        assert!(reply.text.contains("没有可撤销的出金"));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_record_but_can_query() {
        let d = dispatcher();
        configure(&d).await;

        let reply = send(&d, group_message(42, "+1000")).await;
        assert!(reply.text.contains("无权"));
        assert!(reply.pending_transaction.is_none());

        let reply = send(&d, group_message(42, "更多记录")).await;
        assert!(reply.text.starts_with("【记账 完整账单】"));
    }

    #[tokio::test]
    async fn test_promoted_admin_can_record() {
        let d = dispatcher();
        configure(&d).await;

        let reply = send(&d, replying(group_message(1, "设置管理员"), 5, Some(42))).await;
        assert!(reply.text.contains("设置为管理员"));

        let reply = send(&d, group_message(42, "下发35.04")).await;
        assert!(reply.text.starts_with("✅ 已记录下发"));

        let reply = send(&d, group_message(1, "显示管理员")).await;
        assert!(reply.text.contains("@user42"));

        let reply = send(&d, replying(group_message(42, "删除管理员"), 6, Some(1))).await;
        assert!(reply.text.contains("不能删除机器人所有者"));
    }

    #[tokio::test]
    async fn test_country_rates() {
        let d = dispatcher();
        configure(&d).await;

        send(&d, group_message(1, "设置入金汇率 5 / 日本")).await;
        let reply = send(&d, group_message(1, "+100 / 日本")).await;
        assert!(reply.text.starts_with("✅ 已记录入金 / 日本"));
        assert!(reply.text.contains("100  ¹⁰/ 5 = 18.00"), "{}", reply.text);

        let reply = send(&d, group_message(1, "删除国家设置 日本")).await;
        assert!(reply.text.contains("已删除国家设置"));
        let reply = send(&d, group_message(1, "删除国家设置 日本")).await;
        assert!(reply.text.contains("未找到国家设置"));
    }

    #[tokio::test]
    async fn test_unconfigured_group_refuses_deposit() {
        let d = dispatcher();
        let reply = send(&d, group_message(1, "+1000")).await;
        assert!(reply.text.contains("尚未设置入金费率"));
        assert!(reply.pending_transaction.is_none());
    }

    #[tokio::test]
    async fn test_clear_data_clears_today() {
        let d = dispatcher();
        configure(&d).await;
        send(&d, group_message(1, "+1000")).await;
        send(&d, group_message(1, "+1000")).await;

        let reply = send(&d, group_message(1, "清空账单")).await;
        assert!(reply.text.contains("已清除今日数据 2 笔"));
        assert!(reply.text.contains("11.76 USDT"));
    }

    #[tokio::test]
    async fn test_private_broadcast_is_owner_only() {
        let d = dispatcher();
        let private = |from: i64, text: &str| InboundMessage {
            chat_id: GroupId(from),
            chat_title: None,
            chat_kind: ChatKind::Private,
            sender: user(from),
            text: text.to_string(),
            reply_to: None,
        };

        assert!(d.handle(&private(7, "你好")).await.is_none());
        let reply = send(&d, private(8, "/start")).await;
        assert!(reply.text.contains("第1步"));

        let reply = send(&d, private(7, "广播 测试")).await;
        assert!(reply.text.contains("仅机器人所有者"));
        assert!(reply.broadcast.is_none());

        let reply = send(&d, private(1, "广播 今晚维护")).await;
        let broadcast = reply.broadcast.unwrap();
        assert_eq!(broadcast.text, "今晚维护");
        assert_eq!(broadcast.recipients, vec![UserId(7), UserId(8)]);

        let reply = send(&d, private(1, "+1000")).await;
        assert_eq!(reply.text, "请在群组中使用记账命令");
    }

    #[tokio::test]
    async fn test_unrepresentable_amount_gets_a_reply() {
        let d = dispatcher();
        configure(&d).await;

        let reply = send(&d, group_message(1, "+999999999999999999999999999999999")).await;
        assert!(reply.text.starts_with("❌ 输入无效"), "{}", reply.text);
        assert!(reply.pending_transaction.is_none());

        let reply = send(&d, group_message(1, "下发50000000000000000000000000000")).await;
        assert!(reply.text.starts_with("❌ 输入无效"), "{}", reply.text);
    }

    #[tokio::test]
    async fn test_record_is_confirmed_when_summary_fails() {
        let repo = Arc::new(MemoryRepository::new());
        let d = dispatcher_over(Arc::clone(&repo));
        configure(&d).await;

        // A legacy row whose totals cannot be summed with anything else.
        repo.insert_transaction(NewTransaction {
            group_id: GROUP,
            kind: TransactionKind::Disbursement,
            amount: rust_decimal::Decimal::MAX,
            rate: rust_decimal::Decimal::ZERO,
            fx: rust_decimal::Decimal::ZERO,
            settlement: rust_decimal::Decimal::MAX,
            country: DEFAULT_COUNTRY.to_string(),
            timestamp: "00:00".to_string(),
            operator_id: OWNER,
            operator_name: "owner".to_string(),
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

        let reply = send(&d, group_message(1, "下发1")).await;
        assert!(reply.text.starts_with("✅ 已记录下发"), "{}", reply.text);
        assert!(reply.text.contains(render::SUMMARY_UNAVAILABLE));
        assert!(reply.pending_transaction.is_some());
    }
}
