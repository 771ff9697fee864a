//! Chat text parser.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

use super::{Command, RateField};
use crate::ledger::types::{Direction, TransactionKind};

const CLEAR_DATA_WORDS: [&str; 4] = ["清除数据", "清空数据", "清空账单", "清楚数据"];

/// Compiled patterns for every command with arguments.
#[derive(Debug, Clone)]
pub struct CommandParser {
    entry: Regex,
    disbursement: Regex,
    set_rate: Regex,
    clear_country: Regex,
    broadcast: Regex,
}

impl CommandParser {
    /// Compiles the command patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // +1000 | -2万 | +1000 / 日本
            entry: Regex::new(
                r"^(?P<sign>[+\-])\s*(?P<num>[0-9]+(?:\.[0-9]+)?)(?P<unit>[万千]?)\s*(?:/\s*(?P<country>\S+))?$",
            )?,
            // 下发35.04 | 下发 -35.04
            disbursement: Regex::new(r"^下发\s*(?P<num>-?[0-9]+(?:\.[0-9]+)?)$")?,
            // 设置入金费率 10 | 设置出金汇率 137 / 日本
            set_rate: Regex::new(
                r"^设置(?P<dir>入金|出金)(?P<field>费率|汇率)\s*(?P<num>-?[0-9]+(?:\.[0-9]+)?)\s*(?:/\s*(?P<country>\S+))?$",
            )?,
            clear_country: Regex::new(r"^删除国家设置\s*(?P<country>\S+)$")?,
            broadcast: Regex::new(r"(?s)^广播\s+(?P<text>.+)$")?,
        })
    }

    /// Parses one chat message. Returns `None` for ordinary chatter.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<Command> {
        let text = text.trim();

        match text {
            "+0" => return Some(Command::Query { full: false }),
            "更多记录" => return Some(Command::Query { full: true }),
            "重置默认值" => return Some(Command::ResetRates),
            "当前点位" => return Some(Command::CurrentRates),
            "撤销入金" => return Some(Command::Undo { kind: TransactionKind::Deposit }),
            "撤销出金" => return Some(Command::Undo { kind: TransactionKind::Withdrawal }),
            "撤销下发" => return Some(Command::Undo { kind: TransactionKind::Disbursement }),
            "设置管理员" => return Some(Command::AddAdmin),
            "删除管理员" => return Some(Command::RemoveAdmin),
            "显示管理员" => return Some(Command::ListAdmins),
            "/start" | "/help" | "帮助" => return Some(Command::Help),
            t if CLEAR_DATA_WORDS.contains(&t) => return Some(Command::ClearData),
            _ => {}
        }

        if let Some(caps) = self.entry.captures(text) {
            let unit = caps.name("unit").map_or("", |m| m.as_str());
            let Some(amount) = number(&caps["num"]).and_then(|n| apply_unit(n, unit)) else {
                return Some(out_of_range(&caps["num"]));
            };
            let country = caps.name("country").map(|m| m.as_str().to_string());
            return Some(if &caps["sign"] == "+" {
                Command::Deposit { amount, country }
            } else {
                Command::Withdrawal { amount, country }
            });
        }

        if let Some(caps) = self.disbursement.captures(text) {
            return Some(match number(&caps["num"]) {
                Some(amount) => Command::Disbursement { amount },
                None => out_of_range(&caps["num"]),
            });
        }

        if let Some(caps) = self.set_rate.captures(text) {
            let Some(value) = number(&caps["num"]) else {
                return Some(out_of_range(&caps["num"]));
            };
            let direction = if &caps["dir"] == "入金" {
                Direction::In
            } else {
                Direction::Out
            };
            let field = if &caps["field"] == "费率" {
                RateField::Fee
            } else {
                RateField::ExchangeRate
            };
            return Some(Command::SetRate {
                direction,
                field,
                value,
                country: caps.name("country").map(|m| m.as_str().to_string()),
            });
        }

        if let Some(caps) = self.clear_country.captures(text) {
            return Some(Command::ClearCountryRate {
                country: caps["country"].to_string(),
            });
        }

        if let Some(caps) = self.broadcast.captures(text) {
            return Some(Command::Broadcast {
                text: caps["text"].trim().to_string(),
            });
        }

        None
    }
}

fn number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw).ok()
}

fn out_of_range(raw: &str) -> Command {
    Command::Invalid {
        reason: format!("数字超出范围：{raw}"),
    }
}

/// `千` multiplies by 1 000, `万` by 10 000.
fn apply_unit(amount: Decimal, unit: &str) -> Option<Decimal> {
    match unit {
        "千" => amount.checked_mul(Decimal::from(1_000)),
        "万" => amount.checked_mul(Decimal::from(10_000)),
        _ => Some(amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn parse(text: &str) -> Option<Command> {
        CommandParser::new().unwrap().parse(text)
    }

    #[rstest]
    #[case("+1000", dec!(1000), None)]
    #[case("+ 1000", dec!(1000), None)]
    #[case("+1千", dec!(1000), None)]
    #[case("+2万", dec!(20000), None)]
    #[case("+1.5万", dec!(15000), None)]
    #[case("+130 / 日本", dec!(130), Some("日本"))]
    #[case("+130/日本", dec!(130), Some("日本"))]
    fn test_deposit(
        #[case] text: &str,
        #[case] amount: Decimal,
        #[case] country: Option<&str>,
    ) {
        assert_eq!(
            parse(text),
            Some(Command::Deposit {
                amount,
                country: country.map(str::to_string),
            })
        );
    }

    #[test]
    fn test_withdrawal() {
        assert_eq!(
            parse("-10000 / 日本"),
            Some(Command::Withdrawal {
                amount: dec!(10000),
                country: Some("日本".to_string()),
            })
        );
    }

    #[test]
    fn test_zero_is_summary_not_deposit() {
        assert_eq!(parse("+0"), Some(Command::Query { full: false }));
        assert_eq!(parse(" 更多记录 "), Some(Command::Query { full: true }));
    }

    #[test]
    fn test_disbursement() {
        assert_eq!(
            parse("下发35.04"),
            Some(Command::Disbursement { amount: dec!(35.04) })
        );
        assert_eq!(
            parse("下发 -35.04"),
            Some(Command::Disbursement { amount: dec!(-35.04) })
        );
    }

    #[rstest]
    #[case("设置入金费率 10", Direction::In, RateField::Fee, dec!(10), None)]
    #[case("设置入金汇率 153", Direction::In, RateField::ExchangeRate, dec!(153), None)]
    #[case("设置出金费率 2", Direction::Out, RateField::Fee, dec!(2), None)]
    #[case("设置出金汇率137", Direction::Out, RateField::ExchangeRate, dec!(137), None)]
    #[case("设置入金汇率 5 / 日本", Direction::In, RateField::ExchangeRate, dec!(5), Some("日本"))]
    fn test_set_rate(
        #[case] text: &str,
        #[case] direction: Direction,
        #[case] field: RateField,
        #[case] value: Decimal,
        #[case] country: Option<&str>,
    ) {
        assert_eq!(
            parse(text),
            Some(Command::SetRate {
                direction,
                field,
                value,
                country: country.map(str::to_string),
            })
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("重置默认值"), Some(Command::ResetRates));
        assert_eq!(parse("当前点位"), Some(Command::CurrentRates));
        assert_eq!(
            parse("撤销出金"),
            Some(Command::Undo {
                kind: TransactionKind::Withdrawal
            })
        );
        for word in CLEAR_DATA_WORDS {
            assert_eq!(parse(word), Some(Command::ClearData));
        }
        assert_eq!(parse("设置管理员"), Some(Command::AddAdmin));
        assert_eq!(parse("显示管理员"), Some(Command::ListAdmins));
        assert_eq!(parse("/start"), Some(Command::Help));
        assert_eq!(
            parse("删除国家设置 日本"),
            Some(Command::ClearCountryRate {
                country: "日本".to_string()
            })
        );
    }

    #[test]
    fn test_broadcast_keeps_newlines() {
        assert_eq!(
            parse("广播 今晚维护\n请提前结算"),
            Some(Command::Broadcast {
                text: "今晚维护\n请提前结算".to_string()
            })
        );
    }

    #[rstest]
    #[case("+999999999999999999999999999999999")]
    #[case("-9999999999999999999999999万")]
    #[case("下发999999999999999999999999999999999")]
    #[case("设置入金汇率 999999999999999999999999999999999")]
    fn test_unrepresentable_numbers_are_reported(#[case] text: &str) {
        assert!(matches!(parse(text), Some(Command::Invalid { .. })));
    }

    #[rstest]
    #[case("hello")]
    #[case("+abc")]
    #[case("1000")]
    #[case("+1000 / 日本 多余")]
    #[case("下发")]
    #[case("广播")]
    fn test_chatter_is_ignored(#[case] text: &str) {
        assert_eq!(parse(text), None);
    }
}
