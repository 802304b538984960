//! CSV format handling for replay records and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to replay operations
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input columns
//!
//! `type,account,counterparty,amount,card,secret,memo`. Accounts are referenced
//! as `branch/number`. The meaning of the optional columns depends on the type:
//!
//! | type | account | counterparty | amount | card | secret | memo |
//! |---|---|---|---|---|---|---|
//! | `open` | new account | CPF | credit limit | | | alias |
//! | `card` | owner | `debit` / `credit` | card limit | number | PIN | network |
//! | `deposit` | target | | amount | | | |
//! | `transfer` | origin | destination | amount | | step-up token | |
//! | `card_transfer` | origin | destination | amount | number | PIN | step-up token |
//! | `pix` | origin CPF or alias | destination alias | amount | | | |
//! | `debit` | owner | | amount | number | PIN | merchant |
//! | `credit` | account | | amount | number (optional) | | merchant |
//! | `pay_invoice` | account | | amount | | | |
//! | `credit_limit` | account | | new limit | | | |
//! | `block` / `unblock` / `deactivate` | account | | | | | |

use crate::types::{Account, AccountNumber, CardKind, CardNetwork, LedgerError, Money};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Every column but `type` and `account` is optional, so rows may stop after
/// the last column their operation uses.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub account: String,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// One operation of a replay file, with accounts and cards still referenced by
/// their external keys
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOperation {
    Open {
        number: AccountNumber,
        cpf: String,
        alias: Option<String>,
        credit_limit: Option<Money>,
    },
    IssueCard {
        account: AccountNumber,
        card: String,
        kind: CardKind,
        pin: Option<String>,
        credit_limit: Option<Money>,
        network: CardNetwork,
    },
    Deposit {
        account: AccountNumber,
        amount: Money,
    },
    Transfer {
        origin: AccountNumber,
        destination: AccountNumber,
        amount: Money,
        auth_token: Option<String>,
    },
    CardTransfer {
        origin: AccountNumber,
        destination: AccountNumber,
        amount: Money,
        card: String,
        pin: String,
        auth_token: Option<String>,
    },
    Pix {
        origin: String,
        destination_alias: String,
        amount: Money,
    },
    DebitPurchase {
        account: AccountNumber,
        card: String,
        pin: String,
        amount: Money,
        merchant: String,
    },
    CreditPurchase {
        account: AccountNumber,
        card: Option<String>,
        amount: Money,
        merchant: String,
    },
    PayInvoice {
        account: AccountNumber,
        amount: Money,
    },
    CreditLimit {
        account: AccountNumber,
        limit: Money,
    },
    Block {
        account: AccountNumber,
    },
    Unblock {
        account: AccountNumber,
    },
    Deactivate {
        account: AccountNumber,
    },
}

impl ReplayOperation {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            ReplayOperation::Open { .. } => "open",
            ReplayOperation::IssueCard { .. } => "card",
            ReplayOperation::Deposit { .. } => "deposit",
            ReplayOperation::Transfer { .. } => "transfer",
            ReplayOperation::CardTransfer { .. } => "card_transfer",
            ReplayOperation::Pix { .. } => "pix",
            ReplayOperation::DebitPurchase { .. } => "debit",
            ReplayOperation::CreditPurchase { .. } => "credit",
            ReplayOperation::PayInvoice { .. } => "pay_invoice",
            ReplayOperation::CreditLimit { .. } => "credit_limit",
            ReplayOperation::Block { .. } => "block",
            ReplayOperation::Unblock { .. } => "unblock",
            ReplayOperation::Deactivate { .. } => "deactivate",
        }
    }

    /// Keys of the ledger state this operation reads or writes
    ///
    /// Two operations with disjoint keys commute. `None` means the keys cannot
    /// be known without resolving an alias, so the operation must run alone.
    pub fn keys(&self) -> Option<Vec<String>> {
        let account = |number: &AccountNumber| format!("account:{}", number);
        let identity = |key: &str| format!("identity:{}", key);
        let card = |number: &str| format!("card:{}", number);

        let keys = match self {
            ReplayOperation::Open {
                number, cpf, alias, ..
            } => {
                let mut keys = vec![account(number), identity(cpf)];
                keys.extend(alias.iter().map(|alias| identity(alias)));
                keys
            }
            ReplayOperation::IssueCard {
                account: owner,
                card: number,
                ..
            }
            | ReplayOperation::DebitPurchase {
                account: owner,
                card: number,
                ..
            } => vec![account(owner), card(number)],
            ReplayOperation::CreditPurchase {
                account: owner,
                card: number,
                ..
            } => {
                let mut keys = vec![account(owner)];
                keys.extend(number.iter().map(|number| card(number)));
                keys
            }
            ReplayOperation::Transfer {
                origin,
                destination,
                ..
            } => vec![account(origin), account(destination)],
            ReplayOperation::CardTransfer {
                origin,
                destination,
                card: number,
                ..
            } => vec![account(origin), account(destination), card(number)],
            ReplayOperation::Pix { .. } => return None,
            ReplayOperation::Deposit { account: target, .. }
            | ReplayOperation::PayInvoice { account: target, .. }
            | ReplayOperation::CreditLimit { account: target, .. }
            | ReplayOperation::Block { account: target }
            | ReplayOperation::Unblock { account: target }
            | ReplayOperation::Deactivate { account: target } => vec![account(target)],
        };

        Some(keys)
    }
}

/// A replay operation with the input line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub line: u64,
    pub operation: ReplayOperation,
}

/// Parse a `branch/number` account reference
pub fn parse_account_number(value: &str) -> Result<AccountNumber, LedgerError> {
    match value.trim().split_once('/') {
        Some((branch, number)) if !branch.trim().is_empty() && !number.trim().is_empty() => {
            Ok(AccountNumber::new(branch.trim(), number.trim()))
        }
        _ => Err(LedgerError::invalid_input(
            "account",
            &format!("expected 'branch/number', got '{}'", value),
        )),
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(value: Option<String>, field: &str, op_type: &str) -> Result<String, LedgerError> {
    present(value).ok_or_else(|| {
        LedgerError::invalid_input(field, &format!("required for '{}' records", op_type))
    })
}

fn money(value: Option<String>) -> Result<Option<Money>, LedgerError> {
    present(value).map(|value| value.parse::<Money>()).transpose()
}

fn required_money(value: Option<String>, op_type: &str) -> Result<Money, LedgerError> {
    money(value)?.ok_or_else(|| {
        LedgerError::invalid_input("amount", &format!("required for '{}' records", op_type))
    })
}

/// Convert a CsvRecord to a ReplayOperation
///
/// This function:
/// - Parses the type string into an operation (case insensitive)
/// - Parses account references, amounts, card kinds and networks
/// - Validates that every column the operation needs is present
///
/// Business rules (positive amounts, limits, PIN format) are left to the
/// engine so that the replay reports the same errors as any other caller.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<ReplayOperation, LedgerError> {
    let op_type = csv_record.op_type.trim().to_lowercase();
    let op = op_type.as_str();

    let operation = match op {
        "open" => ReplayOperation::Open {
            number: parse_account_number(&csv_record.account)?,
            cpf: required(csv_record.counterparty, "counterparty", op)?,
            alias: present(csv_record.memo),
            credit_limit: money(csv_record.amount)?,
        },
        "card" => {
            let kind: CardKind = required(csv_record.counterparty, "counterparty", op)?.parse()?;
            let network = match present(csv_record.memo) {
                Some(network) => network.parse()?,
                None => CardNetwork::default(),
            };
            ReplayOperation::IssueCard {
                account: parse_account_number(&csv_record.account)?,
                card: required(csv_record.card, "card", op)?,
                pin: match kind {
                    CardKind::Debit => Some(required(csv_record.secret, "secret", op)?),
                    CardKind::Credit => None,
                },
                credit_limit: match kind {
                    CardKind::Credit => Some(required_money(csv_record.amount, op)?),
                    CardKind::Debit => None,
                },
                kind,
                network,
            }
        }
        "deposit" => ReplayOperation::Deposit {
            account: parse_account_number(&csv_record.account)?,
            amount: required_money(csv_record.amount, op)?,
        },
        "transfer" => ReplayOperation::Transfer {
            origin: parse_account_number(&csv_record.account)?,
            destination: parse_account_number(&required(
                csv_record.counterparty,
                "counterparty",
                op,
            )?)?,
            amount: required_money(csv_record.amount, op)?,
            auth_token: present(csv_record.secret),
        },
        "card_transfer" => ReplayOperation::CardTransfer {
            origin: parse_account_number(&csv_record.account)?,
            destination: parse_account_number(&required(
                csv_record.counterparty,
                "counterparty",
                op,
            )?)?,
            amount: required_money(csv_record.amount, op)?,
            card: required(csv_record.card, "card", op)?,
            pin: required(csv_record.secret, "secret", op)?,
            auth_token: present(csv_record.memo),
        },
        "pix" => ReplayOperation::Pix {
            origin: required(Some(csv_record.account), "account", op)?,
            destination_alias: required(csv_record.counterparty, "counterparty", op)?,
            amount: required_money(csv_record.amount, op)?,
        },
        "debit" => ReplayOperation::DebitPurchase {
            account: parse_account_number(&csv_record.account)?,
            card: required(csv_record.card, "card", op)?,
            pin: required(csv_record.secret, "secret", op)?,
            amount: required_money(csv_record.amount, op)?,
            merchant: present(csv_record.memo).unwrap_or_default(),
        },
        "credit" => ReplayOperation::CreditPurchase {
            account: parse_account_number(&csv_record.account)?,
            card: present(csv_record.card),
            amount: required_money(csv_record.amount, op)?,
            merchant: present(csv_record.memo).unwrap_or_default(),
        },
        "pay_invoice" => ReplayOperation::PayInvoice {
            account: parse_account_number(&csv_record.account)?,
            amount: required_money(csv_record.amount, op)?,
        },
        "credit_limit" => ReplayOperation::CreditLimit {
            account: parse_account_number(&csv_record.account)?,
            limit: required_money(csv_record.amount, op)?,
        },
        "block" => ReplayOperation::Block {
            account: parse_account_number(&csv_record.account)?,
        },
        "unblock" => ReplayOperation::Unblock {
            account: parse_account_number(&csv_record.account)?,
        },
        "deactivate" => ReplayOperation::Deactivate {
            account: parse_account_number(&csv_record.account)?,
        },
        _ => {
            return Err(LedgerError::invalid_input(
                "type",
                &format!("unknown operation type '{}'", csv_record.op_type),
            ))
        }
    };

    Ok(operation)
}

/// Write account states to CSV format
///
/// Writes accounts with columns
/// `branch,number,balance,credit_limit,credit_used,active,blocked`, sorted by
/// branch then number for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "branch",
        "number",
        "balance",
        "credit_limit",
        "credit_used",
        "active",
        "blocked",
    ])?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.number.cmp(&b.number));

    for account in sorted_accounts {
        writer.write_record(&[
            account.number.branch.clone(),
            account.number.number.clone(),
            account.balance.to_string(),
            account.credit_limit.to_string(),
            account.credit_used.to_string(),
            account.active.to_string(),
            account.blocked.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, NewAccount};
    use rstest::rstest;

    fn record(op_type: &str, account: &str) -> CsvRecord {
        CsvRecord {
            op_type: op_type.to_string(),
            account: account.to_string(),
            ..CsvRecord::default()
        }
    }

    fn with(mut record: CsvRecord, column: &str, value: &str) -> CsvRecord {
        let value = Some(value.to_string());
        match column {
            "counterparty" => record.counterparty = value,
            "amount" => record.amount = value,
            "card" => record.card = value,
            "secret" => record.secret = value,
            "memo" => record.memo = value,
            _ => panic!("unknown column {}", column),
        }
        record
    }

    fn number(value: &str) -> AccountNumber {
        parse_account_number(value).unwrap()
    }

    #[test]
    fn test_convert_open() {
        let csv_record = with(
            with(with(record("open", "0001/1001"), "counterparty", "111"), "amount", "500.00"),
            "memo",
            "ana@example.com",
        );

        assert_eq!(
            convert_csv_record(csv_record).unwrap(),
            ReplayOperation::Open {
                number: number("0001/1001"),
                cpf: "111".to_string(),
                alias: Some("ana@example.com".to_string()),
                credit_limit: Some(Money::from_units(500)),
            }
        );
    }

    #[rstest]
    #[case::debit("debit", Some("1234"), None)]
    #[case::credit("credit", None, Some(Money::from_units(300)))]
    fn test_convert_card(
        #[case] kind: &str,
        #[case] pin: Option<&str>,
        #[case] credit_limit: Option<Money>,
    ) {
        let mut csv_record = with(
            with(record("card", "0001/1001"), "counterparty", kind),
            "card",
            "4000000000000001",
        );
        csv_record.secret = pin.map(str::to_string);
        csv_record.amount = credit_limit.map(|limit| limit.to_string());

        match convert_csv_record(csv_record).unwrap() {
            ReplayOperation::IssueCard {
                pin: parsed_pin,
                credit_limit: parsed_limit,
                network,
                ..
            } => {
                assert_eq!(parsed_pin.as_deref(), pin);
                assert_eq!(parsed_limit, credit_limit);
                assert_eq!(network, CardNetwork::Mastercard);
            }
            other => panic!("expected card issuance, got {:?}", other),
        }
    }

    #[rstest]
    #[case("DEPOSIT")]
    #[case("deposit")]
    #[case(" Deposit ")]
    fn test_type_is_case_insensitive(#[case] op_type: &str) {
        let csv_record = with(record(op_type, "0001/1001"), "amount", "10,50");
        assert_eq!(
            convert_csv_record(csv_record).unwrap(),
            ReplayOperation::Deposit {
                account: number("0001/1001"),
                amount: Money::from_cents(1050),
            }
        );
    }

    #[test]
    fn test_convert_transfer_carries_token() {
        let transfer = with(record("transfer", "0001/1001"), "counterparty", "0001/1002");
        let csv_record = with(with(transfer, "amount", "6000"), "secret", "123456");

        match convert_csv_record(csv_record).unwrap() {
            ReplayOperation::Transfer { auth_token, .. } => {
                assert_eq!(auth_token.as_deref(), Some("123456"))
            }
            other => panic!("expected transfer, got {:?}", other),
        }
    }

    #[rstest]
    #[case::unknown_type(record("withdrawal", "0001/1001"), "type")]
    #[case::bad_account(with(record("deposit", "00011001"), "amount", "10"), "account")]
    #[case::missing_amount(record("deposit", "0001/1001"), "amount")]
    #[case::blank_amount(with(record("deposit", "0001/1001"), "amount", "  "), "amount")]
    #[case::missing_destination(with(record("transfer", "0001/1001"), "amount", "10"), "counterparty")]
    #[case::missing_pin(
        with(with(record("debit", "0001/1001"), "card", "4000"), "amount", "10"),
        "secret"
    )]
    #[case::unknown_card_kind(
        with(with(record("card", "0001/1001"), "counterparty", "prepaid"), "card", "4000"),
        "card kind"
    )]
    fn test_convert_missing_or_invalid_columns(#[case] csv_record: CsvRecord, #[case] field: &str) {
        match convert_csv_record(csv_record) {
            Err(LedgerError::InvalidInput { field: actual, .. }) => assert_eq!(actual, field),
            other => panic!("expected invalid input for {}, got {:?}", field, other),
        }
    }

    #[test]
    fn test_convert_rejects_malformed_amount() {
        let csv_record = with(record("deposit", "0001/1001"), "amount", "ten");
        assert_eq!(
            convert_csv_record(csv_record).unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
    }

    #[test]
    fn test_keys_capture_touched_state() {
        let transfer = ReplayOperation::Transfer {
            origin: number("0001/1001"),
            destination: number("0001/1002"),
            amount: Money::from_units(10),
            auth_token: None,
        };
        let pix = ReplayOperation::Pix {
            origin: "111".to_string(),
            destination_alias: "bia@example.com".to_string(),
            amount: Money::from_units(10),
        };

        assert_eq!(
            transfer.keys(),
            Some(vec![
                "account:0001/1001".to_string(),
                "account:0001/1002".to_string()
            ])
        );
        assert_eq!(pix.keys(), None);
    }

    fn account(branch: &str, number: &str, cents: i64, blocked: bool) -> Account {
        let mut account = Account::open(
            NewAccount {
                holder: number.to_string(),
                cpf: number.to_string(),
                number: AccountNumber::new(branch, number),
                alias: None,
                credit_limit: None,
                daily_debit_limit: None,
            },
            Money::from_units(1000),
            Money::from_units(2000),
        );
        account.balance = Money::from_cents(cents);
        account.blocked = blocked;
        account
    }

    #[rstest]
    #[case::empty_accounts(
        vec![],
        "branch,number,balance,credit_limit,credit_used,active,blocked\n"
    )]
    #[case::single_account(
        vec![account("0001", "1001", 99_050, false)],
        "branch,number,balance,credit_limit,credit_used,active,blocked\n0001,1001,990.50,1000.00,0.00,true,false\n"
    )]
    #[case::sorted_by_branch_then_number(
        vec![
            account("0002", "1000", 0, false),
            account("0001", "2000", 0, true),
            account("0001", "1000", 0, false),
        ],
        "branch,number,balance,credit_limit,credit_used,active,blocked\n\
         0001,1000,0.00,1000.00,0.00,true,false\n\
         0001,2000,0.00,1000.00,0.00,true,true\n\
         0002,1000,0.00,1000.00,0.00,true,false\n"
    )]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }
}
