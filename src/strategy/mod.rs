//! Processing strategy module for ledger replays
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and engine processing. This allows different
//! processing implementations (sequential, concurrent waves) to be selected at
//! runtime. Both produce the same final account states for the same input.

use crate::cli::StrategyType;
use crate::core::{InMemoryStore, LedgerConfig, LedgerStore, PinHasher, TransactionEngine};
use crate::io::csv_format::{ReplayOperation, ReplayRecord};
use crate::types::{
    AccountId, AccountNumber, AliasTransferRequest, CardId, CardKind, CardTransferRequest,
    CreditPurchaseRequest, DebitPurchaseRequest, DepositRequest, InvoicePaymentRequest,
    LedgerError, Money, NewAccount, NewCard, NewCardInstrument, TransferRequest,
};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Engine flavour used by the replay strategies
pub type ReplayEngine = TransactionEngine<InMemoryStore>;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy must be able to read operations from a CSV file, apply them
/// to a fresh ledger, and write the final account states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Process operations from input file and write results to output
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened (file not found, permission denied)
    /// - The async runtime cannot be built
    /// - Output cannot be written
    ///
    /// Malformed records and rejected operations are logged with
    /// `tracing::warn!` and skipped; they never fail the run.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `batch_config` - Optional configuration for async batch processing (ignored for sync)
/// * `ledger_config` - Business thresholds for the replayed ledger
pub fn create_strategy(
    strategy_type: StrategyType,
    batch_config: Option<BatchConfig>,
    ledger_config: LedgerConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger_config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            batch_config.unwrap_or_default(),
            ledger_config,
        )),
    }
}

/// Apply one replay record, logging a rejection instead of failing
///
/// Returns whether the operation was committed.
pub async fn apply_record<S: LedgerStore, H: PinHasher>(
    engine: &TransactionEngine<S, H>,
    record: &ReplayRecord,
) -> bool {
    match apply_operation(engine, &record.operation).await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(
                line = record.line,
                operation = record.operation.name(),
                kind = ?error.kind(),
                %error,
                "operation skipped"
            );
            false
        }
    }
}

/// Resolve the external keys of an operation and run it on the engine
pub async fn apply_operation<S: LedgerStore, H: PinHasher>(
    engine: &TransactionEngine<S, H>,
    operation: &ReplayOperation,
) -> Result<(), LedgerError> {
    let accounts = engine.accounts();
    let resolve = |number: &AccountNumber| -> Result<AccountId, LedgerError> {
        Ok(accounts.account_by_number(number)?.id)
    };
    let resolve_card = |account: AccountId, number: &str| -> Result<CardId, LedgerError> {
        Ok(accounts.card_by_number(account, number)?.id)
    };

    match operation {
        ReplayOperation::Open {
            number,
            cpf,
            alias,
            credit_limit,
        } => {
            accounts.open_account(NewAccount {
                holder: cpf.clone(),
                cpf: cpf.clone(),
                number: number.clone(),
                alias: alias.clone(),
                credit_limit: *credit_limit,
                daily_debit_limit: None,
            })?;
        }
        ReplayOperation::IssueCard {
            account,
            card,
            kind,
            pin,
            credit_limit,
            network,
        } => {
            let instrument = match kind {
                CardKind::Debit => NewCardInstrument::Debit {
                    pin: pin.clone().unwrap_or_default(),
                },
                CardKind::Credit => NewCardInstrument::Credit {
                    credit_limit: credit_limit.unwrap_or(Money::ZERO),
                },
            };
            accounts.issue_card(
                resolve(account)?,
                NewCard {
                    number: card.clone(),
                    ownership: Default::default(),
                    network: *network,
                    instrument,
                },
            )?;
        }
        ReplayOperation::Deposit { account, amount } => {
            engine
                .deposit(DepositRequest {
                    account: resolve(account)?,
                    amount: *amount,
                })
                .await?;
        }
        ReplayOperation::Transfer {
            origin,
            destination,
            amount,
            auth_token,
        } => {
            engine
                .transfer(TransferRequest {
                    origin: resolve(origin)?,
                    destination: resolve(destination)?,
                    amount: *amount,
                    auth_token: auth_token.clone(),
                })
                .await?;
        }
        ReplayOperation::CardTransfer {
            origin,
            destination,
            amount,
            card,
            pin,
            auth_token,
        } => {
            let origin = resolve(origin)?;
            engine
                .transfer_with_card(CardTransferRequest {
                    origin,
                    destination: resolve(destination)?,
                    amount: *amount,
                    card: resolve_card(origin, card)?,
                    pin: pin.clone(),
                    auth_token: auth_token.clone(),
                })
                .await?;
        }
        ReplayOperation::Pix {
            origin,
            destination_alias,
            amount,
        } => {
            engine
                .transfer_by_alias(AliasTransferRequest {
                    origin: origin.clone(),
                    destination_alias: destination_alias.clone(),
                    amount: *amount,
                })
                .await?;
        }
        ReplayOperation::DebitPurchase {
            account,
            card,
            pin,
            amount,
            merchant,
        } => {
            let account = resolve(account)?;
            engine
                .debit_purchase(DebitPurchaseRequest {
                    card: resolve_card(account, card)?,
                    pin: pin.clone(),
                    amount: *amount,
                    merchant: merchant.clone(),
                })
                .await?;
        }
        ReplayOperation::CreditPurchase {
            account,
            card,
            amount,
            merchant,
        } => {
            let account = resolve(account)?;
            let card = card
                .as_deref()
                .map(|number| resolve_card(account, number))
                .transpose()?;
            engine
                .credit_purchase(CreditPurchaseRequest {
                    account: Some(account),
                    card,
                    amount: *amount,
                    merchant: merchant.clone(),
                })
                .await?;
        }
        ReplayOperation::PayInvoice { account, amount } => {
            engine
                .pay_invoice(InvoicePaymentRequest {
                    account: resolve(account)?,
                    amount: *amount,
                })
                .await?;
        }
        ReplayOperation::CreditLimit { account, limit } => {
            accounts.set_credit_limit(resolve(account)?, *limit).await?;
        }
        ReplayOperation::Block { account } => {
            accounts.block_account(resolve(account)?).await?;
        }
        ReplayOperation::Unblock { account } => {
            accounts.unblock_account(resolve(account)?).await?;
        }
        ReplayOperation::Deactivate { account } => {
            accounts.deactivate_account(resolve(account)?).await?;
        }
    }

    Ok(())
}
