//! Transaction processing engine
//!
//! This module provides the TransactionEngine that executes every
//! balance-affecting operation of the ledger as one atomic unit of work:
//! transfers (plain, card-authorized and alias-addressed), debit and credit
//! purchases, deposits and invoice payments.
//!
//! Each operation follows the same shape:
//! 1. Stateless validation (amount bounds, same-account, step-up)
//! 2. Lock every touched account in ascending id order and load it
//! 3. Check the card and account rules (PIN, usable, funds, limits)
//! 4. Mutate the staged accounts, stage movements, commit
//!
//! Any failure before the commit leaves the ledger untouched.

use crate::core::account_manager::AccountManager;
use crate::core::auth::{AuthorizationGate, Sha256PinHasher};
use crate::core::config::LedgerConfig;
use crate::core::locks::AccountLocks;
use crate::core::statement::{StatementPage, StatementReader};
use crate::core::traits::{CommitOutcome, LedgerStore, PinHasher};
use crate::core::unit_of_work::UnitOfWork;
use crate::types::{
    AccountBalance, AccountId, AliasTransferRequest, CardId, CardKind, CardTransferRequest,
    CreditPurchaseRequest, DebitPurchaseRequest, DepositRequest, InvoicePaymentRequest,
    InvoiceReceipt, LedgerError, Money, Movement, MovementKind, PostingReceipt, TransferReceipt,
    TransferRequest,
};
use chrono::Utc;
use std::sync::Arc;

/// How the two legs of a transfer are recorded
struct TransferLegs {
    operation: &'static str,
    sent: MovementKind,
    received: MovementKind,
    label: &'static str,
    card: Option<CardId>,
    /// Checked against `card` once the origin is locked
    pin: Option<String>,
    alias: Option<String>,
    authenticated: bool,
}

/// Transaction processing engine
///
/// Generic over the store and the PIN hasher so that tests and the replay CLI
/// run against [`InMemoryStore`](crate::core::InMemoryStore) while other
/// deployments can inject their own store.
pub struct TransactionEngine<S, H = Sha256PinHasher> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
    gate: AuthorizationGate<H>,
    accounts: AccountManager<S, H>,
    statements: StatementReader<S>,
    config: LedgerConfig,
}

impl<S: LedgerStore, H: PinHasher> TransactionEngine<S, H> {
    /// Create an engine over `store`
    ///
    /// The engine's [`AccountManager`] shares the same store, lock table and
    /// hasher.
    pub fn new(store: Arc<S>, hasher: H, config: LedgerConfig) -> Self {
        let hasher = Arc::new(hasher);
        let locks = Arc::new(AccountLocks::new());

        TransactionEngine {
            gate: AuthorizationGate::new(Arc::clone(&hasher), config.step_up.clone()),
            accounts: AccountManager::new(
                Arc::clone(&store),
                Arc::clone(&locks),
                hasher,
                config.clone(),
            ),
            statements: StatementReader::new(Arc::clone(&store)),
            store,
            locks,
            config,
        }
    }

    /// Administrative operations and lookups
    pub fn accounts(&self) -> &AccountManager<S, H> {
        &self.accounts
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Transfer funds between two accounts
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is outside the configured transfer bounds
    /// - Origin and destination are the same account
    /// - The amount needs step-up authentication and the token is missing or wrong
    /// - Either account does not exist, is inactive or is blocked
    /// - The origin balance is below the amount
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            self.config.transfer_limits.check(request.amount)?;
            ensure_distinct(request.origin, request.destination)?;
            let authenticated = self
                .gate
                .step_up(request.amount, request.auth_token.as_deref())?;

            self.move_funds(
                request.origin,
                request.destination,
                request.amount,
                TransferLegs {
                    operation: "transfer",
                    sent: MovementKind::TransferSent,
                    received: MovementKind::TransferReceived,
                    label: "Transfer",
                    card: None,
                    pin: None,
                    alias: None,
                    authenticated,
                },
            )
            .await
        }
        .await;

        traced("transfer", result)
    }

    /// Transfer funds authorized by the origin's debit card PIN
    ///
    /// The card must be an active debit card of the origin account. Step-up
    /// authentication applies as for [`transfer`](Self::transfer).
    pub async fn transfer_with_card(
        &self,
        request: CardTransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            self.config.transfer_limits.check(request.amount)?;
            ensure_distinct(request.origin, request.destination)?;
            let authenticated = self
                .gate
                .step_up(request.amount, request.auth_token.as_deref())?;

            self.move_funds(
                request.origin,
                request.destination,
                request.amount,
                TransferLegs {
                    operation: "transfer_with_card",
                    sent: MovementKind::TransferSent,
                    received: MovementKind::TransferReceived,
                    label: "Card transfer",
                    card: Some(request.card),
                    pin: Some(request.pin.clone()),
                    alias: None,
                    authenticated,
                },
            )
            .await
        }
        .await;

        traced("transfer_with_card", result)
    }

    /// PIX-style transfer addressed by CPF or alias key
    ///
    /// Only the transfer minimum applies; there is no maximum and no step-up.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if no account answers to the origin reference
    /// - `AliasNotFound` if no account answers to the destination alias
    /// - `SameAccount` if both resolve to one account
    pub async fn transfer_by_alias(
        &self,
        request: AliasTransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            self.config.transfer_limits.check_minimum(request.amount)?;

            let origin = self
                .store
                .account_by_alias(&request.origin)?
                .ok_or_else(|| LedgerError::account_not_found(&request.origin))?;
            let destination = self
                .store
                .account_by_alias(&request.destination_alias)?
                .ok_or_else(|| LedgerError::alias_not_found(&request.destination_alias))?;
            ensure_distinct(origin.id, destination.id)?;

            self.move_funds(
                origin.id,
                destination.id,
                request.amount,
                TransferLegs {
                    operation: "transfer_by_alias",
                    sent: MovementKind::PixSent,
                    received: MovementKind::PixReceived,
                    label: "PIX",
                    card: None,
                    pin: None,
                    alias: Some(request.destination_alias.clone()),
                    authenticated: false,
                },
            )
            .await
        }
        .await;

        traced("transfer_by_alias", result)
    }

    async fn move_funds(
        &self,
        origin: AccountId,
        destination: AccountId,
        amount: Money,
        legs: TransferLegs,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut work = self.begin(legs.operation, &[origin, destination]).await?;

        // Card state is only stable while its owner is locked
        if let (Some(card), Some(pin)) = (legs.card, legs.pin.as_deref()) {
            self.gate.check_pin(self.store.as_ref(), card, Some(origin), pin)?;
        }

        let source = work.account(origin)?;
        source.ensure_usable()?;
        let (origin_number, origin_holder) = (source.number.clone(), source.holder.clone());

        let target = work.account(destination)?;
        target.ensure_usable()?;
        let (destination_number, destination_holder) =
            (target.number.clone(), target.holder.clone());

        let source = work.account_mut(origin)?;
        if source.balance < amount {
            return Err(LedgerError::insufficient_funds(
                origin,
                source.balance,
                amount,
            ));
        }
        source.balance = source
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(legs.operation, origin))?;

        let target = work.account_mut(destination)?;
        target.balance = target
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(legs.operation, destination))?;

        work.record(
            Movement::new(
                origin,
                legs.sent,
                amount,
                format!("{} sent to {}", legs.label, destination_holder),
            )
            .with_counterparty(destination_number)
            .with_card(legs.card)
            .with_alias(legs.alias.clone())
            .authenticated(legs.authenticated),
        );
        work.record(
            Movement::new(
                destination,
                legs.received,
                amount,
                format!("{} received from {}", legs.label, origin_holder),
            )
            .with_counterparty(origin_number)
            .with_card(legs.card)
            .with_alias(legs.alias)
            .authenticated(legs.authenticated),
        );

        let outcome = work.commit()?;

        tracing::info!(
            operation = legs.operation,
            %origin,
            %destination,
            %amount,
            authenticated = legs.authenticated,
            "transfer committed"
        );

        Ok(TransferReceipt {
            origin: balance_of(&outcome, origin)?,
            destination: balance_of(&outcome, destination)?,
            movements: outcome.movements,
            authenticated: legs.authenticated,
        })
    }

    /// Pay a merchant from the balance with a debit card
    ///
    /// The card is verified with its PIN; purchases of the current UTC day
    /// count against the account's daily debit limit.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive
    /// - The card is missing, not a debit card, blocked, or the PIN is wrong
    /// - The owning account is inactive or blocked
    /// - The balance is below the amount
    /// - The purchase would exceed the daily debit limit
    pub async fn debit_purchase(
        &self,
        request: DebitPurchaseRequest,
    ) -> Result<PostingReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            require_positive(request.amount)?;
            let account = self.card_owner(request.card)?;

            let mut work = self.begin("debit_purchase", &[account]).await?;
            let card = self.gate.check_pin(
                self.store.as_ref(),
                request.card,
                Some(account),
                &request.pin,
            )?;
            let staged = work.account(account)?;
            staged.ensure_usable()?;

            if staged.balance < request.amount {
                return Err(LedgerError::insufficient_funds(
                    account,
                    staged.balance,
                    request.amount,
                ));
            }

            // Read under the account lock so concurrent purchases see each other
            let spent = self.spent_today(account)?;
            let limit = staged.daily_debit_limit;
            let projected = spent
                .checked_add(request.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("debit_purchase", account))?;
            if projected > limit {
                return Err(LedgerError::DailyLimitExceeded {
                    account,
                    limit,
                    spent,
                    requested: request.amount,
                });
            }

            let staged = work.account_mut(account)?;
            staged.balance = staged
                .balance
                .checked_sub(request.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("debit_purchase", account))?;

            work.record(
                Movement::new(
                    account,
                    MovementKind::DebitPurchase,
                    request.amount,
                    format!("Debit purchase at {}", request.merchant),
                )
                .with_card(Some(card.id))
                .with_merchant(request.merchant.as_str()),
            );

            posting(work.commit()?, account)
        }
        .await;

        traced("debit_purchase", result)
    }

    fn spent_today(&self, account: AccountId) -> Result<Money, LedgerError> {
        let now = Utc::now();
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(now, |start| start.and_utc());

        self.store
            .movements_since(account, midnight)?
            .iter()
            .filter(|movement| movement.kind == MovementKind::DebitPurchase)
            .try_fold(Money::ZERO, |total, movement| total.checked_add(movement.amount))
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit_purchase", account))
    }

    /// Owner of a card, read before its account is locked
    ///
    /// Card state is checked again once the owner is locked.
    fn card_owner(&self, card: CardId) -> Result<AccountId, LedgerError> {
        self.store
            .card(card)?
            .map(|card| card.account)
            .ok_or_else(|| LedgerError::card_not_found(card))
    }

    /// Record a purchase against the account's credit
    ///
    /// Raises `credit_used`; the balance does not change. A card alone bills
    /// its owner. A named card must be an active credit card of the account
    /// and the amount must fit its limit.
    pub async fn credit_purchase(
        &self,
        request: CreditPurchaseRequest,
    ) -> Result<PostingReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            require_positive(request.amount)?;
            let account = match (request.account, request.card) {
                (Some(account), _) => account,
                (None, Some(card)) => self.card_owner(card)?,
                (None, None) => {
                    return Err(LedgerError::invalid_input(
                        "account",
                        "an account or a card is required",
                    ))
                }
            };

            let mut work = self.begin("credit_purchase", &[account]).await?;
            let staged = work.account(account)?;
            staged.ensure_usable()?;

            if let Some(card_id) = request.card {
                let card = self
                    .store
                    .card(card_id)?
                    .filter(|card| card.account == account)
                    .ok_or_else(|| LedgerError::card_not_found(card_id))?;
                card.ensure_usable_as(CardKind::Credit)?;

                let card_limit = card.credit_limit().unwrap_or(Money::ZERO);
                if request.amount > card_limit {
                    return Err(LedgerError::CreditLimitExceeded {
                        account,
                        limit: card_limit,
                        used: staged.credit_used,
                        requested: request.amount,
                    });
                }
            }

            if request.amount > staged.available_credit() {
                return Err(LedgerError::CreditLimitExceeded {
                    account,
                    limit: staged.credit_limit,
                    used: staged.credit_used,
                    requested: request.amount,
                });
            }
            let used = staged
                .credit_used
                .checked_add(request.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("credit_purchase", account))?;

            work.account_mut(account)?.credit_used = used;
            work.record(
                Movement::new(
                    account,
                    MovementKind::CreditPurchase,
                    request.amount,
                    format!("Credit purchase at {}", request.merchant),
                )
                .with_card(request.card)
                .with_merchant(request.merchant.as_str()),
            );

            posting(work.commit()?, account)
        }
        .await;

        traced("credit_purchase", result)
    }

    pub async fn deposit(&self, request: DepositRequest) -> Result<PostingReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            require_positive(request.amount)?;
            let account = request.account;

            let mut work = self.begin("deposit", &[account]).await?;
            work.account(account)?.ensure_usable()?;

            let staged = work.account_mut(account)?;
            staged.balance = staged
                .balance
                .checked_add(request.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("deposit", account))?;
            let description = format!("Deposit to {}", staged.number);

            work.record(Movement::new(
                account,
                MovementKind::Deposit,
                request.amount,
                description,
            ));

            posting(work.commit()?, account)
        }
        .await;

        traced("deposit", result)
    }

    /// Pay the credit invoice from the balance
    ///
    /// The payment is clamped to the credit in use: paying more than is owed
    /// only pays what is owed. The movement records the amount actually paid.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive
    /// - `NothingToPay` if no credit is in use
    /// - `InsufficientFunds` if the balance is below the clamped amount
    pub async fn pay_invoice(
        &self,
        request: InvoicePaymentRequest,
    ) -> Result<InvoiceReceipt, LedgerError> {
        let result: Result<_, LedgerError> = async {
            require_positive(request.amount)?;
            let account = request.account;

            let mut work = self.begin("pay_invoice", &[account]).await?;
            let staged = work.account(account)?;
            staged.ensure_usable()?;

            if staged.credit_used.is_zero() {
                return Err(LedgerError::NothingToPay { account });
            }
            let paid = request.amount.min(staged.credit_used);
            if staged.balance < paid {
                return Err(LedgerError::insufficient_funds(
                    account,
                    staged.balance,
                    paid,
                ));
            }

            let staged = work.account_mut(account)?;
            staged.balance = staged
                .balance
                .checked_sub(paid)
                .ok_or_else(|| LedgerError::arithmetic_overflow("pay_invoice", account))?;
            staged.credit_used = staged
                .credit_used
                .checked_sub(paid)
                .ok_or_else(|| LedgerError::arithmetic_overflow("pay_invoice", account))?;

            work.record(Movement::new(
                account,
                MovementKind::InvoicePayment,
                paid,
                "Credit invoice payment",
            ));

            let PostingReceipt { account, movement } = posting(work.commit()?, account)?;
            Ok(InvoiceReceipt {
                account,
                paid,
                movement,
            })
        }
        .await;

        traced("pay_invoice", result)
    }

    /// Page through an account's movements, newest first
    pub fn statement(
        &self,
        account: AccountId,
        page: usize,
        page_size: usize,
    ) -> Result<StatementPage, LedgerError> {
        self.statements.list_movements(account, page, page_size)
    }

    async fn begin(
        &self,
        operation: &'static str,
        accounts: &[AccountId],
    ) -> Result<UnitOfWork<'_, S>, LedgerError> {
        UnitOfWork::begin(
            self.store.as_ref(),
            &self.locks,
            accounts,
            self.config.lock_timeout,
            operation,
        )
        .await
    }
}

fn ensure_distinct(origin: AccountId, destination: AccountId) -> Result<(), LedgerError> {
    if origin == destination {
        return Err(LedgerError::SameAccount { account: origin });
    }
    Ok(())
}

fn require_positive(amount: Money) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::invalid_amount(amount, "must be positive"));
    }
    Ok(())
}

fn balance_of(outcome: &CommitOutcome, account: AccountId) -> Result<AccountBalance, LedgerError> {
    outcome
        .accounts
        .iter()
        .find(|committed| committed.id == account)
        .map(AccountBalance::from)
        .ok_or_else(|| LedgerError::account_not_found(account))
}

fn posting(outcome: CommitOutcome, account: AccountId) -> Result<PostingReceipt, LedgerError> {
    let balance = balance_of(&outcome, account)?;
    let movement = outcome
        .movements
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::unavailable("commit returned no movement"))?;

    tracing::info!(
        %account,
        kind = %movement.kind,
        amount = %movement.amount,
        "posting committed"
    );

    Ok(PostingReceipt {
        account: balance,
        movement,
    })
}

fn traced<T>(operation: &str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(error) = &result {
        tracing::warn!(operation, kind = ?error.kind(), %error, "operation rejected");
    }
    result
}
