//! Benchmark suite for ledger operations and replay strategies
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Replay inputs are generated into temporary files: a fixed set of accounts
//! receiving deposits and exchanging transfers in a round-robin pattern.

use bank_ledger::cli::StrategyType;
use bank_ledger::core::{InMemoryStore, LedgerConfig, TransactionEngine};
use bank_ledger::strategy::{create_strategy, BatchConfig};
use bank_ledger::types::{
    AccountId, AccountNumber, DepositRequest, Money, NewAccount, TransferRequest,
};
use bank_ledger::Sha256PinHasher;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn main() {
    divan::main();
}

const ACCOUNTS: usize = 50;

fn replay_input(operations: usize) -> NamedTempFile {
    let mut csv = String::from("type,account,counterparty,amount,card,secret,memo\n");
    for i in 0..ACCOUNTS {
        let _ = writeln!(csv, "open,0001/{},{:011}", 1000 + i, i);
        let _ = writeln!(csv, "deposit,0001/{},,10000.00", 1000 + i);
    }
    for i in 0..operations {
        let origin = 1000 + i % ACCOUNTS;
        let destination = 1000 + (i + 1) % ACCOUNTS;
        let _ = writeln!(csv, "transfer,0001/{},0001/{},12.34", origin, destination);
    }

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(csv.as_bytes()).expect("Failed to write replay input");
    file
}

#[divan::bench(args = [1_000, 10_000])]
fn sync_replay(bencher: divan::Bencher, operations: usize) {
    let input = replay_input(operations);
    let strategy = create_strategy(StrategyType::Sync, None, LedgerConfig::default());

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(input.path(), &mut output)
            .expect("Processing failed");
    });
}

#[divan::bench(args = [1_000, 10_000])]
fn async_replay(bencher: divan::Bencher, operations: usize) {
    let input = replay_input(operations);
    let strategy = create_strategy(
        StrategyType::Async,
        Some(BatchConfig::default()),
        LedgerConfig::default(),
    );

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(input.path(), &mut output)
            .expect("Processing failed");
    });
}

fn seeded_engine() -> (TransactionEngine<InMemoryStore>, Vec<AccountId>) {
    let engine = TransactionEngine::new(
        Arc::new(InMemoryStore::new()),
        Sha256PinHasher,
        LedgerConfig::default(),
    );
    let accounts = (0..2)
        .map(|i| {
            engine
                .accounts()
                .open_account(NewAccount {
                    holder: format!("Bench {}", i),
                    cpf: format!("{:011}", i),
                    number: AccountNumber::new("0001", &format!("{}", 1000 + i)),
                    alias: None,
                    credit_limit: None,
                    daily_debit_limit: None,
                })
                .expect("Failed to open account")
                .id
        })
        .collect();
    (engine, accounts)
}

/// Single deposit through lock acquisition, validation and commit
#[divan::bench]
fn deposit(bencher: divan::Bencher) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let (engine, accounts) = seeded_engine();

    bencher.bench_local(|| {
        runtime
            .block_on(engine.deposit(DepositRequest {
                account: accounts[0],
                amount: Money::from_cents(100),
            }))
            .expect("Deposit failed")
    });
}

/// Two-account transfer, including sorted lock acquisition
#[divan::bench]
fn transfer(bencher: divan::Bencher) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let (engine, accounts) = seeded_engine();
    runtime
        .block_on(engine.deposit(DepositRequest {
            account: accounts[0],
            amount: Money::from_units(100_000_000),
        }))
        .expect("Deposit failed");

    bencher.bench_local(|| {
        runtime
            .block_on(engine.transfer(TransferRequest {
                origin: accounts[0],
                destination: accounts[1],
                amount: Money::from_units(10),
                auth_token: None,
            }))
            .expect("Transfer failed")
    });
}
