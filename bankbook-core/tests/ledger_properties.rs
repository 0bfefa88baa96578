//! Property tests for ledger invariants
//!
//! Run with: cargo test --test ledger_properties

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use bankbook_core::adapters::duckdb::DuckDbRepository;
use bankbook_core::services::LedgerService;
use bankbook_core::{Account, AccountType, Amount, Error, SessionToken};

#[derive(Debug, Clone)]
enum Op {
    Deposit(usize, i64),
    Withdraw(usize, i64),
    Transfer(usize, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // amounts in cents
    prop_oneof![
        (0..2usize, 1i64..50_000).prop_map(|(who, cents)| Op::Deposit(who, cents)),
        (0..2usize, 1i64..50_000).prop_map(|(who, cents)| Op::Withdraw(who, cents)),
        (0..2usize, 1i64..50_000).prop_map(|(who, cents)| Op::Transfer(who, cents)),
    ]
}

const USERS: [&str; 2] = ["alice", "bob"];

fn setup(opening_cents: [i64; 2]) -> (Arc<DuckDbRepository>, LedgerService, Vec<SessionToken>) {
    let repo = Arc::new(DuckDbRepository::in_memory().unwrap());
    repo.ensure_schema().unwrap();

    let mut tokens = Vec::new();
    for (username, cents) in USERS.iter().zip(opening_cents) {
        let now = Utc::now().trunc_subsecs(6);
        let account = Account {
            id: Uuid::new_v4(),
            name: username.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$unused".to_string(),
            account_type: AccountType::Personal,
            balance: Decimal::new(cents, 2),
            session_token: SessionToken::generate(),
            created_at: now,
            updated_at: now,
        };
        repo.unit_of_work(|uow| uow.insert_account(&account)).unwrap();
        tokens.push(account.session_token);
    }

    (Arc::clone(&repo), LedgerService::new(repo), tokens)
}

fn balance(repo: &DuckDbRepository, username: &str) -> Decimal {
    repo.find_account_by_username(username).unwrap().unwrap().balance
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        ..ProptestConfig::default()
    })]

    /// Balances never go negative and match a simple in-memory model
    #[test]
    fn balances_never_negative(
        opening in [0i64..20_000, 0i64..20_000],
        ops in prop::collection::vec(op_strategy(), 1..20)
    ) {
        let (repo, ledger, tokens) = setup(opening);
        let mut model = [Decimal::new(opening[0], 2), Decimal::new(opening[1], 2)];
        let mut posted = 0i64;

        for op in ops {
            match op {
                Op::Deposit(who, cents) => {
                    let amount = Amount::new(Decimal::new(cents, 2)).unwrap();
                    ledger.deposit(&tokens[who], amount).unwrap();
                    model[who] += amount.value();
                    posted += 1;
                }
                Op::Withdraw(who, cents) => {
                    let amount = Amount::new(Decimal::new(cents, 2)).unwrap();
                    match ledger.withdraw(&tokens[who], amount) {
                        Ok(receipt) => {
                            model[who] -= amount.value();
                            prop_assert_eq!(receipt.balance, model[who]);
                            posted += 1;
                        }
                        Err(Error::InsufficientFunds) => {
                            prop_assert!(model[who] < amount.value());
                        }
                        Err(err) => prop_assert!(false, "unexpected error: {}", err),
                    }
                }
                Op::Transfer(who, cents) => {
                    let other = 1 - who;
                    let amount = Amount::new(Decimal::new(cents, 2)).unwrap();
                    let total_before = model[0] + model[1];
                    match ledger.transfer(&tokens[who], USERS[other], amount) {
                        Ok(_) => {
                            model[who] -= amount.value();
                            model[other] += amount.value();
                            posted += 1;
                        }
                        Err(Error::InsufficientFunds) => {
                            prop_assert!(model[who] < amount.value());
                        }
                        Err(err) => prop_assert!(false, "unexpected error: {}", err),
                    }
                    prop_assert_eq!(model[0] + model[1], total_before);
                }
            }

            for (i, username) in USERS.iter().enumerate() {
                let stored = balance(&repo, username);
                prop_assert!(stored >= Decimal::ZERO);
                prop_assert_eq!(stored, model[i]);
            }
        }

        prop_assert_eq!(repo.transaction_count().unwrap(), posted);
    }

    /// Depositing and withdrawing the same amount is an exact no-op on the balance
    #[test]
    fn deposit_then_withdraw_is_identity(opening in 0i64..1_000_000, cents in 1i64..100_000_000) {
        let (repo, ledger, tokens) = setup([opening, 0]);
        let amount = Amount::new(Decimal::new(cents, 2)).unwrap();

        ledger.deposit(&tokens[0], amount).unwrap();
        let receipt = ledger.withdraw(&tokens[0], amount).unwrap();

        prop_assert_eq!(receipt.balance, Decimal::new(opening, 2));
        prop_assert_eq!(balance(&repo, "alice"), Decimal::new(opening, 2));
    }
}
