use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use super::*;
use crate::accounts::AccountService;
use crate::errors::Error;
use crate::locks::{LockError, LockModule, LockRequest, LockService, LockServiceTrait};
use crate::test_support::{InMemoryAccounts, InMemoryLocks, InMemoryTransactions};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    service: TransactionService,
    locks: Arc<LockService>,
}

fn fixture() -> Fixture {
    let accounts = Arc::new(AccountService::new(Arc::new(InMemoryAccounts::with_ids(
        &["bank"],
    ))));
    let locks = Arc::new(LockService::new(Arc::new(InMemoryLocks::default())));
    let service = TransactionService::new(
        Arc::new(InMemoryTransactions::default()),
        accounts,
        locks.clone(),
    );
    Fixture { service, locks }
}

fn new_tx(on: NaiveDate) -> NewTransaction {
    NewTransaction {
        account_id: "bank".to_string(),
        date: on,
        description: " Office rent ".to_string(),
        payee: Some("Landlord".to_string()),
        reference_number: Some("".to_string()),
        withdrawal: Some(dec!(990)),
        deposit: None,
    }
}

fn update_for(tx: &CanonicalTransaction, on: NaiveDate) -> TransactionUpdate {
    TransactionUpdate {
        date: on,
        description: tx.description.clone(),
        payee: tx.payee.clone(),
        reference_number: tx.reference_number.clone(),
        withdrawal: tx.withdrawal,
        deposit: tx.deposit,
    }
}

async fn lock_banking(locks: &LockService) {
    locks
        .lock(
            LockModule::Banking,
            LockRequest {
                lock_date: date(2024, 4, 30),
                reason: Some("April closed".to_string()),
            },
            "alice",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_manual_transaction() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 2)))
        .await
        .unwrap();

    assert_eq!(tx.description, "Office rent");
    assert_eq!(tx.amount, dec!(-990));
    assert_eq!(tx.transaction_type, TransactionType::Debit);
    assert_eq!(tx.reference_number, None);
    assert_eq!(tx.reconciliation_status, ReconciliationStatus::Pending);
    assert!(tx.raw_row.is_none());
    assert!(tx.import_batch_id.is_none());
    assert_eq!(tx.content_hash.len(), 64);

    let listed = f
        .service
        .list_transactions(&TransactionFilter::for_account("bank"))
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_create_rejects_unknown_account() {
    let f = fixture();
    let result = f
        .service
        .create_transaction(NewTransaction {
            account_id: "ghost".to_string(),
            ..new_tx(date(2024, 4, 2))
        })
        .await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_banking_lock_blocks_edits_inside_period() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 15)))
        .await
        .unwrap();
    lock_banking(&f.locks).await;

    let err = f
        .service
        .update_transaction(&tx.id, update_for(&tx, date(2024, 4, 16)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Lock(LockError::PeriodLocked { lock_date, .. }) if lock_date == date(2024, 4, 30)
    ));

    let err = f
        .service
        .create_transaction(new_tx(date(2024, 4, 15)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Lock(LockError::PeriodLocked { .. })));

    let later = f
        .service
        .create_transaction(new_tx(date(2024, 5, 1)))
        .await
        .unwrap();
    assert_eq!(later.date, date(2024, 5, 1));
}

#[tokio::test]
async fn test_cannot_move_transaction_into_locked_period() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 5, 3)))
        .await
        .unwrap();
    lock_banking(&f.locks).await;

    let result = f
        .service
        .update_transaction(&tx.id, update_for(&tx, date(2024, 4, 29)))
        .await;
    assert!(matches!(
        result,
        Err(Error::Lock(LockError::PeriodLocked { .. }))
    ));
}

#[tokio::test]
async fn test_update_recomputes_amount_and_hash() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 2)))
        .await
        .unwrap();
    let updated = f
        .service
        .update_transaction(
            &tx.id,
            TransactionUpdate {
                withdrawal: None,
                deposit: Some(dec!(45.10)),
                ..update_for(&tx, date(2024, 4, 2))
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, dec!(45.10));
    assert_eq!(updated.transaction_type, TransactionType::Credit);
    assert_eq!(updated.withdrawal, None);
    assert_ne!(updated.content_hash, tx.content_hash);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 2)))
        .await
        .unwrap();

    let first = f.service.reconcile_transaction(&tx.id).await.unwrap();
    assert_eq!(first.reconciliation_status, ReconciliationStatus::Reconciled);

    // A lock placed afterwards does not break a repeated reconcile.
    lock_banking(&f.locks).await;
    let second = f.service.reconcile_transaction(&tx.id).await.unwrap();
    assert_eq!(second.reconciliation_status, ReconciliationStatus::Reconciled);
    assert_eq!(second.updated_at, first.updated_at);
}

#[tokio::test]
async fn test_reconciled_transaction_is_frozen() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 2)))
        .await
        .unwrap();
    f.service.reconcile_transaction(&tx.id).await.unwrap();

    assert!(matches!(
        f.service.cancel_transaction(&tx.id).await,
        Err(Error::ConstraintViolation(_))
    ));
    assert!(matches!(
        f.service.delete_transaction(&tx.id).await,
        Err(Error::ConstraintViolation(_))
    ));
    assert!(matches!(
        f.service
            .update_transaction(&tx.id, update_for(&tx, tx.date))
            .await,
        Err(Error::ConstraintViolation(_))
    ));
}

#[tokio::test]
async fn test_delete_pending_transaction() {
    let f = fixture();
    let tx = f
        .service
        .create_transaction(new_tx(date(2024, 4, 2)))
        .await
        .unwrap();
    f.service.delete_transaction(&tx.id).await.unwrap();
    assert!(f.service.get_transaction(&tx.id).unwrap_err().is_not_found());
}
