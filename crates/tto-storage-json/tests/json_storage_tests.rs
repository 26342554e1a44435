use std::{fs, sync::Arc};

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::tempdir;
use uuid::Uuid;

use tto_core::{
    AllocationService, CoreError, FixedClock, LedgerContext, OfficeStorage, PaymentService,
    SystemClock, WriteBatch,
};
use tto_domain::{Balance, Payee};
use tto_storage_json::{JsonOfficeStorage, StoragePaths};

#[test]
fn committed_rows_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::under(dir.path());
    let payee = Payee::Personnel(Uuid::new_v4());
    let instruction_id = {
        let storage = JsonOfficeStorage::open(paths.clone()).expect("open");
        let clock = SystemClock;
        let ctx = LedgerContext::new(&storage, &clock);
        AllocationService::allocate(&ctx, payee, dec!(250.50)).expect("allocate");
        PaymentService::create(&ctx, payee, dec!(100), None)
            .expect("instruction")
            .id
    };

    assert!(paths.book_path.exists());
    let reopened = JsonOfficeStorage::open(paths).expect("reopen");
    let balance = reopened.balance(&payee).expect("read").expect("balance");
    assert_eq!(balance.available_amount, dec!(150.50));
    assert_eq!(balance.reserved_amount, dec!(100));
    assert_eq!(balance.version, 2);
    assert!(reopened.instruction(instruction_id).expect("read").is_some());
}

#[test]
fn stale_commit_leaves_file_untouched() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonOfficeStorage::open(StoragePaths::under(dir.path())).expect("open");
    let payee = Payee::User(Uuid::new_v4());
    let mut batch = WriteBatch::new();
    batch.insert_balance(Balance::open(payee, chrono::Utc::now()));
    storage.commit(batch).expect("insert");
    let on_disk = fs::read_to_string(&storage.paths().book_path).expect("read book");

    let mut stale = storage.balance(&payee).unwrap().unwrap();
    stale.version = 0;
    stale.available_amount = dec!(99);
    let mut batch = WriteBatch::new();
    batch.update_balance(stale);

    assert!(matches!(
        storage.commit(batch),
        Err(CoreError::ConcurrencyConflict(_))
    ));
    assert_eq!(
        fs::read_to_string(&storage.paths().book_path).expect("read book"),
        on_disk
    );
    assert_eq!(
        storage.balance(&payee).unwrap().unwrap().available_amount,
        dec!(0)
    );
}

#[test]
fn backups_rotate_with_retention() {
    let dir = tempdir().expect("tempdir");
    let storage =
        JsonOfficeStorage::with_retention(StoragePaths::under(dir.path()), 2).expect("open");
    let clock = SystemClock;
    let ctx = LedgerContext::new(&storage, &clock);
    let payee = Payee::User(Uuid::new_v4());
    for _ in 0..5 {
        AllocationService::allocate(&ctx, payee, dec!(10)).expect("allocate");
    }

    let backups = storage.list_backups().expect("list");
    assert!(!backups.is_empty());
    assert!(backups.len() <= 2);
    assert!(backups.iter().all(|backup| backup.size_bytes > 0));
    assert!(!dir.path().join("book.json.tmp").exists());
}

#[test]
fn same_instant_commits_keep_distinct_backups() {
    let dir = tempdir().expect("tempdir");
    let frozen = FixedClock(Utc.with_ymd_and_hms(2024, 6, 30, 17, 45, 0).unwrap());
    let storage =
        JsonOfficeStorage::with_clock(StoragePaths::under(dir.path()), 2, Arc::new(frozen))
            .expect("open");
    let ctx = LedgerContext::new(&storage, &frozen);
    let payee = Payee::User(Uuid::new_v4());
    for _ in 0..5 {
        AllocationService::allocate(&ctx, payee, dec!(10)).expect("allocate");
    }

    // Five commits back up four earlier books; retention keeps the newest two.
    let names: Vec<String> = storage
        .list_backups()
        .expect("list")
        .into_iter()
        .map(|backup| backup.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "book_20240630_174500_000_0003.json".to_string(),
            "book_20240630_174500_000_0002.json".to_string(),
        ]
    );

    storage.restore_backup(&names[0]).expect("restore");
    assert_eq!(
        storage.balance(&payee).unwrap().unwrap().available_amount,
        dec!(40)
    );
    let newest = &storage.list_backups().expect("list")[0];
    assert_eq!(newest.name, "book_20240630_174500_000_0004.json");
    assert_eq!(newest.created_at, Some(frozen.0));
}

#[test]
fn restore_replaces_current_book() {
    let dir = tempdir().expect("tempdir");
    let storage = JsonOfficeStorage::open(StoragePaths::under(dir.path())).expect("open");
    let clock = SystemClock;
    let ctx = LedgerContext::new(&storage, &clock);
    let payee = Payee::User(Uuid::new_v4());
    AllocationService::allocate(&ctx, payee, dec!(40)).expect("allocate");

    let backup = storage.backup(Some("before payout")).expect("backup");
    assert!(backup.name.ends_with("_before-payout.json"));
    AllocationService::allocate(&ctx, payee, dec!(60)).expect("allocate");
    assert_eq!(
        storage.balance(&payee).unwrap().unwrap().available_amount,
        dec!(100)
    );

    storage.restore_backup(&backup.name).expect("restore");
    assert_eq!(
        storage.balance(&payee).unwrap().unwrap().available_amount,
        dec!(40)
    );
    assert!(matches!(
        storage.restore_backup("book_19990101_000000_000.json"),
        Err(CoreError::Storage(_))
    ));
}
