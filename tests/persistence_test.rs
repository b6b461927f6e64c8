#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use common::write_requests;
use paysync::domain::ports::PaymentRepository;
use paysync::domain::status::PaymentStatus;
use paysync::infrastructure::rocksdb::RocksDbPaymentRepository;
use std::process::Command;
use tempfile::tempdir;

#[tokio::test]
async fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: create and settle a payment
    let requests1 = write_requests(&[
        r#"{"op":"create","cardId":"card-1","cvc":"123","expiredDate":"12/30","amount":100,"currency":"CLP","merchant":"Acme","userId":"user-1","merchantId":"merchant-1"}"#,
    ]);
    let output = Command::new(cargo_bin!("paysync"))
        .arg(requests1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let line = String::from_utf8_lossy(&output.stdout).lines().next().unwrap().to_string();
    let view: serde_json::Value = serde_json::from_str(&line).unwrap();
    let id: uuid::Uuid = view["paymentId"].as_str().unwrap().parse().unwrap();

    // 2. Second run: refund it from the same database
    let requests2 = write_requests(&[r#"{"op":"refund","transactionId":"tx-1","amount":100,"currency":"CLP"}"#]);
    let output = Command::new(cargo_bin!("paysync"))
        .arg(requests2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("payment not found"));

    // 3. The stored record reflects both runs
    let repo = RocksDbPaymentRepository::open(&db_path).unwrap();
    let stored = repo.get_payment_by_id(id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Cancelled);
    assert_eq!(stored.transaction_id, "tx-1");
    assert_eq!(stored.refund_id, "rf-1");
}
