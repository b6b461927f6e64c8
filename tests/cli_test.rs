mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::write_requests;
use predicates::prelude::*;
use std::process::Command;

fn payments(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/requests.jsonl");

    let output = cmd.output()?;
    assert!(output.status.success());

    let payments = payments(&output.stdout);
    assert_eq!(payments.len(), 2);

    // Approved as tx-1, then refunded.
    assert_eq!(payments[0]["status"], "Cancelled");
    assert_eq!(payments[0]["transactionId"], "tx-1");
    assert_eq!(payments[0]["refundId"], "rf-1");
    assert_eq!(payments[0]["amount"], 100.0);

    assert_eq!(payments[1]["status"], "Approved");
    assert_eq!(payments[1]["transactionId"], "tx-2");
    assert_eq!(payments[1]["currency"], "USD");
    assert_eq!(payments[1]["merchant"], "Globex");

    Ok(())
}

#[test]
fn test_cli_reports_request_errors_and_continues() {
    let file = write_requests(&[
        r#"{"op":"create","cardId":"card-1","cvc":"123","expiredDate":"12/30","currency":"CLP","merchant":"Acme","userId":"user-1","merchantId":"merchant-1"}"#,
        "this is not json",
        r#"{"op":"refund","transactionId":"tx-404","amount":1,"currency":"CLP"}"#,
        r#"{"op":"create","cardId":"card-1","cvc":"123","expiredDate":"12/30","amount":5,"currency":"CLP","merchant":"Acme","userId":"user-1","merchantId":"merchant-1"}"#,
    ]);

    let mut cmd = Command::new(cargo_bin!("paysync"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("missing required field: amount"))
        .stderr(predicate::str::contains("Error reading request"))
        .stderr(predicate::str::contains("Request rejected: payment not found"))
        .stdout(predicate::str::contains("\"status\":\"Approved\""))
        .stdout(predicate::str::contains("\"transactionId\":\"tx-1\""));
}

#[test]
fn test_cli_double_refund_is_rejected() {
    let file = write_requests(&[
        r#"{"op":"create","cardId":"card-1","cvc":"123","expiredDate":"12/30","amount":10,"currency":"CLP","merchant":"Acme","userId":"user-1","merchantId":"merchant-1"}"#,
        r#"{"op":"refund","transactionId":"tx-1","amount":10,"currency":"CLP"}"#,
        r#"{"op":"refund","transactionId":"tx-1","amount":10,"currency":"CLP"}"#,
    ]);

    let mut cmd = Command::new(cargo_bin!("paysync"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Request rejected: payment already refunded"))
        .stdout(predicate::str::contains("\"refundId\":\"rf-1\""));
}

#[test]
fn test_cli_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("paysync"));
    cmd.arg("tests/fixtures/does-not-exist.jsonl");
    cmd.assert().failure();
}
