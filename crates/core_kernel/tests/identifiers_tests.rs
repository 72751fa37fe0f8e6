//! Tests for the typed identifiers

use core_kernel::{
    InvoiceId, LineItemId, PaymentId, StudentId,
    FundId, FundTransactionId, FundLoanId,
};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(InvoiceId::new(), InvoiceId::new());
    assert_ne!(PaymentId::new_v7(), PaymentId::new_v7());
}

#[test]
fn test_new_v7_is_time_ordered() {
    let id1 = FundTransactionId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let id2 = FundTransactionId::new_v7();
    let uuid1: Uuid = id1.into();
    let uuid2: Uuid = id2.into();
    assert!(uuid1 < uuid2);
}

#[test]
fn test_prefixes() {
    assert_eq!(InvoiceId::prefix(), "INV");
    assert_eq!(LineItemId::prefix(), "ITM");
    assert_eq!(PaymentId::prefix(), "PAY");
    assert_eq!(StudentId::prefix(), "STU");
    assert_eq!(FundId::prefix(), "FND");
    assert_eq!(FundTransactionId::prefix(), "FTX");
    assert_eq!(FundLoanId::prefix(), "LOAN");
}

#[test]
fn test_display_round_trips_through_from_str() {
    let original = FundLoanId::new_v7();
    let display = original.to_string();
    assert!(display.starts_with("LOAN-"));

    let parsed: FundLoanId = display.parse().unwrap();
    assert_eq!(original, parsed);
}

#[test]
fn test_from_str_rejects_garbage() {
    assert!("PAY-not-a-uuid".parse::<PaymentId>().is_err());
}

#[test]
fn test_json_is_transparent_uuid() {
    let uuid = Uuid::new_v4();
    let id = StudentId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", uuid));

    let back: StudentId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
