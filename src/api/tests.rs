//! Tests for the api module

use super::*;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_authorization_request_skips_unset_fields() {
    let request = AuthorizationRequest {
        aspsp: "Test Bank".to_string(),
        country: "FI".to_string(),
        redirect_uri: "https://example.test/callback".to_string(),
        state: None,
        psu_id: None,
    };

    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        value,
        json!({
            "aspsp": "Test Bank",
            "country": "FI",
            "redirect_uri": "https://example.test/callback",
        })
    );
}

#[test]
fn test_balance_report_tolerates_missing_optionals() {
    let report: BalanceReport = serde_json::from_value(json!({
        "account_uid": "acc-1",
        "balances": [
            {
                "balance_type": "closingBooked",
                "amount": {"value": "1250.50", "currency": "EUR"},
            }
        ],
    }))
    .unwrap();

    assert_eq!(report.account_uid, "acc-1");
    assert_eq!(report.balances.len(), 1);
    assert_eq!(report.balances[0].amount.value, "1250.50");
    assert!(report.balances[0].reference_date.is_none());
    assert!(report.updated_at.is_none());
}

#[test]
fn test_transaction_page_defaults() {
    let page: TransactionPage = serde_json::from_value(json!({
        "account_uid": "acc-1",
        "transactions": [
            {
                "transaction_id": "tx-1",
                "transaction_amount": {"value": "-42.00", "currency": "EUR"},
            }
        ],
    }))
    .unwrap();

    assert_eq!(page.transactions.len(), 1);
    assert!(!page.has_more);
    assert!(page.total_count.is_none());
    assert!(page.next_offset.is_none());
}

#[test]
fn test_transaction_filter_query_params() {
    let filter = TransactionFilter::new()
        .from_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        .to_date(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
        .limit(50)
        .offset(100)
        .booking_status("BOOK");

    let params = filter.to_query_params();
    assert_eq!(params["date_from"], "2026-01-01");
    assert_eq!(params["date_to"], "2026-01-31");
    assert_eq!(params["limit"], "50");
    assert_eq!(params["offset"], "100");
    assert_eq!(params["booking_status"], "BOOK");
}

#[test]
fn test_empty_filter_renders_no_params() {
    assert!(TransactionFilter::new().to_query_params().is_empty());
}
