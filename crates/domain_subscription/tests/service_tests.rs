//! Subscription service tests
//!
//! Exercises the service end to end over the in-memory store.
//!
//! # Test Organization
//!
//! - `payment_scenarios` - Settlement and advance payments
//! - `lifecycle_scenarios` - Suspension, reactivation, cancellation
//! - `scheduling` - Due-date buckets
//! - `atomicity` - Failed operations leave state unchanged
//! - `concurrency` - Per-account writer serialization

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{AccountId, Currency};
use domain_subscription::{
    Account, AccountQuery, AdvancePolicy, ApplyDeltaRequest, BillingPolicy, ErrorKind,
    InMemoryAccountStore, OpenAccountRequest, PaymentMethod, ProfileUpdate, ReactivationPolicy,
    ServiceStatus, SubmitPaymentRequest, SubscriptionError, SubscriptionService, SuspendRequest,
    SuspensionEnd, SuspensionReason,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn service_with(policy: BillingPolicy) -> SubscriptionService {
    SubscriptionService::new(Arc::new(InMemoryAccountStore::new()), policy)
}

fn service() -> SubscriptionService {
    service_with(BillingPolicy::default())
}

fn due(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

async fn open(service: &SubscriptionService, price: Decimal, months_owed: u32, due_date: NaiveDate) -> Account {
    service
        .open_account(OpenAccountRequest {
            holder_name: "Maria Huaman".to_string(),
            plan: Some("Cable + Internet".to_string()),
            monthly_price: price,
            currency: Currency::PEN,
            next_due_date: due_date,
            months_owed,
            actor: "Admin".to_string(),
        })
        .await
        .unwrap()
}

fn payment(account_id: AccountId, amount: Decimal, months: u32, receipt: &str) -> SubmitPaymentRequest {
    SubmitPaymentRequest {
        account_id,
        amount,
        months_settled: months,
        method: PaymentMethod::MobileWallet,
        receipt_number: receipt.to_string(),
        paid_at: None,
        operation_number: Some("OP-778812".to_string()),
        notes: None,
        contact: Some("987111222".to_string()),
        actor: "Cajero".to_string(),
    }
}

fn no_paga() -> SuspendRequest {
    SuspendRequest {
        reason: "No paga".to_string(),
        notes: Some("Corte programado".to_string()),
        actor: "Admin".to_string(),
    }
}

// ============================================================================
// PAYMENTS
// ============================================================================

mod payment_scenarios {
    use super::*;

    #[tokio::test]
    async fn test_partial_then_advance_payment() {
        let service = service();
        let account = open(&service, dec!(50), 3, due(10)).await;

        let first = service
            .submit_payment(payment(account.id(), dec!(100), 2, "B-0001"))
            .await
            .unwrap();
        assert_eq!(first.account.months_owed(), 1);
        assert_eq!(first.payment.months_settled, 2);

        let second = service
            .submit_payment(payment(account.id(), dec!(150), 3, "B-0002"))
            .await
            .unwrap();
        assert_eq!(second.account.months_owed(), 0);
        assert_eq!(second.payment.months_settled, 3);
        assert_eq!(second.payment.months_deducted, 1);
        assert_eq!(second.account.advance_months_consumed(), 2);

        let history = service.payment_history(account.id()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].receipt_number, "B-0001");
    }

    #[tokio::test]
    async fn test_duplicate_receipt_never_double_applies() {
        let service = service();
        let account = open(&service, dec!(50), 3, due(10)).await;
        service
            .submit_payment(payment(account.id(), dec!(50), 1, "B-0100"))
            .await
            .unwrap();

        let replay = service
            .submit_payment(payment(account.id(), dec!(100), 2, "B-0100"))
            .await
            .unwrap_err();
        assert_eq!(replay.kind(), ErrorKind::DuplicateReceipt);

        let state = service.get_state(account.id()).await.unwrap();
        assert_eq!(state.months_owed(), 2);
        assert_eq!(service.payment_history(account.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_receipt_on_another_account_is_allowed() {
        let service = service();
        let a = open(&service, dec!(50), 1, due(10)).await;
        let b = open(&service, dec!(50), 1, due(10)).await;

        service.submit_payment(payment(a.id(), dec!(50), 1, "B-0200")).await.unwrap();
        service.submit_payment(payment(b.id(), dec!(50), 1, "B-0200")).await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_on_cancelled_account_is_invalid_state() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;
        service.cancel(account.id(), "Admin").await.unwrap();

        let err = service
            .submit_payment(payment(account.id(), dec!(50), 1, "B-0300"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_payment_on_unknown_account_is_not_found() {
        let err = service()
            .submit_payment(payment(AccountId::new(), dec!(50), 1, "B-0400"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_payment_leaves_ledger_trace() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;
        service
            .submit_payment(payment(account.id(), dec!(150), 3, "B-0500"))
            .await
            .unwrap();

        let ledger = service.ledger_history(account.id()).await.unwrap();
        assert_eq!(ledger.len(), 2);
        let last = &ledger[1];
        assert_eq!(last.requested_delta, -3);
        assert_eq!(last.applied_delta, -2);
        assert_eq!(last.advance_months, 1);
        assert_eq!(last.resulting_months_owed, 0);
    }

    #[tokio::test]
    async fn test_free_plan_accepts_any_positive_amount() {
        let service = service();
        let account = open(&service, dec!(0), 2, due(10)).await;

        let outcome = service
            .submit_payment(payment(account.id(), dec!(1), 1, "B-0600"))
            .await
            .unwrap();
        assert_eq!(outcome.account.months_owed(), 1);
        assert_eq!(outcome.payment.months_deducted, 1);
        assert_eq!(outcome.payment.amount.amount(), dec!(1));
    }
}

// ============================================================================
// LIFECYCLE
// ============================================================================

mod lifecycle_scenarios {
    use super::*;

    #[tokio::test]
    async fn test_suspend_then_reactivate_preserves_debt() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;

        let suspended = service.suspend(account.id(), no_paga()).await.unwrap();
        assert_eq!(suspended.status(), ServiceStatus::Suspended);
        assert_eq!(suspended.months_owed(), 2);
        assert_eq!(suspended.suspensions().len(), 1);
        assert!(suspended.suspensions()[0].is_open());

        let active = service.reactivate(account.id(), "Admin").await.unwrap();
        assert_eq!(active.status(), ServiceStatus::Active);
        assert_eq!(active.months_owed(), 2);

        let history = service.suspension_history(account.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        let record = &history[0];
        assert_eq!(record.reason, SuspensionReason::NonPayment);
        assert_eq!(record.notes.as_deref(), Some("Corte programado"));
        assert_eq!(record.reactivated_by.as_deref(), Some("Admin"));
        assert!(record.reactivated_at.is_some());
    }

    #[tokio::test]
    async fn test_suspend_twice_fails_without_new_record() {
        let service = service();
        let account = open(&service, dec!(50), 0, due(10)).await;
        service.suspend(account.id(), no_paga()).await.unwrap();

        let err = service.suspend(account.id(), no_paga()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(service.suspension_history(account.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_suspend_cancelled_fails() {
        let service = service();
        let account = open(&service, dec!(50), 0, due(10)).await;
        service.cancel(account.id(), "Admin").await.unwrap();

        let err = service.suspend(account.id(), no_paga()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(service.suspension_history(account.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suspend_cancelled_reports_transition_before_bad_input() {
        let service = service();
        let account = open(&service, dec!(50), 0, due(10)).await;
        service.cancel(account.id(), "Admin").await.unwrap();

        let blank = SuspendRequest {
            reason: "  ".to_string(),
            notes: None,
            actor: String::new(),
        };
        let err = service.suspend(account.id(), blank).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let err = service.reactivate(account.id(), "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_history_is_chronological() {
        let service = service();
        let account = open(&service, dec!(50), 0, due(10)).await;

        for reason in ["No paga", "Mudanza"] {
            service
                .suspend(
                    account.id(),
                    SuspendRequest {
                        reason: reason.to_string(),
                        notes: None,
                        actor: "Admin".to_string(),
                    },
                )
                .await
                .unwrap();
            service.reactivate(account.id(), "Admin").await.unwrap();
        }
        service.suspend(account.id(), no_paga()).await.unwrap();

        let history = service.suspension_history(account.id()).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].reason, SuspensionReason::Relocation);
        assert!(history[0].suspended_at <= history[1].suspended_at);
        assert_eq!(history.iter().filter(|r| r.is_open()).count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_suspended_account_closes_record() {
        let service = service();
        let account = open(&service, dec!(50), 5, due(10)).await;
        service.suspend(account.id(), no_paga()).await.unwrap();

        let cancelled = service.cancel(account.id(), "Gerencia").await.unwrap();
        assert_eq!(cancelled.status(), ServiceStatus::Cancelled);
        assert_eq!(cancelled.months_owed(), 5);
        let record = &cancelled.suspensions()[0];
        assert_eq!(record.ended_by, Some(SuspensionEnd::Cancellation));
        assert_eq!(record.reactivated_by.as_deref(), Some("Gerencia"));

        let err = service.cancel(account.id(), "Gerencia").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let err = service.reactivate(account.id(), "Gerencia").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_blocking_policy() {
        let service = service_with(BillingPolicy::default().with_reactivation(ReactivationPolicy::BlockWhileOwing));
        let account = open(&service, dec!(50), 1, due(10)).await;
        service.suspend(account.id(), no_paga()).await.unwrap();

        let err = service.reactivate(account.id(), "Admin").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        service
            .submit_payment(payment(account.id(), dec!(50), 1, "B-0600"))
            .await
            .unwrap();
        let active = service.reactivate(account.id(), "Admin").await.unwrap();
        assert_eq!(active.status(), ServiceStatus::Active);
    }

    #[tokio::test]
    async fn test_payment_accepted_while_suspended() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;
        service.suspend(account.id(), no_paga()).await.unwrap();

        let applied = service
            .submit_payment(payment(account.id(), dec!(100), 2, "B-0700"))
            .await
            .unwrap();
        assert_eq!(applied.account.months_owed(), 0);
        assert_eq!(applied.account.status(), ServiceStatus::Suspended);
    }
}

// ============================================================================
// LEDGER
// ============================================================================

mod ledger_operations {
    use super::*;

    #[tokio::test]
    async fn test_monthly_cycle_accrues() {
        let service = service();
        let account = open(&service, dec!(50), 0, due(10)).await;

        let applied = service
            .apply_delta(account.id(), ApplyDeltaRequest::monthly_cycle("scheduler"))
            .await
            .unwrap();
        assert_eq!(applied.account.months_owed(), 1);
        assert_eq!(applied.entry.resulting_months_owed, 1);
    }

    #[tokio::test]
    async fn test_carry_forward_suppresses_next_cycle() {
        let service = service_with(BillingPolicy::default().with_advance(AdvancePolicy::CarryForward));
        let account = open(&service, dec!(50), 0, due(10)).await;

        service
            .submit_payment(payment(account.id(), dec!(100), 2, "B-0800"))
            .await
            .unwrap();
        let state = service.get_state(account.id()).await.unwrap();
        assert_eq!(state.advance_credit_months(), 2);

        let applied = service
            .apply_delta(account.id(), ApplyDeltaRequest::monthly_cycle("scheduler"))
            .await
            .unwrap();
        assert_eq!(applied.account.months_owed(), 0);
        assert_eq!(applied.account.advance_credit_months(), 1);
    }

    #[tokio::test]
    async fn test_update_profile_changes_price_for_later_payments() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;

        service
            .update_profile(
                account.id(),
                ProfileUpdate {
                    monthly_price: Some(dec!(70)),
                    actor: "Admin".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .submit_payment(payment(account.id(), dec!(100), 2, "B-0900"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        service
            .submit_payment(payment(account.id(), dec!(140), 2, "B-0900"))
            .await
            .unwrap();
    }
}

// ============================================================================
// SCHEDULING
// ============================================================================

mod scheduling {
    use super::*;

    #[tokio::test]
    async fn test_three_accounts_same_day() {
        let service = service();
        for price in [dec!(50), dec!(70), dec!(30)] {
            open(&service, price, 0, due(15)).await;
        }
        open(&service, dec!(99), 0, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()).await;

        let buckets = service.compute_due_date_buckets(due(1), due(30)).await.unwrap();
        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[&due(15)];
        assert_eq!(bucket.count, 3);
        assert_eq!(bucket.total_amount_due.amount(), dec!(150));
    }

    #[tokio::test]
    async fn test_cancelled_accounts_are_not_scheduled() {
        let service = service();
        let keep = open(&service, dec!(50), 0, due(15)).await;
        let gone = open(&service, dec!(70), 0, due(15)).await;
        service.cancel(gone.id(), "Admin").await.unwrap();

        let buckets = service.compute_due_date_buckets(due(15), due(15)).await.unwrap();
        assert_eq!(buckets[&due(15)].count, 1);
        assert_eq!(buckets[&due(15)].accounts[0].account_id, keep.id());
    }

    #[tokio::test]
    async fn test_reversed_range_is_validation_error() {
        let err = service().compute_due_date_buckets(due(20), due(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

// ============================================================================
// ATOMICITY
// ============================================================================

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn test_failed_operations_leave_state_unchanged() {
        let service = service();
        let account = open(&service, dec!(50), 3, due(10)).await;
        let before = service.get_state(account.id()).await.unwrap();

        let _ = service.submit_payment(payment(account.id(), dec!(0), 1, "B-1000")).await;
        let _ = service.submit_payment(payment(account.id(), dec!(75), 2, "B-1001")).await;
        let _ = service.reactivate(account.id(), "Admin").await;
        let _ = service
            .apply_delta(
                account.id(),
                ApplyDeltaRequest {
                    months_delta: 0,
                    reason: "noop".to_string(),
                    actor: "Admin".to_string(),
                },
            )
            .await;

        let after = service.get_state(account.id()).await.unwrap();
        assert_eq!(after.months_owed(), before.months_owed());
        assert_eq!(after.version(), before.version());
        assert_eq!(after.status(), before.status());
        assert!(service.payment_history(account.id()).await.unwrap().is_empty());
        assert_eq!(service.ledger_history(account.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_reports_status() {
        let service = service();
        let a = open(&service, dec!(50), 0, due(10)).await;
        open(&service, dec!(50), 0, due(10)).await;
        service.suspend(a.id(), no_paga()).await.unwrap();

        let suspended = service
            .list_accounts(AccountQuery::by_status(ServiceStatus::Suspended))
            .await
            .unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].id(), a.id());
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_do_not_lose_updates() {
        let service = service();
        let account = open(&service, dec!(50), 20, due(10)).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = service.clone();
            let id = account.id();
            handles.push(tokio::spawn(async move {
                service
                    .submit_payment(payment(id, dec!(50), 1, &format!("C-{:04}", i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = service.get_state(account.id()).await.unwrap();
        assert_eq!(state.months_owed(), 0);
        assert_eq!(service.payment_history(account.id()).await.unwrap().len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replays_apply_once() {
        let service = service();
        let account = open(&service, dec!(50), 5, due(10)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let id = account.id();
            handles.push(tokio::spawn(async move {
                service.submit_payment(payment(id, dec!(50), 1, "SAME")).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(SubscriptionError::DuplicateReceipt { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(service.get_state(account.id()).await.unwrap().months_owed(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_suspend_racing_payment_keeps_invariants() {
        let service = service();
        let account = open(&service, dec!(50), 2, due(10)).await;
        let id = account.id();

        let pay = {
            let service = service.clone();
            tokio::spawn(async move { service.submit_payment(payment(id, dec!(50), 1, "R-1")).await })
        };
        let suspend = {
            let service = service.clone();
            tokio::spawn(async move { service.suspend(id, no_paga()).await })
        };
        pay.await.unwrap().unwrap();
        suspend.await.unwrap().unwrap();

        let state = service.get_state(id).await.unwrap();
        assert_eq!(state.months_owed(), 1);
        assert_eq!(state.status(), ServiceStatus::Suspended);
        assert!(state.check_invariants().is_ok());
    }
}
