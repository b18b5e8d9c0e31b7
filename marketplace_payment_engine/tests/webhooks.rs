use std::collections::BTreeMap;

use log::*;
use marketplace_payment_engine::{
    db_types::{Cents, NewTransferRecord, TransferReservation, TransferStatus},
    events::{EventHandlers, EventHooks},
    traits::{
        AccountRequirements,
        ConnectedAccount,
        GatewayError,
        GatewayEvent,
        GatewayTransfer,
        SellerManagement,
        TransferLedger,
    },
    CheckoutApi,
    PayoutOutcome,
    WebhookApi,
    WebhookOutcome,
};
use support::*;

mod support;

fn transfer_ok(gateway: &mut MockGateway) {
    gateway.expect_create_transfer().returning(|t| {
        Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
    });
}

fn payouts(outcome: WebhookOutcome) -> BTreeMap<String, PayoutOutcome> {
    match outcome {
        WebhookOutcome::Payouts(p) => p.into_iter().map(|p| (p.seller_id, p.outcome)).collect(),
        other => panic!("Expected payouts, got {other:?}"),
    }
}

fn payment_succeeded(cart_id: &str, pi: &str) -> GatewayEvent {
    GatewayEvent::PaymentIntentSucceeded(succeeded_intent(pi, marketplace_metadata(cart_id, "buyer", 2, 2), 20_000))
}

#[tokio::test]
async fn payment_is_split_between_sellers() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_1", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_transfer()
        .withf(|t| {
            t.amount == Cents::from(9_500) &&
                t.currency == "usd" &&
                t.source_transaction.as_deref() == Some("ch_pi_1") &&
                t.transfer_group.as_deref() == Some("cart_cart_1") &&
                t.idempotency_key == format!("transfer_pi_1_{}", t.metadata["sellerId"])
        })
        .times(2)
        .returning(|t| {
            Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
        });
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    let outcome = payouts(api.process_event(payment_succeeded("cart_1", "pi_1")).await.unwrap());
    assert_eq!(outcome["seller_a"], PayoutOutcome::Transferred("tr_acct_a".into()));
    assert_eq!(outcome["seller_b"], PayoutOutcome::Transferred("tr_acct_b".into()));

    let ledger = db.fetch_transfers_for_payment_intent("pi_1").await.unwrap();
    assert_eq!(ledger.len(), 2);
    for entry in &ledger {
        assert_eq!(entry.status, TransferStatus::Created);
        assert_eq!(entry.seller_total, Cents::from(10_000));
        assert_eq!(entry.amount, Cents::from(9_500));
        assert_eq!(entry.platform_fee, Cents::from(500));
        assert_eq!(entry.amount + entry.platform_fee, entry.seller_total);
        assert_eq!(entry.cart_id, "cart_1");
    }
    assert_eq!(ledger[0].transfer_id.as_deref(), Some("tr_acct_a"));
    tear_down(db).await;
}

#[tokio::test]
async fn redelivered_payment_does_not_transfer_twice() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_2", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_transfer().times(2).returning(|t| {
        Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
    });
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    api.process_event(payment_succeeded("cart_2", "pi_2")).await.unwrap();
    let again = payouts(api.process_event(payment_succeeded("cart_2", "pi_2")).await.unwrap());
    assert_eq!(again["seller_a"], PayoutOutcome::Duplicate);
    assert_eq!(again["seller_b"], PayoutOutcome::Duplicate);
    assert_eq!(db.fetch_transfers_for_payment_intent("pi_2").await.unwrap().len(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn failed_transfer_is_isolated_and_retried_on_redelivery() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_3", "buyer").await;
    let mut gateway = MockGateway::new();
    let mut b_attempts = 0;
    gateway.expect_create_transfer().times(3).returning(move |t| {
        if t.destination == "acct_b" {
            b_attempts += 1;
            if b_attempts == 1 {
                return Err(GatewayError::RequestFailed { status: 400, message: "Insufficient funds".into() });
            }
        }
        Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
    });
    let api = WebhookApi::new(db.clone(), gateway, Default::default());

    let first = payouts(api.process_event(payment_succeeded("cart_3", "pi_3")).await.unwrap());
    assert_eq!(first["seller_a"], PayoutOutcome::Transferred("tr_acct_a".into()));
    assert!(matches!(&first["seller_b"], PayoutOutcome::Failed(reason) if reason.contains("Insufficient funds")));
    let ledger = db.fetch_transfers_for_payment_intent("pi_3").await.unwrap();
    assert_eq!(ledger[1].status, TransferStatus::Failed);
    assert!(ledger[1].failure_reason.is_some());

    let second = payouts(api.process_event(payment_succeeded("cart_3", "pi_3")).await.unwrap());
    assert_eq!(second["seller_a"], PayoutOutcome::Duplicate);
    assert_eq!(second["seller_b"], PayoutOutcome::Transferred("tr_acct_b".into()));
    let ledger = db.fetch_transfers_for_payment_intent("pi_3").await.unwrap();
    assert!(ledger.iter().all(|t| t.status == TransferStatus::Created));
    assert!(ledger[1].failure_reason.is_none());
    tear_down(db).await;
}

fn ledger_row(pi: &str, cart_id: &str, seller_id: &str, account: &str) -> NewTransferRecord {
    NewTransferRecord {
        payment_intent_id: pi.to_string(),
        seller_id: seller_id.to_string(),
        cart_id: cart_id.to_string(),
        destination_account: account.to_string(),
        seller_total: Cents::from(10_000),
        amount: Cents::from(9_500),
        platform_fee: Cents::from(500),
    }
}

#[tokio::test]
async fn unfinished_transfer_is_completed_on_redelivery() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_p", "buyer").await;
    // An earlier delivery reserved seller_a's row and then stopped before the outcome was written
    let reserved = db.reserve_transfer(ledger_row("pi_p", "cart_p", "seller_a", "acct_a")).await.unwrap();
    assert!(matches!(reserved, TransferReservation::Reserved(_)));

    let mut gateway = MockGateway::new();
    gateway
        .expect_create_transfer()
        .withf(|t| t.idempotency_key == format!("transfer_pi_p_{}", t.metadata["sellerId"]))
        .times(2)
        .returning(|t| {
            Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
        });
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    let outcome = payouts(api.process_event(payment_succeeded("cart_p", "pi_p")).await.unwrap());
    assert_eq!(outcome["seller_a"], PayoutOutcome::Transferred("tr_acct_a".into()));
    assert_eq!(outcome["seller_b"], PayoutOutcome::Transferred("tr_acct_b".into()));
    let ledger = db.fetch_transfers_for_payment_intent("pi_p").await.unwrap();
    assert!(ledger.iter().all(|t| t.status == TransferStatus::Created));
    assert_eq!(ledger[0].transfer_id.as_deref(), Some("tr_acct_a"));

    let mut gateway = MockGateway::new();
    gateway.expect_create_transfer().never();
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    let again = payouts(api.process_event(payment_succeeded("cart_p", "pi_p")).await.unwrap());
    assert_eq!(again["seller_a"], PayoutOutcome::Duplicate);
    assert_eq!(again["seller_b"], PayoutOutcome::Duplicate);
    tear_down(db).await;
}

#[tokio::test]
async fn only_created_ledger_rows_are_final() {
    let db = prepare_test_db().await;
    let row = || ledger_row("pi_l", "cart_l", "seller_a", "acct_a");
    assert!(matches!(db.reserve_transfer(row()).await.unwrap(), TransferReservation::Reserved(_)));
    assert!(matches!(db.reserve_transfer(row()).await.unwrap(), TransferReservation::Reserved(_)));

    let created = db.mark_transfer_created("pi_l", "seller_a", "tr_1").await.unwrap().unwrap();
    assert_eq!(created.status, TransferStatus::Created);
    assert!(db.mark_transfer_created("pi_l", "seller_a", "tr_1").await.unwrap().is_none());
    let kept = db.mark_transfer_failed("pi_l", "seller_a", "timeout").await.unwrap();
    assert_eq!(kept.status, TransferStatus::Created);
    assert_eq!(kept.transfer_id.as_deref(), Some("tr_1"));
    match db.reserve_transfer(row()).await.unwrap() {
        TransferReservation::AlreadyRecorded(existing) => assert_eq!(existing.status, TransferStatus::Created),
        TransferReservation::Reserved(_) => panic!("A created transfer must not be reserved again"),
    }
    assert!(db.mark_transfer_created("pi_l", "seller_b", "tr_2").await.is_err());
    tear_down(db).await;
}

#[tokio::test]
async fn payout_after_the_buyer_confirmed_uses_the_order() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    add_seller(&db, "seller_b", "acct_b").await;
    two_seller_cart(&db, "cart_4", "buyer").await;
    let mut checkout_gateway = MockGateway::new();
    checkout_gateway
        .expect_retrieve_payment_intent()
        .returning(|id| Ok(succeeded_intent(id, marketplace_metadata("cart_4", "buyer", 2, 2), 20_000)));
    let checkout = CheckoutApi::new(db.clone(), checkout_gateway, Default::default());
    checkout.confirm_payment("pi_4", "cart_4").await.unwrap();

    let mut gateway = MockGateway::new();
    gateway.expect_create_transfer().times(2).returning(|t| {
        assert_eq!(t.amount, Cents::from(9_500));
        Ok(GatewayTransfer { id: format!("tr_{}", t.destination), amount: t.amount, destination: t.destination })
    });
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    let outcome = payouts(api.process_event(payment_succeeded("cart_4", "pi_4")).await.unwrap());
    assert_eq!(outcome.len(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn sellers_without_accounts_are_skipped() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    two_seller_cart(&db, "cart_5", "buyer").await;
    let mut gateway = MockGateway::new();
    transfer_ok(&mut gateway);
    let api = WebhookApi::new(db.clone(), gateway, Default::default());
    let outcome = payouts(api.process_event(payment_succeeded("cart_5", "pi_5")).await.unwrap());
    assert_eq!(outcome["seller_a"], PayoutOutcome::Transferred("tr_acct_a".into()));
    assert!(matches!(outcome["seller_b"], PayoutOutcome::Skipped(_)));
    assert_eq!(db.fetch_transfers_for_payment_intent("pi_5").await.unwrap().len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn standard_payments_and_other_events_are_ignored() {
    let db = prepare_test_db().await;
    two_seller_cart(&db, "cart_6", "buyer").await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_transfer().never();
    let api = WebhookApi::new(db.clone(), gateway, Default::default());

    let mut metadata = BTreeMap::new();
    metadata.insert("cartId".to_string(), "cart_6".to_string());
    metadata.insert("userId".to_string(), "buyer".to_string());
    let standard = GatewayEvent::PaymentIntentSucceeded(succeeded_intent("pi_6", metadata, 20_000));
    assert!(matches!(api.process_event(standard).await.unwrap(), WebhookOutcome::Ignored(_)));

    let no_cart = GatewayEvent::PaymentIntentSucceeded(succeeded_intent("pi_7", BTreeMap::new(), 500));
    assert!(matches!(api.process_event(no_cart).await.unwrap(), WebhookOutcome::Ignored(_)));

    let other = GatewayEvent::Ignored("charge.refunded".into());
    assert_eq!(api.process_event(other).await.unwrap(), WebhookOutcome::Ignored("charge.refunded".into()));
    tear_down(db).await;
}

fn account(id: &str, details_submitted: bool, payouts_enabled: bool) -> ConnectedAccount {
    ConnectedAccount {
        id: id.to_string(),
        details_submitted,
        payouts_enabled,
        charges_enabled: payouts_enabled,
        requirements: AccountRequirements::default(),
    }
}

#[tokio::test]
async fn onboarding_notification_is_sent_once() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    let notified = HookCalled::default();
    let counter = notified.clone();
    let mut hooks = EventHooks::default();
    hooks.on_seller_onboarded(move |ev| {
        info!("🪝️ {ev:?}");
        assert_eq!(ev.stripe_account_id, "acct_a");
        assert_eq!(ev.email.as_deref(), Some("seller_a@example.com"));
        counter.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    let api = WebhookApi::new(db.clone(), MockGateway::new(), producers);
    handlers.start_handlers().await;

    let pending = api.process_event(GatewayEvent::AccountUpdated(account("acct_a", true, false))).await.unwrap();
    assert_eq!(pending, WebhookOutcome::AccountUpdated { user_id: "seller_a".into(), onboarded: false });
    let done = api.process_event(GatewayEvent::AccountUpdated(account("acct_a", true, true))).await.unwrap();
    assert_eq!(done, WebhookOutcome::AccountUpdated { user_id: "seller_a".into(), onboarded: true });
    let again = api.process_event(GatewayEvent::AccountUpdated(account("acct_a", true, true))).await.unwrap();
    assert_eq!(again, WebhookOutcome::AccountUpdated { user_id: "seller_a".into(), onboarded: false });

    let user = db.fetch_user("seller_a").await.unwrap().unwrap();
    let merchant = user.merchant_account.unwrap();
    assert!(merchant.is_fully_onboarded());
    assert_eq!(merchant.stripe_status.to_string(), "active");
    assert!(merchant.last_status_update.is_some());
    assert!(user.onboarding_notified);

    // Dropping the api closes the channel, so the handler finishes its work and stops
    drop(api);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(notified.count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn restricted_and_unknown_accounts() {
    let db = prepare_test_db().await;
    add_seller(&db, "seller_a", "acct_a").await;
    let api = WebhookApi::new(db.clone(), MockGateway::new(), Default::default());
    let mut restricted = account("acct_a", true, true);
    restricted.requirements.disabled_reason = Some("requirements.past_due".into());
    api.process_event(GatewayEvent::AccountUpdated(restricted)).await.unwrap();
    let user = db.fetch_user("seller_a").await.unwrap().unwrap();
    assert_eq!(user.merchant_account.unwrap().stripe_status.to_string(), "restricted");

    let unknown = api.process_event(GatewayEvent::AccountUpdated(account("acct_zzz", true, true))).await.unwrap();
    assert_eq!(unknown, WebhookOutcome::UnknownAccount("acct_zzz".into()));
    tear_down(db).await;
}
