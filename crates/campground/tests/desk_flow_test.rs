mod common;

use std::sync::Arc;

use campground::*;
use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;

struct Desk {
    desk: ReservationDesk,
    payments: Arc<ScriptedGateway>,
    notifier: Arc<RecordingNotifier>,
}

fn desk_with(store: Arc<dyn ReservationStore>) -> Desk {
    let payments = Arc::new(ScriptedGateway::succeeding());
    let notifier = Arc::new(RecordingNotifier::default());
    let config = KioskConfig::default();
    let desk = ReservationDesk::new(
        inventory(),
        store,
        payments.clone(),
        notifier.clone(),
        Arc::new(VerificationCodes::from_config(&config)),
        config,
    );
    Desk {
        desk,
        payments,
        notifier,
    }
}

async fn seeded_store() -> (Arc<InMemoryReservationStore>, i64, i64) {
    let store = Arc::new(InMemoryReservationStore::new());
    let jane = store
        .insert_reservation(&booked("P1", day(1), 2, "Jane Doe"))
        .await
        .unwrap();
    let john = store
        .insert_reservation(&booked("P2", day(1), 2, "John Doe"))
        .await
        .unwrap();
    (store, jane, john)
}

#[tokio::test]
async fn test_no_match_is_terminal_not_found() {
    let (store, _, _) = seeded_store().await;
    let Desk { desk, notifier, .. } = desk_with(store);
    let mut session = desk.start_session(DeskFlow::CheckIn);

    desk.search(&mut session, "nobody@example.com").await.unwrap();
    assert_eq!(session.step, LookupStep::NotFound);

    assert!(desk.check_in(&mut session).await.is_err());
    assert!(desk.verify(&mut session, "123456").is_err());
    assert!(desk.select(&mut session, 1).await.is_err());
    assert!(desk.resend_code(&mut session).await.is_err());
    assert_eq!(notifier.code_count(), 0);
    assert!(session.reservation.is_none());
}

#[tokio::test]
async fn test_exact_id_match_skips_verification() {
    let (store, jane, _) = seeded_store().await;
    let Desk { desk, notifier, .. } = desk_with(store.clone());
    let mut session = desk.start_session(DeskFlow::CheckIn);

    desk.search(&mut session, &jane.to_string()).await.unwrap();
    assert_eq!(session.step, LookupStep::Action);
    assert_eq!(notifier.code_count(), 0);

    let receipt = desk.check_in(&mut session).await.unwrap();
    assert_eq!(receipt.reservation.status, ReservationStatus::CheckedIn);
    assert_eq!(receipt.site_number.as_deref(), Some("A1"));
    assert_eq!(receipt.rules.len(), 2);
    assert_eq!(session.step, LookupStep::Done);

    let stored = store.find_reservation(jane).await.unwrap().unwrap();
    assert_eq!(stored.status, ReservationStatus::CheckedIn);
}

#[tokio::test]
async fn test_single_match_needs_code() {
    let (store, jane, _) = seeded_store().await;
    let Desk { desk, notifier, .. } = desk_with(store);
    let mut session = desk.start_session(DeskFlow::CheckIn);

    desk.search(&mut session, "Jane").await.unwrap();
    assert_eq!(session.step, LookupStep::Verify);
    assert!(session.reservation.is_none());
    assert_eq!(session.pending_summary().unwrap().id, jane);
    assert!(desk.check_in(&mut session).await.is_err());

    let code = notifier.last_code().unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };
    assert!(matches!(
        desk.verify(&mut session, wrong),
        Err(BookingError::InvalidArgument(_))
    ));
    assert_eq!(session.step, LookupStep::Verify);

    desk.verify(&mut session, &code).unwrap();
    assert_eq!(session.step, LookupStep::Action);
    assert_eq!(session.reservation.as_ref().unwrap().id, jane);
}

#[tokio::test]
async fn test_resend_replaces_code() {
    let (store, _, _) = seeded_store().await;
    let Desk { desk, notifier, .. } = desk_with(store);
    let mut session = desk.start_session(DeskFlow::Manage);

    desk.search(&mut session, "jane.doe@example.com").await.unwrap();
    let first = notifier.last_code().unwrap();
    desk.resend_code(&mut session).await.unwrap();
    let second = notifier.last_code().unwrap();
    assert_eq!(notifier.code_count(), 2);

    if first != second {
        assert!(desk.verify(&mut session, &first).is_err());
    }
    desk.verify(&mut session, &second).unwrap();
    assert_eq!(session.step, LookupStep::Action);
}

#[tokio::test]
async fn test_multiple_matches_need_selection_then_code() {
    let (store, _, john) = seeded_store().await;
    let Desk { desk, notifier, .. } = desk_with(store);
    let mut session = desk.start_session(DeskFlow::CheckIn);

    desk.search(&mut session, "doe").await.unwrap();
    assert_eq!(session.step, LookupStep::Select);
    assert_eq!(session.matches.len(), 2);
    assert_eq!(notifier.code_count(), 0);
    assert!(desk.verify(&mut session, "123456").is_err());
    assert!(matches!(
        desk.select(&mut session, 999).await,
        Err(BookingError::NotFound { .. })
    ));

    desk.select(&mut session, john).await.unwrap();
    assert_eq!(session.step, LookupStep::Verify);
    assert_eq!(notifier.code_count(), 1);

    let code = notifier.last_code().unwrap();
    desk.verify(&mut session, &code).unwrap();
    assert_eq!(session.reservation.as_ref().unwrap().id, john);
}

#[tokio::test]
async fn test_check_out_charges_extras_and_departs() {
    let (store, jane, _) = seeded_store().await;
    let Desk { desk, payments, .. } = desk_with(store.clone());
    let mut session = desk.start_session(DeskFlow::CheckOut);
    desk.search(&mut session, &jane.to_string()).await.unwrap();

    let receipt = desk
        .check_out(
            &mut session,
            &[
                ExtraSelection {
                    extra_service_id: 1,
                    quantity: 1,
                },
                ExtraSelection {
                    extra_service_id: 4,
                    quantity: 1,
                },
            ],
            Some("pm_card_visa"),
            true,
        )
        .await
        .unwrap();

    assert_eq!(receipt.amount_charged, Decimal::from(15));
    assert_eq!(receipt.payment_reference.as_deref(), Some("pi_test_1"));
    assert_eq!(receipt.reservation.status, ReservationStatus::CheckedOut);
    assert_eq!(payments.intent_calls()[0].amount_minor_units, 1500);
    assert_eq!(
        store.find_reservation(jane).await.unwrap().unwrap().status,
        ReservationStatus::CheckedOut
    );
}

#[tokio::test]
async fn test_check_out_without_extras_takes_no_payment() {
    let (store, jane, _) = seeded_store().await;
    let Desk { desk, payments, .. } = desk_with(store);
    let mut session = desk.start_session(DeskFlow::CheckOut);
    desk.search(&mut session, &jane.to_string()).await.unwrap();

    let receipt = desk.check_out(&mut session, &[], None, true).await.unwrap();
    assert!(receipt.payment_reference.is_none());
    assert!(payments.intent_calls().is_empty());
}

#[tokio::test]
async fn test_check_out_status_failure_after_capture_is_reconciliation() {
    let inner = InMemoryReservationStore::new();
    let jane = inner
        .insert_reservation(&booked("P1", day(1), 2, "Jane Doe"))
        .await
        .unwrap();
    let Desk { desk, .. } = desk_with(Arc::new(FlakyStore::failing_status_updates(inner)));
    let mut session = desk.start_session(DeskFlow::CheckOut);
    desk.search(&mut session, &jane.to_string()).await.unwrap();

    let error = desk
        .check_out(
            &mut session,
            &[ExtraSelection {
                extra_service_id: 4,
                quantity: 1,
            }],
            Some("pm_card_visa"),
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::Reconciliation { .. }));
    assert_eq!(session.step, LookupStep::Halted);
    assert_eq!(
        session.halt.as_ref().unwrap().payment_reference.as_deref(),
        Some("pi_test_1")
    );
}

#[tokio::test]
async fn test_check_out_retry_after_lost_answer_charges_once() {
    let (store, jane, _) = seeded_store().await;
    let payments = Arc::new(ScriptedGateway::new(vec![Script::TimeoutAfterCapture]));
    let config = KioskConfig::default();
    let desk = ReservationDesk::new(
        inventory(),
        store.clone(),
        payments.clone(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(VerificationCodes::from_config(&config)),
        config,
    );
    let mut session = desk.start_session(DeskFlow::CheckOut);
    desk.search(&mut session, &jane.to_string()).await.unwrap();
    let bag = [ExtraSelection {
        extra_service_id: 4,
        quantity: 1,
    }];

    let error = desk
        .check_out(&mut session, &bag, Some("pm_card_visa"), true)
        .await
        .unwrap_err();
    assert!(error.is_retryable());
    assert_eq!(session.step, LookupStep::Action);
    assert_eq!(
        store.find_reservation(jane).await.unwrap().unwrap().status,
        ReservationStatus::Booked
    );

    let receipt = desk
        .check_out(&mut session, &bag, Some("pm_card_visa"), true)
        .await
        .unwrap();
    assert_eq!(receipt.payment_reference.as_deref(), Some("pi_test_1"));
    assert_eq!(receipt.reservation.status, ReservationStatus::CheckedOut);
    assert_eq!(payments.capture_count(), 1);

    let calls = payments.intent_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].idempotency_key, calls[1].idempotency_key);
}

#[tokio::test]
async fn test_manage_change_dates_revalidates() {
    let (store, jane, _) = seeded_store().await;
    store
        .insert_reservation(&booked("P1", day(5), 2, "Mary Major"))
        .await
        .unwrap();
    let Desk { desk, .. } = desk_with(store.clone());
    let mut session = desk.start_session(DeskFlow::Manage);
    desk.search(&mut session, &jane.to_string()).await.unwrap();

    // P1 is taken from day 5
    assert!(matches!(
        desk.change_dates(&mut session, day(3), 3).await,
        Err(BookingError::InvalidArgument(_))
    ));
    assert_eq!(session.step, LookupStep::Action);

    // Overlapping its own current stay is fine
    let moved = desk.change_dates(&mut session, day(2), 3).await.unwrap();
    assert_eq!(moved.start_date, day(2));
    assert_eq!(moved.end_date, day(5));
    assert_eq!(moved.total_price, Decimal::from(40));
    assert_eq!(session.step, LookupStep::Done);
}

#[tokio::test]
async fn test_manage_cancel_deletes() {
    let (store, jane, _) = seeded_store().await;
    let Desk { desk, .. } = desk_with(store.clone());
    let mut session = desk.start_session(DeskFlow::Manage);
    desk.search(&mut session, &jane.to_string()).await.unwrap();

    assert!(desk.check_in(&mut session).await.is_err());
    desk.cancel(&mut session).await.unwrap();
    assert!(store.find_reservation(jane).await.unwrap().is_none());
    assert_eq!(session.step, LookupStep::Done);
}

#[tokio::test]
async fn test_walk_up_payments() {
    let payments = Arc::new(ScriptedGateway::succeeding());
    let walk_up = WalkUpDesk::new(inventory(), payments.clone(), KioskConfig::default());

    let receipt = walk_up
        .pay_for_stay(
            &PastStayPayment {
                request_id: Uuid::new_v4(),
                site_type_id: "powered".to_string(),
                nights: 3,
                adult_count: 4,
                child_count: 1,
                extras: vec![],
            },
            "pm_card_visa",
        )
        .await
        .unwrap();
    assert_eq!(receipt.amount_charged, Decimal::from(90));
    assert_eq!(payments.intent_calls()[0].amount_minor_units, 9000);

    let too_many = PastStayPayment {
        request_id: Uuid::new_v4(),
        site_type_id: "powered".to_string(),
        nights: 1,
        adult_count: 6,
        child_count: 1,
        extras: vec![],
    };
    assert!(matches!(
        walk_up.pay_for_stay(&too_many, "pm_card_visa").await,
        Err(BookingError::InvalidArgument(_))
    ));

    let empty = ExtrasPurchase {
        request_id: Uuid::new_v4(),
        extras: vec![ExtraSelection {
            extra_service_id: 4,
            quantity: 0,
        }],
    };
    assert!(matches!(
        walk_up.purchase_extras(&empty, "pm_card_visa").await,
        Err(BookingError::InvalidArgument(_))
    ));

    let bags = ExtrasPurchase {
        request_id: Uuid::new_v4(),
        extras: vec![ExtraSelection {
            extra_service_id: 4,
            quantity: 2,
        }],
    };
    let receipt = walk_up.purchase_extras(&bags, "pm_card_visa").await.unwrap();
    assert_eq!(receipt.amount_charged, Decimal::from(20));
    assert!(receipt.quote.is_none());
    assert_eq!(payments.intent_calls().len(), 2);
}
