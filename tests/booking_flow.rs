use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, Statement};
use uuid::Uuid;

use bus_booking_api::{
    config::VnpayConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{bookings::CreateBookingRequest, payments::ProcessPaymentRequest},
    entity::{
        booking_items::{Column as ItemCol, Entity as BookingItems},
        bookings::{Column as BookingCol, Entity as Bookings},
        invoices::{Column as InvoiceCol, Entity as Invoices},
        seats::ActiveModel as SeatActive,
        trips::{ActiveModel as TripActive, Entity as Trips, Model as TripModel},
        vnpay_transactions::{Column as VnpayTxnCol, Entity as VnpayTransactions},
        voucher_usages::{Column as UsageCol, Entity as VoucherUsages},
        vouchers::{ActiveModel as VoucherActive, Entity as Vouchers},
    },
    error::AppError,
    identity::RequestUser,
    models::{PaymentMethod, PaymentStatus},
    notify::LogNotifier,
    services::{booking_service, payment_service, vnpay_service},
    state::AppState,
    vnpay::{self, GatewayQueryResponse, VnpayGateway},
};

// Gateway stand-in that reports whatever the test scripted.
struct FakeGateway {
    response_code: String,
    transaction_status: String,
}

#[async_trait]
impl VnpayGateway for FakeGateway {
    async fn query_transaction(
        &self,
        _order_id: &str,
        _transaction_date: chrono::DateTime<Utc>,
    ) -> anyhow::Result<GatewayQueryResponse> {
        Ok(GatewayQueryResponse {
            response_code: self.response_code.clone(),
            transaction_status: Some(self.transaction_status.clone()),
            transaction_no: Some("14212890".to_string()),
            amount: None,
            message: None,
        })
    }
}

fn test_vnpay_config() -> VnpayConfig {
    VnpayConfig {
        tmn_code: "TESTTMN1".to_string(),
        hash_secret: "TESTSECRETTESTSECRET".to_string(),
        pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
        api_url: "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction".to_string(),
        return_url: "http://localhost:3000/api/payments/vnpay/return".to_string(),
        request_timeout: StdDuration::from_secs(5),
    }
}

async fn setup_state(gateway: Arc<dyn VnpayGateway>) -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payment_logs, vnpay_transactions, invoices, voucher_usages, payments, booking_items, bookings, seat_locks, vouchers, seats, trips RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(Some(AppState {
        pool,
        orm,
        vnpay: test_vnpay_config(),
        gateway,
        notifier: Arc::new(LogNotifier),
    }))
}

async fn seed_trip(
    state: &AppState,
    total_seats: i32,
    available_seats: i32,
    departs_in: Duration,
    base_price: i64,
    seat_numbers: &[&str],
) -> anyhow::Result<TripModel> {
    let bus_id = Uuid::new_v4();
    let now = Utc::now();
    let trip = TripActive {
        id: Set(Uuid::new_v4()),
        company_id: Set(Uuid::new_v4()),
        bus_id: Set(bus_id),
        departure_time: Set((now + departs_in).into()),
        arrival_time: Set((now + departs_in + Duration::hours(4)).into()),
        base_price: Set(base_price),
        total_seats: Set(total_seats),
        available_seats: Set(available_seats),
        status: Set("SCHEDULED".to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    for number in seat_numbers {
        SeatActive {
            id: Set(Uuid::new_v4()),
            bus_id: Set(bus_id),
            seat_number: Set(number.to_string()),
            seat_type: Set("STANDARD".to_string()),
            price_multiplier: Set(1.0),
            is_active: Set(true),
        }
        .insert(&state.orm)
        .await?;
    }

    Ok(trip)
}

fn booking_request(trip_id: Uuid, seats: &[&str], method: PaymentMethod) -> CreateBookingRequest {
    CreateBookingRequest {
        trip_id,
        seat_numbers: seats.iter().map(|s| s.to_string()).collect(),
        passenger_name: "Nguyen Van A".to_string(),
        passenger_phone: "+84901234567".to_string(),
        passenger_email: Some("a@example.com".to_string()),
        payment_method: method,
        voucher_code: None,
        notes: None,
    }
}

async fn reload_trip(state: &AppState, id: Uuid) -> anyhow::Result<TripModel> {
    Ok(Trips::find_by_id(id).one(&state.orm).await?.expect("trip"))
}

// Book, settle manually, and verify the availability counter, the PAID
// cascade, and that re-settling the same payment stays a no-op.
#[tokio::test]
async fn checkout_settle_and_idempotent_success() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };

    let trip = seed_trip(
        &state,
        40,
        40,
        Duration::hours(24),
        150_000,
        &["A1", "A2", "A3", "A4"],
    )
    .await?;

    let user = RequestUser {
        user_id: Some(Uuid::new_v4()),
    };
    let resp = booking_service::create_booking(
        &state,
        &user,
        booking_request(trip.id, &["A1", "A2"], PaymentMethod::Cash),
    )
    .await?;
    let data = resp.data.unwrap();
    assert_eq!(data.booking.total_price, 300_000);
    assert_eq!(data.payment.amount, 300_000);
    assert_eq!(data.payment.status, "PENDING");
    assert_eq!(data.items.len(), 2);
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 38);

    // Manual settlement.
    let paid = payment_service::process_payment(
        &state,
        ProcessPaymentRequest {
            payment_id: Some(data.payment.id),
            booking_id: None,
            amount: 300_000,
            payment_method: PaymentMethod::Cash,
        },
    )
    .await?;
    assert_eq!(paid.data.unwrap().payment.status, "SUCCESS");

    let booking = booking_service::get_booking(&state, data.booking.id)
        .await?
        .data
        .unwrap()
        .booking;
    assert_eq!(booking.payment_status, "PAID");

    // Second settlement of the same payment: success, no second invoice.
    payment_service::process_payment(
        &state,
        ProcessPaymentRequest {
            payment_id: Some(data.payment.id),
            booking_id: None,
            amount: 300_000,
            payment_method: PaymentMethod::Cash,
        },
    )
    .await?;

    let invoices = Invoices::find()
        .filter(InvoiceCol::PaymentId.eq(data.payment.id))
        .all(&state.orm)
        .await?;
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].status, "ISSUED");

    // Bank transfer bookings carry a QR payload instead of a gateway URL.
    let transfer = booking_service::create_booking(
        &state,
        &user,
        booking_request(trip.id, &["A3"], PaymentMethod::BankTransfer),
    )
    .await?
    .data
    .unwrap();
    let qr = transfer.qr_payload.expect("qr payload");
    assert_eq!(
        qr,
        format!(
            "VIETQR|{}|{}|{}",
            transfer.booking.booking_code, transfer.payment.payment_code, transfer.payment.amount
        )
    );
    assert!(transfer.pay_url.is_none());

    Ok(())
}

// Sell-out scenario: 2 seats left. A three-seat request must bounce without
// touching the counter; the exact remaining seats then sell; a retry on a
// sold seat names it.
#[tokio::test]
async fn seat_conflicts_name_the_blocked_seats() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };

    let trip = seed_trip(
        &state,
        40,
        2,
        Duration::hours(24),
        100_000,
        &["A1", "A2", "A3"],
    )
    .await?;
    let user = RequestUser { user_id: None };

    let err = booking_service::create_booking(
        &state,
        &user,
        booking_request(trip.id, &["A1", "A2", "A3"], PaymentMethod::Cash),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(err.to_string().contains("2 available"));
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 2);

    booking_service::create_booking(
        &state,
        &user,
        booking_request(trip.id, &["A1", "A2"], PaymentMethod::Cash),
    )
    .await?;
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 0);

    let err = booking_service::create_booking(
        &state,
        &user,
        booking_request(trip.id, &["A1"], PaymentMethod::Cash),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn duplicate_seats_are_a_caller_error() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };

    let trip = seed_trip(&state, 40, 40, Duration::hours(24), 100_000, &["A1", "A2"]).await?;
    let err = booking_service::create_booking(
        &state,
        &RequestUser { user_id: None },
        booking_request(trip.id, &["A1", "A1"], PaymentMethod::Cash),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.to_string().contains("A1"));
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 40);

    Ok(())
}

// Cancellation is allowed at 3 hours out and refused at 1 hour out; released
// seats go back into the counter.
#[tokio::test]
async fn cancellation_cutoff_and_seat_release() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };
    let user = RequestUser {
        user_id: Some(Uuid::new_v4()),
    };

    // Too close to departure.
    let near_trip = seed_trip(&state, 40, 40, Duration::hours(1), 100_000, &["A1"]).await?;
    let near = booking_service::create_booking(
        &state,
        &user,
        booking_request(near_trip.id, &["A1"], PaymentMethod::Cash),
    )
    .await?
    .data
    .unwrap();
    let err = booking_service::cancel_booking(&state, &user, near.booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Comfortably before departure.
    let far_trip = seed_trip(&state, 40, 40, Duration::hours(3), 100_000, &["A1", "A2"]).await?;
    let far = booking_service::create_booking(
        &state,
        &user,
        booking_request(far_trip.id, &["A1", "A2"], PaymentMethod::Cash),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(reload_trip(&state, far_trip.id).await?.available_seats, 38);

    // Someone else's account cannot cancel an owned booking.
    let stranger = RequestUser {
        user_id: Some(Uuid::new_v4()),
    };
    let err = booking_service::cancel_booking(&state, &stranger, far.booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(reload_trip(&state, far_trip.id).await?.available_seats, 38);

    let cancelled = booking_service::cancel_booking(&state, &user, far.booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.booking.status, "CANCELLED");
    assert_eq!(cancelled.booking.payment_status, "CANCELLED");
    assert_eq!(reload_trip(&state, far_trip.id).await?.available_seats, 40);

    // A second cancel attempt is rejected and cannot overshoot the counter.
    let err = booking_service::cancel_booking(&state, &user, far.booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(reload_trip(&state, far_trip.id).await?.available_seats, 40);

    Ok(())
}

// A voucher with usage_limit = 1 redeems once; the follow-up attempt loses
// with a usage-cap conflict and the percent discount is capped by
// max_discount.
#[tokio::test]
async fn voucher_caps_and_discount_math() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };

    let trip = seed_trip(
        &state,
        40,
        40,
        Duration::hours(24),
        500_000,
        &["A1", "A2", "A3", "A4"],
    )
    .await?;

    VoucherActive {
        id: Set(Uuid::new_v4()),
        code: Set("SALE10".to_string()),
        company_id: Set(Some(trip.company_id)),
        discount_type: Set("PERCENT".to_string()),
        discount_value: Set(10),
        min_order_value: Set(None),
        max_discount: Set(Some(50_000)),
        start_date: Set(None),
        end_date: Set(None),
        usage_limit: Set(Some(1)),
        usage_per_user: Set(None),
        used_count: Set(0),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut req = booking_request(trip.id, &["A1", "A2"], PaymentMethod::Cash);
    req.voucher_code = Some("SALE10".to_string());
    let first = booking_service::create_booking(&state, &RequestUser { user_id: None }, req)
        .await?
        .data
        .unwrap();
    // 10% of 1,000,000 capped at 50,000.
    assert_eq!(first.booking.total_price, 1_000_000);
    assert_eq!(first.booking.discount_amount, 50_000);
    assert_eq!(first.payment.amount, 950_000);

    let mut req = booking_request(trip.id, &["A3"], PaymentMethod::Cash);
    req.voucher_code = Some("SALE10".to_string());
    let err = booking_service::create_booking(&state, &RequestUser { user_id: None }, req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(err.to_string().contains("usage limit"));

    Ok(())
}

// Two simultaneous requests fight over seat A2. The trip-row lock serializes
// them: exactly one commits and the committed seat sets stay disjoint.
#[tokio::test]
async fn simultaneous_overlapping_bookings_stay_disjoint() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };
    let trip = seed_trip(
        &state,
        40,
        40,
        Duration::hours(24),
        100_000,
        &["A1", "A2", "A3"],
    )
    .await?;

    let mut handles = Vec::new();
    for seats in [["A1", "A2"], ["A2", "A3"]] {
        let state = state.clone();
        let trip_id = trip.id;
        handles.push(tokio::spawn(async move {
            booking_service::create_booking(
                &state,
                &RequestUser {
                    user_id: Some(Uuid::new_v4()),
                },
                booking_request(trip_id, &seats, PaymentMethod::Cash),
            )
            .await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => won += 1,
            Err(AppError::Conflict(_)) => lost += 1,
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!((won, lost), (1, 1));
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 38);

    // Exactly one booking's two seats made it in, with no seat twice.
    let winners = Bookings::find()
        .filter(BookingCol::TripId.eq(trip.id))
        .all(&state.orm)
        .await?;
    assert_eq!(winners.len(), 1);
    let mut committed: Vec<String> = BookingItems::find()
        .filter(ItemCol::BookingId.eq(winners[0].id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|item| item.seat_number)
        .collect();
    assert_eq!(committed.len(), 2);
    committed.sort();
    committed.dedup();
    assert_eq!(committed.len(), 2);

    Ok(())
}

// Three checkouts race one remaining redemption of a voucher. The voucher
// row lock lets exactly one through; the others roll back whole.
#[tokio::test]
async fn simultaneous_redemptions_stop_at_the_usage_cap() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };
    let trip = seed_trip(
        &state,
        40,
        40,
        Duration::hours(24),
        500_000,
        &["A1", "A2", "A3"],
    )
    .await?;

    let voucher = VoucherActive {
        id: Set(Uuid::new_v4()),
        code: Set("LASTONE".to_string()),
        company_id: Set(Some(trip.company_id)),
        discount_type: Set("AMOUNT".to_string()),
        discount_value: Set(50_000),
        min_order_value: Set(None),
        max_discount: Set(None),
        start_date: Set(None),
        end_date: Set(None),
        usage_limit: Set(Some(1)),
        usage_per_user: Set(None),
        used_count: Set(0),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut handles = Vec::new();
    for seat in ["A1", "A2", "A3"] {
        let state = state.clone();
        let trip_id = trip.id;
        handles.push(tokio::spawn(async move {
            let mut req = booking_request(trip_id, &[seat], PaymentMethod::Cash);
            req.voucher_code = Some("LASTONE".to_string());
            booking_service::create_booking(
                &state,
                &RequestUser {
                    user_id: Some(Uuid::new_v4()),
                },
                req,
            )
            .await
        }));
    }

    let mut redeemed = 0;
    let mut capped = 0;
    for handle in handles {
        match handle.await? {
            Ok(resp) => {
                assert_eq!(resp.data.unwrap().booking.discount_amount, 50_000);
                redeemed += 1;
            }
            Err(AppError::Conflict(message)) => {
                assert!(message.contains("usage limit"));
                capped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!((redeemed, capped), (1, 2));

    let fresh = Vouchers::find_by_id(voucher.id)
        .one(&state.orm)
        .await?
        .expect("voucher");
    assert_eq!(fresh.used_count, 1);
    let usages = VoucherUsages::find()
        .filter(UsageCol::VoucherId.eq(voucher.id))
        .count(&state.orm)
        .await?;
    assert_eq!(usages, 1);
    // Only the winning single-seat booking took a seat.
    assert_eq!(reload_trip(&state, trip.id).await?.available_seats, 39);

    Ok(())
}

// IPN: signed confirmation settles the payment, a replay answers the
// already-confirmed code without side effects, tampering is refused.
#[tokio::test]
async fn ipn_settles_once_and_rejects_bad_input() -> anyhow::Result<()> {
    let Some(state) = setup_state(Arc::new(LoggedOutGateway)).await? else {
        return Ok(());
    };

    let trip = seed_trip(&state, 40, 40, Duration::hours(24), 200_000, &["A1"]).await?;
    let booked = booking_service::create_booking(
        &state,
        &RequestUser { user_id: None },
        booking_request(trip.id, &["A1"], PaymentMethod::Vnpay),
    )
    .await?
    .data
    .unwrap();
    assert!(booked.pay_url.is_some());

    let record = VnpayTransactions::find()
        .filter(VnpayTxnCol::PaymentId.eq(booked.payment.id))
        .one(&state.orm)
        .await?
        .expect("gateway transaction");

    let mut params = BTreeMap::new();
    params.insert("vnp_TxnRef".to_string(), record.order_id.clone());
    params.insert("vnp_Amount".to_string(), (record.amount * 100).to_string());
    params.insert("vnp_ResponseCode".to_string(), "00".to_string());
    params.insert("vnp_TransactionNo".to_string(), "14212890".to_string());
    let hash = vnpay::sign_params(&state.vnpay.hash_secret, &params);
    params.insert("vnp_SecureHash".to_string(), hash);

    let resp = vnpay_service::handle_ipn(&state, params.clone()).await;
    assert_eq!(resp.rsp_code, "00");

    let payment = payment_service::get_payment(&state, booked.payment.id)
        .await?
        .data
        .unwrap()
        .payment;
    assert_eq!(
        PaymentStatus::parse(&payment.status),
        Some(PaymentStatus::Success)
    );

    // Replay of the same IPN.
    let resp = vnpay_service::handle_ipn(&state, params.clone()).await;
    assert_eq!(resp.rsp_code, "02");
    let invoice_count = Invoices::find()
        .filter(InvoiceCol::PaymentId.eq(booked.payment.id))
        .count(&state.orm)
        .await?;
    assert_eq!(invoice_count, 1);

    // Tampered signature.
    let mut tampered = params.clone();
    tampered.insert("vnp_Amount".to_string(), "1".to_string());
    let resp = vnpay_service::handle_ipn(&state, tampered).await;
    assert_eq!(resp.rsp_code, "97");

    // A late Return redirect carrying a failure code lands after settlement:
    // the user still gets the confirmed outcome, not an error.
    let mut late_return = BTreeMap::new();
    late_return.insert("vnp_TxnRef".to_string(), record.order_id.clone());
    late_return.insert("vnp_Amount".to_string(), (record.amount * 100).to_string());
    late_return.insert("vnp_ResponseCode".to_string(), "24".to_string());
    let hash = vnpay::sign_params(&state.vnpay.hash_secret, &late_return);
    late_return.insert("vnp_SecureHash".to_string(), hash);
    let outcome = vnpay_service::handle_return(&state, late_return)
        .await?
        .data
        .unwrap();
    assert!(outcome.success);
    assert!(outcome.message.contains("already confirmed"));
    let payment = payment_service::get_payment(&state, booked.payment.id)
        .await?
        .data
        .unwrap()
        .payment;
    assert_eq!(payment.status, "SUCCESS");

    // Signed but wrong amount.
    let mut wrong_amount = BTreeMap::new();
    wrong_amount.insert("vnp_TxnRef".to_string(), record.order_id.clone());
    wrong_amount.insert("vnp_Amount".to_string(), "123400".to_string());
    wrong_amount.insert("vnp_ResponseCode".to_string(), "00".to_string());
    let hash = vnpay::sign_params(&state.vnpay.hash_secret, &wrong_amount);
    wrong_amount.insert("vnp_SecureHash".to_string(), hash);
    let resp = vnpay_service::handle_ipn(&state, wrong_amount).await;
    assert_eq!(resp.rsp_code, "04");

    Ok(())
}

// Query reconciliation catches up a payment the gateway settled but we never
// heard about.
#[tokio::test]
async fn query_sync_applies_missed_confirmation() -> anyhow::Result<()> {
    let gateway = Arc::new(FakeGateway {
        response_code: "00".to_string(),
        transaction_status: "00".to_string(),
    });
    let Some(state) = setup_state(gateway).await? else {
        return Ok(());
    };

    let trip = seed_trip(&state, 40, 40, Duration::hours(24), 200_000, &["A1"]).await?;
    let booked = booking_service::create_booking(
        &state,
        &RequestUser { user_id: None },
        booking_request(trip.id, &["A1"], PaymentMethod::Vnpay),
    )
    .await?
    .data
    .unwrap();

    let record = VnpayTransactions::find()
        .filter(VnpayTxnCol::PaymentId.eq(booked.payment.id))
        .one(&state.orm)
        .await?
        .expect("gateway transaction");

    let result = vnpay_service::query_and_sync(&state, &record.order_id)
        .await?
        .data
        .unwrap();
    assert!(result.updated);
    assert_eq!(result.local_status, "SUCCESS");

    // Re-query: local state is already caught up.
    let again = vnpay_service::query_and_sync(&state, &record.order_id)
        .await?
        .data
        .unwrap();
    assert!(!again.updated);
    assert_eq!(again.local_status, "SUCCESS");

    Ok(())
}

// Gateway stub for tests that never reach the gateway.
struct LoggedOutGateway;

#[async_trait]
impl VnpayGateway for LoggedOutGateway {
    async fn query_transaction(
        &self,
        _order_id: &str,
        _transaction_date: chrono::DateTime<Utc>,
    ) -> anyhow::Result<GatewayQueryResponse> {
        anyhow::bail!("gateway not available in this test")
    }
}
