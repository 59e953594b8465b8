use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::bookings::{
        BookingResponse, BookingWithItems, CreateBookingRequest, SeatAvailability, SeatMapResponse,
        SeatState,
    },
    error::{AppError, AppResult},
    identity::RequestUser,
    entity::{
        booking_items::{
            self, ActiveModel as ItemActive, Column as ItemCol, Entity as BookingItems,
            Model as ItemModel,
        },
        bookings::{ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings, Model as BookingModel},
        seats::{Column as SeatCol, Entity as Seats, Model as SeatModel},
        trips::{ActiveModel as TripActive, Entity as Trips, Model as TripModel},
    },
    models::{
        Booking, BookingItem, BookingPaymentStatus, BookingStatus, PaymentMethod, TripStatus,
        TripSummary,
    },
    response::ApiResponse,
    services::{payment_service, seat_lock_service, voucher_service},
    state::AppState,
    vnpay,
};

/// Minimum lead time before departure for a user-triggered cancellation.
const CANCEL_CUTOFF_HOURS: i64 = 2;

/// True once the trip is too close to departure to cancel. Stored timestamps
/// carry the database offset, so normalize before doing arithmetic.
fn inside_cancel_cutoff(departure: DateTime<FixedOffset>, now: DateTime<Utc>) -> bool {
    departure.with_timezone(&Utc) - now < Duration::hours(CANCEL_CUTOFF_HOURS)
}

/// Load the trip under `FOR UPDATE`. Every booking-side transaction takes
/// this lock first; it is what serializes concurrent attempts on one trip.
pub async fn load_trip_for_update<C: ConnectionTrait>(
    conn: &C,
    trip_id: Uuid,
) -> AppResult<TripModel> {
    Trips::find_by_id(trip_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("trip"))
}

/// Resolve seat-map numbers to catalog rows for the trip's bus. Unknown or
/// inactive numbers are a caller error naming the offenders.
pub async fn resolve_seats<C: ConnectionTrait>(
    conn: &C,
    bus_id: Uuid,
    seat_numbers: &[String],
) -> AppResult<Vec<SeatModel>> {
    let seats = Seats::find()
        .filter(SeatCol::BusId.eq(bus_id))
        .filter(SeatCol::SeatNumber.is_in(seat_numbers.to_vec()))
        .filter(SeatCol::IsActive.eq(true))
        .all(conn)
        .await?;

    if seats.len() != seat_numbers.len() {
        let found: HashSet<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        let mut missing: Vec<&str> = seat_numbers
            .iter()
            .map(String::as_str)
            .filter(|n| !found.contains(n))
            .collect();
        missing.sort();
        return Err(AppError::Validation(format!(
            "Unknown seats for this bus: {}",
            missing.join(", ")
        )));
    }

    Ok(seats)
}

/// Seat numbers submitted more than once. The caller must fix its request;
/// silent dedupe would hide a client bug.
fn duplicate_seat_numbers(seat_numbers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups: Vec<String> = seat_numbers
        .iter()
        .filter(|n| !seen.insert(n.as_str()))
        .cloned()
        .collect();
    dups.sort();
    dups.dedup();
    dups
}

/// Resolved unit price for one seat. Falls back to the flat base price when
/// the multiplier is missing its meaning (non-finite or non-positive).
pub fn seat_price(base_price: i64, multiplier: f64) -> i64 {
    if multiplier.is_finite() && multiplier > 0.0 {
        (base_price as f64 * multiplier).round() as i64
    } else {
        base_price
    }
}

/// Availability ledger: take `count` seats off the trip's counter. The trip
/// row is already locked by the surrounding transaction.
pub async fn reserve_seats<C: ConnectionTrait>(
    conn: &C,
    trip: &TripModel,
    count: i32,
) -> AppResult<TripModel> {
    if trip.available_seats < count {
        return Err(AppError::Conflict(format!(
            "Not enough seats: {} requested, {} available",
            count, trip.available_seats
        )));
    }
    let mut active: TripActive = trip.clone().into();
    active.available_seats = Set(trip.available_seats - count);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Availability ledger: hand `count` seats back, clamped at total capacity so
/// duplicate releases can never overshoot.
pub async fn release_seats<C: ConnectionTrait>(
    conn: &C,
    trip: &TripModel,
    count: i32,
) -> AppResult<()> {
    let restored = (trip.available_seats + count).min(trip.total_seats);
    let mut active: TripActive = trip.clone().into();
    active.available_seats = Set(restored);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

/// Seats among `seat_ids` already committed to a CONFIRMED or COMPLETED
/// booking on this trip.
async fn committed_seat_overlap<C: ConnectionTrait>(
    conn: &C,
    trip_id: Uuid,
    seat_ids: &[Uuid],
    for_update: bool,
) -> AppResult<Vec<String>> {
    let holding = [
        BookingStatus::Confirmed.as_str(),
        BookingStatus::Completed.as_str(),
    ];
    let mut finder = BookingItems::find()
        .join(JoinType::InnerJoin, booking_items::Relation::Bookings.def())
        .filter(BookingCol::TripId.eq(trip_id))
        .filter(BookingCol::Status.is_in(holding))
        .filter(ItemCol::SeatId.is_in(seat_ids.to_vec()));
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    let rows = finder.all(conn).await?;

    let mut numbers: Vec<String> = rows.into_iter().map(|r| r.seat_number).collect();
    numbers.sort();
    numbers.dedup();
    Ok(numbers)
}

pub(crate) fn code_with_prefix(prefix: &str, id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = id.to_string();
    let short = &suffix[..8];
    format!("{prefix}-{date}-{short}")
}

/// The booking transaction: validate, price, reserve, persist — one atomic
/// unit serialized on the trip row.
pub async fn create_booking(
    state: &AppState,
    user: &RequestUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<BookingResponse>> {
    if payload.seat_numbers.is_empty() {
        return Err(AppError::Validation("At least one seat is required".into()));
    }
    let dups = duplicate_seat_numbers(&payload.seat_numbers);
    if !dups.is_empty() {
        return Err(AppError::Validation(format!(
            "Duplicate seats in request: {}",
            dups.join(", ")
        )));
    }
    if payload.passenger_name.trim().is_empty() || payload.passenger_phone.trim().is_empty() {
        return Err(AppError::Validation(
            "Passenger name and phone are required".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let trip = load_trip_for_update(&txn, payload.trip_id).await?;
    let now = Utc::now();

    if TripStatus::parse(&trip.status) == Some(TripStatus::Cancelled) {
        return Err(AppError::Conflict("Trip has been cancelled".into()));
    }
    if trip.departure_time <= now {
        return Err(AppError::Conflict("Trip has already departed".into()));
    }

    let seat_count = payload.seat_numbers.len() as i32;
    if seat_count > trip.available_seats {
        return Err(AppError::Conflict(format!(
            "Not enough seats: {} requested, {} available",
            seat_count, trip.available_seats
        )));
    }

    let seats = resolve_seats(&txn, trip.bus_id, &payload.seat_numbers).await?;
    let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

    // Advisory holds by other checkouts.
    let locks = seat_lock_service::find_locks(&txn, trip.id, &seat_ids, true).await?;
    let blocked = seat_lock_service::blocked_seat_numbers(&locks, &seats, user.user_id, now);
    if !blocked.is_empty() {
        return Err(AppError::Conflict(format!(
            "Seats currently held by another checkout: {}",
            blocked.join(", ")
        )));
    }

    // Committed bookings. The count bound above is not enough: two requests
    // for different specific seats may still overlap each other.
    let overlap = committed_seat_overlap(&txn, trip.id, &seat_ids, true).await?;
    if !overlap.is_empty() {
        return Err(AppError::Conflict(format!(
            "Seats already booked: {}",
            overlap.join(", ")
        )));
    }

    let order_amount: i64 = seats
        .iter()
        .map(|s| seat_price(trip.base_price, s.price_multiplier))
        .sum();
    if order_amount <= 0 {
        return Err(AppError::Validation(
            "Computed order amount is not positive".into(),
        ));
    }

    let (voucher, discount) = match payload.voucher_code.as_deref() {
        Some(code) => {
            let decision = voucher_service::validate(
                &txn,
                code,
                trip.company_id,
                order_amount,
                user.user_id,
                true,
                true,
            )
            .await?;
            match decision {
                Ok(valid) => (Some(valid.voucher), valid.discount),
                Err(rejection) => return Err(rejection.into_error()),
            }
        }
        None => (None, 0),
    };
    let payable_amount = (order_amount - discount).max(0);

    let booking_id = Uuid::new_v4();
    let mut display: Vec<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
    display.sort();
    let seats_display = display.join(",");

    let booking = BookingActive {
        id: Set(booking_id),
        booking_code: Set(code_with_prefix("BK", booking_id)),
        user_id: Set(user.user_id),
        trip_id: Set(trip.id),
        company_id: Set(trip.company_id),
        passenger_name: Set(payload.passenger_name.trim().to_string()),
        passenger_phone: Set(payload.passenger_phone.trim().to_string()),
        passenger_email: Set(payload.passenger_email.clone()),
        total_price: Set(order_amount),
        discount_amount: Set(discount),
        voucher_id: Set(voucher.as_ref().map(|v| v.id)),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        payment_status: Set(BookingPaymentStatus::Pending.as_str().to_string()),
        status: Set(BookingStatus::Confirmed.as_str().to_string()),
        seats_display: Set(seats_display),
        notes: Set(payload.notes.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<BookingItem> = Vec::with_capacity(seats.len());
    for seat in &seats {
        let item = ItemActive {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking.id),
            seat_id: Set(seat.id),
            seat_number: Set(seat.seat_number.clone()),
            price: Set(seat_price(trip.base_price, seat.price_multiplier)),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(booking_item_from_entity(item));
    }

    let trip = reserve_seats(&txn, &trip, seat_count).await?;
    seat_lock_service::release_for_holder(&txn, trip.id, &seat_ids, user.user_id).await?;

    if let Some(v) = &voucher {
        voucher_service::record_usage(&txn, v, booking.id, user.user_id, discount).await?;
    }

    let payment = payment_service::create_pending_payment(
        &txn,
        &booking,
        payable_amount,
        discount,
        payload.payment_method,
    )
    .await?;

    let gateway_order_id = if payload.payment_method == PaymentMethod::Vnpay {
        Some(payment_service::create_gateway_transaction(&txn, &payment).await?)
    } else {
        None
    };

    txn.commit().await?;

    let booking = booking_from_entity(booking);
    let payment = payment_service::payment_from_entity(payment);

    // Post-commit, best-effort: a failed notification never unwinds the
    // committed booking.
    if let Err(err) = state
        .notifier
        .booking_confirmed(&booking, booking.passenger_email.as_deref())
        .await
    {
        tracing::warn!(error = %err, booking_code = %booking.booking_code, "booking notification failed");
    }

    let qr_payload = (payload.payment_method == PaymentMethod::BankTransfer).then(|| {
        format!(
            "VIETQR|{}|{}|{}",
            booking.booking_code, payment.payment_code, payment.amount
        )
    });
    let pay_url = gateway_order_id.map(|order_id| {
        vnpay::build_payment_url(
            &state.vnpay,
            &order_id,
            payment.amount,
            &format!("Thanh toan ve xe {}", booking.booking_code),
            "127.0.0.1",
            Utc::now(),
        )
    });

    Ok(ApiResponse::success(
        "Booking created",
        BookingResponse {
            booking,
            items,
            payment,
            trip: trip_summary_from_entity(trip),
            qr_payload,
            pay_url,
        },
        None,
    ))
}

/// User-triggered cancellation, allowed until two hours before departure.
pub async fn cancel_booking(
    state: &AppState,
    user: &RequestUser,
    booking_id: Uuid,
) -> AppResult<ApiResponse<BookingWithItems>> {
    let txn = state.orm.begin().await?;

    // Resolve the trip id first so the trip lock is taken before the booking
    // lock, in the same order as create_booking.
    let probe = Bookings::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    let trip = load_trip_for_update(&txn, probe.trip_id).await?;

    let booking = Bookings::find_by_id(booking_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("booking"))?;

    // Bookings tied to an account may only be cancelled by that account.
    // Guest bookings carry no owner; the booking id is their credential.
    if booking.user_id.is_some() && booking.user_id != user.user_id {
        return Err(AppError::Validation(
            "Booking belongs to another account".into(),
        ));
    }

    match BookingStatus::parse(&booking.status) {
        Some(BookingStatus::Cancelled) => {
            return Err(AppError::Validation("Booking is already cancelled".into()));
        }
        Some(BookingStatus::Completed) => {
            return Err(AppError::Validation(
                "Completed bookings cannot be cancelled".into(),
            ));
        }
        _ => {}
    }

    let now = Utc::now();
    if inside_cancel_cutoff(trip.departure_time, now) {
        return Err(AppError::Validation(format!(
            "Bookings can only be cancelled at least {CANCEL_CUTOFF_HOURS} hours before departure"
        )));
    }

    let items = BookingItems::find()
        .filter(ItemCol::BookingId.eq(booking.id))
        .all(&txn)
        .await?;
    release_seats(&txn, &trip, items.len() as i32).await?;

    let was_paid =
        BookingPaymentStatus::parse(&booking.payment_status) == Some(BookingPaymentStatus::Paid);
    let next_payment_status = if was_paid {
        BookingPaymentStatus::Refunded
    } else {
        BookingPaymentStatus::Cancelled
    };

    let mut active: BookingActive = booking.into();
    active.status = Set(BookingStatus::Cancelled.as_str().to_string());
    active.payment_status = Set(next_payment_status.as_str().to_string());
    active.updated_at = Set(now.into());
    let booking = active.update(&txn).await?;

    payment_service::cancel_pending_for_booking(&txn, booking.id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Booking cancelled",
        BookingWithItems {
            booking: booking_from_entity(booking),
            items: items.into_iter().map(booking_item_from_entity).collect(),
        },
        None,
    ))
}

pub async fn get_booking(
    state: &AppState,
    booking_id: Uuid,
) -> AppResult<ApiResponse<BookingWithItems>> {
    let booking = Bookings::find_by_id(booking_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    booking_with_items(state, booking).await
}

/// Guest retrieval path: a booking code is the shareable handle a guest gets
/// in their confirmation.
pub async fn get_booking_by_code(
    state: &AppState,
    code: &str,
) -> AppResult<ApiResponse<BookingWithItems>> {
    let booking = Bookings::find()
        .filter(BookingCol::BookingCode.eq(code))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    booking_with_items(state, booking).await
}

async fn booking_with_items(
    state: &AppState,
    booking: BookingModel,
) -> AppResult<ApiResponse<BookingWithItems>> {
    let items = BookingItems::find()
        .filter(ItemCol::BookingId.eq(booking.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(booking_item_from_entity)
        .collect();

    Ok(ApiResponse::ok(BookingWithItems {
        booking: booking_from_entity(booking),
        items,
    }))
}

/// Read-only seat map: catalog seats flagged free, held, or booked.
pub async fn trip_seat_map(state: &AppState, trip_id: Uuid) -> AppResult<ApiResponse<SeatMapResponse>> {
    let trip = Trips::find_by_id(trip_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("trip"))?;

    let seats = Seats::find()
        .filter(SeatCol::BusId.eq(trip.bus_id))
        .filter(SeatCol::IsActive.eq(true))
        .all(&state.orm)
        .await?;
    let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

    let now = Utc::now();
    let locks = seat_lock_service::find_locks(&state.orm, trip.id, &seat_ids, false).await?;
    let locked_ids: HashSet<Uuid> = locks
        .iter()
        .filter(|l| seat_lock_service::is_valid(l, now))
        .map(|l| l.seat_id)
        .collect();

    let booked = committed_seat_overlap(&state.orm, trip.id, &seat_ids, false).await?;
    let booked: HashSet<String> = booked.into_iter().collect();

    let mut out: Vec<SeatAvailability> = seats
        .into_iter()
        .map(|s| {
            let state = if booked.contains(&s.seat_number) {
                SeatState::Booked
            } else if locked_ids.contains(&s.id) {
                SeatState::Locked
            } else {
                SeatState::Free
            };
            SeatAvailability {
                seat_id: s.id,
                seat_number: s.seat_number,
                seat_type: s.seat_type,
                price: seat_price(trip.base_price, s.price_multiplier),
                state,
            }
        })
        .collect();
    out.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));

    Ok(ApiResponse::ok(SeatMapResponse {
        trip: trip_summary_from_entity(trip),
        seats: out,
    }))
}

pub fn booking_from_entity(model: BookingModel) -> Booking {
    Booking {
        id: model.id,
        booking_code: model.booking_code,
        user_id: model.user_id,
        trip_id: model.trip_id,
        company_id: model.company_id,
        passenger_name: model.passenger_name,
        passenger_phone: model.passenger_phone,
        passenger_email: model.passenger_email,
        total_price: model.total_price,
        discount_amount: model.discount_amount,
        voucher_id: model.voucher_id,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        status: model.status,
        seats_display: model.seats_display,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn booking_item_from_entity(model: ItemModel) -> BookingItem {
    BookingItem {
        id: model.id,
        booking_id: model.booking_id,
        seat_id: model.seat_id,
        seat_number: model.seat_number,
        price: model.price,
    }
}

pub fn trip_summary_from_entity(model: TripModel) -> TripSummary {
    TripSummary {
        id: model.id,
        company_id: model.company_id,
        bus_id: model.bus_id,
        departure_time: model.departure_time.with_timezone(&Utc),
        arrival_time: model.arrival_time.with_timezone(&Utc),
        base_price: model.base_price,
        total_seats: model.total_seats,
        available_seats: model.available_seats,
        status: model.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_price_applies_multiplier() {
        assert_eq!(seat_price(100_000, 1.5), 150_000);
        assert_eq!(seat_price(100_000, 1.0), 100_000);
    }

    #[test]
    fn seat_price_falls_back_on_bad_multiplier() {
        assert_eq!(seat_price(100_000, 0.0), 100_000);
        assert_eq!(seat_price(100_000, -2.0), 100_000);
        assert_eq!(seat_price(100_000, f64::NAN), 100_000);
        assert_eq!(seat_price(100_000, f64::INFINITY), 100_000);
    }

    #[test]
    fn duplicates_are_reported_once_each() {
        let input = vec![
            "A1".to_string(),
            "A2".to_string(),
            "A1".to_string(),
            "A1".to_string(),
        ];
        assert_eq!(duplicate_seat_numbers(&input), vec!["A1".to_string()]);
        assert!(duplicate_seat_numbers(&["A1".to_string(), "A2".to_string()]).is_empty());
    }

    #[test]
    fn cancel_cutoff_survives_offset_timestamps() {
        let now = Utc::now();
        let saigon = FixedOffset::east_opt(7 * 3600).unwrap();
        assert!(!inside_cancel_cutoff(
            (now + Duration::hours(3)).with_timezone(&saigon),
            now
        ));
        assert!(inside_cancel_cutoff(
            (now + Duration::hours(1)).with_timezone(&saigon),
            now
        ));
        assert!(inside_cancel_cutoff(
            (now - Duration::minutes(5)).with_timezone(&saigon),
            now
        ));
    }

    #[test]
    fn generated_codes_carry_prefix_and_date() {
        let id = Uuid::new_v4();
        let code = code_with_prefix("BK", id);
        assert!(code.starts_with("BK-"));
        assert_eq!(code.len(), "BK-".len() + 8 + 1 + 8);
    }
}
