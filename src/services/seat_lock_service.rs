use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::seat_locks::{AcquireSeatLocksRequest, ReleaseSeatLocksRequest, SeatLockView, SeatLocksResponse},
    error::{AppError, AppResult},
    identity::RequestUser,
    entity::{
        seat_locks::{ActiveModel as LockActive, Column as LockCol, Entity as SeatLocks, Model as LockModel},
        seats::Model as SeatModel,
    },
    response::ApiResponse,
    state::AppState,
};

use super::booking_service::{load_trip_for_update, resolve_seats};

const MIN_TTL_SECS: i64 = 30;
const MAX_TTL_SECS: i64 = 900;
const DEFAULT_TTL_SECS: i64 = 600;

/// A lock only counts while unexpired; stale rows are invisible to every
/// conflict check and get overwritten in place on the next acquire.
pub fn is_valid(lock: &LockModel, now: DateTime<Utc>) -> bool {
    lock.expires_at > now
}

/// Seats in `locks` that an unexpired hold not owned by `holder` covers.
/// Anonymous holds (no user id) carry no owner to match against, so while
/// valid they block every requester, guest requesters included; they clear
/// only through expiry or an explicit release.
pub fn blocked_seat_numbers(
    locks: &[LockModel],
    seats: &[SeatModel],
    holder: Option<Uuid>,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut blocked: Vec<String> = locks
        .iter()
        .filter(|l| is_valid(l, now) && !(l.user_id.is_some() && l.user_id == holder))
        .filter_map(|l| {
            seats
                .iter()
                .find(|s| s.id == l.seat_id)
                .map(|s| s.seat_number.clone())
        })
        .collect();
    blocked.sort();
    blocked
}

pub async fn find_locks<C: ConnectionTrait>(
    conn: &C,
    trip_id: Uuid,
    seat_ids: &[Uuid],
    for_update: bool,
) -> AppResult<Vec<LockModel>> {
    let mut finder = SeatLocks::find()
        .filter(LockCol::TripId.eq(trip_id))
        .filter(LockCol::SeatId.is_in(seat_ids.to_vec()));
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.all(conn).await?)
}

/// Delete every lock on these seats owned by `holder`. Used by the checkout
/// UI on back-navigation and by the booking coordinator once seats are
/// committed.
pub async fn release_for_holder<C: ConnectionTrait>(
    conn: &C,
    trip_id: Uuid,
    seat_ids: &[Uuid],
    holder: Option<Uuid>,
) -> AppResult<u64> {
    let mut delete = SeatLocks::delete_many()
        .filter(LockCol::TripId.eq(trip_id))
        .filter(LockCol::SeatId.is_in(seat_ids.to_vec()));
    delete = match holder {
        Some(uid) => delete.filter(LockCol::UserId.eq(uid)),
        None => delete.filter(LockCol::UserId.is_null()),
    };
    let res = delete.exec(conn).await?;
    Ok(res.rows_affected)
}

/// Create or refresh holds for the requested seats. Conflicts name the seats
/// another holder still has.
pub async fn acquire(
    state: &AppState,
    user: &RequestUser,
    payload: AcquireSeatLocksRequest,
) -> AppResult<ApiResponse<SeatLocksResponse>> {
    if payload.seat_numbers.is_empty() {
        return Err(AppError::Validation("No seats requested".into()));
    }
    let ttl_secs = payload
        .ttl_seconds
        .unwrap_or(DEFAULT_TTL_SECS)
        .clamp(MIN_TTL_SECS, MAX_TTL_SECS);

    let txn = state.orm.begin().await?;

    // Trip lock first, same order as the booking path.
    let trip = load_trip_for_update(&txn, payload.trip_id).await?;
    let seats = resolve_seats(&txn, trip.bus_id, &payload.seat_numbers).await?;
    let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

    let now = Utc::now();
    let existing = find_locks(&txn, payload.trip_id, &seat_ids, true).await?;

    let blocked = blocked_seat_numbers(&existing, &seats, user.user_id, now);
    if !blocked.is_empty() {
        return Err(AppError::Conflict(format!(
            "Seats already held by another checkout: {}",
            blocked.join(", ")
        )));
    }

    let expires_at = now + Duration::seconds(ttl_secs);
    let mut views = Vec::with_capacity(seats.len());
    for seat in &seats {
        match existing.iter().find(|l| l.seat_id == seat.id) {
            // Only this holder's own identified row or an expired one gets
            // here; a valid anonymous row was already a conflict above.
            Some(lock) => {
                let mut active: LockActive = lock.clone().into();
                active.user_id = Set(user.user_id);
                active.expires_at = Set(expires_at.into());
                active.update(&txn).await?;
            }
            None => {
                LockActive {
                    id: Set(Uuid::new_v4()),
                    trip_id: Set(payload.trip_id),
                    seat_id: Set(seat.id),
                    user_id: Set(user.user_id),
                    expires_at: Set(expires_at.into()),
                    created_at: NotSet,
                }
                .insert(&txn)
                .await?;
            }
        }
        views.push(SeatLockView {
            seat_number: seat.seat_number.clone(),
            expires_at,
        });
    }

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Seats held",
        SeatLocksResponse { locks: views },
        None,
    ))
}

/// Voluntarily drop this holder's locks on the given seats.
pub async fn release(
    state: &AppState,
    user: &RequestUser,
    payload: ReleaseSeatLocksRequest,
) -> AppResult<ApiResponse<SeatLocksResponse>> {
    if payload.seat_numbers.is_empty() {
        return Err(AppError::Validation("No seats requested".into()));
    }

    let txn = state.orm.begin().await?;
    let trip = load_trip_for_update(&txn, payload.trip_id).await?;
    let seats = resolve_seats(&txn, trip.bus_id, &payload.seat_numbers).await?;
    let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

    release_for_holder(&txn, payload.trip_id, &seat_ids, user.user_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Seats released",
        SeatLocksResponse { locks: Vec::new() },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: Uuid, number: &str) -> SeatModel {
        SeatModel {
            id,
            bus_id: Uuid::new_v4(),
            seat_number: number.to_string(),
            seat_type: "STANDARD".to_string(),
            price_multiplier: 1.0,
            is_active: true,
        }
    }

    fn lock(seat_id: Uuid, user_id: Option<Uuid>, expires_in_secs: i64) -> LockModel {
        let now = Utc::now();
        LockModel {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            seat_id,
            user_id,
            expires_at: (now + Duration::seconds(expires_in_secs)).into(),
            created_at: now.into(),
        }
    }

    #[test]
    fn expired_locks_never_block() {
        let s = seat(Uuid::new_v4(), "A1");
        let stale = lock(s.id, Some(Uuid::new_v4()), -5);
        let blocked = blocked_seat_numbers(&[stale], &[s], None, Utc::now());
        assert!(blocked.is_empty());
    }

    #[test]
    fn other_holders_valid_lock_blocks() {
        let s = seat(Uuid::new_v4(), "A1");
        let other = lock(s.id, Some(Uuid::new_v4()), 60);
        let blocked = blocked_seat_numbers(&[other], &[s], Some(Uuid::new_v4()), Utc::now());
        assert_eq!(blocked, vec!["A1".to_string()]);
    }

    #[test]
    fn own_lock_does_not_block() {
        let me = Uuid::new_v4();
        let s = seat(Uuid::new_v4(), "B2");
        let mine = lock(s.id, Some(me), 60);
        let blocked = blocked_seat_numbers(&[mine], &[s], Some(me), Utc::now());
        assert!(blocked.is_empty());
    }

    #[test]
    fn anonymous_hold_blocks_identified_users() {
        let s = seat(Uuid::new_v4(), "C3");
        let anon = lock(s.id, None, 60);
        let blocked = blocked_seat_numbers(&[anon], &[s], Some(Uuid::new_v4()), Utc::now());
        assert_eq!(blocked, vec!["C3".to_string()]);
    }

    #[test]
    fn anonymous_hold_blocks_other_guests_too() {
        let s = seat(Uuid::new_v4(), "C4");
        let anon = lock(s.id, None, 60);
        let blocked = blocked_seat_numbers(&[anon], &[s], None, Utc::now());
        assert_eq!(blocked, vec!["C4".to_string()]);
    }

    #[test]
    fn expired_anonymous_hold_clears_for_everyone() {
        let s = seat(Uuid::new_v4(), "C5");
        let stale = lock(s.id, None, -5);
        assert!(blocked_seat_numbers(std::slice::from_ref(&stale), &[s.clone()], None, Utc::now()).is_empty());
        assert!(
            blocked_seat_numbers(&[stale], &[s], Some(Uuid::new_v4()), Utc::now()).is_empty()
        );
    }
}
