use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::seat_locks::{AcquireSeatLocksRequest, ReleaseSeatLocksRequest, SeatLocksResponse},
    error::AppResult,
    identity::RequestUser,
    response::ApiResponse,
    services::seat_lock_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(acquire_locks).delete(release_locks))
}

#[utoipa::path(
    post,
    path = "/api/seat-locks",
    request_body = AcquireSeatLocksRequest,
    responses(
        (status = 200, description = "Seats held for this checkout", body = ApiResponse<SeatLocksResponse>),
        (status = 409, description = "Another checkout holds some of the seats"),
    ),
    tag = "Seat locks"
)]
pub async fn acquire_locks(
    State(state): State<AppState>,
    user: RequestUser,
    Json(payload): Json<AcquireSeatLocksRequest>,
) -> AppResult<Json<ApiResponse<SeatLocksResponse>>> {
    let resp = seat_lock_service::acquire(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/seat-locks",
    request_body = ReleaseSeatLocksRequest,
    responses(
        (status = 200, description = "Holds released", body = ApiResponse<SeatLocksResponse>),
    ),
    tag = "Seat locks"
)]
pub async fn release_locks(
    State(state): State<AppState>,
    user: RequestUser,
    Json(payload): Json<ReleaseSeatLocksRequest>,
) -> AppResult<Json<ApiResponse<SeatLocksResponse>>> {
    let resp = seat_lock_service::release(&state, &user, payload).await?;
    Ok(Json(resp))
}
