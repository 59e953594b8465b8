use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::bookings::SeatMapResponse,
    error::AppResult,
    response::ApiResponse,
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/seats", get(trip_seat_map))
}

#[utoipa::path(
    get,
    path = "/api/trips/{id}/seats",
    responses(
        (status = 200, description = "Seat map with free/held/booked state per seat", body = ApiResponse<SeatMapResponse>),
        (status = 404, description = "Trip not found"),
    ),
    tag = "Trips"
)]
pub async fn trip_seat_map(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SeatMapResponse>>> {
    let resp = booking_service::trip_seat_map(&state, id).await?;
    Ok(Json(resp))
}
