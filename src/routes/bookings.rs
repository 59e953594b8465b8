use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::bookings::{BookingResponse, BookingWithItems, CreateBookingRequest},
    error::AppResult,
    identity::RequestUser,
    response::ApiResponse,
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", post(cancel_booking))
        .route("/code/{code}", get(get_booking_by_code))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Booking created", body = ApiResponse<BookingResponse>),
        (status = 400, description = "Invalid request or voucher rule failure"),
        (status = 409, description = "Seat conflict, insufficient seats, or trip unavailable"),
    ),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: RequestUser,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let resp = booking_service::create_booking(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    responses(
        (status = 200, description = "Booking with its seats", body = ApiResponse<BookingWithItems>),
        (status = 404, description = "Booking not found"),
    ),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingWithItems>>> {
    let resp = booking_service::get_booking(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/code/{code}",
    responses(
        (status = 200, description = "Booking looked up by its shareable code", body = ApiResponse<BookingWithItems>),
        (status = 404, description = "Booking not found"),
    ),
    tag = "Bookings"
)]
pub async fn get_booking_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<BookingWithItems>>> {
    let resp = booking_service::get_booking_by_code(&state, &code).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    responses(
        (status = 200, description = "Booking cancelled, seats released", body = ApiResponse<BookingWithItems>),
        (status = 400, description = "Already cancelled/completed or inside the 2-hour cutoff"),
        (status = 404, description = "Booking not found"),
    ),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: RequestUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingWithItems>>> {
    let resp = booking_service::cancel_booking(&state, &user, id).await?;
    Ok(Json(resp))
}
