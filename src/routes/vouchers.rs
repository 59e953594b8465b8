use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::vouchers::{VoucherPreviewQuery, VoucherPreviewResponse},
    error::AppResult,
    identity::RequestUser,
    response::ApiResponse,
    services::voucher_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/preview", get(preview_voucher))
}

#[utoipa::path(
    get,
    path = "/api/vouchers/preview",
    params(
        ("code" = String, Query, description = "Voucher code"),
        ("trip_id" = uuid::Uuid, Query, description = "Trip the booking is for"),
        ("amount" = i64, Query, description = "Pre-discount order amount"),
    ),
    responses(
        (status = 200, description = "Validity and resulting discount", body = ApiResponse<VoucherPreviewResponse>),
        (status = 404, description = "Trip not found"),
    ),
    tag = "Vouchers"
)]
pub async fn preview_voucher(
    State(state): State<AppState>,
    user: RequestUser,
    Query(query): Query<VoucherPreviewQuery>,
) -> AppResult<Json<ApiResponse<VoucherPreviewResponse>>> {
    let resp = voucher_service::preview(&state, &user, query).await?;
    Ok(Json(resp))
}
