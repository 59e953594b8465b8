use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{
        GatewayQueryResult, GatewayReturnResult, InvoiceView, PaymentView, ProcessPaymentRequest,
    },
    error::AppResult,
    response::ApiResponse,
    services::{payment_service, vnpay_service},
    state::AppState,
    vnpay::IpnResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(process_payment))
        .route("/{id}", get(get_payment))
        .route("/vnpay/return", get(vnpay_return))
        .route("/vnpay/ipn", post(vnpay_ipn))
        .route("/vnpay/query/{order_id}", get(vnpay_query))
}

pub fn invoice_router() -> Router<AppState> {
    Router::new().route("/{payment_id}", get(get_invoice))
}

#[utoipa::path(
    post,
    path = "/api/payments/process",
    request_body = ProcessPaymentRequest,
    responses(
        (status = 200, description = "Payment settled", body = ApiResponse<PaymentView>),
        (status = 400, description = "Amount mismatch or missing identifiers"),
        (status = 409, description = "Payment already failed or cancelled"),
    ),
    tag = "Payments"
)]
pub async fn process_payment(
    State(state): State<AppState>,
    Json(payload): Json<ProcessPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentView>>> {
    let resp = payment_service::process_payment(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    responses(
        (status = 200, description = "Payment descriptor", body = ApiResponse<PaymentView>),
        (status = 404, description = "Payment not found"),
    ),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentView>>> {
    let resp = payment_service::get_payment(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/vnpay/return",
    responses(
        (status = 200, description = "Outcome of the gateway redirect", body = ApiResponse<GatewayReturnResult>),
        (status = 400, description = "Signature verification failed"),
    ),
    tag = "Payments"
)]
pub async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<ApiResponse<GatewayReturnResult>>> {
    let resp = vnpay_service::handle_return(&state, params).await?;
    Ok(Json(resp))
}

// The IPN contract is VNPay's: always HTTP 200 with one of the defined
// RspCode pairs, never an error status.
#[utoipa::path(
    post,
    path = "/api/payments/vnpay/ipn",
    responses(
        (status = 200, description = "VNPay RspCode/Message pair"),
    ),
    tag = "Payments"
)]
pub async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<IpnResponse> {
    Json(vnpay_service::handle_ipn(&state, params).await)
}

#[utoipa::path(
    get,
    path = "/api/payments/vnpay/query/{order_id}",
    responses(
        (status = 200, description = "Local vs gateway status, synced when behind", body = ApiResponse<GatewayQueryResult>),
        (status = 404, description = "Unknown order id"),
    ),
    tag = "Payments"
)]
pub async fn vnpay_query(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<GatewayQueryResult>>> {
    let resp = vnpay_service::query_and_sync(&state, &order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{payment_id}",
    responses(
        (status = 200, description = "Receipt projection", body = ApiResponse<InvoiceView>),
        (status = 404, description = "Payment or invoice not found"),
    ),
    tag = "Invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InvoiceView>>> {
    let resp = payment_service::get_invoice(&state, payment_id).await?;
    Ok(Json(resp))
}
