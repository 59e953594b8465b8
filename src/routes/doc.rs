use axum::Json;
use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bookings::{
            BookingResponse, BookingWithItems, CreateBookingRequest, SeatAvailability,
            SeatMapResponse, SeatState,
        },
        payments::{
            GatewayQueryResult, GatewayReturnResult, InvoiceView, PaymentView,
            ProcessPaymentRequest,
        },
        seat_locks::{
            AcquireSeatLocksRequest, ReleaseSeatLocksRequest, SeatLockView, SeatLocksResponse,
        },
        vouchers::{VoucherPreviewQuery, VoucherPreviewResponse},
    },
    models::{Booking, BookingItem, Invoice, Payment, PaymentMethod, TripSummary},
    response::{ApiResponse, Meta},
    routes::{bookings, health, payments, seat_locks, trips, vouchers},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        bookings::create_booking,
        bookings::get_booking,
        bookings::get_booking_by_code,
        bookings::cancel_booking,
        trips::trip_seat_map,
        seat_locks::acquire_locks,
        seat_locks::release_locks,
        vouchers::preview_voucher,
        payments::process_payment,
        payments::get_payment,
        payments::vnpay_return,
        payments::vnpay_ipn,
        payments::vnpay_query,
        payments::get_invoice
    ),
    components(
        schemas(
            Booking,
            BookingItem,
            Payment,
            Invoice,
            TripSummary,
            PaymentMethod,
            CreateBookingRequest,
            BookingResponse,
            BookingWithItems,
            SeatMapResponse,
            SeatAvailability,
            SeatState,
            AcquireSeatLocksRequest,
            ReleaseSeatLocksRequest,
            SeatLockView,
            SeatLocksResponse,
            VoucherPreviewQuery,
            VoucherPreviewResponse,
            ProcessPaymentRequest,
            PaymentView,
            InvoiceView,
            GatewayReturnResult,
            GatewayQueryResult,
            Meta,
            ApiResponse<BookingResponse>,
            ApiResponse<BookingWithItems>,
            ApiResponse<PaymentView>,
            ApiResponse<InvoiceView>,
            ApiResponse<SeatMapResponse>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Bookings", description = "Seat reservation and cancellation"),
        (name = "Trips", description = "Seat-map availability projections"),
        (name = "Seat locks", description = "Short-lived checkout holds"),
        (name = "Vouchers", description = "Discount code preview"),
        (name = "Payments", description = "Settlement and gateway reconciliation"),
        (name = "Invoices", description = "Receipts derived from settled payments"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

pub async fn openapi_json() -> Json<OpenApiSpec> {
    Json(ApiDoc::openapi())
}
