use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Booking, BookingItem, Payment, PaymentMethod, TripSummary};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    /// Seat numbers as shown on the seat map; duplicates are rejected.
    pub seat_numbers: Vec<String>,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub payment_method: PaymentMethod,
    pub voucher_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub booking: Booking,
    pub items: Vec<BookingItem>,
    pub payment: Payment,
    pub trip: TripSummary,
    /// Bank-transfer QR payload; present when payment_method = BANK_TRANSFER.
    pub qr_payload: Option<String>,
    /// Gateway redirect URL; present when payment_method = VNPAY.
    pub pay_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingWithItems {
    pub booking: Booking,
    pub items: Vec<BookingItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    Free,
    Locked,
    Booked,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatAvailability {
    pub seat_id: Uuid,
    pub seat_number: String,
    pub seat_type: String,
    pub price: i64,
    pub state: SeatState,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatMapResponse {
    pub trip: TripSummary,
    pub seats: Vec<SeatAvailability>,
}
