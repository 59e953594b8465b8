use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "SCHEDULED",
            TripStatus::InProgress => "IN_PROGRESS",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(TripStatus::Scheduled),
            "IN_PROGRESS" => Some(TripStatus::InProgress),
            "COMPLETED" => Some(TripStatus::Completed),
            "CANCELLED" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
    CancelRequested,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::CancelRequested => "CANCEL_REQUESTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCEL_REQUESTED" => Some(BookingStatus::CancelRequested),
            _ => None,
        }
    }

    /// Statuses whose seats count as committed for conflict checks and the
    /// availability counter.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
    RefundPending,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "PENDING",
            BookingPaymentStatus::Paid => "PAID",
            BookingPaymentStatus::Cancelled => "CANCELLED",
            BookingPaymentStatus::Refunded => "REFUNDED",
            BookingPaymentStatus::RefundPending => "REFUND_PENDING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingPaymentStatus::Pending),
            "PAID" => Some(BookingPaymentStatus::Paid),
            "CANCELLED" => Some(BookingPaymentStatus::Cancelled),
            "REFUNDED" => Some(BookingPaymentStatus::Refunded),
            "REFUND_PENDING" => Some(BookingPaymentStatus::RefundPending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    /// Forward-only state machine: PENDING may move anywhere, terminal
    /// states may only "re-enter" themselves (idempotent re-apply).
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match self {
            PaymentStatus::Pending => true,
            terminal => *terminal == next,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Issued => "ISSUED",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(InvoiceStatus::Draft),
            "ISSUED" => Some(InvoiceStatus::Issued),
            "CANCELLED" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    EWallet,
    Vnpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::EWallet => "E_WALLET",
            PaymentMethod::Vnpay => "VNPAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percent,
    Amount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "PERCENT",
            DiscountType::Amount => "AMOUNT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENT" => Some(DiscountType::Percent),
            "AMOUNT" => Some(DiscountType::Amount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub booking_code: String,
    pub user_id: Option<Uuid>,
    pub trip_id: Uuid,
    pub company_id: Uuid,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub total_price: i64,
    pub discount_amount: i64,
    pub voucher_id: Option<Uuid>,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    pub seats_display: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub seat_id: Uuid,
    pub seat_number: String,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub payment_code: String,
    pub booking_id: Uuid,
    pub company_id: Uuid,
    pub amount: i64,
    pub discount_amount: i64,
    pub voucher_id: Option<Uuid>,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub company_id: Uuid,
    pub status: String,
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub issued_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TripSummary {
    pub id: Uuid,
    pub company_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: i64,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: String,
}
