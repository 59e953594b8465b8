use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Booking, Invoice, Payment, PaymentMethod};

/// Manual (non-gateway) settlement. Either the payment id or the booking id
/// identifies the pending payment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    pub payment_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub amount: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentView {
    pub payment: Payment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub payment: Payment,
    pub booking: Booking,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayReturnResult {
    pub success: bool,
    pub message: String,
    pub order_id: Option<String>,
    pub booking_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayQueryResult {
    pub order_id: String,
    pub local_status: String,
    pub gateway_response_code: Option<String>,
    /// True when this query call itself advanced the payment to SUCCESS.
    pub updated: bool,
}
