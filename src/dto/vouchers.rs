use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VoucherPreviewQuery {
    pub code: String,
    pub trip_id: Uuid,
    /// Order amount the client is about to pay, pre-discount.
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherPreviewResponse {
    pub code: String,
    pub valid: bool,
    pub discount: i64,
    pub payable: i64,
    pub reason: Option<String>,
}
