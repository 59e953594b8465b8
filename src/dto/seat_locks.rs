use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcquireSeatLocksRequest {
    pub trip_id: Uuid,
    pub seat_numbers: Vec<String>,
    /// Hold duration in seconds; server clamps to [30, 900].
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReleaseSeatLocksRequest {
    pub trip_id: Uuid,
    pub seat_numbers: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatLockView {
    pub seat_number: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatLocksResponse {
    pub locks: Vec<SeatLockView>,
}
