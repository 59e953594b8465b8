use axum::extract::FromRequestParts;
use uuid::Uuid;

use crate::error::AppError;

/// Identity established by the upstream auth gateway and forwarded as an
/// `x-user-id` header. Absent header = guest checkout; the value is trusted,
/// never re-validated here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUser {
    pub user_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for RequestUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get("x-user-id") else {
            return Ok(RequestUser { user_id: None });
        };

        let value = raw
            .to_str()
            .map_err(|_| AppError::Validation("Invalid x-user-id header".into()))?;

        let user_id = Uuid::parse_str(value.trim())
            .map_err(|_| AppError::Validation("Invalid x-user-id header".into()))?;

        Ok(RequestUser {
            user_id: Some(user_id),
        })
    }
}
