use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Append one audit row for a payment event. Rows are never updated or
/// deleted.
pub async fn log_payment_event(
    pool: &DbPool,
    payment_id: Uuid,
    action: &str,
    detail: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO payment_logs (id, payment_id, action, detail)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(payment_id)
    .bind(action)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}
