use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::vouchers::{VoucherPreviewQuery, VoucherPreviewResponse},
    error::{AppError, AppResult},
    entity::{
        trips::Entity as Trips,
        voucher_usages::{ActiveModel as UsageActive, Column as UsageCol, Entity as VoucherUsages},
        vouchers::{ActiveModel as VoucherActive, Column as VoucherCol, Entity as Vouchers, Model as VoucherModel},
    },
    identity::RequestUser,
    models::DiscountType,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct ValidVoucher {
    pub voucher: VoucherModel,
    pub discount: i64,
}

/// Why a voucher was refused. Rule failures are caller errors (400); an
/// exhausted usage cap is a Conflict so clients can distinguish "retry with
/// another code" from "you lost the race".
#[derive(Debug, Clone, PartialEq)]
pub enum VoucherRejection {
    Rule(String),
    CapReached(String),
}

impl VoucherRejection {
    pub fn reason(&self) -> &str {
        match self {
            VoucherRejection::Rule(r) | VoucherRejection::CapReached(r) => r,
        }
    }

    pub fn into_error(self) -> AppError {
        match self {
            VoucherRejection::Rule(r) => AppError::Validation(r),
            VoucherRejection::CapReached(r) => AppError::Conflict(r),
        }
    }
}

pub type VoucherDecision = Result<ValidVoucher, VoucherRejection>;

/// Evaluate every redemption rule for `code` against the given order.
/// Performs no writes; the caller records usage in its own transaction.
/// `lock_row` must be true whenever the caller intends to redeem, so two
/// concurrent redemptions near the cap serialize on the voucher row.
pub async fn validate<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    company_id: Uuid,
    order_amount: i64,
    user_id: Option<Uuid>,
    require_company_match: bool,
    lock_row: bool,
) -> AppResult<VoucherDecision> {
    let mut finder = Vouchers::find().filter(VoucherCol::Code.eq(code));
    if lock_row {
        finder = finder.lock(LockType::Update);
    }
    let voucher = match finder.one(conn).await? {
        Some(v) => v,
        None => {
            return Ok(Err(VoucherRejection::Rule(format!(
                "Voucher {code} does not exist"
            ))));
        }
    };

    if !voucher.is_active {
        return Ok(Err(VoucherRejection::Rule(format!(
            "Voucher {code} is no longer active"
        ))));
    }

    if require_company_match {
        if let Some(owner) = voucher.company_id {
            if owner != company_id {
                return Ok(Err(VoucherRejection::Rule(format!(
                    "Voucher {code} is not valid for this bus company"
                ))));
            }
        }
    }

    let now = Utc::now();
    if let Some(start) = voucher.start_date {
        if now < start {
            return Ok(Err(VoucherRejection::Rule(format!(
                "Voucher {code} is not valid yet"
            ))));
        }
    }
    if let Some(end) = voucher.end_date {
        if now > end {
            return Ok(Err(VoucherRejection::Rule(format!(
                "Voucher {code} has expired"
            ))));
        }
    }

    if let Some(min_order) = voucher.min_order_value {
        if order_amount < min_order {
            return Ok(Err(VoucherRejection::Rule(format!(
                "Order must be at least {min_order} to use voucher {code}"
            ))));
        }
    }

    if let Some(limit) = voucher.usage_limit {
        if voucher.used_count >= limit {
            return Ok(Err(VoucherRejection::CapReached(format!(
                "Voucher {code} has reached its usage limit"
            ))));
        }
    }

    // Guests (no user id) are never counted against the per-user cap.
    if let (Some(per_user), Some(uid)) = (voucher.usage_per_user, user_id) {
        let used_by_user = VoucherUsages::find()
            .filter(UsageCol::VoucherId.eq(voucher.id))
            .filter(UsageCol::UserId.eq(uid))
            .count(conn)
            .await?;
        if used_by_user >= per_user as u64 {
            return Ok(Err(VoucherRejection::CapReached(format!(
                "You have already used voucher {code} the maximum number of times"
            ))));
        }
    }

    let Some(discount_type) = DiscountType::parse(&voucher.discount_type) else {
        return Ok(Err(VoucherRejection::Rule(format!(
            "Voucher {code} has an unrecognized discount type"
        ))));
    };

    let discount = compute_discount(
        discount_type,
        voucher.discount_value,
        voucher.max_discount,
        order_amount,
    );

    Ok(Ok(ValidVoucher { voucher, discount }))
}

/// Stateless dry-run for the checkout UI: same rules as a redemption, no row
/// lock, nothing recorded.
pub async fn preview(
    state: &AppState,
    user: &RequestUser,
    query: VoucherPreviewQuery,
) -> AppResult<ApiResponse<VoucherPreviewResponse>> {
    if query.amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".into()));
    }
    let trip = Trips::find_by_id(query.trip_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("trip"))?;

    let decision = validate(
        &state.orm,
        &query.code,
        trip.company_id,
        query.amount,
        user.user_id,
        true,
        false,
    )
    .await?;

    let response = match decision {
        Ok(valid) => VoucherPreviewResponse {
            code: query.code,
            valid: true,
            discount: valid.discount,
            payable: (query.amount - valid.discount).max(0),
            reason: None,
        },
        Err(rejection) => VoucherPreviewResponse {
            code: query.code,
            valid: false,
            discount: 0,
            payable: query.amount,
            reason: Some(rejection.reason().to_string()),
        },
    };

    Ok(ApiResponse::ok(response))
}

/// PERCENT: `order * value / 100`, capped by max_discount when set.
/// AMOUNT: flat value, never more than the order itself.
pub fn compute_discount(
    discount_type: DiscountType,
    discount_value: i64,
    max_discount: Option<i64>,
    order_amount: i64,
) -> i64 {
    match discount_type {
        DiscountType::Percent => {
            let raw = order_amount * discount_value / 100;
            match max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountType::Amount => discount_value.min(order_amount),
    }
}

/// Record a successful redemption: one immutable usage row plus the voucher
/// counter bump. Runs on the caller's transaction; the voucher row was locked
/// by `validate(.., lock_row = true)`.
pub async fn record_usage<C: ConnectionTrait>(
    conn: &C,
    voucher: &VoucherModel,
    booking_id: Uuid,
    user_id: Option<Uuid>,
    applied_discount: i64,
) -> AppResult<()> {
    UsageActive {
        id: Set(Uuid::new_v4()),
        voucher_id: Set(voucher.id),
        booking_id: Set(booking_id),
        user_id: Set(user_id),
        applied_discount: Set(applied_discount),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    let mut active: VoucherActive = voucher.clone().into();
    active.used_count = Set(voucher.used_count + 1);
    active.update(conn).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_discount_is_capped() {
        let d = compute_discount(DiscountType::Percent, 10, Some(50_000), 1_000_000);
        assert_eq!(d, 50_000);
    }

    #[test]
    fn percent_discount_without_cap() {
        let d = compute_discount(DiscountType::Percent, 10, None, 1_000_000);
        assert_eq!(d, 100_000);
    }

    #[test]
    fn amount_discount_never_exceeds_order() {
        assert_eq!(
            compute_discount(DiscountType::Amount, 80_000, None, 50_000),
            50_000
        );
        assert_eq!(
            compute_discount(DiscountType::Amount, 30_000, None, 50_000),
            30_000
        );
    }

    #[test]
    fn cap_rejection_maps_to_conflict() {
        let err = VoucherRejection::CapReached("limit".into()).into_error();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = VoucherRejection::Rule("bad".into()).into_error();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
