use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use crate::{
    dto::payments::{GatewayQueryResult, GatewayReturnResult},
    error::{AppError, AppResult},
    entity::{
        bookings::Entity as Bookings,
        payments::{Entity as Payments, Model as PaymentModel},
        vnpay_transactions::{
            ActiveModel as VnpayTxnActive, Column as VnpayTxnCol, Entity as VnpayTransactions,
            Model as VnpayTxnModel,
        },
    },
    models::PaymentStatus,
    payment_log,
    response::ApiResponse,
    services::payment_service::{self, SettlementTrigger},
    state::AppState,
    vnpay::{self, IpnResponse},
};

fn param<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// VNPay sends amounts as VND x 100.
fn amount_matches(stored_amount: i64, wire_amount: &str) -> bool {
    wire_amount
        .parse::<i64>()
        .map(|v| v == stored_amount * 100)
        .unwrap_or(false)
}

async fn find_transaction(
    state: &AppState,
    order_id: &str,
) -> AppResult<Option<VnpayTxnModel>> {
    Ok(VnpayTransactions::find()
        .filter(VnpayTxnCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?)
}

/// Apply a gateway outcome to the correlation record and its payment in one
/// transaction. Success funnels through the single SUCCESS transition in the
/// payment service.
async fn settle_transaction(
    state: &AppState,
    record: &VnpayTxnModel,
    gateway_success: bool,
    response_code: &str,
    transaction_no: Option<&str>,
    bank_code: Option<&str>,
    trigger: SettlementTrigger,
) -> AppResult<PaymentModel> {
    let txn = state.orm.begin().await?;

    let payment = if gateway_success {
        payment_service::mark_payment_success(&txn, record.payment_id, trigger, transaction_no)
            .await?
    } else {
        payment_service::fail_payment(
            &txn,
            record.payment_id,
            trigger,
            &format!("gateway response code {response_code}"),
        )
        .await?
    };

    let now = Utc::now();
    let mut active: VnpayTxnActive = record.clone().into();
    active.status = Set(payment.status.clone());
    active.response_code = Set(Some(response_code.to_string()));
    if let Some(no) = transaction_no {
        active.transaction_no = Set(Some(no.to_string()));
    }
    if let Some(bank) = bank_code {
        active.bank_code = Set(Some(bank.to_string()));
    }
    if gateway_success {
        active.paid_at = Set(Some(now.into()));
    }
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(payment)
}

/// Log a verification failure against the payment when the callback names a
/// known order. Out-of-transaction append; never mutates payment state.
async fn log_verification_failure(state: &AppState, order_id: Option<&str>, channel: &str) {
    let Some(order_id) = order_id else { return };
    let Ok(Some(record)) = find_transaction(state, order_id).await else {
        return;
    };
    if let Err(err) = payment_log::log_payment_event(
        &state.pool,
        record.payment_id,
        "VERIFICATION_FAILED",
        Some(serde_json::json!({ "channel": channel, "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "payment log write failed");
    }
}

/// Return-redirect handler: the user's browser carries the gateway's signed
/// outcome back to us.
pub async fn handle_return(
    state: &AppState,
    params: BTreeMap<String, String>,
) -> AppResult<ApiResponse<GatewayReturnResult>> {
    if !vnpay::verify_signature(&state.vnpay.hash_secret, &params) {
        log_verification_failure(state, param(&params, "vnp_TxnRef"), "return").await;
        return Err(AppError::GatewayVerification(
            "Invalid gateway signature".into(),
        ));
    }

    let Some(order_id) = param(&params, "vnp_TxnRef") else {
        return Err(AppError::GatewayVerification("Missing vnp_TxnRef".into()));
    };

    let Some(record) = find_transaction(state, order_id).await? else {
        return Ok(ApiResponse::success(
            "Payment failed",
            GatewayReturnResult {
                success: false,
                message: "Order not found".into(),
                order_id: Some(order_id.to_string()),
                booking_code: None,
            },
            None,
        ));
    };

    // A replayed redirect after the payment settled, whatever code it
    // carries, gets the confirmed outcome rather than a conflict.
    let payment = Payments::find_by_id(record.payment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("payment"))?;
    if PaymentStatus::parse(&payment.status) == Some(PaymentStatus::Success) {
        let booking_code = Bookings::find_by_id(payment.booking_id)
            .one(&state.orm)
            .await?
            .map(|b| b.booking_code);
        return Ok(ApiResponse::success(
            "Payment already confirmed",
            GatewayReturnResult {
                success: true,
                message: "Payment already confirmed".to_string(),
                order_id: Some(order_id.to_string()),
                booking_code,
            },
            None,
        ));
    }

    let response_code = param(&params, "vnp_ResponseCode").unwrap_or("99");
    let transaction_no = param(&params, "vnp_TransactionNo");
    let bank_code = param(&params, "vnp_BankCode");
    let success = response_code == vnpay::RSP_SUCCESS;

    let payment = settle_transaction(
        state,
        &record,
        success,
        response_code,
        transaction_no,
        bank_code,
        SettlementTrigger::VnpayReturn,
    )
    .await?;

    let booking_code = Bookings::find_by_id(payment.booking_id)
        .one(&state.orm)
        .await?
        .map(|b| b.booking_code);

    let message = if success {
        "Payment successful"
    } else {
        "Payment failed"
    };
    Ok(ApiResponse::success(
        message,
        GatewayReturnResult {
            success,
            message: message.to_string(),
            order_id: Some(order_id.to_string()),
            booking_code,
        },
        None,
    ))
}

/// Server-to-server IPN. Always answers VNPay's fixed code pairs; HTTP-level
/// errors would only make the gateway retry forever.
pub async fn handle_ipn(state: &AppState, params: BTreeMap<String, String>) -> IpnResponse {
    if !vnpay::verify_signature(&state.vnpay.hash_secret, &params) {
        log_verification_failure(state, param(&params, "vnp_TxnRef"), "ipn").await;
        return IpnResponse::new(vnpay::RSP_INVALID_SIGNATURE, "Invalid signature");
    }

    let Some(order_id) = param(&params, "vnp_TxnRef") else {
        return IpnResponse::new(vnpay::RSP_ORDER_NOT_FOUND, "Order not found");
    };

    let record = match find_transaction(state, order_id).await {
        Ok(Some(r)) => r,
        Ok(None) => return IpnResponse::new(vnpay::RSP_ORDER_NOT_FOUND, "Order not found"),
        Err(err) => {
            tracing::error!(error = %err, order_id, "ipn transaction lookup failed");
            return IpnResponse::new(vnpay::RSP_INTERNAL_ERROR, "Unknown error");
        }
    };

    // Amount re-check guards against a forged-but-signed replay carrying a
    // different amount.
    let Some(wire_amount) = param(&params, "vnp_Amount") else {
        return IpnResponse::new(vnpay::RSP_INVALID_AMOUNT, "Invalid amount");
    };
    if !amount_matches(record.amount, wire_amount) {
        log_verification_failure(state, Some(order_id), "ipn-amount").await;
        return IpnResponse::new(vnpay::RSP_INVALID_AMOUNT, "Invalid amount");
    }

    // Replay of an already-confirmed event: acknowledge without reapplying.
    if PaymentStatus::parse(&record.status) == Some(PaymentStatus::Success) {
        return IpnResponse::new(vnpay::RSP_ALREADY_CONFIRMED, "Order already confirmed");
    }

    let response_code = param(&params, "vnp_ResponseCode").unwrap_or("99");
    let success = response_code == vnpay::RSP_SUCCESS;
    let transaction_no = param(&params, "vnp_TransactionNo");
    let bank_code = param(&params, "vnp_BankCode");

    match settle_transaction(
        state,
        &record,
        success,
        response_code,
        transaction_no,
        bank_code,
        SettlementTrigger::VnpayIpn,
    )
    .await
    {
        Ok(_) => IpnResponse::new(vnpay::RSP_SUCCESS, "Confirm Success"),
        // Lost a race with the Return handler for the same event.
        Err(AppError::Conflict(_)) => {
            IpnResponse::new(vnpay::RSP_ALREADY_CONFIRMED, "Order already confirmed")
        }
        Err(err) => {
            tracing::error!(error = %err, order_id, "ipn settlement failed");
            IpnResponse::new(vnpay::RSP_INTERNAL_ERROR, "Unknown error")
        }
    }
}

/// Manual reconciliation: ask the gateway for the transaction's authoritative
/// status and catch up if a confirmation was missed. The HTTP call runs
/// outside any database transaction.
pub async fn query_and_sync(
    state: &AppState,
    order_id: &str,
) -> AppResult<ApiResponse<GatewayQueryResult>> {
    let record = find_transaction(state, order_id)
        .await?
        .ok_or(AppError::NotFound("transaction"))?;

    let payment = Payments::find_by_id(record.payment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    let local_success = PaymentStatus::parse(&payment.status) == Some(PaymentStatus::Success);

    let gateway_response = state
        .gateway
        .query_transaction(order_id, record.created_at.with_timezone(&Utc))
        .await
        .map_err(|err| AppError::GatewayVerification(format!("gateway query failed: {err}")))?;

    let mut updated = false;
    let mut status = payment.status.clone();
    if gateway_response.is_success() && !local_success {
        let settled = settle_transaction(
            state,
            &record,
            true,
            &gateway_response.response_code,
            gateway_response.transaction_no.as_deref(),
            None,
            SettlementTrigger::VnpayQuery,
        )
        .await?;
        status = settled.status;
        updated = true;
    }

    Ok(ApiResponse::ok(GatewayQueryResult {
        order_id: order_id.to_string(),
        local_status: status,
        gateway_response_code: Some(gateway_response.response_code),
        updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_amount_is_vnd_times_100() {
        assert!(amount_matches(150_000, "15000000"));
        assert!(!amount_matches(150_000, "150000"));
        assert!(!amount_matches(150_000, "15000001"));
        assert!(!amount_matches(150_000, "not-a-number"));
    }

    #[test]
    fn empty_params_read_as_absent() {
        let mut p = BTreeMap::new();
        p.insert("vnp_TxnRef".to_string(), "".to_string());
        assert_eq!(param(&p, "vnp_TxnRef"), None);
        p.insert("vnp_TxnRef".to_string(), "PY-1".to_string());
        assert_eq!(param(&p, "vnp_TxnRef"), Some("PY-1"));
    }
}
