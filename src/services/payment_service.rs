use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::payments::{InvoiceView, PaymentView, ProcessPaymentRequest},
    error::{AppError, AppResult},
    entity::{
        bookings::{ActiveModel as BookingActive, Entity as Bookings, Model as BookingModel},
        invoices::{ActiveModel as InvoiceActive, Column as InvoiceCol, Entity as Invoices, Model as InvoiceModel},
        payment_logs::ActiveModel as LogActive,
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        vnpay_transactions::ActiveModel as VnpayTxnActive,
    },
    models::{BookingPaymentStatus, Invoice, InvoiceStatus, Payment, PaymentMethod, PaymentStatus},
    response::ApiResponse,
    services::booking_service::{booking_from_entity, code_with_prefix},
    state::AppState,
};

/// Which channel observed the confirmation. Every settlement log row names
/// its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementTrigger {
    Manual,
    VnpayReturn,
    VnpayIpn,
    VnpayQuery,
}

impl SettlementTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementTrigger::Manual => "MANUAL",
            SettlementTrigger::VnpayReturn => "VNPAY_RETURN",
            SettlementTrigger::VnpayIpn => "VNPAY_IPN",
            SettlementTrigger::VnpayQuery => "VNPAY_QUERY",
        }
    }
}

/// Append one payment audit row on the caller's connection, so settlement
/// logs commit or roll back with the transition they describe.
pub async fn append_log<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    action: &str,
    detail: Option<serde_json::Value>,
) -> AppResult<()> {
    LogActive {
        id: Set(Uuid::new_v4()),
        payment_id: Set(payment_id),
        action: Set(action.to_string()),
        detail: Set(detail),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Create the PENDING payment for a fresh booking, along with its INIT log
/// row and DRAFT invoice. Runs inside the booking transaction.
pub async fn create_pending_payment<C: ConnectionTrait>(
    conn: &C,
    booking: &BookingModel,
    amount: i64,
    discount_amount: i64,
    method: PaymentMethod,
) -> AppResult<PaymentModel> {
    let payment_id = Uuid::new_v4();
    let payment = PaymentActive {
        id: Set(payment_id),
        payment_code: Set(code_with_prefix("PY", payment_id)),
        booking_id: Set(booking.id),
        company_id: Set(booking.company_id),
        amount: Set(amount),
        discount_amount: Set(discount_amount),
        voucher_id: Set(booking.voucher_id),
        payment_method: Set(method.as_str().to_string()),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        transaction_id: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    append_log(
        conn,
        payment.id,
        "INIT",
        Some(serde_json::json!({
            "booking_code": booking.booking_code,
            "amount": amount,
            "method": method.as_str(),
        })),
    )
    .await?;

    ensure_invoice(conn, &payment, booking).await?;

    Ok(payment)
}

/// Open a gateway correlation record for a VNPay payment and return its
/// order id (vnp_TxnRef).
pub async fn create_gateway_transaction<C: ConnectionTrait>(
    conn: &C,
    payment: &PaymentModel,
) -> AppResult<String> {
    let order_id = payment.payment_code.clone();
    VnpayTxnActive {
        id: Set(Uuid::new_v4()),
        payment_id: Set(payment.id),
        order_id: Set(order_id.clone()),
        amount: Set(payment.amount),
        bank_code: Set(None),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        transaction_no: Set(None),
        response_code: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(order_id)
}

/// Find-or-create the invoice for a payment; flip DRAFT to ISSUED exactly
/// once, when the payment is SUCCESS. The unique constraint on payment_id
/// backs the lookup-then-create.
pub async fn ensure_invoice<C: ConnectionTrait>(
    conn: &C,
    payment: &PaymentModel,
    booking: &BookingModel,
) -> AppResult<InvoiceModel> {
    let success = PaymentStatus::parse(&payment.status) == Some(PaymentStatus::Success);

    let existing = Invoices::find()
        .filter(InvoiceCol::PaymentId.eq(payment.id))
        .one(conn)
        .await?;

    if let Some(invoice) = existing {
        if success && InvoiceStatus::parse(&invoice.status) != Some(InvoiceStatus::Issued) {
            let mut active: InvoiceActive = invoice.into();
            active.status = Set(InvoiceStatus::Issued.as_str().to_string());
            active.issued_at = Set(payment.paid_at);
            return Ok(active.update(conn).await?);
        }
        return Ok(invoice);
    }

    let invoice_id = Uuid::new_v4();
    let status = if success {
        InvoiceStatus::Issued
    } else {
        InvoiceStatus::Draft
    };
    let invoice = InvoiceActive {
        id: Set(invoice_id),
        invoice_number: Set(code_with_prefix("INV", invoice_id)),
        payment_id: Set(payment.id),
        booking_id: Set(booking.id),
        company_id: Set(booking.company_id),
        status: Set(status.as_str().to_string()),
        subtotal: Set(booking.total_price),
        tax: Set(0),
        total: Set(payment.amount),
        issued_at: Set(if success { payment.paid_at } else { None }),
        metadata: Set(Some(serde_json::json!({
            "booking_code": booking.booking_code,
            "seats": booking.seats_display,
        }))),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(invoice)
}

/// The only code path that can flip a payment to SUCCESS, whichever channel
/// observed the confirmation. Idempotent when the payment is already
/// SUCCESS; Conflict from the other terminal states.
pub async fn mark_payment_success<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    trigger: SettlementTrigger,
    transaction_ref: Option<&str>,
) -> AppResult<PaymentModel> {
    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    let current = PaymentStatus::parse(&payment.status)
        .ok_or_else(|| AppError::Validation(format!("Unknown payment status {}", payment.status)))?;

    match current {
        PaymentStatus::Success => return Ok(payment),
        PaymentStatus::Failed | PaymentStatus::Cancelled => {
            return Err(AppError::Conflict(format!(
                "Payment {} is already {}",
                payment.payment_code, payment.status
            )));
        }
        PaymentStatus::Pending => {}
    }

    let now = Utc::now();
    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Success.as_str().to_string());
    active.paid_at = Set(Some(now.into()));
    if let Some(txn_ref) = transaction_ref {
        active.transaction_id = Set(Some(txn_ref.to_string()));
    }
    active.updated_at = Set(now.into());
    let payment = active.update(conn).await?;

    let booking = Bookings::find_by_id(payment.booking_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("booking"))?;

    ensure_invoice(conn, &payment, &booking).await?;

    let mut booking_active: BookingActive = booking.into();
    booking_active.payment_status = Set(BookingPaymentStatus::Paid.as_str().to_string());
    booking_active.updated_at = Set(now.into());
    booking_active.update(conn).await?;

    append_log(
        conn,
        payment.id,
        "SUCCESS",
        Some(serde_json::json!({
            "trigger": trigger.as_str(),
            "transaction_ref": transaction_ref,
        })),
    )
    .await?;

    Ok(payment)
}

/// PENDING -> FAILED, with the gateway's reason in the log. No-op when
/// already FAILED.
pub async fn fail_payment<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    trigger: SettlementTrigger,
    reason: &str,
) -> AppResult<PaymentModel> {
    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    match PaymentStatus::parse(&payment.status) {
        Some(PaymentStatus::Failed) => return Ok(payment),
        Some(PaymentStatus::Pending) => {}
        _ => {
            return Err(AppError::Conflict(format!(
                "Payment {} is already {}",
                payment.payment_code, payment.status
            )));
        }
    }

    let now = Utc::now();
    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Failed.as_str().to_string());
    active.updated_at = Set(now.into());
    let payment = active.update(conn).await?;

    append_log(
        conn,
        payment.id,
        "FAILED",
        Some(serde_json::json!({
            "trigger": trigger.as_str(),
            "reason": reason,
        })),
    )
    .await?;

    Ok(payment)
}

/// Cancel every still-PENDING payment of a booking (used when the booking
/// itself is cancelled).
pub async fn cancel_pending_for_booking<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> AppResult<()> {
    let pending = Payments::find()
        .filter(PaymentCol::BookingId.eq(booking_id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Pending.as_str()))
        .lock(LockType::Update)
        .all(conn)
        .await?;

    let now = Utc::now();
    for payment in pending {
        let payment_id = payment.id;
        let mut active: PaymentActive = payment.into();
        active.status = Set(PaymentStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(now.into());
        active.update(conn).await?;

        append_log(
            conn,
            payment_id,
            "CANCELLED",
            Some(serde_json::json!({ "reason": "booking cancelled" })),
        )
        .await?;
    }
    Ok(())
}

/// Manual settlement: cash at the counter, verified bank transfer, and the
/// like. Synchronous SUCCESS transition.
pub async fn process_payment(
    state: &AppState,
    payload: ProcessPaymentRequest,
) -> AppResult<ApiResponse<PaymentView>> {
    if payload.payment_method == PaymentMethod::Vnpay {
        return Err(AppError::Validation(
            "VNPay payments are settled by the gateway callbacks, not this endpoint".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let payment = match (payload.payment_id, payload.booking_id) {
        (Some(id), _) => Payments::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("payment"))?,
        (None, Some(booking_id)) => Payments::find()
            .filter(PaymentCol::BookingId.eq(booking_id))
            .filter(PaymentCol::Status.eq(PaymentStatus::Pending.as_str()))
            .order_by_desc(PaymentCol::CreatedAt)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("payment"))?,
        (None, None) => {
            return Err(AppError::Validation(
                "Either payment_id or booking_id is required".into(),
            ));
        }
    };

    if payload.amount != payment.amount {
        return Err(AppError::Validation(format!(
            "Amount mismatch: expected {}, got {}",
            payment.amount, payload.amount
        )));
    }

    let payment =
        mark_payment_success(&txn, payment.id, SettlementTrigger::Manual, None).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Payment recorded",
        PaymentView {
            payment: payment_from_entity(payment),
        },
        None,
    ))
}

pub async fn get_payment(state: &AppState, id: Uuid) -> AppResult<ApiResponse<PaymentView>> {
    let payment = Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("payment"))?;
    Ok(ApiResponse::ok(PaymentView {
        payment: payment_from_entity(payment),
    }))
}

/// Receipt projection: invoice + payment + booking for one settled (or
/// pending) payment.
pub async fn get_invoice(state: &AppState, payment_id: Uuid) -> AppResult<ApiResponse<InvoiceView>> {
    let payment = Payments::find_by_id(payment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    let invoice = Invoices::find()
        .filter(InvoiceCol::PaymentId.eq(payment.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("invoice"))?;

    let booking = Bookings::find_by_id(payment.booking_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("booking"))?;

    Ok(ApiResponse::ok(InvoiceView {
        invoice: invoice_from_entity(invoice),
        payment: payment_from_entity(payment),
        booking: booking_from_entity(booking),
    }))
}

pub fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        payment_code: model.payment_code,
        booking_id: model.booking_id,
        company_id: model.company_id,
        amount: model.amount,
        discount_amount: model.discount_amount,
        voucher_id: model.voucher_id,
        payment_method: model.payment_method,
        status: model.status,
        transaction_id: model.transaction_id,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn invoice_from_entity(model: InvoiceModel) -> Invoice {
    Invoice {
        id: model.id,
        invoice_number: model.invoice_number,
        payment_id: model.payment_id,
        booking_id: model.booking_id,
        company_id: model.company_id,
        status: model.status,
        subtotal: model.subtotal,
        tax: model.tax,
        total: model.total,
        issued_at: model.issued_at.map(|dt| dt.with_timezone(&Utc)),
        metadata: model.metadata,
    }
}
