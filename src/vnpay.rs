use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::config::VnpayConfig;

type HmacSha512 = Hmac<Sha512>;

/// VNPay IPN / return response codes.
pub const RSP_SUCCESS: &str = "00";
pub const RSP_ORDER_NOT_FOUND: &str = "01";
pub const RSP_ALREADY_CONFIRMED: &str = "02";
pub const RSP_INVALID_AMOUNT: &str = "04";
pub const RSP_INVALID_SIGNATURE: &str = "97";
pub const RSP_INTERNAL_ERROR: &str = "99";

/// Fixed response body VNPay expects from an IPN endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            rsp_code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Percent-encode the way VNPay's reference merchants do (Java
/// `URLEncoder.encode`): unreserved chars pass through, space becomes `+`.
fn urlencode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Sorted, URL-encoded `k=v&...` string — both the signed payload and the
/// query-string body of a payment URL.
pub fn encode_params(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn hmac_sha512_hex(secret: &str, data: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a parameter set. `vnp_SecureHash`/`vnp_SecureHashType` are never part
/// of the signed payload.
pub fn sign_params(secret: &str, params: &BTreeMap<String, String>) -> String {
    let mut signable = params.clone();
    signable.remove("vnp_SecureHash");
    signable.remove("vnp_SecureHashType");
    hmac_sha512_hex(secret, &encode_params(&signable))
}

/// Verify an inbound callback's signature against its own parameters.
pub fn verify_signature(secret: &str, params: &BTreeMap<String, String>) -> bool {
    let Some(given) = params.get("vnp_SecureHash") else {
        return false;
    };
    if given.is_empty() {
        return false;
    }
    sign_params(secret, params).eq_ignore_ascii_case(given)
}

fn format_vnp_time(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d%H%M%S").to_string()
}

/// Build the redirect URL that sends a user to the gateway's hosted payment
/// page. `amount` is in VND; the wire format carries VND x 100.
pub fn build_payment_url(
    cfg: &VnpayConfig,
    order_id: &str,
    amount: i64,
    order_info: &str,
    client_ip: &str,
    now: DateTime<Utc>,
) -> String {
    let mut params = BTreeMap::new();
    params.insert("vnp_Version".to_string(), "2.1.0".to_string());
    params.insert("vnp_Command".to_string(), "pay".to_string());
    params.insert("vnp_TmnCode".to_string(), cfg.tmn_code.clone());
    params.insert("vnp_Amount".to_string(), (amount * 100).to_string());
    params.insert("vnp_CurrCode".to_string(), "VND".to_string());
    params.insert("vnp_TxnRef".to_string(), order_id.to_string());
    params.insert("vnp_OrderInfo".to_string(), order_info.to_string());
    params.insert("vnp_OrderType".to_string(), "other".to_string());
    params.insert("vnp_Locale".to_string(), "vn".to_string());
    params.insert("vnp_ReturnUrl".to_string(), cfg.return_url.clone());
    params.insert("vnp_IpAddr".to_string(), client_ip.to_string());
    params.insert("vnp_CreateDate".to_string(), format_vnp_time(now));
    params.insert(
        "vnp_ExpireDate".to_string(),
        format_vnp_time(now + Duration::minutes(15)),
    );

    let secure_hash = sign_params(&cfg.hash_secret, &params);
    let query = encode_params(&params);
    format!("{}?{}&vnp_SecureHash={}", cfg.pay_url, query, secure_hash)
}

/// Normalized answer from the gateway's `querydr` status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayQueryResponse {
    #[serde(rename = "vnp_ResponseCode")]
    pub response_code: String,
    #[serde(rename = "vnp_TransactionStatus", default)]
    pub transaction_status: Option<String>,
    #[serde(rename = "vnp_TransactionNo", default)]
    pub transaction_no: Option<String>,
    #[serde(rename = "vnp_Amount", default)]
    pub amount: Option<String>,
    #[serde(rename = "vnp_Message", default)]
    pub message: Option<String>,
}

impl GatewayQueryResponse {
    /// "00" on both fields means the money actually moved.
    pub fn is_success(&self) -> bool {
        self.response_code == RSP_SUCCESS
            && self.transaction_status.as_deref().unwrap_or(RSP_SUCCESS) == RSP_SUCCESS
    }
}

/// Outbound gateway client. A trait so the reconciliation service can be
/// exercised with a scripted fake instead of live HTTP.
#[async_trait]
pub trait VnpayGateway: Send + Sync {
    async fn query_transaction(
        &self,
        order_id: &str,
        transaction_date: DateTime<Utc>,
    ) -> anyhow::Result<GatewayQueryResponse>;
}

/// reqwest-backed client with the bounded timeout from config.
pub struct HttpVnpayGateway {
    cfg: VnpayConfig,
    client: reqwest::Client,
}

impl HttpVnpayGateway {
    pub fn new(cfg: VnpayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { cfg, client })
    }
}

#[async_trait]
impl VnpayGateway for HttpVnpayGateway {
    async fn query_transaction(
        &self,
        order_id: &str,
        transaction_date: DateTime<Utc>,
    ) -> anyhow::Result<GatewayQueryResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let create_date = format_vnp_time(Utc::now());
        let txn_date = format_vnp_time(transaction_date);
        let order_info = format!("Query transaction {order_id}");
        let ip_addr = "127.0.0.1";

        // querydr signs a pipe-joined field list rather than the query string.
        let data = format!(
            "{request_id}|2.1.0|querydr|{}|{order_id}|{txn_date}|{create_date}|{ip_addr}|{order_info}",
            self.cfg.tmn_code
        );
        let secure_hash = hmac_sha512_hex(&self.cfg.hash_secret, &data);

        let body = serde_json::json!({
            "vnp_RequestId": request_id,
            "vnp_Version": "2.1.0",
            "vnp_Command": "querydr",
            "vnp_TmnCode": self.cfg.tmn_code,
            "vnp_TxnRef": order_id,
            "vnp_OrderInfo": order_info,
            "vnp_TransactionDate": txn_date,
            "vnp_CreateDate": create_date,
            "vnp_IpAddr": ip_addr,
            "vnp_SecureHash": secure_hash,
        });

        let resp = self
            .client
            .post(&self.cfg.api_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed = resp.json::<GatewayQueryResponse>().await?;
        Ok(parsed)
    }
}
