use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub vnpay: VnpayConfig,
}

/// VNPay merchant credentials and endpoints. The hash secret signs every
/// outbound request and verifies every inbound callback.
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub api_url: String,
    pub return_url: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            database_url,
            host,
            port,
            vnpay: VnpayConfig::from_env(),
        })
    }
}

impl VnpayConfig {
    pub fn from_env() -> Self {
        let tmn_code = env::var("VNPAY_TMN_CODE").unwrap_or_default();
        let hash_secret = env::var("VNPAY_HASH_SECRET").unwrap_or_default();
        let pay_url = env::var("VNPAY_PAY_URL").unwrap_or_else(|_| {
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string()
        });
        let api_url = env::var("VNPAY_API_URL").unwrap_or_else(|_| {
            "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction".to_string()
        });
        let return_url = env::var("VNPAY_RETURN_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/payments/vnpay/return".to_string());
        let timeout_secs = env::var("VNPAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);
        Self {
            tmn_code,
            hash_secret,
            pay_url,
            api_url,
            return_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
