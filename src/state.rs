use std::sync::Arc;

use crate::config::VnpayConfig;
use crate::db::{DbPool, OrmConn};
use crate::notify::Notifier;
use crate::vnpay::VnpayGateway;

/// Shared application state. The gateway client and notifier are injected
/// trait objects so tests can substitute deterministic fakes.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub vnpay: VnpayConfig,
    pub gateway: Arc<dyn VnpayGateway>,
    pub notifier: Arc<dyn Notifier>,
}
